use regex::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;

static FIELD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?P<label>\S[^:]*?)\s*:\s*(?P<value>\S.*?)\s*$").expect("static field regex")
});

static GROUPED_INT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d{1,3}(?:,\d{3})+$").expect("static grouping regex")
});

const HEADER_PREFIX: &str = "Smart Log for NVME device";

/// Parse `nvme smart-log <dev>` output into `metric_name → value`.
///
/// Labels are lower-cased with whitespace runs turned into `_`; thousands
/// separators are stripped from grouped integers. Lines that are not
/// `label : value` are ignored.
pub fn parse_smart_log(lines: &[String]) -> BTreeMap<String, String> {
    let mut metrics = BTreeMap::new();
    for line in lines {
        if line.trim_start().starts_with(HEADER_PREFIX) { continue; }
        let caps = match FIELD.captures(line) {
            Some(c) => c,
            None    => continue,
        };
        let key = normalize_label(&caps["label"]);
        let raw = &caps["value"];
        let value = if GROUPED_INT.is_match(raw) { raw.replace(',', "") } else { raw.to_string() };
        metrics.insert(key, value);
    }
    metrics
}

fn normalize_label(label: &str) -> String {
    label
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SMART_LOG: &str = "\
Smart Log for NVME device:nvme0n1 namespace-id:ffffffff
critical_warning                        : 0
temperature                             : 33 C (306 Kelvin)
available_spare                         : 100%
available_spare_threshold               : 10%
percentage_used                         : 2%
endurance group critical warning summary: 0
data_units_read                         : 12,345,678
data_units_written                      : 9,876,543
host_read_commands                      : 123456789
Warning Temperature Time                : 0

# trailing comment
";

    fn parse(text: &str) -> BTreeMap<String, String> {
        parse_smart_log(&text.lines().map(str::to_string).collect::<Vec<_>>())
    }

    #[test]
    fn strips_thousands_separators() {
        let m = parse("data_units_written : 12,345,678\n");
        assert_eq!(m["data_units_written"], "12345678");
    }

    #[test]
    fn skips_header_and_junk() {
        let m = parse(SMART_LOG);
        assert!(!m.keys().any(|k| k.contains("smart_log")));
        assert!(!m.keys().any(|k| k.starts_with('#')));
        assert_eq!(m.len(), 10);
    }

    #[test]
    fn normalizes_labels() {
        let m = parse(SMART_LOG);
        assert_eq!(m["warning_temperature_time"], "0");
        assert_eq!(m["endurance_group_critical_warning_summary"], "0");
    }

    #[test]
    fn keeps_non_grouped_values_verbatim() {
        let m = parse(SMART_LOG);
        assert_eq!(m["available_spare"], "100%");
        assert_eq!(m["temperature"], "33 C (306 Kelvin)");
        assert_eq!(m["host_read_commands"], "123456789");
        assert_eq!(m["data_units_read"], "12345678");
        assert_eq!(m["data_units_written"], "9876543");
    }

    #[test]
    fn malformed_grouping_is_left_alone() {
        let m = parse("data_units_read : 1,23,456\n");
        assert_eq!(m["data_units_read"], "1,23,456");
    }
}
