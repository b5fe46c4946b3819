use crate::error::NvmeError;
use crate::models::device::{label_for, DeviceRecord, Inventory};
use crate::util::human::parse_size;
use regex::{Captures, Regex};
use std::collections::BTreeMap;
use std::sync::LazyLock;

/// Column labels `nvme list` prints in its header, in any order.
static HEADER_LABELS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    ["Node", "SN", "Model", "Namespace", "Usage"]
        .iter()
        .map(|l| Regex::new(&format!(r"\b{}\b", l)).expect("static header regex"))
        .collect()
});

/// One data row. nvme-cli 2.x adds a `/dev/ng*` column after the node and
/// prints the namespace id in hex.
static ROW: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^\s*(?P<node>/dev/\S+)\s+",
        r"(?:/dev/ng\S+\s+)?",
        r"(?P<sn>\S+)\s+",
        r"(?P<model>\S.*?)\s{3,}",
        r"(?P<nsid>0x[0-9A-Fa-f]+|\d+)\s+",
        r"(?P<usage>[\d.]+\s+[A-Za-z]+)\s*/\s*",
        r"(?P<capacity>[\d.]+\s+[A-Za-z]+)",
    ))
    .expect("static row regex")
});

/// Fields of one `nvme list` row before unit conversion.
#[derive(Debug, Clone, PartialEq)]
pub struct ListRow<'a> {
    pub node:     &'a str,
    pub serial:   &'a str,
    pub model:    &'a str,
    pub nsid:     &'a str,
    pub usage:    &'a str,
    pub capacity: &'a str,
}

/// Result of parsing `nvme list`: whatever rows were understood, plus the
/// drift error that stopped parsing, if any.
#[derive(Debug, Default)]
pub struct ParsedList {
    pub inventory: Inventory,
    pub drift:     Option<NvmeError>,
}

/// True if `line` looks like the `nvme list` header we know how to read.
pub fn header_recognized(line: &str) -> bool {
    HEADER_LABELS.iter().all(|re| re.is_match(line))
}

/// Match one data row against the known row grammar.
pub fn parse_row(line: &str) -> Option<ListRow<'_>> {
    let caps = ROW.captures(line)?;
    Some(ListRow {
        node:     group(&caps, "node"),
        serial:   group(&caps, "sn"),
        model:    group(&caps, "model").trim_end(),
        nsid:     group(&caps, "nsid"),
        usage:    group(&caps, "usage"),
        capacity: group(&caps, "capacity"),
    })
}

fn group<'h>(caps: &Captures<'h>, name: &str) -> &'h str {
    caps.name(name).map_or("", |m| m.as_str())
}

/// Run `nvme list` through `runner` and parse it.
pub fn collect<R: crate::collectors::nvme_cli::CommandRunner>(
    runner: &R,
) -> Result<ParsedList, NvmeError> {
    parse_list(&runner.run("list", &[]))
}

/// Parse the full `nvme list` output into an inventory keyed by `SN_<serial>`.
///
/// Structural drift stops parsing and is reported in [`ParsedList::drift`];
/// a size with an unknown unit is a hard error.
pub fn parse_list(lines: &[String]) -> Result<ParsedList, NvmeError> {
    let mut parsed = ParsedList::default();
    let header = match lines.first() {
        Some(h) => h,
        None    => return Ok(parsed),
    };
    if !header_recognized(header) {
        parsed.drift = Some(drift(1, header));
        return Ok(parsed);
    }

    let mut devices = BTreeMap::new();
    for (idx, line) in lines.iter().enumerate().skip(2) {
        if line.trim().is_empty() { continue; }
        let row = match parse_row(line) {
            Some(r) => r,
            None    => {
                parsed.drift = Some(drift(idx + 1, line));
                break;
            }
        };
        let record = to_record(&row)?;
        let key = label_for(&record.serial_number);
        if let Some(prev) = devices.insert(key.clone(), record) {
            log::debug!("{} also reported by {}; keeping the later row", key, prev.device_path);
        }
    }
    parsed.inventory = Inventory { devices };
    Ok(parsed)
}

fn to_record(row: &ListRow<'_>) -> Result<DeviceRecord, NvmeError> {
    let namespace_id = match row.nsid.strip_prefix("0x") {
        Some(hex) => u32::from_str_radix(hex, 16),
        None      => row.nsid.parse(),
    }
    .map_err(|_| NvmeError::InvalidNumber(row.nsid.to_string()))?;

    Ok(DeviceRecord {
        device_path:    row.node.to_string(),
        serial_number:  row.serial.to_string(),
        model:          row.model.to_string(),
        namespace_id,
        usage_bytes:    parse_size(row.usage)?,
        capacity_bytes: parse_size(row.capacity)?,
        health:         BTreeMap::new(),
    })
}

fn drift(line_no: usize, line: &str) -> NvmeError {
    NvmeError::FormatDrift {
        source_cmd: "list".to_string(),
        line_no,
        line: line.to_string(),
    }
}
