use crate::collectors::{nvme_cli::CommandRunner, smart_log};
use std::collections::BTreeMap;
use std::path::Path;

/// Bytes per NVMe "data unit" as counted in the SMART log.
///
/// nvme-cli labels a unit as 1000 * 512-byte blocks. Not verified against
/// vendor documentation; kept as the observed behaviour.
pub const BYTES_PER_DATA_UNIT: u64 = 512_000;

/// One NVMe namespace as reported by `nvme list`.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceRecord {
    pub device_path:    String,
    pub serial_number:  String,
    pub model:          String,
    pub namespace_id:   u32,
    pub usage_bytes:    u64,
    pub capacity_bytes: u64,
    /// `smart-log` metrics, only populated when values are rendered.
    pub health:         BTreeMap<String, String>,
}

impl DeviceRecord {
    /// Munin field name: `SN_<serial>` with anything outside `[A-Za-z0-9_]`
    /// replaced so the serial survives as a field identifier.
    pub fn label(&self) -> String {
        label_for(&self.serial_number)
    }

    /// Base name of the device node, e.g. `nvme0n1`.
    pub fn name(&self) -> &str {
        Path::new(&self.device_path)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(&self.device_path)
    }

    pub fn usage_percent(&self) -> Option<f64> {
        if self.capacity_bytes == 0 { return None; }
        Some(100.0 * self.usage_bytes as f64 / self.capacity_bytes as f64)
    }

    /// Lifetime writes divided by capacity: the average number of
    /// program/erase cycles each cell has seen.
    pub fn write_cycles(&self) -> Option<f64> {
        if self.capacity_bytes == 0 { return None; }
        let written = self.data_units_written()?;
        Some(written as f64 * BYTES_PER_DATA_UNIT as f64 / self.capacity_bytes as f64)
    }

    pub fn data_units_read(&self) -> Option<u64> {
        self.health_token("data_units_read")?.parse().ok()
    }

    pub fn data_units_written(&self) -> Option<u64> {
        self.health_token("data_units_written")?.parse().ok()
    }

    pub fn spare_percent(&self) -> Option<f64> {
        self.health_number("available_spare")
    }

    /// First token of a health value as a number; tolerates `%` suffixes,
    /// leftover grouping commas and trailing annotations like "(6.32 TB)".
    fn health_token(&self, key: &str) -> Option<String> {
        let raw = self.health.get(key)?;
        let token = raw.split_whitespace().next()?;
        Some(token.chars().filter(|c| *c != ',' && *c != '%').collect())
    }

    fn health_number(&self, key: &str) -> Option<f64> {
        self.health_token(key)?.parse().ok()
    }
}

pub fn label_for(serial: &str) -> String {
    let cleaned: String = serial
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    format!("SN_{}", cleaned)
}

/// All namespaces found in one run, keyed by `SN_<serial>`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Inventory {
    pub devices: BTreeMap<String, DeviceRecord>,
}

impl Inventory {
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DeviceRecord> {
        self.devices.values()
    }

    /// Run `smart-log` for every device and attach the parsed metrics.
    pub fn load_health<R: CommandRunner>(&mut self, runner: &R) {
        for dev in self.devices.values_mut() {
            let lines = runner.run("smart-log", &[dev.device_path.as_str()]);
            dev.health = smart_log::parse_smart_log(&lines);
            log::trace!("{}: {} health metrics", dev.device_path, dev.health.len());
        }
    }
}

#[cfg(test)]
pub(crate) fn sample(path: &str, serial: &str, usage: u64, capacity: u64) -> DeviceRecord {
    DeviceRecord {
        device_path:    path.to_string(),
        serial_number:  serial.to_string(),
        model:          "Samsung SSD 970 EVO Plus 1TB".to_string(),
        namespace_id:   1,
        usage_bytes:    usage,
        capacity_bytes: capacity,
        health:         BTreeMap::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usage_percent_is_plain_ratio() {
        let dev = sample("/dev/nvme0n1", "S1", 50, 200);
        assert_eq!(dev.usage_percent(), Some(25.0));
    }

    #[test]
    fn usage_is_not_clamped() {
        let dev = sample("/dev/nvme0n1", "S1", 300, 200);
        assert_eq!(dev.usage_percent(), Some(150.0));
    }

    #[test]
    fn zero_capacity_yields_nothing() {
        let mut dev = sample("/dev/nvme0n1", "S1", 0, 0);
        dev.health.insert("data_units_written".into(), "1000".into());
        assert_eq!(dev.usage_percent(), None);
        assert_eq!(dev.write_cycles(), None);
    }

    #[test]
    fn write_cycles_from_data_units() {
        let mut dev = sample("/dev/nvme0n1", "S1", 0, 512_000_000);
        dev.health.insert("data_units_written".into(), "1000".into());
        assert_eq!(dev.write_cycles(), Some(1.0));
    }

    #[test]
    fn spare_strips_percent() {
        let mut dev = sample("/dev/nvme0n1", "S1", 0, 1);
        dev.health.insert("available_spare".into(), "100%".into());
        assert_eq!(dev.spare_percent(), Some(100.0));
    }

    #[test]
    fn counters_ignore_trailing_annotation() {
        let mut dev = sample("/dev/nvme0n1", "S1", 0, 1);
        dev.health.insert("data_units_read".into(), "12345678 (6.32 TB)".into());
        assert_eq!(dev.data_units_read(), Some(12_345_678));
        assert_eq!(dev.data_units_written(), None);
    }

    #[test]
    fn label_and_name() {
        let dev = sample("/dev/nvme1n1", "S4EW-NX0.K1", 0, 1);
        assert_eq!(dev.label(), "SN_S4EW_NX0_K1");
        assert_eq!(dev.name(), "nvme1n1");
    }
}
