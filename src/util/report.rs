use crate::collectors::nvme_cli::Availability;
use crate::models::device::{DeviceRecord, Inventory, BYTES_PER_DATA_UNIT};
use crate::thresholds::{resolve, ThresholdLookup, ThresholdPair};
use crate::util::human::fmt_value;
use std::io::{self, Write};

pub const USAGE:       &str = "nvme_usage";
pub const BYTES:       &str = "nvme_bytes";
pub const WRITECYCLES: &str = "nvme_writecycles";
pub const SPARE:       &str = "nvme_spare";

// ── autoconf ─────────────────────────────────────────────────────────

/// The one-line answer munin expects from `autoconf`.
pub fn autoconf_answer(availability: Availability, inventory: &Inventory) -> &'static str {
    match availability {
        Availability::DriverOnly  => "no (nvme-cli is not installed)",
        Availability::Unavailable => "no (no NVMe driver loaded)",
        Availability::Available if inventory.is_empty() => "no (no devices to monitor)",
        Availability::Available => "yes",
    }
}

pub fn render_autoconf<W: Write>(
    out:          &mut W,
    availability: Availability,
    inventory:    &Inventory,
) -> io::Result<()> {
    writeln!(out, "{}", autoconf_answer(availability, inventory))
}

// ── config ───────────────────────────────────────────────────────────

/// Graph definitions and thresholds for all four multigraph sections.
pub fn render_config<W: Write>(
    out:       &mut W,
    inventory: &Inventory,
    lookup:    &dyn ThresholdLookup,
) -> io::Result<()> {
    let labels: Vec<String> = inventory.iter().map(DeviceRecord::label).collect();

    // Usage
    writeln!(out, "multigraph {}", USAGE)?;
    writeln!(out, "graph_title NVMe Namespace Usage")?;
    write_order(out, &labels)?;
    writeln!(out, "graph_vlabel Percent used")?;
    writeln!(out, "graph_scale no")?;
    writeln!(out, "graph_category disk")?;
    writeln!(out, "graph_info How much space is used on each NVMe namespace")?;
    for dev in inventory.iter() {
        let id = dev.label();
        writeln!(out, "{}.label {}", id, dev.name())?;
        writeln!(out, "{}.type GAUGE", id)?;
        writeln!(out, "{}.min 0", id)?;
        writeln!(out, "{}.max 100", id)?;
        writeln!(out, "{}.info {} (namespace {})", id, dev.model, dev.namespace_id)?;
        let pair = resolve(lookup, USAGE, &dev.device_path, &id, Some("95"), Some("98"));
        write_thresholds(out, &id, &pair)?;
    }

    // Bytes: reads drawn below the axis, writes above
    let rw: Vec<String> = labels.iter().flat_map(|l| [format!("{}_r", l), format!("{}_w", l)]).collect();
    writeln!(out, "multigraph {}", BYTES)?;
    writeln!(out, "graph_title NVMe Namespace Read/Write")?;
    write_order(out, &rw)?;
    writeln!(out, "graph_vlabel Bytes read (-) / written (+) per ${{graph_period}}")?;
    writeln!(out, "graph_category disk")?;
    writeln!(out, "graph_info Amount of data read from and written to each NVMe device")?;
    writeln!(out, "graph_args --base 1000")?;
    writeln!(out, "graph_period second")?;
    for dev in inventory.iter() {
        let id = dev.label();
        let (r, w) = (format!("{}_r", id), format!("{}_w", id));
        writeln!(out, "{}.label {}", r, dev.name())?;
        writeln!(out, "{}.type COUNTER", r)?;
        writeln!(out, "{}.min 0", r)?;
        writeln!(out, "{}.graph no", r)?;
        writeln!(out, "{}.cdef {},{},*", r, r, BYTES_PER_DATA_UNIT)?;
        writeln!(out, "{}.label {}", w, dev.name())?;
        writeln!(out, "{}.type COUNTER", w)?;
        writeln!(out, "{}.min 0", w)?;
        writeln!(out, "{}.negative {}", w, r)?;
        writeln!(out, "{}.cdef {},{},*", w, w, BYTES_PER_DATA_UNIT)?;
        let pair = resolve(lookup, BYTES, &dev.device_path, &id, None, None);
        write_thresholds(out, &w, &pair)?;
    }

    // Write cycles: no sane default, spans orders of magnitude
    writeln!(out, "multigraph {}", WRITECYCLES)?;
    writeln!(out, "graph_title NVMe Write Cycles")?;
    write_order(out, &labels)?;
    writeln!(out, "graph_vlabel Cycles")?;
    writeln!(out, "graph_args --logarithmic")?;
    writeln!(out, "graph_category disk")?;
    writeln!(out, "graph_info Estimated program/erase cycles per cell: lifetime data written divided by capacity")?;
    for dev in inventory.iter() {
        let id = dev.label();
        writeln!(out, "{}.label {}", id, dev.name())?;
        writeln!(out, "{}.type GAUGE", id)?;
        writeln!(out, "{}.min 0", id)?;
        let pair = resolve(lookup, WRITECYCLES, &dev.device_path, &id, None, None);
        write_thresholds(out, &id, &pair)?;
    }

    // Spare capacity
    writeln!(out, "multigraph {}", SPARE)?;
    writeln!(out, "graph_title NVMe Spare Capacity")?;
    write_order(out, &labels)?;
    writeln!(out, "graph_vlabel Percent")?;
    writeln!(out, "graph_category disk")?;
    writeln!(out, "graph_info Remaining spare capacity the controller uses to replace worn-out cells")?;
    for dev in inventory.iter() {
        let id = dev.label();
        writeln!(out, "{}.label {}", id, dev.name())?;
        writeln!(out, "{}.type GAUGE", id)?;
        writeln!(out, "{}.min 0", id)?;
        writeln!(out, "{}.max 100", id)?;
        let pair = resolve(lookup, SPARE, &dev.device_path, &id, Some("10:"), Some("3:"));
        write_thresholds(out, &id, &pair)?;
    }
    Ok(())
}

fn write_order<W: Write>(out: &mut W, fields: &[String]) -> io::Result<()> {
    if fields.is_empty() { return Ok(()); }
    writeln!(out, "graph_order {}", fields.join(" "))
}

fn write_thresholds<W: Write>(out: &mut W, field: &str, pair: &ThresholdPair) -> io::Result<()> {
    if let Some(w) = &pair.warning {
        writeln!(out, "{}.warning {}", field, w)?;
    }
    if let Some(c) = &pair.critical {
        writeln!(out, "{}.critical {}", field, c)?;
    }
    Ok(())
}

// ── values ───────────────────────────────────────────────────────────

/// Current readings. A value that cannot be computed is left out rather
/// than reported as a bogus number.
pub fn render_values<W: Write>(out: &mut W, inventory: &Inventory) -> io::Result<()> {
    writeln!(out, "multigraph {}", USAGE)?;
    for dev in inventory.iter() {
        if let Some(pct) = dev.usage_percent() {
            writeln!(out, "{}.value {}", dev.label(), fmt_value(pct))?;
        }
    }

    // Raw counters; munin derives the rate from the COUNTER type.
    writeln!(out, "multigraph {}", BYTES)?;
    for dev in inventory.iter() {
        let id = dev.label();
        if let Some(r) = dev.data_units_read() {
            writeln!(out, "{}_r.value {}", id, r)?;
        }
        if let Some(w) = dev.data_units_written() {
            writeln!(out, "{}_w.value {}", id, w)?;
        }
    }

    writeln!(out, "multigraph {}", WRITECYCLES)?;
    for dev in inventory.iter() {
        if let Some(cycles) = dev.write_cycles() {
            writeln!(out, "{}.value {}", dev.label(), fmt_value(cycles))?;
        }
    }

    writeln!(out, "multigraph {}", SPARE)?;
    for dev in inventory.iter() {
        if let Some(spare) = dev.spare_percent() {
            writeln!(out, "{}.value {}", dev.label(), fmt_value(spare))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::device::sample;
    use std::collections::{BTreeMap, HashMap};

    fn inventory(devs: Vec<DeviceRecord>) -> Inventory {
        let devices: BTreeMap<String, DeviceRecord> = devs.into_iter().map(|d| (d.label(), d)).collect();
        Inventory { devices }
    }

    fn healthy(path: &str, serial: &str) -> DeviceRecord {
        let mut dev = sample(path, serial, 50, 200);
        dev.health.insert("data_units_read".into(), "2000".into());
        dev.health.insert("data_units_written".into(), "1000".into());
        dev.health.insert("available_spare".into(), "100%".into());
        dev
    }

    fn render(f: impl FnOnce(&mut Vec<u8>) -> io::Result<()>) -> String {
        let mut buf = Vec::new();
        f(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn autoconf_reasons() {
        let empty = Inventory::default();
        let one = inventory(vec![healthy("/dev/nvme0n1", "A")]);
        assert_eq!(autoconf_answer(Availability::Available, &empty), "no (no devices to monitor)");
        assert_eq!(autoconf_answer(Availability::DriverOnly, &empty), "no (nvme-cli is not installed)");
        assert_eq!(autoconf_answer(Availability::Unavailable, &empty), "no (no NVMe driver loaded)");
        assert_eq!(autoconf_answer(Availability::Available, &one), "yes");

        let out = render(|b| render_autoconf(b, Availability::Available, &one));
        assert_eq!(out, "yes\n");
    }

    #[test]
    fn values_for_one_device() {
        let inv = inventory(vec![healthy("/dev/nvme0n1", "A")]);
        let out = render(|b| render_values(b, &inv));
        let expected = "\
multigraph nvme_usage
SN_A.value 25
multigraph nvme_bytes
SN_A_r.value 2000
SN_A_w.value 1000
multigraph nvme_writecycles
SN_A.value 2560000
multigraph nvme_spare
SN_A.value 100
";
        assert_eq!(out, expected);
    }

    #[test]
    fn missing_health_drops_lines_not_sections() {
        let inv = inventory(vec![sample("/dev/nvme0n1", "A", 50, 200)]);
        let out = render(|b| render_values(b, &inv));
        assert_eq!(
            out,
            "multigraph nvme_usage\nSN_A.value 25\nmultigraph nvme_bytes\nmultigraph nvme_writecycles\nmultigraph nvme_spare\n"
        );
    }

    #[test]
    fn empty_inventory_still_has_all_sections() {
        let out = render(|b| render_config(b, &Inventory::default(), &HashMap::<String, String>::new()));
        for name in [USAGE, BYTES, WRITECYCLES, SPARE] {
            assert!(out.contains(&format!("multigraph {}\n", name)));
        }
        assert!(!out.contains("graph_order"));
        assert!(!out.contains(".label"));
    }

    #[test]
    fn config_defaults_and_hints() {
        let inv = inventory(vec![healthy("/dev/nvme0n1", "A"), healthy("/dev/nvme1n1", "B")]);
        let out = render(|b| render_config(b, &inv, &HashMap::<String, String>::new()));

        assert!(out.contains("graph_order SN_A SN_B\n"));
        assert!(out.contains("graph_order SN_A_r SN_A_w SN_B_r SN_B_w\n"));
        assert!(out.contains("graph_scale no\n"));
        assert!(out.contains("graph_args --logarithmic\n"));
        assert!(out.contains("graph_period second\n"));
        assert!(out.contains("SN_A.label nvme0n1\n"));
        assert!(out.contains("SN_A.info Samsung SSD 970 EVO Plus 1TB (namespace 1)\n"));
        assert!(out.contains("SN_A.warning 95\nSN_A.critical 98\n"));
        assert!(out.contains("SN_B.warning 10:\nSN_B.critical 3:\n"));
        assert!(out.contains("SN_A_r.type COUNTER\n"));
        assert!(out.contains("SN_A_r.graph no\n"));
        assert!(out.contains("SN_A_w.negative SN_A_r\n"));
        assert!(out.contains("SN_A_w.cdef SN_A_w,512000,*\n"));
    }

    #[test]
    fn writecycles_section_has_no_default_thresholds() {
        let inv = inventory(vec![healthy("/dev/nvme0n1", "A")]);
        let out = render(|b| render_config(b, &inv, &HashMap::<String, String>::new()));
        let section = out.split("multigraph nvme_writecycles\n").nth(1).unwrap();
        let section = section.split("multigraph").next().unwrap();
        assert!(!section.contains(".warning"));
        assert!(!section.contains(".critical"));
        assert!(!out.contains("SN_A_w.warning"));
    }

    #[test]
    fn config_uses_overrides() {
        let inv = inventory(vec![healthy("/dev/nvme0n1", "A")]);
        let mut cfg = HashMap::new();
        cfg.insert("nvme_writecycles_nvme0n1_warning".to_string(), "1000".to_string());
        cfg.insert("nvme_usage_SN_A_critical".to_string(), "99".to_string());
        let out = render(|b| render_config(b, &inv, &cfg));
        assert!(out.contains("SN_A.warning 95\nSN_A.critical 99\n"));
        assert!(out.contains("SN_A.min 0\nSN_A.warning 1000\n"));
    }
}
