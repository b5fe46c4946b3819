use std::collections::HashMap;
use std::path::Path;

/// Read-only key lookup for threshold overrides.
pub trait ThresholdLookup {
    fn lookup(&self, key: &str) -> Option<String>;
}

/// The process environment, as set up by munin-node's `plugin-conf.d`.
pub struct EnvLookup;

impl ThresholdLookup for EnvLookup {
    fn lookup(&self, key: &str) -> Option<String> {
        std::env::var(key).ok().filter(|v| !v.trim().is_empty())
    }
}

impl ThresholdLookup for HashMap<String, String> {
    fn lookup(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

/// Several lookups consulted in order; the first hit wins.
pub struct Layered<'a> {
    layers: Vec<&'a dyn ThresholdLookup>,
}

impl<'a> Layered<'a> {
    pub fn new(layers: Vec<&'a dyn ThresholdLookup>) -> Self {
        Self { layers }
    }
}

impl ThresholdLookup for Layered<'_> {
    fn lookup(&self, key: &str) -> Option<String> {
        self.layers.iter().find_map(|l| l.lookup(key))
    }
}

/// Resolved `(warning, critical)`; `None` means no alerting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ThresholdPair {
    pub warning:  Option<String>,
    pub critical: Option<String>,
}

/// Resolve thresholds for one metric on one device.
///
/// Defaults are replaced by `{metric}_{device name}_*`, which is in turn
/// replaced by `{metric}_{SN label}_*`. Each level replaces, never merges.
pub fn resolve(
    lookup:           &dyn ThresholdLookup,
    metric:           &str,
    device_path:      &str,
    label:            &str,
    default_warning:  Option<&str>,
    default_critical: Option<&str>,
) -> ThresholdPair {
    let mut pair = ThresholdPair {
        warning:  default_warning.map(str::to_string),
        critical: default_critical.map(str::to_string),
    };

    let name = Path::new(device_path)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(device_path);

    for ident in [name, label] {
        if let Some(w) = lookup.lookup(&format!("{}_{}_warning", metric, ident)) {
            pair.warning = Some(w);
        }
        if let Some(c) = lookup.lookup(&format!("{}_{}_critical", metric, ident)) {
            pair.critical = Some(c);
        }
    }
    pair
}
