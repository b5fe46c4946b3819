use crate::thresholds::ThresholdLookup;
use anyhow::Result;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable pointing at an alternative config file.
pub const CONFIG_ENV: &str = "MUNIN_NVME_CONFIG";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,

    /// Threshold overrides, e.g. `nvme_usage_nvme0n1_warning = "90"`.
    /// The environment takes precedence over these.
    #[serde(default)]
    pub thresholds: HashMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GeneralConfig {
    /// nvme-cli binary; overridden by `env.nvme` in munin's plugin-conf.d
    pub nvme_path:    String,
    /// Loaded-kernel-modules list used by autoconf
    pub modules_path: String,
}

// ── Defaults ─────────────────────────────────────────────────────────

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            nvme_path:    "nvme".into(),
            modules_path: "/proc/modules".into(),
        }
    }
}

// ── Load ──────────────────────────────────────────────────────────────

impl Config {
    /// Load the config file (if any) and apply environment overrides.
    /// Never fails: a plugin must still answer munin with defaults.
    pub fn load() -> Self {
        let mut cfg = match Config::config_path() {
            Some(path) => match try_load(&path) {
                Ok(c)  => c,
                Err(e) => {
                    log::debug!("{}: {}, using defaults", path.display(), e);
                    Config::default()
                }
            },
            None => Config::default(),
        };
        cfg.apply_env(|k| std::env::var(k).ok());
        cfg
    }

    pub fn config_path() -> Option<PathBuf> {
        if let Ok(p) = std::env::var(CONFIG_ENV) {
            return Some(PathBuf::from(p));
        }
        dirs::config_dir().map(|p| p.join("munin-nvme").join("munin-nvme.toml"))
    }

    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(p) = var("nvme").filter(|p| !p.trim().is_empty()) {
            self.general.nvme_path = p;
        }
    }
}

impl ThresholdLookup for Config {
    fn lookup(&self, key: &str) -> Option<String> {
        self.thresholds.get(key).cloned()
    }
}

fn try_load(path: &Path) -> Result<Config> {
    let text = fs::read_to_string(path)?;
    let cfg: Config = toml::from_str(&text)?;
    Ok(cfg)
}
