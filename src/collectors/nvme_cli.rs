use crate::error::NvmeError;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Something that can run nvme-cli sub-commands and hand back stdout lines.
pub trait CommandRunner {
    /// Run `<tool> <subcommand> <args…>`. Returns no lines when the tool
    /// is missing; never fails.
    fn run(&self, subcommand: &str, args: &[&str]) -> Vec<String>;

    /// True if the tool can be spawned at all.
    fn is_available(&self) -> bool;
}

/// The real `nvme` binary.
pub struct NvmeCli {
    program: PathBuf,
}

impl NvmeCli {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self { program: program.into() }
    }
}

impl CommandRunner for NvmeCli {
    fn run(&self, subcommand: &str, args: &[&str]) -> Vec<String> {
        let out = match Command::new(&self.program)
            .arg(subcommand)
            .args(args)
            .stdin(Stdio::null())
            .output()
        {
            Ok(o)  => o,
            Err(e) => {
                log::debug!("{}: {} ({})", self.program.display(), NvmeError::ToolUnavailable, e);
                return Vec::new();
            }
        };

        // Partial stdout is still worth parsing, so only warn here.
        let is_root = nix::unistd::geteuid().is_root();
        if let Some(err) = privilege_error(out.status.success(), is_root, &out.status.to_string()) {
            log::warn!("nvme {}: {}", subcommand, err);
        }

        String::from_utf8_lossy(&out.stdout)
            .lines()
            .map(str::to_string)
            .collect()
    }

    fn is_available(&self) -> bool {
        Command::new(&self.program)
            .arg("version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .is_ok()
    }
}

/// A failed run by a non-root user most likely lacked permission.
pub fn privilege_error(success: bool, is_root: bool, status: &str) -> Option<NvmeError> {
    if success || is_root {
        return None;
    }
    Some(NvmeError::Privilege { status: status.to_string() })
}

/// Whether this host can be monitored at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Availability {
    Available,
    /// The kernel driver is loaded but nvme-cli is missing.
    DriverOnly,
    /// Neither tool nor driver (or not Linux).
    Unavailable,
}

impl Availability {
    pub fn detect<R: CommandRunner>(runner: &R, modules_path: &Path) -> Self {
        let modules = fs::read_to_string(modules_path).ok();
        Self::classify(runner.is_available(), modules.as_deref())
    }

    pub fn classify(tool_ok: bool, modules: Option<&str>) -> Self {
        if tool_ok {
            return Availability::Available;
        }
        let driver_loaded = modules
            .map(|text| {
                text.lines()
                    .filter_map(|l| l.split_whitespace().next())
                    .any(|name| name.starts_with("nvme"))
            })
            .unwrap_or(false);
        if driver_loaded { Availability::DriverOnly } else { Availability::Unavailable }
    }
}
