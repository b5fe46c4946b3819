mod collectors;
mod config;
mod error;
mod models;
mod thresholds;
mod util;

use anyhow::{Context, Result};
use clap::Parser;
use collectors::list;
use collectors::nvme_cli::{Availability, CommandRunner, NvmeCli};
use config::Config;
use models::device::Inventory;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use thresholds::{EnvLookup, Layered, ThresholdLookup};
use util::report;

#[derive(Parser, Debug)]
#[command(name = "munin-nvme", about = "Munin plugin for NVMe usage, throughput, wear and spare capacity", version = "0.1")]
struct Cli {
    /// autoconf, config or print; anything else (or nothing) prints values
    mode: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Mode {
    /// Print "yes" or "no (reason)" depending on whether NVMe devices exist
    Autoconf,
    /// Print graph definitions and thresholds
    Config,
    /// Print current values
    Fetch,
}

impl Mode {
    /// munin-node may pass arguments we do not implement (e.g. `suggest`);
    /// those fall back to printing values instead of failing the run.
    fn from_arg(arg: Option<&str>) -> Self {
        match arg {
            None | Some("print") | Some("fetch") => Mode::Fetch,
            Some("autoconf") => Mode::Autoconf,
            Some("config")   => Mode::Config,
            Some(other) => {
                log::warn!("unsupported argument {:?}, printing values", other);
                Mode::Fetch
            }
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    let mode = Mode::from_arg(cli.mode.as_deref());
    let cfg = Config::load();
    log::trace!("mode {:?}, config {:?}", mode, cfg);

    let runner = NvmeCli::new(&cfg.general.nvme_path);
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    match mode {
        Mode::Autoconf => run_autoconf(&mut out, &runner, &cfg)?,
        Mode::Config   => run_config(&mut out, &runner, &cfg, dirty_config())?,
        Mode::Fetch    => run_fetch(&mut out, &runner)?,
    }
    out.flush().context("writing to stdout")?;
    Ok(())
}

fn run_autoconf<W: Write, R: CommandRunner>(out: &mut W, runner: &R, cfg: &Config) -> Result<()> {
    let availability = Availability::detect(runner, Path::new(&cfg.general.modules_path));
    let inventory = if availability == Availability::Available {
        collect_inventory(runner)?
    } else {
        Inventory::default()
    };
    report::render_autoconf(out, availability, &inventory)?;
    Ok(())
}

fn run_config<W: Write, R: CommandRunner>(
    out:    &mut W,
    runner: &R,
    cfg:    &Config,
    dirty:  bool,
) -> Result<()> {
    let mut inventory = collect_inventory(runner)?;
    let lookup = Layered::new(vec![&EnvLookup as &dyn ThresholdLookup, cfg]);
    report::render_config(out, &inventory, &lookup)?;

    // munin-node >= 2.0.56 accepts values right after the config
    if dirty {
        inventory.load_health(runner);
        report::render_values(out, &inventory)?;
    }
    Ok(())
}

fn run_fetch<W: Write, R: CommandRunner>(out: &mut W, runner: &R) -> Result<()> {
    let mut inventory = collect_inventory(runner)?;
    inventory.load_health(runner);
    report::render_values(out, &inventory)?;
    Ok(())
}

/// `nvme list` → inventory. Format drift is logged and the rows parsed so
/// far are kept; an unknown size unit aborts the run.
fn collect_inventory<R: CommandRunner>(runner: &R) -> Result<Inventory> {
    let parsed = list::collect(runner).context("cannot interpret `nvme list` sizes")?;
    if let Some(drift) = parsed.drift {
        log::warn!("{}", drift);
    }
    log::debug!("{} NVMe namespace(s) found", parsed.inventory.len());
    Ok(parsed.inventory)
}

fn dirty_config() -> bool {
    std::env::var("MUNIN_CAP_DIRTYCONFIG").map(|v| v == "1").unwrap_or(false)
}
