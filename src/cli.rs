//! The CLI surface (§6): deliberately thin. Everything it does is
//! parse flags into a [`CliOverrides`] and a list of targets, the way
//! the teacher's own `clap`-derived option structs feed a handful of
//! fields into its `Config`/`Workspace` layers rather than threading
//! flags through the rest of the program by hand.

use clap::Parser;

use crate::config::{CliOverrides, Mode};

/// A concurrent build orchestrator for a source-based ports tree.
#[derive(Debug, Parser)]
#[command(name = "portwright", version, about)]
pub struct Cli {
    /// One or more port origins (`category/name`) to build, plus
    /// `KEY=VALUE` pairs routed into the build tool's environment.
    #[arg(required = true)]
    pub targets: Vec<String>,

    /// Batch mode: skip the interactive Config stage.
    #[arg(short = 'b')]
    pub batch: bool,

    /// Define a build-tool variable (may be repeated).
    #[arg(short = 'D', value_name = "KEY")]
    pub define: Vec<String>,

    /// Fetch distfiles only; do not build or install.
    #[arg(short = 'f', conflicts_with = "install")]
    pub fetch_only: bool,

    /// Print what would run without spawning external tools.
    #[arg(short = 'n')]
    pub no_op: bool,

    /// Install each target (default mode).
    #[arg(short = 'i', conflicts_with = "fetch_only")]
    pub install: bool,

    /// Update an already-installed target (alias of `-i`; last of `-i`/`-u` wins).
    #[arg(short = 'u', conflicts_with = "fetch_only")]
    pub update: bool,

    /// Package each target after a successful install.
    #[arg(short = 'p')]
    pub package: bool,

    /// Generate the tree's one-line-per-port index and print it to stdout.
    #[arg(long = "index")]
    pub index: bool,

    /// Numeric-monitor tick delay, in seconds.
    #[arg(short = 'w', value_name = "SEC")]
    pub monitor_delay: Option<u64>,

    /// Override `PORTSDIR`.
    #[arg(long)]
    pub ports_dir: Option<String>,

    /// Override `PKG_DBDIR`.
    #[arg(long)]
    pub pkg_dbdir: Option<String>,

    /// Run all external tools under this chroot.
    #[arg(short = 'c', long)]
    pub chroot: Option<String>,

    /// Concurrency cap; defaults to the detected CPU count.
    #[arg(short = 'j', long)]
    pub jobs: Option<usize>,

    /// Write per-port logs under this directory.
    #[arg(long)]
    pub log_dir: Option<String>,

    /// Path to a `portwright.toml` config file.
    #[arg(long)]
    pub config: Option<std::path::PathBuf>,

    /// Raise log verbosity (repeatable: `-v`, `-vv`).
    #[arg(short = 'v', action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[arg(long)]
    pub debug: bool,
}

impl Cli {
    /// Splits `targets` into port origins and `KEY=VALUE` pairs routed
    /// into the build tool's environment.
    pub fn origins_and_env(&self) -> (Vec<String>, Vec<(String, String)>) {
        let mut origins = Vec::new();
        let mut env = Vec::new();
        for target in &self.targets {
            match target.split_once('=') {
                Some((key, value)) => env.push((key.to_string(), value.to_string())),
                None => origins.push(target.clone()),
            }
        }
        (origins, env)
    }

    pub fn mode(&self) -> Mode {
        if self.fetch_only {
            Mode::FetchOnly
        } else if self.package {
            Mode::Package
        } else {
            Mode::Install
        }
    }

    pub fn into_overrides(self) -> CliOverrides {
        CliOverrides {
            ports_dir: self.ports_dir.clone(),
            pkg_dbdir: self.pkg_dbdir.clone(),
            chroot: self.chroot.clone(),
            jobs: self.jobs,
            log_dir: self.log_dir.clone(),
            no_op: self.no_op,
            debug: self.debug || self.verbose > 0,
            config_path: self.config.clone(),
            mode: Some(self.mode()),
            batch: self.batch,
        }
    }
}

/// Exit codes per §6: 0 on full success, 1 if any target failed, 254 on
/// a hard abort (configuration error, cycle detected before any work
/// could start, etc).
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;
pub const EXIT_ABORT: i32 = 254;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn targets_split_from_key_value_pairs() {
        let cli = Cli::parse_from(["portwright", "www/nginx", "WITH_DEBUG=yes", "devel/b"]);
        let (origins, env) = cli.origins_and_env();
        assert_eq!(origins, vec!["www/nginx", "devel/b"]);
        assert_eq!(env, vec![("WITH_DEBUG".to_string(), "yes".to_string())]);
    }

    #[test]
    fn fetch_only_flag_selects_fetch_mode() {
        let cli = Cli::parse_from(["portwright", "-f", "www/nginx"]);
        assert_eq!(cli.mode(), Mode::FetchOnly);
    }

    #[test]
    fn default_mode_is_install() {
        let cli = Cli::parse_from(["portwright", "www/nginx"]);
        assert_eq!(cli.mode(), Mode::Install);
    }
}
