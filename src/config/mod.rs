//! Layered configuration: built-in defaults, overridden by a TOML config
//! file, overridden by environment variables, overridden by CLI flags —
//! in that order of increasing precedence, the way the teacher layers
//! `.cargo/config.toml` beneath its own CLI.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::core::Stage;
use crate::Result;

/// The run's top-level intent, set by `-f`/`-p`/`-i`/`-u` (last flag on
/// the command line wins — see `cli`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Install,
    FetchOnly,
    Package,
}

impl Mode {
    /// The highest stage a run in this mode ever dispatches, absent an
    /// explicit `-b`/minimum-stage override.
    pub fn ceiling(self) -> Stage {
        match self {
            Mode::FetchOnly => Stage::Fetch,
            Mode::Install => Stage::Install,
            Mode::Package => Stage::Package,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct FileConfig {
    ports_dir: Option<String>,
    pkg_dbdir: Option<String>,
    chroot: Option<String>,
    jobs: Option<usize>,
    log_dir: Option<String>,
    make: Option<String>,
    pkg: Option<String>,
}

/// The CLI's view of the same knobs, already parsed by `clap`; `None`
/// means "not passed on the command line".
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub ports_dir: Option<String>,
    pub pkg_dbdir: Option<String>,
    pub chroot: Option<String>,
    pub jobs: Option<usize>,
    pub log_dir: Option<String>,
    pub no_op: bool,
    pub debug: bool,
    pub config_path: Option<PathBuf>,
    pub mode: Option<Mode>,
    pub batch: bool,
}

/// The fully resolved environment a run executes under.
#[derive(Debug, Clone)]
pub struct Environment {
    pub ports_dir: String,
    pub pkg_dbdir: Option<String>,
    pub chroot: Option<String>,
    pub jobs: usize,
    pub log_dir: Option<PathBuf>,
    pub no_op: bool,
    pub debug: bool,
    pub make_program: String,
    pub pkg_program: String,
    pub config_path: Option<PathBuf>,
    pub mode: Mode,
    /// `-b`: skip the interactive Config stage for every target.
    pub batch: bool,
}

impl Environment {
    pub fn load(overrides: CliOverrides) -> Result<Environment> {
        let config_path = overrides
            .config_path
            .clone()
            .or_else(default_config_path);

        let file: FileConfig = match &config_path {
            Some(path) if path.exists() => {
                let text = std::fs::read_to_string(path)?;
                toml::from_str(&text)?
            }
            _ => FileConfig::default(),
        };

        let ports_dir = overrides
            .ports_dir
            .or(file.ports_dir)
            .or_else(|| std::env::var("PORTSDIR").ok())
            .unwrap_or_else(|| "/usr/ports".to_string());
        let ports_dir = ports_dir.trim_end_matches('/').to_string();

        let pkg_dbdir = overrides
            .pkg_dbdir
            .or(file.pkg_dbdir)
            .or_else(|| std::env::var("PKG_DBDIR").ok());

        let chroot = overrides.chroot.or(file.chroot);

        let jobs = overrides
            .jobs
            .or(file.jobs)
            .unwrap_or_else(default_job_count);

        let log_dir = overrides
            .log_dir
            .or(file.log_dir)
            .map(PathBuf::from);

        let make_program = file.make.unwrap_or_else(|| "make".to_string());
        let pkg_program = file.pkg.unwrap_or_else(|| "pkg".to_string());
        let mode = overrides.mode.unwrap_or_default();

        Ok(Environment {
            ports_dir,
            pkg_dbdir,
            chroot,
            jobs,
            log_dir,
            no_op: overrides.no_op,
            debug: overrides.debug,
            make_program,
            pkg_program,
            config_path,
            mode,
            batch: overrides.batch,
        })
    }
}

fn default_job_count() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

fn default_config_path() -> Option<PathBuf> {
    let home = std::env::var_os("HOME")?;
    let candidate = Path::new(&home).join(".config/portwright/config.toml");
    Some(candidate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_overrides_beat_the_file_and_defaults() {
        let overrides = CliOverrides {
            ports_dir: Some("/srv/ports".to_string()),
            jobs: Some(4),
            no_op: true,
            config_path: Some(PathBuf::from("/nonexistent/config.toml")),
            ..Default::default()
        };
        let env = Environment::load(overrides).unwrap();
        assert_eq!(env.ports_dir, "/srv/ports");
        assert_eq!(env.jobs, 4);
        assert!(env.no_op);
    }

    #[test]
    fn falls_back_to_the_default_ports_dir() {
        let overrides = CliOverrides {
            config_path: Some(PathBuf::from("/nonexistent/config.toml")),
            ..Default::default()
        };
        let env = Environment::load(overrides).unwrap();
        assert_eq!(env.ports_dir, "/usr/ports");
    }
}
