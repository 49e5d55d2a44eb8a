//! Seams between the orchestrator and the two external programs it
//! shells out to. The concrete `make`/`pkg` argument conventions are
//! deliberately not specified here (that's an external contract this
//! crate treats as out of scope) — `SystemBuildTool`/`SystemPackageTool`
//! hold just enough to dispatch a target and capture output; anything
//! test code needs beyond that goes through `FakeTool`.

use std::io;
use std::process::ExitStatus;

use crate::core::{Field, Origin, Stage};

/// Runs queries and stage targets against one port's directory in the
/// ports tree.
pub trait BuildTool: Send + Sync {
    /// Queries every `Field` in declared order via one invocation, and
    /// returns its stdout split into lines (one per `-V`).
    fn query_attributes(&self, origin: &Origin) -> io::Result<Vec<String>>;

    /// Dispatches the external work for `stage`. Blocks the calling
    /// thread; callers run this off the event loop.
    fn run_stage(&self, origin: &Origin, stage: Stage) -> io::Result<ExitStatus>;

    /// Dispatches a `clean` of the port's work directory.
    fn clean(&self, origin: &Origin) -> io::Result<ExitStatus>;
}

/// Queries the installed-package database.
pub trait PackageTool: Send + Sync {
    /// Every installed package, as `name-version[_revision][,epoch]`
    /// strings, for `PackageDb` to index.
    fn list_installed(&self) -> io::Result<Vec<String>>;
}

/// The real `make`-backed `BuildTool`, realizing the invocation contract
/// of §6: `make -C <PORTSDIR>/<origin> <targets…> [-D FLAG | VAR="value"
/// …]`, with batch/no-clean-depends defaults injected unless the target
/// is `config` (which must stay interactive) or `clean` (which must
/// depend-clean). In no-op mode, every dispatch is rendered through
/// `shell-escape` and traced instead of executed, and reports success.
pub struct SystemBuildTool {
    pub program: String,
    pub tree_root: String,
    pub chroot: Option<String>,
    pub no_op: bool,
    pub batch: bool,
    /// `-D FLAG` defines, from repeated `-D` CLI flags.
    pub defines: Vec<String>,
    /// `VAR=value` positionals routed into the build tool's environment.
    pub vars: Vec<(String, String)>,
}

impl SystemBuildTool {
    pub fn new(program: impl Into<String>, tree_root: impl Into<String>, no_op: bool) -> Self {
        SystemBuildTool {
            program: program.into(),
            tree_root: tree_root.into(),
            chroot: None,
            no_op,
            batch: false,
            defines: Vec::new(),
            vars: Vec::new(),
        }
    }

    fn port_dir(&self, origin: &Origin) -> std::path::PathBuf {
        let root = match &self.chroot {
            Some(chroot) => format!("{chroot}{}", self.tree_root),
            None => self.tree_root.clone(),
        };
        std::path::Path::new(&root).join(origin.as_str())
    }

    fn argv(&self, origin: &Origin, targets: &[&str]) -> Vec<String> {
        let mut args = vec!["-C".to_string(), self.port_dir(origin).display().to_string()];
        args.extend(targets.iter().map(|s| s.to_string()));

        let is_config_only = targets == ["config"];
        let is_clean = targets.contains(&"clean");
        if self.batch && !is_config_only {
            args.push("BATCH=yes".to_string());
        }
        if !is_clean {
            args.push("NOCLEANDEPENDS=yes".to_string());
        }
        for flag in &self.defines {
            args.push("-D".to_string());
            args.push(flag.clone());
        }
        for (key, value) in &self.vars {
            args.push(format!("{key}={value}"));
        }
        args
    }

    fn dispatch(&self, origin: &Origin, targets: &[&str]) -> io::Result<ExitStatus> {
        let args = self.argv(origin, targets);
        if self.no_op {
            let rendered = portwright_util::render_argv(&self.program, &args);
            tracing::info!(origin = %origin, argv = %rendered, "no-op dispatch");
            return Ok(success_status());
        }
        let mut cmd = portwright_util::hygienic_command(&self.program);
        cmd.args(&args);
        portwright_util::spawn_and_wait(&mut cmd)
    }
}

impl BuildTool for SystemBuildTool {
    fn query_attributes(&self, origin: &Origin) -> io::Result<Vec<String>> {
        let mut targets: Vec<&str> = Vec::with_capacity(Field::ORDER.len() * 2);
        for field in Field::ORDER {
            targets.push("-V");
            targets.push(field.var());
        }
        // Attribute queries are read-only; even in no-op mode we need
        // real data to drive the rest of the run, so this dispatch
        // always executes regardless of `self.no_op`.
        let mut cmd = portwright_util::hygienic_command(&self.program);
        cmd.args(self.argv(origin, &targets));
        let output = portwright_util::spawn_and_collect(&mut cmd)?;
        let text = String::from_utf8_lossy(&output.stdout);
        Ok(text.lines().map(str::to_string).collect())
    }

    fn run_stage(&self, origin: &Origin, stage: Stage) -> io::Result<ExitStatus> {
        self.dispatch(origin, &[stage.name()])
    }

    fn clean(&self, origin: &Origin) -> io::Result<ExitStatus> {
        self.dispatch(origin, &["clean"])
    }
}

#[cfg(unix)]
fn success_status() -> ExitStatus {
    use std::os::unix::process::ExitStatusExt;
    ExitStatus::from_raw(0)
}

#[cfg(not(unix))]
fn success_status() -> ExitStatus {
    use std::os::windows::process::ExitStatusExt;
    ExitStatus::from_raw(0)
}

/// The real `pkg`-backed `PackageTool`.
pub struct SystemPackageTool {
    pub program: String,
    pub chroot: Option<String>,
}

impl SystemPackageTool {
    pub fn new(program: impl Into<String>, chroot: Option<String>) -> Self {
        SystemPackageTool {
            program: program.into(),
            chroot,
        }
    }

    fn base_args(&self) -> Vec<String> {
        match &self.chroot {
            Some(root) => vec!["-c".to_string(), root.clone()],
            None => Vec::new(),
        }
    }
}

impl PackageTool for SystemPackageTool {
    fn list_installed(&self) -> io::Result<Vec<String>> {
        let mut cmd = portwright_util::hygienic_command(&self.program);
        cmd.env("ASSUME_ALWAYS_YES", "YES");
        cmd.args(self.base_args()).arg("query").arg("%n-%v");
        let output = portwright_util::spawn_and_collect(&mut cmd)?;
        let text = String::from_utf8_lossy(&output.stdout);
        Ok(text.lines().map(str::to_string).collect())
    }
}
