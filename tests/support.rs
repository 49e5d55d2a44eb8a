//! A throwaway ports tree and a scripted `make`/`pkg` stand-in, shared by
//! `scenarios.rs`. Kept in its own module (rather than reusing `tool`'s
//! private `FakeTool`, which is `cfg(test)`-gated to the crate's own unit
//! tests and invisible here) the way the teacher keeps integration-test
//! fixtures separate from its own unit-test doubles.

#![allow(dead_code)]

use std::collections::HashMap;
use std::process::ExitStatus;
use std::sync::{Arc, Mutex};

use portwright::core::{Field, Origin, Stage};
use portwright::monitor::NullMonitor;
use portwright::scheduler::Scheduler;
use portwright::tool::{BuildTool, PackageTool};
use portwright::{Environment, Mode};

pub const TREE_ROOT: &str = "/usr/ports";

/// One port's declared shape: enough to render its `-V`-per-`Field`
/// query output.
#[derive(Clone, Default)]
pub struct PortFixture {
    pkgname: String,
    lib_deps: Vec<String>,
    run_deps: Vec<String>,
    build_deps: Vec<String>,
    fetch_deps: Vec<String>,
}

impl PortFixture {
    pub fn new(pkgname: &str) -> Self {
        PortFixture {
            pkgname: pkgname.to_string(),
            ..Default::default()
        }
    }

    pub fn lib(mut self, origin: &str) -> Self {
        self.lib_deps.push(origin.to_string());
        self
    }

    pub fn run(mut self, origin: &str) -> Self {
        self.run_deps.push(origin.to_string());
        self
    }

    pub fn build(mut self, origin: &str) -> Self {
        self.build_deps.push(origin.to_string());
        self
    }

    pub fn fetch(mut self, origin: &str) -> Self {
        self.fetch_deps.push(origin.to_string());
        self
    }

    fn lines(&self) -> Vec<String> {
        let mut lines = vec![String::new(); Field::ORDER.len()];
        let idx = |f: Field| Field::ORDER.iter().position(|x| *x == f).unwrap();
        lines[idx(Field::Pkgname)] = self.pkgname.clone();
        lines[idx(Field::DependLib)] = joined("lib", &self.lib_deps);
        lines[idx(Field::DependRun)] = joined("run", &self.run_deps);
        lines[idx(Field::DependBuild)] = joined("build", &self.build_deps);
        lines[idx(Field::DependFetch)] = joined("fetch", &self.fetch_deps);
        lines
    }
}

fn joined(field: &str, origins: &[String]) -> String {
    origins
        .iter()
        .map(|o| format!("{field}:{TREE_ROOT}/{o}"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// A scripted double for both tool traits, driving a small fixed ports
/// tree instead of a real `make`/`pkg`.
#[derive(Default)]
pub struct FixtureTool {
    ports: HashMap<Origin, PortFixture>,
    installed: Vec<String>,
    failing: Mutex<Vec<(Origin, Stage)>>,
    pub dispatched: Mutex<Vec<(Origin, String)>>,
}

impl FixtureTool {
    pub fn new() -> Self {
        FixtureTool::default()
    }

    pub fn port(mut self, origin: &str, fixture: PortFixture) -> Self {
        self.ports.insert(Origin::new(origin), fixture);
        self
    }

    pub fn installed(mut self, pkgname: &str) -> Self {
        self.installed.push(pkgname.to_string());
        self
    }

    pub fn fail(self, origin: &str, stage: Stage) -> Self {
        self.failing
            .lock()
            .unwrap()
            .push((Origin::new(origin), stage));
        self
    }

    /// The order every stage/clean dispatch happened in, as
    /// `"origin stagename"` pairs, for assertions on scheduling order.
    pub fn dispatch_log(&self) -> Vec<(Origin, String)> {
        self.dispatched.lock().unwrap().clone()
    }

    pub fn first_dispatch_index(&self, origin: &str, stage_name: &str) -> Option<usize> {
        let origin = Origin::new(origin);
        self.dispatch_log()
            .iter()
            .position(|(o, s)| *o == origin && s == stage_name)
    }
}

impl BuildTool for FixtureTool {
    fn query_attributes(&self, origin: &Origin) -> std::io::Result<Vec<String>> {
        self.ports.get(origin).map(PortFixture::lines).ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no such port in fixture tree: {origin}"),
            )
        })
    }

    fn run_stage(&self, origin: &Origin, stage: Stage) -> std::io::Result<ExitStatus> {
        self.dispatched
            .lock()
            .unwrap()
            .push((origin.clone(), stage.name().to_string()));
        let should_fail = self
            .failing
            .lock()
            .unwrap()
            .iter()
            .any(|(o, s)| o == origin && *s == stage);
        Ok(if should_fail {
            failure_status()
        } else {
            success_status()
        })
    }

    fn clean(&self, origin: &Origin) -> std::io::Result<ExitStatus> {
        self.dispatched
            .lock()
            .unwrap()
            .push((origin.clone(), "clean".to_string()));
        Ok(success_status())
    }
}

impl PackageTool for FixtureTool {
    fn list_installed(&self) -> std::io::Result<Vec<String>> {
        Ok(self.installed.clone())
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

#[cfg(unix)]
fn failure_status() -> ExitStatus {
    use std::os::unix::process::ExitStatusExt;
    ExitStatus::from_raw(1 << 8)
}

#[cfg(not(unix))]
fn failure_status() -> ExitStatus {
    use std::os::windows::process::ExitStatusExt;
    ExitStatus::from_raw(1)
}

fn test_environment(mode: Mode, no_op: bool) -> Environment {
    Environment {
        ports_dir: TREE_ROOT.to_string(),
        pkg_dbdir: None,
        chroot: None,
        jobs: 2,
        log_dir: None,
        no_op,
        debug: false,
        make_program: "make".to_string(),
        pkg_program: "pkg".to_string(),
        config_path: None,
        mode,
        batch: false,
    }
}

/// Builds a `Scheduler` wired to `tool`, adds every `target` as an
/// explicit CLI target at `mode`'s ceiling, and runs it to quiescence.
/// Returns the scheduler (for inspecting final port state) and every
/// origin that ended the run failed.
pub fn drive(tool: Arc<FixtureTool>, targets: &[&str], mode: Mode) -> (Scheduler, Vec<Origin>) {
    drive_opts(tool, targets, mode, false)
}

/// Like `drive`, but under `-n` no-op: every stage reports synthetic
/// success without the fixture's `run_stage`/`clean` ever being called
/// with an intent to mutate anything real.
pub fn drive_no_op(tool: Arc<FixtureTool>, targets: &[&str], mode: Mode) -> (Scheduler, Vec<Origin>) {
    drive_opts(tool, targets, mode, true)
}

fn drive_opts(
    tool: Arc<FixtureTool>,
    targets: &[&str],
    mode: Mode,
    no_op: bool,
) -> (Scheduler, Vec<Origin>) {
    let env = test_environment(mode, no_op);
    let build_tool: Arc<dyn BuildTool> = tool.clone();
    let package_tool: Arc<dyn PackageTool> = tool;
    let mut scheduler = Scheduler::new(&env, build_tool, package_tool).expect("scheduler construction");
    for target in targets {
        scheduler.add_target(Origin::new(*target), Some(mode.ceiling()));
    }
    let mut monitor = NullMonitor;
    let failed = scheduler.run(&mut monitor).expect("scheduler run");
    (scheduler, failed)
}
