//! The read-only contract between the scheduler and an external monitor
//! (the terminal dashboard, out of scope per §1/§6). The scheduler never
//! imports a concrete monitor; it only ever produces a [`Snapshot`] on
//! request, so a caller on the other side of this seam — a TUI, a log
//! line, a test assertion — can render or assert against it without
//! reaching into scheduler internals.

use crate::core::{InstallStatus, Origin, Stage};

/// Which of the five status classes a port currently occupies, for
/// monitor rendering purposes. Orthogonal to `Stage`: a port can be
/// `Queued` for `Stage::Build` while already `Done` with `Stage::Fetch`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    Pending,
    Queued,
    Active,
    Failed,
    Done,
}

/// One port's row in a monitor snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortSnapshot {
    pub origin: Origin,
    pub stage: Option<Stage>,
    pub status: StatusClass,
    pub install_status: InstallStatus,
    /// Seconds since the epoch the current stage started, if `working`.
    pub working_since: Option<i64>,
}

/// A point-in-time view of every port the scheduler knows about, grouped
/// by stage. `Scheduler::snapshot` produces one of these per tick;
/// nothing else in the core constructs or mutates it.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub ports: Vec<PortSnapshot>,
}

impl Snapshot {
    pub fn by_status(&self, status: StatusClass) -> impl Iterator<Item = &PortSnapshot> {
        self.ports.iter().filter(move |p| p.status == status)
    }

    pub fn failed_origins(&self) -> Vec<Origin> {
        self.by_status(StatusClass::Failed)
            .map(|p| p.origin.clone())
            .collect()
    }
}

/// The minimal capability set a monitor implementation needs: start once,
/// accept a snapshot on every tick, stop on shutdown. A numeric monitor
/// driven by `-w SEC` and a full-screen dashboard both implement this the
/// same way; the core depends on neither.
pub trait Monitor {
    fn start(&mut self) {}
    fn tick(&mut self, snapshot: &Snapshot);
    fn stop(&mut self) {}
}

/// A monitor that does nothing, for runs with no attached UI (e.g. `-n`
/// no-op dry runs or library embedding).
#[derive(Debug, Default)]
pub struct NullMonitor;

impl Monitor for NullMonitor {
    fn tick(&mut self, _snapshot: &Snapshot) {}
}

/// The `-w SEC` monitor: a line of per-status counts, printed no more
/// often than once every `delay` seconds.
#[derive(Debug)]
pub struct NumericMonitor {
    delay: std::time::Duration,
    last: Option<std::time::Instant>,
}

impl NumericMonitor {
    pub fn new(delay_secs: u64) -> Self {
        NumericMonitor {
            delay: std::time::Duration::from_secs(delay_secs.max(1)),
            last: None,
        }
    }

    fn due(&self) -> bool {
        match self.last {
            Some(last) => last.elapsed() >= self.delay,
            None => true,
        }
    }
}

impl Monitor for NumericMonitor {
    fn tick(&mut self, snapshot: &Snapshot) {
        if !self.due() {
            return;
        }
        self.last = Some(std::time::Instant::now());
        let pending = snapshot.by_status(StatusClass::Pending).count();
        let queued = snapshot.by_status(StatusClass::Queued).count();
        let active = snapshot.by_status(StatusClass::Active).count();
        let failed = snapshot.by_status(StatusClass::Failed).count();
        let done = snapshot.by_status(StatusClass::Done).count();
        #[allow(clippy::print_stdout)]
        {
            println!(
                "pending={pending} queued={queued} active={active} failed={failed} done={done}"
            );
        }
    }
}
