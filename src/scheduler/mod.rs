//! The event loop and stage queues (§4.7, §5): a single-threaded
//! dispatcher that owns the [`World`], pops ready jobs out of one
//! [`StageQueue`] per stage, and hands the actual work off to
//! [`crate::process`]. Completions funnel back in as [`Event`]s; the
//! loop itself never blocks on a child process.

pub mod queue;

use std::collections::HashMap;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;

use jiff::Timestamp;

use crate::cache::Cache;
use crate::config::Environment;
use crate::core::{
    Attributes, GraphEvent, Origin, Port, PrepareOutcome, ResolutionState, Stage, World,
};
use crate::loader;
use crate::monitor::{Monitor, PortSnapshot, Snapshot, StatusClass};
use crate::pkgdb::PackageDb;
use crate::process;
use crate::tool::{BuildTool, PackageTool};

use queue::StageQueue;

/// What the event loop reacts to. Subprocess completions and attribute
/// loads are the only sources that arrive from another thread; timer
/// ticks and interrupts are driven by the binary's own loop (§2).
pub enum Event {
    AttributesLoaded(Origin, std::io::Result<Attributes>),
    StageFinished(Origin, Stage, bool),
    CleanFinished(Origin, bool),
    Tick,
    Interrupt,
}

/// Drives every requested origin, and everything it transitively depends
/// on, through the stage pipeline.
pub struct Scheduler {
    world: World,
    cache: Cache,
    pkgdb: PackageDb,
    build_tool: Arc<dyn BuildTool>,
    package_tool: Arc<dyn PackageTool>,
    jobserver: jobserver::Client,
    queues: HashMap<Stage, StageQueue>,
    clean_queue: StageQueue,
    /// Explicit CLI targets map to `env.mode`'s ceiling, or `None` for an
    /// index-only run that wants attributes loaded but nothing built;
    /// everything else discovered as a dependency defaults to
    /// `dependency_ceiling`.
    ceilings: HashMap<Origin, Option<Stage>>,
    /// The ceiling a dependency discovered along the way (never an
    /// explicit CLI target) is driven to: `env.mode`'s ceiling, capped at
    /// `Stage::Install`. Any dependency kind's resolution predicate
    /// requires the peer actually installed (§4.4's `_verify`), so a
    /// dependency always wants at least Install — but never more: the
    /// original's `Port.fetch_only` is a single global switch that caps
    /// *every* port, targets and dependencies alike, at Fetch (§8
    /// scenario 5); nothing here should drive a mere dependency past
    /// what the run's own mode is willing to do.
    dependency_ceiling: Stage,
    /// Whether the run is `-n` no-op: stage dispatch still happens (so
    /// the dependency graph and monitor behave normally) but installs
    /// never really land, so `finalize_stage` must not let a synthetic
    /// success flip `install_status` (§8: "final install_status is
    /// unchanged").
    no_op: bool,
    /// Origins whose own stage failed at some point this run. `Port::failed`
    /// is sticky only until its clean succeeds (§4.4), at which point the
    /// world considers it a clean resumable state again — but this run still
    /// owes the caller a non-zero exit for it, and the scheduler must not
    /// mistake the reset for permission to resubmit the same stage forever.
    run_failed: std::collections::HashSet<Origin>,
    linked: bool,
    batch: bool,
    tx: Sender<Event>,
    rx: Receiver<Event>,
    shutting_down: bool,
}

impl Scheduler {
    pub fn new(
        env: &Environment,
        build_tool: Arc<dyn BuildTool>,
        package_tool: Arc<dyn PackageTool>,
    ) -> crate::Result<Scheduler> {
        let pkgdb = PackageDb::load(package_tool.as_ref())?;
        let jobserver = jobserver::Client::new(env.jobs.max(1))?;
        let (tx, rx) = mpsc::channel();

        let mut queues = HashMap::new();
        queues.insert(Stage::Config, StageQueue::new(1));
        for stage in [Stage::Fetch, Stage::Build, Stage::Install, Stage::Package] {
            queues.insert(stage, StageQueue::new(env.jobs));
        }

        Ok(Scheduler {
            world: World::new(env.ports_dir.clone()),
            cache: Cache::new(),
            pkgdb,
            build_tool,
            package_tool,
            jobserver,
            queues,
            clean_queue: StageQueue::new(env.jobs),
            ceilings: HashMap::new(),
            dependency_ceiling: env.mode.ceiling().min(Stage::Install),
            no_op: env.no_op,
            run_failed: std::collections::HashSet::new(),
            linked: false,
            batch: env.batch,
            tx,
            rx,
            shutting_down: false,
        })
    }

    /// Registers `origin` as an explicit CLI target, bound for `ceiling`
    /// (derived from `Environment::mode` by the caller), and kicks off
    /// its attribute construction. `ceiling` of `None` loads attributes
    /// only and never dispatches a stage — used by `--index`.
    pub fn add_target(&mut self, origin: Origin, ceiling: Option<Stage>) {
        self.ceilings.insert(origin.clone(), ceiling);
        self.request(origin);
    }

    fn request(&mut self, origin: Origin) {
        if self.cache.request(&origin) {
            loader::spawn_load(
                self.build_tool.clone(),
                self.world.tree_root.clone(),
                origin,
                {
                    let tx = self.tx.clone();
                    move |origin, result| {
                        let _ = tx.send(Event::AttributesLoaded(origin, result));
                    }
                },
            );
        }
    }

    /// Runs the event loop to quiescence: every target either installed
    /// (or fetched/packaged, per mode), failed, or blocked on a cycle.
    /// Returns the origins that ended the run `failed`.
    pub fn run(&mut self, monitor: &mut dyn Monitor) -> crate::Result<Vec<Origin>> {
        monitor.start();
        loop {
            if self.is_quiescent() {
                break;
            }
            let event = match self.rx.recv() {
                Ok(event) => event,
                Err(_) => break,
            };
            let interrupted = matches!(event, Event::Interrupt);
            self.handle(event);
            monitor.tick(&self.snapshot());
            if interrupted {
                self.shutdown();
                break;
            }
        }
        monitor.tick(&self.snapshot());
        monitor.stop();
        Ok(self.failed_origins())
    }

    fn is_quiescent(&self) -> bool {
        self.linked
            && self.cache.is_quiescent()
            && self.queues.values().all(StageQueue::is_idle)
            && self.clean_queue.is_idle()
    }

    fn handle(&mut self, event: Event) {
        match event {
            Event::AttributesLoaded(origin, Ok(attrs)) => self.on_attributes_loaded(origin, attrs),
            Event::AttributesLoaded(origin, Err(err)) => {
                tracing::warn!(%origin, error = %err, "attribute load failed");
                self.cache.mark_negative(&origin);
            }
            Event::StageFinished(origin, stage, success) => {
                self.on_stage_finished(origin, stage, success)
            }
            Event::CleanFinished(origin, success) => self.on_clean_finished(origin, success),
            Event::Tick => {}
            Event::Interrupt => {}
        }
        self.maybe_link();
        self.pump();
    }

    fn on_attributes_loaded(&mut self, origin: Origin, attrs: Attributes) {
        let declared_name = crate::core::split_name_version(&attrs.pkgname).0;
        let install_status = crate::core::install_status(
            self.pkgdb.installed_pkgname(declared_name),
            &attrs.pkgname,
        );
        let dependency_origins = attrs.dependency_origins();
        let mut port = Port::new(origin.clone(), attrs, install_status);
        if self.batch {
            port.stage = Stage::Config.level();
        }
        self.world.insert_port(port);
        self.cache.mark_ready(&origin);
        for dep in dependency_origins {
            self.request(dep);
        }
    }

    fn on_stage_finished(&mut self, origin: Origin, stage: Stage, success: bool) {
        if let Some(q) = self.queues.get_mut(&stage) {
            q.finish(&origin);
        }
        if !success {
            self.run_failed.insert(origin.clone());
        }
        let outcome = self
            .world
            .finalize_stage(&origin, stage, success, self.no_op, &mut log_event);
        if outcome.schedule_clean {
            self.clean_queue.submit_ready(origin);
        } else {
            self.advance(&origin);
        }
        self.wake_all_stalled();
    }

    fn on_clean_finished(&mut self, origin: Origin, success: bool) {
        self.clean_queue.finish(&origin);
        let was_run_failure = self.run_failed.contains(&origin);
        self.world.finalize_clean(&origin, success, &mut log_event);
        // A clean that recovers from this run's own stage failure frees the
        // work directory for a future invocation (§4.4) but must not be
        // mistaken for permission to resubmit the same stage again now —
        // that origin is done for this run, successful or not. A clean that
        // follows a normal post-Install tidy-up still needs `advance` to
        // push the port on toward Package.
        if !was_run_failure {
            self.advance(&origin);
        }
        self.wake_all_stalled();
    }

    /// Once every requested origin (including every dependency
    /// discovered along the way) has either landed or negatively
    /// cached, builds every port's `DependHandler` from scratch, runs
    /// cycle detection once, and starts driving every port's own stage
    /// pipeline.
    fn maybe_link(&mut self) {
        if self.linked || !self.cache.is_quiescent() {
            return;
        }
        let origins: Vec<Origin> = self.world.ports.keys().cloned().collect();
        for origin in &origins {
            self.world.rebuild_depend_handler(origin, &mut log_event);
        }
        self.world.detect_cycles(&mut log_event);
        self.linked = true;
        for origin in origins {
            self.advance(&origin);
        }
    }

    /// Pushes `origin` into the queue for its next not-yet-completed
    /// stage, if it has one below its ceiling and isn't already
    /// in flight or failed.
    fn advance(&mut self, origin: &Origin) {
        let Some(port) = self.world.ports.get(origin) else {
            return;
        };
        if port.failed || port.is_working() {
            return;
        }
        let Some(ceiling) = self
            .ceilings
            .get(origin)
            .copied()
            .unwrap_or(Some(self.dependency_ceiling))
        else {
            return;
        };
        if port.stage >= ceiling.level() {
            return;
        }
        let Some(next) = Stage::from_level(port.stage + 1) else {
            return;
        };
        if let Some(q) = self.queues.get_mut(&next) {
            q.submit_ready(origin.clone());
        }
    }

    /// Re-tests every stalled job's admission predicate. Called after
    /// any event that could have changed a `DependHandler`'s status.
    fn wake_all_stalled(&mut self) {
        for queue in self.queues.values_mut() {
            queue.wake_stalled();
        }
    }

    /// Admits as many ready jobs as each queue's headroom and the
    /// dependency predicate allow, across every stage.
    fn pump(&mut self) {
        for stage in Stage::ALL {
            self.pump_stage(stage);
        }
        self.pump_clean();
    }

    fn pump_stage(&mut self, stage: Stage) {
        loop {
            let Some(queue) = self.queues.get_mut(&stage) else {
                return;
            };
            let Some(origin) = queue.pop_ready() else {
                return;
            };
            match self.world.check(&origin, stage) {
                ResolutionState::Resolved | ResolutionState::PartlyResolved => {
                    let now = Timestamp::now();
                    match self.world.prepare_stage(&origin, stage, now, &mut log_event) {
                        PrepareOutcome::Dispatch => {
                            self.queues.get_mut(&stage).unwrap().admit(origin.clone());
                            self.dispatch_stage(origin, stage);
                        }
                        PrepareOutcome::AlreadyDone => self.advance(&origin),
                        PrepareOutcome::Failed => {}
                    }
                }
                ResolutionState::Unresolved => {
                    self.queues.get_mut(&stage).unwrap().defer(origin);
                }
                ResolutionState::Failure => {}
            }
        }
    }

    fn pump_clean(&mut self) {
        loop {
            let Some(origin) = self.clean_queue.pop_ready() else {
                return;
            };
            self.clean_queue.admit(origin.clone());
            let tx = self.tx.clone();
            process::spawn_clean(
                self.build_tool.clone(),
                self.jobserver_client(),
                origin,
                move |origin, success| {
                    let _ = tx.send(Event::CleanFinished(origin, success));
                },
            );
        }
    }

    fn dispatch_stage(&mut self, origin: Origin, stage: Stage) {
        let tx = self.tx.clone();
        process::spawn_stage(
            self.build_tool.clone(),
            self.jobserver_client(),
            origin,
            stage,
            move |origin, stage, success| {
                let _ = tx.send(Event::StageFinished(origin, stage, success));
            },
        );
    }

    fn jobserver_client(&self) -> jobserver::Client {
        // `jobserver::Client` is cheaply `Clone`; every in-flight
        // invocation gets its own handle onto the same shared token pool.
        self.jobserver.clone()
    }

    /// User-initiated stop (§5): every port still `working` is treated
    /// as failed, so its dependants observe a consistent outcome rather
    /// than hanging forever on an abandoned job.
    pub fn shutdown(&mut self) {
        if self.shutting_down {
            return;
        }
        self.shutting_down = true;
        let working: Vec<Origin> = self
            .world
            .ports
            .iter()
            .filter(|(_, p)| p.is_working())
            .map(|(o, _)| o.clone())
            .collect();
        for origin in working {
            // `working` implies `port.stage` already reflects the
            // in-flight stage (`prepare_stage` sets it at dispatch time,
            // not on completion).
            if let Some(stage) = self.world.ports.get(&origin).and_then(|p| Stage::from_level(p.stage)) {
                self.world
                    .finalize_stage(&origin, stage, false, self.no_op, &mut log_event);
            }
        }
    }

    fn failed_origins(&self) -> Vec<Origin> {
        let mut origins: Vec<Origin> = self
            .world
            .ports
            .iter()
            .filter(|(_, p)| p.failed)
            .map(|(o, _)| o.clone())
            .collect();
        for origin in &self.run_failed {
            if !origins.contains(origin) {
                origins.push(origin.clone());
            }
        }
        origins
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    /// A read-only view for the monitor (§6's contract): one row per
    /// port, its stage, and which of the five status classes it's in.
    pub fn snapshot(&self) -> Snapshot {
        let mut ports = Vec::with_capacity(self.world.ports.len());
        for (origin, port) in &self.world.ports {
            let stage = Stage::from_level(port.stage);
            let ceiling = self
                .ceilings
                .get(origin)
                .copied()
                .unwrap_or(Some(self.dependency_ceiling));
            let status = if port.failed || self.run_failed.contains(origin) {
                StatusClass::Failed
            } else if port.is_working() {
                StatusClass::Active
            } else if self.queues.values().any(|q| q.is_waiting(origin))
                || self.clean_queue.is_waiting(origin)
            {
                StatusClass::Queued
            } else if ceiling.is_none_or(|c| c.level() <= port.stage) {
                StatusClass::Done
            } else {
                StatusClass::Pending
            };
            ports.push(PortSnapshot {
                origin: origin.clone(),
                stage,
                status,
                install_status: port.install_status,
                working_since: port.working.map(|t| t.as_second()),
            });
        }
        ports.sort_by(|a, b| a.origin.as_str().cmp(b.origin.as_str()));
        Snapshot { ports }
    }
}

fn log_event(event: GraphEvent) {
    match event {
        GraphEvent::StaleDependency { origin, kind, peer } => {
            tracing::warn!(%origin, kind = kind.name(), %peer, "stale dependency: origin not in the ports tree");
        }
        GraphEvent::DuplicateDependency { origin, kind, peer } => {
            tracing::warn!(%origin, kind = kind.name(), %peer, "duplicate dependency declaration");
        }
        GraphEvent::CycleDetected { origin } => {
            tracing::error!(%origin, "dependency cycle detected");
        }
    }
}
