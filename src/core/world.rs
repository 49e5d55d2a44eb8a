//! The owning struct for every `Port` and `DependHandler` in a run.
//!
//! Modeling the dependency graph as two `IndexMap`s keyed by `Origin`,
//! rather than `Rc<RefCell<Port>>` nodes with back-pointers, sidesteps
//! the aliasing problems a cyclic graph with back-edges would otherwise
//! cause: every operation borrows `World` mutably for its duration and
//! indexes into the maps by key, never holding two live borrows of the
//! same node at once.

use std::collections::HashSet;

use indexmap::IndexMap;
use jiff::Timestamp;

use crate::core::depend::{DependHandler, GraphEvent};
use crate::core::origin::Origin;
use crate::core::port::Port;
use crate::core::stage::{DependKind, InstallStatus, ResolutionState, Stage};

/// What a caller should do after `World::prepare_stage` returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrepareOutcome {
    /// The port is already at or past the requested stage; treat as a
    /// no-op success.
    AlreadyDone,
    /// Preconditions hold; `port.stage` and `port.working` have been
    /// updated and the caller should dispatch the external work.
    Dispatch,
    /// A precondition failed; `port.failed` has been set and dependants
    /// notified. The caller should not dispatch.
    Failed,
}

/// What `World::finalize_stage` determined the caller should do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FinalizeOutcome {
    pub schedule_clean: bool,
}

pub struct World {
    pub ports: IndexMap<Origin, Port>,
    pub depends: IndexMap<Origin, DependHandler>,
    pub tree_root: String,
}

impl World {
    pub fn new(tree_root: impl Into<String>) -> Self {
        World {
            ports: IndexMap::new(),
            depends: IndexMap::new(),
            tree_root: tree_root.into(),
        }
    }

    pub fn has_port(&self, origin: &Origin) -> bool {
        self.ports.contains_key(origin)
    }

    pub fn insert_port(&mut self, port: Port) {
        self.ports.insert(port.origin.clone(), port);
    }

    fn ensure_handler(&mut self, origin: &Origin) {
        if !self.depends.contains_key(origin) {
            self.depends
                .insert(origin.clone(), DependHandler::new(origin.clone()));
        }
    }

    // ---- graph construction -------------------------------------------------

    /// (Re)builds `origin`'s `DependHandler` from its current attribute
    /// map. Safe to call again after a reconfiguration: any edges from a
    /// prior build are first unwired from their peers' back-edge sets.
    pub fn rebuild_depend_handler(&mut self, origin: &Origin, log: &mut dyn FnMut(GraphEvent)) {
        if let Some(old) = self.depends.get(origin) {
            let stale: Vec<(DependKind, Origin)> = DependKind::ALL
                .iter()
                .flat_map(|k| old.dependencies_of(*k).iter().map(move |p| (*k, p.clone())))
                .collect();
            for (kind, peer) in stale {
                if let Some(peer_handler) = self.depends.get_mut(&peer) {
                    peer_handler
                        .dependants_mut(kind)
                        .retain(|(_, dependant)| dependant != origin);
                }
            }
        }
        self.depends
            .insert(origin.clone(), DependHandler::new(origin.clone()));

        let attrs = self.ports[origin].attrs.clone();
        for kind in DependKind::ALL {
            for entry in attrs.depends_of(kind) {
                self.add_dependency(origin, &entry.field, &entry.origin, kind, log);
            }
        }
        self.recompute_status(origin, log);
    }

    /// Wires a single `origin -> peer` edge of the given kind. Stale
    /// (peer not in `ports`) and duplicate (already wired) edges are
    /// logged and skipped rather than treated as errors.
    fn add_dependency(
        &mut self,
        origin: &Origin,
        field: &str,
        peer: &Origin,
        kind: DependKind,
        log: &mut dyn FnMut(GraphEvent),
    ) {
        if !self.ports.contains_key(peer) {
            log(GraphEvent::StaleDependency {
                origin: origin.clone(),
                kind,
                peer: peer.clone(),
            });
            return;
        }
        if self.depends[origin].dependencies_of(kind).contains(peer) {
            log(GraphEvent::DuplicateDependency {
                origin: origin.clone(),
                kind,
                peer: peer.clone(),
            });
            return;
        }

        self.ensure_handler(peer);
        let peer_status = self.depends[peer].status;

        let handler = self.depends.get_mut(origin).unwrap();
        handler.dependencies_mut(kind).insert(peer.clone());
        handler
            .last_peer_status_mut()
            .insert((kind, peer.clone()), peer_status);
        if peer_status != ResolutionState::Resolved {
            handler.unresolved_count += 1;
        }

        let peer_handler = self.depends.get_mut(peer).unwrap();
        peer_handler
            .dependants_mut(kind)
            .insert((field.to_string(), origin.clone()));

        if peer_status == ResolutionState::Failure {
            self.fail_and_propagate(origin, log);
        }
    }

    /// Walks the full dependency graph once, after every requested port
    /// has landed, looking for a cycle (§9: the source's recursive
    /// attribute retrieval can deadlock on one; this implementation
    /// never recurses to build the graph, so instead it fails the node
    /// whose DFS frame re-enters itself before any stage is admitted).
    pub fn detect_cycles(&mut self, log: &mut dyn FnMut(GraphEvent)) {
        let origins: Vec<Origin> = self.ports.keys().cloned().collect();
        let mut visited: HashSet<Origin> = HashSet::new();
        let mut cyclic: Vec<Origin> = Vec::new();
        for origin in &origins {
            if !visited.contains(origin) {
                let mut stack: Vec<Origin> = Vec::new();
                let mut in_stack: HashSet<Origin> = HashSet::new();
                self.dfs_cycle(origin, &mut visited, &mut stack, &mut in_stack, &mut cyclic);
            }
        }
        for origin in cyclic {
            log(GraphEvent::CycleDetected {
                origin: origin.clone(),
            });
            self.fail_and_propagate(&origin, log);
        }
    }

    fn dfs_cycle(
        &self,
        origin: &Origin,
        visited: &mut HashSet<Origin>,
        stack: &mut Vec<Origin>,
        in_stack: &mut HashSet<Origin>,
        cyclic: &mut Vec<Origin>,
    ) {
        visited.insert(origin.clone());
        stack.push(origin.clone());
        in_stack.insert(origin.clone());
        if let Some(handler) = self.depends.get(origin) {
            for kind in DependKind::ALL {
                for peer in handler.dependencies_of(kind) {
                    if in_stack.contains(peer) {
                        cyclic.push(origin.clone());
                    } else if !visited.contains(peer) {
                        self.dfs_cycle(peer, visited, stack, in_stack, cyclic);
                    }
                }
            }
        }
        stack.pop();
        in_stack.remove(origin);
    }

    // ---- resolution queries --------------------------------------------------

    /// Whether `origin`'s dependencies satisfy admission to `stage`.
    /// `Resolved` means every kind is settled; `PartlyResolved` means
    /// only the kinds `stage` actually needs are settled — both are
    /// sufficient to admit the stage, since the required-kind subset is
    /// already the correct one for `stage` (§4.3's per-stage table).
    pub fn check(&self, origin: &Origin, stage: Stage) -> ResolutionState {
        let Some(handler) = self.depends.get(origin) else {
            return ResolutionState::Resolved;
        };
        if handler.status == ResolutionState::Failure {
            return ResolutionState::Failure;
        }
        if stage == Stage::Config || handler.unresolved_count == 0 {
            return ResolutionState::Resolved;
        }
        let required = DependKind::required_for(stage);
        let mut any_failure = false;
        let all_resolved = required.iter().all(|kind| {
            handler.dependencies_of(*kind).iter().all(|peer| {
                match self.depends.get(peer).map(|h| h.status) {
                    Some(ResolutionState::Resolved) => true,
                    Some(ResolutionState::Failure) => {
                        any_failure = true;
                        false
                    }
                    _ => false,
                }
            })
        });
        if any_failure {
            ResolutionState::Failure
        } else if all_resolved {
            ResolutionState::PartlyResolved
        } else {
            ResolutionState::Unresolved
        }
    }

    /// The predicate a port's own resolution hinges on, once it isn't
    /// `failed`. A single point of extension: today it is exactly
    /// "installed and not Absent", matching the design's stated rule,
    /// but a future predicate (e.g. checksums) only has to change here.
    fn verify(&self, origin: &Origin) -> bool {
        self.ports
            .get(origin)
            .map(|p| p.install_status > InstallStatus::Absent)
            .unwrap_or(false)
    }

    /// Call whenever a port's own `failed` or `install_status` changes.
    /// Recomputes its handler's `status` and, if that changed, cascades
    /// the update to every dependant.
    pub fn status_changed(&mut self, origin: &Origin, log: &mut dyn FnMut(GraphEvent)) {
        self.recompute_status(origin, log);
    }

    fn recompute_status(&mut self, origin: &Origin, log: &mut dyn FnMut(GraphEvent)) {
        let Some(port) = self.ports.get(origin) else {
            return;
        };
        let new_status = if port.failed {
            ResolutionState::Failure
        } else if self.verify(origin) {
            ResolutionState::Resolved
        } else {
            ResolutionState::Unresolved
        };

        self.ensure_handler(origin);
        let handler = self.depends.get_mut(origin).unwrap();
        let changed = handler.status != new_status;
        handler.status = new_status;
        if new_status == ResolutionState::Resolved {
            handler.unresolved_count = 0;
        }
        if changed {
            self.notify_dependants(origin, log);
        }
    }

    fn fail_and_propagate(&mut self, origin: &Origin, log: &mut dyn FnMut(GraphEvent)) {
        if self.ports.get(origin).map(|p| p.failed).unwrap_or(false) {
            return;
        }
        if let Some(port) = self.ports.get_mut(origin) {
            port.failed = true;
        }
        self.recompute_status(origin, log);
    }

    fn notify_dependants(&mut self, origin: &Origin, log: &mut dyn FnMut(GraphEvent)) {
        let Some(handler) = self.depends.get(origin) else {
            return;
        };
        let edges: Vec<(DependKind, Origin)> = DependKind::ALL
            .iter()
            .flat_map(|k| {
                handler
                    .dependants_of(*k)
                    .iter()
                    .map(move |(_, dependant)| (*k, dependant.clone()))
            })
            .collect();
        for (kind, dependant) in edges {
            self.update_edge(&dependant, origin, kind, log);
        }
    }

    /// Called on behalf of `dependant` when `peer`'s status has changed:
    /// adjusts `dependant`'s `unresolved_count` bookkeeping and, on a
    /// peer transitioning to `Failure`, marks `dependant`'s own port
    /// failed and cascades further.
    fn update_edge(
        &mut self,
        dependant: &Origin,
        peer: &Origin,
        kind: DependKind,
        log: &mut dyn FnMut(GraphEvent),
    ) {
        let peer_status = self.depends[peer].status;
        let prev = self
            .depends
            .get(dependant)
            .and_then(|h| h.last_peer_status().get(&(kind, peer.clone())).copied());
        if prev == Some(peer_status) {
            return;
        }
        if let Some(handler) = self.depends.get_mut(dependant) {
            handler
                .last_peer_status_mut()
                .insert((kind, peer.clone()), peer_status);
            let was_resolved = prev == Some(ResolutionState::Resolved);
            let now_resolved = peer_status == ResolutionState::Resolved;
            if now_resolved && !was_resolved {
                handler.unresolved_count = handler.unresolved_count.saturating_sub(1);
            } else if was_resolved && !now_resolved {
                handler.unresolved_count += 1;
            }
        }
        if peer_status == ResolutionState::Failure {
            self.fail_and_propagate(dependant, log);
        }
    }

    // ---- stage machine --------------------------------------------------------

    /// Checks the preconditions for advancing `origin` to `stage` and,
    /// if they hold, marks the port `working` at that stage level.
    pub fn prepare_stage(
        &mut self,
        origin: &Origin,
        stage: Stage,
        now: Timestamp,
        log: &mut dyn FnMut(GraphEvent),
    ) -> PrepareOutcome {
        let port_failed = self.ports[origin].failed;
        if port_failed {
            return PrepareOutcome::Failed;
        }
        if self.ports[origin].stage >= stage.level() {
            return PrepareOutcome::AlreadyDone;
        }
        let resolution = self.check(origin, stage);
        if matches!(
            resolution,
            ResolutionState::Failure | ResolutionState::Unresolved
        ) {
            self.fail_and_propagate(origin, log);
            return PrepareOutcome::Failed;
        }
        let port = self.ports.get_mut(origin).unwrap();
        port.stage = stage.level();
        port.working = Some(now);
        PrepareOutcome::Dispatch
    }

    /// Records the outcome of the external work `prepare_stage` admitted.
    /// `no_op` is the run's `-n` flag: a no-op Install still reports
    /// synthetic success (so the stage pipeline and monitor behave
    /// normally), but it never actually ran `make install`, so it must
    /// not flip `install_status` or resolve the port's dependants — §8's
    /// "no-op mode: … final install_status is unchanged" taken literally.
    pub fn finalize_stage(
        &mut self,
        origin: &Origin,
        stage: Stage,
        success: bool,
        no_op: bool,
        log: &mut dyn FnMut(GraphEvent),
    ) -> FinalizeOutcome {
        let port = self.ports.get_mut(origin).unwrap();
        port.working = None;
        let became_failed = !success && !port.failed;
        if !success {
            port.failed = true;
        }
        let installed_now = stage == Stage::Install && success && !no_op;
        if installed_now {
            port.install_status = crate::core::stage::InstallStatus::Current;
        }

        if became_failed || installed_now {
            self.status_changed(origin, log);
        }

        let failed_now = self.ports[origin].failed;
        FinalizeOutcome {
            schedule_clean: (failed_now && stage.level() > Stage::Fetch.level())
                || stage == Stage::Install,
        }
    }

    /// Applies the aftermath of a `clean` invocation scheduled by
    /// `finalize_stage`. Per `Port::failed`'s own contract, `failed` is
    /// sticky only until a clean succeeds: a successful clean of a
    /// failed port clears it and drops `stage` back to Fetch so a later
    /// retry rebuilds from a clean work directory. A clean after an
    /// ordinary successful Install (the port was never failed) merely
    /// frees the work directory and leaves `stage`/`install_status`
    /// alone. A clean that itself fails marks the port failed.
    pub fn finalize_clean(
        &mut self,
        origin: &Origin,
        clean_success: bool,
        log: &mut dyn FnMut(GraphEvent),
    ) {
        let port = self.ports.get_mut(origin).unwrap();
        let was_failed = port.failed;
        if clean_success {
            if was_failed {
                port.failed = false;
                if port.stage > Stage::Fetch.level() {
                    port.stage = Stage::Fetch.level();
                }
            }
        } else if !port.failed {
            port.failed = true;
        }
        if was_failed != self.ports[origin].failed {
            self.status_changed(origin, log);
        }
    }
}
