use std::collections::HashMap;

use indexmap::IndexSet;

use crate::core::origin::Origin;
use crate::core::stage::{DependKind, ResolutionState};

/// A port's node in the dependency graph: six kind-indexed adjacency
/// lists in both directions, plus the bookkeeping `check`/`update` need.
#[derive(Debug)]
pub struct DependHandler {
    pub origin: Origin,
    dependencies: [IndexSet<Origin>; 6],
    dependants: [IndexSet<(String, Origin)>; 6],
    /// Last status observed for each `(kind, peer)` edge, so a re-entrant
    /// `update` from the same peer is a no-op rather than double-counting.
    last_peer_status: HashMap<(DependKind, Origin), ResolutionState>,
    pub unresolved_count: usize,
    pub status: ResolutionState,
}

impl DependHandler {
    pub fn new(origin: Origin) -> Self {
        DependHandler {
            origin,
            dependencies: std::array::from_fn(|_| IndexSet::new()),
            dependants: std::array::from_fn(|_| IndexSet::new()),
            last_peer_status: HashMap::new(),
            unresolved_count: 0,
            status: ResolutionState::Unresolved,
        }
    }

    pub fn dependencies_of(&self, kind: DependKind) -> &IndexSet<Origin> {
        &self.dependencies[kind.index()]
    }

    pub(crate) fn dependencies_mut(&mut self, kind: DependKind) -> &mut IndexSet<Origin> {
        &mut self.dependencies[kind.index()]
    }

    pub fn dependants_of(&self, kind: DependKind) -> &IndexSet<(String, Origin)> {
        &self.dependants[kind.index()]
    }

    pub(crate) fn dependants_mut(&mut self, kind: DependKind) -> &mut IndexSet<(String, Origin)> {
        &mut self.dependants[kind.index()]
    }

    pub(crate) fn last_peer_status_mut(
        &mut self,
    ) -> &mut HashMap<(DependKind, Origin), ResolutionState> {
        &mut self.last_peer_status
    }

    pub(crate) fn last_peer_status(&self) -> &HashMap<(DependKind, Origin), ResolutionState> {
        &self.last_peer_status
    }
}

/// Diagnostics emitted while wiring the graph, routed through `tracing` by
/// the scheduler rather than raised as errors (§7: `StaleDependency` and
/// `DuplicateDependency` are logged and do not fail the declaring port by
/// themselves).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphEvent {
    StaleDependency {
        origin: Origin,
        kind: DependKind,
        peer: Origin,
    },
    DuplicateDependency {
        origin: Origin,
        kind: DependKind,
        peer: Origin,
    },
    CycleDetected {
        origin: Origin,
    },
}
