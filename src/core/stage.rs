use std::fmt;

/// A pipeline stage. Totally ordered; stage 0 (not represented here, see
/// `Port::stage`) means "not yet configured".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Stage {
    Config = 1,
    Fetch = 2,
    Build = 3,
    Install = 4,
    Package = 5,
}

impl Stage {
    pub const ALL: [Stage; 5] = [
        Stage::Config,
        Stage::Fetch,
        Stage::Build,
        Stage::Install,
        Stage::Package,
    ];

    pub fn level(self) -> u8 {
        self as u8
    }

    pub fn from_level(level: u8) -> Option<Stage> {
        Stage::ALL.into_iter().find(|s| s.level() == level)
    }

    /// The stage that must be complete before this one may start, or
    /// `None` for `Config`.
    pub fn prev(self) -> Option<Stage> {
        Stage::from_level(self.level() - 1)
    }

    pub fn name(self) -> &'static str {
        match self {
            Stage::Config => "config",
            Stage::Fetch => "fetch",
            Stage::Build => "build",
            Stage::Install => "install",
            Stage::Package => "package",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The six dependency relationships a port can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DependKind {
    Build,
    Extract,
    Fetch,
    Lib,
    Run,
    Patch,
}

impl DependKind {
    pub const ALL: [DependKind; 6] = [
        DependKind::Build,
        DependKind::Extract,
        DependKind::Fetch,
        DependKind::Lib,
        DependKind::Run,
        DependKind::Patch,
    ];

    pub fn index(self) -> usize {
        match self {
            DependKind::Build => 0,
            DependKind::Extract => 1,
            DependKind::Fetch => 2,
            DependKind::Lib => 3,
            DependKind::Run => 4,
            DependKind::Patch => 5,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            DependKind::Build => "build",
            DependKind::Extract => "extract",
            DependKind::Fetch => "fetch",
            DependKind::Lib => "lib",
            DependKind::Run => "run",
            DependKind::Patch => "patch",
        }
    }

    /// The edge kinds `DependHandler::check` must find Resolved for a
    /// port to advance to `stage`, per the design's resolution table.
    pub fn required_for(stage: Stage) -> &'static [DependKind] {
        match stage {
            Stage::Config => &[],
            Stage::Fetch => &[DependKind::Fetch],
            Stage::Build => &[
                DependKind::Extract,
                DependKind::Patch,
                DependKind::Build,
                DependKind::Lib,
            ],
            Stage::Install | Stage::Package => &[DependKind::Lib, DependKind::Run],
        }
    }
}

/// The resolution state of a node in the dependency graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionState {
    Unresolved,
    PartlyResolved,
    Resolved,
    Failure,
}

/// Whether an installed package is missing, stale, current, or ahead of
/// the tree's declared version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum InstallStatus {
    Absent,
    Older,
    Current,
    Newer,
}

impl fmt::Display for InstallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            InstallStatus::Absent => "not installed",
            InstallStatus::Older => "older",
            InstallStatus::Current => "current",
            InstallStatus::Newer => "newer",
        };
        f.write_str(s)
    }
}
