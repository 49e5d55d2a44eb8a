//! The domain model: ports, their attribute maps, the dependency graph,
//! and the stage state machine. Nothing here touches the filesystem or
//! spawns processes — that is the job of `loader`, `process`, and
//! `scheduler`.

pub mod attr;
pub mod depend;
pub mod origin;
pub mod port;
pub mod stage;
pub mod version;
pub mod world;

pub use attr::{Attributes, DependEntry, Field, FieldKind};
pub use depend::{DependHandler, GraphEvent};
pub use origin::Origin;
pub use port::Port;
pub use stage::{DependKind, InstallStatus, ResolutionState, Stage};
pub use version::{install_status, split_name_version, Version};
pub use world::{FinalizeOutcome, PrepareOutcome, World};
