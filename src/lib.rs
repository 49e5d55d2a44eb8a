//! `portwright`: a concurrent build orchestrator for a source-based ports
//! tree.
//!
//! The library is organized leaves-first, the way the design document
//! lays out its components: [`core`] holds the domain model (ports,
//! attributes, the dependency graph, the stage state machine) with no
//! knowledge of processes or the filesystem; [`cache`] and [`loader`]
//! turn an origin into a constructed [`core::Port`]; [`process`] and
//! [`tool`] are the seam to the external `make`/`pkg` programs;
//! [`scheduler`] drives everything through the stage pipeline; `cli` and
//! the `portwright` binary are the thinnest possible wrapper around it.

pub mod cache;
pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod loader;
pub mod monitor;
pub mod pkgdb;
pub mod pkgindex;
pub mod process;
pub mod scheduler;
pub mod tool;

pub use config::{CliOverrides, Environment, Mode};
pub use error::{Error, Result};
