//! The per-port state machine: the mutable half of a port (stage,
//! install status, failure, the working flag) layered over its
//! immutable attribute map.

use jiff::Timestamp;

use crate::core::attr::Attributes;
use crate::core::origin::Origin;
use crate::core::stage::InstallStatus;

/// One port's state, as tracked by the `World` for the lifetime of a run.
///
/// `attrs` is replaced wholesale (not mutated field-by-field) on
/// reconfiguration, so a reader holding a clone of the old map never
/// observes a half-updated one.
#[derive(Debug, Clone)]
pub struct Port {
    pub origin: Origin,
    pub attrs: Attributes,
    pub install_status: InstallStatus,
    /// 0 before the first successful Config; otherwise the highest stage
    /// level this port has completed. Monotonic except for the reset a
    /// `clean()` after failure performs.
    pub stage: u8,
    pub working: Option<Timestamp>,
    pub failed: bool,
}

impl Port {
    pub fn new(origin: Origin, attrs: Attributes, install_status: InstallStatus) -> Self {
        Port {
            origin,
            attrs,
            install_status,
            stage: 0,
            working: None,
            failed: false,
        }
    }

    pub fn is_working(&self) -> bool {
        self.working.is_some()
    }
}
