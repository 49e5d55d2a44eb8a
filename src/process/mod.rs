//! Runs one external command on a dedicated OS thread, holding a
//! jobserver token for its duration, and reports back through a plain
//! callback — kept decoupled from the scheduler's event type so this
//! module has no knowledge of what happens with the result.

use std::sync::Arc;

use crate::core::{Origin, Stage};
use crate::tool::BuildTool;

/// Spawns `stage` for `origin` on a new thread. Acquires a jobserver
/// token before running the external command and releases it (by
/// dropping the guard) once the command exits, so recursive `make -j`
/// invocations started by the command itself cooperate with the same
/// pool of tokens.
pub fn spawn_stage(
    tool: Arc<dyn BuildTool>,
    jobserver: jobserver::Client,
    origin: Origin,
    stage: Stage,
    on_done: impl FnOnce(Origin, Stage, bool) + Send + 'static,
) {
    std::thread::spawn(move || {
        let _token = match jobserver.acquire() {
            Ok(token) => token,
            Err(err) => {
                tracing::warn!(origin = %origin, %stage, error = %err, "failed to acquire jobserver token");
                on_done(origin, stage, false);
                return;
            }
        };
        let success = match tool.run_stage(&origin, stage) {
            Ok(status) => status.success(),
            Err(err) => {
                tracing::warn!(origin = %origin, %stage, error = %err, "failed to spawn stage");
                false
            }
        };
        on_done(origin, stage, success);
    });
}

/// Spawns a `clean` for `origin`. Takes a jobserver token for the same
/// reason `spawn_stage` does, even though `clean` rarely recurses.
pub fn spawn_clean(
    tool: Arc<dyn BuildTool>,
    jobserver: jobserver::Client,
    origin: Origin,
    on_done: impl FnOnce(Origin, bool) + Send + 'static,
) {
    std::thread::spawn(move || {
        let _token = match jobserver.acquire() {
            Ok(token) => token,
            Err(err) => {
                tracing::warn!(origin = %origin, error = %err, "failed to acquire jobserver token");
                on_done(origin, false);
                return;
            }
        };
        let success = match tool.clean(&origin) {
            Ok(status) => status.success(),
            Err(err) => {
                tracing::warn!(origin = %origin, error = %err, "failed to spawn clean");
                false
            }
        };
        on_done(origin, success);
    });
}
