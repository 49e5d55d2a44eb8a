//! OS-facing helpers shared by `portwright`'s subprocess runner.
//!
//! Kept in its own crate, the way the teacher splits `cargo-util` out of
//! the main `cargo` crate: this code has no orchestration logic of its
//! own, only the bits that talk directly to the operating system.

use std::ffi::OsStr;
use std::io;
use std::process::{Child, Command, ExitStatus, Output};
use std::sync::{Mutex, OnceLock};

pub mod fds;

/// Guards the `fork`+`exec` window across every spawn this process makes.
/// §4.6 asks for spawns to be serialized ("no two spawns are in progress
/// concurrently") while the resulting children run in parallel — each
/// stage and clean invocation runs on its own OS thread, so without this
/// lock two threads could `fork` at the same instant. The lock is held
/// only around `Command::spawn` itself; `wait`/`wait_with_output` run
/// outside it so children really do overlap.
fn spawn_lock() -> &'static Mutex<()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(()))
}

fn spawn_locked(cmd: &mut Command) -> io::Result<Child> {
    let _guard = spawn_lock().lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    cmd.spawn()
}

/// `Command::status`, with the spawn itself serialized per §4.6.
pub fn spawn_and_wait(cmd: &mut Command) -> io::Result<ExitStatus> {
    spawn_locked(cmd)?.wait()
}

/// `Command::output`, with the spawn itself serialized per §4.6.
pub fn spawn_and_collect(cmd: &mut Command) -> io::Result<Output> {
    spawn_locked(cmd)?.wait_with_output()
}

/// Render a command's argv as a single shell-quoted string, for `no_op`
/// mode and for diagnostic logging. Each argument is quoted only if it
/// contains characters a shell would otherwise split on.
pub fn render_argv<I, S>(program: &str, args: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut rendered = shell_escape::escape(program.into()).into_owned();
    for arg in args {
        let arg = arg.as_ref().to_string_lossy();
        rendered.push(' ');
        rendered.push_str(&shell_escape::escape(arg).into_owned());
    }
    rendered
}

/// Build a [`Command`] with file-descriptor hygiene applied: on unix this
/// closes every fd above stdio before `exec`, so a child never inherits a
/// lock or socket it has no business holding.
pub fn hygienic_command(program: &str) -> Command {
    tracing::trace!(program, "building hygienic command");
    let mut cmd = Command::new(program);
    fds::close_non_std_fds(&mut cmd);
    cmd
}
