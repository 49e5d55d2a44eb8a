//! File-descriptor hygiene for spawned children.
//!
//! §4.6 requires every child process to be spawned with all non-stdio file
//! descriptors closed. On unix we install a `pre_exec` hook that closes
//! every fd above stdio up to the process's open-file limit. This runs
//! after `fork` and before `exec`, in the child only, so it can never
//! affect the parent. The hook reads the limit *before* `fork` (captured
//! by the closure) rather than calling `getrlimit` from inside it: only
//! async-signal-safe calls (`close`) run between fork and exec, since the
//! child may still be sharing a malloc arena lock held by another thread
//! of the parent at the instant of fork.

use std::process::Command;

#[cfg(unix)]
pub fn close_non_std_fds(cmd: &mut Command) {
    use std::os::unix::process::CommandExt;

    let highest = open_fd_limit();

    // SAFETY: the closure calls only `close(2)` on a fixed, pre-computed
    // range of fds; it performs no allocation and touches no state shared
    // with the parent process, so it is safe to run between `fork` and
    // `exec`.
    unsafe {
        cmd.pre_exec(move || {
            for fd in 3..=highest {
                libc::close(fd as libc::c_int);
            }
            Ok(())
        });
    }
}

#[cfg(not(unix))]
pub fn close_non_std_fds(_cmd: &mut Command) {
    // Windows handles are not inherited by default unless explicitly
    // marked inheritable; `std::process::Command` already does the right
    // thing here, so there is nothing additional to do.
}

#[cfg(unix)]
fn open_fd_limit() -> i32 {
    // SAFETY: `getrlimit` with a valid resource id and a local,
    // correctly-sized buffer is always sound.
    unsafe {
        let mut rl = std::mem::MaybeUninit::<libc::rlimit>::uninit();
        if libc::getrlimit(libc::RLIMIT_NOFILE, rl.as_mut_ptr()) == 0 {
            rl.assume_init().rlim_cur as i32
        } else {
            1024
        }
    }
}
