//! OS-level pid liveness probing.
//!
//! Liveness is `kill(pid, 0)`: the null signal performs permission and
//! existence checks without delivering anything. `ESRCH` means the pid is
//! gone; `EPERM` means it exists but belongs to another user, which still
//! counts as alive.
//!
//! ## Known limitation
//! A recycled pid cannot be distinguished from the originally launched
//! process; there is no generation token or start-time cross-check. Callers
//! needing stronger guarantees should compare the process start time from
//! the OS before trusting a positive answer.

/// Returns true iff the OS reports a process with this id.
#[cfg(unix)]
pub fn is_pid_alive(pid: u32) -> bool {
    use nix::errno::Errno;
    use nix::sys::signal::kill;
    use nix::unistd::Pid;

    match kill(Pid::from_raw(pid as i32), None) {
        Ok(()) => true,
        Err(Errno::EPERM) => true,
        Err(_) => false,
    }
}

/// Non-Unix builds have no liveness probe; every record reads as stale.
#[cfg(not(unix))]
pub fn is_pid_alive(_pid: u32) -> bool {
    false
}
