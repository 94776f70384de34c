//! Best-effort OS scheduling priority for runtime threads.
//!
//! Only Linux can change the priority of a single thread (`setpriority` with a
//! thread id). Elsewhere these calls are no-ops that report `false`.

/// Nice value requested for the timer thread.
const HIGHEST: i32 = -20;
/// Nice value requested for the watcher thread.
const LOWEST: i32 = 19;

/// Raises the calling thread to the highest priority the OS grants.
///
/// Unprivileged processes usually cannot lower their nice value; the denial is
/// logged at debug level and the thread keeps its inherited priority.
pub(crate) fn raise_current() -> bool {
    set_current_nice(HIGHEST)
}

/// Drops the calling thread to the lowest priority.
pub(crate) fn lower_current() -> bool {
    set_current_nice(LOWEST)
}

#[cfg(target_os = "linux")]
fn set_current_nice(nice: i32) -> bool {
    let tid = unsafe { libc::syscall(libc::SYS_gettid) } as libc::id_t;
    let rc = unsafe { libc::setpriority(libc::PRIO_PROCESS, tid, nice) };
    if rc != 0 {
        let err = std::io::Error::last_os_error();
        tracing::debug!(nice, %err, "thread priority unchanged");
        return false;
    }
    true
}

#[cfg(not(target_os = "linux"))]
fn set_current_nice(nice: i32) -> bool {
    tracing::debug!(nice, "per-thread priority not supported on this platform");
    false
}
