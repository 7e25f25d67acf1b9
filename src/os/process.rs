use crate::err::*;
use crate::os::restart_on_intr;
use crate::types::*;

pub use crate::syscall::ForkResult;
pub use crate::syscall::{wexitstatus, wifexited, wifsignaled, wifstopped, wstopsig, wtermsig};

/// Fork the current process
///
/// # Safety
///
/// Only the forking thread exists in the child.  Locks held by other threads at the time of the
/// fork (allocator, stdio, ...) stay locked forever in the child, so until it execs or exits the
/// child must restrict itself to raw system calls on memory prepared before the fork.
pub unsafe fn fork() -> Result<ForkResult, ErrorKind> {
    unsafe { crate::syscall::fork() }.map_err(|e| match e {
        Errno::EAGAIN | Errno::ENOMEM => ErrorKind::SystemResources,
        e => ErrorKind::from(e),
    })
}

/// Terminate the calling process immediately
///
/// No destructors, atexit handlers, or stdio flushes run.
#[inline]
pub fn exit(status: c_int) -> ! {
    unsafe { crate::syscall::exit_group(status) }
}

/// Block until `pid` exits and return its raw status word
#[inline]
pub fn waitpid(pid: pid_t) -> Result<c_int, ErrorKind> {
    // SAFETY: wait4 only writes to a status word on our stack
    restart_on_intr(|| unsafe { crate::syscall::wait4(pid, 0) })
        .map(|(_, status)| status)
        .map_err(ErrorKind::from)
}

/// Send `sig` to `pid`
///
/// Returns the raw `Errno` so callers can tell an already-exited process (`ESRCH`) apart from
/// a permission problem.
#[inline]
pub fn kill(pid: pid_t, sig: Signal) -> Result<(), Errno> {
    unsafe { crate::syscall::kill(pid, sig as c_int) }
}

#[inline]
pub fn chdir(path: &CStr) -> Result<(), ErrorKind> {
    restart_on_intr(|| unsafe { crate::syscall::chdir(path) }).map_err(ErrorKind::from)
}

/// Set the user ID of the calling process
///
/// Requires appropriate privileges (typically root)
#[inline]
pub fn setuid(uid: uid_t) -> Result<(), ErrorKind> {
    unsafe { crate::syscall::setuid(uid) }.map_err(ErrorKind::from)
}

/// Set the group ID of the calling process
///
/// Requires appropriate privileges (typically root)
#[inline]
pub fn setgid(gid: gid_t) -> Result<(), ErrorKind> {
    unsafe { crate::syscall::setgid(gid) }.map_err(ErrorKind::from)
}
