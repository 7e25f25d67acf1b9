//! Process-level system calls: fork (via clone), execve, wait4, exit_group, kill, chdir,
//! setuid, setgid.

use crate::err::*;
use crate::types::*;
use core::ffi::c_char;
use syscalls::{Sysno, syscall};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ForkResult {
    /// In parent process with child PID
    Parent(pid_t),
    /// In child process
    Child,
}

// `man 2 clone`:
//
// SYNOPSIS
//        long clone(unsigned long flags, void *stack,
//                   int *parent_tid, int *child_tid,
//                   unsigned long tls);
//
// With only SIGCHLD in the flags and a null stack, clone() behaves as fork(): the child runs on
// a copy-on-write duplicate of the caller's stack.  AArch64 has no fork syscall, and the
// argument order differences between architectures do not matter when every pointer is null.
//
// RETURN VALUE
//        On success, the thread ID of the child process is returned in the caller's thread of
//        execution.  On failure, -1 is returned in the caller's context, no child process is
//        created, and errno is set to indicate the error.
pub unsafe fn fork() -> Result<ForkResult, Errno> {
    let pid = syscall!(Sysno::clone, Signal::SIGCHLD as usize, 0, 0, 0, 0)? as pid_t;
    if pid == 0 {
        Ok(ForkResult::Child)
    } else {
        Ok(ForkResult::Parent(pid))
    }
}

// `man 2 execve`:
//
// SYNOPSIS
//       int execve(const char *pathname, char *const _Nullable argv[],
//                  char *const _Nullable envp[]);
//
// RETURN VALUE
//        On success, execve() does not return, on error -1 is returned, and errno is set to
//        indicate the error.
pub unsafe fn execve(
    pathname: &CStr,
    argv: *const *const c_char,
    envp: *const *const c_char,
) -> Errno {
    match syscall!(Sysno::execve, pathname.as_ptr(), argv, envp) {
        Ok(_) => unsafe { core::hint::unreachable_unchecked() },
        Err(errno) => errno,
    }
}

// `man 2 wait4`:
//
// SYNOPSIS
//        pid_t wait4(pid_t pid, int *_Nullable wstatus, int options,
//                    struct rusage *_Nullable rusage);
//
// RETURN VALUE
//        Returns the process ID of the child whose state has changed.  On error, -1 is returned
//        and errno is set to indicate the error.
pub unsafe fn wait4(pid: pid_t, options: c_int) -> Result<(pid_t, c_int), Errno> {
    let mut status: c_int = 0;
    let status_ptr = &mut status as *mut c_int;

    syscall!(Sysno::wait4, pid, status_ptr, options, core::ptr::null::<u8>())
        .map(|ret| (ret as pid_t, status))
}

/// Extract exit status from wait status
pub const fn wexitstatus(status: c_int) -> c_int {
    (status >> 8) & 0xff
}

/// Check if process exited normally
pub const fn wifexited(status: c_int) -> bool {
    (status & 0x7f) == 0
}

/// Check if process was terminated by signal
pub const fn wifsignaled(status: c_int) -> bool {
    ((status & 0x7f) + 1) as i8 >= 2
}

/// Extract termination signal from wait status
pub const fn wtermsig(status: c_int) -> c_int {
    status & 0x7f
}

/// Check if process was stopped
pub const fn wifstopped(status: c_int) -> bool {
    (status & 0xff) == 0x7f
}

/// Extract stop signal from wait status
pub const fn wstopsig(status: c_int) -> c_int {
    wexitstatus(status)
}

// `man 2 exit_group`:
//
// SYNOPSIS
//       [[noreturn]] void syscall(SYS_exit_group, int status);
//
// RETURN VALUE
//      This system call does not return.
pub unsafe fn exit_group(status: c_int) -> ! {
    let _ = syscall!(Sysno::exit_group, status);
    // Inform the compiler that this function does not return
    unsafe { core::hint::unreachable_unchecked() };
}

// `man 2 kill`:
//
// SYNOPSIS
//        int kill(pid_t pid, int sig);
//
// RETURN VALUE
//        On success (at least one signal was sent), zero is returned.  On error, -1 is returned,
//        and errno is set to indicate the error.
pub unsafe fn kill(pid: pid_t, sig: c_int) -> Result<(), Errno> {
    syscall!(Sysno::kill, pid, sig).map(|_| ())
}

// `man 2 chdir`:
//
// SYNOPSIS
//        int chdir(const char *path);
//
// RETURN VALUE
//        On success, zero is returned.  On error, -1 is returned, and errno is set appropriately.
pub unsafe fn chdir(path: &CStr) -> Result<(), Errno> {
    syscall!(Sysno::chdir, path.as_ptr()).map(|_| ())
}

/// Set the user ID of the calling process
pub unsafe fn setuid(uid: uid_t) -> Result<(), Errno> {
    syscall!(Sysno::setuid, uid).map(|_| ())
}

/// Set the group ID of the calling process
pub unsafe fn setgid(gid: gid_t) -> Result<(), Errno> {
    syscall!(Sysno::setgid, gid).map(|_| ())
}
