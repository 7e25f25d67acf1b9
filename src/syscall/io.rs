//! Descriptor-level system calls: open, close, read, write, pipe2, dup3, fcntl, ppoll.

use crate::err::*;
use crate::types::{CStr, c_int, mode_t};
use core::ops::BitOr;
use syscalls::{Sysno, syscall};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OpenFlags(c_int);

impl OpenFlags {
    pub const O_RDONLY: Self = Self(0o0000000);
    pub const O_WRONLY: Self = Self(0o0000001);
    pub const O_RDWR: Self = Self(0o0000002);
    pub const O_CLOEXEC: Self = Self(0o2000000);

    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn bits(self) -> c_int {
        self.0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }
}

impl BitOr for OpenFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

pub const AT_FDCWD: c_int = -100;

// `man 2 openat`:
//
// SYNOPSIS
//        int openat(int dirfd, const char *pathname, int flags, ...
//                   /* mode_t mode */ );
//
// RETURN VALUE
//        On success, openat() returns the new file descriptor (a nonnegative integer).  On error,
//        -1 is returned and errno is set to indicate the error.
pub unsafe fn openat(
    dirfd: c_int,
    path: &CStr,
    flags: OpenFlags,
    mode: mode_t,
) -> Result<c_int, Errno> {
    syscall!(Sysno::openat, dirfd, path.as_ptr(), flags.bits(), mode).map(|fd| fd as c_int)
}

// `man 2 close`:
//
// RETURN VALUE
//        Returns zero on success.  On error, -1 is returned, and errno is set to indicate the
//        error.
//
// NOTES
//        On Linux the descriptor is released even when close() fails with EINTR.  `Fd::close`
//        retries anyway; see there.
pub unsafe fn close(fd: c_int) -> Result<(), Errno> {
    syscall!(Sysno::close, fd).map(|_| ())
}

// `man 2 read`:
//
// SYNOPSIS
//        ssize_t read(int fd, void *buf, size_t count);
//
// RETURN VALUE
//        On success, the number of bytes read is returned (zero indicates end of file).  On
//        error, -1 is returned, and errno is set to indicate the error.
pub unsafe fn read(fd: c_int, buf: &mut [u8]) -> Result<usize, Errno> {
    syscall!(Sysno::read, fd, buf.as_mut_ptr(), buf.len())
}

// `man 2 write`:
//
// SYNOPSIS
//        ssize_t write(int fd, const void buf[.count], size_t count);
//
// RETURN VALUE
//        On success, the number of bytes written is returned, which may be less than count.  On
//        error, -1 is returned, and errno is set to indicate the error.
pub unsafe fn write(fd: c_int, buf: &[u8]) -> Result<usize, Errno> {
    syscall!(Sysno::write, fd, buf.as_ptr(), buf.len())
}

// `man 2 pipe2`:
//
// SYNOPSIS
//        int pipe2(int pipefd[2], int flags);
//
// RETURN VALUE
//        On success, zero is returned.  On error, -1 is returned, errno is set to indicate the
//        error, and pipefd is left unchanged.
pub unsafe fn pipe2(pipefd: &mut [c_int; 2], flags: OpenFlags) -> Result<(), Errno> {
    syscall!(Sysno::pipe2, pipefd.as_mut_ptr(), flags.bits()).map(|_| ())
}

// `man 2 dup3`:
//
// SYNOPSIS
//        int dup3(int oldfd, int newfd, int flags);
//
// ERRORS
//        EBUSY  (Linux only) This may be returned by dup2() or dup3() during a race condition
//               with open(2) and dup().
//        EINVAL (dup3()) oldfd was equal to newfd.
pub unsafe fn dup3(oldfd: c_int, newfd: c_int, flags: OpenFlags) -> Result<c_int, Errno> {
    syscall!(Sysno::dup3, oldfd, newfd, flags.bits()).map(|fd| fd as c_int)
}

#[allow(non_camel_case_types)]
#[derive(Clone, Copy)]
#[repr(C)]
pub enum FcntlCmd {
    F_GETFD = 1,
    F_SETFD = 2,
    F_DUPFD_CLOEXEC = 1030,
}

pub const FD_CLOEXEC: c_int = 1;

// `man 2 fcntl`:
//
// SYNOPSIS
//        int fcntl(int fd, int cmd, ... /* arg */ );
//
// RETURN VALUE
//        F_DUPFD_CLOEXEC  The new file descriptor.
//        F_GETFD  Value of file descriptor flags.
//        F_GETFL  Value of file status flags.
//        All other commands return zero.
//
//        On error, -1 is returned, and errno is set to indicate the error.
pub unsafe fn fcntl(fd: c_int, cmd: FcntlCmd, arg: c_int) -> Result<c_int, Errno> {
    syscall!(Sysno::fcntl, fd, cmd, arg).map(|ret| ret as c_int)
}

#[derive(Clone, Copy)]
#[repr(transparent)]
pub struct PollEvents(u16);

impl PollEvents {
    pub const POLLIN: Self = Self(0x0001);

    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn bits(self) -> u16 {
        self.0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }
}

#[repr(C)]
#[derive(Clone, Copy)]
pub struct PollFd {
    pub fd: c_int,
    pub events: PollEvents,
    pub revents: PollEvents,
}
const _: () = assert!(core::mem::size_of::<PollFd>() == 8);

// `man 2 ppoll`:
//
// SYNOPSIS
//        int ppoll(struct pollfd *fds, nfds_t nfds,
//                  const struct timespec *_Nullable tmo_p,
//                  const sigset_t *_Nullable sigmask);
//
// RETURN VALUE
//        On success, returns the number of elements in fds whose revents fields have been set to
//        a nonzero value.  A null tmo_p blocks indefinitely.  On error, -1 is returned, and errno
//        is set to indicate the error.
//
// AArch64 has no plain poll(2), so ppoll is used with a null timeout and a null signal mask.
pub unsafe fn ppoll(fds: &mut [PollFd]) -> Result<usize, Errno> {
    syscall!(
        Sysno::ppoll,
        fds.as_mut_ptr(),
        fds.len(),
        core::ptr::null::<u8>(),
        core::ptr::null::<u8>(),
        core::mem::size_of::<usize>()
    )
}
