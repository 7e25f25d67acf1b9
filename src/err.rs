//! # Error handling
//!
//! Two tiers:
//!
//! - `Errno` is what the raw system calls in `src/syscall/` return.  `EINTR` never leaves the
//!   retry layer in `src/os/`.
//! - `ErrorKind` is what every public operation returns.  It is small, `Copy`, and has a stable
//!   one-byte code so that a forked child can send it to its parent over the error pipe.
//!
//! Binaries handle unrecoverable errors with the `or_abort` family below: print a message and
//! exit.

use crate::os::*;

pub type Errno = syscalls::Errno;

/// Platform-independent classification of a failure
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ErrorKind {
    /// The per-process descriptor limit was hit
    ProcessFdQuotaExceeded = 0,
    /// The system-wide descriptor limit was hit
    SystemFdQuotaExceeded = 1,
    /// Some other kernel resource (process slots, pipe buffers, ...) ran out
    SystemResources = 2,
    AccessDenied = 3,
    OutOfMemory = 4,
    NoSpaceLeft = 5,
    DiskQuota = 6,
    FileTooBig = 7,
    NameTooLong = 8,
    FileNotFound = 9,
    NotDir = 10,
    IsDir = 11,
    SymLinkLoop = 12,
    NoDevice = 13,
    FileBusy = 14,
    /// The exec target is not in a format the kernel can run
    InvalidExe = 15,
    FileSystem = 16,
    BrokenPipe = 17,
    InputOutput = 18,
    /// A path, argument, or environment entry cannot be expressed as a C string
    InvalidArgument = 19,
    /// Any platform code with no defined mapping
    Unexpected = 20,
}

impl ErrorKind {
    const ALL: [Self; 21] = [
        Self::ProcessFdQuotaExceeded,
        Self::SystemFdQuotaExceeded,
        Self::SystemResources,
        Self::AccessDenied,
        Self::OutOfMemory,
        Self::NoSpaceLeft,
        Self::DiskQuota,
        Self::FileTooBig,
        Self::NameTooLong,
        Self::FileNotFound,
        Self::NotDir,
        Self::IsDir,
        Self::SymLinkLoop,
        Self::NoDevice,
        Self::FileBusy,
        Self::InvalidExe,
        Self::FileSystem,
        Self::BrokenPipe,
        Self::InputOutput,
        Self::InvalidArgument,
        Self::Unexpected,
    ];

    /// Wire representation used on the error pipe
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Inverse of `code()`
    ///
    /// Codes outside the defined range decode as `Unexpected`.
    pub fn from_code(code: u8) -> Self {
        Self::ALL
            .get(code as usize)
            .copied()
            .unwrap_or(Self::Unexpected)
    }

    /// Translation for a failed `execve`
    ///
    /// `execve` reports a closed set of conditions, some of which mean something different than
    /// they do for other calls: `EINVAL` and `ENOEXEC` describe the target's format, `EIO` and
    /// `ELOOP` describe the filesystem holding it.
    pub fn from_exec_errno(errno: Errno) -> Self {
        match errno {
            Errno::E2BIG
            | Errno::EMFILE
            | Errno::ENAMETOOLONG
            | Errno::ENFILE
            | Errno::ENOMEM => Self::SystemResources,
            Errno::EACCES | Errno::EPERM => Self::AccessDenied,
            Errno::EINVAL | Errno::ENOEXEC => Self::InvalidExe,
            Errno::EIO | Errno::ELOOP => Self::FileSystem,
            Errno::EISDIR => Self::IsDir,
            Errno::ENOENT | Errno::ENOTDIR => Self::FileNotFound,
            Errno::ETXTBSY => Self::FileBusy,
            // EFAULT cannot occur with the arrays built by ExecArgs.
            _ => Self::Unexpected,
        }
    }

    pub const fn description(self) -> &'static str {
        match self {
            Self::ProcessFdQuotaExceeded => "process file descriptor limit reached",
            Self::SystemFdQuotaExceeded => "system file descriptor limit reached",
            Self::SystemResources => "insufficient system resources",
            Self::AccessDenied => "access denied",
            Self::OutOfMemory => "out of memory",
            Self::NoSpaceLeft => "no space left on device",
            Self::DiskQuota => "disk quota exceeded",
            Self::FileTooBig => "file too big",
            Self::NameTooLong => "name too long",
            Self::FileNotFound => "file not found",
            Self::NotDir => "not a directory",
            Self::IsDir => "is a directory",
            Self::SymLinkLoop => "too many levels of symbolic links",
            Self::NoDevice => "no such device",
            Self::FileBusy => "file busy",
            Self::InvalidExe => "invalid executable",
            Self::FileSystem => "filesystem error",
            Self::BrokenPipe => "broken pipe",
            Self::InputOutput => "input/output error",
            Self::InvalidArgument => "invalid argument",
            Self::Unexpected => "unexpected error",
        }
    }
}

impl From<Errno> for ErrorKind {
    fn from(errno: Errno) -> Self {
        match errno {
            Errno::EMFILE => Self::ProcessFdQuotaExceeded,
            Errno::ENFILE => Self::SystemFdQuotaExceeded,
            Errno::EAGAIN => Self::SystemResources,
            Errno::EACCES | Errno::EPERM => Self::AccessDenied,
            Errno::ENOMEM => Self::OutOfMemory,
            Errno::ENOSPC => Self::NoSpaceLeft,
            Errno::EDQUOT => Self::DiskQuota,
            Errno::EFBIG => Self::FileTooBig,
            Errno::ENAMETOOLONG => Self::NameTooLong,
            Errno::ENOENT => Self::FileNotFound,
            Errno::ENOTDIR => Self::NotDir,
            Errno::EISDIR => Self::IsDir,
            Errno::ELOOP => Self::SymLinkLoop,
            Errno::ENODEV | Errno::ENXIO => Self::NoDevice,
            Errno::EBUSY | Errno::ETXTBSY => Self::FileBusy,
            Errno::ENOEXEC => Self::InvalidExe,
            Errno::EPIPE => Self::BrokenPipe,
            Errno::EIO => Self::InputOutput,
            _ => Self::Unexpected,
        }
    }
}

impl core::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.description())
    }
}

fn abort() -> ! {
    exit(1);
}

pub fn abort_with_msg(msg: &str) -> ! {
    eprint("ERROR: ");
    eprint(msg);
    eprint("\n");

    abort()
}

pub trait OrAbortResult<T> {
    fn or_abort<M: Print>(self, msg: M) -> T;
    fn or_fs_abort(self, operation: &str, path: &[u8]) -> T;
}

impl<T> OrAbortResult<T> for Result<T, ErrorKind> {
    fn or_abort<M: Print>(self, msg: M) -> T {
        let e = match self {
            Ok(t) => return t,
            Err(e) => e,
        };

        eprint("ERROR: ");
        eprint(msg);
        eprint(": ");
        eprint(e);
        eprint("\n");

        abort();
    }

    fn or_fs_abort(self, operation: &str, path: &[u8]) -> T {
        let e = match self {
            Ok(t) => return t,
            Err(e) => e,
        };

        eprint("ERROR: Unable to ");
        eprint(operation);
        eprint(" ");
        eprint(path);
        eprint(": ");
        eprint(e);
        eprint("\n");

        abort();
    }
}

pub trait OrAbortOption<T> {
    fn or_abort<M: Print>(self, msg: M) -> T;
}

impl<T> OrAbortOption<T> for Option<T> {
    fn or_abort<M: Print>(self, msg: M) -> T {
        if let Some(t) = self {
            return t;
        };

        eprint("ERROR: ");
        eprint(msg);
        eprint("\n");

        abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_round_trip() {
        for kind in ErrorKind::ALL {
            assert_eq!(ErrorKind::from_code(kind.code()), kind);
        }
    }

    #[test]
    fn test_codes_leave_room_for_sentinel() {
        let max = ErrorKind::ALL.iter().map(|k| k.code()).max();
        assert_eq!(max, Some(ErrorKind::Unexpected.code()));
        assert!(ErrorKind::Unexpected.code() < u8::MAX);
    }

    #[test]
    fn test_unknown_code_is_unexpected() {
        assert_eq!(ErrorKind::from_code(200), ErrorKind::Unexpected);
        assert_eq!(ErrorKind::from_code(u8::MAX - 1), ErrorKind::Unexpected);
    }

    #[test]
    fn test_errno_translation() {
        assert_eq!(
            ErrorKind::from(Errno::EMFILE),
            ErrorKind::ProcessFdQuotaExceeded
        );
        assert_eq!(
            ErrorKind::from(Errno::ENFILE),
            ErrorKind::SystemFdQuotaExceeded
        );
        assert_eq!(ErrorKind::from(Errno::EPIPE), ErrorKind::BrokenPipe);
        assert_eq!(ErrorKind::from(Errno::ENOENT), ErrorKind::FileNotFound);
        assert_eq!(ErrorKind::from(Errno::ELOOP), ErrorKind::SymLinkLoop);
        assert_eq!(ErrorKind::from(Errno::EDQUOT), ErrorKind::DiskQuota);
        assert_eq!(ErrorKind::from(Errno::ECHILD), ErrorKind::Unexpected);
    }

    #[test]
    fn test_exec_errno_translation() {
        assert_eq!(
            ErrorKind::from_exec_errno(Errno::ENOEXEC),
            ErrorKind::InvalidExe
        );
        assert_eq!(
            ErrorKind::from_exec_errno(Errno::ENOTDIR),
            ErrorKind::FileNotFound
        );
        assert_eq!(ErrorKind::from_exec_errno(Errno::ELOOP), ErrorKind::FileSystem);
        assert_eq!(
            ErrorKind::from_exec_errno(Errno::E2BIG),
            ErrorKind::SystemResources
        );
        assert_eq!(ErrorKind::from_exec_errno(Errno::ETXTBSY), ErrorKind::FileBusy);
        assert_eq!(ErrorKind::from_exec_errno(Errno::ESRCH), ErrorKind::Unexpected);
    }

    #[test]
    fn test_display_uses_description() {
        assert_eq!(
            std::format!("{}", ErrorKind::InvalidExe),
            "invalid executable"
        );
    }
}
