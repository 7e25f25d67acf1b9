use crate::err::*;
use crate::os::restart_on_intr;
use crate::syscall::*;
use crate::types::*;

pub const STDIN: Fd = Fd(crate::constants::STDIN_FILENO);
pub const STDOUT: Fd = Fd(crate::constants::STDOUT_FILENO);
pub const STDERR: Fd = Fd(crate::constants::STDERR_FILENO);

pub use crate::syscall::OpenFlags;

/// File descriptor
///
/// Every operation retries on `EINTR` and translates any other failure into an `ErrorKind`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Fd(c_int);

impl Fd {
    pub fn open(path: &CStr, flags: OpenFlags, mode: mode_t) -> Result<Self, ErrorKind> {
        restart_on_intr(|| unsafe { openat(AT_FDCWD, path, flags, mode) })
            .map(Self)
            .map_err(ErrorKind::from)
    }

    /// One read(2) call; `Ok(0)` is end of file
    pub fn read(&self, buf: &mut [u8]) -> Result<usize, ErrorKind> {
        restart_on_intr(|| unsafe { read(self.0, &mut *buf) }).map_err(ErrorKind::from)
    }

    /// One write(2) call; may write fewer bytes than requested
    pub fn write(&self, buf: &[u8]) -> Result<usize, ErrorKind> {
        restart_on_intr(|| unsafe { write(self.0, buf) }).map_err(ErrorKind::from)
    }

    pub fn write_all(&self, mut buf: &[u8]) -> Result<(), ErrorKind> {
        while !buf.is_empty() {
            let n = self.write(buf)?;
            if n == 0 {
                return Err(ErrorKind::InputOutput);
            }
            buf = buf.get(n..).unwrap_or_default();
        }
        Ok(())
    }

    /// Release the descriptor
    ///
    /// Retries on `EINTR` like every other operation here, on purpose.  Linux has already
    /// released the number by then, so a retry may close a number another thread reused in
    /// between.  The result is discarded.
    pub fn close(self) {
        let _ = restart_on_intr(|| unsafe { close(self.0) });
    }

    /// Duplicate onto `slot`, replacing whatever `slot` referred to
    ///
    /// The duplicate never has `FD_CLOEXEC` set.  If the descriptor already occupies `slot`,
    /// `FD_CLOEXEC` is cleared on it instead.
    pub fn dup_to(&self, slot: c_int) -> Result<Self, ErrorKind> {
        if self.0 == slot {
            self.set_cloexec(false)?;
            return Ok(Self(slot));
        }

        loop {
            match restart_on_intr(|| unsafe { dup3(self.0, slot, OpenFlags::empty()) }) {
                Ok(fd) => return Ok(Self(fd)),
                // Transient race between open(2) and dup(2) inside the kernel
                Err(Errno::EBUSY) => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Duplicate onto the lowest free number above `floor`, with `FD_CLOEXEC` set
    pub fn dup_above(&self, floor: c_int) -> Result<Self, ErrorKind> {
        restart_on_intr(|| unsafe { fcntl(self.0, FcntlCmd::F_DUPFD_CLOEXEC, floor + 1) })
            .map(Self)
            .map_err(ErrorKind::from)
    }

    pub fn set_cloexec(&self, cloexec: bool) -> Result<(), ErrorKind> {
        let flags = restart_on_intr(|| unsafe { fcntl(self.0, FcntlCmd::F_GETFD, 0) })?;
        let flags = if cloexec {
            flags | FD_CLOEXEC
        } else {
            flags & !FD_CLOEXEC
        };
        restart_on_intr(|| unsafe { fcntl(self.0, FcntlCmd::F_SETFD, flags) })?;
        Ok(())
    }

    pub fn from_raw(fd: c_int) -> Self {
        Self(fd)
    }

    pub fn as_raw(&self) -> c_int {
        self.0
    }

    /// Returns `(read_end, write_end)`
    pub fn new_pipe(flags: OpenFlags) -> Result<(Self, Self), ErrorKind> {
        let mut fds: [c_int; 2] = [-1, -1];
        restart_on_intr(|| unsafe { pipe2(&mut fds, flags) })?;
        Ok((Self::from_raw(fds[0]), Self::from_raw(fds[1])))
    }
}

// An Fd is not closed on drop.  The same descriptor number is carried into a forked child, where
// dropping must not release it, and the parent hands ownership to types which do close on drop
// (`ChildStdin` and friends, `ErrPipe`).
