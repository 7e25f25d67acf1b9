use crate::constants::READ_CHUNK;
use crate::err::{Errno, ErrorKind};
use crate::ipc::ErrPipe;
use crate::os::*;
use crate::spawn::{ChildStderr, ChildStdin, ChildStdout};
use crate::syscall::{PollEvents, PollFd, ppoll};
use crate::types::*;
use alloc::vec::Vec;

/// Why a reaped process stopped running
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Termination {
    /// Exited normally with this status
    Exited(u8),
    /// Killed by this signal
    Signal(u32),
    /// Stopped by this signal
    Stopped(u32),
    /// A status word matching none of the above
    Unknown(u32),
}

impl Termination {
    /// Decode a raw wait status word
    pub fn from_status(status: c_int) -> Self {
        if wifexited(status) {
            Self::Exited(wexitstatus(status) as u8)
        } else if wifsignaled(status) {
            Self::Signal(wtermsig(status) as u32)
        } else if wifstopped(status) {
            Self::Stopped(wstopsig(status) as u32)
        } else {
            Self::Unknown(status as u32)
        }
    }

    pub fn success(self) -> bool {
        self == Self::Exited(0)
    }

    /// Exit status a shell would report for this outcome
    pub fn exit_code(self) -> c_int {
        match self {
            Self::Exited(code) => code as c_int,
            Self::Signal(sig) | Self::Stopped(sig) => 128 + (sig & 0x7f) as c_int,
            Self::Unknown(_) => 255,
        }
    }
}

impl Print for Termination {
    fn print(&self, fd: Fd) {
        match self {
            Self::Exited(code) => {
                "exited ".print(fd.clone());
                code.print(fd);
            }
            Self::Signal(sig) => {
                "signal ".print(fd.clone());
                sig.print(fd);
            }
            Self::Stopped(sig) => {
                "stopped ".print(fd.clone());
                sig.print(fd);
            }
            Self::Unknown(status) => {
                "unknown ".print(fd.clone());
                status.print(fd);
            }
        }
    }
}

/// Everything a child wrote, along with how it ended
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Output {
    pub status: Termination,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

/// Which piped output stream a chunk was read from
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stream {
    Stdout,
    Stderr,
}

/// A spawned process
///
/// The streams are present for exactly those slots spawned with `Stdio::Pipe`.  Take them to
/// use them past `wait`; any still held are closed by `wait` before it collects the child's
/// error report.
#[derive(Debug)]
pub struct Child {
    pid: pid_t,
    err_pipe: ErrPipe,
    pub stdin: Option<ChildStdin>,
    pub stdout: Option<ChildStdout>,
    pub stderr: Option<ChildStderr>,
}

impl Child {
    pub(crate) fn from_parts(
        pid: pid_t,
        err_pipe: ErrPipe,
        stdin: Option<ChildStdin>,
        stdout: Option<ChildStdout>,
        stderr: Option<ChildStderr>,
    ) -> Self {
        Self {
            pid,
            err_pipe,
            stdin,
            stdout,
            stderr,
        }
    }

    pub fn id(&self) -> pid_t {
        self.pid
    }

    /// Block until the child exits
    ///
    /// Fails with the child's own report if it failed between fork and exec, whatever its exit
    /// status says.  Both ends of the error pipe are closed on return.
    pub fn wait(mut self) -> Result<Termination, ErrorKind> {
        let reaped = waitpid(self.pid);
        self.close_streams();
        let status = reaped.map_err(|_| ErrorKind::Unexpected)?;

        if let Some(kind) = self.err_pipe.collect()? {
            trace("child failed before exec: ", kind);
            return Err(kind);
        }

        let termination = Termination::from_status(status);
        trace("reaped ", termination);
        Ok(termination)
    }

    /// Send `SIGTERM`, then `wait`
    ///
    /// A child which already exited but was not yet reaped is simply waited for.
    pub fn kill(self) -> Result<Termination, ErrorKind> {
        match kill(self.pid, Signal::SIGTERM) {
            Ok(()) | Err(Errno::ESRCH) => self.wait(),
            Err(Errno::EPERM) => Err(ErrorKind::AccessDenied),
            Err(e) => Err(e.into()),
        }
    }

    /// Read piped stdout and stderr until both reach end of file
    ///
    /// Chunks are handed to `sink` in the order they arrive, whichever stream they come from.
    /// Both streams are taken out of `self` and closed on return, including when `sink` fails,
    /// so a child still writing sees a broken pipe rather than blocking forever.
    pub fn drain(
        &mut self,
        mut sink: impl FnMut(Stream, &[u8]) -> Result<(), ErrorKind>,
    ) -> Result<(), ErrorKind> {
        let stdout = self.stdout.take();
        let stderr = self.stderr.take();
        let mut open = [
            stdout.as_ref().map(ChildStdout::fd),
            stderr.as_ref().map(ChildStderr::fd),
        ];
        let mut chunk = [0u8; READ_CHUNK];

        while open.iter().any(Option::is_some) {
            // The kernel skips negative descriptors
            let mut fds = open.map(|fd| PollFd {
                fd: fd.map_or(-1, Fd::as_raw),
                events: PollEvents::POLLIN,
                revents: PollEvents::empty(),
            });
            restart_on_intr(|| unsafe { ppoll(&mut fds) })?;

            let streams = [Stream::Stdout, Stream::Stderr];
            for ((slot, polled), stream) in open.iter_mut().zip(fds).zip(streams) {
                let Some(fd) = *slot else { continue };
                if polled.revents.bits() == 0 {
                    continue;
                }
                let n = fd.read(&mut chunk)?;
                if n == 0 {
                    *slot = None;
                    continue;
                }
                sink(stream, chunk.get(..n).unwrap_or_default())?;
            }
        }
        Ok(())
    }

    fn close_streams(&mut self) {
        drop(self.stdin.take());
        drop(self.stdout.take());
        drop(self.stderr.take());
    }
}
