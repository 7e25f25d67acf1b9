use crate::constants::READ_CHUNK;
use crate::err::ErrorKind;
use crate::os::{Fd, Print};
use crate::types::c_int;
use alloc::vec::Vec;

/// What a child's standard stream is connected to
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Stdio {
    /// Leave the parent's descriptor in place
    #[default]
    Inherit,
    /// Connect to `/dev/null`
    Ignore,
    /// Connect to a new pipe whose other end the parent keeps
    Pipe,
    /// Close the slot in the child
    Close,
}

impl Stdio {
    pub fn from_name(name: &[u8]) -> Option<Self> {
        match name {
            b"inherit" => Some(Self::Inherit),
            b"ignore" => Some(Self::Ignore),
            b"pipe" => Some(Self::Pipe),
            b"close" => Some(Self::Close),
            _ => None,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Inherit => "inherit",
            Self::Ignore => "ignore",
            Self::Pipe => "pipe",
            Self::Close => "close",
        }
    }
}

impl Print for Stdio {
    fn print(&self, fd: Fd) {
        self.name().print(fd);
    }
}

/// Parent's write end of a child's piped stdin
///
/// Dropping it closes the pipe, which the child sees as end of input.
#[derive(Debug)]
pub struct ChildStdin(Fd);

impl ChildStdin {
    pub(crate) fn new(fd: Fd) -> Self {
        Self(fd)
    }

    pub fn write(&self, buf: &[u8]) -> Result<usize, ErrorKind> {
        self.0.write(buf)
    }

    pub fn write_all(&self, buf: &[u8]) -> Result<(), ErrorKind> {
        self.0.write_all(buf)
    }

    pub fn as_raw(&self) -> c_int {
        self.0.as_raw()
    }

    pub fn close(self) {}
}

impl Drop for ChildStdin {
    fn drop(&mut self) {
        self.0.clone().close();
    }
}

macro_rules! child_output {
    ($name:ident, $stream:literal) => {
        #[doc = concat!("Parent's read end of a child's piped ", $stream)]
        #[derive(Debug)]
        pub struct $name(Fd);

        impl $name {
            pub(crate) fn new(fd: Fd) -> Self {
                Self(fd)
            }

            /// One read; `Ok(0)` once the child has closed its end
            pub fn read(&self, buf: &mut [u8]) -> Result<usize, ErrorKind> {
                self.0.read(buf)
            }

            /// Append everything up to end of file to `out`, returning the number of bytes read
            pub fn read_to_end(&self, out: &mut Vec<u8>) -> Result<usize, ErrorKind> {
                let mut chunk = [0u8; READ_CHUNK];
                let mut total = 0;
                loop {
                    let n = self.0.read(&mut chunk)?;
                    if n == 0 {
                        return Ok(total);
                    }
                    append(out, chunk.get(..n).unwrap_or_default())?;
                    total += n;
                }
            }

            pub(crate) fn fd(&self) -> &Fd {
                &self.0
            }

            pub fn as_raw(&self) -> c_int {
                self.0.as_raw()
            }

            pub fn close(self) {}
        }

        impl Drop for $name {
            fn drop(&mut self) {
                self.0.clone().close();
            }
        }
    };
}

child_output!(ChildStdout, "stdout");
child_output!(ChildStderr, "stderr");

pub(crate) fn append(out: &mut Vec<u8>, bytes: &[u8]) -> Result<(), ErrorKind> {
    out.try_reserve(bytes.len())
        .map_err(|_| ErrorKind::OutOfMemory)?;
    out.extend_from_slice(bytes);
    Ok(())
}
