//! Child-to-parent error reporting
//!
//! Between fork and exec the child cannot return an error to anyone; its exit status would be
//! indistinguishable from a program which deliberately exits non-zero.  Instead the child writes
//! one `ErrCode` to a dedicated pipe and exits.
//!
//! The parent holds both ends of that pipe.  After reaping the child it writes `NO_ERROR` itself
//! and reads one value back.  The child's write, if any, happened before it exited, and the
//! parent's write happens after the reap observed that exit, so the pipe delivers the child's
//! code first when there is one and the parent's own sentinel otherwise.  Neither side ever
//! blocks on the other: each write is a single byte into an otherwise empty pipe.

use crate::err::ErrorKind;
use crate::os::Fd;

/// Wire representation of an `ErrorKind`
pub type ErrCode = u8;

/// "No error" sentinel; no `ErrorKind` encodes to this
pub const NO_ERROR: ErrCode = ErrCode::MAX;

/// Write one code to `fd`
///
/// The pipe is internal plumbing, so every failure is reported as `SystemResources` rather than
/// translated.
pub fn send(fd: &Fd, code: ErrCode) -> Result<(), ErrorKind> {
    let bytes = code.to_le_bytes();
    let mut rest = &bytes[..];
    while !rest.is_empty() {
        match fd.write(rest) {
            Ok(0) | Err(_) => return Err(ErrorKind::SystemResources),
            Ok(n) => rest = rest.get(n..).unwrap_or_default(),
        }
    }
    Ok(())
}

/// Read one code from `fd`, blocking until it is available
pub fn receive(fd: &Fd) -> Result<ErrCode, ErrorKind> {
    let mut bytes = [0u8; core::mem::size_of::<ErrCode>()];
    let mut filled = 0;
    while filled < bytes.len() {
        let rest = bytes.get_mut(filled..).unwrap_or_default();
        match fd.read(rest) {
            Ok(0) | Err(_) => return Err(ErrorKind::SystemResources),
            Ok(n) => filled += n,
        }
    }
    Ok(ErrCode::from_le_bytes(bytes))
}

/// Both ends of a child's error pipe, as held by the parent
///
/// Dropping closes both ends.
#[derive(Debug)]
pub struct ErrPipe {
    read: Fd,
    write: Fd,
}

impl ErrPipe {
    pub fn new(read: Fd, write: Fd) -> Self {
        Self { read, write }
    }

    /// Post the sentinel, then take the first value queued on the pipe
    ///
    /// Must only be called after the child has been reaped.  Returns the child's error, if it
    /// reported one.
    pub fn collect(&self) -> Result<Option<ErrorKind>, ErrorKind> {
        send(&self.write, NO_ERROR)?;
        match receive(&self.read)? {
            NO_ERROR => Ok(None),
            code => Ok(Some(ErrorKind::from_code(code))),
        }
    }
}

impl Drop for ErrPipe {
    fn drop(&mut self) {
        self.write.clone().close();
        self.read.clone().close();
    }
}
