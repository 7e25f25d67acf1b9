//! Print framework
//!
//! Output goes straight to the standard descriptors with one write(2) per piece; nothing is
//! buffered and `core::fmt` is not involved.  Write failures are ignored.

use crate::err::ErrorKind;
use crate::os::{Fd, STDERR, STDOUT};
use crate::types::pid_t;
use core::ffi::CStr;

pub fn print<T: Print>(s: T) {
    s.print(STDOUT);
}

pub fn println<T: Print>(s: T) {
    s.print(STDOUT);
    b"\n".print(STDOUT);
}

pub fn eprint<T: Print>(s: T) {
    s.print(STDERR);
}

pub fn eprintln<T: Print>(s: T) {
    s.print(STDERR);
    b"\n".print(STDERR);
}

/// Library diagnostics, compiled in with the `trace` feature
///
/// Prints `progeny: <what><value>` to stderr.  Never call this in a forked child before exec:
/// the child's stderr may already be redirected.
#[inline]
pub fn trace<T: Print>(what: &str, value: T) {
    if cfg!(feature = "trace") {
        eprint("progeny: ");
        eprint(what);
        eprint(value);
        eprint("\n");
    }
}

pub trait Print {
    fn print(&self, fd: Fd);
}

impl<T: Print + ?Sized> Print for &T {
    fn print(&self, fd: Fd) {
        (**self).print(fd);
    }
}

impl Print for [u8] {
    fn print(&self, fd: Fd) {
        let _ = fd.write_all(self);
    }
}

impl<const N: usize> Print for [u8; N] {
    fn print(&self, fd: Fd) {
        let _ = fd.write_all(self);
    }
}

impl Print for str {
    fn print(&self, fd: Fd) {
        let _ = fd.write_all(self.as_bytes());
    }
}

impl Print for CStr {
    fn print(&self, fd: Fd) {
        let _ = fd.write_all(self.to_bytes());
    }
}

impl Print for ErrorKind {
    fn print(&self, fd: Fd) {
        let _ = fd.write_all(self.description().as_bytes());
    }
}

impl Print for u8 {
    fn print(&self, fd: Fd) {
        let _ = fd.write_all(itoa::Buffer::new().format(*self).as_bytes());
    }
}

impl Print for u32 {
    fn print(&self, fd: Fd) {
        let _ = fd.write_all(itoa::Buffer::new().format(*self).as_bytes());
    }
}

impl Print for pid_t {
    fn print(&self, fd: Fd) {
        let _ = fd.write_all(itoa::Buffer::new().format(*self).as_bytes());
    }
}

impl Print for usize {
    fn print(&self, fd: Fd) {
        let _ = fd.write_all(itoa::Buffer::new().format(*self).as_bytes());
    }
}
