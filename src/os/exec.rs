//! `execve` argument marshalling
//!
//! `ExecArgs` owns every buffer handed to the kernel: a NUL-terminated path, and two
//! null-terminated pointer arrays whose entries point into NUL-terminated strings owned by the
//! same value.  Everything is released when it is dropped, which after a successful exec never
//! happens (the address space is gone) and after a failed one happens on the normal path.
//!
//! Building an `ExecArgs` allocates; executing one does not.  Build it before forking and only
//! `exec()` it in the child.

use crate::err::*;
use crate::syscall::execve;
use alloc::ffi::CString;
use alloc::vec::Vec;
use core::ffi::{CStr, c_char};

pub struct ExecArgs {
    path: CString,
    // Storage behind argv and envp.  Moving a CString does not move its heap buffer, so pointers
    // taken before a push stay valid.
    strings: Vec<CString>,
    argv: Vec<*const c_char>,
    envp: Vec<*const c_char>,
}

impl ExecArgs {
    /// Marshal `path`, `args` and `env` for `execve`
    ///
    /// `argv[0]` is always a copy of `path`; `args` fill `argv[1..]`.  Each `(key, value)` in
    /// `env` becomes one `KEY=VALUE` string.
    ///
    /// Fails with `InvalidArgument` if any input contains a NUL byte or a key contains `=`, and
    /// with `OutOfMemory` if an allocation fails.
    pub fn new<A, E, K, V>(path: &[u8], args: A, env: E) -> Result<Self, ErrorKind>
    where
        A: IntoIterator,
        A::Item: AsRef<[u8]>,
        E: IntoIterator<Item = (K, V)>,
        K: AsRef<[u8]>,
        V: AsRef<[u8]>,
    {
        let mut marshalled = Self {
            path: c_string(&[path])?,
            strings: Vec::new(),
            argv: Vec::new(),
            envp: Vec::new(),
        };

        let argv0 = marshalled.store(&[path])?;
        push(&mut marshalled.argv, argv0)?;
        for arg in args {
            let arg = marshalled.store(&[arg.as_ref()])?;
            push(&mut marshalled.argv, arg)?;
        }
        push(&mut marshalled.argv, core::ptr::null())?;

        for (key, value) in env {
            let key = key.as_ref();
            if key.contains(&b'=') {
                return Err(ErrorKind::InvalidArgument);
            }
            let entry = marshalled.store(&[key, b"=", value.as_ref()])?;
            push(&mut marshalled.envp, entry)?;
        }
        push(&mut marshalled.envp, core::ptr::null())?;

        Ok(marshalled)
    }

    /// Replace the calling process's image
    ///
    /// Only returns on failure, with the translated reason.
    pub fn exec(&self) -> ErrorKind {
        // SAFETY: path is NUL-terminated, argv and envp are null-terminated arrays of pointers
        // into NUL-terminated strings owned by self.
        let errno = unsafe { execve(&self.path, self.argv.as_ptr(), self.envp.as_ptr()) };
        ErrorKind::from_exec_errno(errno)
    }

    pub fn path(&self) -> &CStr {
        &self.path
    }

    /// Entries of argv before its null terminator
    pub fn argv(&self) -> impl Iterator<Item = &CStr> + '_ {
        walk(&self.argv)
    }

    /// Entries of envp before its null terminator
    pub fn envp(&self) -> impl Iterator<Item = &CStr> + '_ {
        walk(&self.envp)
    }

    /// Concatenate `parts` into a new owned C string and return a pointer to it
    fn store(&mut self, parts: &[&[u8]]) -> Result<*const c_char, ErrorKind> {
        let s = c_string(parts)?;
        let ptr = s.as_ptr();
        self.strings
            .try_reserve(1)
            .map_err(|_| ErrorKind::OutOfMemory)?;
        self.strings.push(s);
        Ok(ptr)
    }
}

/// Copy `bytes` into a new C string; same failure modes as `ExecArgs::new`
pub fn to_c_string(bytes: &[u8]) -> Result<CString, ErrorKind> {
    c_string(&[bytes])
}

fn c_string(parts: &[&[u8]]) -> Result<CString, ErrorKind> {
    let len = parts
        .iter()
        .try_fold(1usize, |acc, p| acc.checked_add(p.len()))
        .ok_or(ErrorKind::OutOfMemory)?;

    let mut buf = Vec::new();
    buf.try_reserve_exact(len)
        .map_err(|_| ErrorKind::OutOfMemory)?;
    for part in parts {
        buf.extend_from_slice(part);
    }
    buf.push(0);

    // Rejects interior NULs
    CString::from_vec_with_nul(buf).map_err(|_| ErrorKind::InvalidArgument)
}

fn push(array: &mut Vec<*const c_char>, ptr: *const c_char) -> Result<(), ErrorKind> {
    array.try_reserve(1).map_err(|_| ErrorKind::OutOfMemory)?;
    array.push(ptr);
    Ok(())
}

fn walk(array: &[*const c_char]) -> impl Iterator<Item = &CStr> + '_ {
    array
        .iter()
        .take_while(|p| !p.is_null())
        // SAFETY: every non-null entry points into a CString owned alongside the array
        .map(|&p| unsafe { CStr::from_ptr(p) })
}
