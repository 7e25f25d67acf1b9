//! The environment table a process inherits at startup
//!
//! The table is installed once, by whatever runs before caller code (a binary's `main`, or the
//! startup routine of a libc-free binary), and is read-only afterwards.  Nothing in this crate
//! writes to it; per-child environments are built with `EnvStore` instead.

use core::ffi::{CStr, c_char};
use core::marker::PhantomData;
use core::sync::atomic::{AtomicPtr, Ordering};

static INHERITED: AtomicPtr<*const c_char> = AtomicPtr::new(core::ptr::null_mut());

/// Install the process's inherited `envp` table
///
/// Only the first call has an effect; later calls are ignored so that the table seen by readers
/// never changes.
///
/// # Safety
/// - `envp` must be a null-terminated array of pointers to NUL-terminated `KEY=VALUE` strings.
/// - The array and every string it points to must stay valid and unmodified for the rest of the
///   process's life.
pub unsafe fn init_inherited(envp: *const *const c_char) {
    let _ = INHERITED.compare_exchange(
        core::ptr::null_mut(),
        envp as *mut *const c_char,
        Ordering::AcqRel,
        Ordering::Acquire,
    );
}

/// Iterate the inherited environment
///
/// Empty if `init_inherited` has not been called.
pub fn inherited() -> Envp<'static> {
    let envp = INHERITED.load(Ordering::Acquire);
    // SAFETY: init_inherited's contract guarantees the table lives for the rest of the process.
    unsafe { Envp::from_raw(envp) }
}

/// Find `key` in the inherited environment without copying
///
/// Linear scan; the first matching entry wins.
pub fn lookup_inherited(key: &[u8]) -> Option<&'static [u8]> {
    inherited().lookup(key)
}

#[derive(Clone)]
pub struct Envp<'a> {
    cur: *const *const c_char, // null-terminated, or null for an empty table
    _pd: PhantomData<&'a CStr>,
}

impl<'a> Envp<'a> {
    /// # Safety
    /// - `envp` must be null or a valid null-terminated array of pointers to NUL-terminated
    ///   strings that remain valid for the duration of `'a`.
    #[inline]
    pub unsafe fn from_raw(envp: *const *const c_char) -> Self {
        Self {
            cur: envp,
            _pd: PhantomData,
        }
    }

    /// Value of the first entry named `key`
    pub fn lookup(self, key: &[u8]) -> Option<&'a [u8]> {
        self.into_iter()
            .find(|(var, _)| *var == key)
            .map(|(_, val)| val)
    }
}

impl<'a> Iterator for Envp<'a> {
    /// `(KEY, VALUE)`, split at the first `=`
    type Item = (&'a [u8], &'a [u8]);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        if self.cur.is_null() {
            return None;
        }

        // Safety:
        // - self.cur points into a valid, null-terminated envp array
        let p = unsafe { *self.cur };

        // If the dereferenced pointer is null, we've hit the end of the envp array
        if p.is_null() {
            return None;
        }

        self.cur = unsafe { self.cur.add(1) };

        let bytes = unsafe { CStr::from_ptr(p) }.to_bytes();
        match bytes.iter().position(|&c| c == b'=') {
            Some(eq_idx) => Some((
                bytes.get(..eq_idx).unwrap_or_default(),
                bytes.get(eq_idx + 1..).unwrap_or_default(),
            )),
            None => Some((bytes, &b""[..])),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::ffi::CString;
    use std::vec::Vec;

    /// Owned envp table for tests
    pub(crate) struct TestEnvp {
        _strings: Vec<CString>,
        ptrs: Vec<*const c_char>,
    }

    impl TestEnvp {
        pub(crate) fn new(entries: &[&str]) -> Self {
            let strings: Vec<CString> = entries
                .iter()
                .map(|e| CString::new(*e).unwrap())
                .collect();
            let mut ptrs: Vec<*const c_char> = strings.iter().map(|s| s.as_ptr()).collect();
            ptrs.push(core::ptr::null());
            Self {
                _strings: strings,
                ptrs,
            }
        }

        pub(crate) fn envp(&self) -> Envp<'_> {
            unsafe { Envp::from_raw(self.ptrs.as_ptr()) }
        }
    }

    unsafe extern "C" {
        static environ: *const *const c_char;
    }

    /// Install libc's `environ` the way a binary's startup would
    pub(crate) fn init_from_libc() {
        // SAFETY: the test harness never modifies its environment.
        unsafe { init_inherited(environ) };
    }

    #[test]
    fn test_split_at_first_equals() {
        let table = TestEnvp::new(&["A=1", "B=x=y", "C=", "NOEQ"]);
        let entries: Vec<_> = table.envp().collect();
        let expected: [(&[u8], &[u8]); 4] =
            [(b"A", b"1"), (b"B", b"x=y"), (b"C", b""), (b"NOEQ", b"")];
        assert_eq!(entries, expected);
    }

    #[test]
    fn test_lookup_first_match_wins() {
        let table = TestEnvp::new(&["KEY=first", "OTHER=o", "KEY=second"]);
        assert_eq!(table.envp().lookup(b"KEY"), Some(&b"first"[..]));
        assert_eq!(table.envp().lookup(b"OTHER"), Some(&b"o"[..]));
        assert_eq!(table.envp().lookup(b"MISSING"), None);
        // Prefix of a key is not a match
        assert_eq!(table.envp().lookup(b"KE"), None);
    }

    #[test]
    fn test_empty_table() {
        let empty = unsafe { Envp::from_raw(core::ptr::null()) };
        assert_eq!(empty.count(), 0);
        let table = TestEnvp::new(&[]);
        assert_eq!(table.envp().count(), 0);
    }

    #[test]
    fn test_lookup_inherited_matches_std() {
        use std::os::unix::ffi::OsStrExt;

        init_from_libc();
        let mut seen = std::collections::HashSet::new();
        for (key, val) in std::env::vars_os() {
            // Only the first occurrence of a duplicated key is visible through lookup
            if key.as_bytes().contains(&b'=') || !seen.insert(key.clone()) {
                continue;
            }
            assert_eq!(
                lookup_inherited(key.as_bytes()),
                Some(val.as_bytes()),
                "{key:?}"
            );
        }
    }
}
