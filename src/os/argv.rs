use core::ffi::{CStr, c_char};

/// A process's `argv`, consumed front to back
#[derive(Clone)]
pub struct Argv<'a> {
    raw: &'a [*const c_char],
}

impl<'a> Argv<'a> {
    /// # Safety
    /// - `argv..argv+argc` must be valid for reads during `'a`, and each entry must point to a
    ///   NUL-terminated string valid for the same duration.
    pub unsafe fn from_raw(argc: isize, argv: *const *const c_char) -> Self {
        let raw = if argv.is_null() || argc <= 0 {
            &[][..]
        } else {
            unsafe { core::slice::from_raw_parts(argv, argc as usize) }
        };
        Self { raw }
    }

    /// Remaining entries
    #[inline]
    pub fn len(&self) -> usize {
        self.raw.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// Take the next entry, if any
    #[inline]
    pub fn pop(&mut self) -> Option<&'a CStr> {
        let (&head, tail) = self.raw.split_first()?;
        self.raw = tail;
        // SAFETY: from_raw's contract covers every entry.
        Some(unsafe { CStr::from_ptr(head) })
    }

    /// Take the next entry as the value of `option`, aborting if there is none
    pub fn pop_value(&mut self, option: &str) -> &'a CStr {
        use crate::err::abort_with_msg;
        use crate::os::eprint;

        match self.pop() {
            Some(value) => value,
            None => {
                eprint("ERROR: ");
                eprint(option);
                abort_with_msg(" requires a value.  See `--help`")
            }
        }
    }
}

impl<'a> Iterator for Argv<'a> {
    type Item = &'a CStr;

    fn next(&mut self) -> Option<Self::Item> {
        self.pop()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.len(), Some(self.len()))
    }
}

impl ExactSizeIterator for Argv<'_> {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::vec::Vec;

    #[test]
    fn test_pop_in_order() {
        let strings = [c"progeny", c"-i", c"/bin/true"];
        let ptrs: Vec<*const c_char> = strings.iter().map(|s| s.as_ptr()).collect();
        let mut argv = unsafe { Argv::from_raw(ptrs.len() as isize, ptrs.as_ptr()) };

        assert_eq!(argv.len(), 3);
        assert_eq!(argv.pop(), Some(c"progeny"));
        let rest: Vec<&CStr> = argv.clone().collect();
        assert_eq!(rest, [c"-i", c"/bin/true"]);
        assert_eq!(argv.pop(), Some(c"-i"));
        assert_eq!(argv.pop(), Some(c"/bin/true"));
        assert_eq!(argv.pop(), None);
        assert!(argv.is_empty());
    }

    #[test]
    fn test_null_argv() {
        let argv = unsafe { Argv::from_raw(0, core::ptr::null()) };
        assert_eq!(argv.count(), 0);
    }
}
