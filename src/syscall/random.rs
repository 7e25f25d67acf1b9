use crate::err::*;
use syscalls::{Sysno, syscall};

// `man 2 getrandom`:
//
// SYNOPSIS
//        ssize_t getrandom(void buf[.buflen], size_t buflen, unsigned int flags);
//
// RETURN VALUE
//        On success, getrandom() returns the number of bytes that were copied to the buffer buf.
//        This may be less than the number of bytes requested via buflen if insufficient bytes
//        are available or if the call was interrupted by a signal.
//
//        On error, -1 is returned, and errno is set to indicate the error.
pub unsafe fn getrandom(buf: &mut [u8], flags: u32) -> Result<usize, Errno> {
    syscall!(Sysno::getrandom, buf.as_mut_ptr(), buf.len(), flags)
}
