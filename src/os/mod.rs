//! Safe wrappers over `src/syscall/`
//!
//! Interrupted calls are restarted here and nowhere else.

mod argv;
mod envp;
mod exec;
mod fd;
mod print;
mod process;
mod random;
pub use argv::*;
pub use envp::*;
pub use exec::*;
pub use fd::*;
pub use print::*;
pub use process::*;
pub use random::*;

#[cfg(test)]
pub(crate) use envp::tests as envp_tests;

use crate::err::Errno;

/// Repeat a system call for as long as it fails with `EINTR`
#[inline]
pub(crate) fn restart_on_intr<T>(mut call: impl FnMut() -> Result<T, Errno>) -> Result<T, Errno> {
    loop {
        match call() {
            Err(Errno::EINTR) => continue,
            result => return result,
        }
    }
}
