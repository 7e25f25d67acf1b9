//! Raw Linux system calls
//!
//! Each function is a direct translation of one system call.  Nothing here retries on `EINTR`
//! or translates errors; see `src/os/` for that.
//!
//! Everything here is `unsafe` either because it hands raw pointers to the kernel or because it
//! duplicates or replaces the calling process.

mod io;
mod process;
mod random;
pub use io::*;
pub use process::*;
pub use random::*;
