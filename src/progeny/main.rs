#![no_main]

mod cmd;

use core::ffi::{c_char, c_int};

/// # Safety
///
/// Platform ABI guarantees incoming C-style format
#[unsafe(no_mangle)]
pub unsafe extern "C" fn main(
    argc: c_int,
    argv: *const *const c_char,
    envp: *const *const c_char,
) -> c_int {
    // SAFETY: the startup envp table lives, unmodified, for the rest of the process.
    unsafe { progeny::init_inherited(envp) };
    let argv = unsafe { progeny::os::Argv::from_raw(argc as isize, argv) };

    cmd::Cmd::new(argv).run()
}
