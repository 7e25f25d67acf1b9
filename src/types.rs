//! Types shared across system calls.  Types strongly associated with one system call are defined
//! next to that call in `src/syscall/`.

#[allow(non_camel_case_types)]
pub type pid_t = i32;

#[allow(non_camel_case_types)]
pub type uid_t = u32;

#[allow(non_camel_case_types)]
pub type gid_t = u32;

#[allow(non_camel_case_types)]
pub type mode_t = u32;

#[allow(non_camel_case_types)]
pub type c_int = core::ffi::c_int;

#[allow(non_camel_case_types)]
pub type c_char = core::ffi::c_char;

pub type CStr = core::ffi::CStr;

#[allow(clippy::upper_case_acronyms)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u32)]
// Only the signals this crate sends or arranges to receive
pub enum Signal {
    SIGTERM = 15,
    SIGCHLD = 17,
}
