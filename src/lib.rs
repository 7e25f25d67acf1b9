#![cfg_attr(not(test), no_std)]

//! Linux child processes: spawn with per-stream stdio dispositions, learn why exec failed, reap.
//!
//! ```text
//! spawn/    Command, Child, Stdio        fork, wire up stdio, exec; wait and collect errors
//! ipc/      error pipe                   child-to-parent failure reports
//! env/      EnvStore                     owned environment for a child
//! os/       Fd, ExecArgs, Envp, print    EINTR-safe wrappers, argv/envp marshalling
//! syscall/                               raw system calls
//! ```

extern crate alloc;

pub mod constants;
pub mod env;
pub mod err;
pub mod ipc;
pub mod os;
pub mod spawn;
pub mod syscall;
pub mod types;

pub use env::{EnvStore, build_env_from_inherited, lookup_inherited};
pub use err::ErrorKind;
pub use os::{fill_random, init_inherited};
pub use spawn::{
    Child, ChildStderr, ChildStdin, ChildStdout, Command, Output, Stdio, Stream, Termination,
    spawn,
};
