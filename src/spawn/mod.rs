//! Spawning and reaping child processes
//!
//! A spawn allocates its pipes, forks, and in the child wires up the standard streams before
//! exec.  Anything that goes wrong in the child is sent back over an error pipe (see
//! `ipc::err_pipe`) and surfaces from `Child::wait`.

mod child;
mod command;
mod stdio;
pub use child::*;
pub use command::*;
pub use stdio::*;

use crate::env::EnvStore;
use crate::err::ErrorKind;

/// Spawn `path` with `args` as `argv[1..]` and exactly the variables in `env`
///
/// `argv[0]` is always `path`.
pub fn spawn(
    path: &[u8],
    args: &[&[u8]],
    env: &EnvStore,
    stdin: Stdio,
    stdout: Stdio,
    stderr: Stdio,
) -> Result<Child, ErrorKind> {
    Command::new(path)
        .args(args.iter().copied())
        .env(env)
        .stdin(stdin)
        .stdout(stdout)
        .stderr(stderr)
        .spawn()
}
