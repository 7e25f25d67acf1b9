//! Inter-process communication between a spawning parent and its child

mod err_pipe;
pub use err_pipe::*;
