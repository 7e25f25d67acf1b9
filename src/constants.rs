use crate::types::{CStr, c_int};

// Linux standard pipe size
// Writes <= to this are guaranteed to be atomic
pub const PIPE_BUF: usize = 4096;

// Standard stream slots
pub const STDIN_FILENO: c_int = 0;
pub const STDOUT_FILENO: c_int = 1;
pub const STDERR_FILENO: c_int = 2;

/// Opened once per spawn and shared by every stream with an `Ignore` disposition.
pub const DEV_NULL: &CStr = c"/dev/null";

/// Exit status of a child which failed between fork and exec.
///
/// The status itself carries no information; the reason travels over the error pipe.
pub const CHILD_SETUP_FAILED: c_int = 1;

/// Chunk size used when draining a child's piped output.
pub const READ_CHUNK: usize = PIPE_BUF;
