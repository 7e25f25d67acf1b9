use progeny::err::*;
use progeny::os::*;
use progeny::spawn::*;
use progeny::types::*;
use progeny::{EnvStore, build_env_from_inherited};

pub enum Cmd<'a> {
    Help,
    Run(Run<'a>),
}

pub struct Run<'a> {
    program: &'a CStr,
    args: Argv<'a>,
    env: EnvStore,
    stdio: [Stdio; 3],
    cwd: Option<&'a CStr>,
}

impl<'a> Cmd<'a> {
    pub fn new(mut argv: Argv<'a>) -> Self {
        // The CLI format is:
        //
        // progeny [OPTIONS] [--] PROGRAM [ARGS...]
        //
        // Options apply in order, so `-i` discards any `-e` given before it.  The first argument
        // which is not an option is the program; everything after it is passed through.

        // Ignore argv[0]
        let _ = argv.pop();

        let mut env = build_env_from_inherited().or_abort("Unable to copy environment");
        let mut stdio = [Stdio::Inherit; 3];
        let mut cwd = None;

        let program = loop {
            let arg = argv.pop().or_abort("No program specified.  See `--help`");
            match arg.to_bytes() {
                b"-h" | b"--help" => return Self::Help,
                b"--" => break argv.pop().or_abort("No program specified.  See `--help`"),
                b"-i" => env = EnvStore::new(),
                b"-e" => {
                    let (key, value) = split_assignment(argv.pop_value("-e").to_bytes())
                        .or_abort("-e expects KEY=VALUE");
                    env.set(key, value)
                        .or_abort("Unable to set environment variable");
                }
                b"-u" => env.delete(argv.pop_value("-u").to_bytes()),
                b"-C" => cwd = Some(argv.pop_value("-C")),
                bytes if set_stdio(bytes, &mut stdio) => {}
                [b'-', ..] => abort_with_msg("Invalid option.  See `--help`"),
                _ => break arg,
            }
        };

        Self::Run(Run {
            program,
            args: argv,
            env,
            stdio,
            cwd,
        })
    }

    pub fn run(self) -> ! {
        match self {
            Cmd::Help => cmd_help(),
            Cmd::Run(run) => cmd_run(run),
        }
    }
}

/// Split `KEY=VALUE` at the first `=`; the key must not be empty
fn split_assignment(assignment: &[u8]) -> Option<(&[u8], &[u8])> {
    let eq = assignment.iter().position(|&b| b == b'=')?;
    let key = assignment.get(..eq)?;
    let value = assignment.get(eq + 1..)?;
    if key.is_empty() {
        return None;
    }
    Some((key, value))
}

/// Apply a `--stdin=`, `--stdout=` or `--stderr=` option; false if `arg` is none of these
fn set_stdio(arg: &[u8], stdio: &mut [Stdio; 3]) -> bool {
    let [stdin, stdout, stderr] = stdio;
    let (slot, name) = if let Some(name) = arg.strip_prefix(b"--stdin=") {
        (stdin, name)
    } else if let Some(name) = arg.strip_prefix(b"--stdout=") {
        (stdout, name)
    } else if let Some(name) = arg.strip_prefix(b"--stderr=") {
        (stderr, name)
    } else {
        return false;
    };

    *slot = Stdio::from_name(name)
        .or_abort("Invalid disposition; expected one of inherit, ignore, pipe, close");
    true
}

fn cmd_help() -> ! {
    println(
        r#"Usage: progeny [OPTIONS] [--] PROGRAM [ARGS...]

Runs PROGRAM with ARGS, then prints how it terminated to stderr and exits with
its status (128 + signal number if it was killed by a signal).

PROGRAM is executed directly; it is not looked up in $PATH.

OPTIONS:
   --stdin=MODE   Connect the program's stdin as MODE (default: inherit)
   --stdout=MODE  Connect the program's stdout as MODE (default: inherit)
   --stderr=MODE  Connect the program's stderr as MODE (default: inherit)
-e KEY=VALUE      Set an environment variable
-u KEY            Unset an environment variable
-i                Start from an empty environment
-C DIR            Run the program in DIR
-h, --help        Print this help

MODES:
inherit  Share progeny's own stream
ignore   Connect to /dev/null
pipe     Connect to a pipe; output is copied to progeny's own stream, input is
         closed immediately
close    Leave the stream closed

REPORT (on stderr):
exited N   The program exited with status N
signal N   The program was killed by signal N
stopped N  The program was stopped by signal N
unknown N  The raw wait status was not recognised"#,
    );
    exit(0)
}

fn cmd_run(run: Run) -> ! {
    let Run {
        program,
        args,
        env,
        stdio: [stdin, stdout, stderr],
        cwd,
    } = run;

    let mut cmd = Command::new(program.to_bytes())
        .args(args.map(CStr::to_bytes))
        .env(&env)
        .stdin(stdin)
        .stdout(stdout)
        .stderr(stderr);
    if let Some(dir) = cwd {
        cmd = cmd.current_dir(dir.to_bytes());
    }

    let mut child = cmd.spawn().or_fs_abort("spawn", program.to_bytes());

    // Piped stdin gets nothing
    drop(child.stdin.take());
    child
        .drain(|stream, bytes| match stream {
            Stream::Stdout => STDOUT.write_all(bytes),
            Stream::Stderr => STDERR.write_all(bytes),
        })
        .or_abort("Unable to forward output");

    let termination = child.wait().or_fs_abort("run", program.to_bytes());
    eprintln(termination);
    exit(termination.exit_code())
}
