use crate::constants::*;
use crate::env::EnvStore;
use crate::err::ErrorKind;
use crate::ipc::{ErrPipe, send};
use crate::os::*;
use crate::spawn::*;
use crate::types::*;
use super::stdio::append;
use alloc::vec::Vec;

/// How to spawn a child
///
/// Without `env`, the child gets the process's inherited environment (see
/// `os::init_inherited`).  All three streams default to `Stdio::Inherit`.
#[derive(Clone, Debug)]
pub struct Command<'a> {
    path: &'a [u8],
    args: Vec<&'a [u8]>,
    env: Option<&'a EnvStore>,
    stdin: Stdio,
    stdout: Stdio,
    stderr: Stdio,
    cwd: Option<&'a [u8]>,
    uid: Option<uid_t>,
    gid: Option<gid_t>,
}

impl<'a> Command<'a> {
    pub fn new(path: &'a [u8]) -> Self {
        Self {
            path,
            args: Vec::new(),
            env: None,
            stdin: Stdio::Inherit,
            stdout: Stdio::Inherit,
            stderr: Stdio::Inherit,
            cwd: None,
            uid: None,
            gid: None,
        }
    }

    pub fn arg(mut self, arg: &'a [u8]) -> Self {
        self.args.push(arg);
        self
    }

    pub fn args<I: IntoIterator<Item = &'a [u8]>>(mut self, args: I) -> Self {
        self.args.extend(args);
        self
    }

    /// Give the child exactly the variables in `env`
    pub fn env(mut self, env: &'a EnvStore) -> Self {
        self.env = Some(env);
        self
    }

    pub fn stdin(mut self, stdio: Stdio) -> Self {
        self.stdin = stdio;
        self
    }

    pub fn stdout(mut self, stdio: Stdio) -> Self {
        self.stdout = stdio;
        self
    }

    pub fn stderr(mut self, stdio: Stdio) -> Self {
        self.stderr = stdio;
        self
    }

    /// Change to `dir` in the child before exec
    pub fn current_dir(mut self, dir: &'a [u8]) -> Self {
        self.cwd = Some(dir);
        self
    }

    /// Switch to `uid` in the child before exec
    pub fn uid(mut self, uid: uid_t) -> Self {
        self.uid = Some(uid);
        self
    }

    /// Switch to `gid` in the child before exec; applied before `uid`
    pub fn gid(mut self, gid: gid_t) -> Self {
        self.gid = Some(gid);
        self
    }

    pub fn spawn(&self) -> Result<Child, ErrorKind> {
        spawn_with(self, &mut System)
    }

    /// Run to completion, capturing stdout and stderr
    ///
    /// Either stream growing past `max_output_bytes` fails with `FileTooBig`.  The child is
    /// reaped on every path once it has been spawned.
    pub fn output(&self, max_output_bytes: usize) -> Result<Output, ErrorKind> {
        let cmd = self.clone().stdout(Stdio::Pipe).stderr(Stdio::Pipe);
        let mut child = cmd.spawn()?;
        drop(child.stdin.take());

        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        let drained = child.drain(|stream, bytes| {
            let captured = match stream {
                Stream::Stdout => &mut stdout,
                Stream::Stderr => &mut stderr,
            };
            if captured.len().saturating_add(bytes.len()) > max_output_bytes {
                return Err(ErrorKind::FileTooBig);
            }
            append(captured, bytes)
        });
        let status = child.wait();

        drained?;
        Ok(Output {
            status: status?,
            stdout,
            stderr,
        })
    }

    fn dispositions(&self) -> [Stdio; 3] {
        [self.stdin, self.stdout, self.stderr]
    }
}

/// The resources a spawn acquires, in the order it acquires them
pub(crate) trait Resources {
    /// Returns `(read_end, write_end)`, both close-on-exec
    fn pipe(&mut self) -> Result<(Fd, Fd), ErrorKind>;

    /// The discard device, opened read-write and close-on-exec
    fn dev_null(&mut self) -> Result<Fd, ErrorKind>;

    /// # Safety
    /// - Same contract as `os::fork`.
    unsafe fn fork(&mut self) -> Result<ForkResult, ErrorKind>;
}

/// The real thing
pub(crate) struct System;

impl Resources for System {
    fn pipe(&mut self) -> Result<(Fd, Fd), ErrorKind> {
        Fd::new_pipe(OpenFlags::O_CLOEXEC)
    }

    fn dev_null(&mut self) -> Result<Fd, ErrorKind> {
        Fd::open(DEV_NULL, OpenFlags::O_RDWR | OpenFlags::O_CLOEXEC, 0)
    }

    unsafe fn fork(&mut self) -> Result<ForkResult, ErrorKind> {
        unsafe { fork() }
    }
}

/// `Command::spawn` acquiring its descriptors and process through `resources`
pub(crate) fn spawn_with(
    cmd: &Command<'_>,
    resources: &mut impl Resources,
) -> Result<Child, ErrorKind> {
    // Everything the child needs is allocated here: it must not touch the allocator.
    let exec = match cmd.env {
        Some(env) => ExecArgs::new(cmd.path, &cmd.args, env.iter())?,
        None => ExecArgs::new(cmd.path, &cmd.args, inherited())?,
    };
    let cwd = cmd.cwd.map(to_c_string).transpose()?;

    let plumbing = Plumbing::allocate(cmd, &mut *resources)?;
    trace("spawning with ", Dispositions(cmd.dispositions()));

    // SAFETY: the child only makes raw system calls on memory prepared above, then execs or
    // exits.
    let pid = match unsafe { resources.fork() } {
        Ok(ForkResult::Parent(pid)) => pid,
        Ok(ForkResult::Child) => plumbing.run_child(cmd, cwd.as_deref(), &exec),
        Err(e) => {
            plumbing.teardown();
            return Err(e);
        }
    };

    trace("spawned pid ", pid);
    Ok(plumbing.into_child(pid))
}

/// Descriptors set up for one spawn; pipes are `(read, write)`
struct Plumbing {
    stdin: Option<(Fd, Fd)>,
    stdout: Option<(Fd, Fd)>,
    stderr: Option<(Fd, Fd)>,
    err: (Fd, Fd),
    dev_null: Option<Fd>,
}

impl Plumbing {
    /// Create a pipe per `Stdio::Pipe` stream, the error pipe, then `/dev/null` if any stream is
    /// `Stdio::Ignore`
    ///
    /// On failure everything created so far is closed, newest first.
    fn allocate(cmd: &Command<'_>, resources: &mut impl Resources) -> Result<Self, ErrorKind> {
        let dispositions = cmd.dispositions();

        let mut stdio: [Option<(Fd, Fd)>; 3] = Default::default();
        let mut failure = None;
        for (pipe, disposition) in stdio.iter_mut().zip(dispositions) {
            if disposition != Stdio::Pipe {
                continue;
            }
            match resources.pipe() {
                Ok(created) => *pipe = Some(created),
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            }
        }
        if let Some(e) = failure {
            release(stdio);
            return Err(e);
        }

        let err = match resources.pipe() {
            Ok(err) => err,
            Err(e) => {
                release(stdio);
                return Err(e);
            }
        };

        let dev_null = if dispositions.contains(&Stdio::Ignore) {
            match resources.dev_null() {
                Ok(fd) => Some(fd),
                Err(e) => {
                    close_pair(err);
                    release(stdio);
                    return Err(e);
                }
            }
        } else {
            None
        };

        let [stdin, stdout, stderr] = stdio;
        Ok(Self {
            stdin,
            stdout,
            stderr,
            err,
            dev_null,
        })
    }

    fn teardown(self) {
        if let Some(fd) = self.dev_null {
            fd.close();
        }
        close_pair(self.err);
        release([self.stdin, self.stdout, self.stderr]);
    }

    /// Child side: wire up the streams, apply the setup options, exec
    ///
    /// Any failure is sent over the error pipe before exiting.  The error pipe itself is left
    /// open; exec closes it, and so does exit.
    fn run_child(&self, cmd: &Command<'_>, cwd: Option<&CStr>, exec: &ExecArgs) -> ! {
        let kind = match self.setup_child(cmd, cwd) {
            Ok(()) => exec.exec(),
            Err(e) => e,
        };
        let _ = send(&self.err.1, kind.code());
        exit(CHILD_SETUP_FAILED)
    }

    fn setup_child(&self, cmd: &Command<'_>, cwd: Option<&CStr>) -> Result<(), ErrorKind> {
        // A parent started with standard slots closed may have been handed pipe ends or
        // /dev/null in them, where wiring an earlier slot would overwrite them.
        let dev_null = above_stdio(self.dev_null.as_ref())?;
        let stdin = above_stdio(self.stdin.as_ref().map(|(read, _)| read))?;
        let stdout = above_stdio(self.stdout.as_ref().map(|(_, write)| write))?;
        let stderr = above_stdio(self.stderr.as_ref().map(|(_, write)| write))?;
        let dev_null = dev_null.as_ref();

        wire(STDIN_FILENO, cmd.stdin, stdin.as_ref(), dev_null)?;
        wire(STDOUT_FILENO, cmd.stdout, stdout.as_ref(), dev_null)?;
        wire(STDERR_FILENO, cmd.stderr, stderr.as_ref(), dev_null)?;

        if let Some(dir) = cwd {
            chdir(dir)?;
        }
        if let Some(gid) = cmd.gid {
            setgid(gid)?;
        }
        if let Some(uid) = cmd.uid {
            setuid(uid)?;
        }
        Ok(())
    }

    /// Parent side: drop the child's ends and keep ours
    fn into_child(self, pid: pid_t) -> Child {
        if let Some(fd) = self.dev_null {
            fd.close();
        }
        let stdin = self.stdin.map(|(read, write)| {
            read.close();
            ChildStdin::new(write)
        });
        let stdout = self.stdout.map(|(read, write)| {
            write.close();
            ChildStdout::new(read)
        });
        let stderr = self.stderr.map(|(read, write)| {
            write.close();
            ChildStderr::new(read)
        });
        let (err_read, err_write) = self.err;
        Child::from_parts(
            pid,
            ErrPipe::new(err_read, err_write),
            stdin,
            stdout,
            stderr,
        )
    }
}

/// `fd`, or a close-on-exec duplicate of it if it occupies a standard slot
fn above_stdio(fd: Option<&Fd>) -> Result<Option<Fd>, ErrorKind> {
    fd.map(|fd| match fd.as_raw() {
        STDIN_FILENO..=STDERR_FILENO => fd.dup_above(STDERR_FILENO),
        _ => Ok(fd.clone()),
    })
    .transpose()
}

/// `stdin=... stdout=... stderr=...`
struct Dispositions([Stdio; 3]);

impl Print for Dispositions {
    fn print(&self, fd: Fd) {
        let [stdin, stdout, stderr] = self.0;
        "stdin=".print(fd.clone());
        stdin.print(fd.clone());
        " stdout=".print(fd.clone());
        stdout.print(fd.clone());
        " stderr=".print(fd.clone());
        stderr.print(fd);
    }
}

/// Point standard slot `slot` at what `stdio` asks for
fn wire(
    slot: c_int,
    stdio: Stdio,
    pipe_end: Option<&Fd>,
    dev_null: Option<&Fd>,
) -> Result<(), ErrorKind> {
    let source = match stdio {
        Stdio::Inherit => return Ok(()),
        Stdio::Close => {
            Fd::from_raw(slot).close();
            return Ok(());
        }
        Stdio::Pipe => pipe_end,
        Stdio::Ignore => dev_null,
    };
    source.ok_or(ErrorKind::Unexpected)?.dup_to(slot)?;
    Ok(())
}

fn close_pair((read, write): (Fd, Fd)) {
    write.close();
    read.close();
}

fn release(pipes: [Option<(Fd, Fd)>; 3]) {
    for pipe in pipes.into_iter().rev().flatten() {
        close_pair(pipe);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::ffi::OsStrExt;
    use std::os::unix::fs::{MetadataExt, PermissionsExt};
    use std::path::PathBuf;
    use std::vec::Vec;

    fn sh(script: &[u8]) -> Command<'_> {
        Command::new(b"/bin/sh").arg(b"-c").arg(script)
    }

    fn read_all(stream: Option<ChildStdout>) -> Vec<u8> {
        let mut out = Vec::new();
        stream.unwrap().read_to_end(&mut out).unwrap();
        out
    }

    fn temp_file(name: &str, contents: &[u8], mode: u32) -> PathBuf {
        let path = std::env::temp_dir().join(format!("progeny-{}-{name}", std::process::id()));
        std::fs::write(&path, contents).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(mode)).unwrap();
        path
    }

    /// Another test forking while the file was open for writing makes exec see ETXTBSY.
    fn run_until_not_busy(path: &[u8]) -> Result<Termination, ErrorKind> {
        for _ in 0..50 {
            match Command::new(path).spawn()?.wait() {
                Err(ErrorKind::FileBusy) => std::thread::sleep(std::time::Duration::from_millis(20)),
                result => return result,
            }
        }
        Err(ErrorKind::FileBusy)
    }

    fn fd_target(fd: c_int) -> Option<PathBuf> {
        std::fs::read_link(format!("/proc/self/fd/{fd}")).ok()
    }

    #[test]
    fn test_exit_status() {
        let status = sh(b"exit 3").spawn().unwrap().wait();
        assert_eq!(status, Ok(Termination::Exited(3)));
    }

    #[test]
    fn test_killed_by_signal() {
        let status = sh(b"kill -9 $$").spawn().unwrap().wait();
        assert_eq!(status, Ok(Termination::Signal(9)));
    }

    #[test]
    fn test_missing_program() {
        let child = Command::new(b"/nonexistent/progeny").spawn().unwrap();
        assert_eq!(child.wait(), Err(ErrorKind::FileNotFound));
    }

    #[test]
    fn test_program_without_execute_permission() {
        let path = temp_file("noexec", b"#!/bin/sh\nexit 0\n", 0o644);
        let result = run_until_not_busy(path.as_os_str().as_bytes());
        std::fs::remove_file(&path).unwrap();
        assert_eq!(result, Err(ErrorKind::AccessDenied));
    }

    #[test]
    fn test_program_in_unknown_format() {
        let path = temp_file("garbage", b"\x01\x02\x03 not a program\n", 0o755);
        let result = run_until_not_busy(path.as_os_str().as_bytes());
        std::fs::remove_file(&path).unwrap();
        assert_eq!(result, Err(ErrorKind::InvalidExe));
    }

    #[test]
    fn test_stdout_pipe() {
        let mut child = sh(b"printf 'ok\\n'").stdout(Stdio::Pipe).spawn().unwrap();
        assert!(child.stdin.is_none());
        assert!(child.stderr.is_none());
        assert_eq!(read_all(child.stdout.take()), b"ok\n");
        assert_eq!(child.wait(), Ok(Termination::Exited(0)));
    }

    #[test]
    fn test_stdin_pipe() {
        let mut child = Command::new(b"/bin/cat")
            .stdin(Stdio::Pipe)
            .stdout(Stdio::Pipe)
            .spawn()
            .unwrap();
        child.stdin.take().unwrap().write_all(b"hello").unwrap();
        assert_eq!(read_all(child.stdout.take()), b"hello");
        assert_eq!(child.wait(), Ok(Termination::Exited(0)));
    }

    #[test]
    fn test_stdin_close() {
        let status = Command::new(b"/bin/cat")
            .stdin(Stdio::Close)
            .stderr(Stdio::Ignore)
            .spawn()
            .unwrap()
            .wait()
            .unwrap();
        assert!(!status.success());
    }

    #[test]
    fn test_ignore() {
        let mut child = Command::new(b"/bin/cat")
            .stdin(Stdio::Ignore)
            .stdout(Stdio::Pipe)
            .spawn()
            .unwrap();
        assert_eq!(read_all(child.stdout.take()), b"");
        assert_eq!(child.wait(), Ok(Termination::Exited(0)));

        let status = sh(b"printf out; printf err >&2")
            .stdout(Stdio::Ignore)
            .stderr(Stdio::Ignore)
            .spawn()
            .unwrap()
            .wait();
        assert_eq!(status, Ok(Termination::Exited(0)));
    }

    #[test]
    fn test_wait_closes_unread_streams() {
        let child = sh(b"exit 0")
            .stdin(Stdio::Pipe)
            .stdout(Stdio::Pipe)
            .stderr(Stdio::Pipe)
            .spawn()
            .unwrap();
        assert_eq!(child.wait(), Ok(Termination::Exited(0)));
    }

    #[test]
    fn test_argv0_is_path() {
        let output = sh(b"printf %s \"$0\"").output(64).unwrap();
        assert_eq!(output.stdout, b"/bin/sh");
    }

    #[test]
    fn test_explicit_env() {
        let mut env = EnvStore::new();
        env.set(b"FOO", b"bar").unwrap();
        let output = sh(b"printf %s \"$FOO\"").env(&env).output(64).unwrap();
        assert_eq!(output.stdout, b"bar");
    }

    #[test]
    fn test_inherited_env() {
        envp_tests::init_from_libc();
        let output = sh(b"printf %s \"$PATH\"").output(1 << 16).unwrap();
        // Some shells supply a default PATH when none is inherited.
        if let Some(expected) = lookup_inherited(b"PATH") {
            assert_eq!(output.stdout, expected);
        }
    }

    #[test]
    fn test_unrepresentable_env_fails_before_fork() {
        let mut env = EnvStore::new();
        env.set(b"A=B", b"1").unwrap();
        assert_eq!(sh(b"exit 0").env(&env).spawn().err(), Some(ErrorKind::InvalidArgument));
    }

    #[test]
    fn test_current_dir() {
        let output = sh(b"pwd").current_dir(b"/").output(64).unwrap();
        assert_eq!(output.stdout, b"/\n");

        let child = sh(b"pwd")
            .current_dir(b"/nonexistent/progeny")
            .spawn()
            .unwrap();
        assert_eq!(child.wait(), Err(ErrorKind::FileNotFound));

        let result = sh(b"pwd").current_dir(b"/\0").spawn();
        assert_eq!(result.err(), Some(ErrorKind::InvalidArgument));
    }

    #[test]
    fn test_uid() {
        let euid = std::fs::metadata("/proc/self").unwrap().uid();
        let result = Command::new(b"/bin/true").uid(0).spawn().unwrap().wait();
        if euid == 0 {
            assert_eq!(result, Ok(Termination::Exited(0)));
        } else {
            assert_eq!(result, Err(ErrorKind::AccessDenied));
        }
    }

    #[test]
    fn test_kill() {
        let args: [&[u8]; 1] = [b"10"];
        let child = Command::new(b"/bin/sleep").args(args).spawn().unwrap();
        assert_eq!(child.kill(), Ok(Termination::Signal(15)));
    }

    #[test]
    fn test_output() {
        let output = sh(b"printf out; printf err >&2; exit 4").output(64).unwrap();
        assert_eq!(
            output,
            Output {
                status: Termination::Exited(4),
                stdout: b"out".to_vec(),
                stderr: b"err".to_vec(),
            }
        );
    }

    #[test]
    fn test_output_limit() {
        let result = sh(b"printf 0123456789").output(4);
        assert_eq!(result, Err(ErrorKind::FileTooBig));

        // The child only stops once its stdout is closed.
        let result = sh(b"while printf 01234567; do :; done").output(64);
        assert_eq!(result, Err(ErrorKind::FileTooBig));
    }

    #[test]
    fn test_drain_both_streams() {
        let mut child = sh(b"printf a; printf b >&2; printf c")
            .stdout(Stdio::Pipe)
            .stderr(Stdio::Pipe)
            .spawn()
            .unwrap();
        let mut out = Vec::new();
        let mut err = Vec::new();
        child
            .drain(|stream, bytes| {
                match stream {
                    Stream::Stdout => out.extend_from_slice(bytes),
                    Stream::Stderr => err.extend_from_slice(bytes),
                }
                Ok(())
            })
            .unwrap();
        assert!(child.stdout.is_none());
        assert!(child.stderr.is_none());
        assert_eq!(out, b"ac");
        assert_eq!(err, b"b");
        assert_eq!(child.wait(), Ok(Termination::Exited(0)));
    }

    #[test]
    fn test_spawn_fn() {
        let args: [&[u8]; 2] = [b"-c", b"printf %s \"$X\"; exit 5"];
        let mut env = EnvStore::new();
        env.set(b"X", b"y").unwrap();
        let mut child = spawn(
            b"/bin/sh",
            &args,
            &env,
            Stdio::Inherit,
            Stdio::Pipe,
            Stdio::Inherit,
        )
        .unwrap();
        assert_eq!(read_all(child.stdout.take()), b"y");
        assert_eq!(child.wait(), Ok(Termination::Exited(5)));
    }

    /// Which acquisition `Faulty` fails
    #[derive(Clone, Copy, Debug)]
    enum Fault {
        Pipe(usize),
        DevNull,
        Fork,
    }

    /// Real descriptors, a failure at `fault`, and a record of everything created
    ///
    /// The discard device is a private file so that its descriptor can be told apart from any
    /// /dev/null opened by a concurrent test.
    struct Faulty {
        fault: Fault,
        discard: PathBuf,
        pipes: usize,
        created: Vec<(c_int, Option<PathBuf>)>,
    }

    impl Faulty {
        fn record(&mut self, fd: &Fd) {
            self.created.push((fd.as_raw(), fd_target(fd.as_raw())));
        }
    }

    impl Resources for Faulty {
        fn pipe(&mut self) -> Result<(Fd, Fd), ErrorKind> {
            if let Fault::Pipe(n) = self.fault {
                if n == self.pipes {
                    return Err(ErrorKind::ProcessFdQuotaExceeded);
                }
            }
            self.pipes += 1;
            let (read, write) = Fd::new_pipe(OpenFlags::O_CLOEXEC)?;
            self.record(&read);
            self.record(&write);
            Ok((read, write))
        }

        fn dev_null(&mut self) -> Result<Fd, ErrorKind> {
            if let Fault::DevNull = self.fault {
                return Err(ErrorKind::SystemFdQuotaExceeded);
            }
            let path = std::ffi::CString::new(self.discard.as_os_str().as_bytes()).unwrap();
            let fd = Fd::open(&path, OpenFlags::O_RDWR | OpenFlags::O_CLOEXEC, 0)?;
            self.record(&fd);
            Ok(fd)
        }

        unsafe fn fork(&mut self) -> Result<ForkResult, ErrorKind> {
            assert!(matches!(self.fault, Fault::Fork), "fork reached with {:?}", self.fault);
            Err(ErrorKind::SystemResources)
        }
    }

    #[test]
    fn test_failed_spawn_leaks_nothing() {
        let discard = temp_file("discard", b"", 0o600);
        let cmd = Command::new(b"/bin/true")
            .stdin(Stdio::Pipe)
            .stdout(Stdio::Ignore)
            .stderr(Stdio::Pipe);

        // stdin, stderr and the error pipe, then the discard device, then fork
        let cases = [
            (Fault::Pipe(0), ErrorKind::ProcessFdQuotaExceeded, 0),
            (Fault::Pipe(1), ErrorKind::ProcessFdQuotaExceeded, 2),
            (Fault::Pipe(2), ErrorKind::ProcessFdQuotaExceeded, 4),
            (Fault::DevNull, ErrorKind::SystemFdQuotaExceeded, 6),
            (Fault::Fork, ErrorKind::SystemResources, 7),
        ];
        for (fault, expected, created) in cases {
            let mut resources = Faulty {
                fault,
                discard: discard.clone(),
                pipes: 0,
                created: Vec::new(),
            };
            let result = spawn_with(&cmd, &mut resources);
            assert_eq!(result.err(), Some(expected), "{fault:?}");

            assert_eq!(resources.created.len(), created, "{fault:?}");
            for (fd, target) in resources.created {
                assert!(target.is_some());
                // The number may have been reused by a concurrent test, but not for this file.
                assert_ne!(fd_target(fd), target, "fd {fd} leaked after {fault:?}");
            }
        }
        std::fs::remove_file(&discard).unwrap();
    }

    #[test]
    fn test_standard_slots_are_lifted() {
        // fd 2 stands in for a pipe end handed out in a closed standard slot
        let lifted = above_stdio(Some(&STDERR)).unwrap().unwrap();
        assert!(lifted.as_raw() > STDERR_FILENO);
        assert_eq!(fd_target(lifted.as_raw()), fd_target(STDERR_FILENO));
        lifted.close();

        let (read, write) = Fd::new_pipe(OpenFlags::O_CLOEXEC).unwrap();
        assert_eq!(above_stdio(Some(&read)).unwrap(), Some(read.clone()));
        assert_eq!(above_stdio(None).unwrap(), None);
        read.close();
        write.close();
    }
}
