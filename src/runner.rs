//! Process runner: invoke the compiler under test on one fixture.
//!
//! ## I/O Boundaries
//!
//! Execution is abstracted behind the [`FixtureExecutor`] trait so the driver can be exercised without
//! spawning processes. [`ProcessRunner`] is the real implementation.
//!
//! ## Pipes
//!
//! The fixture is written on its own thread while two more threads drain stdout and stderr. A fixture larger
//! than the pipe buffer therefore never deadlocks against a compiler that is still writing diagnostics.
//!
//! ## Timeouts
//!
//! On unix the child is spawned as the leader of a new process group, and the deadline kills the whole
//! group. A wrapper script that forks the real compiler cannot keep the run alive through its grandchild.
//! The capture threads hand their results back over channels and are waited on against the same deadline,
//! so a pipe held open by a process outside the group still cannot stall the sweep.

use std::ffi::OsString;
use std::fmt;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;
use tpcheck_core::category::{CategoryInfo, INSTRUMENTATION_FLAGS};

/// How often a child is polled while a timeout is armed.
const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Infrastructure failures: the fixture could not be executed at all.
///
/// These are never verification verdicts; a non-zero exit code is reported through [`ExecutionResult`].
#[derive(Debug, Error)]
pub enum RunError {
    #[error("failed to spawn `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("`{program}` closed its input before the fixture was fully written")]
    BrokenPipe { program: String },

    #[error("`{program}` did not finish within {}s", timeout.as_secs_f64())]
    Timeout { program: String, timeout: Duration },

    #[error("I/O error while running `{program}`: {source}")]
    Io {
        program: String,
        #[source]
        source: io::Error,
    },
}

/// Command line for one category: optional wrapper tokens, the executable, and its flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub prefix: Vec<OsString>,
    pub executable: PathBuf,
    pub flags: Vec<OsString>,
}

impl Invocation {
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            prefix: Vec::new(),
            executable: executable.into(),
            flags: Vec::new(),
        }
    }

    pub fn with_prefix<I, S>(mut self, prefix: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.prefix = prefix.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_flags<I, S>(mut self, flags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.flags = flags.into_iter().map(Into::into).collect();
        self
    }

    /// Build the invocation a category prescribes.
    ///
    /// Instrumented categories are prefixed with `instrumentation_tool` and its fixed flags.
    pub fn for_category(info: &CategoryInfo, executable: &Path, instrumentation_tool: &Path) -> Self {
        let invocation = Self::new(executable).with_flags(info.flags.iter().copied());
        if info.instrumented {
            let mut prefix: Vec<OsString> = vec![instrumentation_tool.into()];
            prefix.extend(INSTRUMENTATION_FLAGS.iter().map(OsString::from));
            invocation.with_prefix(prefix)
        } else {
            invocation
        }
    }

    /// The program actually spawned: the first prefix token, or the executable.
    pub fn program(&self) -> OsString {
        self.prefix
            .first()
            .cloned()
            .unwrap_or_else(|| self.executable.clone().into_os_string())
    }

    /// Arguments following [`Invocation::program`].
    pub fn args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = self.prefix.iter().skip(1).cloned().collect();
        if !self.prefix.is_empty() {
            args.push(self.executable.clone().into_os_string());
        }
        args.extend(self.flags.iter().cloned());
        args
    }

    fn command(&self) -> Command {
        let mut command = Command::new(self.program());
        command.args(self.args());
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }
        command
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program().to_string_lossy())?;
        for arg in self.args() {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

/// What one run of the compiler produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    /// Process exit code; `128 + signal` when the process was killed by a signal.
    pub exit_code: i32,
    pub stdout: String,
    /// The diagnostic stream.
    pub stderr: String,
    pub duration: Duration,
}

/// Execute an invocation with the given input.
///
/// Implementations must be shareable across worker threads.
pub trait FixtureExecutor: Sync {
    fn execute(&self, invocation: &Invocation, input: &str) -> Result<ExecutionResult, RunError>;
}

/// Spawns real processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner {
    timeout: Option<Duration>,
}

impl ProcessRunner {
    /// A runner without a timeout.
    pub fn new() -> Self {
        Self::default()
    }

    /// A runner that kills the child after `timeout`. A zero duration disables the limit.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout: (!timeout.is_zero()).then_some(timeout),
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    fn wait(&self, child: &mut Child, program: &str, deadline: Option<Instant>) -> Result<ExitStatus, RunError> {
        let io_err = |source: io::Error| RunError::Io {
            program: program.to_string(),
            source,
        };

        let Some(deadline) = deadline else {
            return child.wait().map_err(io_err);
        };

        loop {
            if let Some(status) = child.try_wait().map_err(io_err)? {
                return Ok(status);
            }
            let now = Instant::now();
            if now >= deadline {
                return Err(self.timed_out(program));
            }
            thread::sleep(POLL_INTERVAL.min(deadline - now));
        }
    }

    /// Wait for one capture thread. Past the deadline the child's process group is killed and the thread
    /// is abandoned.
    fn collect<T>(
        &self,
        capture: &Receiver<io::Result<T>>,
        deadline: Option<Instant>,
        child: &mut Child,
        program: &str,
    ) -> Result<io::Result<T>, RunError> {
        let received = match deadline {
            Some(deadline) => capture.recv_timeout(deadline.saturating_duration_since(Instant::now())),
            None => capture.recv().map_err(|_| RecvTimeoutError::Disconnected),
        };
        match received {
            Ok(result) => Ok(result),
            Err(RecvTimeoutError::Disconnected) => Ok(Err(io::Error::other("capture thread panicked"))),
            Err(RecvTimeoutError::Timeout) => {
                let err = self.timed_out(program);
                reap(child);
                Err(err)
            }
        }
    }

    fn timed_out(&self, program: &str) -> RunError {
        let timeout = self.timeout.unwrap_or_default();
        tracing::warn!(program, timeout_ms = timeout.as_millis(), "killing process group after timeout");
        RunError::Timeout {
            program: program.to_string(),
            timeout,
        }
    }
}

impl FixtureExecutor for ProcessRunner {
    fn execute(&self, invocation: &Invocation, input: &str) -> Result<ExecutionResult, RunError> {
        let start = Instant::now();
        let deadline = self.timeout.map(|timeout| start + timeout);
        let program = invocation.program().to_string_lossy().into_owned();

        let mut child = invocation
            .command()
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| RunError::Spawn {
                program: program.clone(),
                source,
            })?;
        tracing::debug!(pid = child.id(), %invocation, input_bytes = input.len(), "spawned");

        let stdin = child.stdin.take();
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let input = input.as_bytes().to_vec();

        let writer = spawn_capture(move || write_input(stdin, &input));
        let out_reader = spawn_capture(move || read_stream(stdout));
        let err_reader = spawn_capture(move || read_stream(stderr));

        let status = match self.wait(&mut child, &program, deadline) {
            Ok(status) => status,
            Err(err) => {
                // Killing the group closes the pipes the capture threads are blocked on.
                reap(&mut child);
                return Err(err);
            }
        };
        let written = self.collect(&writer, deadline, &mut child, &program)?;
        let stdout = self.collect(&out_reader, deadline, &mut child, &program)?;
        let stderr = self.collect(&err_reader, deadline, &mut child, &program)?;

        let io_err = |source: io::Error| RunError::Io {
            program: program.clone(),
            source,
        };
        match written {
            Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
                return Err(RunError::BrokenPipe {
                    program: program.clone(),
                });
            }
            Err(e) => return Err(io_err(e)),
            Ok(()) => {}
        }
        let stdout = stdout.map_err(io_err)?;
        let stderr = stderr.map_err(io_err)?;

        let result = ExecutionResult {
            exit_code: exit_code(status),
            stdout: String::from_utf8_lossy(&stdout).into_owned(),
            stderr: String::from_utf8_lossy(&stderr).into_owned(),
            duration: start.elapsed(),
        };
        tracing::debug!(exit_code = result.exit_code, duration_ms = result.duration.as_millis(), "finished");
        Ok(result)
    }
}

/// Run `work` on a detached thread and hand its result back over a channel.
fn spawn_capture<T, F>(work: F) -> Receiver<io::Result<T>>
where
    T: Send + 'static,
    F: FnOnce() -> io::Result<T> + Send + 'static,
{
    let (tx, rx) = mpsc::sync_channel(1);
    thread::spawn(move || {
        let _ = tx.send(work());
    });
    rx
}

fn write_input(stdin: Option<ChildStdin>, input: &[u8]) -> io::Result<()> {
    let Some(mut stdin) = stdin else {
        return Ok(());
    };
    stdin.write_all(input)?;
    stdin.flush()
    // dropping `stdin` closes the pipe and signals end of input
}

fn read_stream<R: Read>(stream: Option<R>) -> io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    if let Some(mut stream) = stream {
        stream.read_to_end(&mut buf)?;
    }
    Ok(buf)
}

fn reap(child: &mut Child) {
    kill_group(child);
    let _ = child.kill();
    let _ = child.wait();
}

/// SIGKILL the process group the child leads, reaching anything it forked.
#[cfg(unix)]
fn kill_group(child: &Child) {
    use nix::sys::signal::{Signal, killpg};
    use nix::unistd::Pid;

    if let Ok(pgid) = i32::try_from(child.id()) {
        let _ = killpg(Pid::from_raw(pgid), Signal::SIGKILL);
    }
}

#[cfg(not(unix))]
fn kill_group(_child: &Child) {}

fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    -1
}

#[cfg(test)]
mod tests {
    use super::*;
    use tpcheck_core::CategoryId;

    #[test]
    fn plain_category_invocation() {
        let info = CategoryId::SyntaxReject.info();
        let inv = Invocation::for_category(info, Path::new("./bin/tpcas"), Path::new("valgrind"));
        assert!(inv.prefix.is_empty());
        assert_eq!(inv.program(), OsString::from("./bin/tpcas"));
        assert_eq!(inv.args(), vec![OsString::from("--only-tree")]);
        assert_eq!(inv.to_string(), "./bin/tpcas --only-tree");
    }

    #[test]
    fn instrumented_invocation_puts_tool_first() {
        let info = CategoryId::InstrumentedAccept.info();
        let inv = Invocation::for_category(info, Path::new("./bin/tpcas"), Path::new("valgrind"));
        assert_eq!(inv.program(), OsString::from("valgrind"));
        assert_eq!(
            inv.to_string(),
            "valgrind --error-exitcode=42 --leak-check=no --track-origins=yes --quiet ./bin/tpcas --only-tree"
        );
    }

    #[test]
    fn zero_timeout_disables_limit() {
        assert_eq!(ProcessRunner::with_timeout(Duration::ZERO).timeout(), None);
        assert_eq!(
            ProcessRunner::with_timeout(Duration::from_secs(3)).timeout(),
            Some(Duration::from_secs(3))
        );
    }

    #[test]
    fn missing_executable_is_a_spawn_error() {
        let inv = Invocation::new("/definitely/not/a/compiler");
        let err = ProcessRunner::new().execute(&inv, "int x;").unwrap_err();
        assert!(matches!(err, RunError::Spawn { .. }), "{err:?}");
    }

    #[cfg(unix)]
    #[test]
    fn captures_exit_code_and_streams() {
        let inv = Invocation::new("/bin/sh").with_flags([
            "-c",
            "cat > /dev/null; echo out; echo 'error: bad' >&2; exit 3",
        ]);
        let result = ProcessRunner::new().execute(&inv, "int x;\n").unwrap();
        assert_eq!(result.exit_code, 3);
        assert_eq!(result.stdout, "out\n");
        assert_eq!(result.stderr, "error: bad\n");
    }

    #[cfg(unix)]
    #[test]
    fn signal_exit_code() {
        let inv = Invocation::new("/bin/sh").with_flags(["-c", "cat > /dev/null; kill -9 $$"]);
        let result = ProcessRunner::new().execute(&inv, "").unwrap();
        assert_eq!(result.exit_code, 128 + 9);
    }
}
