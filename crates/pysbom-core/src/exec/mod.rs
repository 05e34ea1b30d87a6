//! External process execution.
//!
//! Every package-manager invocation goes through [`CommandRunner`] so that
//! stages can be exercised against scripted runners. [`SystemRunner`] is the
//! real implementation: it blocks until the child exits or the optional
//! deadline passes, in which case the child is killed.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::debug;

use crate::error::{Error, Result};

const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// A fully specified external command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub current_dir: Option<PathBuf>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            current_dir: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: &Path) -> Self {
        self.current_dir = Some(dir.to_path_buf());
        self
    }

    /// Shell-like rendering for logs and stage payloads.
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Captured result of a finished process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// stdout followed by stderr, for diagnostics.
    pub fn combined(&self) -> String {
        match (self.stdout.trim().is_empty(), self.stderr.trim().is_empty()) {
            (true, _) => self.stderr.clone(),
            (false, true) => self.stdout.clone(),
            (false, false) => format!("{}\n{}", self.stdout, self.stderr),
        }
    }
}

pub trait CommandRunner {
    /// Run `cmd` to completion.
    ///
    /// A non-zero exit is *not* an error; callers inspect
    /// [`CommandOutput::exit_code`]. Errors are reserved for spawn failures
    /// ([`Error::Io`]) and deadline expiry ([`Error::Timeout`]).
    fn run(&self, cmd: &CommandSpec, timeout: Option<Duration>) -> Result<CommandOutput>;
}

impl<T: CommandRunner + ?Sized> CommandRunner for &T {
    fn run(&self, cmd: &CommandSpec, timeout: Option<Duration>) -> Result<CommandOutput> {
        (**self).run(cmd, timeout)
    }
}

/// Wall-clock budget shared by every command one stage runs.
///
/// Each command gets only the time that is left. Once the budget is spent,
/// further commands fail with [`Error::Timeout`] without being spawned.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    limit: Option<Duration>,
    expires: Option<Instant>,
}

impl Deadline {
    /// Start the clock now. `None` means no limit.
    pub fn start(limit: Option<Duration>) -> Self {
        Self {
            limit,
            expires: limit.map(|l| Instant::now() + l),
        }
    }

    /// Time left before expiry; `None` when unlimited.
    pub fn remaining(&self) -> Option<Duration> {
        self.expires
            .map(|at| at.saturating_duration_since(Instant::now()))
    }

    /// Run `cmd` with the remaining budget. Timeouts report the full stage limit.
    pub fn run(&self, runner: &dyn CommandRunner, cmd: &CommandSpec) -> Result<CommandOutput> {
        let remaining = self.remaining();
        if let Some(limit) = self.limit
            && remaining.is_some_and(|r| r.is_zero())
        {
            return Err(Error::Timeout {
                command: cmd.display(),
                secs: limit.as_secs(),
            });
        }
        match (runner.run(cmd, remaining), self.limit) {
            (Err(Error::Timeout { command, .. }), Some(limit)) => Err(Error::Timeout {
                command,
                secs: limit.as_secs(),
            }),
            (other, _) => other,
        }
    }
}

/// Runs commands as real child processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, cmd: &CommandSpec, timeout: Option<Duration>) -> Result<CommandOutput> {
        debug!(command = %cmd.display(), ?timeout, "spawning command");

        let mut command = Command::new(&cmd.program);
        command
            .args(&cmd.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &cmd.current_dir {
            command.current_dir(dir);
        }

        let mut child = command
            .spawn()
            .map_err(|e| Error::io(cmd.program.clone(), e))?;

        // Drain pipes concurrently so a chatty child cannot block on a full pipe.
        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);

        let start = Instant::now();
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {
                    if let Some(limit) = timeout
                        && start.elapsed() >= limit
                    {
                        let _ = child.kill();
                        let _ = child.wait();
                        debug!(command = %cmd.display(), "command timed out");
                        return Err(Error::Timeout {
                            command: cmd.display(),
                            secs: limit.as_secs(),
                        });
                    }
                    thread::sleep(POLL_INTERVAL);
                }
                Err(e) => return Err(Error::io(cmd.program.clone(), e)),
            }
        };

        Ok(CommandOutput {
            exit_code: status.code(),
            stdout: stdout.map(join_drain).unwrap_or_default(),
            stderr: stderr.map(join_drain).unwrap_or_default(),
        })
    }
}

fn drain<R: Read + Send + 'static>(mut pipe: R) -> thread::JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    })
}

fn join_drain(handle: thread::JoinHandle<String>) -> String {
    handle.join().unwrap_or_default()
}
