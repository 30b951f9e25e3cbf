//! Runs interpreter commands and captures what they print.
//!
//! stdout and stderr of the child share one pipe, so tracebacks land where
//! they happened. Failures never propagate: a command that cannot be
//! spawned, exits non-zero or times out still produces text for the
//! document.

use std::io::{Read, Write};
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Prefix of messages the filter itself writes into captured output.
pub const MESSAGE_PREFIX: &str = "[pandoc-source-exec]";

/// Error during command execution.
#[derive(Debug, Error)]
pub enum ExecutorError {
    /// Empty command string.
    #[error("empty command")]
    EmptyCommand,
    /// Program not found in PATH.
    #[error("command not found: '{program}'")]
    NotFound { program: String },
    /// Program could not be started.
    #[error("failed to run '{program}': {source}")]
    Spawn { program: String, source: std::io::Error },
    /// Execution timed out.
    #[error("'{program}' timed out after {timeout_ms}ms")]
    Timeout { program: String, timeout_ms: u64 },
    /// I/O error while talking to the child.
    #[error("I/O error while running '{program}': {source}")]
    Io { program: String, source: std::io::Error },
}

/// How the source text reaches the interpreter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceMode {
    /// As the argument following the command's trailing flag (`python3 -c <src>`).
    Argument,
    /// Written to the child's stdin (`cat`, `python3`).
    Stdin,
}

/// A command string split into program, fixed arguments and source mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub source_mode: SourceMode,
}

impl Invocation {
    /// Splits `command` on whitespace. A trailing option flag means the
    /// source is passed as an argument; otherwise it goes to stdin.
    pub fn parse(command: &str) -> Result<Self, ExecutorError> {
        let mut tokens = command.split_whitespace().map(str::to_string);
        let program = tokens.next().ok_or(ExecutorError::EmptyCommand)?;
        let args: Vec<String> = tokens.collect();
        let source_mode = match args.last() {
            Some(flag) if flag.starts_with('-') => SourceMode::Argument,
            _ => SourceMode::Stdin,
        };
        Ok(Self {
            program,
            args,
            source_mode,
        })
    }

    /// Builds the request that runs `source` with this invocation.
    pub fn request(&self, source: &str, extra_args: &[String], working_dir: Option<PathBuf>) -> ExecRequest {
        let mut args = self.args.clone();
        let stdin = match self.source_mode {
            SourceMode::Argument => {
                args.push(source.to_string());
                None
            }
            SourceMode::Stdin => Some(source.to_string()),
        };
        args.extend(extra_args.iter().cloned());
        ExecRequest {
            program: self.program.clone(),
            args,
            stdin,
            working_dir,
        }
    }
}

/// A fully specified child process run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecRequest {
    pub program: String,
    pub args: Vec<String>,
    pub stdin: Option<String>,
    pub working_dir: Option<PathBuf>,
}

/// Captured output of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    /// stdout and stderr, interleaved.
    pub output: String,
    /// Exit code, `None` when the process never ran to completion or was
    /// killed by a signal.
    pub exit_code: Option<i32>,
}

impl ExecutionResult {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    fn from_error(error: &ExecutorError) -> Self {
        Self {
            output: format!("{MESSAGE_PREFIX} {error}\n"),
            exit_code: None,
        }
    }
}

/// Runs child processes, optionally with a timeout.
#[derive(Debug, Clone, Copy, Default)]
pub struct Executor {
    /// Zero waits forever.
    timeout_ms: u64,
}

impl Executor {
    pub fn new(timeout_ms: u64) -> Self {
        Self { timeout_ms }
    }

    /// Runs `command` on `source`. Never fails; problems become output text.
    pub fn run_command(
        &self,
        command: &str,
        source: &str,
        extra_args: &[String],
        working_dir: Option<PathBuf>,
    ) -> ExecutionResult {
        match Invocation::parse(command) {
            Ok(invocation) => self.run(&invocation.request(source, extra_args, working_dir)),
            Err(e) => ExecutionResult::from_error(&e),
        }
    }

    /// Runs a request. Never fails; problems become output text.
    pub fn run(&self, request: &ExecRequest) -> ExecutionResult {
        match self.execute(request) {
            Ok(result) => {
                log::debug!("'{}' exited with {:?}", request.program, result.exit_code);
                result
            }
            Err(e) => {
                log::warn!("{e}");
                ExecutionResult::from_error(&e)
            }
        }
    }

    /// Runs a request, reporting spawn and I/O failures as errors.
    pub fn execute(&self, request: &ExecRequest) -> Result<ExecutionResult, ExecutorError> {
        let program = &request.program;
        log::debug!("Running '{}' with {} argument(s)", program, request.args.len());

        let io_error = |source: std::io::Error| ExecutorError::Io {
            program: program.clone(),
            source,
        };

        let (mut reader, writer) = std::io::pipe().map_err(io_error)?;
        let mut cmd = Command::new(program);
        cmd.args(&request.args)
            .env("PYTHONUNBUFFERED", "1")
            .stdout(writer.try_clone().map_err(io_error)?)
            .stderr(writer)
            .stdin(if request.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            });
        if let Some(dir) = &request.working_dir {
            cmd.current_dir(dir);
        }

        let spawned = cmd.spawn();
        // The command still owns the write ends; drop them so the reader sees EOF.
        drop(cmd);
        let mut child = spawned.map_err(|source| match source.kind() {
            std::io::ErrorKind::NotFound if request.working_dir.as_ref().is_none_or(|d| d.is_dir()) => {
                ExecutorError::NotFound {
                    program: program.clone(),
                }
            }
            _ => ExecutorError::Spawn {
                program: program.clone(),
                source,
            },
        })?;

        let stdin_handle = match (child.stdin.take(), request.stdin.clone()) {
            (Some(mut stdin), Some(input)) => Some(thread::spawn(move || {
                // A child that exits without reading its input closes the pipe early.
                if let Err(e) = stdin.write_all(input.as_bytes())
                    && e.kind() != std::io::ErrorKind::BrokenPipe
                {
                    log::debug!("Failed to write to stdin: {e}");
                }
            })),
            _ => None,
        };

        let output_handle = thread::spawn(move || {
            let mut buf = Vec::new();
            reader.read_to_end(&mut buf).map(|_| String::from_utf8_lossy(&buf).into_owned())
        });

        let status = self.wait(&mut child, program);

        if let Some(handle) = stdin_handle {
            let _ = handle.join();
        }
        let output = match output_handle.join() {
            Ok(output) => output.map_err(io_error)?,
            Err(_) => String::from("Output reader thread panicked"),
        };

        match status? {
            WaitOutcome::Exited(status) => Ok(ExecutionResult {
                output,
                exit_code: status.code(),
            }),
            WaitOutcome::TimedOut => {
                let error = ExecutorError::Timeout {
                    program: program.clone(),
                    timeout_ms: self.timeout_ms,
                };
                log::warn!("{error}");
                Ok(ExecutionResult {
                    output: format!("{output}{MESSAGE_PREFIX} {error}\n"),
                    exit_code: None,
                })
            }
        }
    }

    fn wait(&self, child: &mut Child, program: &str) -> Result<WaitOutcome, ExecutorError> {
        let io_error = |source: std::io::Error| ExecutorError::Io {
            program: program.to_string(),
            source,
        };
        if self.timeout_ms == 0 {
            return child.wait().map(WaitOutcome::Exited).map_err(io_error);
        }

        let timeout = Duration::from_millis(self.timeout_ms);
        let start = Instant::now();
        loop {
            if let Some(status) = child.try_wait().map_err(io_error)? {
                return Ok(WaitOutcome::Exited(status));
            }
            if start.elapsed() >= timeout {
                let _ = child.kill();
                let _ = child.wait();
                return Ok(WaitOutcome::TimedOut);
            }
            thread::sleep(Duration::from_millis(10));
        }
    }
}

enum WaitOutcome {
    Exited(ExitStatus),
    TimedOut,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_argument_style() {
        let invocation = Invocation::parse("ruby -e").unwrap();
        assert_eq!(invocation.program, "ruby");
        assert_eq!(invocation.args, vec!["-e"]);
        assert_eq!(invocation.source_mode, SourceMode::Argument);
    }

    #[test]
    fn test_parse_stdin_style() {
        assert_eq!(Invocation::parse("cat").unwrap().source_mode, SourceMode::Stdin);
        assert_eq!(Invocation::parse("python3 -u script").unwrap().source_mode, SourceMode::Stdin);
        assert!(matches!(Invocation::parse("   "), Err(ExecutorError::EmptyCommand)));
    }

    #[test]
    fn test_request_puts_source_before_extra_args() {
        let invocation = Invocation::parse("python3 -c").unwrap();
        let request = invocation.request("print(1)", &["a".to_string(), "b".to_string()], None);
        assert_eq!(request.args, vec!["-c", "print(1)", "a", "b"]);
        assert_eq!(request.stdin, None);

        let invocation = Invocation::parse("cat").unwrap();
        let request = invocation.request("text", &[], None);
        assert!(request.args.is_empty());
        assert_eq!(request.stdin.as_deref(), Some("text"));
    }

    #[test]
    fn test_missing_program_is_reported_inline() {
        let result = Executor::default().run_command("nonexistent-interpreter-xyz123 -c", "1", &[], None);
        assert!(!result.success());
        assert_eq!(result.exit_code, None);
        assert!(result.output.contains("command not found: 'nonexistent-interpreter-xyz123'"));
    }

    #[test]
    fn test_empty_command_is_reported_inline() {
        let result = Executor::default().run_command("", "1", &[], None);
        assert!(result.output.contains("empty command"));
    }

    #[test]
    #[cfg(unix)]
    fn test_cat_echoes_stdin() {
        let result = Executor::default().run_command("cat", "hello world\n", &[], None);
        assert!(result.success());
        assert_eq!(result.output, "hello world\n");
    }

    #[test]
    #[cfg(unix)]
    fn test_stderr_is_merged_in_order() {
        let result = Executor::default().run_command("sh -c", "echo one; echo two >&2; echo three; exit 3", &[], None);
        assert_eq!(result.output, "one\ntwo\nthree\n");
        assert_eq!(result.exit_code, Some(3));
    }

    #[test]
    #[cfg(unix)]
    fn test_extra_args_and_working_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("marker.txt"), "").unwrap();
        let result = Executor::default().run_command(
            "sh -c",
            "ls; echo \"$1\"",
            &["sh".to_string(), "arg-one".to_string()],
            Some(dir.path().to_path_buf()),
        );
        assert_eq!(result.output, "marker.txt\narg-one\n");
    }

    #[test]
    #[cfg(unix)]
    fn test_deterministic_output() {
        let executor = Executor::default();
        let first = executor.run_command("sh -c", "printf 'a\\nb\\n'", &[], None);
        let second = executor.run_command("sh -c", "printf 'a\\nb\\n'", &[], None);
        assert_eq!(first, second);
    }

    #[test]
    #[cfg(unix)]
    fn test_timeout_kills_child() {
        let result = Executor::new(50).run_command("sleep", "", &["5".to_string()], None);
        assert!(!result.success());
        assert!(result.output.contains("timed out after 50ms"));
    }
}
