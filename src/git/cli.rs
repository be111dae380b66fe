//! Command-line tool invocations.
//!
//! Used for everything the native backend does not expose well: stash
//! list/push/pop, raw diff/blame/show text, discarding working-tree changes,
//! branch rename, squash merge, and all network operations.
//!
//! Every invocation is bounded. On timeout the child is killed and the call
//! fails; it is never retried. Terminal prompts are disabled so a missing
//! credential fails fast instead of waiting for input nobody can give.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};

use crate::config::SessionConfig;
use crate::error::{AppError, Result};

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Captured output of one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// How long an invocation may run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    Local,
    Network,
}

#[derive(Debug, Clone)]
pub struct GitCli {
    program: String,
    workdir: PathBuf,
    local_timeout: Duration,
    network_timeout: Duration,
}

impl GitCli {
    pub fn new(workdir: impl Into<PathBuf>, config: &SessionConfig) -> Self {
        Self {
            program: config.git_program.clone(),
            workdir: workdir.into(),
            local_timeout: config.local_timeout,
            network_timeout: config.network_timeout,
        }
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    /// Run the tool and return whatever it produced, whatever the exit code.
    ///
    /// Only spawn failures and timeouts are errors here.
    pub fn invoke(&self, operation: &str, args: &[&str], bound: Bound) -> Result<ToolOutput> {
        let timeout = match bound {
            Bound::Local => self.local_timeout,
            Bound::Network => self.network_timeout,
        };

        let started = Instant::now();
        let mut command = Command::new(&self.program);
        command
            .args(args)
            .current_dir(&self.workdir)
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null());

        let output = run_with_timeout(command, timeout).map_err(|e| AppError::ExternalTool {
            operation: operation.to_string(),
            message: e.to_string(),
            stdout: String::new(),
            stderr: String::new(),
            exit_code: None,
        })?;

        tracing::debug!(
            "{} {:?} exited with {:?} in {:?}",
            self.program,
            args,
            output.exit_code,
            started.elapsed()
        );

        Ok(output)
    }

    /// Run the tool and fail with `ExternalTool` on a non-zero exit.
    pub fn run(&self, operation: &str, args: &[&str], bound: Bound) -> Result<ToolOutput> {
        let output = self.invoke(operation, args, bound)?;
        if output.success() {
            return Ok(output);
        }

        let message = first_line(&output.stderr)
            .or_else(|| first_line(&output.stdout))
            .unwrap_or_else(|| format!("exited with {:?}", output.exit_code));

        Err(AppError::ExternalTool {
            operation: operation.to_string(),
            message,
            stdout: output.stdout,
            stderr: output.stderr,
            exit_code: output.exit_code,
        })
    }
}

fn first_line(text: &str) -> Option<String> {
    text.lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(str::to_string)
}

/// Spawn `command`, drain both pipes on reader threads, and kill the child if
/// it outlives `timeout`.
fn run_with_timeout(mut command: Command, timeout: Duration) -> std::io::Result<ToolOutput> {
    let mut child = command
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    // Reading on separate threads keeps a full pipe from stalling the child.
    let stdout_handle = child.stdout.take();
    let stderr_handle = child.stderr.take();
    let stdout_thread = std::thread::spawn(move || drain(stdout_handle));
    let stderr_thread = std::thread::spawn(move || drain(stderr_handle));

    let deadline = Instant::now() + timeout;
    let status: ExitStatus = loop {
        match child.try_wait()? {
            Some(status) => break status,
            None if Instant::now() >= deadline => {
                let _ = child.kill();
                let _ = child.wait();
                let _ = stdout_thread.join();
                let _ = stderr_thread.join();
                return Err(std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    format!("timed out after {} seconds", timeout.as_secs()),
                ));
            }
            None => std::thread::sleep(POLL_INTERVAL),
        }
    };

    let stdout = stdout_thread.join().unwrap_or_default();
    let stderr = stderr_thread.join().unwrap_or_default();

    Ok(ToolOutput {
        stdout: String::from_utf8_lossy(&stdout).to_string(),
        stderr: String::from_utf8_lossy(&stderr).to_string(),
        exit_code: status.code(),
    })
}

fn drain<R: Read>(handle: Option<R>) -> Vec<u8> {
    let mut buf = Vec::new();
    if let Some(mut handle) = handle {
        let _ = handle.read_to_end(&mut buf);
    }
    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli_in(dir: &Path, program: &str, timeout: Duration) -> GitCli {
        let config = SessionConfig {
            git_program: program.to_string(),
            local_timeout: timeout,
            ..SessionConfig::default()
        };
        GitCli::new(dir, &config)
    }

    #[test]
    fn captures_output_and_exit_code() {
        let dir = tempfile::TempDir::new().unwrap();
        let cli = cli_in(dir.path(), "git", Duration::from_secs(10));

        let output = cli.invoke("version", &["--version"], Bound::Local).unwrap();
        assert!(output.success());
        assert!(output.stdout.starts_with("git version"));
    }

    #[test]
    fn non_zero_exit_is_external_tool_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let cli = cli_in(dir.path(), "git", Duration::from_secs(10));

        // Not a repository, so `git status` fails.
        let err = cli.run("status", &["status"], Bound::Local).unwrap_err();
        match err {
            AppError::ExternalTool {
                operation,
                exit_code,
                stderr,
                ..
            } => {
                assert_eq!(operation, "status");
                assert_ne!(exit_code, Some(0));
                assert!(!stderr.is_empty());
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn missing_program_is_external_tool_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let cli = cli_in(dir.path(), "git-desk-no-such-tool", Duration::from_secs(1));

        let err = cli.invoke("status", &["status"], Bound::Local).unwrap_err();
        assert_eq!(err.kind(), "external_tool");
    }

    #[cfg(unix)]
    #[test]
    fn timeout_kills_the_child() {
        let dir = tempfile::TempDir::new().unwrap();
        let cli = cli_in(dir.path(), "sleep", Duration::from_millis(200));

        let started = Instant::now();
        let err = cli.invoke("sleep", &["5"], Bound::Local).unwrap_err();
        assert!(started.elapsed() < Duration::from_secs(4));
        assert!(err.to_string().contains("timed out"));
    }
}
