//! Builder for executing external tool commands with timeout support.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use slidecast_core::{Error, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

/// Default command timeout: 5 minutes.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Diagnostic stderr lines kept by [`ToolCommand::execute_with_stderr_callback`].
const STDERR_TAIL_LINES: usize = 20;

/// Output captured from a tool execution.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    /// Process exit status.
    pub status: ExitStatus,
    /// Captured standard output (lossy UTF-8).
    pub stdout: String,
    /// Captured standard error (lossy UTF-8).
    pub stderr: String,
}

/// A builder for constructing and executing external tool invocations.
///
/// # Example
///
/// ```no_run
/// use slidecast_av::ToolCommand;
/// use std::path::PathBuf;
///
/// # async fn example() -> slidecast_core::Result<()> {
/// let output = ToolCommand::new(PathBuf::from("ffprobe"))
///     .args(["-v", "error", "-show_entries", "format=duration"])
///     .arg("/path/to/voice.mp3")
///     .execute()
///     .await?;
/// println!("{}", output.stdout);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ToolCommand {
    program: PathBuf,
    args: Vec<String>,
    timeout: Duration,
}

impl ToolCommand {
    /// Create a new command for the given program path.
    pub fn new(program: PathBuf) -> Self {
        Self {
            program,
            args: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Append a single argument.
    pub fn arg(&mut self, s: impl Into<String>) -> &mut Self {
        self.args.push(s.into());
        self
    }

    /// Append multiple arguments.
    pub fn args(&mut self, iter: impl IntoIterator<Item = impl Into<String>>) -> &mut Self {
        self.args.extend(iter.into_iter().map(Into::into));
        self
    }

    /// Set the maximum execution time.
    pub fn timeout(&mut self, d: Duration) -> &mut Self {
        self.timeout = d;
        self
    }

    /// Shell-like rendering of the invocation, for logs and audit events.
    pub fn describe(&self) -> String {
        std::iter::once(self.program.to_string_lossy().to_string())
            .chain(self.args.iter().map(|a| {
                if a.is_empty() || a.contains(char::is_whitespace) || a.contains(';') {
                    format!("'{}'", a.replace('\'', r"'\''"))
                } else {
                    a.clone()
                }
            }))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn program_name(&self) -> String {
        self.program
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.program.to_string_lossy().to_string())
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::null())
            .kill_on_drop(true);
        cmd
    }

    /// Execute the command, capturing stdout and stderr.
    ///
    /// # Errors
    ///
    /// - Returns [`Error::Tool`] if the process times out (message includes
    ///   the timeout duration).
    /// - Returns [`Error::Tool`] if the process exits with a non-zero status
    ///   (message includes stderr).
    /// - Returns [`Error::Tool`] if spawning the process fails.
    pub async fn execute(&self) -> Result<ToolOutput> {
        let output = self.execute_unchecked().await?;

        if !output.status.success() {
            return Err(Error::tool(
                self.program_name(),
                format!(
                    "exited with status {}: {}",
                    output.status,
                    output.stderr.trim()
                ),
            ));
        }

        Ok(output)
    }

    /// Execute the command and return its output whatever the exit status.
    ///
    /// Used when the interesting information is on stderr of a run that is
    /// expected to fail. Spawn failures and timeouts are still errors.
    pub async fn execute_unchecked(&self) -> Result<ToolOutput> {
        let program_name = self.program_name();
        tracing::debug!(tool = %program_name, args = ?self.args, "running tool");

        let mut cmd = self.command();
        cmd.stdout(Stdio::piped()).stderr(Stdio::piped());

        let child = cmd
            .spawn()
            .map_err(|e| Error::tool(&program_name, format!("failed to spawn: {e}")))?;

        // On timeout the future is dropped with the child, and kill_on_drop
        // takes the process down with it.
        match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => Ok(ToolOutput {
                status: output.status,
                stdout: String::from_utf8_lossy(&output.stdout).to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            }),
            Ok(Err(e)) => Err(Error::tool(
                program_name,
                format!("I/O error waiting for process: {e}"),
            )),
            Err(_elapsed) => Err(Error::tool(
                program_name,
                format!("timed out after {:?}", self.timeout),
            )),
        }
    }

    /// Execute the command, handing every stderr line to `on_line` as it
    /// arrives.
    ///
    /// The child is killed when the timeout expires or `cancel` fires.
    /// Stdout is discarded. The returned [`ToolOutput::stderr`] holds the
    /// last few diagnostic lines (progress `key=value` lines are skipped).
    ///
    /// # Errors
    ///
    /// - [`Error::Cancelled`] if `cancel` fired.
    /// - [`Error::Tool`] on timeout, spawn failure, or non-zero exit (the
    ///   message carries the stderr tail).
    pub async fn execute_with_stderr_callback<F>(
        &self,
        mut on_line: F,
        cancel: Option<CancellationToken>,
    ) -> Result<ToolOutput>
    where
        F: FnMut(&str),
    {
        let program_name = self.program_name();
        tracing::debug!(tool = %program_name, args = ?self.args, "running tool (streaming)");

        let mut cmd = self.command();
        cmd.stdout(Stdio::null()).stderr(Stdio::piped());

        let mut child = cmd
            .spawn()
            .map_err(|e| Error::tool(&program_name, format!("failed to spawn: {e}")))?;

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| Error::tool(&program_name, "stderr was not captured"))?;
        let mut lines = BufReader::new(stderr).lines();

        let cancel = cancel.unwrap_or_default();
        let deadline = tokio::time::sleep(self.timeout);
        tokio::pin!(deadline);

        let mut tail: VecDeque<String> = VecDeque::with_capacity(STDERR_TAIL_LINES);

        loop {
            tokio::select! {
                line = lines.next_line() => match line {
                    Ok(Some(line)) => {
                        on_line(&line);
                        if !is_progress_line(&line) {
                            if tail.len() == STDERR_TAIL_LINES {
                                tail.pop_front();
                            }
                            tail.push_back(line);
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        let _ = child.kill().await;
                        return Err(Error::tool(
                            program_name,
                            format!("failed to read stderr: {e}"),
                        ));
                    }
                },
                _ = &mut deadline => {
                    let _ = child.kill().await;
                    return Err(Error::tool(
                        program_name,
                        format!("timed out after {:?}", self.timeout),
                    ));
                }
                _ = cancel.cancelled() => {
                    let _ = child.kill().await;
                    tracing::info!(tool = %program_name, "process cancelled");
                    return Err(Error::Cancelled(format!("{program_name} cancelled")));
                }
            }
        }

        let status = child.wait().await.map_err(|e| {
            Error::tool(
                &program_name,
                format!("I/O error waiting for process: {e}"),
            )
        })?;

        let stderr = tail.into_iter().collect::<Vec<_>>().join("\n");

        if !status.success() {
            return Err(Error::tool(
                program_name,
                format!("exited with status {status}: {}", stderr.trim()),
            ));
        }

        Ok(ToolOutput {
            status,
            stdout: String::new(),
            stderr,
        })
    }
}

/// `-progress` output is bare `key=value` lines.
fn is_progress_line(line: &str) -> bool {
    match line.split_once('=') {
        Some((key, _)) => !key.is_empty() && !key.contains(char::is_whitespace),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn execute_echo() {
        // `echo` should be universally available.
        let output = ToolCommand::new(PathBuf::from("echo"))
            .arg("hello")
            .execute()
            .await;

        match output {
            Ok(out) => {
                assert!(out.status.success());
                assert!(out.stdout.trim().contains("hello"));
            }
            Err(_) => {
                // On some minimal environments echo may not exist; skip.
            }
        }
    }

    #[tokio::test]
    async fn execute_nonexistent_tool() {
        let result = ToolCommand::new(PathBuf::from("nonexistent_tool_xyz_12345"))
            .execute()
            .await;
        assert!(matches!(result, Err(Error::Tool { .. })));
    }

    #[tokio::test]
    async fn timeout_fires() {
        // `sleep 10` should be killed well before 10 seconds.
        let result = ToolCommand::new(PathBuf::from("sleep"))
            .arg("10")
            .timeout(Duration::from_millis(100))
            .execute()
            .await;
        let err = result.unwrap_err().to_string();
        assert!(err.contains("timed out"), "unexpected error: {err}");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn unchecked_returns_failed_output() {
        let output = ToolCommand::new(PathBuf::from("sh"))
            .args(["-c", "echo 'Duration: 00:00:42.00' >&2; exit 1"])
            .execute_unchecked()
            .await
            .unwrap();
        assert!(!output.status.success());
        assert!(output.stderr.contains("Duration: 00:00:42.00"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn stderr_lines_are_streamed() {
        let mut seen = Vec::new();
        let output = ToolCommand::new(PathBuf::from("sh"))
            .args(["-c", "echo out_time=00:00:01.00 >&2; echo 'real message' >&2"])
            .execute_with_stderr_callback(|line| seen.push(line.to_string()), None)
            .await
            .unwrap();
        assert_eq!(seen, vec!["out_time=00:00:01.00", "real message"]);
        assert_eq!(output.stderr, "real message");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn streaming_failure_carries_stderr_tail() {
        let err = ToolCommand::new(PathBuf::from("sh"))
            .args(["-c", "echo 'Invalid argument' >&2; exit 1"])
            .execute_with_stderr_callback(|_| {}, None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Tool { .. }));
        assert!(err.to_string().contains("Invalid argument"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn cancellation_kills_process() {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            trigger.cancel();
        });

        let started = std::time::Instant::now();
        let err = ToolCommand::new(PathBuf::from("sleep"))
            .arg("10")
            .execute_with_stderr_callback(|_| {}, Some(cancel))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Cancelled(_)));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn describe_quotes_awkward_args() {
        let mut cmd = ToolCommand::new(PathBuf::from("/usr/bin/ffmpeg"));
        cmd.args(["-filter_complex", "[0:v]fps=30[vout];[x]null[y]", "-y", "my file.mp4"]);
        assert_eq!(
            cmd.describe(),
            "/usr/bin/ffmpeg -filter_complex '[0:v]fps=30[vout];[x]null[y]' -y 'my file.mp4'"
        );
    }

    #[test]
    fn progress_line_detection() {
        assert!(is_progress_line("out_time=00:00:01.000000"));
        assert!(is_progress_line("progress=continue"));
        assert!(!is_progress_line("Error opening input: No such file"));
        assert!(!is_progress_line("[libx264 @ 0x1] crf=23.0 qcomp=0.60"));
    }
}
