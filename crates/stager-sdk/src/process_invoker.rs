// ProcessInvoker: spawns one child process, captures its stdout/stderr line by
// line and reports the exit code. Callers decide what a non-zero exit means.

use crate::trace::TraceWriter;
use std::collections::HashMap;
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;

/// Error type for non-zero process exit codes.
#[derive(Debug, thiserror::Error)]
#[error(
    "Exit code {exit_code} returned from process: file name '{file_name}', arguments '{arguments}'."
)]
pub struct ProcessExitCodeError {
    pub exit_code: i32,
    pub file_name: String,
    pub arguments: String,
    pub stderr: String,
}

/// Everything that can go wrong while running a child process.
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("Failed to start process '{file_name}'")]
    Spawn {
        file_name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to wait for process '{file_name}'")]
    Wait {
        file_name: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    ExitCode(#[from] ProcessExitCodeError),
}

/// Captured result of a finished process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    pub exit_code: i32,
    pub stdout: Vec<String>,
    pub stderr: Vec<String>,
}

impl ProcessOutput {
    /// Stdout lines joined with `\n`.
    pub fn stdout_text(&self) -> String {
        self.stdout.join("\n")
    }

    /// Stderr lines joined with `\n`.
    pub fn stderr_text(&self) -> String {
        self.stderr.join("\n")
    }
}

/// Spawns child processes with an explicit argument vector, working directory
/// and environment overlay.
///
/// Output lines are traced at verbose level as they arrive and returned to the
/// caller once the process exits. Stdin is always closed.
pub struct ProcessInvoker {
    trace: Arc<dyn TraceWriter>,
}

impl ProcessInvoker {
    /// Create a new `ProcessInvoker` with the given trace writer.
    pub fn new(trace: Arc<dyn TraceWriter>) -> Self {
        Self { trace }
    }

    /// Execute a process and wait for it to exit.
    ///
    /// # Arguments
    /// * `working_directory` - Directory to run in; the current one when empty.
    /// * `file_name` - The executable to run.
    /// * `arguments` - Arguments passed verbatim (no shell splitting).
    /// * `environment` - Variables merged over the inherited environment.
    /// * `require_exit_code_zero` - If true, a non-zero exit becomes `ProcessError::ExitCode`.
    pub async fn execute(
        &self,
        working_directory: &Path,
        file_name: &str,
        arguments: &[String],
        environment: Option<&HashMap<String, String>>,
        require_exit_code_zero: bool,
    ) -> Result<ProcessOutput, ProcessError> {
        if file_name.trim().is_empty() {
            return Err(ProcessError::Spawn {
                file_name: file_name.to_string(),
                source: std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    "no executable given",
                ),
            });
        }

        let joined_arguments = arguments.join(" ");
        self.trace.info("Starting process:");
        self.trace.info(&format!("  File name: '{file_name}'"));
        self.trace.info(&format!("  Arguments: '{joined_arguments}'"));
        self.trace.info(&format!(
            "  Working directory: '{}'",
            working_directory.display()
        ));
        self.trace.info(&format!(
            "  Require exit code zero: '{require_exit_code_zero}'"
        ));

        let mut cmd = Command::new(file_name);
        cmd.args(arguments);

        if !working_directory.as_os_str().is_empty() {
            if !working_directory.is_dir() {
                return Err(ProcessError::Spawn {
                    file_name: file_name.to_string(),
                    source: std::io::Error::new(
                        std::io::ErrorKind::NotFound,
                        format!(
                            "working directory '{}' does not exist",
                            working_directory.display()
                        ),
                    ),
                });
            }
            cmd.current_dir(working_directory);
        }

        if let Some(env) = environment {
            cmd.envs(env);
        }

        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.stdin(Stdio::null());
        cmd.kill_on_drop(true);

        let start = std::time::Instant::now();
        let mut child = cmd.spawn().map_err(|source| ProcessError::Spawn {
            file_name: file_name.to_string(),
            source,
        })?;

        let pid = child.id().unwrap_or(0);
        self.trace.info(&format!(
            "Process started with process id {pid}, waiting for process exit."
        ));

        let stdout_task = tokio::spawn(collect_lines(
            child.stdout.take(),
            self.trace.clone(),
            "STDOUT",
        ));
        let stderr_task = tokio::spawn(collect_lines(
            child.stderr.take(),
            self.trace.clone(),
            "STDERR",
        ));

        let status = child.wait().await.map_err(|source| ProcessError::Wait {
            file_name: file_name.to_string(),
            source,
        })?;
        let exit_code = status.code().unwrap_or(-1);

        let stdout = stdout_task.await.unwrap_or_default();
        let stderr = stderr_task.await.unwrap_or_default();

        let elapsed = start.elapsed();
        self.trace.info(&format!(
            "Finished process {pid} with exit code {exit_code}, and elapsed time {elapsed:.2?}."
        ));

        if exit_code != 0 && require_exit_code_zero {
            return Err(ProcessExitCodeError {
                exit_code,
                file_name: file_name.to_string(),
                arguments: joined_arguments,
                stderr: stderr.join("\n"),
            }
            .into());
        }

        Ok(ProcessOutput {
            exit_code,
            stdout,
            stderr,
        })
    }
}

async fn collect_lines<R>(
    stream: Option<R>,
    trace: Arc<dyn TraceWriter>,
    label: &'static str,
) -> Vec<String>
where
    R: AsyncRead + Unpin,
{
    let mut collected = Vec::new();
    if let Some(stream) = stream {
        let mut lines = BufReader::new(stream).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            trace.verbose(&line);
            collected.push(line);
        }
    }
    trace.verbose(&format!("{label} stream read finished."));
    collected
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::NullTraceWriter;

    fn make_invoker() -> ProcessInvoker {
        ProcessInvoker::new(Arc::new(NullTraceWriter))
    }

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[tokio::test]
    async fn execute_echo() {
        let output = make_invoker()
            .execute(Path::new(""), "echo", &args(&["hello"]), None, true)
            .await
            .unwrap();
        assert_eq!(output.exit_code, 0);
        assert_eq!(output.stdout, vec!["hello"]);
        assert!(output.stderr.is_empty());
    }

    #[tokio::test]
    async fn execute_nonexistent() {
        let result = make_invoker()
            .execute(
                Path::new(""),
                "nonexistent_command_xyz_123",
                &[],
                None,
                false,
            )
            .await;
        assert!(matches!(result, Err(ProcessError::Spawn { .. })));
    }

    #[tokio::test]
    async fn execute_blank_file_name() {
        let result = make_invoker()
            .execute(Path::new(""), "", &args(&["-c", "true"]), None, false)
            .await;
        match result {
            Err(ProcessError::Spawn { source, .. }) => {
                assert_eq!(source.kind(), std::io::ErrorKind::InvalidInput);
            }
            other => panic!("expected spawn error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn execute_missing_working_directory() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("gone");
        let result = make_invoker()
            .execute(&missing, "sh", &args(&["-c", "pwd"]), None, false)
            .await;
        match result {
            Err(ProcessError::Spawn { source, .. }) => {
                assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
                assert!(source.to_string().contains("gone"));
            }
            other => panic!("expected spawn error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn execute_require_exit_code_zero() {
        let result = make_invoker()
            .execute(
                Path::new(""),
                "sh",
                &args(&["-c", "echo broken >&2; exit 3"]),
                None,
                true,
            )
            .await;
        match result {
            Err(ProcessError::ExitCode(err)) => {
                assert_eq!(err.exit_code, 3);
                assert_eq!(err.stderr, "broken");
                assert!(err.to_string().contains("Exit code 3"));
            }
            other => panic!("expected exit code error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn execute_non_zero_allowed() {
        let output = make_invoker()
            .execute(Path::new(""), "sh", &args(&["-c", "exit 5"]), None, false)
            .await
            .unwrap();
        assert_eq!(output.exit_code, 5);
    }

    #[tokio::test]
    async fn execute_with_env_and_working_directory() {
        let dir = tempfile::tempdir().unwrap();
        let mut env = HashMap::new();
        env.insert("MY_TEST_VAR".to_string(), "test_value_123".to_string());

        let output = make_invoker()
            .execute(
                dir.path(),
                "sh",
                &args(&["-c", "echo $MY_TEST_VAR; pwd"]),
                Some(&env),
                true,
            )
            .await
            .unwrap();

        assert_eq!(output.stdout[0], "test_value_123");
        let reported = std::fs::canonicalize(&output.stdout[1]).unwrap();
        assert_eq!(reported, std::fs::canonicalize(dir.path()).unwrap());
    }
}
