// Test doubles shared by the step tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use stager_common::CommandError;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use crate::execution_context::ExecutionContext;
use crate::step_host::{CommandOutput, ShellFacade};

/// A command the recording shell was asked to run, with the context it saw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCommand {
    pub command: String,
    pub container: Option<String>,
    pub working_directory: PathBuf,
}

struct Rule {
    pattern: String,
    remaining_failures: u32,
    stdout: Vec<String>,
}

#[derive(Default)]
struct State {
    calls: Vec<RecordedCommand>,
    rules: Vec<Rule>,
}

/// Shell that records every command and answers from scripted rules instead
/// of spawning processes. Commands matching no rule succeed with no output.
#[derive(Default)]
pub struct RecordingShell {
    state: Mutex<State>,
}

impl RecordingShell {
    pub fn new() -> Self {
        Self::default()
    }

    /// The next `times` commands containing `pattern` fail with exit code 1.
    pub fn fail_times(&self, pattern: &str, times: u32) {
        self.rule(pattern).remaining_failures = times;
    }

    /// Commands containing `pattern` print `stdout` once they stop failing.
    pub fn respond(&self, pattern: &str, stdout: &str) {
        self.rule(pattern).stdout = stdout.lines().map(str::to_string).collect();
    }

    fn rule(&self, pattern: &str) -> parking_lot::MappedMutexGuard<'_, Rule> {
        parking_lot::MutexGuard::map(self.state.lock(), |state| {
            let index = match state.rules.iter().position(|r| r.pattern == pattern) {
                Some(index) => index,
                None => {
                    state.rules.push(Rule {
                        pattern: pattern.to_string(),
                        remaining_failures: 0,
                        stdout: Vec::new(),
                    });
                    state.rules.len() - 1
                }
            };
            &mut state.rules[index]
        })
    }

    pub fn calls(&self) -> Vec<RecordedCommand> {
        self.state.lock().calls.clone()
    }

    pub fn commands(&self) -> Vec<String> {
        self.state
            .lock()
            .calls
            .iter()
            .map(|c| c.command.clone())
            .collect()
    }
}

#[async_trait]
impl ShellFacade for RecordingShell {
    async fn run(
        &self,
        command_line: &str,
        context: &ExecutionContext,
    ) -> Result<CommandOutput, CommandError> {
        let mut state = self.state.lock();
        state.calls.push(RecordedCommand {
            command: command_line.to_string(),
            container: context.container().map(str::to_string),
            working_directory: context.working_directory().to_path_buf(),
        });

        let Some(rule) = state
            .rules
            .iter_mut()
            .find(|r| command_line.contains(&r.pattern))
        else {
            return Ok(CommandOutput::default());
        };

        if rule.remaining_failures > 0 {
            rule.remaining_failures -= 1;
            return Err(CommandError::ExitCode {
                command: command_line.to_string(),
                exit_code: 1,
                stderr: "scripted failure".to_string(),
            });
        }

        Ok(CommandOutput {
            exit_code: 0,
            stdout: rule.stdout.clone(),
            stderr: Vec::new(),
        })
    }
}

/// Formatted `tracing` output of the current thread, for asserting on what
/// reached the log.
#[derive(Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    /// Route this thread's events into a new buffer until the guard drops.
    pub fn install() -> (Self, tracing::subscriber::DefaultGuard) {
        let logs = Self::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::DEBUG)
            .finish();
        (logs, tracing::subscriber::set_default(subscriber))
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
