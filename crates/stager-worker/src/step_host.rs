// StepHost: runs shell command lines for the steps, either on the host or
// inside the container named by the active container scope.

use async_trait::async_trait;
use stager_common::constants::variables::ACTIVE_CONTAINER;
use stager_common::{CommandError, ContainerBackend, Tracing};
use stager_sdk::{ProcessError, ProcessInvoker, StringUtil, TraceWriter};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use crate::execution_context::ExecutionContext;

pub use stager_sdk::ProcessOutput as CommandOutput;

/// Executes a single shell command line in a given context.
///
/// A non-zero exit is reported as [`CommandError::ExitCode`]; steps never
/// inspect exit codes themselves.
#[async_trait]
pub trait ShellFacade: Send + Sync {
    async fn run(
        &self,
        command_line: &str,
        context: &ExecutionContext,
    ) -> Result<CommandOutput, CommandError>;
}

/// The concrete process a command line turns into once the container
/// backend has wrapped it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub file_name: String,
    pub arguments: Vec<String>,
    pub working_directory: PathBuf,
    pub environment: HashMap<String, String>,
}

/// Shell facade backed by real child processes.
pub struct StepHost {
    backend: ContainerBackend,
    shell_path: String,
    trace: Arc<Tracing>,
}

impl StepHost {
    pub fn new(backend: ContainerBackend, shell_path: impl Into<String>, trace: Tracing) -> Self {
        Self {
            backend,
            shell_path: shell_path.into(),
            trace: Arc::new(trace),
        }
    }

    /// Map a command line and context onto the process to spawn.
    ///
    /// Without a container scope (or with the host backend) the line runs
    /// under the local shell with the overlay merged into its environment.
    /// Under the host backend the scope name is exported as
    /// `STAGER_CONTAINER`. The docker and kubernetes backends forward the
    /// working directory and overlay into the container, and their client
    /// runs in the agent's own directory.
    pub fn invocation(&self, command_line: &str, context: &ExecutionContext) -> Invocation {
        let working_directory = context.working_directory().to_path_buf();
        match (context.container(), &self.backend) {
            (Some(container), ContainerBackend::Docker { docker_path }) => {
                let mut arguments = vec!["exec".to_string(), "-i".to_string()];
                arguments.push("-w".to_string());
                arguments.push(working_directory.to_string_lossy().into_owned());
                for (key, value) in context.sorted_environment() {
                    arguments.push("-e".to_string());
                    arguments.push(format!("{key}={value}"));
                }
                arguments.push(container.to_string());
                arguments.extend(["sh".to_string(), "-c".to_string(), command_line.to_string()]);
                Invocation {
                    file_name: docker_path.clone(),
                    arguments,
                    working_directory: PathBuf::new(),
                    environment: HashMap::new(),
                }
            }
            (Some(container), ContainerBackend::Kubernetes { kubectl_path, pod }) => {
                let mut script = String::new();
                for (key, value) in context.sorted_environment() {
                    script.push_str(&format!("export {key}={}; ", StringUtil::quote_for_shell(value)));
                }
                script.push_str(&format!(
                    "cd {} && {command_line}",
                    StringUtil::quote_for_shell(&working_directory.to_string_lossy())
                ));
                let arguments = ["exec", "-i", pod.as_str(), "-c", container, "--", "sh", "-c"]
                    .iter()
                    .map(|s| s.to_string())
                    .chain(std::iter::once(script))
                    .collect();
                Invocation {
                    file_name: kubectl_path.clone(),
                    arguments,
                    working_directory: PathBuf::new(),
                    environment: HashMap::new(),
                }
            }
            (scope, _) => {
                let mut environment = context.environment().clone();
                if let Some(name) = scope {
                    environment.insert(ACTIVE_CONTAINER.to_string(), name.to_string());
                }
                Invocation {
                    file_name: self.shell_path.clone(),
                    arguments: vec!["-c".to_string(), command_line.to_string()],
                    working_directory,
                    environment,
                }
            }
        }
    }
}

#[async_trait]
impl ShellFacade for StepHost {
    async fn run(
        &self,
        command_line: &str,
        context: &ExecutionContext,
    ) -> Result<CommandOutput, CommandError> {
        match context.container() {
            Some(container) => self.trace.info(&format!("[{container}] + {command_line}")),
            None => self.trace.info(&format!("+ {command_line}")),
        }

        let invocation = self.invocation(command_line, context);
        let trace: Arc<dyn TraceWriter> = self.trace.clone();
        let invoker = ProcessInvoker::new(trace);
        let output = invoker
            .execute(
                &invocation.working_directory,
                &invocation.file_name,
                &invocation.arguments,
                Some(&invocation.environment),
                false,
            )
            .await
            .map_err(|err| match err {
                ProcessError::Spawn { source, .. } | ProcessError::Wait { source, .. } => {
                    CommandError::Spawn {
                        command: command_line.to_string(),
                        source,
                    }
                }
                ProcessError::ExitCode(exit) => CommandError::ExitCode {
                    command: command_line.to_string(),
                    exit_code: exit.exit_code,
                    stderr: exit.stderr,
                },
            })?;

        if output.exit_code != 0 {
            return Err(CommandError::ExitCode {
                command: command_line.to_string(),
                exit_code: output.exit_code,
                stderr: output.stderr_text(),
            });
        }
        Ok(output)
    }
}
