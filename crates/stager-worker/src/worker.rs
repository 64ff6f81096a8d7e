// Worker: wires the host context, step host and step registry together and
// runs one step per process.

use serde_json::Value;
use stager_common::{HostContext, SettingsError, StepError};
use stager_sdk::TraceWriter;
use std::sync::Arc;

use crate::execution_context::ExecutionContext;
use crate::step_host::{ShellFacade, StepHost};
use crate::steps::StepRegistry;

/// Process exit code for a successful step.
pub const EXIT_SUCCEEDED: i32 = 0;
/// Process exit code for a step that failed while running.
pub const EXIT_FAILED: i32 = 1;
/// Process exit code for a step rejected before running anything.
pub const EXIT_INVALID_ARGUMENTS: i32 = 2;

pub struct Worker {
    host_context: Arc<HostContext>,
    steps: StepRegistry,
}

impl Worker {
    /// A worker running commands through a [`StepHost`] for the configured
    /// container backend.
    pub fn new(host_context: Arc<HostContext>) -> Result<Self, SettingsError> {
        let settings = host_context.settings();
        let backend = settings.container_backend()?;
        tracing::info!(backend = ?backend, "Using container backend");
        let shell = StepHost::new(
            backend,
            settings.shell_path.clone(),
            host_context.get_trace("StepHost"),
        );
        Ok(Self::with_shell(host_context, Arc::new(shell)))
    }

    pub fn with_shell(host_context: Arc<HostContext>, shell: Arc<dyn ShellFacade>) -> Self {
        let steps = StepRegistry::with_default_steps(&host_context, shell);
        Self {
            host_context,
            steps,
        }
    }

    pub fn steps(&self) -> &StepRegistry {
        &self.steps
    }

    /// Run step `name` from the host's working directory.
    pub async fn run_step(&self, name: &str, arguments: Value) -> Result<Value, StepError> {
        let trace = self.host_context.get_trace("Worker");
        let mut context = ExecutionContext::from_host(&self.host_context);
        match self.steps.invoke(name, &mut context, arguments).await {
            Ok(value) => {
                trace.info(&format!("Step {name} succeeded"));
                Ok(value)
            }
            Err(err) => {
                trace.error_chain(&err);
                Err(err)
            }
        }
    }

    pub fn exit_code(result: &Result<Value, StepError>) -> i32 {
        match result {
            Ok(_) => EXIT_SUCCEEDED,
            Err(err) if err.is_validation() => EXIT_INVALID_ARGUMENTS,
            Err(_) => EXIT_FAILED,
        }
    }
}
