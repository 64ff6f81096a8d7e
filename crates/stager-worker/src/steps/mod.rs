// Steps: the operations a pipeline can invoke by name, and the registry that
// dispatches to them.

pub mod pwd;
pub mod stage_extra_images;
pub mod stage_project;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use stager_common::constants::{CLONE_ATTEMPTS, STAGING_ATTEMPTS};
use stager_common::{HostContext, StepError};
use stager_sdk::RetryPolicy;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use crate::container::DockerRegistry;
use crate::execution_context::ExecutionContext;
use crate::step_host::ShellFacade;

pub use pwd::{Pwd, PwdArguments};
pub use stage_extra_images::{ImageStagingRequest, StageExtraImages};
pub use stage_project::{StageProject, StageProjectRequest};

/// A named operation invoked with a JSON object of arguments.
#[async_trait]
pub trait Step: Send + Sync {
    /// Name the step is registered and invoked under.
    fn name(&self) -> &'static str;

    fn display_name(&self) -> &'static str;

    async fn invoke(
        &self,
        context: &mut ExecutionContext,
        arguments: Value,
    ) -> Result<Value, StepError>;
}

/// Deserialize step arguments. `null` means no arguments were given.
pub(crate) fn parse_arguments<T: DeserializeOwned>(
    step: &str,
    arguments: Value,
) -> Result<T, StepError> {
    let arguments = match arguments {
        Value::Null => Value::Object(serde_json::Map::new()),
        other => other,
    };
    serde_json::from_value(arguments)
        .map_err(|err| StepError::validation(format!("{step}: {err}")))
}

/// Maps step names to their implementations.
#[derive(Default)]
pub struct StepRegistry {
    steps: BTreeMap<&'static str, Box<dyn Step>>,
}

impl StepRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in steps wired to `shell` and the host's settings.
    pub fn with_default_steps(host: &HostContext, shell: Arc<dyn ShellFacade>) -> Self {
        let settings = host.settings();
        let delay = Duration::from_millis(settings.retry_delay_ms);
        let registry = DockerRegistry::from_settings(settings);

        let stage_extra_images = || {
            StageExtraImages::new(shell.clone(), registry.clone())
                .with_retry(RetryPolicy::new(STAGING_ATTEMPTS).with_delay(delay))
                .with_trace(Arc::new(host.get_trace("StageExtraImages")))
        };
        let stage_project = StageProject::new(shell.clone(), stage_extra_images())
            .with_clone_retry(RetryPolicy::new(CLONE_ATTEMPTS).with_delay(delay))
            .with_trace(Arc::new(host.get_trace("StageProject")));

        let mut steps = Self::new();
        steps.register(Box::new(Pwd::new()));
        steps.register(Box::new(stage_extra_images()));
        steps.register(Box::new(stage_project));
        steps
    }

    /// Add a step, replacing any step already registered under its name.
    pub fn register(&mut self, step: Box<dyn Step>) {
        tracing::debug!(step = step.name(), "Registering step");
        self.steps.insert(step.name(), step);
    }

    pub fn get(&self, name: &str) -> Option<&dyn Step> {
        self.steps.get(name).map(|step| step.as_ref())
    }

    /// Registered step names, sorted.
    pub fn names(&self) -> Vec<&'static str> {
        self.steps.keys().copied().collect()
    }

    pub async fn invoke(
        &self,
        name: &str,
        context: &mut ExecutionContext,
        arguments: Value,
    ) -> Result<Value, StepError> {
        let step = self.get(name).ok_or_else(|| {
            StepError::validation(format!(
                "unknown step '{name}', expected one of: {}",
                self.names().join(", ")
            ))
        })?;
        tracing::info!(step = name, "{}", step.display_name());
        step.invoke(context, arguments).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingShell;
    use serde_json::json;
    use stager_common::StagerSettings;
    use std::collections::HashMap;

    fn host(settings: StagerSettings) -> Arc<HostContext> {
        HostContext::new(settings, "/work", HashMap::new())
    }

    fn registry_settings() -> StagerSettings {
        StagerSettings {
            registry_host: Some("10.0.0.5".into()),
            registry_port: Some("80".into()),
            ..StagerSettings::default()
        }
    }

    #[test]
    fn default_steps_are_registered() {
        let shell = Arc::new(RecordingShell::new());
        let steps = StepRegistry::with_default_steps(&host(StagerSettings::default()), shell);
        assert_eq!(steps.names(), vec!["pwd", "stageExtraImages", "stageProject"]);
        assert_eq!(
            steps.get("pwd").map(|s| s.display_name()),
            Some("Evaluates the current working directory")
        );
    }

    #[tokio::test]
    async fn unknown_step_is_validation_error() {
        let shell = Arc::new(RecordingShell::new());
        let steps = StepRegistry::with_default_steps(&host(StagerSettings::default()), shell.clone());
        let err = steps
            .invoke("deployProject", &mut ExecutionContext::new("/work"), Value::Null)
            .await
            .unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("deployProject"));
        assert!(shell.commands().is_empty());
    }

    #[tokio::test]
    async fn dispatches_to_named_step() {
        let shell = Arc::new(RecordingShell::new());
        let steps = StepRegistry::with_default_steps(&host(registry_settings()), shell.clone());
        let mut ctx = ExecutionContext::new("/work");

        let cwd = steps.invoke("pwd", &mut ctx, json!({})).await.unwrap();
        assert_eq!(cwd, json!("/work"));

        steps
            .invoke("stageExtraImages", &mut ctx, json!({"tag": "1.0", "images": ["a"]}))
            .await
            .unwrap();
        assert_eq!(
            shell.commands()[3],
            "docker push 10.0.0.5:80/fabric8/a:1.0"
        );
    }

    #[tokio::test]
    async fn end_to_end_second_image_succeeds_on_third_attempt() {
        let shell = Arc::new(RecordingShell::new());
        shell.fail_times("docker pull docker.io/fabric8/b:latest", 2);
        let steps = StepRegistry::with_default_steps(&host(registry_settings()), shell.clone());

        steps
            .invoke(
                "stageExtraImages",
                &mut ExecutionContext::new("/work"),
                json!({"tag": "1.0", "images": ["a", "b"]}),
            )
            .await
            .unwrap();

        let commands = shell.commands();
        assert_eq!(commands.len(), 4 + 1 + 1 + 4);
        assert_eq!(commands[4], "docker pull docker.io/fabric8/b:latest");
        assert_eq!(commands[5], "docker pull docker.io/fabric8/b:latest");
        assert_eq!(commands[9], "docker push 10.0.0.5:80/fabric8/b:1.0");
    }

    #[test]
    fn parse_arguments_treats_null_as_empty() {
        let args: PwdArguments = parse_arguments("pwd", Value::Null).unwrap();
        assert!(!args.tmp);

        let err = parse_arguments::<PwdArguments>("pwd", json!({"tmp": "yes"})).unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().starts_with("Missing or invalid arguments: pwd:"));
    }
}
