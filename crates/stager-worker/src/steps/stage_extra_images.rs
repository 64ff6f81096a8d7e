// StageExtraImages: pull each public fabric8 image, re-tag it with the release
// tag and push it to the in-cluster registry, all inside the docker container.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use stager_common::constants::{containers, STAGING_ATTEMPTS};
use stager_common::StepError;
use stager_sdk::{ArgUtil, RetryPolicy, TraceWriter, TracingTraceWriter};
use std::fmt;
use std::sync::Arc;

use crate::container::{ContainerScope, DockerCommandManager, DockerRegistry};
use crate::execution_context::ExecutionContext;
use crate::step_host::ShellFacade;
use crate::steps::{parse_arguments, Step};

/// What to stage: the release tag and the public image names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImageStagingRequest {
    pub tag: String,
    pub images: Option<Vec<String>>,
}

impl ImageStagingRequest {
    pub fn new(tag: impl Into<String>, images: Vec<String>) -> Self {
        Self {
            tag: tag.into(),
            images: Some(images),
        }
    }

    /// The images to stage, once the request is known to be complete.
    pub fn validate(&self) -> Result<&[String], StepError> {
        let missing = || StepError::validation(format!("was given: {self}"));
        if self.tag.trim().is_empty() {
            return Err(missing());
        }
        let images = self.images.as_deref().ok_or_else(missing)?;
        ArgUtil::no_blank_entries(images, "images")?;
        Ok(images)
    }
}

impl fmt::Display for ImageStagingRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Arguments{{tag='{}', images=", self.tag)?;
        match &self.images {
            Some(images) => write!(f, "[{}]", images.join(", "))?,
            None => write!(f, "null")?,
        }
        write!(f, "}}")
    }
}

pub struct StageExtraImages {
    shell: Arc<dyn ShellFacade>,
    registry: Option<DockerRegistry>,
    retry: RetryPolicy,
    trace: Arc<dyn TraceWriter>,
}

impl StageExtraImages {
    pub fn new(shell: Arc<dyn ShellFacade>, registry: Option<DockerRegistry>) -> Self {
        Self {
            shell,
            registry,
            retry: RetryPolicy::new(STAGING_ATTEMPTS),
            trace: Arc::new(TracingTraceWriter::new("StageExtraImages")),
        }
    }

    /// Replace the per-image retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_trace(mut self, trace: Arc<dyn TraceWriter>) -> Self {
        self.trace = trace;
        self
    }

    pub fn registry(&self) -> Option<&DockerRegistry> {
        self.registry.as_ref()
    }

    /// Stage every image of `request`, in order, inside the `docker`
    /// container.
    ///
    /// Each image's pull/tag/tag/push sequence is retried as a whole. Once an
    /// image exhausts its attempts the remaining images are not touched.
    /// Nothing runs if the request or the registry configuration is
    /// incomplete.
    pub async fn stage(
        &self,
        context: &mut ExecutionContext,
        request: &ImageStagingRequest,
    ) -> Result<(), StepError> {
        let images = match request.validate() {
            Ok(images) => images,
            Err(err) => {
                self.trace.error(&format!("Missing arguments - was given: {request}"));
                return Err(err);
            }
        };
        let registry = self.registry.as_ref().ok_or_else(|| {
            StepError::validation("no docker registry host and port are configured")
        })?;

        let scope = ContainerScope::enter(context, containers::DOCKER);
        let scoped: &ExecutionContext = &scope;
        let docker = DockerCommandManager::new(self.shell.as_ref());
        let tag = request.tag.as_str();

        for image in images {
            self.trace
                .info(&format!("Staging image {image}:{tag} to {registry}"));
            self.retry
                .run(self.trace.as_ref(), || {
                    docker.stage_image(scoped, image, tag, registry)
                })
                .await
                .map_err(|source| StepError::Staging {
                    image: image.clone(),
                    attempts: self.retry.max_attempts(),
                    source,
                })?;
        }
        Ok(())
    }
}

#[async_trait]
impl Step for StageExtraImages {
    fn name(&self) -> &'static str {
        "stageExtraImages"
    }

    fn display_name(&self) -> &'static str {
        "Stages additional docker images"
    }

    async fn invoke(
        &self,
        context: &mut ExecutionContext,
        arguments: Value,
    ) -> Result<Value, StepError> {
        let request: ImageStagingRequest = parse_arguments(self.name(), arguments)?;
        self.stage(context, &request).await?;
        Ok(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingShell;
    use serde_json::json;
    use stager_sdk::trace::CollectingTraceWriter;

    fn registry() -> Option<DockerRegistry> {
        Some(DockerRegistry::new("10.0.0.5", "80"))
    }

    fn images(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    fn image_commands(image: &str, tag: &str) -> Vec<String> {
        DockerCommandManager::staging_commands(image, tag, &DockerRegistry::new("10.0.0.5", "80"))
            .to_vec()
    }

    #[tokio::test]
    async fn stages_images_in_order_inside_docker_container() {
        let shell = Arc::new(RecordingShell::new());
        let step = StageExtraImages::new(shell.clone(), registry());
        let mut ctx = ExecutionContext::new("/work");

        step.stage(&mut ctx, &ImageStagingRequest::new("1.0", images(&["a", "b"])))
            .await
            .unwrap();

        let mut expected = image_commands("a", "1.0");
        expected.extend(image_commands("b", "1.0"));
        assert_eq!(shell.commands(), expected);
        assert!(shell
            .calls()
            .iter()
            .all(|call| call.container.as_deref() == Some("docker")));
        assert_eq!(ctx.container(), None);
    }

    #[tokio::test]
    async fn literal_command_templates() {
        let shell = Arc::new(RecordingShell::new());
        let step = StageExtraImages::new(shell.clone(), registry());
        step.stage(
            &mut ExecutionContext::new("/work"),
            &ImageStagingRequest::new("2.2.4", images(&["jenkins-openshift"])),
        )
        .await
        .unwrap();

        assert_eq!(
            shell.commands(),
            vec![
                "docker pull docker.io/fabric8/jenkins-openshift:latest",
                "docker tag docker.io/fabric8/jenkins-openshift:latest 10.0.0.5:80/fabric8/jenkins-openshift:2.2.4",
                "docker tag docker.io/fabric8/jenkins-openshift:latest docker.io/fabric8/jenkins-openshift:2.2.4",
                "docker push 10.0.0.5:80/fabric8/jenkins-openshift:2.2.4",
            ]
        );
    }

    #[tokio::test]
    async fn failed_attempt_restarts_from_pull() {
        let shell = Arc::new(RecordingShell::new());
        shell.fail_times("docker push 10.0.0.5:80/fabric8/b:1.0", 2);
        let step = StageExtraImages::new(shell.clone(), registry());

        step.stage(
            &mut ExecutionContext::new("/work"),
            &ImageStagingRequest::new("1.0", images(&["a", "b"])),
        )
        .await
        .unwrap();

        let commands = shell.commands();
        assert_eq!(commands.len(), 4 + 3 * 4);
        let b_pulls = commands
            .iter()
            .filter(|c| *c == "docker pull docker.io/fabric8/b:latest")
            .count();
        assert_eq!(b_pulls, 3);
        assert_eq!(&commands[..4], image_commands("a", "1.0").as_slice());
        for attempt in commands[4..].chunks(4) {
            assert_eq!(attempt, image_commands("b", "1.0").as_slice());
        }
    }

    #[tokio::test]
    async fn exhausted_image_aborts_remaining_images() {
        let shell = Arc::new(RecordingShell::new());
        shell.fail_times("docker pull docker.io/fabric8/a:latest", 3);
        let step = StageExtraImages::new(shell.clone(), registry());
        let mut ctx = ExecutionContext::new("/work");

        let err = step
            .stage(&mut ctx, &ImageStagingRequest::new("1.0", images(&["a", "b"])))
            .await
            .unwrap_err();

        match err {
            StepError::Staging {
                image,
                attempts,
                source,
            } => {
                assert_eq!(image, "a");
                assert_eq!(attempts, 3);
                assert_eq!(source.command(), "docker pull docker.io/fabric8/a:latest");
            }
            other => panic!("expected staging error, got {other:?}"),
        }
        assert_eq!(shell.commands().len(), 3);
        assert!(shell.commands().iter().all(|c| !c.contains("/b:")));
        assert_eq!(ctx.container(), None);
    }

    #[tokio::test]
    async fn empty_tag_runs_no_commands() {
        let shell = Arc::new(RecordingShell::new());
        let trace = Arc::new(CollectingTraceWriter::new());
        let step = StageExtraImages::new(shell.clone(), registry()).with_trace(trace.clone());

        let err = step
            .stage(
                &mut ExecutionContext::new("/work"),
                &ImageStagingRequest::new("", images(&["a"])),
            )
            .await
            .unwrap_err();

        assert!(err.is_validation());
        assert!(err.to_string().contains("Arguments{tag='', images=[a]}"));
        assert!(shell.commands().is_empty());
        assert!(trace
            .messages()
            .iter()
            .any(|(_, message)| message.contains("Missing arguments")));
    }

    #[tokio::test]
    async fn absent_images_runs_no_commands() {
        let shell = Arc::new(RecordingShell::new());
        let step = StageExtraImages::new(shell.clone(), registry());
        let request = ImageStagingRequest {
            tag: "1.0".into(),
            images: None,
        };

        let err = step
            .stage(&mut ExecutionContext::new("/work"), &request)
            .await
            .unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("images=null"));
        assert!(shell.commands().is_empty());
    }

    #[tokio::test]
    async fn missing_registry_runs_no_commands() {
        let shell = Arc::new(RecordingShell::new());
        let step = StageExtraImages::new(shell.clone(), None);
        let err = step
            .stage(
                &mut ExecutionContext::new("/work"),
                &ImageStagingRequest::new("1.0", images(&["a"])),
            )
            .await
            .unwrap_err();
        assert!(err.is_validation());
        assert!(shell.commands().is_empty());
    }

    #[tokio::test]
    async fn empty_image_list_is_a_no_op() {
        let shell = Arc::new(RecordingShell::new());
        let step = StageExtraImages::new(shell.clone(), registry());
        step.stage(
            &mut ExecutionContext::new("/work"),
            &ImageStagingRequest::new("1.0", Vec::new()),
        )
        .await
        .unwrap();
        assert!(shell.commands().is_empty());
    }

    #[tokio::test]
    async fn invoke_parses_json_arguments() {
        let shell = Arc::new(RecordingShell::new());
        let step = StageExtraImages::new(shell.clone(), registry());
        let result = step
            .invoke(
                &mut ExecutionContext::new("/work"),
                json!({"tag": "3.1", "images": ["c"]}),
            )
            .await
            .unwrap();
        assert_eq!(result, Value::Null);
        assert_eq!(shell.commands(), image_commands("c", "3.1"));

        let err = step
            .invoke(&mut ExecutionContext::new("/work"), json!({"tag": "3.1"}))
            .await
            .unwrap_err();
        assert!(err.is_validation());
    }
}
