// DockerCommandManager: the docker CLI vocabulary used to stage an image
// from the public fabric8 organisation into the in-cluster registry.

use stager_common::constants::images;
use stager_common::{CommandError, StagerSettings};
use std::fmt;

use crate::execution_context::ExecutionContext;
use crate::step_host::ShellFacade;

/// Address of the registry images are pushed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DockerRegistry {
    pub host: String,
    pub port: String,
}

impl DockerRegistry {
    pub fn new(host: impl Into<String>, port: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: port.into(),
        }
    }

    /// The configured registry, if both host and port are set.
    pub fn from_settings(settings: &StagerSettings) -> Option<Self> {
        settings
            .registry()
            .map(|(host, port)| Self::new(host, port))
    }
}

impl fmt::Display for DockerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Builds and runs the docker commands that stage one image.
pub struct DockerCommandManager<'a> {
    shell: &'a dyn ShellFacade,
}

impl<'a> DockerCommandManager<'a> {
    pub fn new(shell: &'a dyn ShellFacade) -> Self {
        Self { shell }
    }

    /// The four command lines that stage `image` under `tag`, in order:
    /// pull the public `latest`, tag it for the registry, tag it under the
    /// public name, push the registry tag.
    pub fn staging_commands(image: &str, tag: &str, registry: &DockerRegistry) -> [String; 4] {
        let source = format!("{}/{image}:{}", images::SOURCE_REPOSITORY, images::SOURCE_TAG);
        let target = format!("{registry}/{}/{image}:{tag}", images::TARGET_ORGANISATION);
        let public = format!("{}/{image}:{tag}", images::SOURCE_REPOSITORY);
        [
            format!("docker pull {source}"),
            format!("docker tag {source} {target}"),
            format!("docker tag {source} {public}"),
            format!("docker push {target}"),
        ]
    }

    /// Run the staging commands for one image. Stops at the first failure.
    pub async fn stage_image(
        &self,
        context: &ExecutionContext,
        image: &str,
        tag: &str,
        registry: &DockerRegistry,
    ) -> Result<(), CommandError> {
        for command in Self::staging_commands(image, tag, registry) {
            self.shell.run(&command, context).await?;
        }
        Ok(())
    }
}
