// StageProject: clone a project, work out its release version and stage the
// extra images released with it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use stager_common::constants::{containers, git, CLONE_ATTEMPTS};
use stager_common::StepError;
use stager_sdk::{ArgUtil, RetryPolicy, StringUtil, TraceWriter, TracingTraceWriter};
use std::sync::Arc;

use crate::container::ContainerScope;
use crate::execution_context::ExecutionContext;
use crate::git_helper::{self, GitRepositoryInfo};
use crate::model::StagedProjectInfo;
use crate::step_host::ShellFacade;
use crate::steps::stage_extra_images::{ImageStagingRequest, StageExtraImages};
use crate::steps::{parse_arguments, Step};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct StageProjectRequest {
    /// Defaults to the origin of the checkout in the working directory.
    pub git_clone_url: Option<String>,
    /// Defaults to the latest tag of the clone.
    pub release_version: Option<String>,
    pub repo_ids: Vec<String>,
    pub extra_images: Vec<String>,
    /// Only projects of this organisation may be staged.
    pub cd_organisation: Option<String>,
    /// Only these branches may be staged.
    pub cd_branches: Vec<String>,
}

pub struct StageProject {
    shell: Arc<dyn ShellFacade>,
    stage_extra_images: StageExtraImages,
    clone_retry: RetryPolicy,
    trace: Arc<dyn TraceWriter>,
}

impl StageProject {
    pub fn new(shell: Arc<dyn ShellFacade>, stage_extra_images: StageExtraImages) -> Self {
        Self {
            shell,
            stage_extra_images,
            clone_retry: RetryPolicy::new(CLONE_ATTEMPTS),
            trace: Arc::new(TracingTraceWriter::new("StageProject")),
        }
    }

    pub fn with_clone_retry(mut self, retry: RetryPolicy) -> Self {
        self.clone_retry = retry;
        self
    }

    pub fn with_trace(mut self, trace: Arc<dyn TraceWriter>) -> Self {
        self.trace = trace;
        self
    }

    pub async fn stage(
        &self,
        context: &mut ExecutionContext,
        request: &StageProjectRequest,
    ) -> Result<StagedProjectInfo, StepError> {
        let (url, repository) = self.validate(context, request)?;
        let project = repository.project();
        self.trace.info(&format!("Staging project {project} from {url}"));

        let release_version = {
            let scope = ContainerScope::enter(context, containers::CLIENTS);
            self.clone_repository(&scope, &url, &repository.name).await?;

            let clone = scope.child_in(&repository.name);
            self.check_branch(&clone, &request.cd_branches).await?;

            match StringUtil::non_blank(request.release_version.as_deref()) {
                Some(version) => version.to_string(),
                None => self.describe_release_version(&clone).await?,
            }
        };
        self.trace
            .info(&format!("Release version of {project} is {release_version}"));

        if !request.extra_images.is_empty() {
            let images = ImageStagingRequest::new(&release_version, request.extra_images.clone());
            self.stage_extra_images.stage(context, &images).await?;
        }

        Ok(StagedProjectInfo::new(
            project,
            release_version,
            request.repo_ids.clone(),
        ))
    }

    /// Everything that can be checked before a command runs.
    fn validate(
        &self,
        context: &ExecutionContext,
        request: &StageProjectRequest,
    ) -> Result<(String, GitRepositoryInfo), StepError> {
        ArgUtil::no_blank_entries(&request.repo_ids, "repoIds")?;
        ArgUtil::no_blank_entries(&request.extra_images, "extraImages")?;
        ArgUtil::no_blank_entries(&request.cd_branches, "cdBranches")?;

        let url = match StringUtil::non_blank(request.git_clone_url.as_deref()) {
            Some(url) => url.to_string(),
            None => git_helper::find_git_clone_url(context.working_directory())
                .map_err(|err| StepError::validation(format!("{err:#}")))?
                .ok_or_else(|| {
                    StepError::validation(format!(
                        "no gitCloneUrl given and no git remote found in {}",
                        context.working_directory().display()
                    ))
                })?,
        };

        let repository = git_helper::parse_git_repository_info(&url).ok_or_else(|| {
            StepError::validation(format!("could not parse git repository from {url}"))
        })?;

        if let Some(organisation) = StringUtil::non_blank(request.cd_organisation.as_deref()) {
            if !organisation.eq_ignore_ascii_case(&repository.organisation) {
                return Err(StepError::validation(format!(
                    "project {} is not part of the CD organisation {organisation}",
                    repository.project()
                )));
            }
        }

        if !request.extra_images.is_empty() && self.stage_extra_images.registry().is_none() {
            return Err(StepError::validation(
                "extraImages given but no docker registry host and port are configured",
            ));
        }

        Ok((url, repository))
    }

    /// Clone `url` into `<working directory>/<name>` unless a checkout is
    /// already there.
    ///
    /// The existing-checkout test reads the agent's filesystem. Under the
    /// docker and kubernetes backends the working directory must be a
    /// workspace mounted at the same path in the `clients` container, which
    /// is how CI agent pods share their workspace volume.
    async fn clone_repository(
        &self,
        context: &ExecutionContext,
        url: &str,
        name: &str,
    ) -> Result<(), StepError> {
        let target = context.working_directory().join(name);
        if target.join(git::DIRECTORY).is_dir() {
            self.trace
                .info(&format!("{} is already cloned", target.display()));
            return Ok(());
        }

        let command = format!(
            "git clone {} {}",
            StringUtil::quote_for_shell(url),
            StringUtil::quote_for_shell(name)
        );
        self.clone_retry
            .run(self.trace.as_ref(), || self.shell.run(&command, context))
            .await?;
        Ok(())
    }

    async fn check_branch(
        &self,
        clone: &ExecutionContext,
        cd_branches: &[String],
    ) -> Result<(), StepError> {
        if cd_branches.is_empty() {
            return Ok(());
        }

        let output = self
            .shell
            .run("git rev-parse --abbrev-ref HEAD", clone)
            .await?;
        let branch = output.stdout_text().trim().to_string();
        if !cd_branches.iter().any(|b| b == &branch) {
            return Err(StepError::validation(format!(
                "branch '{branch}' is not one of the CD branches [{}]",
                cd_branches.join(", ")
            )));
        }
        Ok(())
    }

    async fn describe_release_version(&self, clone: &ExecutionContext) -> Result<String, StepError> {
        let output = self
            .shell
            .run("git describe --tags --abbrev=0", clone)
            .await?;
        let version = output.stdout_text().trim().to_string();
        if version.is_empty() {
            return Err(StepError::validation(
                "no releaseVersion given and the repository has no tags",
            ));
        }
        Ok(version)
    }
}

#[async_trait]
impl Step for StageProject {
    fn name(&self) -> &'static str {
        "stageProject"
    }

    fn display_name(&self) -> &'static str {
        "Stages a project release"
    }

    async fn invoke(
        &self,
        context: &mut ExecutionContext,
        arguments: Value,
    ) -> Result<Value, StepError> {
        let request: StageProjectRequest = parse_arguments(self.name(), arguments)?;
        let info = self.stage(context, &request).await?;
        serde_json::to_value(&info)
            .map_err(|err| StepError::validation(format!("could not encode result: {err}")))
    }
}
