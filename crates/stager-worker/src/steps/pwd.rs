// Pwd: reports the working directory, or a fresh scratch directory next to
// the system temp files.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use stager_common::StepError;
use stager_sdk::IOUtil;
use std::path::PathBuf;

use crate::execution_context::ExecutionContext;
use crate::steps::{parse_arguments, Step};

const TEMP_DIRECTORY_SUFFIX: &str = ".tmp";
const FALLBACK_PREFIX: &str = "stager";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PwdArguments {
    /// Create and return a new temporary directory instead.
    pub tmp: bool,
}

pub struct Pwd {
    temp_root: PathBuf,
}

impl Pwd {
    pub fn new() -> Self {
        Self::with_temp_root(std::env::temp_dir())
    }

    /// Create temporary directories under `temp_root` instead of the system
    /// temp dir.
    pub fn with_temp_root(temp_root: impl Into<PathBuf>) -> Self {
        Self {
            temp_root: temp_root.into(),
        }
    }

    /// The context's working directory, or with `tmp` a newly created
    /// directory named `<cwd name><random>.tmp`. The directory outlives the
    /// call.
    pub fn resolve_working_directory(
        &self,
        context: &ExecutionContext,
        tmp: bool,
    ) -> Result<PathBuf, StepError> {
        if !tmp {
            return Ok(context.working_directory().to_path_buf());
        }

        let prefix = context
            .working_directory()
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| FALLBACK_PREFIX.to_string());

        let directory =
            IOUtil::create_temp_directory_in(&self.temp_root, &prefix, TEMP_DIRECTORY_SUFFIX)
                .map_err(|err| {
                    StepError::failed_operation(
                        format!("Failed to create temporary dir under {}", self.temp_root.display()),
                        err,
                    )
                })?;
        tracing::debug!(directory = %directory.display(), "Created temporary directory");
        Ok(directory)
    }
}

impl Default for Pwd {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Step for Pwd {
    fn name(&self) -> &'static str {
        "pwd"
    }

    fn display_name(&self) -> &'static str {
        "Evaluates the current working directory"
    }

    async fn invoke(
        &self,
        context: &mut ExecutionContext,
        arguments: Value,
    ) -> Result<Value, StepError> {
        let arguments: PwdArguments = parse_arguments(self.name(), arguments)?;
        let directory = self.resolve_working_directory(context, arguments.tmp)?;
        Ok(Value::String(directory.to_string_lossy().into_owned()))
    }
}
