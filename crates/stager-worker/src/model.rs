// Values steps hand back to their callers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of staging a project release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StagedProjectInfo {
    project: String,
    release_version: String,
    repo_ids: Vec<String>,
}

impl StagedProjectInfo {
    pub fn new(
        project: impl Into<String>,
        release_version: impl Into<String>,
        repo_ids: Vec<String>,
    ) -> Self {
        Self {
            project: project.into(),
            release_version: release_version.into(),
            repo_ids,
        }
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    pub fn release_version(&self) -> &str {
        &self.release_version
    }

    pub fn repo_ids(&self) -> &[String] {
        &self.repo_ids
    }
}

impl fmt::Display for StagedProjectInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "StagedProjectInfo{{project='{}', releaseVersion='{}', repoIds=[{}]}}",
            self.project,
            self.release_version,
            self.repo_ids.join(", ")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_matches_report_format() {
        let info = StagedProjectInfo::new(
            "fabric8io/fabric8-ui",
            "1.0.3",
            vec!["repo1".into(), "repo2".into()],
        );
        assert_eq!(
            info.to_string(),
            "StagedProjectInfo{project='fabric8io/fabric8-ui', releaseVersion='1.0.3', repoIds=[repo1, repo2]}"
        );
    }

    #[test]
    fn display_with_no_repo_ids() {
        let info = StagedProjectInfo::new("org/app", "2.0", Vec::new());
        assert_eq!(
            info.to_string(),
            "StagedProjectInfo{project='org/app', releaseVersion='2.0', repoIds=[]}"
        );
    }

    #[test]
    fn serializes_with_camel_case_fields() {
        let info = StagedProjectInfo::new("org/app", "2.0", vec!["r".into()]);
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"project": "org/app", "releaseVersion": "2.0", "repoIds": ["r"]})
        );
    }
}
