// ExecutionContext: the ambient state threaded through every command a step
// runs. Owned by a single workflow run.

use stager_common::HostContext;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Working directory, environment overlay and active container scope for the
/// commands of one step invocation.
///
/// The overlay is merged over the inherited process environment when a
/// command is spawned; it does not replace it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionContext {
    working_directory: PathBuf,
    environment: HashMap<String, String>,
    container: Option<String>,
}

impl ExecutionContext {
    pub fn new(working_directory: impl Into<PathBuf>) -> Self {
        Self {
            working_directory: working_directory.into(),
            environment: HashMap::new(),
            container: None,
        }
    }

    /// A root context rooted at the host's working directory.
    pub fn from_host(host: &HostContext) -> Self {
        Self::new(host.work_directory())
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_env(key, value);
        self
    }

    pub fn working_directory(&self) -> &Path {
        &self.working_directory
    }

    pub fn environment(&self) -> &HashMap<String, String> {
        &self.environment
    }

    pub fn set_env(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.environment.insert(key.into(), value.into());
    }

    /// Overlay entries sorted by name, for deterministic command lines.
    pub fn sorted_environment(&self) -> Vec<(&str, &str)> {
        let mut entries: Vec<_> = self
            .environment
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        entries.sort_unstable();
        entries
    }

    /// Name of the active container scope, if any.
    pub fn container(&self) -> Option<&str> {
        self.container.as_deref()
    }

    /// Swap the active container, returning the previous one.
    pub(crate) fn replace_container(&mut self, container: Option<String>) -> Option<String> {
        std::mem::replace(&mut self.container, container)
    }

    /// A copy of this context running in `directory` (relative paths resolve
    /// against the current working directory).
    pub fn child_in(&self, directory: impl AsRef<Path>) -> Self {
        let mut child = self.clone();
        child.working_directory = self.working_directory.join(directory);
        child
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn child_in_resolves_relative_paths() {
        let ctx = ExecutionContext::new("/work").with_env("A", "1");
        let child = ctx.child_in("project");
        assert_eq!(child.working_directory(), Path::new("/work/project"));
        assert_eq!(child.environment().get("A").map(String::as_str), Some("1"));

        let absolute = ctx.child_in("/elsewhere");
        assert_eq!(absolute.working_directory(), Path::new("/elsewhere"));
    }

    #[test]
    fn sorted_environment_is_ordered() {
        let ctx = ExecutionContext::new("/w")
            .with_env("ZETA", "z")
            .with_env("ALPHA", "a");
        assert_eq!(ctx.sorted_environment(), vec![("ALPHA", "a"), ("ZETA", "z")]);
    }

    #[test]
    fn replace_container_returns_previous() {
        let mut ctx = ExecutionContext::new("/w");
        assert_eq!(ctx.replace_container(Some("docker".into())), None);
        assert_eq!(ctx.container(), Some("docker"));
        assert_eq!(ctx.replace_container(None).as_deref(), Some("docker"));
        assert_eq!(ctx.container(), None);
    }
}
