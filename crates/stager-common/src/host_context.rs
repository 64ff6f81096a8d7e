// HostContext: the services a stager process shares across steps, built once
// from settings and the injected environment.

use crate::config_store::StagerSettings;
use crate::secret_masker::SecretMasker;
use crate::tracing::{TraceManager, TraceSetting, Tracing};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// What the host CI platform hands to a stager run: settings and the working
/// directory. Secret-looking values of the environment it was built from are
/// registered with the secret masker shared by every trace source.
pub struct HostContext {
    settings: StagerSettings,
    work_directory: PathBuf,
    trace_manager: TraceManager,
}

impl HostContext {
    pub fn new(
        settings: StagerSettings,
        work_directory: impl Into<PathBuf>,
        environment: HashMap<String, String>,
    ) -> Arc<Self> {
        let secret_masker = Arc::new(SecretMasker::new());
        secret_masker.add_from_environment(&environment);

        let trace_setting = TraceSetting {
            print_to_stdout: settings.print_log_to_stdout,
            ..TraceSetting::default()
        };

        Arc::new(Self {
            settings,
            work_directory: work_directory.into(),
            trace_manager: TraceManager::new(secret_masker, trace_setting),
        })
    }

    /// Build from the current process: its working directory and environment.
    pub fn from_process(settings: StagerSettings) -> std::io::Result<Arc<Self>> {
        let cwd = std::env::current_dir()?;
        Ok(Self::new(settings, cwd, std::env::vars().collect()))
    }

    pub fn settings(&self) -> &StagerSettings {
        &self.settings
    }

    pub fn work_directory(&self) -> &Path {
        &self.work_directory
    }

    pub fn secret_masker(&self) -> &Arc<SecretMasker> {
        self.trace_manager.secret_masker()
    }

    /// A trace source named after the component using it.
    pub fn get_trace(&self, name: &str) -> Tracing {
        self.trace_manager.get(name)
    }
}
