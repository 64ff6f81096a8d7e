// SettingsStore: loads stager settings from an optional JSON file and layers
// environment overrides on top.

use crate::constants::{self, variables};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use stager_sdk::{IOUtil, StringUtil};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// How "run inside container X" is carried out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerBackendKind {
    /// Commands run on the agent itself; the scope is only recorded.
    #[default]
    Host,
    /// `docker exec` into a container named after the scope.
    Docker,
    /// `kubectl exec` into the scope's container of the agent pod.
    Kubernetes,
}

impl fmt::Display for ContainerBackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContainerBackendKind::Host => write!(f, "host"),
            ContainerBackendKind::Docker => write!(f, "docker"),
            ContainerBackendKind::Kubernetes => write!(f, "kubernetes"),
        }
    }
}

impl FromStr for ContainerBackendKind {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "host" | "none" | "local" => Ok(ContainerBackendKind::Host),
            "docker" => Ok(ContainerBackendKind::Docker),
            "kubernetes" | "k8s" | "kubectl" => Ok(ContainerBackendKind::Kubernetes),
            other => Err(SettingsError::UnknownBackend(other.to_string())),
        }
    }
}

/// A fully resolved container backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContainerBackend {
    Host,
    Docker { docker_path: String },
    Kubernetes { kubectl_path: String, pod: String },
}

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Unknown container backend '{0}' (expected host, docker or kubernetes)")]
    UnknownBackend(String),

    #[error("The kubernetes container backend needs a pod name ({} or {})", variables::POD_NAME, variables::HOSTNAME)]
    MissingPodName,

    #[error("Setting '{0}' must name an executable")]
    BlankToolPath(&'static str),

    #[error("Settings file '{0}' does not exist")]
    MissingSettingsFile(PathBuf),
}

/// Persisted and injected configuration for a stager run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StagerSettings {
    /// Host of the docker registry images are staged to.
    pub registry_host: Option<String>,

    /// Port of the docker registry images are staged to.
    pub registry_port: Option<String>,

    pub container_backend: ContainerBackendKind,

    /// Pod whose containers the kubernetes backend execs into.
    pub pod_name: Option<String>,

    pub shell_path: String,
    pub docker_path: String,
    pub kubectl_path: String,

    /// Pause between retry attempts, in milliseconds. Zero means none.
    pub retry_delay_ms: u64,

    pub print_log_to_stdout: bool,
}

impl Default for StagerSettings {
    fn default() -> Self {
        Self {
            registry_host: None,
            registry_port: None,
            container_backend: ContainerBackendKind::Host,
            pod_name: None,
            shell_path: "sh".to_string(),
            docker_path: "docker".to_string(),
            kubectl_path: "kubectl".to_string(),
            retry_delay_ms: 0,
            print_log_to_stdout: false,
        }
    }
}

impl StagerSettings {
    /// Override fields from environment variables looked up through `lookup`.
    ///
    /// Blank values are ignored. An unparseable backend name is an error.
    pub fn apply_environment<F>(&mut self, lookup: F) -> Result<(), SettingsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(host) = get(variables::REGISTRY_HOST) {
            self.registry_host = Some(host);
        }
        if let Some(port) = get(variables::REGISTRY_PORT) {
            self.registry_port = Some(port);
        }
        if let Some(backend) = get(variables::CONTAINER_BACKEND) {
            self.container_backend = backend.parse()?;
        }
        if let Some(pod) = get(variables::POD_NAME) {
            self.pod_name = Some(pod);
        } else if self.pod_name.is_none() {
            self.pod_name = get(variables::HOSTNAME);
        }
        if let Some(print) = get(variables::PRINT_LOG_TO_STDOUT)
            .and_then(|v| StringUtil::convert_to_bool(&v))
        {
            self.print_log_to_stdout = print;
        }
        Ok(())
    }

    /// Registry host and port, if both are configured.
    pub fn registry(&self) -> Option<(&str, &str)> {
        let host = StringUtil::non_blank(self.registry_host.as_deref())?;
        let port = StringUtil::non_blank(self.registry_port.as_deref())?;
        Some((host, port))
    }

    /// The resolved backend. Every executable the backend spawns must be
    /// named, including the local shell.
    pub fn container_backend(&self) -> Result<ContainerBackend, SettingsError> {
        tool_path("shellPath", &self.shell_path)?;
        match self.container_backend {
            ContainerBackendKind::Host => Ok(ContainerBackend::Host),
            ContainerBackendKind::Docker => Ok(ContainerBackend::Docker {
                docker_path: tool_path("dockerPath", &self.docker_path)?,
            }),
            ContainerBackendKind::Kubernetes => {
                let pod = StringUtil::non_blank(self.pod_name.as_deref())
                    .ok_or(SettingsError::MissingPodName)?;
                Ok(ContainerBackend::Kubernetes {
                    kubectl_path: tool_path("kubectlPath", &self.kubectl_path)?,
                    pod: pod.to_string(),
                })
            }
        }
    }
}

fn tool_path(setting: &'static str, value: &str) -> Result<String, SettingsError> {
    StringUtil::non_blank(Some(value))
        .map(str::to_string)
        .ok_or(SettingsError::BlankToolPath(setting))
}

/// Locates and reads the settings file.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    settings_file: PathBuf,
    required: bool,
}

impl SettingsStore {
    /// A store whose file may be absent, in which case defaults apply.
    pub fn new(settings_file: impl Into<PathBuf>) -> Self {
        Self {
            settings_file: settings_file.into(),
            required: false,
        }
    }

    /// A store for a file the user named explicitly. Loading fails if it is
    /// missing.
    pub fn required(settings_file: impl Into<PathBuf>) -> Self {
        Self {
            required: true,
            ..Self::new(settings_file)
        }
    }

    /// The conventional settings file inside `directory`.
    pub fn for_directory(directory: &Path) -> Self {
        Self::new(directory.join(constants::SETTINGS_FILE_NAME))
    }

    pub fn settings_file(&self) -> &Path {
        &self.settings_file
    }

    pub fn is_configured(&self) -> bool {
        self.settings_file.is_file()
    }

    /// Read the settings file, or defaults if there is none and the file is
    /// optional.
    pub fn load(&self) -> Result<StagerSettings> {
        if !self.is_configured() {
            if self.required {
                let missing = SettingsError::MissingSettingsFile(self.settings_file.clone());
                return Err(missing.into());
            }
            tracing::debug!(
                "No settings file at '{}', using defaults",
                self.settings_file.display()
            );
            return Ok(StagerSettings::default());
        }
        IOUtil::load_object(&self.settings_file)
    }

    /// Read the settings file and apply the process environment.
    pub fn load_with_environment(&self) -> Result<StagerSettings> {
        let mut settings = self.load()?;
        settings.apply_environment(|name| std::env::var(name).ok())?;
        Ok(settings)
    }
}
