// Constants shared across the workspace: environment variable names,
// well-known container names and the staging command vocabulary.

use std::num::NonZeroU32;

/// Name of the per-directory settings file.
pub const SETTINGS_FILE_NAME: &str = ".stager";

/// Attempts allowed for each image's pull/tag/tag/push sequence.
pub const STAGING_ATTEMPTS: NonZeroU32 = match NonZeroU32::new(3) {
    Some(n) => n,
    None => unreachable!(),
};

/// Attempts allowed for cloning a repository.
pub const CLONE_ATTEMPTS: NonZeroU32 = STAGING_ATTEMPTS;

pub mod containers {
    /// Container holding the docker CLI.
    pub const DOCKER: &str = "docker";

    /// Container holding git and the other release clients.
    pub const CLIENTS: &str = "clients";
}

pub mod images {
    /// Registry and organisation every extra image is pulled from.
    pub const SOURCE_REPOSITORY: &str = "docker.io/fabric8";

    /// Organisation path used on the target registry.
    pub const TARGET_ORGANISATION: &str = "fabric8";

    /// Tag pulled before re-tagging.
    pub const SOURCE_TAG: &str = "latest";
}

pub mod variables {
    pub const REGISTRY_HOST: &str = "FABRIC8_DOCKER_REGISTRY_SERVICE_HOST";
    pub const REGISTRY_PORT: &str = "FABRIC8_DOCKER_REGISTRY_SERVICE_PORT";
    pub const CONTAINER_BACKEND: &str = "STAGER_CONTAINER_BACKEND";
    pub const POD_NAME: &str = "STAGER_POD_NAME";
    pub const HOSTNAME: &str = "HOSTNAME";
    pub const PRINT_LOG_TO_STDOUT: &str = "STAGER_PRINT_LOG_TO_STDOUT";

    /// Exported to commands run by the host backend inside a container scope.
    pub const ACTIVE_CONTAINER: &str = "STAGER_CONTAINER";
}

pub mod git {
    pub const DIRECTORY: &str = ".git";
    pub const CONFIG_FILE: &str = "config";
    pub const ORIGIN: &str = "origin";
}
