// stager-common: Shared services for the stager workspace.
// Depends on `stager-sdk`; consumed by `stager-worker`.

pub mod config_store;
pub mod constants;
pub mod errors;
pub mod host_context;
pub mod secret_masker;
pub mod tracing;

// ---------------------------------------------------------------------------
// Re-exports for convenient access
// ---------------------------------------------------------------------------

pub use config_store::{
    ContainerBackend, ContainerBackendKind, SettingsError, SettingsStore, StagerSettings,
};
pub use errors::{CommandError, StepError};
pub use host_context::HostContext;
pub use secret_masker::SecretMasker;
pub use self::tracing::{TraceEventType, TraceManager, TraceSetting, Tracing};
