// stager-worker: release staging steps for container-based CI agents.
// Depends on `stager-sdk` and `stager-common`.
//
// Architecture:
//   Worker::run_step → StepRegistry::invoke → Step::invoke
//     → ContainerScope + ShellFacade::run (StepHost spawns the process)

pub mod container;
pub mod execution_context;
pub mod git_helper;
pub mod model;
pub mod step_host;
pub mod steps;
pub mod worker;

#[cfg(test)]
pub(crate) mod testing;

pub use execution_context::ExecutionContext;
pub use model::StagedProjectInfo;
pub use step_host::{CommandOutput, ShellFacade, StepHost};
pub use steps::{Step, StepRegistry};
pub use worker::Worker;
