pub mod container_scope;
pub mod docker_command_manager;

pub use container_scope::ContainerScope;
pub use docker_command_manager::{DockerCommandManager, DockerRegistry};
