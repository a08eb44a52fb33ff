//! Host-sharing container launcher.
//!
//! This module turns an image reference, a command line and a set of ulimit
//! overrides into a container that runs in the host's network, IPC and PID
//! namespaces. The engine is reached through the narrow [`EngineClient`]
//! capability and host process state through [`HostSystem`], so the launch
//! policy can be exercised without a running daemon.
//!
//! ## Architecture
//!
//! - [`ulimit`]: resource-limit acquisition from the host and override parsing
//! - [`image_ref`]: `scheme://path` image reference parsing
//! - [`identity`]: user/group selection from image metadata or the host
//! - [`host`]: host process capability (rlimits, uid/gid)
//! - [`engine`]: engine capability traits and the container creation spec
//! - [`launch`]: the launcher composing all of the above
//! - [`docker`]: bollard-backed engine for Docker/Podman
//! - [`envdir`]: one-file-per-variable environment directories
//! - [`runner`]: end-to-end pull, cleanup, launch, start and wait
//!
//! ## Usage
//!
//! ```rust,no_run
//! use hostlaunch::launcher::{ContainerLauncher, DockerEngine, LaunchRequest};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let engine = DockerEngine::new().await?;
//!     let launcher = ContainerLauncher::with_host_system();
//!
//!     let request = LaunchRequest::from_reference("web-1", "docker:///nginx:latest")
//!         .command(["nginx", "-g", "daemon off;"])
//!         .ulimit("nofile:4096:4096");
//!
//!     let container = launcher.launch(&engine, &request).await?;
//!     println!("created {}", container.id);
//!     Ok(())
//! }
//! ```

pub mod docker;
pub mod engine;
pub mod envdir;
pub mod host;
pub mod identity;
pub mod image_ref;
pub mod launch;
pub mod runner;
pub mod ulimit;

pub use docker::{DockerEngine, DockerEngineConfig, RuntimeType};
pub use engine::{
    ContainerHandle, ContainerLifecycle, ContainerSpec, EngineClient, HOST_NAMESPACE, ImageHandle,
};
pub use host::{HostSystem, NixHost};
pub use identity::{Identity, IdentityResolver};
pub use image_ref::{DEFAULT_SCHEME, ImageReference, ImageScheme};
pub use launch::{ContainerLauncher, ImageSource, LaunchRequest};
pub use runner::{RunOptions, Runner};
pub use ulimit::{LimitName, LimitResolver, ResourceLimit, UNLIMITED};

/// Launcher errors.
#[derive(Debug, thiserror::Error)]
pub enum LaunchError {
    /// Malformed caller input (ulimit override, bind, unsupported scheme)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Host resource limit could not be read
    #[error("Failed to query resource limit '{limit}': {source}")]
    ResourceQuery {
        limit: LimitName,
        #[source]
        source: std::io::Error,
    },

    /// Image or container lookup failed
    #[error("Engine query failed: {0}")]
    EngineQuery(String),

    /// Engine rejected the create request
    #[error("Failed to create container '{name}': {reason}")]
    ContainerCreation { name: String, reason: String },

    /// Image archive could not be loaded into the engine
    #[error("Image load error: {0}")]
    ImageLoad(String),

    /// Docker/Podman API error outside the launch path
    #[error("Container API error: {0}")]
    Engine(#[from] bollard::errors::Error),

    /// Engine connection or launcher configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for launcher operations.
pub type Result<T> = std::result::Result<T, LaunchError>;
