//! # hostlaunch
//!
//! Launches application containers on a trusted, single-tenant host. Each
//! container shares the host's network, IPC and PID namespaces, inherits (or
//! overrides) the caller's ulimits, and runs either as the user its image
//! declares or as the invoking user.
//!
//! ## Modules
//!
//! - **[`launcher`]**: ulimit resolution, image reference parsing, identity
//!   selection, the launch policy and the Docker/Podman engine
//! - **[`cli`]**: command line parsing and configuration discovery
//! - **[`env`]**: path and name constants
//!
//! ## Quick Start
//!
//! ```rust
//! use hostlaunch::launcher::ImageReference;
//!
//! let reference = ImageReference::parse("docker://registry:5000/app:1.2");
//! assert_eq!(reference.as_parts(), ("docker", "registry:5000/app:1.2"));
//! ```

/// Container launch core and engine integration.
pub mod launcher;

/// Command line interface: arguments and configuration.
pub mod cli;

/// Environment constants and path utilities.
pub mod env;

pub use launcher::{
    ContainerHandle, ContainerLauncher, ContainerSpec, EngineClient, ImageHandle, ImageReference,
    LaunchError, LaunchRequest, LimitResolver, ResourceLimit,
};
