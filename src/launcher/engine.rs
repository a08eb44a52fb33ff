//! Engine capability and container creation spec.

use crate::launcher::{ResourceLimit, Result};
use async_trait::async_trait;
use std::path::Path;

/// Namespace mode that shares the host's namespace.
pub const HOST_NAMESPACE: &str = "host";

/// An image known to the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageHandle {
    /// Engine image id
    pub id: String,
    /// Reference the image was looked up by
    pub reference: String,
    /// User declared by the image config, if any
    pub user: Option<String>,
}

/// A container known to the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerHandle {
    /// Engine container id
    pub id: String,
    /// Container name
    pub name: String,
    /// Engine-reported status (created, running, ...)
    pub status: Option<String>,
}

/// Everything the engine needs to create one container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerSpec {
    pub name: String,
    pub image: ImageHandle,
    pub command: Vec<String>,
    /// `None` leaves the image's entrypoint in place
    pub entrypoint: Option<Vec<String>>,
    pub ulimits: Vec<ResourceLimit>,
    /// `uid:gid` override; `None` runs as the image's declared user
    pub user: Option<String>,
    pub network_mode: String,
    pub ipc_mode: String,
    pub pid_mode: String,
    pub detach: bool,
    pub tty: bool,
    pub stdin_open: bool,
    /// `KEY=VALUE` pairs
    pub env: Vec<String>,
    /// `host:container[:mode]` bind mounts
    pub binds: Vec<String>,
}

/// The engine operations the launcher depends on.
///
/// Implementations surface one error per failed call and apply their own
/// timeout policy.
#[async_trait]
pub trait EngineClient: Send + Sync {
    /// Look up an image and its declared user.
    async fn get_image(&self, reference: &str) -> Result<ImageHandle>;

    /// Create (but do not start) a container.
    async fn create_container(&self, spec: &ContainerSpec) -> Result<ContainerHandle>;

    /// Look up a container by name or id.
    async fn get_container(&self, name: &str) -> Result<ContainerHandle>;
}

/// Engine operations around a launch: image materialization and the
/// container lifecycle after create.
#[async_trait]
pub trait ContainerLifecycle: EngineClient {
    /// Check if an image is present locally.
    async fn image_exists(&self, image: &str) -> Result<bool>;

    /// Pull an image from its registry.
    async fn pull_image(&self, image: &str) -> Result<()>;

    /// Load an image archive into the engine and return the reference it reports.
    async fn load_image_archive(&self, archive: &Path) -> Result<String>;

    /// Check if a container with this name or id exists.
    async fn container_exists(&self, name: &str) -> Result<bool>;

    async fn remove_container(&self, name: &str, force: bool) -> Result<()>;

    async fn start_container(&self, name: &str) -> Result<()>;

    /// Block until the container exits and return its exit status.
    async fn wait_container(&self, name: &str) -> Result<i64>;
}
