//! Docker/Podman engine.
//!
//! Implements [`EngineClient`] and [`ContainerLifecycle`] over the bollard API.

use crate::launcher::{
    ContainerHandle, ContainerLifecycle, ContainerSpec, EngineClient, ImageHandle, LaunchError,
    ResourceLimit, Result,
};
use async_trait::async_trait;
use bollard::Docker;
use bollard::models::{HostConfig, ResourcesUlimits};
use bollard::query_parameters::ImportImageOptionsBuilder;
use bytes::BytesMut;
use futures::stream::StreamExt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tracing::{debug, info};

/// Read size for streaming image archives to the engine.
const ARCHIVE_CHUNK_SIZE: usize = 64 * 1024;

/// Engine connection configuration.
#[derive(Debug, Clone)]
pub struct DockerEngineConfig {
    /// Explicit socket URI (`unix:///var/run/docker.sock`); `None` probes defaults
    pub socket: Option<String>,
    /// Request timeout in seconds
    pub timeout: u64,
}

impl Default for DockerEngineConfig {
    fn default() -> Self {
        Self {
            socket: None,
            timeout: 120,
        }
    }
}

/// Type of container runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeType {
    /// Docker runtime
    Docker,
    /// Podman runtime
    Podman,
}

impl std::fmt::Display for RuntimeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RuntimeType::Docker => write!(f, "Docker"),
            RuntimeType::Podman => write!(f, "Podman"),
        }
    }
}

/// bollard-backed engine client.
#[derive(Clone)]
pub struct DockerEngine {
    docker: Arc<Docker>,
}

impl DockerEngine {
    /// Connect with default configuration.
    ///
    /// # Errors
    ///
    /// Returns error if neither Docker nor Podman is reachable.
    pub async fn new() -> Result<Self> {
        Self::with_config(DockerEngineConfig::default()).await
    }

    /// Connect with custom configuration and verify the daemon answers.
    ///
    /// # Errors
    ///
    /// Returns error if connection or ping fails.
    pub async fn with_config(config: DockerEngineConfig) -> Result<Self> {
        let docker = Self::connect(&config)?;
        let engine = Self {
            docker: Arc::new(docker),
        };

        engine.ping().await?;
        info!("Connected to {} engine", engine.runtime_type().await?);

        Ok(engine)
    }

    /// Connect to the configured socket, or probe:
    /// 1. Local defaults (`DOCKER_HOST` or the platform socket)
    /// 2. Rootless Podman socket
    /// 3. System Podman socket
    fn connect(config: &DockerEngineConfig) -> Result<Docker> {
        if let Some(socket) = &config.socket {
            debug!("Connecting to configured engine socket {}", socket);
            return Docker::connect_with_socket(socket, config.timeout, bollard::API_DEFAULT_VERSION)
                .map_err(|e| {
                    LaunchError::Config(format!("Failed to connect to {}: {}", socket, e))
                });
        }

        match Docker::connect_with_local_defaults() {
            Ok(docker) => {
                debug!("Connected to container runtime via local defaults");
                return Ok(docker.with_timeout(Duration::from_secs(config.timeout)));
            }
            Err(e) => debug!("Local defaults failed: {}", e),
        }

        #[cfg(unix)]
        {
            let mut candidates = Vec::new();
            if let Ok(home) = std::env::var("HOME") {
                candidates.push(format!("unix://{}/run/podman/podman.sock", home));
            }
            candidates.push("unix:///run/podman/podman.sock".to_string());

            for socket in candidates {
                debug!("Trying Podman socket: {}", socket);
                match Docker::connect_with_socket(
                    &socket,
                    config.timeout,
                    bollard::API_DEFAULT_VERSION,
                ) {
                    Ok(docker) => {
                        debug!("Connected to Podman via {}", socket);
                        return Ok(docker);
                    }
                    Err(e) => debug!("Podman socket {} failed: {}", socket, e),
                }
            }
        }

        Err(LaunchError::Config(
            "Failed to connect to Docker or Podman. Please ensure Docker or Podman is installed and running.".to_string(),
        ))
    }

    /// Ping the engine.
    ///
    /// # Errors
    ///
    /// Returns error if ping fails.
    pub async fn ping(&self) -> Result<()> {
        self.docker.ping().await.map_err(|e| {
            LaunchError::Config(format!("Failed to ping container runtime: {}", e))
        })?;
        debug!("Container runtime ping successful");
        Ok(())
    }

    /// Detect whether the engine is Docker or Podman.
    ///
    /// # Errors
    ///
    /// Returns error if the version query fails.
    pub async fn runtime_type(&self) -> Result<RuntimeType> {
        let version = self.docker.version().await?;

        let is_podman = version
            .components
            .unwrap_or_default()
            .iter()
            .any(|c| c.name.to_lowercase().contains("podman"));

        Ok(if is_podman {
            RuntimeType::Podman
        } else {
            RuntimeType::Docker
        })
    }

    /// Raw engine view of a container.
    ///
    /// # Errors
    ///
    /// Returns the bollard error unchanged so callers can match on status codes.
    pub async fn inspect_container(
        &self,
        name: &str,
    ) -> std::result::Result<bollard::models::ContainerInspectResponse, bollard::errors::Error>
    {
        self.docker
            .inspect_container(
                name,
                None::<bollard::query_parameters::InspectContainerOptions>,
            )
            .await
    }
}

#[async_trait]
impl EngineClient for DockerEngine {
    async fn get_image(&self, reference: &str) -> Result<ImageHandle> {
        let inspect = self.docker.inspect_image(reference).await.map_err(|e| match e {
            bollard::errors::Error::DockerResponseServerError {
                status_code: 404, ..
            } => LaunchError::EngineQuery(format!("Image not found: {}", reference)),
            e => LaunchError::EngineQuery(format!("Failed to inspect image {}: {}", reference, e)),
        })?;

        let id = inspect
            .id
            .ok_or_else(|| LaunchError::EngineQuery(format!("Image {} has no ID", reference)))?;
        let user = inspect.config.and_then(|config| config.user);

        Ok(ImageHandle {
            id,
            reference: reference.to_string(),
            user,
        })
    }

    async fn create_container(&self, spec: &ContainerSpec) -> Result<ContainerHandle> {
        let options = bollard::container::CreateContainerOptions {
            name: spec.name.as_str(),
            ..Default::default()
        };

        let response = self
            .docker
            .create_container(Some(options), create_config(spec))
            .await
            .map_err(|e| LaunchError::ContainerCreation {
                name: spec.name.clone(),
                reason: match e {
                    bollard::errors::Error::DockerResponseServerError {
                        status_code: 409, ..
                    } => "a container with this name already exists".to_string(),
                    e => e.to_string(),
                },
            })?;

        for warning in &response.warnings {
            debug!("Create warning for {}: {}", spec.name, warning);
        }

        Ok(ContainerHandle {
            id: response.id,
            name: spec.name.clone(),
            status: Some("created".to_string()),
        })
    }

    async fn get_container(&self, name: &str) -> Result<ContainerHandle> {
        let inspect = self.inspect_container(name).await.map_err(|e| match e {
            bollard::errors::Error::DockerResponseServerError {
                status_code: 404, ..
            } => LaunchError::EngineQuery(format!("Container not found: {}", name)),
            e => LaunchError::EngineQuery(format!("Failed to inspect container {}: {}", name, e)),
        })?;

        let id = inspect
            .id
            .ok_or_else(|| LaunchError::EngineQuery(format!("Container {} has no ID", name)))?;

        Ok(ContainerHandle {
            id,
            name: inspect
                .name
                .map(|n| n.trim_start_matches('/').to_string())
                .unwrap_or_else(|| name.to_string()),
            status: inspect
                .state
                .and_then(|state| state.status)
                .map(|status| status.to_string()),
        })
    }
}

#[async_trait]
impl ContainerLifecycle for DockerEngine {
    async fn image_exists(&self, image: &str) -> Result<bool> {
        match self.docker.inspect_image(image).await {
            Ok(_) => Ok(true),
            Err(bollard::errors::Error::DockerResponseServerError {
                status_code: 404, ..
            }) => Ok(false),
            Err(e) => Err(LaunchError::Engine(e)),
        }
    }

    async fn pull_image(&self, image: &str) -> Result<()> {
        info!("Pulling image: {}", image);

        let mut stream = self.docker.create_image(
            Some(bollard::image::CreateImageOptions {
                from_image: image,
                ..Default::default()
            }),
            None,
            None,
        );

        while let Some(result) = stream.next().await {
            let info = result?;
            if let Some(status) = info.status {
                debug!("Pull: {}", status);
            }
            if let Some(progress) = info.progress {
                debug!("Pull progress: {}", progress);
            }
            if let Some(error) = info.error {
                return Err(LaunchError::EngineQuery(format!(
                    "Pull of {} failed: {}",
                    image, error
                )));
            }
        }

        info!("Successfully pulled image: {}", image);
        Ok(())
    }

    async fn load_image_archive(&self, archive: &Path) -> Result<String> {
        info!("Loading image archive {:?}", archive);

        let file = tokio::fs::File::open(archive).await.map_err(|e| {
            LaunchError::ImageLoad(format!("Failed to open {:?}: {}", archive, e))
        })?;
        let chunks = futures::stream::try_unfold(file, |mut file| async move {
            let mut buf = BytesMut::with_capacity(ARCHIVE_CHUNK_SIZE);
            if file.read_buf(&mut buf).await? == 0 {
                return Ok(None);
            }
            Ok::<_, std::io::Error>(Some((buf.freeze(), file)))
        });

        let mut stream = self.docker.import_image(
            ImportImageOptionsBuilder::default().quiet(true).build(),
            bollard::body_try_stream(chunks),
            None,
        );

        let mut loaded = None;
        while let Some(result) = stream.next().await {
            let info = result.map_err(|e| {
                LaunchError::ImageLoad(format!("Loading {:?} failed: {}", archive, e))
            })?;
            if let Some(error) = info.error {
                return Err(LaunchError::ImageLoad(format!(
                    "Loading {:?} failed: {}",
                    archive, error
                )));
            }
            if let Some(output) = info.stream {
                debug!("Load: {}", output.trim());
                loaded = parse_loaded_image(&output).or(loaded);
            }
        }

        let image = loaded.ok_or_else(|| {
            LaunchError::ImageLoad(format!("Loading {:?} reported no image", archive))
        })?;
        info!("Loaded image {} from {:?}", image, archive);
        Ok(image)
    }

    async fn container_exists(&self, name: &str) -> Result<bool> {
        match self.inspect_container(name).await {
            Ok(_) => Ok(true),
            Err(bollard::errors::Error::DockerResponseServerError {
                status_code: 404, ..
            }) => Ok(false),
            Err(e) => Err(LaunchError::Engine(e)),
        }
    }

    async fn remove_container(&self, name: &str, force: bool) -> Result<()> {
        debug!("Removing container: {}", name);

        self.docker
            .remove_container(
                name,
                Some(bollard::container::RemoveContainerOptions {
                    force,
                    v: true,
                    ..Default::default()
                }),
            )
            .await?;

        info!("Removed container: {}", name);
        Ok(())
    }

    async fn start_container(&self, name: &str) -> Result<()> {
        debug!("Starting container: {}", name);

        self.docker
            .start_container(name, None::<bollard::container::StartContainerOptions<String>>)
            .await?;

        info!("Started container: {}", name);
        Ok(())
    }

    async fn wait_container(&self, name: &str) -> Result<i64> {
        let mut stream = self
            .docker
            .wait_container(name, None::<bollard::container::WaitContainerOptions<String>>);

        match stream.next().await {
            Some(Ok(response)) => Ok(response.status_code),
            // bollard reports non-zero exits as an error carrying the code
            Some(Err(bollard::errors::Error::DockerContainerWaitError { code, .. })) => Ok(code),
            Some(Err(e)) => Err(LaunchError::Engine(e)),
            None => Err(LaunchError::EngineQuery(format!(
                "Wait on container {} ended without a status",
                name
            ))),
        }
    }
}

/// Translate a spec into the engine's create body.
fn create_config(spec: &ContainerSpec) -> bollard::container::Config<String> {
    let host_config = HostConfig {
        network_mode: Some(spec.network_mode.clone()),
        ipc_mode: Some(spec.ipc_mode.clone()),
        pid_mode: Some(spec.pid_mode.clone()),
        ulimits: Some(spec.ulimits.iter().map(to_engine_ulimit).collect()),
        binds: if spec.binds.is_empty() {
            None
        } else {
            Some(spec.binds.clone())
        },
        ..Default::default()
    };

    bollard::container::Config {
        image: Some(spec.image.id.clone()),
        cmd: if spec.command.is_empty() {
            None
        } else {
            Some(spec.command.clone())
        },
        entrypoint: spec.entrypoint.clone(),
        env: if spec.env.is_empty() {
            None
        } else {
            Some(spec.env.clone())
        },
        user: spec.user.clone(),
        tty: Some(spec.tty),
        open_stdin: Some(spec.stdin_open),
        attach_stdin: Some(!spec.detach),
        attach_stdout: Some(!spec.detach),
        attach_stderr: Some(!spec.detach),
        host_config: Some(host_config),
        ..Default::default()
    }
}

fn to_engine_ulimit(limit: &ResourceLimit) -> ResourcesUlimits {
    ResourcesUlimits {
        name: Some(limit.name.to_string()),
        soft: Some(limit.soft),
        hard: Some(limit.hard),
    }
}

/// Extract the image reference from `docker load` / `podman load` output.
///
/// The last reported image wins when an archive holds several tags.
fn parse_loaded_image(output: &str) -> Option<String> {
    output
        .lines()
        .filter_map(|line| {
            let line = line.trim();
            ["Loaded image ID: ", "Loaded image: ", "Loaded image(s): "]
                .iter()
                .find_map(|prefix| line.strip_prefix(prefix))
        })
        .flat_map(|images| images.split(','))
        .map(str::trim)
        .filter(|image| !image.is_empty())
        .last()
        .map(String::from)
}
