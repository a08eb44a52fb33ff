//! Container launch policy.
//!
//! Every container is created sharing the host's network, IPC and PID
//! namespaces, with a tty and open stdin, detached from the caller. The
//! launcher issues exactly one create and one lookup per launch and never
//! retries.

use crate::launcher::{
    ContainerHandle, ContainerSpec, EngineClient, HOST_NAMESPACE, HostSystem, IdentityResolver,
    ImageHandle, ImageReference, ImageScheme, LaunchError, LimitResolver, NixHost, Result,
};
use std::sync::Arc;
use tracing::{debug, info};

/// The image to launch.
#[derive(Debug, Clone)]
pub enum ImageSource {
    /// Already looked up through the engine
    Handle(ImageHandle),
    /// Raw `[scheme://]path` reference
    Reference(String),
}

/// Caller input for one launch.
#[derive(Debug, Clone)]
pub struct LaunchRequest {
    pub name: String,
    pub image: ImageSource,
    pub entrypoint: Option<Vec<String>>,
    pub command: Vec<String>,
    /// `name:soft:hard` overrides; empty copies the host's limits
    pub ulimits: Vec<String>,
    pub env: Vec<String>,
    pub binds: Vec<String>,
}

impl LaunchRequest {
    pub fn new<S: Into<String>>(name: S, image: ImageSource) -> Self {
        Self {
            name: name.into(),
            image,
            entrypoint: None,
            command: Vec::new(),
            ulimits: Vec::new(),
            env: Vec::new(),
            binds: Vec::new(),
        }
    }

    /// Launch from a raw image reference.
    pub fn from_reference<S: Into<String>, R: Into<String>>(name: S, reference: R) -> Self {
        Self::new(name, ImageSource::Reference(reference.into()))
    }

    /// Launch from an image handle.
    pub fn from_image<S: Into<String>>(name: S, image: ImageHandle) -> Self {
        Self::new(name, ImageSource::Handle(image))
    }

    /// Set the command (arguments to the entrypoint).
    pub fn command<I, S>(mut self, command: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.command = command.into_iter().map(|s| s.into()).collect();
        self
    }

    /// Replace the image's entrypoint.
    pub fn entrypoint<I, S>(mut self, entrypoint: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.entrypoint = Some(entrypoint.into_iter().map(|s| s.into()).collect());
        self
    }

    /// Add a `name:soft:hard` ulimit override.
    pub fn ulimit<S: Into<String>>(mut self, spec: S) -> Self {
        self.ulimits.push(spec.into());
        self
    }

    /// Add a `KEY=VALUE` environment entry.
    pub fn env<S: Into<String>>(mut self, entry: S) -> Self {
        self.env.push(entry.into());
        self
    }

    /// Add a `host:container[:mode]` bind.
    pub fn bind<S: Into<String>>(mut self, bind: S) -> Self {
        self.binds.push(bind.into());
        self
    }
}

/// Builds and creates host-sharing containers.
#[derive(Clone)]
pub struct ContainerLauncher {
    limits: LimitResolver,
    identity: IdentityResolver,
}

impl ContainerLauncher {
    pub fn new(host: Arc<dyn HostSystem>) -> Self {
        Self {
            limits: LimitResolver::new(host.clone()),
            identity: IdentityResolver::new(host),
        }
    }

    /// Launcher reading the real process state.
    pub fn with_host_system() -> Self {
        Self::new(Arc::new(NixHost::new()))
    }

    /// Create the container described by `request` and return the engine's view of it.
    ///
    /// The container is created but not started.
    ///
    /// # Errors
    ///
    /// - [`LaunchError::Validation`] for bad overrides, binds or a non-docker reference
    /// - [`LaunchError::ResourceQuery`] when host limits cannot be read
    /// - [`LaunchError::EngineQuery`] when the image or the created container cannot be looked up
    /// - [`LaunchError::ContainerCreation`] when the engine rejects the create
    pub async fn launch(
        &self,
        client: &dyn EngineClient,
        request: &LaunchRequest,
    ) -> Result<ContainerHandle> {
        let image = self.resolve_image(client, &request.image).await?;
        let spec = self.build_spec(request, image)?;

        debug!(
            "Creating container {} from {} (user: {:?}, {} ulimits)",
            spec.name,
            spec.image.reference,
            spec.user,
            spec.ulimits.len()
        );
        client
            .create_container(&spec)
            .await
            .map_err(|e| match e {
                e @ LaunchError::ContainerCreation { .. } => e,
                other => LaunchError::ContainerCreation {
                    name: spec.name.clone(),
                    reason: other.to_string(),
                },
            })?;

        let container = client
            .get_container(&spec.name)
            .await
            .map_err(|e| match e {
                e @ LaunchError::EngineQuery(_) => e,
                other => LaunchError::EngineQuery(format!(
                    "container {} created but lookup failed: {}",
                    spec.name, other
                )),
            })?;
        info!("Created container {} ({})", container.name, container.id);
        Ok(container)
    }

    /// Assemble the create request for an already-resolved image.
    ///
    /// # Errors
    ///
    /// Returns a validation or resource query error from the ulimit and bind checks.
    pub fn build_spec(&self, request: &LaunchRequest, image: ImageHandle) -> Result<ContainerSpec> {
        if request.name.is_empty() {
            return Err(LaunchError::Validation(
                "Container name must not be empty".to_string(),
            ));
        }
        for bind in &request.binds {
            validate_bind(bind)?;
        }

        let identity = self.identity.resolve(&image);
        let ulimits = self.limits.resolve(request.ulimits.as_slice())?;

        Ok(ContainerSpec {
            name: request.name.clone(),
            image,
            command: request.command.clone(),
            entrypoint: request.entrypoint.clone(),
            ulimits,
            user: identity.user_override(),
            network_mode: HOST_NAMESPACE.to_string(),
            ipc_mode: HOST_NAMESPACE.to_string(),
            pid_mode: HOST_NAMESPACE.to_string(),
            detach: true,
            tty: true,
            stdin_open: true,
            env: request.env.clone(),
            binds: request.binds.clone(),
        })
    }

    async fn resolve_image(
        &self,
        client: &dyn EngineClient,
        source: &ImageSource,
    ) -> Result<ImageHandle> {
        match source {
            ImageSource::Handle(image) => Ok(image.clone()),
            ImageSource::Reference(raw) => {
                let reference = ImageReference::parse(raw);
                match reference.scheme {
                    ImageScheme::Docker => {
                        client.get_image(&reference.path).await.map_err(|e| match e {
                            e @ LaunchError::EngineQuery(_) => e,
                            other => LaunchError::EngineQuery(format!(
                                "image {} lookup failed: {}",
                                reference.path, other
                            )),
                        })
                    }
                    other => Err(LaunchError::Validation(format!(
                        "Image '{}' uses scheme '{}' and must be loaded before launch",
                        raw, other
                    ))),
                }
            }
        }
    }
}

/// Check a `host:container[:mode]` bind.
pub(crate) fn validate_bind(bind: &str) -> Result<()> {
    let fields: Vec<&str> = bind.split(':').collect();
    let valid = matches!(fields.len(), 2 | 3)
        && fields.iter().all(|f| !f.is_empty())
        && fields[1].starts_with('/');
    if valid {
        Ok(())
    } else {
        Err(LaunchError::Validation(format!(
            "Invalid bind '{}': expected host:/container[:mode]",
            bind
        )))
    }
}
