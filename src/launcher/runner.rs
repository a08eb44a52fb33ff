//! End-to-end container run.
//!
//! Materializes the image (pull or archive load), clears a stale container of
//! the same name, launches, starts, and optionally waits for the exit status.

use crate::launcher::{
    ContainerLauncher, ContainerLifecycle, ImageHandle, ImageReference, ImageScheme, ImageSource,
    LaunchError, LaunchRequest, Result,
};
use std::path::Path;
use tracing::{debug, info, warn};

/// Policy knobs around a launch.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Pull registry images that are not present locally
    pub pull_missing: bool,
    /// Force-remove an existing container with the same name first
    pub remove_stale: bool,
    /// Return right after start instead of waiting for exit
    pub detach: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            pull_missing: true,
            remove_stale: true,
            detach: false,
        }
    }
}

/// Drives a launch against an engine.
pub struct Runner<E> {
    engine: E,
    launcher: ContainerLauncher,
    options: RunOptions,
}

impl<E: ContainerLifecycle> Runner<E> {
    pub fn new(engine: E, launcher: ContainerLauncher, options: RunOptions) -> Self {
        Self {
            engine,
            launcher,
            options,
        }
    }

    /// The engine this runner drives.
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Run the request and return the container's exit status (0 when detached).
    ///
    /// # Errors
    ///
    /// Returns any launch error, or an engine error from pull, load, removal,
    /// start or wait.
    pub async fn run(&self, request: LaunchRequest) -> Result<i64> {
        let image = match &request.image {
            ImageSource::Handle(image) => image.clone(),
            ImageSource::Reference(raw) => self.materialize(raw).await?,
        };
        let request = LaunchRequest {
            image: ImageSource::Handle(image),
            ..request
        };

        if self.options.remove_stale && self.engine.container_exists(&request.name).await? {
            warn!("Removing stale container {}", request.name);
            self.engine.remove_container(&request.name, true).await?;
        }

        let container = self.launcher.launch(&self.engine, &request).await?;
        self.engine.start_container(&container.id).await?;

        if self.options.detach {
            info!("Container {} running detached", container.name);
            return Ok(0);
        }

        let status = self.engine.wait_container(&container.id).await?;
        info!("Container {} exited with status {}", container.name, status);
        Ok(status)
    }

    /// Make the referenced image available to the engine and look it up.
    async fn materialize(&self, raw: &str) -> Result<ImageHandle> {
        let reference = ImageReference::parse(raw);
        debug!("Resolving image {} as {}", raw, reference);

        match reference.scheme {
            ImageScheme::Docker => {
                if !self.engine.image_exists(&reference.path).await? {
                    if !self.options.pull_missing {
                        return Err(LaunchError::EngineQuery(format!(
                            "Image {} is not present and pulling is disabled",
                            reference.path
                        )));
                    }
                    self.engine.pull_image(&reference.path).await?;
                }
                self.engine.get_image(&reference.path).await
            }
            ImageScheme::File => {
                let loaded = self
                    .engine
                    .load_image_archive(Path::new(&reference.path))
                    .await?;
                self.engine.get_image(&loaded).await
            }
            ImageScheme::Other(scheme) => Err(LaunchError::Validation(format!(
                "Unsupported image scheme '{}' in {}",
                scheme, raw
            ))),
        }
    }
}
