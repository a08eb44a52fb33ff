//! Container identity selection.

use crate::launcher::{HostSystem, ImageHandle};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Who the container's entrypoint runs as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    /// The image declares its own user; the engine applies it.
    Image(String),
    /// The image declares nothing; run as the launching process.
    Host { uid: u32, gid: u32 },
}

impl Identity {
    /// Value for the create request's user field.
    ///
    /// Only the host fallback is set explicitly.
    pub fn user_override(&self) -> Option<String> {
        match self {
            Identity::Image(_) => None,
            Identity::Host { uid, gid } => Some(format!("{}:{}", uid, gid)),
        }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identity::Image(user) => write!(f, "{} (image)", user),
            Identity::Host { uid, gid } => write!(f, "{}:{} (host)", uid, gid),
        }
    }
}

#[derive(Clone)]
pub struct IdentityResolver {
    host: Arc<dyn HostSystem>,
}

impl IdentityResolver {
    pub fn new(host: Arc<dyn HostSystem>) -> Self {
        Self { host }
    }

    /// Pick the identity for an image looked up through the engine.
    pub fn resolve(&self, image: &ImageHandle) -> Identity {
        match image.user.as_deref().map(str::trim) {
            Some(user) if !user.is_empty() => {
                debug!("Image {} declares user {}", image.reference, user);
                Identity::Image(user.to_string())
            }
            _ => {
                let identity = Identity::Host {
                    uid: self.host.user_id(),
                    gid: self.host.group_id(),
                };
                debug!(
                    "Image {} declares no user, falling back to {}",
                    image.reference, identity
                );
                identity
            }
        }
    }
}
