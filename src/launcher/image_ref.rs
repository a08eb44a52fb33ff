//! Image reference parsing.
//!
//! References take the form `[scheme://]path`. A bare reference is a registry
//! image. For `docker://` one leading slash is dropped so both
//! `docker:///repo:tag` and `docker://host:port/repo:tag` work; other schemes
//! keep the path exactly as written.

use std::fmt;

/// Scheme assumed when a reference carries none.
pub const DEFAULT_SCHEME: &str = "docker";

const SCHEME_DELIMITER: &str = "://";

/// Where an image is resolved from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageScheme {
    /// Registry or engine-local image
    Docker,
    /// Image archive on the local filesystem
    File,
    /// Anything else, kept verbatim
    Other(String),
}

impl ImageScheme {
    fn from_raw(raw: &str) -> Self {
        match raw {
            "docker" => ImageScheme::Docker,
            "file" => ImageScheme::File,
            other => ImageScheme::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ImageScheme::Docker => "docker",
            ImageScheme::File => "file",
            ImageScheme::Other(raw) => raw,
        }
    }
}

impl fmt::Display for ImageScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed image reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference {
    pub scheme: ImageScheme,
    pub path: String,
}

impl ImageReference {
    /// Parse a reference. Never fails.
    pub fn parse(reference: &str) -> Self {
        let Some((scheme, rest)) = reference.split_once(SCHEME_DELIMITER) else {
            return Self {
                scheme: ImageScheme::from_raw(DEFAULT_SCHEME),
                path: reference.to_string(),
            };
        };

        let scheme = ImageScheme::from_raw(scheme);
        let path = match scheme {
            ImageScheme::Docker => rest.strip_prefix('/').unwrap_or(rest),
            _ => rest,
        };

        Self {
            scheme,
            path: path.to_string(),
        }
    }

    /// The `(scheme, path)` pair as strings.
    pub fn as_parts(&self) -> (&str, &str) {
        (self.scheme.as_str(), &self.path)
    }
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.scheme, SCHEME_DELIMITER, self.path)
    }
}
