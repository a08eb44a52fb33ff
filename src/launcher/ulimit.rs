//! Resource-limit (ulimit) resolution.
//!
//! Without overrides the launcher copies the calling process's own limits for a
//! fixed set of resources. With overrides, exactly the overrides are used and
//! the host is not consulted.

use crate::launcher::{HostSystem, LaunchError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, warn};

/// Sentinel for an unlimited soft or hard value.
pub const UNLIMITED: i64 = -1;

/// Resources the launcher knows how to limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LimitName {
    /// Core dump size
    Core,
    /// Data segment size
    Data,
    /// Created file size
    Fsize,
    /// Processes per real user
    Nproc,
    /// Open file descriptors
    Nofile,
    /// Resident set size
    Rss,
    /// Stack size
    Stack,
}

impl LimitName {
    /// All limits, in the order the host is queried.
    pub const ALL: [LimitName; 7] = [
        LimitName::Core,
        LimitName::Data,
        LimitName::Fsize,
        LimitName::Nproc,
        LimitName::Nofile,
        LimitName::Rss,
        LimitName::Stack,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LimitName::Core => "core",
            LimitName::Data => "data",
            LimitName::Fsize => "fsize",
            LimitName::Nproc => "nproc",
            LimitName::Nofile => "nofile",
            LimitName::Rss => "rss",
            LimitName::Stack => "stack",
        }
    }
}

impl fmt::Display for LimitName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for LimitName {
    type Err = LaunchError;

    fn from_str(s: &str) -> Result<Self> {
        LimitName::ALL
            .iter()
            .copied()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| LaunchError::Validation(format!("Unknown ulimit name '{}'", s)))
    }
}

/// A single (name, soft, hard) limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceLimit {
    pub name: LimitName,
    pub soft: i64,
    pub hard: i64,
}

impl ResourceLimit {
    /// Build a limit, rejecting soft > hard unless either side is unlimited.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a negative value other than [`UNLIMITED`]
    /// or when the soft value exceeds the hard value.
    pub fn new(name: LimitName, soft: i64, hard: i64) -> Result<Self> {
        if soft < UNLIMITED || hard < UNLIMITED {
            return Err(LaunchError::Validation(format!(
                "ulimit {}: values must be non-negative or {} for unlimited, got {}:{}",
                name, UNLIMITED, soft, hard
            )));
        }
        if soft != UNLIMITED && hard != UNLIMITED && soft > hard {
            return Err(LaunchError::Validation(format!(
                "ulimit {}: soft limit {} exceeds hard limit {}",
                name, soft, hard
            )));
        }
        Ok(Self { name, soft, hard })
    }

    /// Parse a `name:soft:hard` override.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a wrong field count, an unknown name,
    /// non-integer values or soft > hard.
    pub fn parse_override(spec: &str) -> Result<Self> {
        let fields: Vec<&str> = spec.split(':').collect();
        let [name, soft, hard] = fields.as_slice() else {
            return Err(LaunchError::Validation(format!(
                "Invalid ulimit '{}': expected name:soft:hard",
                spec
            )));
        };

        let name: LimitName = name.parse()?;
        let parse_value = |value: &str, which: &str| {
            value.trim().parse::<i64>().map_err(|_| {
                LaunchError::Validation(format!(
                    "Invalid ulimit '{}': {} value '{}' is not an integer",
                    spec, which, value
                ))
            })
        };

        Self::new(name, parse_value(*soft, "soft")?, parse_value(*hard, "hard")?)
    }
}

impl fmt::Display for ResourceLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.name, self.soft, self.hard)
    }
}

/// Resolves the ulimit set for a launch.
#[derive(Clone)]
pub struct LimitResolver {
    host: Arc<dyn HostSystem>,
}

impl LimitResolver {
    pub fn new(host: Arc<dyn HostSystem>) -> Self {
        Self { host }
    }

    /// Resolve `name:soft:hard` overrides, or the host's limits when there are none.
    ///
    /// A repeated name replaces the earlier entry in place.
    ///
    /// # Errors
    ///
    /// Returns [`LaunchError::Validation`] for a malformed override and
    /// [`LaunchError::ResourceQuery`] when a host limit cannot be read.
    pub fn resolve<S: AsRef<str>>(&self, overrides: &[S]) -> Result<Vec<ResourceLimit>> {
        if overrides.is_empty() {
            return self.host_defaults();
        }

        let mut limits: Vec<ResourceLimit> = Vec::with_capacity(overrides.len());
        for spec in overrides {
            let limit = ResourceLimit::parse_override(spec.as_ref())?;
            match limits.iter_mut().find(|l| l.name == limit.name) {
                Some(existing) => {
                    debug!("ulimit {} overridden again, replacing", limit.name);
                    *existing = limit;
                }
                None => limits.push(limit),
            }
        }

        let uncovered: Vec<&str> = LimitName::ALL
            .iter()
            .filter(|name| !limits.iter().any(|l| l.name == **name))
            .map(LimitName::as_str)
            .collect();
        if !uncovered.is_empty() {
            warn!(
                "ulimit overrides do not cover [{}]; host defaults are not applied for them",
                uncovered.join(", ")
            );
        }

        Ok(limits)
    }

    fn host_defaults(&self) -> Result<Vec<ResourceLimit>> {
        LimitName::ALL
            .iter()
            .map(|&name| {
                let (soft, hard) = self
                    .host
                    .resource_limit(name)
                    .map_err(|source| LaunchError::ResourceQuery { limit: name, source })?;
                debug!("Host ulimit {}: soft={} hard={}", name, soft, hard);
                Ok(ResourceLimit { name, soft, hard })
            })
            .collect()
    }
}
