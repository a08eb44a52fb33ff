//! Host process capability.
//!
//! Resource limits and the invoking user/group are read through
//! [`HostSystem`] so the launch policy can be driven by fixed values in tests.

use crate::launcher::{LimitName, UNLIMITED};
use nix::libc::RLIM_INFINITY;
use nix::sys::resource::{Resource, getrlimit};
use nix::unistd::{getgid, getuid};
use std::io;

/// Read-only view of the launching process's OS state.
pub trait HostSystem: Send + Sync {
    /// Current (soft, hard) values of a resource limit; unlimited is [`UNLIMITED`].
    fn resource_limit(&self, name: LimitName) -> io::Result<(i64, i64)>;

    /// Real user id of the launching process.
    fn user_id(&self) -> u32;

    /// Real group id of the launching process.
    fn group_id(&self) -> u32;
}

/// [`HostSystem`] backed by `getrlimit(2)`, `getuid(2)` and `getgid(2)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NixHost;

impl NixHost {
    pub fn new() -> Self {
        Self
    }

    fn resource(name: LimitName) -> Resource {
        match name {
            LimitName::Core => Resource::RLIMIT_CORE,
            LimitName::Data => Resource::RLIMIT_DATA,
            LimitName::Fsize => Resource::RLIMIT_FSIZE,
            LimitName::Nproc => Resource::RLIMIT_NPROC,
            LimitName::Nofile => Resource::RLIMIT_NOFILE,
            LimitName::Rss => Resource::RLIMIT_RSS,
            LimitName::Stack => Resource::RLIMIT_STACK,
        }
    }
}

/// Map a raw `rlim_t` onto the signed representation used by the engine API.
fn to_engine_value(raw: nix::libc::rlim_t) -> i64 {
    if raw == RLIM_INFINITY {
        UNLIMITED
    } else {
        i64::try_from(raw).unwrap_or(i64::MAX)
    }
}

impl HostSystem for NixHost {
    fn resource_limit(&self, name: LimitName) -> io::Result<(i64, i64)> {
        let (soft, hard) = getrlimit(Self::resource(name))?;
        Ok((to_engine_value(soft), to_engine_value(hard)))
    }

    fn user_id(&self) -> u32 {
        getuid().as_raw()
    }

    fn group_id(&self) -> u32 {
        getgid().as_raw()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infinity_maps_to_unlimited() {
        assert_eq!(to_engine_value(RLIM_INFINITY), UNLIMITED);
        assert_eq!(to_engine_value(1024), 1024);
    }

    #[test]
    fn test_reads_every_limit() {
        let host = NixHost::new();
        for name in LimitName::ALL {
            let (soft, hard) = host.resource_limit(name).unwrap();
            if soft != UNLIMITED && hard != UNLIMITED {
                assert!(soft <= hard, "{}: {} > {}", name, soft, hard);
            }
        }
    }

    #[test]
    fn test_ids_match_process() {
        let host = NixHost::new();
        assert_eq!(host.user_id(), getuid().as_raw());
        assert_eq!(host.group_id(), getgid().as_raw());
    }
}
