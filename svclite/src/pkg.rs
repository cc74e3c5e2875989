//! Package identity lookup and uid decomposition.
//!
//! The host's permission/package facility is an external collaborator; the
//! broker only consumes it through [`PackageResolver`].

use std::path::PathBuf;

/// Uids per user: uid = user_id * PER_USER_RANGE + app_id.
pub const PER_USER_RANGE: u32 = 100_000;

/// Lookup flag: also match packages whose data is still present but which
/// are currently uninstalled for the user.
pub const MATCH_UNINSTALLED_PACKAGES: u32 = 0x0000_2000;

/// App id portion of a uid (identical for one app across users).
pub const fn app_id(uid: u32) -> u32 {
    uid % PER_USER_RANGE
}

/// User id portion of a uid.
pub const fn user_id(uid: u32) -> u32 {
    uid / PER_USER_RANGE
}

/// Resolved package identity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PackageRecord {
    pub package_name: String,
    /// Uid the package runs as for the queried user.
    pub uid: u32,
    /// Install location, embedded into the service launch command.
    pub source_dir: PathBuf,
}

/// Host package lookup facility.
pub trait PackageResolver: Send + Sync {
    /// Resolve a package for a user; `None` when it does not resolve there.
    fn package_info(&self, package: &str, flags: u32, user_id: u32) -> Option<PackageRecord>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_uid_decomposition() {
        assert_eq!(app_id(1010123), 10123);
        assert_eq!(user_id(1010123), 10);
        assert_eq!(app_id(2000), 2000);
        assert_eq!(user_id(2000), 0);
    }

    proptest! {
        #[test]
        fn test_uid_recomposes(uid in 0u32..4_000_000) {
            prop_assert_eq!(user_id(uid) * PER_USER_RANGE + app_id(uid), uid);
            prop_assert!(app_id(uid) < PER_USER_RANGE);
        }
    }
}
