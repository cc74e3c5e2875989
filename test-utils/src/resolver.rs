//! Package lookup backed by a fixed table.

use std::collections::HashMap;
use std::path::PathBuf;

use svclite::pkg::{PackageRecord, PackageResolver};

/// Injected package-lookup collaborator for tests.
#[derive(Default)]
pub struct StaticResolver {
    packages: HashMap<(String, u32), PackageRecord>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a package for a user. Chainable.
    pub fn with(mut self, package: &str, user_id: u32, uid: u32, source_dir: &str) -> Self {
        self.packages.insert(
            (package.to_string(), user_id),
            PackageRecord {
                package_name: package.to_string(),
                uid,
                source_dir: PathBuf::from(source_dir),
            },
        );
        self
    }
}

impl PackageResolver for StaticResolver {
    fn package_info(&self, package: &str, _flags: u32, user_id: u32) -> Option<PackageRecord> {
        self.packages.get(&(package.to_string(), user_id)).cloned()
    }
}
