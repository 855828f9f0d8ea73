//! Driver configuration.
//!
//! Built once by the daemon from its command line and environment and handed
//! to the driver constructor. Nothing in the driver reads the environment.

use std::path::{Path, PathBuf};

use crate::readiness::ReadinessConfig;

/// Where the Quobyte namespace is mounted by default.
pub const DEFAULT_MOUNT_ROOT: &str = "/run/docker/quobyte/mnt";
/// Default backend configuration template for new volumes.
pub const DEFAULT_CONFIGURATION_NAME: &str = "BASE";

/// Static settings of a [`QuobyteDriver`](crate::backend::quobyte::QuobyteDriver).
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Directory the Quobyte namespace is mounted on.
    pub mount_root: PathBuf,
    /// Owner of new volume roots unless the request sets `user`.
    pub default_user: String,
    /// Group of new volume roots unless the request sets `group`.
    pub default_group: String,
    /// Configuration template unless the request sets `configuration_name`.
    pub default_configuration_name: String,
    /// Tenant for creates without `tenant_id`, and for every remove.
    pub default_tenant_id: String,
    pub readiness: ReadinessConfig,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            mount_root: PathBuf::from(DEFAULT_MOUNT_ROOT),
            default_user: "root".to_owned(),
            default_group: "root".to_owned(),
            default_configuration_name: DEFAULT_CONFIGURATION_NAME.to_owned(),
            default_tenant_id: String::new(),
            readiness: ReadinessConfig::default(),
        }
    }
}

impl DriverConfig {
    pub fn new(mount_root: impl Into<PathBuf>) -> Self {
        Self {
            mount_root: mount_root.into(),
            ..Default::default()
        }
    }

    /// `<mount root>/<volume>`.
    pub fn mount_point(&self, volume: &str) -> PathBuf {
        self.mount_root.join(volume)
    }

    pub fn mount_root(&self) -> &Path {
        &self.mount_root
    }
}
