//! Quobyte volume driver.
//!
//! [`QuobyteDriver`] implements [`VolumeDriver`] on top of a [`VolumeApi`]
//! client and the host-wide Quobyte namespace mount.
//!
//! # Layout
//!
//! ```text
//! <mount_root>/                # Quobyte namespace, mounted once per host
//!   <volume>/                  # surfaced by the Quobyte client once the
//!     <subdir>/                #   backend knows the volume
//! ```
//!
//! The driver keeps no per-volume state. Each call looks at the backend or at
//! the mount root to find out where a volume stands.
//!
//! # Locking
//!
//! Create, Remove, Mount, Get and List run under one lifecycle lock, so their
//! side effects never interleave. Path, Unmount and Capabilities touch no
//! shared state and skip it.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tokio::fs::DirBuilder;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::api::{CreateVolumeRequest, RETRY_INTERACTIVE, VolumeApi};
use crate::config::DriverConfig;
use crate::driver::VolumeDriver;
use crate::error::VolumeError;
use crate::readiness::ReadinessChecker;
use crate::resolver::resolve;
use crate::types::*;

/// Volume driver backed by a Quobyte cluster.
pub struct QuobyteDriver<A> {
    api: A,
    config: DriverConfig,
    readiness: ReadinessChecker,
    /// Lifecycle lock; guards no data, only serializes critical sections.
    lock: Mutex<()>,
}

impl<A: VolumeApi> QuobyteDriver<A> {
    pub fn new(api: A, config: DriverConfig) -> Self {
        let readiness = ReadinessChecker::new(config.readiness.clone());
        Self {
            api,
            config,
            readiness,
            lock: Mutex::new(()),
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    pub fn readiness(&self) -> &ReadinessChecker {
        &self.readiness
    }

    /// Resolve `name` and place its volume under the mount root. The volume
    /// must be exactly one plain path component.
    fn locate(&self, name: &str) -> Result<(ResolvedName, PathBuf), VolumeError> {
        let resolved = resolve(name);
        let mut components = Path::new(&resolved.volume).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => {}
            _ => {
                return Err(VolumeError::InvalidArgument(format!(
                    "invalid volume name {:?}",
                    resolved.volume
                )));
            }
        }
        let mount_point = self.config.mount_point(&resolved.volume);
        Ok((resolved, mount_point))
    }

    /// Build the backend request for `volume`, applying per-request overrides.
    fn create_request(&self, volume: &str, options: &CreateOptions) -> CreateVolumeRequest {
        let pick = |key: &str, default: &str| {
            options
                .get(key)
                .cloned()
                .unwrap_or_else(|| default.to_owned())
        };
        CreateVolumeRequest {
            name: volume.to_owned(),
            root_user_id: pick(OPT_USER, &self.config.default_user),
            root_group_id: pick(OPT_GROUP, &self.config.default_group),
            configuration_name: pick(
                OPT_CONFIGURATION_NAME,
                &self.config.default_configuration_name,
            ),
            tenant_id: pick(OPT_TENANT_ID, &self.config.default_tenant_id),
            retry: RETRY_INTERACTIVE.to_owned(),
        }
    }
}

/// Create `subdir` below `mount_point`. Failures are logged, never returned:
/// the volume itself is already usable.
async fn create_subdir(mount_point: &Path, subdir: &Path) {
    if subdir
        .components()
        .any(|c| !matches!(c, Component::Normal(_)))
    {
        warn!(subdir = %subdir.display(), "subdirectory escapes the volume, not creating it");
        return;
    }

    let target = mount_point.join(subdir);
    let mut builder = DirBuilder::new();
    builder.recursive(true).mode(0o755);
    match builder.create(&target).await {
        Ok(()) => info!(path = %target.display(), "subdirectory created"),
        Err(e) => {
            warn!(path = %target.display(), error = %e, "unable to create subdirectory in volume")
        }
    }
}

// ---------------------------------------------------------------------------
// VolumeDriver
// ---------------------------------------------------------------------------

#[async_trait]
impl<A: VolumeApi> VolumeDriver for QuobyteDriver<A> {
    #[instrument(skip(self, options))]
    async fn create(&self, name: &str, options: &CreateOptions) -> Result<(), VolumeError> {
        let _guard = self.lock.lock().await;

        let (resolved, mount_point) = self.locate(name)?;
        match &resolved.subdir {
            Some(subdir) => info!(
                volume = %resolved.volume,
                subdir = %subdir.display(),
                "creating volume with subdirectory"
            ),
            None => info!(volume = %resolved.volume, "creating volume"),
        }

        let req = self.create_request(&resolved.volume, options);
        match self.api.create_volume(&req).await {
            Ok(uuid) => debug!(%uuid, "backend created volume"),
            Err(e) if e.is_entity_exists() => {
                info!(volume = %resolved.volume, "volume already exists, reusing it")
            }
            Err(e) => {
                warn!(error = %e, "backend rejected create");
                return Err(e.into());
            }
        }

        info!(mount_point = %mount_point.display(), "validating mount point");
        self.readiness.wait_ready(&mount_point).await?;

        if let Some(subdir) = &resolved.subdir {
            create_subdir(&mount_point, subdir).await;
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn remove(&self, name: &str) -> Result<(), VolumeError> {
        let _guard = self.lock.lock().await;

        let (resolved, _) = self.locate(name)?;
        info!(volume = %resolved.volume, "removing volume");
        self.api
            .delete_volume_by_name(&resolved.volume, &self.config.default_tenant_id)
            .await
            .map_err(|e| {
                warn!(error = %e, "backend rejected remove");
                VolumeError::from(e)
            })
    }

    #[instrument(skip(self))]
    async fn mount(&self, name: &str) -> Result<PathBuf, VolumeError> {
        let _guard = self.lock.lock().await;

        let (resolved, mount_point) = self.locate(name)?;
        info!(volume = %resolved.volume, mount_point = %mount_point.display(), "mounting volume");
        Ok(mount_point)
    }

    async fn unmount(&self, _name: &str) -> Result<(), VolumeError> {
        // The namespace mount outlives every container.
        Ok(())
    }

    fn path(&self, name: &str) -> Result<PathBuf, VolumeError> {
        self.locate(name).map(|(_, mount_point)| mount_point)
    }

    #[instrument(skip(self))]
    async fn get(&self, name: &str) -> Result<Volume, VolumeError> {
        let _guard = self.lock.lock().await;

        let (_, mount_point) = self.locate(name)?;
        match tokio::fs::symlink_metadata(&mount_point).await {
            Ok(meta) if meta.is_dir() => Ok(Volume {
                name: name.to_owned(),
                mountpoint: mount_point,
            }),
            Ok(_) => {
                debug!(mount_point = %mount_point.display(), "mount point is not a directory");
                Err(VolumeError::NotMounted(mount_point))
            }
            Err(e) => {
                debug!(mount_point = %mount_point.display(), error = %e, "mount point missing");
                Err(VolumeError::NotMounted(mount_point))
            }
        }
    }

    #[instrument(skip(self))]
    async fn list(&self) -> Result<Vec<Volume>, VolumeError> {
        let _guard = self.lock.lock().await;

        let root = self.config.mount_root();
        let mut dir = tokio::fs::read_dir(root)
            .await
            .map_err(|e| VolumeError::io(root, e))?;

        let mut volumes = Vec::new();
        while let Some(entry) = dir.next_entry().await.map_err(|e| VolumeError::io(root, e))? {
            match entry.file_type().await {
                Ok(t) if t.is_dir() => {}
                Ok(_) => continue,
                Err(e) => {
                    warn!(
                        path = %entry.path().display(),
                        error = %e,
                        "cannot read entry type, skipping it"
                    );
                    continue;
                }
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            let mountpoint = self.config.mount_point(&name);
            volumes.push(Volume { name, mountpoint });
        }

        debug!(count = volumes.len(), "listed volumes");
        Ok(volumes)
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            scope: Scope::Global,
        }
    }
}
