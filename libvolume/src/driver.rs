//! Volume driver trait.
//!
//! These are the operations the container host invokes through the plugin
//! socket. Every method maps one-to-one onto a `/VolumeDriver.*` endpoint.

use std::path::PathBuf;

use async_trait::async_trait;

use crate::error::VolumeError;
use crate::types::{Capabilities, CreateOptions, Volume};

/// Lifecycle operations of a volume plugin.
///
/// `name` is always the identifier sent by the container host; it may carry
/// a subdirectory suffix (`volume/sub/dir`).
#[async_trait]
pub trait VolumeDriver: Send + Sync {
    /// Make sure the volume exists and its mount point is usable.
    async fn create(&self, name: &str, options: &CreateOptions) -> Result<(), VolumeError>;

    /// Delete the volume from the backend.
    async fn remove(&self, name: &str) -> Result<(), VolumeError>;

    /// Return the host path the container should bind.
    async fn mount(&self, name: &str) -> Result<PathBuf, VolumeError>;

    /// Release a container's use of the volume.
    async fn unmount(&self, name: &str) -> Result<(), VolumeError>;

    /// Host path of the volume. Never touches the backend.
    fn path(&self, name: &str) -> Result<PathBuf, VolumeError>;

    /// Report a volume if its mount point is present.
    async fn get(&self, name: &str) -> Result<Volume, VolumeError>;

    /// Report every volume visible under the mount root.
    async fn list(&self) -> Result<Vec<Volume>, VolumeError>;

    fn capabilities(&self) -> Capabilities;
}
