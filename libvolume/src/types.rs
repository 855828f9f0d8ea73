//! Core driver types: resolved names, volumes, and capabilities.
//!
//! These types are shared by the driver, the plugin wire protocol, and the
//! tests. The ones that cross the plugin socket derive
//! [`Serialize`]/[`Deserialize`] with the PascalCase field names the container
//! host expects.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Create options
// ---------------------------------------------------------------------------

/// Per-request options passed with `Create` (`docker volume create -o k=v`).
pub type CreateOptions = HashMap<String, String>;

/// Option key overriding the owning POSIX user of the volume root.
pub const OPT_USER: &str = "user";
/// Option key overriding the owning POSIX group of the volume root.
pub const OPT_GROUP: &str = "group";
/// Option key overriding the backend configuration template.
pub const OPT_CONFIGURATION_NAME: &str = "configuration_name";
/// Option key overriding the tenant the volume is created in.
pub const OPT_TENANT_ID: &str = "tenant_id";

// ---------------------------------------------------------------------------
// Resolved request names
// ---------------------------------------------------------------------------

/// A request identifier split into the backend volume and an optional
/// subdirectory inside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedName {
    /// Backend volume name.
    pub volume: String,
    /// Cleaned relative path below the volume's mount point.
    pub subdir: Option<PathBuf>,
}

impl fmt::Display for ResolvedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.subdir {
            Some(subdir) => write!(f, "{}/{}", self.volume, subdir.display()),
            None => f.write_str(&self.volume),
        }
    }
}

// ---------------------------------------------------------------------------
// Volumes & capabilities
// ---------------------------------------------------------------------------

/// A volume as reported by `Get` and `List`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Volume {
    /// Name as known to the container host.
    pub name: String,
    /// Absolute path of the volume on this host.
    pub mountpoint: PathBuf,
}

/// Visibility of the volumes served by a driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// Every host sees the same volume namespace.
    Global,
    /// Volumes exist only on the host that created them.
    Local,
}

/// Static capabilities advertised to the container host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Capabilities {
    pub scope: Scope,
}
