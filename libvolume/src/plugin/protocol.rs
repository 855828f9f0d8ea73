//! Docker volume plugin protocol messages.
//!
//! The container host `POST`s a JSON body to `/<Interface>.<Method>` and
//! expects a JSON reply with PascalCase keys. Failures are reported in the
//! `Err` field; an empty `Err` means success.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::types::{Capabilities, Volume};

/// Media type of every request and response body.
pub const PLUGIN_CONTENT_TYPE: &str = "application/vnd.docker.plugins.v1+json";

/// Interface advertised by `/Plugin.Activate`.
pub const VOLUME_DRIVER_INTERFACE: &str = "VolumeDriver";

// ----- Requests ------------------------------------------------------------

/// Body of `Create`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateRequest {
    pub name: String,
    /// `null` and a missing key both mean "no options".
    #[serde(default)]
    pub opts: Option<HashMap<String, String>>,
}

/// Body of `Remove`, `Path` and `Get`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NameRequest {
    pub name: String,
}

/// Body of `Mount` and `Unmount`. `ID` identifies the calling container.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MountRequest {
    pub name: String,
    #[serde(default, rename = "ID")]
    pub id: String,
}

// ----- Responses -----------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ActivateResponse {
    pub implements: Vec<&'static str>,
}

impl Default for ActivateResponse {
    fn default() -> Self {
        Self {
            implements: vec![VOLUME_DRIVER_INTERFACE],
        }
    }
}

/// Reply carrying only the error field (`Create`, `Remove`, `Unmount`, and
/// every failure).
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ErrResponse {
    pub err: String,
}

/// Reply of `Mount` and `Path`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct MountpointResponse {
    pub mountpoint: PathBuf,
    pub err: String,
}

/// Reply of `Get`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct GetResponse {
    pub volume: Volume,
    pub err: String,
}

/// Reply of `List`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ListResponse {
    pub volumes: Vec<Volume>,
    pub err: String,
}

/// Reply of `Capabilities`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CapabilitiesResponse {
    pub capabilities: Capabilities,
}
