//! Remote volume management API.
//!
//! The driver talks to the backend only through the [`VolumeApi`] trait, so
//! tests can substitute an in-process fake. [`QuobyteClient`] is the
//! production implementation (JSON-RPC over HTTP).

mod quobyte;

pub use quobyte::{QuobyteClient, validate_api_url};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Retry policy tag sent with interactive requests: the API server gives up
/// quickly instead of queueing the request.
pub const RETRY_INTERACTIVE: &str = "INTERACTIVE";

/// Status reported by the API when a volume with the requested name exists.
pub const ENTITY_EXISTS_ALREADY: &str = "ENTITY_EXISTS_ALREADY";

/// Full status string observed from API servers for duplicate creation.
/// Only used by the substring fallback in [`ApiError::is_entity_exists`].
const ENTITY_EXISTS_ALREADY_LEGACY: &str = "ENTITY_EXISTS_ALREADY/POSIX_ERROR_NONE";

/// Parameters of a `createVolume` call. Empty fields are left out of the
/// request so the API server applies its own defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateVolumeRequest {
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub root_user_id: String,
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub root_group_id: String,
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub configuration_name: String,
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub tenant_id: String,
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub retry: String,
}

/// Errors returned by the remote API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The API server answered with a JSON-RPC error object.
    #[error("ERROR Code: {code}, Message: {message}")]
    Rpc { code: i64, message: String },

    /// The request did not complete at the HTTP level.
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// The API server answered with something that is not a JSON-RPC reply.
    #[error("malformed API response: {0}")]
    Decode(String),

    /// The configured API endpoint is unusable.
    #[error("invalid API URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
}

impl ApiError {
    /// Machine-readable status of an RPC error: the leading
    /// `UPPER_SNAKE_CASE` token of the message, e.g. `ENTITY_EXISTS_ALREADY`
    /// for `ENTITY_EXISTS_ALREADY/POSIX_ERROR_NONE`.
    pub fn status(&self) -> Option<&str> {
        let Self::Rpc { message, .. } = self else {
            return None;
        };
        let token = message
            .split(|c: char| c == '/' || c == ':' || c.is_whitespace())
            .next()?;
        let is_status = !token.is_empty()
            && token
                .chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_');
        is_status.then_some(token)
    }

    /// `true` if the API rejected a create because the volume already exists.
    ///
    /// Matches the structured status first. Servers that bury the status
    /// inside a longer message are still recognized by a substring match.
    pub fn is_entity_exists(&self) -> bool {
        match self {
            Self::Rpc { message, .. } => {
                self.status() == Some(ENTITY_EXISTS_ALREADY)
                    || message.contains(ENTITY_EXISTS_ALREADY_LEGACY)
            }
            _ => false,
        }
    }
}

/// Volume management operations needed by the driver.
#[async_trait]
pub trait VolumeApi: Send + Sync {
    /// Create a volume and return its UUID.
    async fn create_volume(&self, req: &CreateVolumeRequest) -> Result<String, ApiError>;

    /// Delete the volume called `name` in `tenant`.
    async fn delete_volume_by_name(&self, name: &str, tenant: &str) -> Result<(), ApiError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rpc(message: &str) -> ApiError {
        ApiError::Rpc {
            code: -32000,
            message: message.into(),
        }
    }

    #[test]
    fn status_is_leading_token() {
        assert_eq!(
            rpc("ENTITY_EXISTS_ALREADY/POSIX_ERROR_NONE").status(),
            Some("ENTITY_EXISTS_ALREADY")
        );
        assert_eq!(rpc("ENTITY_NOT_FOUND: no volume").status(), Some("ENTITY_NOT_FOUND"));
        assert_eq!(rpc("volume missing").status(), None);
    }

    #[test]
    fn entity_exists_detection() {
        assert!(rpc("ENTITY_EXISTS_ALREADY/POSIX_ERROR_NONE").is_entity_exists());
        assert!(rpc("ENTITY_EXISTS_ALREADY").is_entity_exists());
        assert!(
            rpc("createVolume failed: ENTITY_EXISTS_ALREADY/POSIX_ERROR_NONE").is_entity_exists()
        );
        assert!(!rpc("PERMISSION_DENIED/POSIX_ERROR_EACCES").is_entity_exists());
        assert!(!ApiError::Decode("ENTITY_EXISTS_ALREADY".into()).is_entity_exists());
    }

    #[test]
    fn create_request_omits_empty_fields() {
        let req = CreateVolumeRequest {
            name: "vol".into(),
            root_user_id: "root".into(),
            retry: RETRY_INTERACTIVE.into(),
            ..Default::default()
        };
        let json = serde_json::to_value(&req).expect("serialize");
        assert_eq!(
            json,
            serde_json::json!({
                "name": "vol",
                "root_user_id": "root",
                "retry": "INTERACTIVE",
            })
        );
    }
}
