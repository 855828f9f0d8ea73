//! Volume driver error types.
//!
//! Every lifecycle operation returns [`VolumeError`]. The plugin transport
//! turns it into the `Err` string of the wire response, so the `Display`
//! output of each variant is part of the contract with the container host:
//! backend and filesystem messages are passed through verbatim.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::api::ApiError;

/// Unified error type for volume lifecycle operations.
#[derive(Debug, Error)]
pub enum VolumeError {
    /// The mount point of the volume is missing or is not a directory.
    #[error("{} not mounted", .0.display())]
    NotMounted(PathBuf),

    /// The mount point did not become a usable directory within the
    /// readiness budget. Displays the last observed filesystem error.
    #[error("{source}")]
    Timeout {
        /// Mount point that was being checked.
        path: PathBuf,
        /// Last filesystem error seen while polling.
        #[source]
        source: io::Error,
    },

    /// The remote volume API rejected the request.
    #[error(transparent)]
    Backend(#[from] ApiError),

    /// A local filesystem operation failed.
    #[error("{source}")]
    Io {
        /// Path the operation was applied to.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },

    /// The request was malformed or named an unusable volume.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl VolumeError {
    /// Create a [`VolumeError::Io`] for `path`.
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_mounted_display() {
        let err = VolumeError::NotMounted(PathBuf::from("/run/docker/quobyte/mnt/vol"));
        assert_eq!(err.to_string(), "/run/docker/quobyte/mnt/vol not mounted");
    }

    #[test]
    fn timeout_displays_last_fs_error() {
        let err = VolumeError::Timeout {
            path: PathBuf::from("/mnt/q/vol"),
            source: io::Error::new(io::ErrorKind::NotFound, "no such file or directory"),
        };
        assert_eq!(err.to_string(), "no such file or directory");
    }

    #[test]
    fn backend_error_is_verbatim() {
        let err = VolumeError::from(ApiError::Rpc {
            code: -32000,
            message: "PERMISSION_DENIED".into(),
        });
        assert_eq!(err.to_string(), "ERROR Code: -32000, Message: PERMISSION_DENIED");
    }
}
