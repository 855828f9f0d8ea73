//! # libvolume: Quobyte volumes for container hosts
//!
//! `libvolume` implements a Docker volume plugin backed by the Quobyte
//! distributed filesystem. Volumes are created and deleted through the
//! Quobyte management API and reached locally through a single host-wide
//! mount of the Quobyte namespace.
//!
//! ## Module overview
//!
//! | Module | Purpose |
//! |---|---|
//! | [`types`] | Core data model: `Volume`, `ResolvedName`, capabilities, create options. |
//! | [`error`] | [`VolumeError`] enum covering all failure modes. |
//! | [`config`] | [`DriverConfig`], the immutable driver settings. |
//! | [`resolver`] | Splits request names into volume and subdirectory. |
//! | [`readiness`] | Bounded wait for a mount point to appear. |
//! | [`driver`] | [`VolumeDriver`] trait: create, remove, mount, get, list. |
//! | [`api`] | [`VolumeApi`] trait and the Quobyte JSON-RPC client. |
//! | [`backend`] | Driver implementations (Quobyte). |
//! | [`mount`] | Host-wide namespace mount helpers. |
//! | [`plugin`] | Plugin protocol and Unix-socket HTTP server. |

pub mod api;
pub mod backend;
pub mod config;
pub mod driver;
pub mod error;
pub mod mount;
pub mod plugin;
pub mod readiness;
pub mod resolver;
pub mod types;

// Re-export the most commonly used items at crate root for convenience.
pub use api::{ApiError, QuobyteClient, VolumeApi};
pub use backend::quobyte::QuobyteDriver;
pub use config::DriverConfig;
pub use driver::VolumeDriver;
pub use error::VolumeError;
pub use readiness::{ReadinessConfig, ReadinessPolicy};
pub use types::*;
