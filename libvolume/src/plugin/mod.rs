//! Docker volume plugin transport.
//!
//! This module provides the wire [`protocol`] messages and the Unix-socket
//! HTTP [`server`] that hands them to a [`VolumeDriver`](crate::driver::VolumeDriver).

pub mod protocol;
pub mod server;

pub use server::{bind_socket, router, serve};
