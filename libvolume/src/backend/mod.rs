//! Storage backend implementations.
//!
//! Each backend module provides a concrete type that implements
//! [`VolumeDriver`](crate::driver::VolumeDriver).

pub mod quobyte;
