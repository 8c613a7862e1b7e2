//! Docker Engine backend for yoshi.
//!
//! This crate connects to the engine with bollard and exposes container
//! listing, version queries and hijacked attach streams through the
//! [`yoshi_core::ContainerBackend`] capability.

mod attach;
mod client;

pub use client::DockerBackend;
