//! Tellus bridge crate.
//!
//! This crate owns the supervisory layer that brings an opaque native
//! geospatial engine online inside a host application: loading the engine
//! module, resolving its data directories, and keeping it in sync with the
//! host's lifecycle and surface events.
//!
//! The engine itself (scene graph, terrain streaming, GPU pipeline) is not
//! modeled here; it is reached only through the narrow
//! [`engine::NativeEngine`] contract.

pub mod adapter;
pub mod bridge;
pub mod engine;
pub mod loader;
pub mod paths;
pub mod surface;

pub mod logging;
