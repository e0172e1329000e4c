//! transched-core: Core types for the transched transfer scheduler
//!
//! This crate provides the fundamental types used throughout transched:
//! - Capacity-bounded devices
//! - The transfer multigraph and its persisted form
//! - Configuration types
//! - Error handling
//! - Input topology generation

pub mod config;
pub mod device;
pub mod error;
pub mod graph;
pub mod persist;
pub mod topology;

pub use config::*;
pub use device::*;
pub use error::*;
pub use graph::*;
pub use persist::*;
