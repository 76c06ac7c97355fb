//! # ArraySense-Core
//!
//! Core types and utilities shared by the ArraySense distributed-antenna
//! CSI fusion system.

pub mod error;
pub mod registry;
pub mod types;

pub use error::{Error, Result};
pub use registry::*;
pub use types::*;
