//! Domain layer - inventory model and port definitions
//!
//! This module defines the normalized inventory types and the trait
//! (port) through which the external RAID tool is reached.

pub mod model;
pub mod ports;

pub use model::*;
pub use ports::*;
