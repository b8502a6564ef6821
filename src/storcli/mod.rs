//! storcli integration
//!
//! Everything between a raw storcli invocation and the normalized
//! inventory: command building, decoding, parsing, cross-referencing
//! and the aggregated operations.

pub mod commands;
pub mod decoder;
pub mod entities;
pub mod health;
pub mod inventory;
pub mod parsers;
pub mod runner;
pub mod xref;

pub use commands::{
    ControllerSelector, CreateVirtualDrive, HotspareRequest, Overprovision, StorcliCommand,
    UpdateVirtualDrive, VirtualDriveSelector,
};
pub use decoder::{ControllerPayloads, DecodeMode};
pub use inventory::{Inventory, InventoryRef};
pub use runner::StorcliRunner;
