//! storcli Gateway
//!
//! A REST gateway in front of the LSI/Avago `storcli` RAID management
//! tool. Every request runs one or more storcli invocations, decodes the
//! JSON they print and returns a normalized inventory of controllers,
//! physical drives and virtual drives.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                  REST API (axum, /v0.5)                  │
//! ├──────────────────────────────────────────────────────────┤
//! │                  Inventory Aggregator                    │
//! │  ┌──────────────┐ ┌──────────────┐ ┌──────────────────┐  │
//! │  │   Command    │ │   Response   │ │  Entity Parsers  │  │
//! │  │   Builder    │ │   Decoder    │ │  Cross-Referencer│  │
//! │  └──────┬───────┘ └──────▲───────┘ └──────────────────┘  │
//! ├─────────┼────────────────┼───────────────────────────────┤
//! │         ▼  CommandRunner port                            │
//! │              storcli child process                       │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`api`]: REST routes, response envelope and server
//! - [`storcli`]: command building, decoding, parsing and aggregation
//! - [`domain`]: inventory model and the runner port
//! - [`config`]: gateway configuration
//! - [`metrics`]: prometheus metrics
//! - [`error`]: error types and handling

pub mod api;
pub mod config;
pub mod domain;
pub mod error;
pub mod metrics;
pub mod storcli;

pub use api::{ApiServer, ApiServerConfig, RestRouter};
pub use config::GatewayConfig;
pub use domain::{CommandOutput, CommandRunner, CommandRunnerRef};
pub use error::{Error, ErrorKind, Result};
pub use storcli::{DecodeMode, Inventory, InventoryRef, StorcliRunner};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
