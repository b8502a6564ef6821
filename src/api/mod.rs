//! API Module
//!
//! REST surface of the gateway: JSON envelope, routes and the server.

pub mod envelope;
pub mod rest;
pub mod server;

pub use envelope::{ApiReply, Envelope, GENERIC_ERROR_CODE};
pub use rest::{RestRouter, API_PREFIX};
pub use server::{ApiServer, ApiServerConfig};
