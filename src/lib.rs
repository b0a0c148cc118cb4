//! Domicile library.
//!
//! Keeps a PostgreSQL picture of a zigbee2mqtt network in sync with the
//! bridge, records sensor reports per area and serves a small HTTP surface
//! for reading them and switching groups.

pub mod api;
pub mod bus;
pub mod command;
pub mod config;
pub mod controller;
pub mod error;
pub mod model;
pub mod reconcile;
pub mod router;
pub mod store;
pub mod telemetry;

pub use config::Config;
pub use error::{DomicileError, Result};
