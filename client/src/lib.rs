//! # Configuration Registry Client
//!
//! Consumer-side conveniences over the registry's output shape:
//! - [`ConfigSetWrapper`] - map-backed view of one configuration set with
//!   case-insensitive lookup, typed value parsing, and environment-variable
//!   overrides
//! - [`AppConfiguration`] - cached facade holding a component's own set and
//!   the global set, refreshed when a change notification says so

pub mod app_config;
pub mod wrapper;

pub use app_config::{AppConfiguration, ConfigFetcher};
pub use wrapper::ConfigSetWrapper;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("duplicate config name detected: {name}")]
    DuplicateName { name: String },

    #[error("unknown config item: {name}")]
    UnknownItem { name: String },

    #[error("could not fetch configuration set for {family}")]
    FetchFailed { family: String },

    #[error("provider error: {reason}")]
    Provider { reason: String },
}
