//! # Configuration Set Registry
//!
//! Domain logic for the configuration registry:
//! - Validation rules applied before a set is accepted
//! - Value inheritance when a new schema version is published
//! - The [`ConfigSetAggregate`] orchestrating bootstrap and value changes
//!   under optimistic-concurrency rules

pub mod aggregate;
pub mod inheritance;
pub mod validation;

pub use aggregate::ConfigSetAggregate;
