//! # Storage Layer
//!
//! Repository backends for the configuration registry (in-memory,
//! file-backed JSON) plus in-process change-notifier and audit-emitter
//! implementations.

pub mod audit;
pub mod events;
pub mod file;
mod index;
pub mod memory;
