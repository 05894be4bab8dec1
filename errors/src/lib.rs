//! # Configuration Registry Errors
//!
//! Error handling for the configuration registry.
//!
//! One enum per failure surface, one variant per failure kind, so callers
//! pattern-match on outcomes instead of instance-checking exception types:
//! - `ConfigSetValidationError` - invalid input, never retried
//! - `BootstrapError` / `ChangeValuesError` - per-operation results
//! - `RepositoryError` - storage failures, distinct from policy rejections

use thiserror::Error;

/// Reasons a submitted configuration set fails validation.
///
/// The first failing rule wins; validation does not aggregate errors.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigSetValidationError {
    #[error("environment name must be a non-empty string")]
    MissingEnvironmentName,

    #[error("bounded context name must be a non-empty string")]
    MissingBoundedContextName,

    #[error("schema version is not a strict semver string: {version}")]
    InvalidSchemaVersion { version: String },

    #[error("duplicate item name: {name}")]
    DuplicateItemName { name: String },

    #[error("item name must be a non-empty string")]
    EmptyItemName,

    #[error("parameter {name} of type {param_type} requires a json schema")]
    MissingJsonSchema { name: String, param_type: String },

    #[error("invalid json schema on parameter {name}: {reason}")]
    InvalidJsonSchema { name: String, reason: String },

    #[error("invalid default value on parameter {name}: {reason}")]
    InvalidDefaultValue { name: String, reason: String },
}

/// Outcome of a bootstrap (new schema version) command.
#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("invalid configuration set: {0}")]
    InvalidConfigSet(#[from] ConfigSetValidationError),

    #[error("cannot create duplicate configuration set: schema version {version} already exists")]
    DuplicateVersion { version: String },

    #[error(
        "cannot override previous version: schema version {version} is older than latest {latest}"
    )]
    VersionRegression { version: String, latest: String },

    #[error("could not store configuration set")]
    Storage(#[from] RepositoryError),
}

/// Outcome of a change-values command.
#[derive(Debug, Error)]
pub enum ChangeValuesError {
    #[error("configuration set not found")]
    NotFound,

    #[error(
        "only the latest schema version can be changed: expected {expected}, latest is {latest}"
    )]
    StaleSchemaVersion { expected: String, latest: String },

    #[error("only the latest iteration can be changed: expected {expected}, latest is {latest}")]
    StaleIteration { expected: u32, latest: u32 },

    #[error("{item_type} not found: {name}")]
    ItemNotFound { item_type: String, name: String },

    #[error("could not store configuration set")]
    Storage(#[from] RepositoryError),
}

/// Storage-facing failures, kept distinct from policy rejections so callers
/// can tell "rejected by the registry" from "the registry failed to persist".
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(
        "iteration conflict: row ({schema_version}, {iteration_number}) already exists for {family}"
    )]
    IterationConflict {
        family: String,
        schema_version: String,
        iteration_number: u32,
    },

    #[error("storage unavailable: {reason}")]
    Unavailable { reason: String },
}

/// Change-notification delivery failure.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notification channel closed")]
    ChannelClosed,

    #[error("notification failed: {reason}")]
    Failed { reason: String },
}

/// Audit emission failure.
#[derive(Debug, Error)]
pub enum AuditError {
    #[error("audit sink unavailable: {reason}")]
    Unavailable { reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_display() {
        let err = ConfigSetValidationError::InvalidSchemaVersion {
            version: "v1.0.1".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "schema version is not a strict semver string: v1.0.1"
        );
    }

    #[test]
    fn test_bootstrap_error_wraps_validation() {
        let err = BootstrapError::from(ConfigSetValidationError::MissingEnvironmentName);
        assert!(matches!(err, BootstrapError::InvalidConfigSet(_)));
        assert!(err.to_string().starts_with("invalid configuration set"));
    }

    #[test]
    fn test_stale_iteration_display() {
        let err = ChangeValuesError::StaleIteration {
            expected: 0,
            latest: 1,
        };
        assert_eq!(
            err.to_string(),
            "only the latest iteration can be changed: expected 0, latest is 1"
        );
    }
}
