//! Core traits for the configuration registry

use crate::types::{AuditRecord, ConfigChangeEvent, ConfigurationSet, FamilyKey};
use async_trait::async_trait;
use errors::{AuditError, NotifyError, RepositoryError};

/// Storage contract the aggregate depends on.
///
/// Backends must resolve latest/version lookups with exactly the
/// [`crate::version`] ordering and must return owned copies so callers
/// cannot mutate stored state through aliasing. `store` is conditional on
/// the absence of a pre-existing `(schemaVersion, iterationNumber)` row for
/// the family (compare-and-append) and serializes writes per instance.
#[async_trait]
pub trait ConfigSetRepository: Send + Sync {
    async fn init(&self) -> Result<(), RepositoryError>;

    /// Append one immutable row. Fails with
    /// [`RepositoryError::IterationConflict`] when the family already holds
    /// a row for the same `(schemaVersion, iterationNumber)` pair.
    async fn store(&self, set: ConfigurationSet) -> Result<(), RepositoryError>;

    /// Every stored row of one family, oldest first.
    async fn fetch_all(&self, family: &FamilyKey) -> Result<Vec<ConfigurationSet>, RepositoryError>;

    /// Newest iteration of the highest schema version, or None for an
    /// absent family.
    async fn fetch_latest(
        &self,
        family: &FamilyKey,
    ) -> Result<Option<ConfigurationSet>, RepositoryError>;

    /// Newest iteration recorded under `schema_version`, or None.
    async fn fetch_version(
        &self,
        family: &FamilyKey,
        schema_version: &str,
    ) -> Result<Option<ConfigurationSet>, RepositoryError>;

    /// Every stored row across all families of one environment.
    async fn fetch_environment(
        &self,
        environment_name: &str,
    ) -> Result<Vec<ConfigurationSet>, RepositoryError>;
}

/// Change-notification transport. The registry publishes exactly one event
/// per successful bootstrap or change-values call; delivery fan-out belongs
/// to the implementation.
#[async_trait]
pub trait ConfigChangeNotifier: Send + Sync {
    async fn notify(&self, event: ConfigChangeEvent) -> Result<(), NotifyError>;
}

/// Audit sink. One record per successful mutation.
#[async_trait]
pub trait AuditEmitter: Send + Sync {
    async fn emit(&self, record: AuditRecord) -> Result<(), AuditError>;
}
