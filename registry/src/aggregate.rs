//! # Configuration Set Aggregate
//!
//! Orchestrates creation of new schema versions and in-place value changes
//! for configuration set families, enforcing the versioning and concurrency
//! invariants and triggering audit + change notification.
//!
//! The aggregate is stateless between calls; all state lives in the
//! repository. The only concurrency control is the optimistic guard: a
//! change-values caller must prove it observed the current
//! `(schemaVersion, iterationNumber)`, re-checked by the repository's
//! compare-and-append at write time.

use crate::inheritance;
use crate::validation;
use cr_core::traits::{AuditEmitter, ConfigChangeNotifier, ConfigSetRepository};
use cr_core::types::{
    AuditAction, AuditRecord, ConfigChangeEvent, ConfigItemType, ConfigValueChange,
    ConfigurationSet, FamilyKey
};
use errors::{BootstrapError, ChangeValuesError, RepositoryError};
use semver::Version;
use serde_json::Value;
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::{error, info, warn};

pub struct ConfigSetAggregate {
    repo: Arc<dyn ConfigSetRepository>,
    audit: Arc<dyn AuditEmitter>,
    notifier: Arc<dyn ConfigChangeNotifier>,
}

impl ConfigSetAggregate {
    pub fn new(
        repo: Arc<dyn ConfigSetRepository>,
        audit: Arc<dyn AuditEmitter>,
        notifier: Arc<dyn ConfigChangeNotifier>,
    ) -> Self {
        Self {
            repo,
            audit,
            notifier,
        }
    }

    /// Publish a new schema version for a family.
    ///
    /// Returns the stored iteration number: 0 for a brand-new family,
    /// otherwise the previous version's final iteration (the counter serves
    /// as a per-family change counter across schema versions).
    pub async fn bootstrap(&self, mut set: ConfigurationSet) -> Result<u32, BootstrapError> {
        validation::validate_config_set(&set).map_err(|e| {
            warn!(
                family = %set.family_key(),
                schema_version = %set.schema_version,
                "invalid configuration set: {e}"
            );
            e
        })?;

        let family = set.family_key();
        let latest = self.repo.fetch_latest(&family).await?;

        if let Some(latest) = &latest {
            let new_version = parse_validated_version(&set.schema_version)?;
            let latest_version = parse_stored_version(latest)?;
            // precedence comparison: build metadata does not distinguish versions
            match latest_version.cmp_precedence(&new_version) {
                Ordering::Equal => {
                    warn!(
                        family = %family,
                        schema_version = %set.schema_version,
                        "received duplicate configuration set, ignoring"
                    );
                    return Err(BootstrapError::DuplicateVersion {
                        version: set.schema_version,
                    });
                }
                Ordering::Greater => {
                    error!(
                        family = %family,
                        schema_version = %set.schema_version,
                        latest = %latest.schema_version,
                        "received configuration set with lower version than latest, ignoring"
                    );
                    return Err(BootstrapError::VersionRegression {
                        version: set.schema_version,
                        latest: latest.schema_version.clone(),
                    });
                }
                Ordering::Less => {}
            }
        }

        // publishing a new version preserves operator-tuned values for items
        // that persist across versions; genuinely new items seed from their
        // declared defaults
        inheritance::apply_current_or_default(&mut set, latest.as_ref());

        set.iteration_number = latest.as_ref().map_or(0, |l| l.iteration_number);

        info!(
            family = %family,
            schema_version = %set.schema_version,
            iteration_number = set.iteration_number,
            "storing new configuration set schema version"
        );

        let schema_version = set.schema_version.clone();
        let iteration_number = set.iteration_number;
        self.repo.store(set).await?;

        self.emit(
            AuditAction::SchemaVersionCreated,
            family,
            &schema_version,
            iteration_number,
        )
        .await;

        Ok(iteration_number)
    }

    /// Change individual current values within the latest iteration of the
    /// latest schema version. Returns the new iteration number.
    pub async fn change_values(
        &self,
        family: &FamilyKey,
        expected_schema_version: &str,
        expected_iteration: u32,
        changes: &[ConfigValueChange],
    ) -> Result<u32, ChangeValuesError> {
        let Some(mut set) = self.repo.fetch_latest(family).await? else {
            return Err(ChangeValuesError::NotFound);
        };

        if expected_schema_version != set.schema_version {
            return Err(ChangeValuesError::StaleSchemaVersion {
                expected: expected_schema_version.to_string(),
                latest: set.schema_version,
            });
        }

        if expected_iteration != set.iteration_number {
            return Err(ChangeValuesError::StaleIteration {
                expected: expected_iteration,
                latest: set.iteration_number,
            });
        }

        // resolve the whole batch before mutating anything, so an unknown
        // name aborts with no partial application
        for change in changes {
            let found = match change.item_type {
                ConfigItemType::Parameter => set.find_parameter(&change.name).is_some(),
                ConfigItemType::FeatureFlag => set.find_feature_flag(&change.name).is_some(),
                ConfigItemType::Secret => set.find_secret(&change.name).is_some(),
            };
            if !found {
                return Err(ChangeValuesError::ItemNotFound {
                    item_type: change.item_type.to_string(),
                    name: change.name.clone(),
                });
            }
        }

        for change in changes {
            apply_change(&mut set, change);
        }

        set.iteration_number += 1;

        let schema_version = set.schema_version.clone();
        let iteration_number = set.iteration_number;

        info!(
            family = %family,
            schema_version = %schema_version,
            iteration_number,
            count = changes.len(),
            "storing configuration value changes"
        );

        match self.repo.store(set).await {
            Ok(()) => {}
            // a concurrent writer won the race between our fetch and store;
            // surface it as the same staleness condition re-checked at write
            // time
            Err(RepositoryError::IterationConflict { .. }) => {
                return Err(ChangeValuesError::StaleIteration {
                    expected: expected_iteration,
                    latest: iteration_number,
                });
            }
            Err(e) => return Err(e.into()),
        }

        self.emit(
            AuditAction::ValuesChanged,
            family.clone(),
            &schema_version,
            iteration_number,
        )
        .await;

        Ok(iteration_number)
    }

    /// Latest iteration of the latest schema version, or None for an absent
    /// family. Pure lookup, never mutates state.
    pub async fn get_latest(
        &self,
        family: &FamilyKey,
    ) -> Result<Option<ConfigurationSet>, RepositoryError> {
        self.repo.fetch_latest(family).await
    }

    /// Newest iteration recorded under a specific schema version, or None.
    pub async fn get_version(
        &self,
        family: &FamilyKey,
        schema_version: &str,
    ) -> Result<Option<ConfigurationSet>, RepositoryError> {
        self.repo.fetch_version(family, schema_version).await
    }

    /// Every stored row of one family, oldest first.
    pub async fn get_all(
        &self,
        family: &FamilyKey,
    ) -> Result<Vec<ConfigurationSet>, RepositoryError> {
        self.repo.fetch_all(family).await
    }

    /// Every stored row across all families of one environment.
    pub async fn get_environment(
        &self,
        environment_name: &str,
    ) -> Result<Vec<ConfigurationSet>, RepositoryError> {
        self.repo.fetch_environment(environment_name).await
    }

    /// Audit + change notification, exactly once per successful mutation.
    /// Emission failures are logged, not surfaced: the row is already
    /// stored and the caller's request has succeeded.
    async fn emit(
        &self,
        action: AuditAction,
        family: FamilyKey,
        schema_version: &str,
        iteration_number: u32,
    ) {
        let record = AuditRecord::new(action, family.clone(), schema_version, iteration_number);
        if let Err(e) = self.audit.emit(record).await {
            error!(family = %family, "failed to emit audit record: {e}");
        }

        let event = ConfigChangeEvent {
            family: family.clone(),
            schema_version: schema_version.to_string(),
            iteration_number,
        };
        if let Err(e) = self.notifier.notify(event).await {
            error!(family = %family, "failed to publish change notification: {e}");
        }
    }
}

fn apply_change(set: &mut ConfigurationSet, change: &ConfigValueChange) {
    let upper = change.name.to_uppercase();
    match change.item_type {
        ConfigItemType::Parameter => {
            if let Some(param) = set
                .parameters
                .iter_mut()
                .find(|p| p.name.to_uppercase() == upper)
            {
                param.current_value = change.value.clone();
            }
        }
        ConfigItemType::FeatureFlag => {
            if let Some(flag) = set
                .feature_flags
                .iter_mut()
                .find(|f| f.name.to_uppercase() == upper)
            {
                flag.current_value = coerce_bool(&change.value);
            }
        }
        ConfigItemType::Secret => {
            if let Some(secret) = set
                .secrets
                .iter_mut()
                .find(|s| s.name.to_uppercase() == upper)
            {
                secret.current_value = coerce_string(&change.value);
            }
        }
    }
}

/// Feature flags accept JSON booleans and "true"/"false" strings; anything
/// else reads as false.
fn coerce_bool(value: &Value) -> bool {
    value.as_bool().unwrap_or_else(|| {
        value
            .as_str()
            .is_some_and(|s| s.eq_ignore_ascii_case("true"))
    })
}

/// Secrets take the string form of the value: strings as-is, everything
/// else JSON-rendered.
fn coerce_string(value: &Value) -> String {
    match value.as_str() {
        Some(s) => s.to_string(),
        None => value.to_string(),
    }
}

fn parse_validated_version(schema_version: &str) -> Result<Version, BootstrapError> {
    // validation already accepted this string; re-parse rather than unwrap
    Version::parse(schema_version).map_err(|_| {
        BootstrapError::InvalidConfigSet(errors::ConfigSetValidationError::InvalidSchemaVersion {
            version: schema_version.to_string(),
        })
    })
}

fn parse_stored_version(row: &ConfigurationSet) -> Result<Version, BootstrapError> {
    Version::parse(&row.schema_version).map_err(|_| {
        BootstrapError::Storage(RepositoryError::Unavailable {
            reason: format!(
                "stored row carries a non-semver schema version: {}",
                row.schema_version
            ),
        })
    })
}
