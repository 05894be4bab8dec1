//! Shared per-family ordered log index.
//!
//! Both backends keep the same structure in memory: one append-only row log
//! per family key. "Latest" is resolved through [`cr_core::version`] in a
//! single scan over the log, never by sorting copies.

use cr_core::types::{ConfigurationSet, FamilyKey};
use cr_core::version;
use errors::RepositoryError;
use std::collections::HashMap;

pub(crate) type FamilyIndex = HashMap<FamilyKey, Vec<ConfigurationSet>>;

/// Compare-and-append: reject the row when the family log already holds the
/// same `(schemaVersion, iterationNumber)` pair, otherwise append.
pub(crate) fn append_row(
    families: &mut FamilyIndex,
    set: ConfigurationSet,
) -> Result<(), RepositoryError> {
    let family = set.family_key();
    let rows = families.entry(family.clone()).or_default();

    let conflict = rows.iter().any(|row| {
        row.schema_version == set.schema_version && row.iteration_number == set.iteration_number
    });
    if conflict {
        return Err(RepositoryError::IterationConflict {
            family: family.to_string(),
            schema_version: set.schema_version,
            iteration_number: set.iteration_number,
        });
    }

    rows.push(set);
    Ok(())
}

/// Drop one exact `(schemaVersion, iterationNumber)` row, used to roll back
/// an append whose persistence failed.
pub(crate) fn remove_row(
    families: &mut FamilyIndex,
    family: &FamilyKey,
    schema_version: &str,
    iteration_number: u32,
) {
    if let Some(rows) = families.get_mut(family) {
        rows.retain(|row| {
            !(row.schema_version == schema_version && row.iteration_number == iteration_number)
        });
    }
}

pub(crate) fn rows_of<'a>(families: &'a FamilyIndex, family: &FamilyKey) -> &'a [ConfigurationSet] {
    families.get(family).map_or(&[][..], Vec::as_slice)
}

pub(crate) fn latest(families: &FamilyIndex, family: &FamilyKey) -> Option<ConfigurationSet> {
    version::latest_row(rows_of(families, family)).cloned()
}

pub(crate) fn latest_of_version(
    families: &FamilyIndex,
    family: &FamilyKey,
    schema_version: &str,
) -> Option<ConfigurationSet> {
    version::latest_iteration(rows_of(families, family), schema_version).cloned()
}

pub(crate) fn environment_rows(
    families: &FamilyIndex,
    environment_name: &str,
) -> Vec<ConfigurationSet> {
    let upper = environment_name.to_uppercase();
    families
        .iter()
        .filter(|(key, _)| key.environment_name.to_uppercase() == upper)
        .flat_map(|(_, rows)| rows.iter().cloned())
        .collect()
}
