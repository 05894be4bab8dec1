//! # Version Resolver
//!
//! Pure functions that answer "latest schema version" and "latest iteration
//! within a version" over one family's stored rows.
//!
//! This module is the only place version/iteration ordering logic exists;
//! repository backends and the aggregate both resolve through it so "latest"
//! semantics cannot diverge.

use crate::types::ConfigurationSet;
use semver::Version;

/// Highest schema version present in `rows`, by semver order.
///
/// Rows whose version does not parse are ignored; stored rows are validated
/// at write time, so in practice none are skipped.
pub fn latest_version(rows: &[ConfigurationSet]) -> Option<Version> {
    rows.iter()
        .filter_map(|row| Version::parse(&row.schema_version).ok())
        .max()
}

/// Newest iteration recorded under `schema_version`, or None when the family
/// has no row for that version.
///
/// Iteration numbers are an internal monotonic counter - callers address a
/// version, never a specific iteration.
pub fn latest_iteration<'a>(
    rows: &'a [ConfigurationSet],
    schema_version: &str,
) -> Option<&'a ConfigurationSet> {
    rows.iter()
        .filter(|row| row.schema_version == schema_version)
        .max_by_key(|row| row.iteration_number)
}

/// Newest iteration of the highest schema version, or None for an empty
/// family.
pub fn latest_row(rows: &[ConfigurationSet]) -> Option<&ConfigurationSet> {
    let latest = latest_version(rows)?;
    latest_iteration(rows, &latest.to_string())
}
