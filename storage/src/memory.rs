//! In-memory configuration set repository.
//!
//! Keeps one append-only log per family behind a `parking_lot` lock. Used
//! directly in tests and wherever persistence is not required.

use crate::index::{self, FamilyIndex};
use async_trait::async_trait;
use cr_core::traits::ConfigSetRepository;
use cr_core::types::{ConfigurationSet, FamilyKey};
use errors::RepositoryError;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::info;

#[derive(Default)]
pub struct InMemoryConfigSetRepo {
    families: Arc<RwLock<FamilyIndex>>,
}

impl InMemoryConfigSetRepo {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConfigSetRepository for InMemoryConfigSetRepo {
    async fn init(&self) -> Result<(), RepositoryError> {
        Ok(())
    }

    async fn store(&self, set: ConfigurationSet) -> Result<(), RepositoryError> {
        let family = set.family_key();
        let schema_version = set.schema_version.clone();
        let iteration_number = set.iteration_number;

        index::append_row(&mut self.families.write(), set)?;

        info!(
            family = %family,
            schema_version = %schema_version,
            iteration_number,
            "stored configuration set"
        );
        Ok(())
    }

    async fn fetch_all(
        &self,
        family: &FamilyKey,
    ) -> Result<Vec<ConfigurationSet>, RepositoryError> {
        Ok(self.families.read().get(family).cloned().unwrap_or_default())
    }

    async fn fetch_latest(
        &self,
        family: &FamilyKey,
    ) -> Result<Option<ConfigurationSet>, RepositoryError> {
        Ok(index::latest(&self.families.read(), family))
    }

    async fn fetch_version(
        &self,
        family: &FamilyKey,
        schema_version: &str,
    ) -> Result<Option<ConfigurationSet>, RepositoryError> {
        Ok(index::latest_of_version(
            &self.families.read(),
            family,
            schema_version,
        ))
    }

    async fn fetch_environment(
        &self,
        environment_name: &str,
    ) -> Result<Vec<ConfigurationSet>, RepositoryError> {
        Ok(index::environment_rows(
            &self.families.read(),
            environment_name,
        ))
    }
}
