//! Cached application-configuration facade.
//!
//! Holds a component's own configuration set plus the environment's global
//! set, fetched through a [`ConfigFetcher`]. Consumers call [`AppConfiguration::refresh`]
//! when a change notification arrives; environment-variable overrides are
//! re-applied after every fetch so they always take priority.

use crate::wrapper::ConfigSetWrapper;
use crate::ClientError;
use async_trait::async_trait;
use cr_core::types::{ConfigurationSet, FamilyKey};
use std::sync::Arc;
use tracing::info;

/// Env var that, when present, disables remote fetch entirely (standalone
/// mode: declared defaults plus env overrides only).
pub const STANDALONE_ENV_VAR_NAME: &str = "CONFREG_STANDALONE";

/// Prefix for value-override environment variables.
pub const ENV_VAR_OVERRIDE_PREFIX: &str = "CONFREG_";

/// Transport-side fetch contract. The HTTP implementation lives with the
/// service glue; tests and in-process deployments implement it over a
/// repository directly.
#[async_trait]
pub trait ConfigFetcher: Send + Sync {
    async fn fetch_latest(
        &self,
        family: &FamilyKey,
    ) -> Result<Option<ConfigurationSet>, ClientError>;
}

pub struct AppConfiguration {
    fetcher: Option<Arc<dyn ConfigFetcher>>,
    standalone: bool,
    env_var_prefix: String,
    bc_config: ConfigSetWrapper,
    global_config: ConfigSetWrapper,
}

impl AppConfiguration {
    pub fn new(
        environment_name: &str,
        bounded_context_name: &str,
        fetcher: Option<Arc<dyn ConfigFetcher>>,
    ) -> Self {
        let standalone =
            fetcher.is_none() || std::env::var(STANDALONE_ENV_VAR_NAME).is_ok();
        Self {
            fetcher,
            standalone,
            env_var_prefix: ENV_VAR_OVERRIDE_PREFIX.to_string(),
            bc_config: ConfigSetWrapper::for_bounded_context(
                environment_name,
                bounded_context_name,
                "0.0.0",
            ),
            global_config: ConfigSetWrapper::new(environment_name, "0.0.0"),
        }
    }

    pub fn with_env_var_prefix(mut self, prefix: &str) -> Self {
        self.env_var_prefix = prefix.to_string();
        self
    }

    pub fn standalone(&self) -> bool {
        self.standalone
    }

    /// The component's own configuration set view.
    pub fn bounded_context(&self) -> &ConfigSetWrapper {
        &self.bc_config
    }

    pub fn bounded_context_mut(&mut self) -> &mut ConfigSetWrapper {
        &mut self.bc_config
    }

    /// The environment-wide global set view.
    pub fn global(&self) -> &ConfigSetWrapper {
        &self.global_config
    }

    /// First fetch. In standalone mode only env overrides are applied over
    /// the locally declared defaults.
    pub async fn init(&mut self) -> Result<(), ClientError> {
        if !self.standalone {
            self.refresh().await?;
            return Ok(());
        }

        info!("configuration client running standalone, skipping remote fetch");
        self.bc_config.apply_env_var_overrides(&self.env_var_prefix);
        Ok(())
    }

    /// Re-fetch both sets; callers invoke this when a change notification
    /// for the family arrives.
    pub async fn refresh(&mut self) -> Result<(), ClientError> {
        if self.standalone {
            return Ok(());
        }
        let fetcher = self.fetcher.as_ref().ok_or_else(|| ClientError::Provider {
            reason: "no fetcher configured".to_string(),
        })?;

        let bc_family = FamilyKey::bounded_context(
            self.bc_config.environment_name(),
            self.bc_config.bounded_context_name().unwrap_or_default(),
        );
        let fetched = fetcher.fetch_latest(&bc_family).await?.ok_or_else(|| {
            ClientError::FetchFailed {
                family: bc_family.to_string(),
            }
        })?;
        self.bc_config = ConfigSetWrapper::from_config_set(&fetched);

        // a missing global set is tolerated: not every environment has one
        let global_family = FamilyKey::global(self.global_config.environment_name());
        if let Some(global) = fetcher.fetch_latest(&global_family).await? {
            self.global_config = ConfigSetWrapper::from_config_set(&global);
        }

        self.bc_config.apply_env_var_overrides(&self.env_var_prefix);
        Ok(())
    }
}
