//! Map-backed wrapper over one configuration set.
//!
//! Items are indexed by upper-cased name, matching the registry's
//! case-insensitive uniqueness rule. The wrapper round-trips losslessly to
//! the registry's `ConfigurationSet` shape.

use crate::ClientError;
use cr_core::types::{
    ConfigFeatureFlag, ConfigParameter, ConfigParameterType, ConfigSecret, ConfigurationSet
};
use serde_json::Value;
use std::collections::HashMap;
use tracing::warn;

#[derive(Debug, Clone, Default)]
pub struct ConfigSetWrapper {
    environment_name: String,
    bounded_context_name: Option<String>,
    schema_version: String,
    iteration_number: u32,
    parameters: HashMap<String, ConfigParameter>,
    feature_flags: HashMap<String, ConfigFeatureFlag>,
    secrets: HashMap<String, ConfigSecret>,
}

impl ConfigSetWrapper {
    pub fn new(environment_name: impl Into<String>, schema_version: impl Into<String>) -> Self {
        Self {
            environment_name: environment_name.into(),
            schema_version: schema_version.into(),
            ..Self::default()
        }
    }

    pub fn for_bounded_context(
        environment_name: impl Into<String>,
        bounded_context_name: impl Into<String>,
        schema_version: impl Into<String>,
    ) -> Self {
        Self {
            environment_name: environment_name.into(),
            bounded_context_name: Some(bounded_context_name.into()),
            schema_version: schema_version.into(),
            ..Self::default()
        }
    }

    pub fn environment_name(&self) -> &str {
        &self.environment_name
    }

    pub fn bounded_context_name(&self) -> Option<&str> {
        self.bounded_context_name.as_deref()
    }

    pub fn schema_version(&self) -> &str {
        &self.schema_version
    }

    pub fn iteration_number(&self) -> u32 {
        self.iteration_number
    }

    pub fn has(&self, name: &str) -> bool {
        let key = name.to_uppercase();
        self.parameters.contains_key(&key)
            || self.feature_flags.contains_key(&key)
            || self.secrets.contains_key(&key)
    }

    /// Declared item names across all three collections.
    pub fn all_keys(&self) -> Vec<&str> {
        self.parameters
            .values()
            .map(|p| p.name.as_str())
            .chain(self.feature_flags.values().map(|f| f.name.as_str()))
            .chain(self.secrets.values().map(|s| s.name.as_str()))
            .collect()
    }

    pub fn add_param(&mut self, param: ConfigParameter) -> Result<(), ClientError> {
        if self.has(&param.name) {
            return Err(ClientError::DuplicateName { name: param.name });
        }
        self.parameters.insert(param.name.to_uppercase(), param);
        Ok(())
    }

    pub fn add_new_param(
        &mut self,
        name: &str,
        param_type: ConfigParameterType,
        default_value: Value,
        description: &str,
    ) -> Result<(), ClientError> {
        self.add_param(ConfigParameter {
            name: name.to_string(),
            param_type,
            current_value: default_value.clone(),
            default_value,
            description: description.to_string(),
            json_schema: None,
        })
    }

    pub fn add_feature_flag(&mut self, flag: ConfigFeatureFlag) -> Result<(), ClientError> {
        if self.has(&flag.name) {
            return Err(ClientError::DuplicateName { name: flag.name });
        }
        self.feature_flags.insert(flag.name.to_uppercase(), flag);
        Ok(())
    }

    pub fn add_new_feature_flag(
        &mut self,
        name: &str,
        default_value: bool,
        description: &str,
    ) -> Result<(), ClientError> {
        self.add_feature_flag(ConfigFeatureFlag {
            name: name.to_string(),
            default_value,
            current_value: default_value,
            description: description.to_string(),
        })
    }

    pub fn add_secret(&mut self, secret: ConfigSecret) -> Result<(), ClientError> {
        if self.has(&secret.name) {
            return Err(ClientError::DuplicateName { name: secret.name });
        }
        self.secrets.insert(secret.name.to_uppercase(), secret);
        Ok(())
    }

    pub fn add_new_secret(
        &mut self,
        name: &str,
        default_value: Option<&str>,
        description: &str,
    ) -> Result<(), ClientError> {
        self.add_secret(ConfigSecret {
            name: name.to_string(),
            default_value: default_value.map(ToString::to_string),
            current_value: default_value.unwrap_or_default().to_string(),
            description: description.to_string(),
        })
    }

    pub fn get_param(&self, name: &str) -> Option<&ConfigParameter> {
        self.parameters.get(&name.to_uppercase())
    }

    pub fn get_feature_flag(&self, name: &str) -> Option<&ConfigFeatureFlag> {
        self.feature_flags.get(&name.to_uppercase())
    }

    pub fn get_secret(&self, name: &str) -> Option<&ConfigSecret> {
        self.secrets.get(&name.to_uppercase())
    }

    pub fn set_param_value(&mut self, name: &str, value: Value) -> Result<(), ClientError> {
        let param = self
            .parameters
            .get_mut(&name.to_uppercase())
            .ok_or_else(|| ClientError::UnknownItem {
                name: name.to_string(),
            })?;
        param.current_value = value;
        Ok(())
    }

    pub fn set_feature_flag_value(&mut self, name: &str, value: bool) -> Result<(), ClientError> {
        let flag = self
            .feature_flags
            .get_mut(&name.to_uppercase())
            .ok_or_else(|| ClientError::UnknownItem {
                name: name.to_string(),
            })?;
        flag.current_value = value;
        Ok(())
    }

    pub fn set_secret_value(&mut self, name: &str, value: &str) -> Result<(), ClientError> {
        let secret = self
            .secrets
            .get_mut(&name.to_uppercase())
            .ok_or_else(|| ClientError::UnknownItem {
                name: name.to_string(),
            })?;
        secret.current_value = value.to_string();
        Ok(())
    }

    /// Apply `PREFIX + UPPER(name)` process environment overrides to every
    /// item. Env vars always take priority over fetched values.
    pub fn apply_env_var_overrides(&mut self, prefix: &str) {
        for param in self.parameters.values_mut() {
            let var_name = format!("{prefix}{}", param.name.to_uppercase());
            if let Ok(raw) = std::env::var(&var_name) {
                match parse_param_value(param.param_type, &raw) {
                    Some(value) => param.current_value = value,
                    None => warn!(
                        "ignoring env override {var_name}: not a valid {}",
                        param.param_type
                    ),
                }
            }
        }

        for flag in self.feature_flags.values_mut() {
            let var_name = format!("{prefix}{}", flag.name.to_uppercase());
            if let Ok(raw) = std::env::var(&var_name) {
                flag.current_value = raw.eq_ignore_ascii_case("true");
            }
        }

        for secret in self.secrets.values_mut() {
            let var_name = format!("{prefix}{}", secret.name.to_uppercase());
            if let Ok(raw) = std::env::var(&var_name) {
                secret.current_value = raw;
            }
        }
    }

    /// Render back into the registry's wire shape.
    pub fn to_config_set(&self) -> ConfigurationSet {
        ConfigurationSet {
            environment_name: self.environment_name.clone(),
            bounded_context_name: self.bounded_context_name.clone(),
            schema_version: self.schema_version.clone(),
            iteration_number: self.iteration_number,
            parameters: self.parameters.values().cloned().collect(),
            feature_flags: self.feature_flags.values().cloned().collect(),
            secrets: self.secrets.values().cloned().collect(),
        }
    }

    /// Rebuild the wrapper from a fetched set, replacing all current state.
    pub fn from_config_set(set: &ConfigurationSet) -> Self {
        let mut wrapper = Self {
            environment_name: set.environment_name.clone(),
            bounded_context_name: set.bounded_context_name.clone(),
            schema_version: set.schema_version.clone(),
            iteration_number: set.iteration_number,
            ..Self::default()
        };

        for param in &set.parameters {
            wrapper
                .parameters
                .insert(param.name.to_uppercase(), param.clone());
        }
        for flag in &set.feature_flags {
            wrapper
                .feature_flags
                .insert(flag.name.to_uppercase(), flag.clone());
        }
        for secret in &set.secrets {
            wrapper
                .secrets
                .insert(secret.name.to_uppercase(), secret.clone());
        }

        wrapper
    }
}

/// Parse a raw string (env var) into the JSON value of a parameter type.
/// LIST/OBJECT overrides must be valid JSON documents.
fn parse_param_value(param_type: ConfigParameterType, raw: &str) -> Option<Value> {
    match param_type {
        ConfigParameterType::String => Some(Value::String(raw.to_string())),
        ConfigParameterType::Bool => Some(Value::Bool(raw.eq_ignore_ascii_case("true"))),
        ConfigParameterType::IntNumber => raw.parse::<i64>().ok().map(Value::from),
        ConfigParameterType::FloatNumber => raw.parse::<f64>().ok().map(Value::from),
        ConfigParameterType::List | ConfigParameterType::Object => {
            serde_json::from_str(raw).ok()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use serial_test::serial;

    fn populated() -> ConfigSetWrapper {
        let mut w = ConfigSetWrapper::for_bounded_context("dev", "accounts", "1.0.0");
        w.add_new_param(
            "maxRetries",
            ConfigParameterType::IntNumber,
            json!(3),
            "retry budget",
        )
        .unwrap();
        w.add_new_param("rate", ConfigParameterType::FloatNumber, json!(0.5), "")
            .unwrap();
        w.add_new_feature_flag("fastPath", false, "").unwrap();
        w.add_new_secret("apiKey", Some("default-key"), "").unwrap();
        w
    }

    #[test]
    fn test_round_trip_preserves_every_item_field() {
        let mut wrapper = populated();
        wrapper.set_param_value("maxRetries", json!(10)).unwrap();
        wrapper.set_feature_flag_value("fastPath", true).unwrap();

        let set = wrapper.to_config_set();
        let json = serde_json::to_value(&set).unwrap();
        let parsed: ConfigurationSet = serde_json::from_value(json).unwrap();
        let rebuilt = ConfigSetWrapper::from_config_set(&parsed);

        let param = rebuilt.get_param("MAXRETRIES").unwrap();
        assert_eq!(param.name, "maxRetries");
        assert_eq!(param.param_type, ConfigParameterType::IntNumber);
        assert_eq!(param.default_value, json!(3));
        assert_eq!(param.current_value, json!(10));
        assert_eq!(param.description, "retry budget");

        assert!(rebuilt.get_feature_flag("fastpath").unwrap().current_value);
        assert_eq!(
            rebuilt.get_secret("apiKey").unwrap().default_value.as_deref(),
            Some("default-key")
        );
        assert_eq!(rebuilt.schema_version(), "1.0.0");
    }

    #[test]
    fn test_duplicate_names_rejected_across_collections() {
        let mut wrapper = populated();
        let err = wrapper
            .add_new_param("FASTPATH", ConfigParameterType::Bool, json!(true), "")
            .unwrap_err();
        assert!(matches!(err, ClientError::DuplicateName { .. }));
    }

    #[test]
    fn test_has_and_all_keys() {
        let wrapper = populated();
        assert!(wrapper.has("maxretries"));
        assert!(wrapper.has("APIKEY"));
        assert!(!wrapper.has("missing"));
        assert_eq!(wrapper.all_keys().len(), 4);
    }

    #[test]
    #[serial]
    fn test_env_var_overrides_by_type() {
        let mut wrapper = populated();
        unsafe {
            std::env::set_var("CRTEST_MAXRETRIES", "42");
            std::env::set_var("CRTEST_RATE", "2.5");
            std::env::set_var("CRTEST_FASTPATH", "TRUE");
            std::env::set_var("CRTEST_APIKEY", "from-env");
        }

        wrapper.apply_env_var_overrides("CRTEST_");

        assert_eq!(
            wrapper.get_param("maxRetries").unwrap().current_value,
            json!(42)
        );
        assert_eq!(wrapper.get_param("rate").unwrap().current_value, json!(2.5));
        assert!(wrapper.get_feature_flag("fastPath").unwrap().current_value);
        assert_eq!(wrapper.get_secret("apiKey").unwrap().current_value, "from-env");

        unsafe {
            std::env::remove_var("CRTEST_MAXRETRIES");
            std::env::remove_var("CRTEST_RATE");
            std::env::remove_var("CRTEST_FASTPATH");
            std::env::remove_var("CRTEST_APIKEY");
        }
    }

    #[test]
    #[serial]
    fn test_unparsable_env_override_is_ignored() {
        let mut wrapper = populated();
        unsafe {
            std::env::set_var("CRTEST_MAXRETRIES", "not-a-number");
        }

        wrapper.apply_env_var_overrides("CRTEST_");
        assert_eq!(
            wrapper.get_param("maxRetries").unwrap().current_value,
            json!(3)
        );

        unsafe {
            std::env::remove_var("CRTEST_MAXRETRIES");
        }
    }
}
