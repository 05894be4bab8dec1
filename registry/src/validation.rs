//! # Configuration Set Validation
//!
//! Structural and semantic checks applied before a bootstrap submission is
//! accepted. The first failing rule wins; the failing rule travels as the
//! variant inside the single invalid-configuration-set error.
//!
//! Array presence (rule 2 of the protocol) is enforced by the
//! deserialization shape: `parameters`, `featureFlags`, and `secrets` are
//! non-optional lists on [`ConfigurationSet`].

use cr_core::types::{ConfigParameter, ConfigurationSet};
use errors::ConfigSetValidationError;
use jsonschema::{Draft, JSONSchema};
use semver::Version;
use std::collections::HashSet;
use validator::Validate;

/// Validate a submitted configuration set.
pub fn validate_config_set(set: &ConfigurationSet) -> Result<(), ConfigSetValidationError> {
    validate_presence(set)?;
    validate_schema_version(&set.schema_version)?;
    validate_name_uniqueness(set)?;

    for param in &set.parameters {
        validate_structured_default(param)?;
    }

    Ok(())
}

/// Strict semver: the string must parse, and re-rendering the parsed version
/// must reproduce the input exactly. Rejects inputs like "v1.0.1" or "0.2"
/// that are only semver-valid after normalization.
pub fn validate_schema_version(schema_version: &str) -> Result<(), ConfigSetValidationError> {
    let invalid = || ConfigSetValidationError::InvalidSchemaVersion {
        version: schema_version.to_string(),
    };

    let parsed = Version::parse(schema_version).map_err(|_| invalid())?;
    if parsed.to_string() != schema_version {
        return Err(invalid());
    }
    Ok(())
}

fn validate_presence(set: &ConfigurationSet) -> Result<(), ConfigSetValidationError> {
    if let Err(errors) = set.validate() {
        let fields = errors.field_errors();
        if fields.contains_key("environment_name") {
            return Err(ConfigSetValidationError::MissingEnvironmentName);
        }
        if fields.contains_key("bounded_context_name") {
            return Err(ConfigSetValidationError::MissingBoundedContextName);
        }
        // remaining failures are nested empty item names
        return Err(ConfigSetValidationError::EmptyItemName);
    }
    Ok(())
}

/// Item names are unique case-insensitively, within each list and across
/// lists: a parameter may not share a name with a feature flag or secret.
fn validate_name_uniqueness(set: &ConfigurationSet) -> Result<(), ConfigSetValidationError> {
    let mut seen: HashSet<String> = HashSet::new();
    for name in set.all_keys() {
        if !seen.insert(name.to_uppercase()) {
            return Err(ConfigSetValidationError::DuplicateItemName {
                name: name.to_string(),
            });
        }
    }
    Ok(())
}

/// For LIST/OBJECT parameters: the schema must be present, must compile, and
/// the declared default must validate against it (element-wise for LIST).
fn validate_structured_default(param: &ConfigParameter) -> Result<(), ConfigSetValidationError> {
    if !param.param_type.is_structured() {
        return Ok(());
    }

    let Some(schema_str) = &param.json_schema else {
        return Err(ConfigSetValidationError::MissingJsonSchema {
            name: param.name.clone(),
            param_type: param.param_type.to_string(),
        });
    };

    let schema_json: serde_json::Value =
        serde_json::from_str(schema_str).map_err(|e| ConfigSetValidationError::InvalidJsonSchema {
            name: param.name.clone(),
            reason: e.to_string(),
        })?;

    let compiled = JSONSchema::options()
        .with_draft(Draft::Draft7)
        .compile(&schema_json)
        .map_err(|e| ConfigSetValidationError::InvalidJsonSchema {
            name: param.name.clone(),
            reason: e.to_string(),
        })?;

    if param.param_type == cr_core::types::ConfigParameterType::List {
        let Some(items) = param.default_value.as_array() else {
            return Err(ConfigSetValidationError::InvalidDefaultValue {
                name: param.name.clone(),
                reason: "default value of a LIST parameter must be an array".to_string(),
            });
        };
        for item in items {
            check_instance(&compiled, item, &param.name)?;
        }
        return Ok(());
    }

    check_instance(&compiled, &param.default_value, &param.name)
}

fn check_instance(
    schema: &JSONSchema,
    instance: &serde_json::Value,
    param_name: &str,
) -> Result<(), ConfigSetValidationError> {
    if let Err(errors) = schema.validate(instance) {
        let first = errors
            .into_iter()
            .next()
            .map(|err| err.to_string())
            .unwrap_or_else(|| "schema validation failed".to_string());
        return Err(ConfigSetValidationError::InvalidDefaultValue {
            name: param_name.to_string(),
            reason: first,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cr_core::types::{ConfigFeatureFlag, ConfigParameterType, ConfigSecret};
    use serde_json::json;

    fn empty_set(version: &str) -> ConfigurationSet {
        ConfigurationSet {
            environment_name: "dev".to_string(),
            bounded_context_name: None,
            schema_version: version.to_string(),
            iteration_number: 0,
            parameters: Vec::new(),
            feature_flags: Vec::new(),
            secrets: Vec::new(),
        }
    }

    fn param(name: &str, param_type: ConfigParameterType) -> ConfigParameter {
        ConfigParameter {
            name: name.to_string(),
            param_type,
            default_value: json!("x"),
            current_value: json!(null),
            description: String::new(),
            json_schema: None,
        }
    }

    #[test]
    fn test_accepts_valid_set() {
        let mut set = empty_set("1.0.0");
        set.parameters.push(param("timeout", ConfigParameterType::IntNumber));
        assert!(validate_config_set(&set).is_ok());
    }

    #[test]
    fn test_rejects_empty_environment_name() {
        let mut set = empty_set("1.0.0");
        set.environment_name = String::new();
        assert_eq!(
            validate_config_set(&set),
            Err(ConfigSetValidationError::MissingEnvironmentName)
        );
    }

    #[test]
    fn test_rejects_empty_bounded_context_name() {
        let mut set = empty_set("1.0.0");
        set.bounded_context_name = Some(String::new());
        assert_eq!(
            validate_config_set(&set),
            Err(ConfigSetValidationError::MissingBoundedContextName)
        );
    }

    #[test]
    fn test_rejects_coercible_but_not_strict_semver() {
        for version in ["v1.0.1", "0.2", "1", "1.0.0 ", "01.0.0"] {
            assert!(
                matches!(
                    validate_config_set(&empty_set(version)),
                    Err(ConfigSetValidationError::InvalidSchemaVersion { .. })
                ),
                "expected {version} to be rejected"
            );
        }
    }

    #[test]
    fn test_accepts_prerelease_and_build_versions() {
        assert!(validate_config_set(&empty_set("1.0.0-rc.1")).is_ok());
        assert!(validate_config_set(&empty_set("1.0.0+build.5")).is_ok());
    }

    #[test]
    fn test_rejects_case_insensitive_duplicate_within_list() {
        let mut set = empty_set("1.0.0");
        set.parameters.push(param("timeout", ConfigParameterType::IntNumber));
        set.parameters.push(param("TIMEOUT", ConfigParameterType::IntNumber));
        assert!(matches!(
            validate_config_set(&set),
            Err(ConfigSetValidationError::DuplicateItemName { .. })
        ));
    }

    #[test]
    fn test_rejects_duplicate_across_lists() {
        let mut set = empty_set("1.0.0");
        set.parameters.push(param("enabled", ConfigParameterType::Bool));
        set.feature_flags.push(ConfigFeatureFlag {
            name: "Enabled".to_string(),
            default_value: false,
            current_value: false,
            description: String::new(),
        });
        assert!(matches!(
            validate_config_set(&set),
            Err(ConfigSetValidationError::DuplicateItemName { .. })
        ));
    }

    #[test]
    fn test_rejects_empty_item_name() {
        let mut set = empty_set("1.0.0");
        set.secrets.push(ConfigSecret {
            name: String::new(),
            default_value: None,
            current_value: String::new(),
            description: String::new(),
        });
        assert_eq!(
            validate_config_set(&set),
            Err(ConfigSetValidationError::EmptyItemName)
        );
    }

    #[test]
    fn test_structured_param_requires_schema() {
        let mut set = empty_set("1.0.0");
        set.parameters.push(param("allowList", ConfigParameterType::List));
        assert!(matches!(
            validate_config_set(&set),
            Err(ConfigSetValidationError::MissingJsonSchema { .. })
        ));
    }

    #[test]
    fn test_structured_param_schema_must_parse() {
        let mut set = empty_set("1.0.0");
        let mut p = param("allowList", ConfigParameterType::List);
        p.json_schema = Some("{not json".to_string());
        p.default_value = json!([]);
        set.parameters.push(p);
        assert!(matches!(
            validate_config_set(&set),
            Err(ConfigSetValidationError::InvalidJsonSchema { .. })
        ));
    }

    #[test]
    fn test_list_default_validated_element_wise() {
        let mut set = empty_set("1.0.0");
        let mut p = param("allowList", ConfigParameterType::List);
        p.json_schema = Some(r#"{"type":"string"}"#.to_string());
        p.default_value = json!(["ok", 42]);
        set.parameters.push(p);
        assert!(matches!(
            validate_config_set(&set),
            Err(ConfigSetValidationError::InvalidDefaultValue { .. })
        ));
    }

    #[test]
    fn test_object_default_validated_against_schema() {
        let mut set = empty_set("1.0.0");
        let mut p = param("limits", ConfigParameterType::Object);
        p.json_schema =
            Some(r#"{"type":"object","required":["max"],"properties":{"max":{"type":"integer"}}}"#.to_string());
        p.default_value = json!({"max": 10});
        set.parameters.push(p);
        assert!(validate_config_set(&set).is_ok());

        set.parameters[0].default_value = json!({"max": "ten"});
        assert!(matches!(
            validate_config_set(&set),
            Err(ConfigSetValidationError::InvalidDefaultValue { .. })
        ));
    }

    #[test]
    fn test_list_default_must_be_array() {
        let mut set = empty_set("1.0.0");
        let mut p = param("allowList", ConfigParameterType::List);
        p.json_schema = Some(r#"{"type":"string"}"#.to_string());
        p.default_value = json!("not-an-array");
        set.parameters.push(p);
        assert!(matches!(
            validate_config_set(&set),
            Err(ConfigSetValidationError::InvalidDefaultValue { .. })
        ));
    }
}
