//! # Value Inheritance Policy
//!
//! Computes the current value of every item in a newly published schema
//! version from the previous version's current values, falling back to each
//! item's declared default.
//!
//! Runs once per bootstrap over the whole item list. Value changes never go
//! through here - they mutate a single item's current value directly.

use cr_core::types::ConfigurationSet;

/// Seed `target`'s current values from `source` (the previously-latest set
/// of the same family), or from the declared defaults when the family is new
/// or the item has no predecessor.
///
/// Whatever current values the submission carried are overwritten: operators
/// tune values through change-values, never through bootstrap payloads.
pub fn apply_current_or_default(target: &mut ConfigurationSet, source: Option<&ConfigurationSet>) {
    for param in &mut target.parameters {
        let inherited = source
            .and_then(|src| src.find_parameter(&param.name))
            .map(|src_param| &src_param.current_value)
            .filter(|value| !value.is_null());
        param.current_value = match inherited {
            Some(value) => value.clone(),
            None => param.default_value.clone(),
        };
    }

    for flag in &mut target.feature_flags {
        flag.current_value = match source.and_then(|src| src.find_feature_flag(&flag.name)) {
            Some(src_flag) => src_flag.current_value,
            None => flag.default_value,
        };
    }

    for secret in &mut target.secrets {
        // secrets don't have a mandatory default value
        secret.current_value = source
            .and_then(|src| src.find_secret(&secret.name))
            .map(|src_secret| src_secret.current_value.clone())
            .or_else(|| secret.default_value.clone())
            .unwrap_or_default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cr_core::types::{ConfigFeatureFlag, ConfigParameter, ConfigParameterType, ConfigSecret};
    use serde_json::{Value, json};

    fn set_with(
        parameters: Vec<ConfigParameter>,
        feature_flags: Vec<ConfigFeatureFlag>,
        secrets: Vec<ConfigSecret>,
    ) -> ConfigurationSet {
        ConfigurationSet {
            environment_name: "dev".to_string(),
            bounded_context_name: None,
            schema_version: "1.0.0".to_string(),
            iteration_number: 0,
            parameters,
            feature_flags,
            secrets,
        }
    }

    fn int_param(name: &str, default: i64, current: Value) -> ConfigParameter {
        ConfigParameter {
            name: name.to_string(),
            param_type: ConfigParameterType::IntNumber,
            default_value: json!(default),
            current_value: current,
            description: String::new(),
            json_schema: None,
        }
    }

    #[test]
    fn test_parameter_inherits_source_current_value() {
        let source = set_with(vec![int_param("timeout", 30, json!(120))], vec![], vec![]);
        let mut target = set_with(vec![int_param("TIMEOUT", 60, json!(null))], vec![], vec![]);

        apply_current_or_default(&mut target, Some(&source));
        assert_eq!(target.parameters[0].current_value, json!(120));
    }

    #[test]
    fn test_parameter_falls_back_to_own_default_when_source_value_undefined() {
        let source = set_with(vec![int_param("timeout", 30, json!(null))], vec![], vec![]);
        let mut target = set_with(vec![int_param("timeout", 60, json!(null))], vec![], vec![]);

        apply_current_or_default(&mut target, Some(&source));
        assert_eq!(target.parameters[0].current_value, json!(60));
    }

    #[test]
    fn test_new_parameter_seeds_from_default() {
        let source = set_with(vec![int_param("timeout", 30, json!(120))], vec![], vec![]);
        let mut target = set_with(
            vec![int_param("timeout", 60, json!(null)), int_param("retries", 3, json!(null))],
            vec![],
            vec![],
        );

        apply_current_or_default(&mut target, Some(&source));
        assert_eq!(target.parameters[0].current_value, json!(120));
        assert_eq!(target.parameters[1].current_value, json!(3));
    }

    #[test]
    fn test_absent_source_seeds_everything_from_defaults() {
        let mut target = set_with(
            vec![int_param("timeout", 60, json!(999))],
            vec![ConfigFeatureFlag {
                name: "fastPath".to_string(),
                default_value: true,
                current_value: false,
                description: String::new(),
            }],
            vec![],
        );

        apply_current_or_default(&mut target, None);
        // submitted current values are overwritten, not trusted
        assert_eq!(target.parameters[0].current_value, json!(60));
        assert!(target.feature_flags[0].current_value);
    }

    #[test]
    fn test_feature_flag_inherits_current_value() {
        let source = set_with(
            vec![],
            vec![ConfigFeatureFlag {
                name: "fastPath".to_string(),
                default_value: false,
                current_value: true,
                description: String::new(),
            }],
            vec![],
        );
        let mut target = set_with(
            vec![],
            vec![ConfigFeatureFlag {
                name: "FASTPATH".to_string(),
                default_value: false,
                current_value: false,
                description: String::new(),
            }],
            vec![],
        );

        apply_current_or_default(&mut target, Some(&source));
        assert!(target.feature_flags[0].current_value);
    }

    #[test]
    fn test_secret_without_source_or_default_gets_empty_string() {
        let mut target = set_with(
            vec![],
            vec![],
            vec![ConfigSecret {
                name: "apiKey".to_string(),
                default_value: None,
                current_value: "stale".to_string(),
                description: String::new(),
            }],
        );

        apply_current_or_default(&mut target, None);
        assert_eq!(target.secrets[0].current_value, "");
    }

    #[test]
    fn test_secret_inherits_then_falls_back_to_default() {
        let source = set_with(
            vec![],
            vec![],
            vec![ConfigSecret {
                name: "apiKey".to_string(),
                default_value: None,
                current_value: "rotated".to_string(),
                description: String::new(),
            }],
        );
        let mut target = set_with(
            vec![],
            vec![],
            vec![
                ConfigSecret {
                    name: "apiKey".to_string(),
                    default_value: None,
                    current_value: String::new(),
                    description: String::new(),
                },
                ConfigSecret {
                    name: "dbPassword".to_string(),
                    default_value: Some("changeme".to_string()),
                    current_value: String::new(),
                    description: String::new(),
                },
            ],
        );

        apply_current_or_default(&mut target, Some(&source));
        assert_eq!(target.secrets[0].current_value, "rotated");
        assert_eq!(target.secrets[1].current_value, "changeme");
    }
}
