use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{Display, EnumString};
use validator::Validate;

/// Value type of a configuration parameter.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ConfigParameterType {
    String,
    Bool,
    IntNumber,
    FloatNumber,
    List,
    Object,
}

impl ConfigParameterType {
    /// LIST and OBJECT parameters carry a schema for their values.
    pub fn is_structured(self) -> bool {
        matches!(self, Self::List | Self::Object)
    }
}

/// Kind of configuration item addressed by a value change.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display,
)]
pub enum ConfigItemType {
    #[serde(rename = "PARAMETER")]
    #[strum(serialize = "PARAMETER")]
    Parameter,
    #[serde(rename = "FEATUREFLAG")]
    #[strum(serialize = "FEATUREFLAG")]
    FeatureFlag,
    #[serde(rename = "SECRET")]
    #[strum(serialize = "SECRET")]
    Secret,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ConfigParameter {
    #[validate(length(min = 1))]
    pub name: String,
    #[serde(rename = "type")]
    pub param_type: ConfigParameterType,
    pub default_value: Value,
    pub current_value: Value,
    pub description: String,
    /// Schema for LIST/OBJECT parameter values, as a JSON document string.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub json_schema: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ConfigFeatureFlag {
    #[validate(length(min = 1))]
    pub name: String,
    pub default_value: bool,
    pub current_value: bool,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ConfigSecret {
    #[validate(length(min = 1))]
    pub name: String,
    /// Secrets are not required to carry a default.
    pub default_value: Option<String>,
    pub current_value: String,
    pub description: String,
}

/// One immutable `(schemaVersion, iterationNumber)` snapshot of a family.
///
/// Global sets are scoped by environment only; bounded-context sets also
/// carry `boundedContextName`. Stored rows are never edited in place - a
/// mutation appends a new row with an incremented iteration number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ConfigurationSet {
    #[validate(length(min = 1))]
    pub environment_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1))]
    pub bounded_context_name: Option<String>,
    pub schema_version: String,
    pub iteration_number: u32,
    #[validate(nested)]
    pub parameters: Vec<ConfigParameter>,
    #[validate(nested)]
    pub feature_flags: Vec<ConfigFeatureFlag>,
    #[validate(nested)]
    pub secrets: Vec<ConfigSecret>,
}

impl ConfigurationSet {
    pub fn is_global(&self) -> bool {
        self.bounded_context_name.is_none()
    }

    pub fn family_key(&self) -> FamilyKey {
        FamilyKey {
            environment_name: self.environment_name.clone(),
            bounded_context_name: self.bounded_context_name.clone(),
        }
    }

    /// Case-insensitive membership check across all three item collections.
    pub fn has(&self, name: &str) -> bool {
        let upper = name.to_uppercase();
        self.parameters.iter().any(|p| p.name.to_uppercase() == upper)
            || self
                .feature_flags
                .iter()
                .any(|f| f.name.to_uppercase() == upper)
            || self.secrets.iter().any(|s| s.name.to_uppercase() == upper)
    }

    /// All item names, in declaration order (parameters, flags, secrets).
    pub fn all_keys(&self) -> Vec<&str> {
        self.parameters
            .iter()
            .map(|p| p.name.as_str())
            .chain(self.feature_flags.iter().map(|f| f.name.as_str()))
            .chain(self.secrets.iter().map(|s| s.name.as_str()))
            .collect()
    }

    pub fn find_parameter(&self, name: &str) -> Option<&ConfigParameter> {
        let upper = name.to_uppercase();
        self.parameters.iter().find(|p| p.name.to_uppercase() == upper)
    }

    pub fn find_feature_flag(&self, name: &str) -> Option<&ConfigFeatureFlag> {
        let upper = name.to_uppercase();
        self.feature_flags
            .iter()
            .find(|f| f.name.to_uppercase() == upper)
    }

    pub fn find_secret(&self, name: &str) -> Option<&ConfigSecret> {
        let upper = name.to_uppercase();
        self.secrets.iter().find(|s| s.name.to_uppercase() == upper)
    }
}

/// Identity scope of a configuration set family.
///
/// Equality and hashing are case-insensitive, matching item-name semantics:
/// `("dev", "accounts")` and `("DEV", "Accounts")` address the same family.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FamilyKey {
    pub environment_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bounded_context_name: Option<String>,
}

impl FamilyKey {
    pub fn global(environment_name: impl Into<String>) -> Self {
        Self {
            environment_name: environment_name.into(),
            bounded_context_name: None,
        }
    }

    pub fn bounded_context(
        environment_name: impl Into<String>,
        bounded_context_name: impl Into<String>,
    ) -> Self {
        Self {
            environment_name: environment_name.into(),
            bounded_context_name: Some(bounded_context_name.into()),
        }
    }

    pub fn is_global(&self) -> bool {
        self.bounded_context_name.is_none()
    }

    /// Normalized index form, usable as a map key.
    pub fn index(&self) -> String {
        match &self.bounded_context_name {
            Some(bc) => format!(
                "{}::{}",
                self.environment_name.to_uppercase(),
                bc.to_uppercase()
            ),
            None => self.environment_name.to_uppercase(),
        }
    }
}

impl PartialEq for FamilyKey {
    fn eq(&self, other: &Self) -> bool {
        self.index() == other.index()
    }
}

impl Eq for FamilyKey {}

impl std::hash::Hash for FamilyKey {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.index().hash(state);
    }
}

impl std::fmt::Display for FamilyKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.bounded_context_name {
            Some(bc) => write!(f, "{}::{}", self.environment_name, bc),
            None => write!(f, "{}", self.environment_name),
        }
    }
}

/// One entry in a change-values command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigValueChange {
    #[serde(rename = "type")]
    pub item_type: ConfigItemType,
    pub name: String,
    pub value: Value,
}

/// Payload published once per successful bootstrap or change-values call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigChangeEvent {
    #[serde(flatten)]
    pub family: FamilyKey,
    pub schema_version: String,
    pub iteration_number: u32,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, Display,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum AuditAction {
    SchemaVersionCreated,
    ValuesChanged,
}

/// One audit record per successful mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditRecord {
    pub id: uuid::Uuid,
    pub action: AuditAction,
    #[serde(flatten)]
    pub family: FamilyKey,
    pub schema_version: String,
    pub iteration_number: u32,
    pub timestamp: i64,
}

impl AuditRecord {
    pub fn new(action: AuditAction, family: FamilyKey, schema_version: &str, iteration_number: u32) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            action,
            family,
            schema_version: schema_version.to_string(),
            iteration_number,
            timestamp: chrono::Utc::now().timestamp(),
        }
    }
}
