//! resolved descriptors and runtime values
//!
//! Everything in here is produced once by [crate::resolve::ConfigResolver] and is
//! immutable afterwards, except for [SuggestedValue] and [SubmissionOutcome]
//! which live for the duration of a single submission.
use crate::error::ConfigurationError;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::str::FromStr;

/// Prefix to namespace URI
pub type NamespaceBindings = BTreeMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthenticationType {
    None,
    PreemptiveBasic,
    NonPreemptiveBasic,
    Digest,
    NonPreemptiveBasicDigest,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, derive_new::new)]
pub struct Authentication {
    #[serde(rename = "type")]
    pub authentication_type: AuthenticationType,
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, derive_new::new)]
pub struct Dependent {
    pub default: Option<String>,
    pub value: String,
}

/// How to fetch candidate values for one attribute
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestDescriptor {
    pub namespace_bindings: NamespaceBindings,
    pub context: String,
    pub attribute: String,
    pub dependent: Option<Dependent>,
    pub selection: String,
    pub url: url::Url,
    pub authentication: Option<Authentication>,
    pub response_transformation: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(try_from = "String", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Method {
    #[default]
    Post,
    Put,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BodyType {
    Xml,
    Json,
    Form,
}

impl BodyType {
    pub fn content_type(self) -> &'static str {
        match self {
            BodyType::Xml => "application/xml",
            BodyType::Json => "application/json",
            BodyType::Form => "application/x-www-form-urlencoded",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(try_from = "String", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Compression {
    #[default]
    None,
    Gzip,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BodyInfo {
    pub body_type: BodyType,
    pub compression: Compression,
    pub include_selection: bool,
    pub include_dependent: bool,
    pub transformation: Option<PathBuf>,
}

/// Where and how to submit a new suggestion
///
/// Without [BodyInfo] the suggestion travels in the query string only, which
/// is only valid for [Method::Post].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadDescriptor {
    pub method: Method,
    /// still contains submission-time tokens like `$suggestion`
    pub url: String,
    pub authentication: Option<Authentication>,
    pub body: Option<BodyInfo>,
    pub user_fields: Option<Vec<UserFieldInfo>>,
}

impl UploadDescriptor {
    /// Reject combinations that must never reach the network
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        match (self.method, &self.body) {
            (Method::Put, None) => Err(ConfigurationError::PutWithoutBody {
                url: self.url.clone(),
            }),
            (Method::Put, Some(_)) | (Method::Post, _) => Ok(()),
        }
    }

    pub fn user_field(&self, name: &str) -> Option<&UserFieldInfo> {
        self.user_fields
            .iter()
            .flatten()
            .find(|field| field.name == name)
    }
}

/// An extra value the user enters alongside a suggestion
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserFieldInfo {
    pub name: String,
    pub label: Option<String>,
    pub multiline: bool,
    pub required: bool,
    pub initial_value: Option<String>,
    pub default_value: Option<String>,
    pub validation_pattern: Option<ValidationPattern>,
}

impl UserFieldInfo {
    /// Check what the user entered and turn it into the value to submit
    ///
    /// Empty input falls back to the default value when there is one. Blank
    /// input is acceptable whenever a default exists.
    pub fn accept(&self, input: &str) -> Result<UserValue, UserFieldError> {
        let blank = input.trim().is_empty();
        let has_default = self.default_value.is_some();

        if self.required && blank && !has_default {
            return Err(UserFieldError::Required {
                field: self.name.clone(),
            });
        }

        if let Some(pattern) = &self.validation_pattern {
            if !(has_default && blank) && !pattern.is_match(input) {
                return Err(UserFieldError::Mismatch {
                    field: self.name.clone(),
                    pattern: pattern.as_str().to_string(),
                });
            }
        }

        let value = match &self.default_value {
            Some(default) if input.is_empty() => default.clone(),
            _ => input.to_string(),
        };

        Ok(UserValue::new(self.name.clone(), value))
    }
}

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum UserFieldError {
    #[error("`{field}` is required")]
    Required { field: String },
    #[error("`{field}` must match `{pattern}`")]
    Mismatch { field: String, pattern: String },
}

/// Compiled user field validator
///
/// Matches against the entire input.
#[derive(Debug, Clone)]
pub struct ValidationPattern {
    pattern: String,
    regex: regex::Regex,
}

impl ValidationPattern {
    pub fn compile(field: &str, pattern: &str) -> Result<Self, ConfigurationError> {
        let regex = regex::Regex::new(&format!("^(?:{pattern})$")).map_err(|source| {
            ConfigurationError::InvalidPattern {
                field: field.to_string(),
                source,
            }
        })?;

        Ok(Self {
            pattern: pattern.to_string(),
            regex,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.pattern
    }

    pub fn is_match(&self, input: &str) -> bool {
        self.regex.is_match(input)
    }
}

impl PartialEq for ValidationPattern {
    fn eq(&self, other: &Self) -> bool {
        self.pattern == other.pattern
    }
}

impl Serialize for ValidationPattern {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.pattern)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, derive_new::new)]
pub struct UserValue {
    pub name: String,
    pub value: String,
}

/// What the user entered for a new suggestion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuggestedValue {
    pub text: String,
    pub description: Option<String>,
    pub user_values: Option<Vec<UserValue>>,
}

impl SuggestedValue {
    pub fn new(
        text: impl Into<String>,
        description: Option<String>,
        user_values: Option<Vec<UserValue>>,
    ) -> Self {
        Self {
            text: text.into(),
            description: description.filter(|description| !description.is_empty()),
            user_values,
        }
    }
}

/// Result of one submission attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmissionOutcome {
    pub success: bool,
    pub message: Option<String>,
}

impl SubmissionOutcome {
    pub fn accepted() -> Self {
        Self {
            success: true,
            message: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
        }
    }
}

/// `Gzip`, `GZIP`, `gzip` and friends; `-` and `_` are interchangeable
fn normalized(value: &str) -> String {
    value.trim().to_ascii_lowercase().replace('_', "-")
}

impl FromStr for Method {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalized(s).as_str() {
            "post" => Ok(Method::Post),
            "put" => Ok(Method::Put),
            _ => Err(ConfigurationError::UnknownVariant {
                kind: "upload method",
                value: s.to_string(),
            }),
        }
    }
}

impl FromStr for BodyType {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalized(s).as_str() {
            "xml" => Ok(BodyType::Xml),
            "json" => Ok(BodyType::Json),
            "form" => Ok(BodyType::Form),
            _ => Err(ConfigurationError::UnknownVariant {
                kind: "body type",
                value: s.to_string(),
            }),
        }
    }
}

impl FromStr for Compression {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalized(s).as_str() {
            "none" => Ok(Compression::None),
            "gzip" => Ok(Compression::Gzip),
            _ => Err(ConfigurationError::UnknownVariant {
                kind: "body encoding",
                value: s.to_string(),
            }),
        }
    }
}

macro_rules! try_from_string {
    ($($ty:ty),+) => {
        $(
            impl TryFrom<String> for $ty {
                type Error = ConfigurationError;

                fn try_from(value: String) -> Result<Self, Self::Error> {
                    value.parse()
                }
            }
        )+
    };
}

try_from_string!(Method, BodyType, Compression);
