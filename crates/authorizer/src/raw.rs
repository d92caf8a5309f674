//! configuration tree as it comes out of the file
//!
//! Field names follow the element names of the XML configuration; YAML and JSON
//! configurations use the same keys. Nothing in here is inherited or expanded
//! yet, see [crate::resolve] for that.
use crate::descriptor::{BodyType, Compression, Method};
use crate::error::ConfigurationError;
use serde::Deserialize;
use std::str::FromStr;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawConfig {
    pub server: Option<RawServer>,
    pub namespace_bindings: Option<RawNamespaceBindings>,
    #[serde(default)]
    pub auto_complete: Vec<RawAutoComplete>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawServer {
    pub base_url: Option<String>,
    pub authentication: Option<RawAuthentication>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawAuthentication {
    #[serde(rename = "type")]
    pub scheme: AuthenticationScheme,
    pub username: String,
    pub password: String,
}

/// Authentication as named in the configuration file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum AuthenticationScheme {
    None,
    PreemptiveBasic,
    Basic,
    Digest,
    BasicDigest,
}

impl FromStr for AuthenticationScheme {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "none" => Ok(AuthenticationScheme::None),
            "preemptive-basic" => Ok(AuthenticationScheme::PreemptiveBasic),
            "basic" => Ok(AuthenticationScheme::Basic),
            "digest" => Ok(AuthenticationScheme::Digest),
            "basic-digest" => Ok(AuthenticationScheme::BasicDigest),
            _ => Err(ConfigurationError::UnknownVariant {
                kind: "authentication type",
                value: s.to_string(),
            }),
        }
    }
}

impl TryFrom<String> for AuthenticationScheme {
    type Error = ConfigurationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawNamespaceBindings {
    #[serde(default)]
    pub binding: Vec<RawBinding>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawBinding {
    pub prefix: String,
    pub namespace: String,
}

/// One rule: where a value for `attribute` in `context` comes from
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawAutoComplete {
    pub namespace_bindings: Option<RawNamespaceBindings>,
    pub context: String,
    pub attribute: String,
    pub dependent: Option<RawDependent>,
    pub selection: String,
    pub request: RawRequest,
    pub response: Option<RawResponse>,
    pub upload: Option<RawUpload>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawDependent {
    pub default: Option<String>,
    pub value: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawRequest {
    pub server: Option<RawServer>,
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawResponse {
    pub transformation: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawUpload {
    #[serde(default)]
    pub method: Method,
    pub server: Option<RawServer>,
    pub url: String,
    pub body: Option<RawBody>,
    pub user_fields: Option<RawUserFields>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawBody {
    #[serde(rename = "type")]
    pub body_type: BodyType,
    pub encoding: Option<Compression>,
    #[serde(default)]
    pub include_selection: bool,
    #[serde(default)]
    pub include_dependent: bool,
    pub transformation: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawUserFields {
    #[serde(default)]
    pub user_field: Vec<RawUserField>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawUserField {
    pub name: String,
    pub label: Option<String>,
    #[serde(default)]
    pub multiline: bool,
    #[serde(default)]
    pub required: bool,
    pub initial_value: Option<String>,
    pub default_value: Option<String>,
    pub validate_with: Option<String>,
}
