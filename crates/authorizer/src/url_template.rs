//! `$variable` substitution in configured URLs
//!
//! A configured URL is a plain string containing zero or more tokens such as
//! `$baseUrl` or `$suggestion`. Each [UrlVar] owns exactly one token, derived
//! from its enumerated name (`SELECTION_VALUE` becomes `$selectionValue`).
//!
//! Substitution is literal: values are inserted as-is, without escaping. Tokens
//! of variables that are not part of the substitution map stay in the output.
use indexmap::IndexMap;
use regex::{Captures, Regex};
use std::sync::LazyLock;

/// Variables that may appear in a configured URL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UrlVar {
    Username,
    Password,
    BaseUrl,
    Suggestion,
    Description,
    SelectionValue,
    DependentValue,
}

impl UrlVar {
    pub const ALL: [UrlVar; 7] = [
        UrlVar::Username,
        UrlVar::Password,
        UrlVar::BaseUrl,
        UrlVar::Suggestion,
        UrlVar::Description,
        UrlVar::SelectionValue,
        UrlVar::DependentValue,
    ];

    /// Enumerated name, e.g. `SELECTION_VALUE`
    pub fn name(self) -> &'static str {
        match self {
            UrlVar::Username => "USERNAME",
            UrlVar::Password => "PASSWORD",
            UrlVar::BaseUrl => "BASE_URL",
            UrlVar::Suggestion => "SUGGESTION",
            UrlVar::Description => "DESCRIPTION",
            UrlVar::SelectionValue => "SELECTION_VALUE",
            UrlVar::DependentValue => "DEPENDENT_VALUE",
        }
    }

    /// Camel case form of [UrlVar::name], e.g. `selectionValue`
    pub fn camel_name(self) -> String {
        let mut camel = String::with_capacity(self.name().len());
        for (i, part) in self.name().split('_').enumerate() {
            let lower = part.to_ascii_lowercase();
            if i == 0 {
                camel.push_str(&lower);
                continue;
            }

            let mut chars = lower.chars();
            if let Some(first) = chars.next() {
                camel.push(first.to_ascii_uppercase());
                camel.push_str(chars.as_str());
            }
        }
        camel
    }

    /// Token as written in a configured URL, e.g. `$selectionValue`
    pub fn token(self) -> String {
        format!("${}", self.camel_name())
    }
}

/// Variable to value mapping used for one expansion
pub type Substitutions<'a> = IndexMap<UrlVar, &'a str>;

/// Any token, longest alternatives first
static TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\$(selectionValue|dependentValue|description|suggestion|username|password|baseUrl)",
    )
    .expect("token pattern")
});

/// Replace every token of a variable present in `substitutions`
///
/// The template is scanned once from left to right, inserted values are never
/// scanned again.
pub fn expand(template: &str, substitutions: &Substitutions<'_>) -> String {
    TOKEN
        .replace_all(template, |captures: &Captures| {
            let token = &captures[0];
            UrlVar::ALL
                .into_iter()
                .find(|var| var.camel_name() == captures[1])
                .and_then(|var| substitutions.get(&var))
                .map_or_else(|| token.to_string(), |value| value.to_string())
        })
        .into_owned()
}

/// [expand] and parse the result as an absolute URL
pub fn expand_url(
    template: &str,
    substitutions: &Substitutions<'_>,
) -> Result<url::Url, MalformedUrl> {
    parse(expand(template, substitutions))
}

/// Parse an already expanded URL, keeping the text around for the error
pub fn parse(url: String) -> Result<url::Url, MalformedUrl> {
    match url::Url::parse(&url) {
        Ok(parsed) => Ok(parsed),
        Err(source) => Err(MalformedUrl { url, source }),
    }
}

/// Result of an expansion that is not a valid absolute URL
#[derive(thiserror::Error, Debug)]
#[error("malformed url `{url}`")]
pub struct MalformedUrl {
    pub url: String,
    #[source]
    pub source: url::ParseError,
}
