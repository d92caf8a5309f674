//! HTTP Basic and Digest (RFC 2617) credentials
use crate::descriptor::{Authentication, AuthenticationType};
use base64::Engine as _;
use md5::{Digest, Md5};
use reqwest::header::{HeaderMap, WWW_AUTHENTICATE};

/// Authentication challenge offered by a server in a `401` response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Challenge {
    Basic,
    Digest(DigestChallenge),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DigestChallenge {
    pub realm: String,
    pub nonce: String,
    pub opaque: Option<String>,
    pub qop: Option<String>,
    pub algorithm: Option<String>,
}

/// `Authorization` header value for credentials that are sent unasked
pub fn preemptive(authentication: &Authentication) -> Option<String> {
    match authentication.authentication_type {
        AuthenticationType::PreemptiveBasic => Some(basic(authentication)),
        AuthenticationType::None
        | AuthenticationType::NonPreemptiveBasic
        | AuthenticationType::Digest
        | AuthenticationType::NonPreemptiveBasicDigest => None,
    }
}

/// `Authorization` header value answering one of `challenges`
///
/// `None` when the configured authentication can not answer any of them.
pub fn answer(
    authentication: &Authentication,
    challenges: &[Challenge],
    method: &str,
    uri: &str,
) -> Option<String> {
    let basic_offered = challenges.contains(&Challenge::Basic);
    let answer_basic = || basic_offered.then(|| basic(authentication));
    let answer_digest = || {
        challenges.iter().find_map(|challenge| match challenge {
            Challenge::Digest(digest) => digest.respond(authentication, method, uri, &cnonce()),
            Challenge::Basic => None,
        })
    };

    match authentication.authentication_type {
        AuthenticationType::None | AuthenticationType::PreemptiveBasic => None,
        AuthenticationType::NonPreemptiveBasic => answer_basic(),
        AuthenticationType::Digest => answer_digest(),
        AuthenticationType::NonPreemptiveBasicDigest => answer_digest().or_else(answer_basic),
    }
}

pub fn basic(authentication: &Authentication) -> String {
    let credentials = format!("{}:{}", authentication.username, authentication.password);
    format!(
        "Basic {}",
        base64::engine::general_purpose::STANDARD.encode(credentials)
    )
}

fn cnonce() -> String {
    format!("{:016x}", rand::random::<u64>())
}

/// All challenges from the `WWW-Authenticate` headers of a response
pub fn challenges(headers: &HeaderMap) -> Vec<Challenge> {
    headers
        .get_all(WWW_AUTHENTICATE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(parse_challenges)
        .collect()
}

/// Every supported challenge of one header value, e.g. `Digest realm="a", Basic realm="a"`
pub fn parse_challenges(header: &str) -> Vec<Challenge> {
    split_challenges(header)
        .into_iter()
        .filter_map(parse_challenge)
        .collect()
}

fn split_challenges(header: &str) -> Vec<&str> {
    let mut challenges = vec![];
    let mut start = 0;
    let mut in_quotes = false;
    let mut escaped = false;

    for (i, c) in header.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes && starts_scheme(&header[i + 1..]) => {
                challenges.push(header[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    challenges.push(header[start..].trim());

    challenges.retain(|challenge| !challenge.is_empty());
    challenges
}

/// A scheme name is a token that is not followed by `=`
fn starts_scheme(rest: &str) -> bool {
    let rest = rest.trim_start();
    let end = rest
        .find(|c: char| c == ' ' || c == '=' || c == ',')
        .unwrap_or(rest.len());

    end > 0 && !rest[end..].trim_start().starts_with('=')
}

/// A single challenge, `None` for schemes other than Basic and Digest
pub fn parse_challenge(header: &str) -> Option<Challenge> {
    let header = header.trim();
    let (scheme, params) = header.split_once(' ').unwrap_or((header, ""));

    if scheme.eq_ignore_ascii_case("basic") {
        return Some(Challenge::Basic);
    }

    if !scheme.eq_ignore_ascii_case("digest") {
        tracing::trace!(scheme, "ignoring unsupported authentication scheme");
        return None;
    }

    let mut digest = DigestChallenge::default();
    for (key, value) in parse_params(params) {
        match key.to_ascii_lowercase().as_str() {
            "realm" => digest.realm = value,
            "nonce" => digest.nonce = value,
            "opaque" => digest.opaque = Some(value),
            "qop" => digest.qop = Some(value),
            "algorithm" => digest.algorithm = Some(value),
            _ => {}
        }
    }

    Some(Challenge::Digest(digest))
}

/// `key=value, key="quoted, value"` pairs
fn parse_params(params: &str) -> Vec<(String, String)> {
    let mut pairs = vec![];
    let mut rest = params.trim();

    while !rest.is_empty() {
        let Some((key, after_key)) = rest.split_once('=') else {
            break;
        };
        let key = key.trim().trim_start_matches(',').trim().to_string();
        let after_key = after_key.trim_start();

        let (value, remainder) = if let Some(quoted) = after_key.strip_prefix('"') {
            let mut value = String::new();
            let mut chars = quoted.char_indices();
            let mut end = quoted.len();
            while let Some((i, c)) = chars.next() {
                match c {
                    '\\' => {
                        if let Some((_, escaped)) = chars.next() {
                            value.push(escaped);
                        }
                    }
                    '"' => {
                        end = i + 1;
                        break;
                    }
                    c => value.push(c),
                }
            }
            (value, &quoted[end..])
        } else {
            let end = after_key.find(',').unwrap_or(after_key.len());
            (after_key[..end].trim().to_string(), &after_key[end..])
        };

        pairs.push((key, value));
        rest = remainder.trim_start().trim_start_matches(',').trim_start();
    }

    pairs
}

impl DigestChallenge {
    /// `Digest ...` header value for one request
    ///
    /// `None` when the challenge asks for an algorithm other than MD5 or MD5-sess.
    pub fn respond(
        &self,
        authentication: &Authentication,
        method: &str,
        uri: &str,
        cnonce: &str,
    ) -> Option<String> {
        const NONCE_COUNT: &str = "00000001";

        let session = match self.algorithm.as_deref() {
            None => false,
            Some(algorithm) if algorithm.eq_ignore_ascii_case("MD5") => false,
            Some(algorithm) if algorithm.eq_ignore_ascii_case("MD5-sess") => true,
            Some(algorithm) => {
                tracing::debug!(algorithm, "unsupported digest algorithm");
                return None;
            }
        };
        let qop_auth = self
            .qop
            .as_deref()
            .is_some_and(|qop| qop.split(',').any(|option| option.trim() == "auth"));

        let mut ha1 = md5_hex(&format!(
            "{}:{}:{}",
            authentication.username, self.realm, authentication.password
        ));
        if session {
            ha1 = md5_hex(&format!("{ha1}:{}:{cnonce}", self.nonce));
        }
        let ha2 = md5_hex(&format!("{method}:{uri}"));

        let response = if qop_auth {
            md5_hex(&format!(
                "{ha1}:{}:{NONCE_COUNT}:{cnonce}:auth:{ha2}",
                self.nonce
            ))
        } else {
            md5_hex(&format!("{ha1}:{}:{ha2}", self.nonce))
        };

        let mut header = format!(
            r#"Digest username="{}", realm="{}", nonce="{}", uri="{uri}", response="{response}""#,
            authentication.username, self.realm, self.nonce
        );
        if let Some(algorithm) = &self.algorithm {
            header.push_str(&format!(", algorithm={algorithm}"));
        }
        if let Some(opaque) = &self.opaque {
            header.push_str(&format!(r#", opaque="{opaque}""#));
        }
        if qop_auth {
            header.push_str(&format!(
                r#", qop=auth, nc={NONCE_COUNT}, cnonce="{cnonce}""#
            ));
        }
        Some(header)
    }
}

fn md5_hex(input: &str) -> String {
    hex::encode(Md5::digest(input.as_bytes()))
}
