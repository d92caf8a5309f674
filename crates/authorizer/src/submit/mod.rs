//! sending new suggestions to their upload target
//!
//! [SubmissionClient::submit] is the only entry point callers need. It never fails:
//! every problem on the way, from a malformed URL to a refused connection, ends up
//! as a failed [SubmissionOutcome] with a message that can be shown to a user.
//!
//! ```text
//! UploadDescriptor + SubmissionValues
//!   -> url expansion ($suggestion, $description, ...)
//!   -> body (xml | json | form, optional transformation, optional gzip)
//!   -> request (credentials up front or after a 401 challenge)
//!   -> SubmissionOutcome
//! ```
pub mod auth;
pub mod body;

use crate::descriptor::{
    Authentication, Method, SubmissionOutcome, SuggestedValue, UploadDescriptor, UserValue,
};
use crate::error::SubmissionError;
use crate::transform::{Transformer, UnavailableTransformer};
use crate::url_template::{self, Substitutions, UrlVar};
use body::{BodyBuilder, PreparedBody};
use reqwest::blocking::{Client, Response};
use reqwest::header::{AUTHORIZATION, CONTENT_ENCODING, CONTENT_TYPE};
use reqwest::StatusCode;
use std::sync::Arc;
use std::time::Duration;

/// Runtime values of one submission
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubmissionValues<'a> {
    pub suggestion: &'a str,
    pub description: Option<&'a str>,
    pub selection_value: Option<&'a str>,
    pub dependent_value: Option<&'a str>,
    pub user_values: Option<&'a [UserValue]>,
}

impl<'a> SubmissionValues<'a> {
    pub fn new(suggestion: &'a str) -> Self {
        Self {
            suggestion,
            ..Self::default()
        }
    }

    /// Values of a [SuggestedValue] together with the context it was entered in
    pub fn from_suggested(
        suggested: &'a SuggestedValue,
        selection_value: Option<&'a str>,
        dependent_value: Option<&'a str>,
    ) -> Self {
        Self::new(&suggested.text)
            .description(suggested.description.as_deref())
            .selection_value(selection_value)
            .dependent_value(dependent_value)
            .user_values(suggested.user_values.as_deref())
    }

    pub fn description(self, description: Option<&'a str>) -> Self {
        Self {
            description,
            ..self
        }
    }

    pub fn selection_value(self, selection_value: Option<&'a str>) -> Self {
        Self {
            selection_value,
            ..self
        }
    }

    pub fn dependent_value(self, dependent_value: Option<&'a str>) -> Self {
        Self {
            dependent_value,
            ..self
        }
    }

    pub fn user_values(self, user_values: Option<&'a [UserValue]>) -> Self {
        Self {
            user_values,
            ..self
        }
    }

    fn substitutions(&self, authentication: Option<&'a Authentication>) -> Substitutions<'a> {
        let mut substitutions = Substitutions::from([(UrlVar::Suggestion, self.suggestion)]);

        if let Some(authentication) = authentication {
            substitutions.insert(UrlVar::Username, authentication.username.as_str());
        }

        let optional = [
            (UrlVar::Description, self.description),
            (UrlVar::SelectionValue, self.selection_value),
            (UrlVar::DependentValue, self.dependent_value),
        ];
        for (var, value) in optional {
            if let Some(value) = value {
                substitutions.insert(var, value);
            }
        }

        substitutions
    }
}

/// Sends suggestions, holds no state between calls besides its connection pool
#[derive(Clone)]
pub struct SubmissionClient {
    http: Client,
    xml_transformer: Arc<dyn Transformer>,
    json_transformer: Arc<dyn Transformer>,
}

impl std::fmt::Debug for SubmissionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubmissionClient")
            .field("http", &self.http)
            .finish_non_exhaustive()
    }
}

impl SubmissionClient {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    pub fn new() -> Result<Self, SubmissionError> {
        Self::with_timeout(Self::DEFAULT_TIMEOUT)
    }

    /// `timeout` covers connecting as well as reading the response
    pub fn with_timeout(timeout: Duration) -> Result<Self, SubmissionError> {
        let http = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()?;

        Ok(Self {
            http,
            xml_transformer: Arc::new(UnavailableTransformer),
            json_transformer: Arc::new(UnavailableTransformer),
        })
    }

    pub fn with_xml_transformer(self, transformer: Arc<dyn Transformer>) -> Self {
        Self {
            xml_transformer: transformer,
            ..self
        }
    }

    pub fn with_json_transformer(self, transformer: Arc<dyn Transformer>) -> Self {
        Self {
            json_transformer: transformer,
            ..self
        }
    }

    /// Send one suggestion and report how it went
    #[tracing::instrument(level = "debug", skip_all, fields(method = ?upload.method, url = %upload.url))]
    pub fn submit(
        &self,
        upload: &UploadDescriptor,
        values: &SubmissionValues<'_>,
    ) -> SubmissionOutcome {
        match self.try_submit(upload, values) {
            Ok(()) => {
                tracing::info!("suggestion accepted");
                SubmissionOutcome::accepted()
            }
            Err(error) => {
                tracing::error!(%error, "unable to submit suggestion");
                SubmissionOutcome::failed(error.reason())
            }
        }
    }

    /// [SubmissionClient::submit] with the failure kept as an error
    pub fn try_submit(
        &self,
        upload: &UploadDescriptor,
        values: &SubmissionValues<'_>,
    ) -> Result<(), SubmissionError> {
        upload.validate()?;

        let substitutions = values.substitutions(upload.authentication.as_ref());
        let url = url_template::expand_url(&upload.url, &substitutions)?;

        let body = match &upload.body {
            Some(body) => Some(
                BodyBuilder {
                    xml_transformer: self.xml_transformer.as_ref(),
                    json_transformer: self.json_transformer.as_ref(),
                }
                .build(body, values)?,
            ),
            None => None,
        };

        let response = self.dispatch(upload, url, body.as_ref())?;
        let status = response.status();
        tracing::debug!(%status, "upload response");

        if status.is_success() {
            Ok(())
        } else {
            Err(SubmissionError::Rejected { status })
        }
    }

    fn dispatch(
        &self,
        upload: &UploadDescriptor,
        url: url::Url,
        body: Option<&PreparedBody>,
    ) -> Result<Response, SubmissionError> {
        let authentication = upload.authentication.as_ref();
        let preemptive = authentication.and_then(auth::preemptive);

        let response = self.send(upload.method, url.clone(), body, preemptive)?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        let Some(authentication) = authentication else {
            return Ok(response);
        };

        let challenges = auth::challenges(response.headers());
        let uri = match url.query() {
            Some(query) => format!("{}?{query}", url.path()),
            None => url.path().to_string(),
        };

        match auth::answer(authentication, &challenges, method(upload.method).as_str(), &uri) {
            Some(credentials) => {
                tracing::debug!(?challenges, "answering authentication challenge");
                Ok(self.send(upload.method, url, body, Some(credentials))?)
            }
            None => Ok(response),
        }
    }

    fn send(
        &self,
        upload_method: Method,
        url: url::Url,
        body: Option<&PreparedBody>,
        credentials: Option<String>,
    ) -> Result<Response, reqwest::Error> {
        let mut request = self.http.request(method(upload_method), url);

        if let Some(body) = body {
            request = request
                .header(CONTENT_TYPE, body.content_type)
                .body(body.bytes.clone());
            if let Some(content_encoding) = body.content_encoding {
                request = request.header(CONTENT_ENCODING, content_encoding);
            }
        }

        if let Some(credentials) = credentials {
            request = request.header(AUTHORIZATION, credentials);
        }

        request.send()
    }
}

fn method(method: Method) -> reqwest::Method {
    match method {
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
    }
}
