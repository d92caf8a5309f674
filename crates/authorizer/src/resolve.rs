//! expansion of the raw configuration into resolved descriptors
//!
//! Every rule inherits from the global section of the configuration:
//!
//! | concern            | rule level                      | global level         | neither          |
//! |--------------------|---------------------------------|----------------------|------------------|
//! | authentication     | `request.server`/`upload.server` | `server`             | none             |
//! | base URL           | `request.server`/`upload.server` | `server`             | `""` + warning   |
//! | namespace bindings | `namespaceBindings` (wins)       | `namespaceBindings`  | empty            |
//!
//! Inheritance is never deeper than these two levels. The request and the upload
//! side of a rule resolve independently of each other.
use crate::descriptor::{
    Authentication, AuthenticationType, BodyInfo, Dependent, NamespaceBindings,
    RequestDescriptor, UploadDescriptor, UserFieldInfo, ValidationPattern,
};
use crate::error::ConfigurationError;
use crate::raw::{
    AuthenticationScheme, RawAuthentication, RawAutoComplete, RawBody, RawConfig,
    RawNamespaceBindings, RawServer, RawUpload, RawUserField,
};
use crate::url_template::{self, Substitutions, UrlVar};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// All resolved rules of one configuration, in configuration order
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Configuration {
    pub rules: Vec<ResolvedRule>,
}

impl Configuration {
    /// Look up a rule by its 1-based position in the configuration file
    pub fn rule(&self, index: usize) -> Option<&ResolvedRule> {
        self.rules.iter().find(|rule| rule.index == index)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedRule {
    /// 1-based position in the configuration file
    pub index: usize,
    pub request: RequestDescriptor,
    pub upload: Option<UploadDescriptor>,
}

/// Rule level authentication wins over global authentication
pub fn resolve_authentication(
    global: Option<&RawServer>,
    specific: Option<&RawServer>,
) -> Option<Authentication> {
    specific
        .and_then(|server| server.authentication.as_ref())
        .or_else(|| global.and_then(|server| server.authentication.as_ref()))
        .map(authentication)
}

fn authentication(raw: &RawAuthentication) -> Authentication {
    let authentication_type = match raw.scheme {
        AuthenticationScheme::None => AuthenticationType::None,
        AuthenticationScheme::PreemptiveBasic => AuthenticationType::PreemptiveBasic,
        AuthenticationScheme::Basic => AuthenticationType::NonPreemptiveBasic,
        AuthenticationScheme::Digest => AuthenticationType::Digest,
        AuthenticationScheme::BasicDigest => AuthenticationType::NonPreemptiveBasicDigest,
    };

    Authentication::new(
        authentication_type,
        raw.username.clone(),
        raw.password.clone(),
    )
}

/// Union of both binding sets, rule level prefixes replace global ones
pub fn merge_namespace_bindings(
    global: Option<&RawNamespaceBindings>,
    specific: Option<&RawNamespaceBindings>,
) -> NamespaceBindings {
    let mut merged = NamespaceBindings::new();
    for binding in global.into_iter().chain(specific).flat_map(|b| &b.binding) {
        merged.insert(binding.prefix.clone(), binding.namespace.clone());
    }
    merged
}

/// Rule level base URL wins over the global one
pub fn resolve_base_url<'c>(
    global: Option<&'c RawServer>,
    specific: Option<&'c RawServer>,
) -> Option<&'c str> {
    specific
        .and_then(|server| server.base_url.as_deref())
        .or_else(|| global.and_then(|server| server.base_url.as_deref()))
}

/// Turns a [RawConfig] into a [Configuration]
///
/// Relative transformation paths are resolved against the directory of the
/// configuration file, never against the working directory.
#[derive(Debug, Clone)]
pub struct ConfigResolver {
    config_dir: PathBuf,
}

impl ConfigResolver {
    /// `config_file` is the file the raw configuration was read from
    pub fn new(config_file: &Path) -> Self {
        let config_dir = config_file
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        Self { config_dir }
    }

    #[tracing::instrument(level = "debug", skip_all, fields(rules = raw.auto_complete.len()))]
    pub fn resolve(&self, raw: &RawConfig) -> Result<Configuration, ConfigurationError> {
        let mut rules = Vec::with_capacity(raw.auto_complete.len());

        for (position, auto_complete) in raw.auto_complete.iter().enumerate() {
            let index = position + 1;
            match self.resolve_rule(raw, auto_complete, index) {
                Ok(rule) => rules.push(rule),
                Err(ConfigurationError::MalformedUrl(error)) => {
                    tracing::warn!(index, url = %error.url, source = %error.source, "skipping auto-complete with malformed request url");
                }
                Err(error) => return Err(error),
            }
        }

        tracing::debug!(resolved = rules.len(), "configuration resolved");
        Ok(Configuration { rules })
    }

    fn resolve_rule(
        &self,
        raw: &RawConfig,
        auto_complete: &RawAutoComplete,
        index: usize,
    ) -> Result<ResolvedRule, ConfigurationError> {
        let global = raw.server.as_ref();
        let request_server = auto_complete.request.server.as_ref();

        let namespace_bindings = merge_namespace_bindings(
            raw.namespace_bindings.as_ref(),
            auto_complete.namespace_bindings.as_ref(),
        );

        let dependent = auto_complete
            .dependent
            .as_ref()
            .map(|dependent| Dependent::new(dependent.default.clone(), dependent.value.clone()));

        let authentication = resolve_authentication(global, request_server);
        let url = expand_configured_url(
            &auto_complete.request.url,
            resolve_base_url(global, request_server),
            authentication.as_ref(),
            index,
            "request",
        );
        let url = url_template::parse(url)?;

        let response_transformation = auto_complete
            .response
            .as_ref()
            .map(|response| self.config_dir.join(&response.transformation));

        let upload = auto_complete
            .upload
            .as_ref()
            .map(|upload| self.resolve_upload(global, upload, index))
            .transpose()?;

        Ok(ResolvedRule {
            index,
            request: RequestDescriptor {
                namespace_bindings,
                context: auto_complete.context.clone(),
                attribute: auto_complete.attribute.clone(),
                dependent,
                selection: auto_complete.selection.clone(),
                url,
                authentication,
                response_transformation,
            },
            upload,
        })
    }

    fn resolve_upload(
        &self,
        global: Option<&RawServer>,
        upload: &RawUpload,
        index: usize,
    ) -> Result<UploadDescriptor, ConfigurationError> {
        let authentication = resolve_authentication(global, upload.server.as_ref());
        let url = expand_configured_url(
            &upload.url,
            resolve_base_url(global, upload.server.as_ref()),
            authentication.as_ref(),
            index,
            "upload",
        );

        let user_fields = upload
            .user_fields
            .as_ref()
            .map(|fields| {
                fields
                    .user_field
                    .iter()
                    .map(user_field)
                    .collect::<Result<Vec<_>, _>>()
            })
            .transpose()?;

        let descriptor = UploadDescriptor {
            method: upload.method,
            url,
            authentication,
            body: upload.body.as_ref().map(|body| self.body_info(body)),
            user_fields,
        };

        descriptor.validate()?;
        Ok(descriptor)
    }

    fn body_info(&self, body: &RawBody) -> BodyInfo {
        BodyInfo {
            body_type: body.body_type,
            compression: body.encoding.unwrap_or_default(),
            include_selection: body.include_selection,
            include_dependent: body.include_dependent,
            transformation: body
                .transformation
                .as_ref()
                .map(|transformation| self.config_dir.join(transformation)),
        }
    }
}

fn user_field(raw: &RawUserField) -> Result<UserFieldInfo, ConfigurationError> {
    let validation_pattern = raw
        .validate_with
        .as_deref()
        .map(|pattern| ValidationPattern::compile(&raw.name, pattern))
        .transpose()?;

    Ok(UserFieldInfo {
        name: raw.name.clone(),
        label: raw.label.clone(),
        multiline: raw.multiline,
        required: raw.required,
        initial_value: raw.initial_value.clone(),
        default_value: raw.default_value.clone(),
        validation_pattern,
    })
}

/// `$baseUrl` first, then the credentials of the resolved authentication
fn expand_configured_url(
    template: &str,
    base_url: Option<&str>,
    authentication: Option<&Authentication>,
    index: usize,
    section: &str,
) -> String {
    let base_url = base_url.unwrap_or_else(|| {
        tracing::warn!(index, section, "no base url specified for auto-complete");
        ""
    });

    let mut substitutions = Substitutions::from([(UrlVar::BaseUrl, base_url)]);
    if let Some(authentication) = authentication {
        substitutions.insert(UrlVar::Username, authentication.username.as_str());
        substitutions.insert(UrlVar::Password, authentication.password.as_str());
    }

    url_template::expand(template, &substitutions)
}
