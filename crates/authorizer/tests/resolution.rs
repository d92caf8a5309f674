//! Loading and resolving configuration files

use authorizer::descriptor::{AuthenticationType, BodyType, Method};
use authorizer::error::ConfigurationError;
use authorizer::loader;
use pretty_assertions::assert_eq;
use std::path::{Path, PathBuf};

fn write_config(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

const CONFIG: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<config xmlns="http://humanistika.org/ns/tei-authorizer">
    <server>
        <baseUrl>http://srv</baseUrl>
        <authentication>
            <type>preemptive-basic</type>
            <username>bob</username>
            <password>s3cret</password>
        </authentication>
    </server>
    <namespaceBindings>
        <binding>
            <prefix>tei</prefix>
            <namespace>http://www.tei-c.org/ns/1.0</namespace>
        </binding>
    </namespaceBindings>
    <autoComplete>
        <context>//tei:w</context>
        <attribute>ana</attribute>
        <dependent>
            <value>@lemma</value>
        </dependent>
        <selection>@ana</selection>
        <request>
            <url>$baseUrl/lookup?u=$username</url>
        </request>
    </autoComplete>
    <autoComplete>
        <namespaceBindings>
            <binding>
                <prefix>tei</prefix>
                <namespace>urn:other</namespace>
            </binding>
        </namespaceBindings>
        <context>//tei:persName</context>
        <attribute>ref</attribute>
        <selection>@ref</selection>
        <request>
            <server>
                <baseUrl>http://persons</baseUrl>
                <authentication>
                    <type>digest</type>
                    <username>alice</username>
                    <password>pw</password>
                </authentication>
            </server>
            <url>$baseUrl/search</url>
        </request>
        <response>
            <transformation>xsl/persons.xsl</transformation>
        </response>
        <upload>
            <url>$baseUrl/upload?value=$suggestion&amp;u=$username</url>
            <body>
                <type>xml</type>
                <includeDependent>true</includeDependent>
                <transformation>xsl/upload.xsl</transformation>
            </body>
            <userFields>
                <userField>
                    <name>lemma</name>
                    <label>Lemma</label>
                    <required>true</required>
                    <validateWith>[a-z]+</validateWith>
                </userField>
            </userFields>
        </upload>
    </autoComplete>
</config>
"#;

#[test]
fn global_settings_are_inherited() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(dir.path(), "config.xml", CONFIG);

    let configuration = loader::try_load(&path).unwrap();
    assert_eq!(configuration.rules.len(), 2);

    insta::assert_json_snapshot!(configuration.rule(1).unwrap().request, @r###"
    {
      "namespaceBindings": {
        "tei": "http://www.tei-c.org/ns/1.0"
      },
      "context": "//tei:w",
      "attribute": "ana",
      "dependent": {
        "default": null,
        "value": "@lemma"
      },
      "selection": "@ana",
      "url": "http://srv/lookup?u=bob",
      "authentication": {
        "type": "PREEMPTIVE_BASIC",
        "username": "bob"
      },
      "responseTransformation": null
    }
    "###);
}

#[test]
fn rule_settings_override_global_ones() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(dir.path(), "config.xml", CONFIG);

    let configuration = loader::try_load(&path).unwrap();
    let rule = configuration.rule(2).unwrap();

    assert_eq!(rule.request.url.as_str(), "http://persons/search");
    assert_eq!(
        rule.request.namespace_bindings.get("tei").map(String::as_str),
        Some("urn:other")
    );
    let authentication = rule.request.authentication.as_ref().unwrap();
    assert_eq!(authentication.authentication_type, AuthenticationType::Digest);
    assert_eq!(authentication.username, "alice");

    let upload = rule.upload.as_ref().unwrap();
    assert_eq!(upload.method, Method::Post);
    assert_eq!(
        upload.authentication.as_ref().unwrap().authentication_type,
        AuthenticationType::PreemptiveBasic
    );
    assert_eq!(upload.url, "http://srv/upload?value=$suggestion&u=bob");
}

#[test]
fn transformations_are_relative_to_the_configuration_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(dir.path(), "config.xml", CONFIG);

    let configuration = loader::try_load(&path).unwrap();
    let rule = configuration.rule(2).unwrap();

    assert_eq!(
        rule.request.response_transformation,
        Some(dir.path().join("xsl/persons.xsl"))
    );

    let body = rule.upload.as_ref().unwrap().body.as_ref().unwrap();
    assert_eq!(body.body_type, BodyType::Xml);
    assert!(!body.include_selection);
    assert!(body.include_dependent);
    assert_eq!(body.transformation, Some(dir.path().join("xsl/upload.xsl")));
}

#[test]
fn user_fields_are_compiled() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(dir.path(), "config.xml", CONFIG);

    let configuration = loader::try_load(&path).unwrap();
    let upload = configuration.rule(2).unwrap().upload.as_ref().unwrap();
    let lemma = upload.user_field("lemma").unwrap();

    assert_eq!(lemma.label.as_deref(), Some("Lemma"));
    assert!(lemma.required);
    assert!(lemma.accept("cat").is_ok());
    assert!(lemma.accept("Cat").is_err());
    assert!(lemma.accept("cats and dogs").is_err());
    assert!(lemma.accept(" ").is_err());
}

#[test]
fn rule_without_base_url_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(
        dir.path(),
        "config.json",
        r#"{"autoComplete": [
            {"context": "//w", "attribute": "ana", "selection": "@ana",
             "request": {"url": "$baseUrl/lookup"}},
            {"context": "//w", "attribute": "lemma", "selection": "@lemma",
             "request": {"url": "http://srv/lemmas"}}
        ]}"#,
    );

    let configuration = loader::try_load(&path).unwrap();
    assert_eq!(configuration.rules.len(), 1);
    assert!(configuration.rule(1).is_none());
    assert_eq!(configuration.rule(2).unwrap().request.attribute, "lemma");
}

#[test]
fn invalid_validation_pattern_fails_the_whole_configuration() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(
        dir.path(),
        "config.yaml",
        r#"
autoComplete:
  - context: //w
    attribute: ana
    selection: "@ana"
    request:
      url: http://srv/lookup
    upload:
      url: http://srv/upload
      body:
        type: form
      userFields:
        userField:
          - name: lemma
            validateWith: "[a-z"
"#,
    );

    let error = loader::try_load(&path).unwrap_err();
    assert!(
        matches!(error, ConfigurationError::InvalidPattern { ref field, .. } if field == "lemma")
    );
    assert_eq!(loader::load(&path), None);
}

#[test]
fn put_without_body_fails_the_whole_configuration() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(
        dir.path(),
        "config.yaml",
        r#"
autoComplete:
  - context: //w
    attribute: ana
    selection: "@ana"
    request:
      url: http://srv/lookup
    upload:
      method: put
      url: http://srv/upload?value=$suggestion
"#,
    );

    assert!(matches!(
        loader::try_load(&path),
        Err(ConfigurationError::PutWithoutBody { .. })
    ));
}

#[test]
fn resolved_rules_never_expose_passwords() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(dir.path(), "config.xml", CONFIG);

    let configuration = loader::try_load(&path).unwrap();
    let json = serde_json::to_string(&configuration).unwrap();

    assert!(json.contains("\"username\":\"bob\""));
    assert!(!json.contains("s3cret"));
    assert!(!json.contains("\"pw\""));
}
