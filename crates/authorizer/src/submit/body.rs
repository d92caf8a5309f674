//! request bodies for the three body types
use super::SubmissionValues;
use crate::descriptor::{BodyInfo, BodyType, Compression, UserValue};
use crate::error::SubmissionError;
use crate::transform::Transformer;
use indexmap::IndexMap;
use serde::Serialize;
use std::io::Write;

/// Namespace of the `suggestion` element in XML bodies
pub const SUGGESTION_NAMESPACE: &str = "http://humanistika.org/ns/tei-authorizer";

/// Serialized form of a suggestion for XML and JSON bodies
#[derive(Debug, Serialize)]
#[serde(rename = "suggestion", rename_all = "camelCase")]
pub struct SuggestionRecord<'a> {
    #[serde(rename = "@xmlns", skip_serializing_if = "Option::is_none")]
    xmlns: Option<&'static str>,
    pub value: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selection_value: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dependent_value: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_values: Option<UserValues<'a>>,
}

#[derive(Debug, Serialize)]
pub struct UserValues<'a> {
    #[serde(rename = "userValue")]
    pub user_value: &'a [UserValue],
}

impl<'a> SuggestionRecord<'a> {
    /// Selection and dependent values only make it in when `body` asks for them
    pub fn new(body: &BodyInfo, values: &SubmissionValues<'a>) -> Self {
        Self {
            xmlns: None,
            value: values.suggestion,
            description: values.description,
            selection_value: values.selection_value.filter(|_| body.include_selection),
            dependent_value: values.dependent_value.filter(|_| body.include_dependent),
            user_values: values
                .user_values
                .filter(|user_values| !user_values.is_empty())
                .map(|user_value| UserValues { user_value }),
        }
    }

    pub fn to_xml(&self) -> Result<String, SubmissionError> {
        let namespaced = SuggestionRecord {
            xmlns: Some(SUGGESTION_NAMESPACE),
            user_values: self.user_values.as_ref().map(|user_values| UserValues {
                user_value: user_values.user_value,
            }),
            ..*self
        };

        quick_xml::se::to_string(&namespaced)
            .map_err(|error| SubmissionError::Serialization(error.to_string()))
    }

    pub fn to_json(&self) -> Result<Vec<u8>, SubmissionError> {
        serde_json::to_vec(self).map_err(|error| SubmissionError::Serialization(error.to_string()))
    }
}

/// Flat key/value pairs of a form body, in insertion order
///
/// User values use their field name as key and replace earlier entries of the same name.
pub fn form_fields<'a>(body: &BodyInfo, values: &SubmissionValues<'a>) -> IndexMap<&'a str, &'a str> {
    let mut fields = IndexMap::new();
    fields.insert("suggestion", values.suggestion);

    if let Some(description) = values.description {
        fields.insert("description", description);
    }

    if let Some(selection_value) = values.selection_value.filter(|_| body.include_selection) {
        fields.insert("selectionValue", selection_value);
    }

    if let Some(dependent_value) = values.dependent_value.filter(|_| body.include_dependent) {
        fields.insert("dependentValue", dependent_value);
    }

    for user_value in values.user_values.into_iter().flatten() {
        fields.insert(user_value.name.as_str(), user_value.value.as_str());
    }

    fields
}

/// A body ready to be sent, possibly more than once
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedBody {
    pub content_type: &'static str,
    pub content_encoding: Option<&'static str>,
    pub bytes: Vec<u8>,
}

pub struct BodyBuilder<'t> {
    pub xml_transformer: &'t dyn Transformer,
    pub json_transformer: &'t dyn Transformer,
}

impl BodyBuilder<'_> {
    pub fn build(
        &self,
        body: &BodyInfo,
        values: &SubmissionValues<'_>,
    ) -> Result<PreparedBody, SubmissionError> {
        let bytes = match body.body_type {
            BodyType::Xml => {
                let xml = SuggestionRecord::new(body, values).to_xml()?.into_bytes();
                self.transformed(self.xml_transformer, body, xml)?
            }
            BodyType::Json => {
                let json = SuggestionRecord::new(body, values).to_json()?;
                self.transformed(self.json_transformer, body, json)?
            }
            BodyType::Form => {
                let mut form = url::form_urlencoded::Serializer::new(String::new());
                for (key, value) in form_fields(body, values) {
                    form.append_pair(key, value);
                }
                form.finish().into_bytes()
            }
        };

        let (content_encoding, bytes) = match body.compression {
            Compression::None => (None, bytes),
            Compression::Gzip => (Some("gzip"), gzip(&bytes)?),
        };

        Ok(PreparedBody {
            content_type: body.body_type.content_type(),
            content_encoding,
            bytes,
        })
    }

    fn transformed(
        &self,
        transformer: &dyn Transformer,
        body: &BodyInfo,
        serialized: Vec<u8>,
    ) -> Result<Vec<u8>, SubmissionError> {
        let Some(transformation) = &body.transformation else {
            return Ok(serialized);
        };

        tracing::debug!(transformation = %transformation.display(), body_type = ?body.body_type, "transforming upload");
        Ok(transformer.transform(&serialized, transformation)?)
    }
}

fn gzip(bytes: &[u8]) -> Result<Vec<u8>, SubmissionError> {
    let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
    encoder
        .write_all(bytes)
        .map_err(SubmissionError::Compression)?;
    encoder.finish().map_err(SubmissionError::Compression)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::transform::{TransformationError, UnavailableTransformer};
    use pretty_assertions::assert_eq;
    use std::io::Read;
    use std::path::{Path, PathBuf};

    struct Uppercase;

    impl Transformer for Uppercase {
        fn transform(
            &self,
            input: &[u8],
            _transformation: &Path,
        ) -> Result<Vec<u8>, TransformationError> {
            Ok(input.to_ascii_uppercase())
        }
    }

    fn body(body_type: BodyType, include_selection: bool, include_dependent: bool) -> BodyInfo {
        BodyInfo {
            body_type,
            compression: Compression::None,
            include_selection,
            include_dependent,
            transformation: None,
        }
    }

    fn builder() -> BodyBuilder<'static> {
        BodyBuilder {
            xml_transformer: &UnavailableTransformer,
            json_transformer: &UnavailableTransformer,
        }
    }

    fn values() -> SubmissionValues<'static> {
        SubmissionValues::new("cat")
            .description(Some("animal"))
            .selection_value(Some("sel1"))
            .dependent_value(Some("dep1"))
    }

    #[test]
    fn form_fields_respect_include_flags() {
        let fields = form_fields(&body(BodyType::Form, true, false), &values());

        assert_eq!(
            fields,
            IndexMap::from([
                ("suggestion", "cat"),
                ("description", "animal"),
                ("selectionValue", "sel1"),
            ])
        );
    }

    #[test]
    fn form_fields_include_user_values() {
        let user_values = [
            UserValue::new("ana".to_string(), "noun".to_string()),
            UserValue::new("lemma".to_string(), "cat".to_string()),
        ];
        let values = SubmissionValues::new("cat").user_values(Some(user_values.as_slice()));

        let fields = form_fields(&body(BodyType::Form, true, true), &values);
        assert_eq!(
            fields,
            IndexMap::from([("suggestion", "cat"), ("ana", "noun"), ("lemma", "cat")])
        );
    }

    #[test]
    fn record_excludes_selection_unless_included() {
        let excluded = SuggestionRecord::new(&body(BodyType::Json, false, false), &values());
        assert_eq!(excluded.selection_value, None);
        assert_eq!(excluded.dependent_value, None);

        let included = SuggestionRecord::new(&body(BodyType::Json, true, true), &values());
        assert_eq!(included.selection_value, Some("sel1"));
        assert_eq!(included.dependent_value, Some("dep1"));
    }

    #[test]
    fn json_body() {
        let user_values = [UserValue::new("ana".to_string(), "noun".to_string())];
        let values = values().user_values(Some(user_values.as_slice()));

        let prepared = builder()
            .build(&body(BodyType::Json, true, false), &values)
            .unwrap();
        assert_eq!(prepared.content_type, "application/json");
        assert_eq!(prepared.content_encoding, None);

        let json: serde_json::Value = serde_json::from_slice(&prepared.bytes).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "value": "cat",
                "description": "animal",
                "selectionValue": "sel1",
                "userValues": { "userValue": [{ "name": "ana", "value": "noun" }] }
            })
        );
    }

    #[test]
    fn xml_body() {
        let prepared = builder()
            .build(&body(BodyType::Xml, false, true), &values())
            .unwrap();
        assert_eq!(prepared.content_type, "application/xml");

        let xml = String::from_utf8(prepared.bytes).unwrap();
        assert!(xml.starts_with("<suggestion xmlns=\"http://humanistika.org/ns/tei-authorizer\">"));
        assert!(xml.contains("<value>cat</value>"));
        assert!(xml.contains("<description>animal</description>"));
        assert!(xml.contains("<dependentValue>dep1</dependentValue>"));
        assert!(!xml.contains("selectionValue"));
        assert!(!xml.contains("userValues"));
    }

    #[test]
    fn xml_body_with_user_values() {
        let user_values = [
            UserValue::new("ana".to_string(), "noun".to_string()),
            UserValue::new("lemma".to_string(), "cat".to_string()),
        ];
        let values = values().user_values(Some(user_values.as_slice()));

        let prepared = builder()
            .build(&body(BodyType::Xml, false, false), &values)
            .unwrap();

        let xml = String::from_utf8(prepared.bytes).unwrap();
        assert!(xml.contains(concat!(
            "<userValues>",
            "<userValue><name>ana</name><value>noun</value></userValue>",
            "<userValue><name>lemma</name><value>cat</value></userValue>",
            "</userValues>"
        )));
    }

    #[test]
    fn xml_body_escapes_values() {
        let values = SubmissionValues::new("a<b & c");
        let prepared = builder()
            .build(&body(BodyType::Xml, false, false), &values)
            .unwrap();

        let xml = String::from_utf8(prepared.bytes).unwrap();
        assert!(xml.contains("<value>a&lt;b &amp; c</value>"));
    }

    #[test]
    fn transformation_replaces_body() {
        let mut json = body(BodyType::Json, false, false);
        json.transformation = Some(PathBuf::from("upload.xsl"));
        let builder = BodyBuilder {
            xml_transformer: &UnavailableTransformer,
            json_transformer: &Uppercase,
        };

        let prepared = builder
            .build(&json, &SubmissionValues::new("cat"))
            .unwrap();
        assert_eq!(prepared.bytes, b"{\"VALUE\":\"CAT\"}".to_vec());
    }

    #[test]
    fn missing_transformer_fails() {
        let mut xml = body(BodyType::Xml, false, false);
        xml.transformation = Some(PathBuf::from("upload.xsl"));

        let error = builder()
            .build(&xml, &SubmissionValues::new("cat"))
            .unwrap_err();
        assert!(matches!(error, SubmissionError::Transformation(_)));
    }

    #[test]
    fn form_bodies_are_never_transformed() {
        let mut form = body(BodyType::Form, false, false);
        form.transformation = Some(PathBuf::from("upload.xsl"));

        let prepared = builder()
            .build(&form, &SubmissionValues::new("a cat"))
            .unwrap();
        assert_eq!(prepared.content_type, "application/x-www-form-urlencoded");
        assert_eq!(prepared.bytes, b"suggestion=a+cat".to_vec());
    }

    #[test]
    fn gzip_compresses_any_body_type() {
        let mut form = body(BodyType::Form, false, false);
        form.compression = Compression::Gzip;

        let prepared = builder()
            .build(&form, &SubmissionValues::new("cat"))
            .unwrap();
        assert_eq!(prepared.content_encoding, Some("gzip"));

        let mut decompressed = String::new();
        flate2::read::GzDecoder::new(prepared.bytes.as_slice())
            .read_to_string(&mut decompressed)
            .unwrap();
        assert_eq!(decompressed, "suggestion=cat");
    }
}
