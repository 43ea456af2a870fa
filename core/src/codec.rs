//! Serializer registry and content negotiation.
//!
//! # Design
//! Arguments reach the codecs as `serde_json::Value` trees, which lets every
//! codec, built-in or user supplied, encode without knowing the argument's
//! Rust type. Decoding reads every format into a value tree first (XML
//! through [`crate::xml`]) and then into the target type with the lenient
//! deserializer in [`crate::lenient`], so an empty XML element and an empty
//! JSON string both read as `None`.
//!
//! Encoding drops null, empty-string, empty-array and empty-object fields
//! before writing JSON or XML. Date/time values are written in whatever form
//! their `Serialize` impl chooses; `chrono` types produce RFC 3339 strings.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::args::plain_text;
use crate::error::{BoxError, ClientError};
use crate::lenient;
use crate::media::MediaType;
use crate::xml;

/// A user-supplied codec working on JSON value trees.
pub trait ValueCodec: Send + Sync {
    fn encode(&self, value: &Value) -> Result<String, BoxError>;
    fn decode(&self, body: &str) -> Result<Value, BoxError>;
}

/// An encode/decode capability for one wire format.
#[derive(Clone)]
pub enum Codec {
    Json,
    Xml,
    /// Scalars written as plain text.
    Text,
    /// `application/x-www-form-urlencoded` pairs from a flat object.
    Form,
    Custom(Arc<dyn ValueCodec>),
}

impl fmt::Debug for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Codec::Json => f.write_str("Json"),
            Codec::Xml => f.write_str("Xml"),
            Codec::Text => f.write_str("Text"),
            Codec::Form => f.write_str("Form"),
            Codec::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

impl Codec {
    /// Encode `value`. `type_name` is the Rust type the value came from and
    /// names the XML root element.
    pub fn encode(&self, value: Value, type_name: &str) -> Result<String, ClientError> {
        match self {
            Codec::Json => serde_json::to_string(&prune_empty(value)).map_err(encode_error),
            Codec::Xml => quick_xml::se::to_string_with_root(
                root_element(type_name),
                &prune_empty(value),
            )
            .map_err(encode_error),
            Codec::Text => plain_text(&value).ok_or_else(|| {
                ClientError::Encode(format!("{type_name} cannot be written as plain text"))
            }),
            Codec::Form => encode_form(&value),
            Codec::Custom(codec) => codec.encode(&value).map_err(encode_error),
        }
    }

    pub fn decode<R: DeserializeOwned>(&self, body: &str) -> Result<R, ClientError> {
        match self {
            Codec::Json => {
                let value: Value = serde_json::from_str(body).map_err(decode_error)?;
                lenient::from_value(value).map_err(decode_error)
            }
            Codec::Xml => {
                let value = xml::to_value(body).map_err(decode_error)?;
                lenient::from_value(value).map_err(decode_error)
            }
            Codec::Text => {
                lenient::from_value(Value::String(body.to_string())).map_err(decode_error)
            }
            Codec::Form => lenient::from_value(decode_form(body)).map_err(decode_error),
            Codec::Custom(codec) => {
                let value = codec.decode(body).map_err(decode_error)?;
                lenient::from_value(value).map_err(decode_error)
            }
        }
    }
}

fn encode_error(err: impl fmt::Display) -> ClientError {
    ClientError::Encode(err.to_string())
}

fn decode_error(err: impl fmt::Display) -> ClientError {
    ClientError::Decode(err.to_string())
}

/// Maps media types to codecs.
///
/// The default registry knows JSON, XML (`application/xml`, `text/xml`),
/// plain text and form encoding. Lookups fall back to the structured syntax
/// suffix, so `application/hal+json` resolves to JSON unless registered
/// explicitly.
#[derive(Debug, Clone)]
pub struct CodecRegistry {
    codecs: HashMap<MediaType, Codec>,
}

impl Default for CodecRegistry {
    fn default() -> Self {
        Self::empty()
            .with(MediaType::JSON, Codec::Json)
            .with(MediaType::XML, Codec::Xml)
            .with(MediaType::parse("text/xml"), Codec::Xml)
            .with(MediaType::TEXT_PLAIN, Codec::Text)
            .with(MediaType::FORM, Codec::Form)
    }
}

impl CodecRegistry {
    /// A registry without any codecs.
    pub fn empty() -> Self {
        Self {
            codecs: HashMap::new(),
        }
    }

    pub fn with(mut self, media_type: MediaType, codec: Codec) -> Self {
        self.register(media_type, codec);
        self
    }

    pub fn register(&mut self, media_type: MediaType, codec: Codec) -> &mut Self {
        self.codecs.insert(media_type, codec);
        self
    }

    pub fn lookup(&self, media_type: &MediaType) -> Option<&Codec> {
        self.codecs.get(media_type).or_else(|| match media_type.suffix() {
            Some("json") => self.codecs.get(&MediaType::JSON),
            Some("xml") => self.codecs.get(&MediaType::XML),
            _ => None,
        })
    }

    /// Codec for writing a request body of the given media type.
    pub fn encoder_for(&self, media_type: &MediaType) -> Result<&Codec, ClientError> {
        self.lookup(media_type).ok_or_else(|| unsupported(media_type.as_str()))
    }

    /// Codec for reading a response body.
    ///
    /// The declared media type wins when present, even if no codec is
    /// registered for it. Otherwise the response's own `content-type` is
    /// used. With neither, decoding is refused rather than guessed.
    pub fn decoder_for(
        &self,
        declared: Option<&MediaType>,
        observed: Option<&str>,
    ) -> Result<&Codec, ClientError> {
        match (declared, observed) {
            (Some(declared), _) => self.encoder_for(declared),
            (None, Some(content_type)) => self.encoder_for(&MediaType::parse(content_type)),
            (None, None) => Err(unsupported("none declared or received")),
        }
    }
}

fn unsupported(media_type: &str) -> ClientError {
    ClientError::UnsupportedMediaType {
        media_type: media_type.to_string(),
    }
}

/// Remove null and empty fields from objects, recursively.
fn prune_empty(value: Value) -> Value {
    match value {
        Value::Object(fields) => Value::Object(
            fields
                .into_iter()
                .map(|(key, value)| (key, prune_empty(value)))
                .filter(|(_, value)| !is_empty(value))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(prune_empty).collect()),
        scalar => scalar,
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(text) => text.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(fields) => fields.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

/// XML root element for a Rust type name: the last path segment, without
/// generics or references (`alloc::vec::Vec<app::Note>` gives `Vec`).
fn root_element(type_name: &str) -> &str {
    let base = type_name.split('<').next().unwrap_or(type_name);
    let short = base.rsplit("::").next().unwrap_or(base);
    short.trim_start_matches('&')
}

fn encode_form(value: &Value) -> Result<String, ClientError> {
    let Value::Object(fields) = value else {
        return Err(ClientError::Encode(
            "form bodies must be written from an object".to_string(),
        ));
    };
    let mut form = url::form_urlencoded::Serializer::new(String::new());
    for (key, value) in fields {
        match value {
            Value::Null => {}
            Value::Array(items) => {
                for item in items.iter().filter_map(plain_text) {
                    form.append_pair(key, &item);
                }
            }
            Value::Object(_) => {
                form.append_pair(key, &value.to_string());
            }
            scalar => {
                if let Some(text) = plain_text(scalar) {
                    form.append_pair(key, &text);
                }
            }
        }
    }
    Ok(form.finish())
}

fn decode_form(body: &str) -> Value {
    let mut fields = Map::new();
    for (key, value) in url::form_urlencoded::parse(body.as_bytes()) {
        let value = Value::String(value.into_owned());
        match fields.get_mut(&*key) {
            Some(Value::Array(items)) => items.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
            None => {
                fields.insert(key.into_owned(), value);
            }
        }
    }
    Value::Object(fields)
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    use super::*;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Note {
        id: i64,
        text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        author: Option<Author>,
    }

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Author {
        name: String,
    }

    struct Upper;

    impl ValueCodec for Upper {
        fn encode(&self, value: &Value) -> Result<String, BoxError> {
            Ok(value.to_string().to_uppercase())
        }

        fn decode(&self, body: &str) -> Result<Value, BoxError> {
            Ok(serde_json::from_str(&body.to_lowercase())?)
        }
    }

    #[test]
    fn json_encode_omits_empty_fields() {
        let value = json!({"id": 1, "text": "", "tags": [], "meta": {}, "note": null, "ok": false});
        let encoded = Codec::Json.encode(value, "Note").unwrap();
        assert_eq!(encoded, r#"{"id":1,"ok":false}"#);
    }

    #[test]
    fn json_decode_is_lenient() {
        let note: Note = Codec::Json
            .decode(r#"{"id":1000,"text":"Aloha","author":"","created":"2026-01-01T00:00:00Z"}"#)
            .unwrap();
        assert_eq!(note.id, 1000);
        assert_eq!(note.author, None);
    }

    #[test]
    fn json_decode_error_is_classified() {
        let err = Codec::Json.decode::<Note>("not json").unwrap_err();
        assert!(matches!(err, ClientError::Decode(_)));
    }

    #[test]
    fn xml_root_element_is_type_short_name() {
        let note = Note {
            id: 7,
            text: "Hi".to_string(),
            author: Some(Author {
                name: "Ann".to_string(),
            }),
        };
        let value = serde_json::to_value(&note).unwrap();
        let xml = Codec::Xml.encode(value, std::any::type_name::<Note>()).unwrap();
        assert!(xml.starts_with("<Note>"), "{xml}");
        assert!(xml.contains("<author><name>Ann</name></author>"), "{xml}");

        let back: Note = Codec::Xml.decode(&xml).unwrap();
        assert_eq!(back, note);
    }

    #[test]
    fn xml_decode_reads_empty_elements_as_none() {
        #[derive(Debug, Deserialize)]
        struct Tally {
            id: i32,
            count: Option<i32>,
            author: Option<Author>,
        }

        let tally: Tally = Codec::Xml
            .decode("<Tally><id>1</id><count></count><author></author></Tally>")
            .unwrap();
        assert_eq!(tally.id, 1);
        assert_eq!(tally.count, None);
        assert!(tally.author.is_none());

        let tally: Tally = Codec::Xml.decode("<Tally><id>2</id><author/></Tally>").unwrap();
        assert_eq!(tally.count, None);
        assert!(tally.author.is_none());

        let tally: Tally = Codec::Xml
            .decode("<Tally><id>3</id><count>4</count><author><name>Ann</name></author></Tally>")
            .unwrap();
        assert_eq!(tally.count, Some(4));
        assert_eq!(tally.author.map(|a| a.name).as_deref(), Some("Ann"));
    }

    #[test]
    fn xml_decode_accepts_one_or_many_repeated_elements() {
        #[derive(Debug, Deserialize)]
        struct Forecast {
            #[serde(rename = "day")]
            days: Vec<i32>,
        }

        let one: Forecast = Codec::Xml.decode("<Forecast><day>21</day></Forecast>").unwrap();
        assert_eq!(one.days, vec![21]);
        let many: Forecast = Codec::Xml
            .decode("<Forecast><day>21</day><day>19</day></Forecast>")
            .unwrap();
        assert_eq!(many.days, vec![21, 19]);
    }

    #[test]
    fn xml_decode_error_is_classified() {
        let err = Codec::Xml.decode::<Note>("<Note><id>1</Note>").unwrap_err();
        assert!(matches!(err, ClientError::Decode(_)));
        let err = Codec::Xml.decode::<Note>("<Note><id>x</id><text/></Note>").unwrap_err();
        assert!(matches!(err, ClientError::Decode(_)));
    }

    #[test]
    fn root_element_strips_paths_generics_and_references() {
        assert_eq!(root_element("app::notes::Note"), "Note");
        assert_eq!(root_element("alloc::vec::Vec<app::Note>"), "Vec");
        assert_eq!(root_element("&app::Note"), "Note");
        assert_eq!(root_element("&str"), "str");
    }

    #[test]
    fn text_codec_accepts_scalars_only() {
        assert_eq!(Codec::Text.encode(json!("Hallo"), "&str").unwrap(), "Hallo");
        assert_eq!(Codec::Text.encode(json!(42), "i32").unwrap(), "42");
        assert!(matches!(
            Codec::Text.encode(json!({"a": 1}), "Note"),
            Err(ClientError::Encode(_))
        ));
        let text: String = Codec::Text.decode("Hallo Welt").unwrap();
        assert_eq!(text, "Hallo Welt");
    }

    #[test]
    fn form_codec_flattens_objects() {
        let encoded = Codec::Form
            .encode(json!({"name": "Frank Drebin", "tags": ["a", "b"], "skip": null}), "Form")
            .unwrap();
        assert_eq!(encoded, "name=Frank+Drebin&tags=a&tags=b");

        let decoded: Value = Codec::Form.decode("name=Frank+Drebin&tags=a&tags=b").unwrap();
        assert_eq!(decoded, json!({"name": "Frank Drebin", "tags": ["a", "b"]}));
    }

    #[test]
    fn custom_codecs_are_pluggable() {
        let registry = CodecRegistry::default()
            .with(MediaType::parse("application/x-upper"), Codec::Custom(Arc::new(Upper)));
        let codec = registry.encoder_for(&MediaType::parse("application/x-upper")).unwrap();
        assert_eq!(codec.encode(json!({"a": "b"}), "Map").unwrap(), r#"{"A":"B"}"#);
        let value: Value = codec.decode(r#"{"A":"B"}"#).unwrap();
        assert_eq!(value, json!({"a": "b"}));
    }

    #[test]
    fn lookup_falls_back_to_suffix() {
        let registry = CodecRegistry::default();
        assert!(matches!(
            registry.lookup(&MediaType::parse("application/hal+json")),
            Some(Codec::Json)
        ));
        assert!(matches!(
            registry.lookup(&MediaType::parse("application/atom+xml")),
            Some(Codec::Xml)
        ));
        assert!(registry.lookup(&MediaType::parse("application/octet-stream")).is_none());
    }

    #[test]
    fn declared_media_type_wins_over_response_header() {
        let registry = CodecRegistry::default();
        let codec = registry
            .decoder_for(Some(&MediaType::JSON), Some("application/xml"))
            .unwrap();
        assert!(matches!(codec, Codec::Json));
    }

    #[test]
    fn response_header_is_used_when_nothing_declared() {
        let registry = CodecRegistry::default();
        let codec = registry.decoder_for(None, Some("application/xml; charset=UTF-8")).unwrap();
        assert!(matches!(codec, Codec::Xml));
    }

    #[test]
    fn unresolvable_media_types_fail() {
        let registry = CodecRegistry::default();
        let err = registry
            .decoder_for(Some(&MediaType::parse("application/pdf")), Some("application/json"))
            .unwrap_err();
        assert!(matches!(
            err,
            ClientError::UnsupportedMediaType { ref media_type } if media_type == "application/pdf"
        ));
        assert!(registry.decoder_for(None, None).is_err());
    }
}
