//! Turns a method binding and live arguments into an `HttpRequest`.
//!
//! # Design
//! The builder is pure: it reads the immutable `MethodBinding`, the client's
//! base URL and default headers, and the call-time arguments, and produces a
//! fresh request without touching the network.
//!
//! Encoding rules:
//! - path values are percent-encoded as RFC 3986 path segments (`/` becomes
//!   `%2F`, space becomes `%20`);
//! - query keys and values, and form fields, use form encoding (space becomes
//!   `+`);
//! - placeholders without a PATH parameter stay in the URI verbatim.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde_json::Value;
use tracing::trace;

use crate::args::{plain_text, Args, Argument};
use crate::binding::{join_path, MethodBinding, ParamRole, Segment};
use crate::codec::CodecRegistry;
use crate::error::ClientError;
use crate::http::{find_header, HttpRequest};
use crate::media::MediaType;

/// Characters escaped in a path segment: everything but RFC 3986 unreserved.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Percent-encode a value for use inside a path segment.
pub fn encode_path_segment(value: &str) -> String {
    utf8_percent_encode(value, PATH_SEGMENT).to_string()
}

/// Form-encode a query key or value.
pub fn encode_query_component(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

/// Builds requests for one client: base URL, default headers and codecs.
#[derive(Debug, Clone, Copy)]
pub struct RequestBuilder<'a> {
    base_url: &'a str,
    default_headers: &'a [(String, String)],
    codecs: &'a CodecRegistry,
}

impl<'a> RequestBuilder<'a> {
    pub fn new(
        base_url: &'a str,
        default_headers: &'a [(String, String)],
        codecs: &'a CodecRegistry,
    ) -> Self {
        Self {
            base_url,
            default_headers,
            codecs,
        }
    }

    pub fn build(
        &self,
        binding: &MethodBinding,
        args: &Args<'_>,
    ) -> Result<HttpRequest, ClientError> {
        if args.len() != binding.params.len() {
            return Err(ClientError::ArgumentCount {
                operation: binding.operation,
                expected: binding.params.len(),
                actual: args.len(),
            });
        }

        let mut path_values: Vec<(&str, String)> = Vec::new();
        let mut query: Vec<(&str, String)> = Vec::new();
        let mut headers: Vec<(String, String)> = self.default_headers.to_vec();
        let mut form: Vec<(&str, String)> = Vec::new();
        let mut body: Option<(Value, &'static str)> = None;

        for (param, arg) in binding.params.iter().zip(args.iter()) {
            let value = arg.to_value()?;
            match param.role {
                ParamRole::Path(name) => match text_of(binding, param.name, &value)? {
                    Some(text) => path_values.push((name, text)),
                    None => {
                        return Err(ClientError::MissingArgument {
                            operation: binding.operation,
                            parameter: name,
                        })
                    }
                },
                ParamRole::Query(name) => {
                    for text in texts_of(binding, param.name, &value)? {
                        query.push((name, text));
                    }
                }
                ParamRole::Header(name) => {
                    if let Some(text) = text_of(binding, param.name, &value)? {
                        headers.push((name.to_string(), text));
                    }
                }
                ParamRole::Form(name) => {
                    for text in texts_of(binding, param.name, &value)? {
                        form.push((name, text));
                    }
                }
                ParamRole::Body => {
                    if !value.is_null() {
                        body = Some((value, arg.type_name()));
                    }
                }
            }
        }

        let uri = self.compose_uri(binding, &path_values, &query);

        let body = if !form.is_empty() {
            let mut serializer = url::form_urlencoded::Serializer::new(String::new());
            for (name, text) in &form {
                serializer.append_pair(name, text);
            }
            let media_type = binding.consumes.clone().unwrap_or(MediaType::FORM);
            default_content_type(&mut headers, &media_type);
            Some(serializer.finish())
        } else if let Some((value, type_name)) = body {
            let (media_type, text) = self.encode_body(binding, value, type_name)?;
            default_content_type(&mut headers, &media_type);
            Some(text)
        } else {
            None
        };

        if let Some(body) = &body {
            trace!("{} {} body: {}", binding.method, uri, body);
        }

        Ok(HttpRequest {
            method: binding.method,
            uri,
            headers,
            body,
        })
    }

    fn compose_uri(
        &self,
        binding: &MethodBinding,
        path_values: &[(&str, String)],
        query: &[(&str, String)],
    ) -> String {
        let mut path = String::new();
        for segment in binding.template.segments() {
            match segment {
                Segment::Literal(literal) => path.push_str(literal),
                Segment::Placeholder(name) => {
                    match path_values.iter().find(|(key, _)| key == name) {
                        Some((_, value)) => path.push_str(&encode_path_segment(value)),
                        None => {
                            path.push('{');
                            path.push_str(name);
                            path.push('}');
                        }
                    }
                }
            }
        }

        let mut uri = join_path([Some(self.base_url), Some(path.as_str())]);
        if !query.is_empty() {
            let pairs = query
                .iter()
                .map(|(key, value)| {
                    format!("{}={}", encode_query_component(key), encode_query_component(value))
                })
                .collect::<Vec<_>>()
                .join("&");
            uri.push('?');
            uri.push_str(&pairs);
        }
        uri
    }

    /// Serialize a body with the codec for the declared consumes type.
    ///
    /// Without a usable codec, scalar bodies fall back to plain text and
    /// anything else is refused.
    fn encode_body(
        &self,
        binding: &MethodBinding,
        value: Value,
        type_name: &str,
    ) -> Result<(MediaType, String), ClientError> {
        let codec = binding
            .consumes
            .as_ref()
            .and_then(|media_type| self.codecs.lookup(media_type));
        if let (Some(codec), Some(media_type)) = (codec, binding.consumes.clone()) {
            return Ok((media_type, codec.encode(value, type_name)?));
        }
        match plain_text(&value) {
            Some(text) => Ok((binding.consumes.clone().unwrap_or(MediaType::TEXT_PLAIN), text)),
            None => Err(ClientError::UnsupportedMediaType {
                media_type: binding
                    .consumes
                    .as_ref()
                    .map_or_else(|| "none declared".to_string(), |m| m.to_string()),
            }),
        }
    }
}

/// Text form of a PATH or HEADER value. `None` when absent.
fn text_of(
    binding: &MethodBinding,
    param: &'static str,
    value: &Value,
) -> Result<Option<String>, ClientError> {
    if value.is_null() {
        return Ok(None);
    }
    plain_text(value).map(Some).ok_or_else(|| {
        ClientError::Encode(format!(
            "parameter {param:?} of {} must be a scalar",
            binding.operation
        ))
    })
}

/// Text forms of a QUERY or FORM value; sequences repeat the key.
fn texts_of(
    binding: &MethodBinding,
    param: &'static str,
    value: &Value,
) -> Result<Vec<String>, ClientError> {
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(|item| text_of(binding, param, item).transpose())
            .collect(),
        single => Ok(text_of(binding, param, single)?.into_iter().collect()),
    }
}

/// Add a `content-type` header unless a default header or a HEADER
/// parameter already set one.
fn default_content_type(headers: &mut Vec<(String, String)>, media_type: &MediaType) {
    if find_header(headers, "content-type").is_none() {
        headers.push(("content-type".to_string(), media_type.to_string()));
    }
}
