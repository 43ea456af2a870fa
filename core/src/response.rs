//! Status classification and response decoding.
//!
//! # Design
//! `classify` maps a status code onto the error taxonomy. The table is part
//! of the client's observable contract:
//!
//! | status            | outcome                      |
//! |-------------------|------------------------------|
//! | 2xx               | success                      |
//! | 401               | `Unauthorized`               |
//! | 403               | `Forbidden`                  |
//! | 404               | `NotFound`                   |
//! | 405               | `MethodNotAllowed`           |
//! | 406               | `NotAcceptable`              |
//! | 415               | `UnsupportedMediaTypeStatus` |
//! | other 4xx         | `Client`                     |
//! | 5xx               | `Server`                     |
//! | 1xx, 3xx          | `Protocol`                   |
//! | outside 100..=599 | `Protocol`                   |
//!
//! `resolve` then turns a successful response into the declared return type.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::binding::MethodBinding;
use crate::codec::CodecRegistry;
use crate::contract::ReturnKind;
use crate::error::ClientError;
use crate::http::HttpResponse;
use crate::lenient;

/// Map non-success status codes to the matching `ClientError` variant.
pub fn classify(response: &HttpResponse) -> Result<(), ClientError> {
    let status = response.status;
    let body = (!response.body.is_empty()).then(|| response.body.clone());
    match status {
        200..=299 => Ok(()),
        401 => Err(ClientError::Unauthorized { status, body }),
        403 => Err(ClientError::Forbidden { status, body }),
        404 => Err(ClientError::NotFound { status, body }),
        405 => Err(ClientError::MethodNotAllowed { status, body }),
        406 => Err(ClientError::NotAcceptable { status, body }),
        415 => Err(ClientError::UnsupportedMediaTypeStatus { status, body }),
        400..=499 => Err(ClientError::Client { status, body }),
        500..=599 => Err(ClientError::Server { status, body }),
        _ => Err(ClientError::Protocol { status, body }),
    }
}

/// Decode a response into the operation's return value.
///
/// - `Unit` operation: decoded from `null`, so `()` and `Option<T>` succeed
///   without touching a codec;
/// - `Text` operation: the raw body as a string, an empty body reading as
///   `""` or as `None`;
/// - empty body otherwise: decoded from `null` like a `Unit` operation;
/// - `Entity` operation: the codec negotiated from the declared produces
///   type, falling back to the response `content-type`.
pub fn resolve<R: DeserializeOwned>(
    response: &HttpResponse,
    binding: &MethodBinding,
    codecs: &CodecRegistry,
) -> Result<R, ClientError> {
    classify(response)?;

    match binding.returns {
        ReturnKind::Unit => from_null(),
        ReturnKind::Text => lenient::from_value(Value::String(response.body.clone()))
            .map_err(|e| ClientError::Decode(e.to_string())),
        ReturnKind::Entity if response.body.is_empty() => from_null(),
        ReturnKind::Entity => codecs
            .decoder_for(binding.produces.as_ref(), response.content_type())?
            .decode(&response.body),
    }
}

fn from_null<R: DeserializeOwned>() -> Result<R, ClientError> {
    lenient::from_value(Value::Null).map_err(|e| ClientError::Decode(e.to_string()))
}
