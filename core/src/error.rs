//! Error types for the binding engine.
//!
//! # Design
//! Every failure a caller can observe is a `ClientError` variant, so calling
//! code can branch on the kind (treat `NotFound` as absence, propagate
//! `Server`, ...). Failures fall into three groups:
//!
//! - binding time: the contract itself is malformed (`BindingConfiguration`);
//! - request time: arguments or media types cannot be turned into a request
//!   (`MissingArgument`, `ArgumentCount`, `UnsupportedMediaType`, `Encode`);
//! - response time: the transport failed (`Network`), or the server answered
//!   with a status that classifies as an error. HTTP-classified variants keep
//!   the original status code and, when present, the raw response body.

use thiserror::Error;

/// Boxed error returned by transports and custom codecs.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors returned while binding a contract or invoking one of its operations.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The service contract is malformed. Raised when a client is built.
    #[error("invalid binding for {contract}.{operation}: {reason}")]
    BindingConfiguration {
        contract: &'static str,
        operation: &'static str,
        reason: String,
    },

    /// The base URL handed to the client builder cannot be used.
    #[error("invalid base URL {url:?}: {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    /// The operation name is not part of the contract.
    #[error("unknown operation {contract}.{operation}")]
    UnknownOperation {
        contract: &'static str,
        operation: String,
    },

    /// A PATH parameter had no value at call time.
    #[error("missing value for path parameter {parameter:?} of {operation}")]
    MissingArgument {
        operation: &'static str,
        parameter: &'static str,
    },

    /// The number of call-time arguments does not match the declared parameters.
    #[error("{operation} takes {expected} argument(s), {actual} given")]
    ArgumentCount {
        operation: &'static str,
        expected: usize,
        actual: usize,
    },

    /// No codec could be resolved for a declared or observed media type.
    #[error("unsupported media type: {media_type}")]
    UnsupportedMediaType { media_type: String },

    /// The request body could not be serialized.
    #[error("serialization failed: {0}")]
    Encode(String),

    /// The response body could not be deserialized into the expected type.
    #[error("deserialization failed: {0}")]
    Decode(String),

    /// The server returned 401.
    #[error("HTTP 401 authentication required")]
    Unauthorized { status: u16, body: Option<String> },

    /// The server returned 403.
    #[error("HTTP 403 access denied")]
    Forbidden { status: u16, body: Option<String> },

    /// The server returned 404. The requested resource does not exist.
    #[error("HTTP 404 not found")]
    NotFound { status: u16, body: Option<String> },

    /// The server returned 405.
    #[error("HTTP 405 method not allowed")]
    MethodNotAllowed { status: u16, body: Option<String> },

    /// The server returned 406.
    #[error("HTTP 406 not acceptable")]
    NotAcceptable { status: u16, body: Option<String> },

    /// The server returned 415. Not to be confused with `UnsupportedMediaType`,
    /// which is raised locally before or after the exchange.
    #[error("HTTP 415 unsupported media type")]
    UnsupportedMediaTypeStatus { status: u16, body: Option<String> },

    /// Any other 4xx status.
    #[error("HTTP {status} client error")]
    Client { status: u16, body: Option<String> },

    /// Any 5xx status.
    #[error("HTTP {status} server error")]
    Server { status: u16, body: Option<String> },

    /// The response cannot be interpreted: status outside 100..=599, or a
    /// 1xx/3xx status reaching the client.
    #[error("malformed response: HTTP {status}")]
    Protocol { status: u16, body: Option<String> },

    /// The transport failed before a response was received.
    #[error("network error: {0}")]
    Network(#[source] BoxError),
}

impl ClientError {
    /// HTTP status carried by a response-classified error.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Unauthorized { status, .. }
            | ClientError::Forbidden { status, .. }
            | ClientError::NotFound { status, .. }
            | ClientError::MethodNotAllowed { status, .. }
            | ClientError::NotAcceptable { status, .. }
            | ClientError::UnsupportedMediaTypeStatus { status, .. }
            | ClientError::Client { status, .. }
            | ClientError::Server { status, .. }
            | ClientError::Protocol { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Raw response body carried by a response-classified error.
    pub fn body(&self) -> Option<&str> {
        match self {
            ClientError::Unauthorized { body, .. }
            | ClientError::Forbidden { body, .. }
            | ClientError::NotFound { body, .. }
            | ClientError::MethodNotAllowed { body, .. }
            | ClientError::NotAcceptable { body, .. }
            | ClientError::UnsupportedMediaTypeStatus { body, .. }
            | ClientError::Client { body, .. }
            | ClientError::Server { body, .. }
            | ClientError::Protocol { body, .. } => body.as_deref(),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::NotFound { .. })
    }

    /// True for every 4xx classification.
    pub fn is_client_error(&self) -> bool {
        matches!(self.status(), Some(400..=499))
    }

    pub fn is_server_error(&self) -> bool {
        matches!(self, ClientError::Server { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_and_body_are_exposed_for_http_errors() {
        let err = ClientError::NotFound {
            status: 404,
            body: Some("note 7 not found".to_string()),
        };
        assert_eq!(err.status(), Some(404));
        assert_eq!(err.body(), Some("note 7 not found"));
        assert!(err.is_not_found());
        assert!(err.is_client_error());
        assert!(!err.is_server_error());
    }

    #[test]
    fn local_errors_carry_no_status() {
        let err = ClientError::Decode("expected value".to_string());
        assert_eq!(err.status(), None);
        assert_eq!(err.body(), None);
        assert!(!err.is_client_error());
    }

    #[test]
    fn display_names_operation_for_binding_errors() {
        let err = ClientError::BindingConfiguration {
            contract: "NotesApi",
            operation: "get",
            reason: "no HTTP method".to_string(),
        };
        assert_eq!(err.to_string(), "invalid binding for NotesApi.get: no HTTP method");
    }

    #[test]
    fn network_error_keeps_its_source() {
        use std::error::Error as _;

        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err = ClientError::Network(Box::new(io));
        assert_eq!(err.to_string(), "network error: refused");
        assert!(err.source().is_some());
    }
}
