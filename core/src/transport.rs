//! The pluggable HTTP execution boundary.
//!
//! # Design
//! The dispatcher builds a complete `HttpRequest` and hands it to a
//! `Transport`; the transport returns whatever the server said. Non-2xx
//! statuses are data here, not errors. Only failures to complete the
//! exchange (connection refused, timeouts, broken streams) are `Err`.
//!
//! Closures implement `Transport`, which keeps test doubles short:
//!
//! ```
//! use restbind_core::{BoxError, HttpRequest, HttpResponse, Transport};
//!
//! let echo = |request: &HttpRequest| -> Result<HttpResponse, BoxError> {
//!     Ok(HttpResponse {
//!         status: 200,
//!         headers: vec![("content-type".into(), "text/plain".into())],
//!         body: request.uri.clone(),
//!     })
//! };
//! # fn assert_transport(_: &impl Transport) {}
//! # assert_transport(&echo);
//! ```

use std::time::Duration;

use tracing::trace;

use crate::error::BoxError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

/// Executes one HTTP exchange.
pub trait Transport: Send + Sync {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, BoxError>;
}

impl<F> Transport for F
where
    F: Fn(&HttpRequest) -> Result<HttpResponse, BoxError> + Send + Sync,
{
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, BoxError> {
        self(request)
    }
}

/// Blocking transport backed by a `ureq` agent.
///
/// The agent keeps a connection pool, so one instance should be shared
/// rather than created per request.
#[derive(Debug, Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl UreqTransport {
    /// A transport without an overall request timeout.
    pub fn new() -> Self {
        Self::configured(None)
    }

    /// A transport that fails any exchange taking longer than `timeout`.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::configured(Some(timeout))
    }

    fn configured(timeout: Option<Duration>) -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(timeout)
            .build()
            .new_agent();
        Self { agent }
    }
}

impl Transport for UreqTransport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, BoxError> {
        let uri = request.uri.as_str();
        let headers = request.headers.as_slice();
        let body = request.body.as_deref();

        let mut response = match (request.method, body) {
            (HttpMethod::Get, _) => with_headers(self.agent.get(uri), headers).call(),
            (HttpMethod::Delete, _) => with_headers(self.agent.delete(uri), headers).call(),
            (HttpMethod::Post, Some(body)) => {
                with_headers(self.agent.post(uri), headers).send(body.as_bytes())
            }
            (HttpMethod::Post, None) => with_headers(self.agent.post(uri), headers).send_empty(),
            (HttpMethod::Put, Some(body)) => {
                with_headers(self.agent.put(uri), headers).send(body.as_bytes())
            }
            (HttpMethod::Put, None) => with_headers(self.agent.put(uri), headers).send_empty(),
        }?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();
        let body = response.body_mut().read_to_string()?;
        trace!(status, bytes = body.len(), "ureq exchange complete");

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

fn with_headers<B>(
    mut builder: ureq::RequestBuilder<B>,
    headers: &[(String, String)],
) -> ureq::RequestBuilder<B> {
    for (name, value) in headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
}
