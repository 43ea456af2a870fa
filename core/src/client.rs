//! The dispatcher and the client builder.
//!
//! # Design
//! A `Dispatcher` is what a client handle holds: the compiled contract, the
//! base URL, default headers, a transport and a codec registry. It is cheap
//! to clone and immutable once built, so one instance can serve any number
//! of threads.
//!
//! Every call goes through [`Dispatcher::invoke`]. Local operations run their
//! handler in-process; remote operations are split into
//! [`Dispatcher::build_request`] and [`Dispatcher::parse_response`] around a
//! single `Transport::send`, so the I/O boundary stays explicit and both
//! halves can be exercised without a network.
//!
//! Typed client handles are thin wrappers over a dispatcher:
//!
//! ```no_run
//! use restbind_core::{args, ClientError, Contract, Dispatcher, Operation, Param};
//! use restbind_core::{RestClient, ServiceContract, UreqTransport};
//!
//! struct HelloApi;
//!
//! impl ServiceContract for HelloApi {
//!     fn contract() -> Contract {
//!         Contract::new("HelloApi").path("hello").operation(
//!             Operation::new("hello")
//!                 .get()
//!                 .path("{lang}")
//!                 .param(Param::path("lang"))
//!                 .param(Param::query("name"))
//!                 .returns_text(),
//!         )
//!     }
//! }
//!
//! struct HelloClient(Dispatcher);
//!
//! impl HelloClient {
//!     fn hello(&self, lang: &str, name: &str) -> Result<String, ClientError> {
//!         self.0.invoke("hello", args![lang, name])
//!     }
//! }
//!
//! let dispatcher = RestClient::build::<HelloApi>(UreqTransport::new(), "http://localhost:3000")?;
//! let greeting = HelloClient(dispatcher).hello("de", "Welt")?;
//! # Ok::<(), ClientError>(())
//! ```

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use tracing::{debug, info, trace};
use url::Url;

use crate::args::Args;
use crate::binding::{BindingCache, BoundContract, MethodBinding};
use crate::codec::{Codec, CodecRegistry};
use crate::contract::ServiceContract;
use crate::error::ClientError;
use crate::http::{HttpRequest, HttpResponse};
use crate::lenient;
use crate::media::MediaType;
use crate::request::RequestBuilder;
use crate::response;
use crate::transport::{Transport, UreqTransport};

/// Routes invocations of a bound contract's operations.
#[derive(Clone)]
pub struct Dispatcher {
    contract: Arc<BoundContract>,
    base_url: String,
    default_headers: Arc<[(String, String)]>,
    transport: Arc<dyn Transport>,
    codecs: Arc<CodecRegistry>,
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("contract", &self.contract.name())
            .field("base_url", &self.base_url)
            .field("default_headers", &self.default_headers)
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    /// Invoke `operation` with positional `args` and decode the result as `R`.
    pub fn invoke<R: DeserializeOwned>(
        &self,
        operation: &str,
        args: Args<'_>,
    ) -> Result<R, ClientError> {
        if let Some(local) = self.contract.local(operation) {
            debug!("invoking local {}.{}", self.contract.name(), operation);
            let value = (local.handler)(self, &args)?;
            return lenient::from_value(value).map_err(|e| ClientError::Decode(e.to_string()));
        }

        let request = self.build_request(operation, &args)?;
        info!(">> {} {}", request.method, request.uri);
        if let Some(body) = &request.body {
            trace!("{body}");
        }

        let response = self.transport.send(&request).map_err(ClientError::Network)?;
        info!("<< {}", response.status);
        if !response.body.is_empty() {
            trace!("{}", response.body);
        }

        self.parse_response(operation, &response)
    }

    /// Build the request a remote operation would send, without sending it.
    pub fn build_request(
        &self,
        operation: &str,
        args: &Args<'_>,
    ) -> Result<HttpRequest, ClientError> {
        let binding = self.binding(operation)?;
        RequestBuilder::new(&self.base_url, &self.default_headers, &self.codecs)
            .build(binding, args)
    }

    /// Classify and decode a response received for a remote operation.
    pub fn parse_response<R: DeserializeOwned>(
        &self,
        operation: &str,
        response: &HttpResponse,
    ) -> Result<R, ClientError> {
        let binding = self.binding(operation)?;
        response::resolve(response, binding, &self.codecs)
    }

    pub fn contract(&self) -> &BoundContract {
        &self.contract
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn binding(&self, operation: &str) -> Result<&MethodBinding, ClientError> {
        self.contract
            .binding(operation)
            .ok_or_else(|| ClientError::UnknownOperation {
                contract: self.contract.name(),
                operation: operation.to_string(),
            })
    }
}

/// Entry point for constructing clients.
#[derive(Debug, Clone, Copy)]
pub struct RestClient;

impl RestClient {
    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }

    /// Bind contract `C` against `base_url` with default codecs.
    pub fn build<C: ServiceContract>(
        transport: impl Transport + 'static,
        base_url: &str,
    ) -> Result<Dispatcher, ClientError> {
        Self::builder()
            .transport(transport)
            .base_url(base_url)
            .build::<C>()
    }
}

/// Configures and builds a [`Dispatcher`].
#[derive(Default)]
pub struct ClientBuilder {
    base_url: Option<String>,
    transport: Option<Arc<dyn Transport>>,
    codecs: CodecRegistry,
    default_headers: Vec<(String, String)>,
}

impl fmt::Debug for ClientBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientBuilder")
            .field("base_url", &self.base_url)
            .field("default_headers", &self.default_headers)
            .finish_non_exhaustive()
    }
}

impl ClientBuilder {
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Defaults to a [`UreqTransport`] without a timeout.
    pub fn transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Replace the codec registry. Defaults to [`CodecRegistry::default`].
    pub fn codecs(mut self, codecs: CodecRegistry) -> Self {
        self.codecs = codecs;
        self
    }

    /// Register one more codec on top of the current registry.
    pub fn codec(mut self, media_type: MediaType, codec: Codec) -> Self {
        self.codecs.register(media_type, codec);
        self
    }

    /// A header sent with every request, ahead of per-call headers.
    pub fn default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.push((name.into(), value.into()));
        self
    }

    /// Bind `C` through the process-wide cache and assemble the dispatcher.
    pub fn build<C: ServiceContract>(self) -> Result<Dispatcher, ClientError> {
        self.build_with::<C>(BindingCache::global())
    }

    /// Like [`build`](Self::build), using `cache` instead of the global one.
    pub fn build_with<C: ServiceContract>(
        self,
        cache: &BindingCache,
    ) -> Result<Dispatcher, ClientError> {
        let base_url = validate_base_url(self.base_url.unwrap_or_default())?;
        let contract = cache.bind::<C>()?;
        let transport = self
            .transport
            .unwrap_or_else(|| Arc::new(UreqTransport::new()));

        debug!("client for {} at {}", contract.name(), base_url);
        Ok(Dispatcher {
            contract,
            base_url,
            default_headers: self.default_headers.into(),
            transport,
            codecs: Arc::new(self.codecs),
        })
    }
}

fn validate_base_url(base_url: String) -> Result<String, ClientError> {
    let invalid = |reason: String| ClientError::InvalidBaseUrl {
        url: base_url.clone(),
        reason,
    };
    let parsed = Url::parse(&base_url).map_err(|e| invalid(e.to_string()))?;
    if parsed.cannot_be_a_base() {
        return Err(invalid("cannot be used as a base".to_string()));
    }
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme {}", parsed.scheme())));
    }
    Ok(base_url)
}
