//! Declarative HTTP client binding engine.
//!
//! # Overview
//! A service contract describes a remote API as named operations: an HTTP
//! verb, a path template, media types and a role for each parameter (path,
//! query, header, form or body). Binding compiles the contract once per
//! process into immutable metadata; a [`Dispatcher`] then turns each call
//! into an `HttpRequest`, sends it through a pluggable [`Transport`] and
//! decodes the response into the caller's return type.
//!
//! # Design
//! - Contracts are plain values built with [`Contract`], [`Operation`] and
//!   [`Param`], keyed in the [`BindingCache`] by the contract's type.
//! - Arguments are any `serde::Serialize` values, passed positionally with
//!   [`args!`]. Return values are any `serde::de::DeserializeOwned` type.
//! - Request building and response parsing never perform I/O; only the
//!   transport does.
//! - Every failure is a [`ClientError`]; HTTP failures keep their status and
//!   body.

pub mod args;
pub mod binding;
pub mod client;
pub mod codec;
pub mod contract;
pub mod error;
pub mod http;
mod lenient;
pub mod media;
pub mod request;
pub mod response;
pub mod transport;
mod xml;

pub use args::{Argument, Args};
pub use binding::{BindingCache, BoundContract, MethodBinding, ParamRole, PathTemplate};
pub use client::{ClientBuilder, Dispatcher, RestClient};
pub use codec::{Codec, CodecRegistry, ValueCodec};
pub use contract::{Contract, Operation, Param, ReturnKind, ServiceContract};
pub use error::{BoxError, ClientError};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use media::MediaType;
pub use transport::{Transport, UreqTransport};
