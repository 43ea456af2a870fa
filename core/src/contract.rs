//! Declarative description of a remote API surface.
//!
//! # Design
//! A service contract is a marker type implementing [`ServiceContract`]. Its
//! `contract()` function returns plain data describing every operation: the
//! HTTP method markers, path fragments, media types and parameter role
//! markers. The description is validated and compiled once by the binder
//! (see [`crate::binding`]); nothing here is interpreted at call time.
//!
//! Markers are recorded exactly as declared, including conflicting ones
//! (two HTTP methods, two role markers on one parameter). Rejecting them is
//! the binder's job, so the failure surfaces when a client is built.
//!
//! ```
//! use restbind_core::{Contract, MediaType, Operation, Param, ServiceContract};
//!
//! struct NotesApi;
//!
//! impl ServiceContract for NotesApi {
//!     fn contract() -> Contract {
//!         Contract::new("NotesApi")
//!             .path("api/notes")
//!             .operation(
//!                 Operation::new("get")
//!                     .get()
//!                     .path("/{id}")
//!                     .produces(MediaType::JSON)
//!                     .param(Param::path("id")),
//!             )
//!             .operation(
//!                 Operation::new("delete")
//!                     .delete()
//!                     .path("/{id}")
//!                     .param(Param::path("id"))
//!                     .returns_unit(),
//!             )
//!     }
//! }
//! ```

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::args::Args;
use crate::client::Dispatcher;
use crate::error::ClientError;
use crate::http::HttpMethod;
use crate::media::MediaType;

/// A type describing a remote API surface.
///
/// The implementing type's identity keys the binding cache, so `contract()`
/// runs at most once per process for a well-formed contract.
pub trait ServiceContract: 'static {
    fn contract() -> Contract;
}

/// Handler for an operation that runs locally instead of over HTTP.
pub type LocalHandler =
    Arc<dyn Fn(&Dispatcher, &Args<'_>) -> Result<Value, ClientError> + Send + Sync>;

/// Declared shape of an operation's result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReturnKind {
    /// Nothing is read from the response body.
    Unit,
    /// The raw response text is returned, bypassing any codec.
    Text,
    /// The body is decoded with the negotiated codec.
    #[default]
    Entity,
}

/// Role marker attached to a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleMarker {
    Path(&'static str),
    Query(&'static str),
    Header(&'static str),
    Form(&'static str),
}

/// A declared operation parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub(crate) name: &'static str,
    pub(crate) markers: Vec<RoleMarker>,
}

impl Param {
    /// A parameter without role markers. Unless one is added, it is the body.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            markers: Vec::new(),
        }
    }

    pub fn path(name: &'static str) -> Self {
        Self::new(name).path_marker(name)
    }

    pub fn query(name: &'static str) -> Self {
        Self::new(name).query_marker(name)
    }

    pub fn header(name: &'static str) -> Self {
        Self::new(name).header_marker(name)
    }

    pub fn form(name: &'static str) -> Self {
        Self::new(name).form_marker(name)
    }

    pub fn body(name: &'static str) -> Self {
        Self::new(name)
    }

    pub fn path_marker(mut self, placeholder: &'static str) -> Self {
        self.markers.push(RoleMarker::Path(placeholder));
        self
    }

    pub fn query_marker(mut self, key: &'static str) -> Self {
        self.markers.push(RoleMarker::Query(key));
        self
    }

    pub fn header_marker(mut self, header: &'static str) -> Self {
        self.markers.push(RoleMarker::Header(header));
        self
    }

    pub fn form_marker(mut self, field: &'static str) -> Self {
        self.markers.push(RoleMarker::Form(field));
        self
    }
}

/// A declared remote operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    pub(crate) name: &'static str,
    pub(crate) methods: Vec<HttpMethod>,
    pub(crate) path: Option<&'static str>,
    pub(crate) consumes: Option<MediaType>,
    pub(crate) produces: Option<MediaType>,
    pub(crate) params: Vec<Param>,
    pub(crate) returns: ReturnKind,
}

impl Operation {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            methods: Vec::new(),
            path: None,
            consumes: None,
            produces: None,
            params: Vec::new(),
            returns: ReturnKind::default(),
        }
    }

    pub fn get(self) -> Self {
        self.method(HttpMethod::Get)
    }

    pub fn post(self) -> Self {
        self.method(HttpMethod::Post)
    }

    pub fn put(self) -> Self {
        self.method(HttpMethod::Put)
    }

    pub fn delete(self) -> Self {
        self.method(HttpMethod::Delete)
    }

    /// Add an HTTP method marker. Exactly one must be present when bound.
    pub fn method(mut self, method: HttpMethod) -> Self {
        self.methods.push(method);
        self
    }

    /// Operation-level path, appended to the contract-level prefix.
    pub fn path(mut self, path: &'static str) -> Self {
        self.path = Some(path);
        self
    }

    pub fn consumes(mut self, media_type: MediaType) -> Self {
        self.consumes = Some(media_type);
        self
    }

    pub fn produces(mut self, media_type: MediaType) -> Self {
        self.produces = Some(media_type);
        self
    }

    pub fn param(mut self, param: Param) -> Self {
        self.params.push(param);
        self
    }

    pub fn returns_unit(mut self) -> Self {
        self.returns = ReturnKind::Unit;
        self
    }

    pub fn returns_text(mut self) -> Self {
        self.returns = ReturnKind::Text;
        self
    }

    pub fn returns_entity(mut self) -> Self {
        self.returns = ReturnKind::Entity;
        self
    }
}

/// An operation implemented in-process on top of the remote ones.
#[derive(Clone)]
pub struct LocalOperation {
    pub(crate) name: &'static str,
    pub(crate) handler: LocalHandler,
}

impl fmt::Debug for LocalOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalOperation").field("name", &self.name).finish_non_exhaustive()
    }
}

/// The full description of a service contract.
#[derive(Debug, Clone)]
pub struct Contract {
    pub(crate) name: &'static str,
    pub(crate) path: Option<&'static str>,
    pub(crate) operations: Vec<Operation>,
    pub(crate) locals: Vec<LocalOperation>,
}

impl Contract {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            path: None,
            operations: Vec::new(),
            locals: Vec::new(),
        }
    }

    /// Contract-level path prefix shared by every operation.
    pub fn path(mut self, path: &'static str) -> Self {
        self.path = Some(path);
        self
    }

    pub fn operation(mut self, operation: Operation) -> Self {
        self.operations.push(operation);
        self
    }

    /// Register an operation that runs locally and may call remote operations
    /// through the dispatcher it receives.
    pub fn local<F>(mut self, name: &'static str, handler: F) -> Self
    where
        F: Fn(&Dispatcher, &Args<'_>) -> Result<Value, ClientError> + Send + Sync + 'static,
    {
        self.locals.push(LocalOperation {
            name,
            handler: Arc::new(handler),
        });
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}
