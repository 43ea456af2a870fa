//! Contract compilation and the process-wide binding cache.
//!
//! # Design
//! `BoundContract::compile` validates a [`Contract`] and turns each remote
//! operation into an immutable [`MethodBinding`]: one HTTP method, a parsed
//! path template (contract prefix + operation suffix), media types, and one
//! resolved role per parameter. Local operations are kept aside and never
//! compiled into bindings.
//!
//! [`BindingCache`] memoizes compiled contracts by type identity. Lookups take
//! a read lock; a miss compiles outside any lock and then publishes with
//! `entry().or_insert`, so concurrent first binds converge on the instance
//! that was inserted first. Compilation failures are not cached.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use lazy_static::lazy_static;
use tracing::debug;

use crate::contract::{
    Contract, LocalOperation, Operation, Param, ReturnKind, RoleMarker, ServiceContract,
};
use crate::error::ClientError;
use crate::http::HttpMethod;
use crate::media::MediaType;

/// The part of a request a parameter contributes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamRole {
    Path(&'static str),
    Query(&'static str),
    Header(&'static str),
    Form(&'static str),
    Body,
}

/// A parameter after role resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamBinding {
    pub name: &'static str,
    pub role: ParamRole,
}

/// One piece of a path template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Placeholder(String),
}

/// A path template parsed into literal and `{name}` segments.
///
/// The template is stored already normalized: fragments are joined with a
/// single `/` and carry no leading or trailing separators.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PathTemplate {
    segments: Vec<Segment>,
}

impl PathTemplate {
    pub fn parse(template: &str) -> Self {
        let mut segments = Vec::new();
        let mut rest = template;
        while let Some(open) = rest.find('{') {
            let Some(close) = rest[open..].find('}').map(|offset| open + offset) else {
                break;
            };
            if open > 0 {
                segments.push(Segment::Literal(rest[..open].to_string()));
            }
            segments.push(Segment::Placeholder(rest[open + 1..close].to_string()));
            rest = &rest[close + 1..];
        }
        if !rest.is_empty() {
            segments.push(Segment::Literal(rest.to_string()));
        }
        Self { segments }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Placeholder(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

/// Compiled, immutable metadata for one remote operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodBinding {
    pub contract: &'static str,
    pub operation: &'static str,
    pub method: HttpMethod,
    pub template: PathTemplate,
    pub consumes: Option<MediaType>,
    pub produces: Option<MediaType>,
    pub params: Vec<ParamBinding>,
    pub returns: ReturnKind,
}

/// A contract compiled into bindings for its remote operations, plus its
/// local operations.
#[derive(Debug)]
pub struct BoundContract {
    name: &'static str,
    bindings: HashMap<&'static str, MethodBinding>,
    locals: HashMap<&'static str, LocalOperation>,
}

impl BoundContract {
    pub fn compile(contract: Contract) -> Result<Self, ClientError> {
        let Contract {
            name,
            path,
            operations,
            locals,
        } = contract;

        let mut bindings = HashMap::with_capacity(operations.len());
        for operation in operations {
            let binding = bind_operation(name, path, operation)?;
            let operation_name = binding.operation;
            debug!(
                "bound {} {}.{}({}) -> {:?}",
                binding.method,
                name,
                binding.operation,
                describe_params(&binding.params),
                binding.returns
            );
            if bindings.insert(operation_name, binding).is_some() {
                return Err(config_error(name, operation_name, "duplicate operation name"));
            }
        }

        let mut local_ops = HashMap::with_capacity(locals.len());
        for local in locals {
            let local_name = local.name;
            if bindings.contains_key(local_name) || local_ops.insert(local_name, local).is_some() {
                return Err(config_error(name, local_name, "duplicate operation name"));
            }
        }

        Ok(Self {
            name,
            bindings,
            locals: local_ops,
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn binding(&self, operation: &str) -> Option<&MethodBinding> {
        self.bindings.get(operation)
    }

    pub fn local(&self, operation: &str) -> Option<&LocalOperation> {
        self.locals.get(operation)
    }

    pub fn bindings(&self) -> impl Iterator<Item = &MethodBinding> {
        self.bindings.values()
    }

    pub fn is_local(&self, operation: &str) -> bool {
        self.locals.contains_key(operation)
    }
}

fn bind_operation(
    contract: &'static str,
    contract_path: Option<&'static str>,
    operation: Operation,
) -> Result<MethodBinding, ClientError> {
    let name = operation.name;
    let method = match operation.methods.as_slice() {
        [method] => *method,
        [] => return Err(config_error(contract, name, "no HTTP method marker")),
        _ => return Err(config_error(contract, name, "multiple HTTP method markers")),
    };

    let template = PathTemplate::parse(&join_path([contract_path, operation.path]));

    let params = operation
        .params
        .iter()
        .map(|param| resolve_role(contract, name, param))
        .collect::<Result<Vec<_>, _>>()?;

    let body_count = params.iter().filter(|p| p.role == ParamRole::Body).count();
    if body_count > 1 {
        return Err(config_error(contract, name, "more than one body parameter"));
    }
    let has_form = params.iter().any(|p| matches!(p.role, ParamRole::Form(_)));
    if body_count == 1 && has_form {
        return Err(config_error(contract, name, "body and form parameters are exclusive"));
    }

    for param in &params {
        if let ParamRole::Path(placeholder) = param.role {
            if !template.placeholders().any(|p| p == placeholder) {
                return Err(config_error(
                    contract,
                    name,
                    format!("path parameter {placeholder:?} has no placeholder in the path"),
                ));
            }
        }
    }

    Ok(MethodBinding {
        contract,
        operation: name,
        method,
        template,
        consumes: operation.consumes,
        produces: operation.produces,
        params,
        returns: operation.returns,
    })
}

fn resolve_role(
    contract: &'static str,
    operation: &'static str,
    param: &Param,
) -> Result<ParamBinding, ClientError> {
    let role = match param.markers.as_slice() {
        [] => ParamRole::Body,
        [RoleMarker::Path(name)] => ParamRole::Path(*name),
        [RoleMarker::Query(name)] => ParamRole::Query(*name),
        [RoleMarker::Header(name)] => ParamRole::Header(*name),
        [RoleMarker::Form(name)] => ParamRole::Form(*name),
        _ => {
            return Err(config_error(
                contract,
                operation,
                format!("more than one role marker on parameter {:?}", param.name),
            ))
        }
    };
    Ok(ParamBinding {
        name: param.name,
        role,
    })
}

fn describe_params(params: &[ParamBinding]) -> String {
    params
        .iter()
        .map(|param| match param.role {
            ParamRole::Path(name) => format!("path({name:?})"),
            ParamRole::Query(name) => format!("query({name:?})"),
            ParamRole::Header(name) => format!("header({name:?})"),
            ParamRole::Form(name) => format!("form({name:?})"),
            ParamRole::Body => "body".to_string(),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn config_error(
    contract: &'static str,
    operation: &'static str,
    reason: impl Into<String>,
) -> ClientError {
    ClientError::BindingConfiguration {
        contract,
        operation,
        reason: reason.into(),
    }
}

/// Join path fragments with exactly one `/` between them.
///
/// Each fragment is stripped of leading and trailing slashes; absent and
/// empty fragments are skipped.
pub fn join_path<'a, I>(fragments: I) -> String
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    fragments
        .into_iter()
        .flatten()
        .map(|fragment| fragment.trim_matches('/'))
        .filter(|fragment| !fragment.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

lazy_static! {
    static ref GLOBAL_CACHE: BindingCache = BindingCache::new();
}

/// Compiled contracts keyed by contract type.
///
/// Entries are added once and never removed.
#[derive(Debug, Default)]
pub struct BindingCache {
    entries: RwLock<HashMap<TypeId, Arc<BoundContract>>>,
}

impl BindingCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cache shared by every client in the process.
    pub fn global() -> &'static BindingCache {
        &GLOBAL_CACHE
    }

    /// Return the compiled contract for `C`, compiling it on first use.
    pub fn bind<C: ServiceContract>(&self) -> Result<Arc<BoundContract>, ClientError> {
        let key = TypeId::of::<C>();
        if let Some(bound) = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
        {
            debug!("binding cache hit for {}", bound.name());
            return Ok(Arc::clone(bound));
        }

        let compiled = Arc::new(BoundContract::compile(C::contract())?);
        debug!("binding cache miss for {}, compiled", compiled.name());

        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        Ok(Arc::clone(entries.entry(key).or_insert(compiled)))
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
