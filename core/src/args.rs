//! Call-time argument values.
//!
//! Arguments are borrowed `serde::Serialize` values, aligned positionally with
//! the operation's declared parameters. A value serializing to `null`
//! (`Option::None`, `()`) counts as absent.

use serde::Serialize;
use serde_json::Value;

use crate::error::ClientError;

/// A value that can be passed as an operation argument.
///
/// Implemented for every `Serialize` type; the trait exists so arguments of
/// different types can share one list.
pub trait Argument {
    fn to_value(&self) -> Result<Value, ClientError>;

    /// Rust type name of the value, used to name XML root elements.
    fn type_name(&self) -> &'static str;
}

impl<T: Serialize + ?Sized> Argument for T {
    fn to_value(&self) -> Result<Value, ClientError> {
        serde_json::to_value(self).map_err(|e| ClientError::Encode(e.to_string()))
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }
}

/// Ordered argument list for one invocation.
#[derive(Default)]
pub struct Args<'a> {
    values: Vec<&'a dyn Argument>,
}

impl<'a> Args<'a> {
    pub fn new() -> Self {
        Self { values: Vec::new() }
    }

    pub fn arg<T: Argument>(self, value: &'a T) -> Self {
        self.push(value)
    }

    /// Append an already type-erased argument, e.g. one forwarded from a
    /// local operation's own arguments.
    pub fn push(mut self, value: &'a dyn Argument) -> Self {
        self.values.push(value);
        self
    }

    pub fn get(&self, index: usize) -> Option<&'a dyn Argument> {
        self.values.get(index).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a dyn Argument> + '_ {
        self.values.iter().copied()
    }
}

/// Build an [`Args`] list from expressions, borrowing each one.
///
/// ```
/// use restbind_core::args;
///
/// let lang = "de";
/// let args = args![lang, "Welt"];
/// assert_eq!(args.len(), 2);
/// ```
#[macro_export]
macro_rules! args {
    () => {
        $crate::Args::new()
    };
    ($($value:expr),+ $(,)?) => {
        $crate::Args::new()$(.arg(&$value))+
    };
}

/// Plain text form of a scalar value: strings unquoted, numbers and booleans
/// as written. `None` for null, arrays and objects.
pub(crate) fn plain_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}
