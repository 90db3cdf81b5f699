//! Registry of functions callable over RPC.
//!
//! The registry is populated once at startup (see [`Registry::builtin`]) and
//! shared read-only by every session afterwards.

mod builtins;
pub mod params;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;
use tracing::debug;

pub use params::{CoercionError, ParamSpec, ParamType};

/// Failure raised while invoking a registered function.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CallError {
    /// Wrong arity or a parameter of the wrong type
    #[error("{0}")]
    Argument(String),
    /// A precondition of the function was violated
    #[error("{0}")]
    Domain(String),
}

/// Signature shared by every registered handler.
pub type Handler = dyn Fn(&Args) -> Result<Value, CallError> + Send + Sync;

/// Validated positional arguments handed to a handler.
///
/// Arity and types are checked against the function's [`ParamSpec`]s before
/// the handler runs, so the accessors only fail on a mis-declared function.
pub struct Args<'a> {
    values: &'a [Value],
}

impl<'a> Args<'a> {
    fn new(values: &'a [Value]) -> Self {
        Self { values }
    }

    fn get(&self, index: usize) -> Result<&'a Value, CallError> {
        self.values
            .get(index)
            .ok_or_else(|| CallError::Argument(format!("missing argument {}", index + 1)))
    }

    pub fn real(&self, index: usize) -> Result<f64, CallError> {
        self.get(index)?
            .as_f64()
            .ok_or_else(|| CallError::Argument(format!("argument {} must be a float", index + 1)))
    }

    pub fn integer(&self, index: usize) -> Result<i64, CallError> {
        self.get(index)?
            .as_i64()
            .ok_or_else(|| CallError::Argument(format!("argument {} must be an int", index + 1)))
    }

    pub fn text(&self, index: usize) -> Result<&'a str, CallError> {
        self.get(index)?
            .as_str()
            .ok_or_else(|| CallError::Argument(format!("argument {} must be a str", index + 1)))
    }

    pub fn text_list(&self, index: usize) -> Result<Vec<&'a str>, CallError> {
        let items = self.get(index)?.as_array().ok_or_else(|| {
            CallError::Argument(format!("argument {} must be a list of str", index + 1))
        })?;
        items
            .iter()
            .map(|item| {
                item.as_str().ok_or_else(|| {
                    CallError::Argument(format!("argument {} must be a list of str", index + 1))
                })
            })
            .collect()
    }
}

/// Public description of a registered function: name, help text and parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodSpec {
    pub name: String,
    pub description: String,
    pub params: Vec<ParamSpec>,
}

/// A function exposed over RPC.
#[derive(Clone)]
pub struct RegisteredFunction {
    spec: MethodSpec,
    handler: Arc<Handler>,
}

impl RegisteredFunction {
    pub fn new<F>(
        name: impl Into<String>,
        description: impl Into<String>,
        params: Vec<ParamSpec>,
        handler: F,
    ) -> Self
    where
        F: Fn(&Args) -> Result<Value, CallError> + Send + Sync + 'static,
    {
        Self {
            spec: MethodSpec {
                name: name.into(),
                description: description.into(),
                params,
            },
            handler: Arc::new(handler),
        }
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub fn spec(&self) -> &MethodSpec {
        &self.spec
    }

    /// Check arity and parameter types, then run the handler.
    pub fn invoke(&self, params: &[Value]) -> Result<Value, CallError> {
        let expected = &self.spec.params;
        if params.len() != expected.len() {
            return Err(CallError::Argument(format!(
                "{}() takes {} argument{} but {} were given",
                self.spec.name,
                expected.len(),
                if expected.len() == 1 { "" } else { "s" },
                params.len()
            )));
        }

        for (param, value) in expected.iter().zip(params) {
            if !param.ty.accepts(value) {
                return Err(CallError::Argument(format!(
                    "argument '{}' of {}() must be {}, got {}",
                    param.name,
                    self.spec.name,
                    param.ty,
                    type_name(value)
                )));
            }
        }

        (self.handler)(&Args::new(params))
    }
}

impl fmt::Debug for RegisteredFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredFunction")
            .field("spec", &self.spec)
            .finish_non_exhaustive()
    }
}

/// Name → function mapping.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    functions: HashMap<String, RegisteredFunction>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding `floor`, `nroot`, `reverse`, `validAnagram` and `sort`.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for function in builtins::all() {
            registry.register(function);
        }
        registry
    }

    /// Add a function, replacing any earlier one with the same name.
    pub fn register(&mut self, function: RegisteredFunction) {
        let name = function.name().to_string();
        if self.functions.insert(name.clone(), function).is_some() {
            debug!(method = %name, "Replaced registered function");
        }
    }

    pub fn resolve(&self, name: &str) -> Option<&RegisteredFunction> {
        self.functions.get(name)
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// Specs of all registered functions, sorted by name.
    pub fn catalog(&self) -> Vec<MethodSpec> {
        let mut specs: Vec<MethodSpec> = self.functions.values().map(|f| f.spec.clone()).collect();
        specs.sort_by(|a, b| a.name.cmp(&b.name));
        specs
    }
}

/// Type name of a JSON value: `int`, `float`, `str`, `bool`, `list`, `dict` or `null`.
pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "int",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}
