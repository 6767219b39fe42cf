//! Module ABI shared by the bridge core, the config encoder and module authors.
//!
//! This crate defines the contract between host-resident native modules and
//! the bridge that exposes them to worker-side application code. It has no
//! knowledge of the channel or wire topics.

#![allow(missing_docs)]

mod handle;
mod module;
mod registry;

use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub use handle::{BridgeHandle, JsCallSink};
pub use module::{BridgeModule, MethodEntry, MethodHandler, MethodTable, ModuleInstance};
pub use registry::{derive_module_name, ModuleRegistry, ModuleType};

/// How a method's result is expected to travel back across the channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CallingConvention {
    /// Fire-and-forget; results, if any, come back as separate JS calls.
    Normal,
    /// The trailing arguments carry resolve/reject callback ids.
    Promise,
    /// Expected to return synchronously to the caller.
    Sync,
}

/// Positional descriptor of one module as shipped to the worker.
///
/// On the wire this is `[name, constants, methodNames, promiseIndices,
/// syncIndices]`. The index of a name in `methods` is its method id.
#[derive(Clone, Debug, PartialEq)]
pub struct ModuleConfig {
    pub name: String,
    pub constants: Option<Value>,
    pub methods: Vec<String>,
    pub promise_methods: Vec<usize>,
    pub sync_methods: Vec<usize>,
}

impl ModuleConfig {
    /// Returns the method name registered under `method_id`.
    pub fn method_name(&self, method_id: usize) -> Option<&str> {
        self.methods.get(method_id).map(String::as_str)
    }

    /// Returns the method id for `name`, if exported.
    pub fn method_id(&self, name: &str) -> Option<usize> {
        self.methods.iter().position(|m| m == name)
    }

    /// Returns the calling convention recorded for `method_id`.
    pub fn convention(&self, method_id: usize) -> Option<CallingConvention> {
        if method_id >= self.methods.len() {
            return None;
        }
        if self.promise_methods.contains(&method_id) {
            Some(CallingConvention::Promise)
        } else if self.sync_methods.contains(&method_id) {
            Some(CallingConvention::Sync)
        } else {
            Some(CallingConvention::Normal)
        }
    }
}

impl Serialize for ModuleConfig {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        (
            &self.name,
            &self.constants,
            &self.methods,
            &self.promise_methods,
            &self.sync_methods,
        )
            .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ModuleConfig {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let (name, constants, methods, promise_methods, sync_methods) =
            <(String, Option<Value>, Vec<String>, Vec<usize>, Vec<usize>)>::deserialize(
                deserializer,
            )?;
        Ok(Self {
            name,
            constants,
            methods,
            promise_methods,
            sync_methods,
        })
    }
}

/// Fully resolved host-side invocation waiting for the next frame.
#[derive(Clone, Debug, PartialEq)]
pub struct NativeCall {
    pub module_id: usize,
    pub method_id: usize,
    pub args: Vec<Value>,
}

/// Host-to-worker call into a worker-resident function.
///
/// Positional on the wire: `[moduleName, methodName, args]`.
#[derive(Clone, Debug, PartialEq)]
pub struct JsCall {
    pub module: String,
    pub method: String,
    pub args: Vec<Value>,
}

impl JsCall {
    pub fn new(module: impl Into<String>, method: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            module: module.into(),
            method: method.into(),
            args,
        }
    }
}

impl Serialize for JsCall {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        (&self.module, &self.method, &self.args).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for JsCall {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let (module, method, args) = <(String, String, Vec<Value>)>::deserialize(deserializer)?;
        Ok(Self {
            module,
            method,
            args,
        })
    }
}

pub type ModuleResult<T> = Result<T, ModuleError>;

#[derive(Debug, Error)]
pub enum ModuleError {
    #[error("no method {method} on module {module}")]
    NoSuchMethod { module: &'static str, method: String },

    #[error("{module}.{method} failed: {source}")]
    Handler {
        module: &'static str,
        method: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("bridge is not ready: the worker has not finished loading its bundle")]
    NotReady,

    #[error("bridge channel is closed")]
    Disconnected,

    #[error("failed to send call: {0}")]
    Send(String),
}
