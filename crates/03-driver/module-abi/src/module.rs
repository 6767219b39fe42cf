//! Module definition surface: statically declared method tables and the
//! object-safe instance trait the bridge dispatches through.

use std::any::Any;

use serde_json::Value;

use crate::handle::BridgeHandle;
use crate::{CallingConvention, ModuleError, ModuleResult};

/// Exported method name plus its calling convention.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MethodEntry {
    pub name: &'static str,
    pub convention: CallingConvention,
}

/// Handler invoked with the call's argument list.
pub type MethodHandler<M> = fn(&mut M, Vec<Value>) -> anyhow::Result<()>;

/// Ordered `(name, convention, handler)` table declared by a module type.
///
/// Names may repeat when a table inherits from a shared parent table; lookups
/// and the config encoder both honour the first occurrence.
///
/// Start tables with `MethodTable::<Self>::new()` so closure handlers see the
/// module type.
pub struct MethodTable<M> {
    entries: Vec<(MethodEntry, MethodHandler<M>)>,
}

impl<M> MethodTable<M> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn method(
        mut self,
        name: &'static str,
        convention: CallingConvention,
        handler: MethodHandler<M>,
    ) -> Self {
        self.entries.push((MethodEntry { name, convention }, handler));
        self
    }

    /// Appends a parent table's entries after this table's own.
    pub fn inherit(mut self, parent: MethodTable<M>) -> Self {
        self.entries.extend(parent.entries);
        self
    }

    pub fn entries(&self) -> impl Iterator<Item = MethodEntry> + '_ {
        self.entries.iter().map(|(entry, _)| *entry)
    }

    pub fn handler(&self, name: &str) -> Option<MethodHandler<M>> {
        self.entries
            .iter()
            .find(|(entry, _)| entry.name == name)
            .map(|(_, handler)| *handler)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<M> Default for MethodTable<M> {
    fn default() -> Self {
        Self::new()
    }
}

/// A host-resident module type that can be registered with a bridge.
pub trait BridgeModule: Any + Send + Sized {
    /// Type identifier; the exported name is derived from it by prefix stripping.
    const TYPE_NAME: &'static str;

    /// Builds the single per-bridge instance.
    fn create(bridge: BridgeHandle) -> Self;

    fn method_table() -> MethodTable<Self>;

    /// Constants shipped alongside the module's config, if any.
    fn constants_to_export(&self) -> Option<Value> {
        None
    }
}

/// Type-erased live module owned by a bridge.
pub trait ModuleInstance: Send {
    fn type_name(&self) -> &'static str;

    /// Every declared entry in table order, duplicates included.
    fn exported_methods(&self) -> Vec<MethodEntry>;

    fn constants_to_export(&self) -> Option<Value>;

    fn has_method(&self, name: &str) -> bool;

    fn invoke(&mut self, method: &str, args: Vec<Value>) -> ModuleResult<()>;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

pub(crate) struct Hosted<M: BridgeModule> {
    module: M,
    table: MethodTable<M>,
}

impl<M: BridgeModule> Hosted<M> {
    pub(crate) fn new(bridge: BridgeHandle) -> Self {
        Self {
            module: M::create(bridge),
            table: M::method_table(),
        }
    }
}

impl<M: BridgeModule> ModuleInstance for Hosted<M> {
    fn type_name(&self) -> &'static str {
        M::TYPE_NAME
    }

    fn exported_methods(&self) -> Vec<MethodEntry> {
        self.table.entries().collect()
    }

    fn constants_to_export(&self) -> Option<Value> {
        self.module.constants_to_export()
    }

    fn has_method(&self, name: &str) -> bool {
        self.table.handler(name).is_some()
    }

    fn invoke(&mut self, method: &str, args: Vec<Value>) -> ModuleResult<()> {
        let handler = self
            .table
            .handler(method)
            .ok_or_else(|| ModuleError::NoSuchMethod {
                module: M::TYPE_NAME,
                method: method.to_string(),
            })?;
        handler(&mut self.module, args).map_err(|source| ModuleError::Handler {
            module: M::TYPE_NAME,
            method: method.to_string(),
            source,
        })
    }

    fn as_any(&self) -> &dyn Any {
        &self.module
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        &mut self.module
    }
}
