use std::any::TypeId;
use std::fmt;

use crate::handle::BridgeHandle;
use crate::module::{BridgeModule, Hosted, ModuleInstance};

const MODULE_PREFIXES: [&str; 2] = ["RK", "RCT"];

/// Derives the externally visible module name from a type identifier.
///
/// `RK` and `RCT` prefixes are stripped, checked in that order. Identifiers
/// without a recognized prefix map to the empty name.
pub fn derive_module_name(type_name: &str) -> String {
    MODULE_PREFIXES
        .iter()
        .find_map(|prefix| type_name.strip_prefix(prefix))
        .unwrap_or_default()
        .to_string()
}

/// Registration record for one module type.
#[derive(Clone, Copy)]
pub struct ModuleType {
    type_id: TypeId,
    type_name: &'static str,
    factory: fn(BridgeHandle) -> Box<dyn ModuleInstance>,
}

fn instantiate_hosted<M: BridgeModule>(bridge: BridgeHandle) -> Box<dyn ModuleInstance> {
    Box::new(Hosted::<M>::new(bridge))
}

impl ModuleType {
    pub fn of<M: BridgeModule>() -> Self {
        Self {
            type_id: TypeId::of::<M>(),
            type_name: M::TYPE_NAME,
            factory: instantiate_hosted::<M>,
        }
    }

    /// Registration record for an instance built by hand rather than through
    /// [`BridgeModule`]. `T` only provides the type identity.
    pub fn custom<T: 'static>(
        type_name: &'static str,
        factory: fn(BridgeHandle) -> Box<dyn ModuleInstance>,
    ) -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name,
            factory,
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Exported module name.
    pub fn name(&self) -> String {
        derive_module_name(self.type_name)
    }

    pub fn instantiate(&self, bridge: BridgeHandle) -> Box<dyn ModuleInstance> {
        (self.factory)(bridge)
    }
}

impl fmt::Debug for ModuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleType")
            .field("type_name", &self.type_name)
            .finish()
    }
}

/// Ordered list of exportable module types.
///
/// Each bridge takes its own registry so several bridges can live in one
/// process without sharing registration state.
#[derive(Clone, Debug, Default)]
pub struct ModuleRegistry {
    types: Vec<ModuleType>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `M`. Returns false if the type was already registered.
    pub fn register<M: BridgeModule>(&mut self) -> bool {
        self.register_type(ModuleType::of::<M>())
    }

    pub fn register_type(&mut self, module_type: ModuleType) -> bool {
        if self.types.iter().any(|t| t.type_id == module_type.type_id) {
            tracing::debug!(
                "module type {} already registered",
                module_type.type_name
            );
            return false;
        }
        self.types.push(module_type);
        true
    }

    /// Chaining form of [`ModuleRegistry::register`].
    pub fn with<M: BridgeModule>(mut self) -> Self {
        self.register::<M>();
        self
    }

    pub fn contains<M: BridgeModule>(&self) -> bool {
        let id = TypeId::of::<M>();
        self.types.iter().any(|t| t.type_id == id)
    }

    /// Registered types in registration order.
    pub fn types(&self) -> &[ModuleType] {
        &self.types
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}
