//! Module config encoder.

use std::collections::HashSet;

use module_abi::{CallingConvention, ModuleConfig, ModuleInstance};
use serde::{Deserialize, Serialize};

/// `config` object of the `loadBridgeConfig` payload.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BridgeConfig {
    #[serde(rename = "remoteModuleConfig")]
    pub remote_module_config: Vec<ModuleConfig>,
    #[serde(
        rename = "__DEVTOOLS__",
        default,
        skip_serializing_if = "std::ops::Not::not"
    )]
    pub devtools: bool,
    #[serde(
        rename = "__HOTRELOAD__",
        default,
        skip_serializing_if = "std::ops::Not::not"
    )]
    pub hot_reload: bool,
}

impl BridgeConfig {
    pub fn new(remote_module_config: Vec<ModuleConfig>) -> Self {
        Self {
            remote_module_config,
            ..Self::default()
        }
    }

    /// Module id for `name`: its position in the config list.
    pub fn module_id(&self, name: &str) -> Option<usize> {
        self.remote_module_config
            .iter()
            .position(|config| config.name == name)
    }

    pub fn module(&self, module_id: usize) -> Option<&ModuleConfig> {
        self.remote_module_config.get(module_id)
    }
}

/// Encodes one live module into its positional descriptor.
///
/// Duplicate method names collapse onto their first occurrence without
/// disturbing the order of the remaining entries.
pub fn generate_module_config(name: &str, module: &dyn ModuleInstance) -> ModuleConfig {
    let mut seen = HashSet::new();
    let mut methods = Vec::new();
    let mut promise_methods = Vec::new();
    let mut sync_methods = Vec::new();

    for entry in module.exported_methods() {
        if !seen.insert(entry.name) {
            continue;
        }
        let index = methods.len();
        methods.push(entry.name.to_string());
        match entry.convention {
            CallingConvention::Promise => promise_methods.push(index),
            CallingConvention::Sync => sync_methods.push(index),
            CallingConvention::Normal => {}
        }
    }

    ModuleConfig {
        name: name.to_string(),
        constants: module.constants_to_export(),
        methods,
        promise_methods,
        sync_methods,
    }
}

/// Encodes every `(name, module)` pair in order; the position of each entry
/// becomes that module's id.
pub fn build_remote_config(modules: &[(String, Box<dyn ModuleInstance>)]) -> Vec<ModuleConfig> {
    modules
        .iter()
        .map(|(name, module)| generate_module_config(name, module.as_ref()))
        .collect()
}
