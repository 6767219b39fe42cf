//! JSON bundle format understood by the demo worker.
//!
//! ```json
//! {
//!   "onLoad": [["Logger", "log", ["booting"]]],
//!   "callables": {
//!     "AppRegistry": {
//!       "runApplication": [["Logger", "log", ["running", "$0"]]]
//!     }
//!   }
//! }
//! ```
//!
//! Each reaction is a native call queued when the callable method runs. A
//! `"$N"` string argument is replaced by the caller's N-th argument.

use std::collections::BTreeMap;
use std::fs;

use anyhow::{bail, Context, Result};
use bridge::{MessageQueue, NativeQueue};
use serde::Deserialize;
use serde_json::Value;

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct ScriptedCall(pub String, pub String, pub Vec<Value>);

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleScript {
    #[serde(default)]
    pub on_load: Vec<ScriptedCall>,
    #[serde(default)]
    pub callables: BTreeMap<String, BTreeMap<String, Vec<ScriptedCall>>>,
}

impl BundleScript {
    pub fn read(location: &str) -> Result<Self> {
        let text =
            fs::read_to_string(location).with_context(|| format!("failed to read {location}"))?;
        serde_json::from_str(&text).with_context(|| format!("failed to parse {location}"))
    }

    /// Registers the callables and queues the start-up calls.
    pub fn install(self, queue: &mut MessageQueue) -> Result<()> {
        for call in self.on_load {
            queue
                .native_mut()
                .enqueue_native_call(&call.0, &call.1, call.2)?;
        }
        for (module, methods) in self.callables {
            let name = module.clone();
            queue.register_callable_module(
                name,
                move |method: &str, args: Vec<Value>, native: &mut NativeQueue| {
                    let Some(reactions) = methods.get(method) else {
                        bail!("{module}.{method} is not scripted");
                    };
                    for reaction in reactions {
                        let bound = bind_args(&reaction.2, &args);
                        native.enqueue_native_call(&reaction.0, &reaction.1, bound)?;
                    }
                    Ok(())
                },
            );
        }
        Ok(())
    }
}

fn bind_args(template: &[Value], args: &[Value]) -> Vec<Value> {
    template
        .iter()
        .map(|value| {
            value
                .as_str()
                .and_then(|s| s.strip_prefix('$'))
                .and_then(|index| index.parse::<usize>().ok())
                .and_then(|index| args.get(index).cloned())
                .unwrap_or_else(|| value.clone())
        })
        .collect()
}
