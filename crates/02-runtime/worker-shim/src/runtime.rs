use std::sync::Arc;

use anyhow::{anyhow, Result};
use bridge_codecs::BridgeConfig;
use module_abi::JsCall;
use parking_lot::RwLock;
use serde_json::Value;

use crate::queue::MessageQueue;

/// Worker-global state visible to application code once a config arrives.
#[derive(Debug, Default)]
pub struct WorkerGlobals {
    /// Config shipped by the host in `loadBridgeConfig`.
    pub bridge_config: Option<BridgeConfig>,
    /// Location of the most recently loaded bundle.
    pub bundle: Option<String>,
}

/// Shared handle to [`WorkerGlobals`].
pub type SharedGlobals = Arc<RwLock<WorkerGlobals>>;

/// Application runtime executing inside the worker.
pub trait AppRuntime: Send {
    /// Loads and runs the bundle at `location` synchronously.
    fn load_bundle(&mut self, location: &str, globals: &SharedGlobals) -> Result<()>;

    /// Invokes a worker-resident function and returns the flushed queue.
    fn call_function_return_flushed_queue(&mut self, call: JsCall) -> Result<Value>;
}

/// Executes a bundle against a freshly configured [`MessageQueue`].
pub trait BundleLoader: Send {
    /// Runs the bundle found at `location`.
    fn load(&mut self, location: &str, globals: &WorkerGlobals, queue: &mut MessageQueue)
        -> Result<()>;
}

impl<F> BundleLoader for F
where
    F: FnMut(&str, &WorkerGlobals, &mut MessageQueue) -> Result<()> + Send,
{
    fn load(
        &mut self,
        location: &str,
        globals: &WorkerGlobals,
        queue: &mut MessageQueue,
    ) -> Result<()> {
        self(location, globals, queue)
    }
}

/// [`AppRuntime`] backed by a [`MessageQueue`] and a pluggable loader.
pub struct QueueRuntime<L> {
    loader: L,
    queue: Option<MessageQueue>,
}

impl<L: BundleLoader> QueueRuntime<L> {
    /// Wraps `loader`; nothing runs until the bundle is loaded.
    pub fn new(loader: L) -> Self {
        Self {
            loader,
            queue: None,
        }
    }
}

impl<F> QueueRuntime<F>
where
    F: FnMut(&str, &WorkerGlobals, &mut MessageQueue) -> Result<()> + Send,
{
    /// Builds a runtime from a loader closure.
    pub fn from_fn(loader: F) -> Self {
        Self::new(loader)
    }
}

impl<L: BundleLoader> AppRuntime for QueueRuntime<L> {
    fn load_bundle(&mut self, location: &str, globals: &SharedGlobals) -> Result<()> {
        let globals = globals.read();
        let config = globals
            .bridge_config
            .clone()
            .ok_or_else(|| anyhow!("bundle load before bridge config"))?;
        let mut queue = MessageQueue::new(config);
        self.loader.load(location, &globals, &mut queue)?;
        self.queue = Some(queue);
        Ok(())
    }

    fn call_function_return_flushed_queue(&mut self, call: JsCall) -> Result<Value> {
        let queue = self
            .queue
            .as_mut()
            .ok_or_else(|| anyhow!("no bundle loaded"))?;
        queue.call_function_return_flushed_queue(&call.module, &call.method, call.args)
    }
}
