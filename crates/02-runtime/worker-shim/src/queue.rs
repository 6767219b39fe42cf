use std::collections::HashMap;

use anyhow::{anyhow, Result};
use bridge_codecs::{encode_flushed_queue, BridgeConfig};
use module_abi::NativeCall;
use serde_json::Value;

/// Native calls queued by application code during one worker turn.
///
/// Names are resolved to ids against the config the host shipped; the
/// worker never derives ids on its own.
pub struct NativeQueue {
    config: BridgeConfig,
    pending: Vec<NativeCall>,
}

impl NativeQueue {
    fn new(config: BridgeConfig) -> Self {
        Self {
            config,
            pending: Vec::new(),
        }
    }

    /// Queues `module.method(args)` for the host.
    pub fn enqueue_native_call(
        &mut self,
        module: &str,
        method: &str,
        args: Vec<Value>,
    ) -> Result<()> {
        let module_id = self
            .config
            .module_id(module)
            .ok_or_else(|| anyhow!("no native module named {module}"))?;
        let method_id = self
            .config
            .module(module_id)
            .and_then(|config| config.method_id(method))
            .ok_or_else(|| anyhow!("native module {module} has no method {method}"))?;
        self.pending.push(NativeCall {
            module_id,
            method_id,
            args,
        });
        Ok(())
    }

    /// Shipped config, as application code sees it.
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Number of calls waiting for the next flush.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Returns true when nothing is waiting.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Drains every pending call into the three-column wire form.
    pub fn flush(&mut self) -> Value {
        let calls = std::mem::take(&mut self.pending);
        encode_flushed_queue(&calls)
    }
}

type CallableModule = Box<dyn FnMut(&str, Vec<Value>, &mut NativeQueue) -> Result<()> + Send>;

/// Worker-side batched bridge: callable JS modules plus the native queue.
pub struct MessageQueue {
    callables: HashMap<String, CallableModule>,
    native: NativeQueue,
}

impl MessageQueue {
    /// Creates a queue bound to the shipped config.
    pub fn new(config: BridgeConfig) -> Self {
        Self {
            callables: HashMap::new(),
            native: NativeQueue::new(config),
        }
    }

    /// Registers a worker-resident module the host can call into.
    pub fn register_callable_module<F>(&mut self, name: impl Into<String>, module: F)
    where
        F: FnMut(&str, Vec<Value>, &mut NativeQueue) -> Result<()> + Send + 'static,
    {
        self.callables.insert(name.into(), Box::new(module));
    }

    /// Mutable access for code running outside a host call, such as bundle
    /// start-up.
    pub fn native_mut(&mut self) -> &mut NativeQueue {
        &mut self.native
    }

    /// Runs `module.method(args)` and returns everything it queued.
    ///
    /// If the callable fails, whatever it queued before failing is dropped so
    /// it cannot ride out with a later, unrelated flush.
    pub fn call_function_return_flushed_queue(
        &mut self,
        module: &str,
        method: &str,
        args: Vec<Value>,
    ) -> Result<Value> {
        let callable = self
            .callables
            .get_mut(module)
            .ok_or_else(|| anyhow!("module {module} is not a registered callable module"))?;
        if let Err(err) = callable(method, args, &mut self.native) {
            let stranded = std::mem::take(&mut self.native.pending);
            if !stranded.is_empty() {
                tracing::warn!(
                    "{module}.{method} failed; dropping {} queued native calls",
                    stranded.len()
                );
            }
            return Err(err);
        }
        Ok(self.native.flush())
    }

    /// Returns whatever is queued without running anything.
    pub fn flushed_queue(&mut self) -> Value {
        self.native.flush()
    }
}
