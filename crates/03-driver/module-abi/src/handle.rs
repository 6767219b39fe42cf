use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::{JsCall, ModuleError, ModuleResult};

/// Outbound seam the bridge core implements for module back-references.
pub trait JsCallSink: Send + Sync {
    /// Sends a call to a worker-resident function. Must reject calls made
    /// before the worker has signalled readiness.
    fn enqueue_js_call(&self, call: JsCall) -> ModuleResult<()>;

    fn is_ready(&self) -> bool;
}

/// Back-reference handed to every module instance at construction.
#[derive(Clone)]
pub struct BridgeHandle {
    sink: Arc<dyn JsCallSink>,
}

impl BridgeHandle {
    pub fn new(sink: Arc<dyn JsCallSink>) -> Self {
        Self { sink }
    }

    /// Handle that is permanently disconnected; useful outside a bridge.
    pub fn detached() -> Self {
        Self::new(Arc::new(Detached))
    }

    pub fn enqueue_js_call(
        &self,
        module: &str,
        method: &str,
        args: Vec<Value>,
    ) -> ModuleResult<()> {
        self.sink.enqueue_js_call(JsCall::new(module, method, args))
    }

    pub fn is_ready(&self) -> bool {
        self.sink.is_ready()
    }
}

impl fmt::Debug for BridgeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BridgeHandle")
            .field("ready", &self.is_ready())
            .finish()
    }
}

struct Detached;

impl JsCallSink for Detached {
    fn enqueue_js_call(&self, _call: JsCall) -> ModuleResult<()> {
        Err(ModuleError::Disconnected)
    }

    fn is_ready(&self) -> bool {
        false
    }
}
