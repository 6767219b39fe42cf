//! Host-side bridge core.
//!
//! [`Bridge`] owns the host end of the channel, one live instance per
//! registered module, and the queue of native calls waiting for the next
//! frame. The host's own loop drives it: [`Bridge::pump_messages`] takes in
//! whatever the worker sent and [`Bridge::dispatch_frame`] runs the queued
//! calls. Nothing here schedules itself.
//!
//! There is no call/response correlation: a `flushedQueue` reply can only be
//! matched to the [`Bridge::enqueue_js_call`] that caused it by arrival order,
//! so only one logical call in flight can be attributed reliably.

mod error;
mod host;
mod options;
mod sink;

pub use error::{BridgeError, BridgeResult};
pub use host::{Bridge, BridgeState, FrameStats, DEFAULT_PUMP_BUDGET};
pub use options::BridgeOptions;

pub use bridge_codecs::BridgeConfig;
pub use module_abi::{
    derive_module_name, BridgeHandle, BridgeModule, CallingConvention, JsCall, MethodEntry,
    MethodTable, ModuleConfig, ModuleError, ModuleInstance, ModuleRegistry, ModuleType,
    NativeCall,
};
pub use worker_shim::{
    AppRuntime, BundleLoader, MessageQueue, NativeQueue, QueueRuntime, SharedGlobals,
    WorkerGlobals,
};
