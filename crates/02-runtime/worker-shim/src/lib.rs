#![deny(missing_docs)]
//! Worker-side counterpart of the bridge.
//!
//! The shim owns the worker end of the channel and handles one host message
//! to completion before taking the next. It never interprets the flushed
//! queue; it only forwards what the application runtime returns.

mod queue;
mod runtime;
mod shim;

pub use queue::{MessageQueue, NativeQueue};
pub use runtime::{AppRuntime, BundleLoader, QueueRuntime, SharedGlobals, WorkerGlobals};
pub use shim::{spawn_worker, ShimStatus, WorkerShim, WorkerThread};
