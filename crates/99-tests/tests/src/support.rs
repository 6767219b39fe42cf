//! Shared modules and runtimes for the end-to-end tests.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use bridge::{
    AppRuntime, Bridge, BridgeConfig, BridgeHandle, BridgeModule, CallingConvention, JsCall,
    MessageQueue, MethodTable, NativeQueue, QueueRuntime, SharedGlobals, WorkerGlobals,
};
use parking_lot::Mutex;
use serde_json::Value;

pub const BUNDLE: &str = "bundle://app.js";
pub const DEADLINE: Duration = Duration::from_secs(5);

/// `RCTFoo`: records `bar` calls; `relay` records and calls back into the worker.
pub struct RctFoo {
    pub calls: Vec<Vec<Value>>,
    bridge: BridgeHandle,
}

impl BridgeModule for RctFoo {
    const TYPE_NAME: &'static str = "RCTFoo";

    fn create(bridge: BridgeHandle) -> Self {
        Self {
            calls: Vec::new(),
            bridge,
        }
    }

    fn method_table() -> MethodTable<Self> {
        MethodTable::<Self>::new()
            .method("bar", CallingConvention::Normal, |foo, args| {
                foo.calls.push(args);
                Ok(())
            })
            .method("relay", CallingConvention::Normal, |foo, args| {
                foo.calls.push(args);
                foo.bridge.enqueue_js_call("Echo", "second", vec![])?;
                Ok(())
            })
    }
}

/// `RCTFoo` with only `bar`, for config shape checks.
pub struct RctPlainFoo;

impl BridgeModule for RctPlainFoo {
    const TYPE_NAME: &'static str = "RCTFoo";

    fn create(_bridge: BridgeHandle) -> Self {
        RctPlainFoo
    }

    fn method_table() -> MethodTable<Self> {
        MethodTable::<Self>::new().method("bar", CallingConvention::Normal, |_, _| Ok(()))
    }
}

/// What the worker saw while loading.
#[derive(Clone, Debug, Default)]
pub struct LoadRecord {
    pub config: Option<BridgeConfig>,
    pub location: Option<String>,
}

/// Worker runtime exposing an `Echo` callable:
/// - `run(args)` queues `Foo.bar(args)`
/// - `burst(n, tag)` queues `Foo.bar(tag, i)` for `i` in `0..n`
/// - `relay()` queues `Foo.relay()`
/// - `second()` queues `Foo.bar("second")`
pub fn echo_runtime(record: Arc<Mutex<LoadRecord>>) -> impl AppRuntime {
    QueueRuntime::from_fn(
        move |location: &str, globals: &WorkerGlobals, queue: &mut MessageQueue| -> Result<()> {
            {
                let mut seen = record.lock();
                seen.config = globals.bridge_config.clone();
                seen.location = Some(location.to_string());
            }
            queue.register_callable_module("Echo", echo);
            Ok(())
        },
    )
}

fn echo(method: &str, args: Vec<Value>, native: &mut NativeQueue) -> Result<()> {
    match method {
        "run" => native.enqueue_native_call("Foo", "bar", args),
        "burst" => {
            let count = args.first().and_then(Value::as_u64).unwrap_or(0);
            let tag = args.get(1).cloned().unwrap_or(Value::Null);
            for i in 0..count {
                native.enqueue_native_call("Foo", "bar", vec![tag.clone(), Value::from(i)])?;
            }
            Ok(())
        }
        "relay" => native.enqueue_native_call("Foo", "relay", vec![]),
        "second" => native.enqueue_native_call("Foo", "bar", vec![Value::from("second")]),
        other => anyhow::bail!("Echo.{other} is not defined"),
    }
}

/// Worker runtime answering every call with the next canned flushed queue.
pub struct CannedRuntime {
    replies: VecDeque<Value>,
}

impl CannedRuntime {
    pub fn new(replies: impl IntoIterator<Item = Value>) -> Self {
        Self {
            replies: replies.into_iter().collect(),
        }
    }
}

impl AppRuntime for CannedRuntime {
    fn load_bundle(&mut self, _location: &str, _globals: &SharedGlobals) -> Result<()> {
        Ok(())
    }

    fn call_function_return_flushed_queue(&mut self, _call: JsCall) -> Result<Value> {
        Ok(self.replies.pop_front().unwrap_or(Value::Null))
    }
}

/// Pumps until the worker reports its bundle loaded.
pub fn wait_ready(bridge: &mut Bridge) {
    pump_until(bridge, |b| b.is_ready());
}

/// Pumps until `done` holds, failing the test after [`DEADLINE`].
pub fn pump_until(bridge: &mut Bridge, mut done: impl FnMut(&Bridge) -> bool) {
    let deadline = Instant::now() + DEADLINE;
    while !done(bridge) {
        let remaining = deadline
            .checked_duration_since(Instant::now())
            .expect("timed out waiting for the worker");
        bridge.pump_blocking(remaining).expect("pump");
    }
}
