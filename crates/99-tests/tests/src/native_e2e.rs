//! Bridge lifecycle against a worker thread: config shipping, readiness,
//! native dispatch and fatal protocol errors.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use bridge::{
    Bridge, BridgeError, BridgeOptions, BridgeState, MessageQueue, ModuleRegistry, QueueRuntime,
    WorkerGlobals,
};
use parking_lot::Mutex;
use serde_json::{json, Value};

use crate::support::{
    echo_runtime, pump_until, wait_ready, CannedRuntime, LoadRecord, RctFoo, RctPlainFoo, BUNDLE,
};

fn spawn_echo(registry: ModuleRegistry) -> (Bridge, Arc<Mutex<LoadRecord>>) {
    let record = Arc::new(Mutex::new(LoadRecord::default()));
    let bridge = Bridge::spawn(
        registry,
        "App",
        BUNDLE,
        echo_runtime(Arc::clone(&record)),
        BridgeOptions::default(),
    )
    .expect("spawn");
    (bridge, record)
}

/// The worker receives the encoded config and bundle location before it
/// reports the bundle loaded.
#[test]
fn config_reaches_worker_before_ready() {
    let (mut bridge, record) = spawn_echo(ModuleRegistry::new().with::<RctPlainFoo>());
    bridge.start().expect("start");
    assert_eq!(bridge.state(), BridgeState::AwaitingBundleLoad);
    wait_ready(&mut bridge);

    let seen = record.lock().clone();
    assert_eq!(seen.location.as_deref(), Some(BUNDLE));
    let config = serde_json::to_value(seen.config.expect("config")).expect("encode");
    assert_eq!(
        config,
        json!({ "remoteModuleConfig": [["Foo", null, ["bar"], [], []]] })
    );
    assert!(bridge.shutdown());
}

/// Query flags show up in the config the worker sees.
#[test]
fn devtools_flag_is_shipped() {
    let record = Arc::new(Mutex::new(LoadRecord::default()));
    let mut bridge = Bridge::spawn(
        ModuleRegistry::new().with::<RctPlainFoo>(),
        "App",
        BUNDLE,
        echo_runtime(Arc::clone(&record)),
        BridgeOptions::from_query("?devtools&hotreload"),
    )
    .expect("spawn");
    bridge.start().expect("start");
    wait_ready(&mut bridge);

    let config = record.lock().config.clone().expect("config");
    assert!(config.devtools);
    assert!(config.hot_reload);
    assert!(bridge.shutdown());
}

/// A worker call that queues `Foo.bar("x")` runs it on the next frame.
#[test]
fn flushed_queue_dispatches_on_next_frame() {
    let (mut bridge, _record) = spawn_echo(ModuleRegistry::new().with::<RctFoo>());
    bridge.start().expect("start");
    wait_ready(&mut bridge);

    bridge
        .enqueue_js_call("Echo", "run", vec![json!("x")])
        .expect("call");
    pump_until(&mut bridge, |b| b.pending_calls() == 1);
    assert!(bridge.module_for::<RctFoo>().expect("foo").calls.is_empty());

    let stats = bridge.dispatch_frame().expect("frame");
    assert_eq!(stats.dispatched, 1);
    assert_eq!(
        bridge.module_for::<RctFoo>().expect("foo").calls,
        vec![vec![json!("x")]]
    );
    assert!(bridge.shutdown());
}

/// Calling into the worker before it is ready fails and sends nothing.
#[test]
fn js_call_before_ready_is_rejected() {
    let (mut bridge, _record) = spawn_echo(ModuleRegistry::new().with::<RctFoo>());
    bridge.start().expect("start");

    let err = bridge.enqueue_js_call("Echo", "run", vec![]);
    assert!(matches!(err, Err(BridgeError::NotReady)));
    assert_eq!(bridge.port_metrics().sent, 1, "only loadBridgeConfig");
    assert!(bridge.shutdown());
}

/// A flushed queue naming an unknown module aborts the frame and reaches the
/// fatal handler; later calls in the batch never run.
#[test]
fn unknown_module_id_is_fatal() {
    let runtime = CannedRuntime::new([
        json!([[5], [0], [[]]]),
        json!([[0, 5, 0], [0, 0, 0], [["first"], [], ["third"]]]),
    ]);
    let mut bridge = Bridge::spawn(
        ModuleRegistry::new().with::<RctFoo>(),
        "App",
        BUNDLE,
        runtime,
        BridgeOptions::default(),
    )
    .expect("spawn");
    let fatal = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&fatal);
    bridge.set_fatal_handler(move |err: &BridgeError| sink.lock().push(err.to_string()));
    bridge.start().expect("start");
    wait_ready(&mut bridge);

    bridge.enqueue_js_call("Any", "call", vec![]).expect("call");
    pump_until(&mut bridge, |b| b.pending_calls() == 1);
    let err = bridge.dispatch_frame().expect_err("fatal");
    assert!(matches!(err, BridgeError::UnknownModuleId(5)));

    bridge.enqueue_js_call("Any", "call", vec![]).expect("call");
    pump_until(&mut bridge, |b| b.pending_calls() == 3);
    assert!(bridge.dispatch_frame().is_err());
    assert_eq!(
        bridge.module_for::<RctFoo>().expect("foo").calls,
        vec![vec![json!("first")]]
    );
    assert_eq!(fatal.lock().len(), 2);
    assert!(bridge.shutdown());
}

/// Null replies are ignored; a reply with broken columns is fatal.
#[test]
fn malformed_replies() {
    let runtime = CannedRuntime::new([Value::Null, json!("junk"), json!([[0, 1], [0], []])]);
    let mut bridge = Bridge::spawn(
        ModuleRegistry::new().with::<RctFoo>(),
        "App",
        BUNDLE,
        runtime,
        BridgeOptions::default(),
    )
    .expect("spawn");
    bridge.start().expect("start");
    wait_ready(&mut bridge);

    for _ in 0..3 {
        bridge.enqueue_js_call("Any", "call", vec![]).expect("call");
    }
    let err = loop {
        match bridge.pump_blocking(Duration::from_secs(5)) {
            Ok(n) => assert!(n > 0, "timed out waiting for replies"),
            Err(err) => break err,
        }
    };
    assert!(matches!(err, BridgeError::MalformedBatch(_)));
    assert_eq!(bridge.pending_calls(), 0);
    assert!(bridge.shutdown());
}

fn broken_bundle(
    _location: &str,
    _globals: &WorkerGlobals,
    _queue: &mut MessageQueue,
) -> Result<()> {
    anyhow::bail!("syntax error")
}

/// A bundle that fails to load never makes the bridge ready.
#[test]
fn failed_bundle_load_stalls_the_bridge() {
    let runtime = QueueRuntime::from_fn(broken_bundle);
    let mut bridge = Bridge::spawn(
        ModuleRegistry::new().with::<RctFoo>(),
        "App",
        BUNDLE,
        runtime,
        BridgeOptions::default(),
    )
    .expect("spawn");
    bridge.start().expect("start");

    assert_eq!(
        bridge
            .pump_blocking(Duration::from_millis(200))
            .expect("pump"),
        0
    );
    assert_eq!(bridge.state(), BridgeState::AwaitingBundleLoad);
    assert!(bridge.shutdown());
}
