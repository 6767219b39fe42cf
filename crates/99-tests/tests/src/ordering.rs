//! Native calls run in arrival order, one swapped batch per frame.

use std::sync::Arc;

use bridge::{Bridge, BridgeOptions, ModuleRegistry};
use parking_lot::Mutex;
use serde_json::{json, Value};

use crate::support::{echo_runtime, pump_until, wait_ready, LoadRecord, RctFoo, BUNDLE};

fn ready_bridge() -> Bridge {
    let mut bridge = Bridge::spawn(
        ModuleRegistry::new().with::<RctFoo>(),
        "App",
        BUNDLE,
        echo_runtime(Arc::new(Mutex::new(LoadRecord::default()))),
        BridgeOptions::default(),
    )
    .expect("spawn");
    bridge.start().expect("start");
    wait_ready(&mut bridge);
    bridge
}

fn tagged(tag: &str, count: u64) -> Vec<Vec<Value>> {
    (0..count).map(|i| vec![json!(tag), json!(i)]).collect()
}

/// Two replies queued before a frame run back to back, each in its own order.
#[test]
fn batches_keep_arrival_order() {
    let mut bridge = ready_bridge();
    bridge
        .enqueue_js_call("Echo", "burst", vec![json!(50), json!("a")])
        .expect("call");
    bridge
        .enqueue_js_call("Echo", "burst", vec![json!(25), json!("b")])
        .expect("call");
    pump_until(&mut bridge, |b| b.pending_calls() == 75);

    let stats = bridge.dispatch_frame().expect("frame");
    assert_eq!(stats.dispatched, 75);

    let mut expected = tagged("a", 50);
    expected.extend(tagged("b", 25));
    assert_eq!(bridge.module_for::<RctFoo>().expect("foo").calls, expected);
    assert!(bridge.shutdown());
}

/// Work a module triggers while being dispatched lands in a later frame.
#[test]
fn calls_caused_during_dispatch_wait_for_next_frame() {
    let mut bridge = ready_bridge();
    bridge.enqueue_js_call("Echo", "relay", vec![]).expect("call");
    pump_until(&mut bridge, |b| b.pending_calls() == 1);

    // Foo.relay calls Echo.second, which queues Foo.bar("second").
    assert_eq!(bridge.dispatch_frame().expect("frame").dispatched, 1);
    assert_eq!(bridge.pending_calls(), 0);

    pump_until(&mut bridge, |b| b.pending_calls() == 1);
    assert_eq!(bridge.dispatch_frame().expect("frame").dispatched, 1);
    assert_eq!(
        bridge.module_for::<RctFoo>().expect("foo").calls,
        vec![vec![], vec![json!("second")]]
    );
    assert!(bridge.shutdown());
}

/// With nothing pending a frame does nothing.
#[test]
fn idle_frames_are_no_ops() {
    let mut bridge = ready_bridge();
    for _ in 0..3 {
        let stats = bridge.dispatch_frame().expect("frame");
        assert_eq!(stats.dispatched, 0);
    }
    assert!(bridge.shutdown());
}
