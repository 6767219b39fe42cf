//! Touches travel from the host handler to the worker's event emitter.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use bridge::{Bridge, BridgeOptions, MessageQueue, ModuleRegistry, QueueRuntime, WorkerGlobals};
use parking_lot::Mutex;
use serde_json::{json, Value};
use touch_handler::{
    EventDispatcher, MouseInput, RawInteraction, SimpleViewTree, TouchHandler, TouchPhase, ViewId,
    EVENT_EMITTER_MODULE, RECEIVE_TOUCHES,
};

use crate::support::{wait_ready, BUNDLE, DEADLINE};

const ROOT: ViewId = ViewId(1);
const BUTTON: ViewId = ViewId(2);

fn click(which: u8, x: f64) -> RawInteraction {
    RawInteraction::Mouse(MouseInput {
        target: BUTTON,
        which: Some(which),
        button: None,
        page_x: x,
        page_y: x,
        offset_x: 0.0,
        offset_y: 0.0,
        timestamp: x,
    })
}

#[test]
fn click_reaches_receive_touches() {
    let received: Arc<Mutex<Vec<(String, Vec<Value>)>>> = Arc::default();
    let log = Arc::clone(&received);
    let runtime = QueueRuntime::from_fn(
        move |_location: &str, _globals: &WorkerGlobals, queue: &mut MessageQueue| -> Result<()> {
            let log = Arc::clone(&log);
            queue.register_callable_module(EVENT_EMITTER_MODULE, move |method: &str, args, _| {
                log.lock().push((method.to_string(), args));
                Ok(())
            });
            Ok(())
        },
    );

    let mut bridge = Bridge::spawn(
        ModuleRegistry::new().with::<EventDispatcher>(),
        "App",
        BUNDLE,
        runtime,
        BridgeOptions::default(),
    )
    .expect("spawn");
    bridge.start().expect("start");
    wait_ready(&mut bridge);
    assert_eq!(
        bridge.module_configs()[0].name,
        "EventDispatcher",
        "dispatcher is exported"
    );

    let mut tree = SimpleViewTree::new();
    tree.insert(ROOT, None, Some(1), false)
        .insert(BUTTON, Some(ROOT), Some(7), true);
    let dispatcher = bridge
        .module_for::<EventDispatcher>()
        .expect("dispatcher")
        .clone();
    let mut handler = TouchHandler::new(dispatcher);
    handler.attach_to_view(ROOT, &tree);

    assert!(handler
        .handle_interaction(TouchPhase::Start, &click(1, 3.0), &tree)
        .expect("down"));
    assert!(handler
        .handle_interaction(TouchPhase::End, &click(1, 4.0), &tree)
        .expect("up"));

    let deadline = Instant::now() + DEADLINE;
    while received.lock().len() < 2 {
        assert!(Instant::now() < deadline, "worker never saw the touches");
        bridge
            .pump_blocking(Duration::from_millis(50))
            .expect("pump");
    }

    let received = received.lock().clone();
    assert!(received.iter().all(|(method, _)| method == RECEIVE_TOUCHES));
    assert_eq!(received[0].1[0], json!("touchStart"));
    assert_eq!(received[1].1[0], json!("touchEnd"));
    assert_eq!(received[0].1[1][0]["target"], json!(7));
    assert_eq!(received[1].1[1][0]["pageX"], json!(4.0));
    assert_eq!(received[1].1[2], json!([0]));
    assert!(bridge.shutdown());
}
