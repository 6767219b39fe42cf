use module_abi::{BridgeHandle, BridgeModule, MethodTable};
use serde_json::{json, Value};

use crate::error::TouchResult;
use crate::event::TouchEvent;

/// Worker-side module receiving touch events.
pub const EVENT_EMITTER_MODULE: &str = "RCTEventEmitter";
pub const RECEIVE_TOUCHES: &str = "receiveTouches";

/// Destination for touch events built by a [`crate::TouchHandler`].
pub trait EventSink {
    fn send_event(&mut self, event: TouchEvent) -> TouchResult<()>;
}

/// Bridge module forwarding events to the worker's event emitter.
///
/// The bridge owns the registered instance; clone it to feed a handler.
#[derive(Clone, Debug)]
pub struct EventDispatcher {
    bridge: BridgeHandle,
}

impl EventDispatcher {
    pub fn new(bridge: BridgeHandle) -> Self {
        Self { bridge }
    }

    /// `receiveTouches` arguments for `event`.
    pub fn touch_args(event: &TouchEvent) -> TouchResult<Vec<Value>> {
        Ok(vec![
            json!(event.event_name),
            serde_json::to_value(&event.touches)?,
            json!(event.changed_indexes),
        ])
    }
}

impl BridgeModule for EventDispatcher {
    const TYPE_NAME: &'static str = "RCTEventDispatcher";

    fn create(bridge: BridgeHandle) -> Self {
        Self::new(bridge)
    }

    fn method_table() -> MethodTable<Self> {
        MethodTable::<Self>::new()
    }
}

impl EventSink for EventDispatcher {
    fn send_event(&mut self, event: TouchEvent) -> TouchResult<()> {
        let args = Self::touch_args(&event)?;
        log::trace!(
            "{} on {:?} key {}",
            event.event_name,
            event.react_tag,
            event.coalescing_key
        );
        self.bridge
            .enqueue_js_call(EVENT_EMITTER_MODULE, RECEIVE_TOUCHES, args)?;
        Ok(())
    }
}
