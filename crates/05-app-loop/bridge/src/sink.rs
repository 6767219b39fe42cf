use std::sync::atomic::{AtomicBool, Ordering};

use bridge_channel::{ChannelError, PortSender};
use bridge_codecs::{BridgeCodec, HostMessage};
use module_abi::{JsCall, JsCallSink, ModuleError, ModuleResult};
use parking_lot::Mutex;

use crate::error::{BridgeError, BridgeResult};

/// Outbound half shared by the bridge and every module handle it gives out.
pub(crate) struct HostSink {
    sender: Mutex<Option<PortSender>>,
    ready: AtomicBool,
    codec: BridgeCodec,
}

impl HostSink {
    pub(crate) fn new(sender: PortSender) -> Self {
        Self {
            sender: Mutex::new(Some(sender)),
            ready: AtomicBool::new(false),
            codec: BridgeCodec,
        }
    }

    pub(crate) fn set_ready(&self) {
        self.ready.store(true, Ordering::Release);
    }

    pub(crate) fn ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// Releases the sender so outstanding handles no longer keep the channel open.
    pub(crate) fn close(&self) {
        self.sender.lock().take();
    }

    pub(crate) fn send(&self, msg: &HostMessage) -> BridgeResult<()> {
        let envelope = self.codec.encode_cmd(msg)?;
        let guard = self.sender.lock();
        let sender = guard.as_ref().ok_or(ChannelError::Disconnected)?;
        sender.send(&envelope)?;
        Ok(())
    }

    pub(crate) fn send_js_call(&self, call: JsCall) -> BridgeResult<()> {
        if !self.ready() {
            return Err(BridgeError::NotReady);
        }
        self.send(&HostMessage::CallFunctionReturnFlushedQueue(call))
    }
}

impl JsCallSink for HostSink {
    fn enqueue_js_call(&self, call: JsCall) -> ModuleResult<()> {
        self.send_js_call(call).map_err(|err| match err {
            BridgeError::NotReady => ModuleError::NotReady,
            BridgeError::Channel(ChannelError::Disconnected) => ModuleError::Disconnected,
            other => ModuleError::Send(other.to_string()),
        })
    }

    fn is_ready(&self) -> bool {
        self.ready()
    }
}
