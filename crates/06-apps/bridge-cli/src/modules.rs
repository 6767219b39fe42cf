//! Host modules the demo bundle can call.

use bridge::{BridgeHandle, BridgeModule, CallingConvention, MethodTable};
use serde_json::{json, Value};

fn describe(args: &[Value]) -> String {
    args.iter()
        .map(|arg| match arg {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Prints worker log lines through the host's subscriber.
pub struct RctLogger {
    pub lines: usize,
}

impl BridgeModule for RctLogger {
    const TYPE_NAME: &'static str = "RCTLogger";

    fn create(_bridge: BridgeHandle) -> Self {
        Self { lines: 0 }
    }

    fn method_table() -> MethodTable<Self> {
        MethodTable::<Self>::new()
            .method("log", CallingConvention::Normal, |logger, args| {
                logger.lines += 1;
                tracing::info!(target: "worker", "{}", describe(&args));
                Ok(())
            })
            .method("warn", CallingConvention::Normal, |logger, args| {
                logger.lines += 1;
                tracing::warn!(target: "worker", "{}", describe(&args));
                Ok(())
            })
    }
}

/// Window metrics exported as constants.
pub struct RctDeviceInfo {
    bridge: BridgeHandle,
    width: u32,
    height: u32,
}

impl RctDeviceInfo {
    fn emit_dimensions(&mut self, _args: Vec<Value>) -> anyhow::Result<()> {
        self.bridge.enqueue_js_call(
            "RCTDeviceEventEmitter",
            "emit",
            vec![json!("didUpdateDimensions"), self.dimensions()],
        )?;
        Ok(())
    }

    fn dimensions(&self) -> Value {
        json!({ "window": { "width": self.width, "height": self.height, "scale": 1 } })
    }
}

impl BridgeModule for RctDeviceInfo {
    const TYPE_NAME: &'static str = "RCTDeviceInfo";

    fn create(bridge: BridgeHandle) -> Self {
        Self {
            bridge,
            width: 800,
            height: 600,
        }
    }

    fn method_table() -> MethodTable<Self> {
        MethodTable::<Self>::new().method(
            "emitDimensions",
            CallingConvention::Normal,
            Self::emit_dimensions,
        )
    }

    fn constants_to_export(&self) -> Option<Value> {
        Some(json!({ "Dimensions": self.dimensions() }))
    }
}
