//! Typed messages for the four wire topics.
//!
//! Commands (host to worker) are [`HostMessage`]s; reports (worker to host)
//! are [`WorkerMessage`]s. The `flushedQueue` payload stays a raw value until
//! the host interprets it with [`decode_flushed_queue`], which owns the
//! lenient-parse rule.

use bridge_channel::Envelope;
use module_abi::{JsCall, NativeCall};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::BridgeConfig;
use crate::error::{CodecError, CodecResult};

pub const TOPIC_LOAD_BRIDGE_CONFIG: &str = "loadBridgeConfig";
pub const TOPIC_BUNDLE_FINISHED_LOADING: &str = "bundleFinishedLoading";
pub const TOPIC_CALL_FUNCTION_RETURN_FLUSHED_QUEUE: &str = "callFunctionReturnFlushedQueue";
pub const TOPIC_FLUSHED_QUEUE: &str = "flushedQueue";

const MODULE_IDS: usize = 0;
const METHOD_IDS: usize = 1;
const PARAMS: usize = 2;

/// Messages sent from the host to the worker.
#[derive(Clone, Debug, PartialEq)]
pub enum HostMessage {
    LoadBridgeConfig { config: BridgeConfig, bundle: String },
    CallFunctionReturnFlushedQueue(JsCall),
}

/// Messages sent from the worker to the host.
#[derive(Clone, Debug, PartialEq)]
pub enum WorkerMessage {
    BundleFinishedLoading,
    /// Raw flushed queue as returned by the application runtime.
    FlushedQueue(Value),
}

#[derive(Serialize, Deserialize)]
struct LoadBridgeConfigPayload {
    config: BridgeConfig,
    bundle: String,
}

/// Codec for both directions of the bridge channel.
#[derive(Clone, Copy, Debug, Default)]
pub struct BridgeCodec;

impl BridgeCodec {
    pub fn encode_cmd(&self, msg: &HostMessage) -> CodecResult<Envelope> {
        match msg {
            HostMessage::LoadBridgeConfig { config, bundle } => {
                let payload = LoadBridgeConfigPayload {
                    config: config.clone(),
                    bundle: bundle.clone(),
                };
                Ok(Envelope::new(
                    TOPIC_LOAD_BRIDGE_CONFIG,
                    to_value(TOPIC_LOAD_BRIDGE_CONFIG, &payload)?,
                ))
            }
            HostMessage::CallFunctionReturnFlushedQueue(call) => Ok(Envelope::new(
                TOPIC_CALL_FUNCTION_RETURN_FLUSHED_QUEUE,
                to_value(TOPIC_CALL_FUNCTION_RETURN_FLUSHED_QUEUE, call)?,
            )),
        }
    }

    pub fn decode_cmd(&self, envelope: Envelope) -> CodecResult<HostMessage> {
        match envelope.topic.as_str() {
            TOPIC_LOAD_BRIDGE_CONFIG => {
                let payload: LoadBridgeConfigPayload =
                    from_value(TOPIC_LOAD_BRIDGE_CONFIG, envelope.payload)?;
                Ok(HostMessage::LoadBridgeConfig {
                    config: payload.config,
                    bundle: payload.bundle,
                })
            }
            TOPIC_CALL_FUNCTION_RETURN_FLUSHED_QUEUE => {
                let call: JsCall =
                    from_value(TOPIC_CALL_FUNCTION_RETURN_FLUSHED_QUEUE, envelope.payload)?;
                Ok(HostMessage::CallFunctionReturnFlushedQueue(call))
            }
            TOPIC_BUNDLE_FINISHED_LOADING => Err(CodecError::WrongDirection {
                topic: TOPIC_BUNDLE_FINISHED_LOADING,
            }),
            TOPIC_FLUSHED_QUEUE => Err(CodecError::WrongDirection {
                topic: TOPIC_FLUSHED_QUEUE,
            }),
            _ => Err(CodecError::UnknownTopic(envelope.topic)),
        }
    }

    pub fn encode_rep(&self, msg: &WorkerMessage) -> CodecResult<Envelope> {
        match msg {
            WorkerMessage::BundleFinishedLoading => {
                Ok(Envelope::bare(TOPIC_BUNDLE_FINISHED_LOADING))
            }
            WorkerMessage::FlushedQueue(queue) => {
                Ok(Envelope::new(TOPIC_FLUSHED_QUEUE, queue.clone()))
            }
        }
    }

    pub fn decode_rep(&self, envelope: Envelope) -> CodecResult<WorkerMessage> {
        match envelope.topic.as_str() {
            TOPIC_BUNDLE_FINISHED_LOADING => Ok(WorkerMessage::BundleFinishedLoading),
            TOPIC_FLUSHED_QUEUE => Ok(WorkerMessage::FlushedQueue(envelope.payload)),
            TOPIC_LOAD_BRIDGE_CONFIG => Err(CodecError::WrongDirection {
                topic: TOPIC_LOAD_BRIDGE_CONFIG,
            }),
            TOPIC_CALL_FUNCTION_RETURN_FLUSHED_QUEUE => Err(CodecError::WrongDirection {
                topic: TOPIC_CALL_FUNCTION_RETURN_FLUSHED_QUEUE,
            }),
            _ => Err(CodecError::UnknownTopic(envelope.topic)),
        }
    }
}

/// Interprets a `flushedQueue` payload.
///
/// `null` and any non-array payload yield `Ok(None)` and are meant to be
/// ignored. An array must hold three equal-length columns of module ids,
/// method ids and argument lists; anything else is a malformed batch.
pub fn decode_flushed_queue(payload: &Value) -> CodecResult<Option<Vec<NativeCall>>> {
    let Some(columns) = payload.as_array() else {
        return Ok(None);
    };
    if columns.len() < 3 {
        return Err(CodecError::malformed(format!(
            "expected 3 columns, got {}",
            columns.len()
        )));
    }

    let module_ids = column(columns, MODULE_IDS, "moduleIds")?;
    let method_ids = column(columns, METHOD_IDS, "methodIds")?;
    let params = column(columns, PARAMS, "params")?;
    if module_ids.len() != method_ids.len() || module_ids.len() != params.len() {
        return Err(CodecError::malformed(format!(
            "column lengths differ: {} module ids, {} method ids, {} param lists",
            module_ids.len(),
            method_ids.len(),
            params.len()
        )));
    }

    module_ids
        .iter()
        .zip(method_ids)
        .zip(params)
        .enumerate()
        .map(|(i, ((module_id, method_id), args))| {
            Ok(NativeCall {
                module_id: id(module_id, i, "module")?,
                method_id: id(method_id, i, "method")?,
                args: args
                    .as_array()
                    .cloned()
                    .ok_or_else(|| CodecError::malformed(format!("params[{i}] is not an array")))?,
            })
        })
        .collect::<CodecResult<Vec<_>>>()
        .map(Some)
}

/// Builds the three-column payload for `calls`, or `null` when there are none.
pub fn encode_flushed_queue(calls: &[NativeCall]) -> Value {
    if calls.is_empty() {
        return Value::Null;
    }
    let module_ids = calls.iter().map(|c| Value::from(c.module_id)).collect();
    let method_ids = calls.iter().map(|c| Value::from(c.method_id)).collect();
    let params = calls.iter().map(|c| Value::Array(c.args.clone())).collect();
    Value::Array(vec![
        Value::Array(module_ids),
        Value::Array(method_ids),
        Value::Array(params),
    ])
}

fn column<'a>(columns: &'a [Value], index: usize, label: &str) -> CodecResult<&'a Vec<Value>> {
    columns[index]
        .as_array()
        .ok_or_else(|| CodecError::malformed(format!("{label} is not an array")))
}

fn id(value: &Value, index: usize, kind: &str) -> CodecResult<usize> {
    value
        .as_u64()
        .and_then(|v| usize::try_from(v).ok())
        .ok_or_else(|| {
            CodecError::malformed(format!("{kind} id at {index} is not an index: {value}"))
        })
}

fn to_value<T: Serialize>(topic: &'static str, value: &T) -> CodecResult<Value> {
    serde_json::to_value(value).map_err(|source| CodecError::Payload { topic, source })
}

fn from_value<T: for<'de> Deserialize<'de>>(topic: &'static str, value: Value) -> CodecResult<T> {
    serde_json::from_value(value).map_err(|source| CodecError::Payload { topic, source })
}
