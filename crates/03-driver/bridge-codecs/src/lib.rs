//! Encoders and decoders for everything that crosses the host/worker channel.
//!
//! [`config`] turns live module instances into the positional descriptors the
//! worker receives once at start-up. [`messages`] maps the four wire topics to
//! typed messages and back.

#![allow(missing_docs)]

pub mod config;
mod error;
pub mod messages;

pub use config::{build_remote_config, generate_module_config, BridgeConfig};
pub use error::{CodecError, CodecResult};
pub use messages::{
    decode_flushed_queue, encode_flushed_queue, BridgeCodec, HostMessage, WorkerMessage,
    TOPIC_BUNDLE_FINISHED_LOADING, TOPIC_CALL_FUNCTION_RETURN_FLUSHED_QUEUE, TOPIC_FLUSHED_QUEUE,
    TOPIC_LOAD_BRIDGE_CONFIG,
};
