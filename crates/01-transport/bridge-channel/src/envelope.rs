use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ChannelResult;

/// Wire envelope shared by both directions of the channel.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub topic: String,
    /// Absent payloads decode as `null`.
    #[serde(default)]
    pub payload: Value,
}

impl Envelope {
    pub fn new(topic: impl Into<String>, payload: Value) -> Self {
        Self {
            topic: topic.into(),
            payload,
        }
    }

    /// Envelope carrying only a topic.
    pub fn bare(topic: impl Into<String>) -> Self {
        Self::new(topic, Value::Null)
    }

    pub fn to_wire(&self) -> ChannelResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn from_wire(bytes: &[u8]) -> ChannelResult<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}
