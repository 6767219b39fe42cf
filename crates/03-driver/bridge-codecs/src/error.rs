use thiserror::Error;

pub type CodecResult<T> = Result<T, CodecError>;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("unknown topic: {0}")]
    UnknownTopic(String),

    #[error("topic {topic} is not valid in this direction")]
    WrongDirection { topic: &'static str },

    #[error("invalid {topic} payload: {source}")]
    Payload {
        topic: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("malformed flushed queue: {0}")]
    MalformedBatch(String),
}

impl CodecError {
    pub fn malformed(msg: impl Into<String>) -> Self {
        CodecError::MalformedBatch(msg.into())
    }
}
