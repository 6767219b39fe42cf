use thiserror::Error;

pub type ChannelResult<T> = Result<T, ChannelError>;

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("peer side of the channel is gone")]
    Disconnected,

    #[error("wire encoding error: {0}")]
    Wire(#[from] serde_json::Error),
}
