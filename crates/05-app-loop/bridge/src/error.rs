use bridge_channel::ChannelError;
use bridge_codecs::CodecError;
use module_abi::ModuleError;
use thiserror::Error;

use crate::host::BridgeState;

pub type BridgeResult<T> = Result<T, BridgeError>;

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("{op} is not valid while the bridge is {state:?}")]
    InvalidState {
        op: &'static str,
        state: BridgeState,
    },

    #[error("bridge is not ready: the worker has not finished loading its bundle")]
    NotReady,

    #[error("module type {0} is not registered with this bridge")]
    ModuleNotExported(&'static str),

    #[error("no such module with id: {0}")]
    UnknownModuleId(usize),

    #[error("no such function in module {module} with id {method_id}")]
    UnknownMethodId { module: String, method_id: usize },

    #[error("no such module with name {0}")]
    ModuleNotFound(String),

    #[error("no such method {method} on module {module}")]
    MethodNotFound { module: String, method: String },

    #[error("{module}.{method} raised: {source}")]
    Invocation {
        module: String,
        method: String,
        #[source]
        source: ModuleError,
    },

    #[error("malformed flushed queue: {0}")]
    MalformedBatch(String),

    #[error(transparent)]
    Codec(CodecError),

    #[error(transparent)]
    Channel(#[from] ChannelError),

    #[error("failed to start worker: {0}")]
    Spawn(#[from] std::io::Error),
}

impl BridgeError {
    /// Protocol corruption between host and worker. There is no recovery path.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            BridgeError::UnknownModuleId(_)
                | BridgeError::UnknownMethodId { .. }
                | BridgeError::ModuleNotFound(_)
                | BridgeError::MethodNotFound { .. }
                | BridgeError::Invocation { .. }
                | BridgeError::MalformedBatch(_)
        )
    }
}

impl From<CodecError> for BridgeError {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::MalformedBatch(msg) => BridgeError::MalformedBatch(msg),
            other => BridgeError::Codec(other),
        }
    }
}
