use module_abi::ModuleError;
use thiserror::Error;

use crate::view::ViewId;

pub type TouchResult<T> = Result<T, TouchError>;

#[derive(Debug, Error)]
pub enum TouchError {
    #[error("invalid interaction event: {0}")]
    InvalidEvent(String),

    #[error("touch {0} is already recorded")]
    DuplicateTouch(u32),

    #[error("view {0:?} is not inside the attached root view")]
    UnmanagedTarget(ViewId),

    #[error("attempting to send touch event with no root view attached")]
    NoRootView,

    #[error("failed to send touch event: {0}")]
    Send(#[from] ModuleError),

    #[error("failed to encode touches: {0}")]
    Encode(#[from] serde_json::Error),
}
