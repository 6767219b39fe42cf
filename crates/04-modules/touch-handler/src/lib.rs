//! Touch and mouse input bridged to worker-side responders.
//!
//! Host input arrives as [`RawInteraction`]s, is normalized into
//! [`NativeTouch`]es, tracked by [`TouchHandler`], and leaves as
//! [`TouchEvent`]s through an [`EventSink`], normally the registered
//! [`EventDispatcher`] module.

mod dispatcher;
mod error;
mod event;
mod handler;
mod view;

pub use dispatcher::{EventDispatcher, EventSink, EVENT_EMITTER_MODULE, RECEIVE_TOUCHES};
pub use error::{TouchError, TouchResult};
pub use event::{
    normalize_interaction, MouseInput, NativeTouch, RawInteraction, ReactTouch, TouchEvent,
    TouchPhase, TouchPoint,
};
pub use handler::TouchHandler;
pub use view::{SimpleViewTree, ViewId, ViewTree};
