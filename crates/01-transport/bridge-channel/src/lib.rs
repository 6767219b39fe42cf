//! Ordered, copy-by-message channel between the host and worker contexts.
//!
//! Every message is an [`Envelope`] (`{topic, payload}`) serialized to JSON
//! bytes before it crosses, so the two sides never share memory. Each
//! direction preserves send order and never drops or duplicates a frame.

#![allow(missing_docs)]

mod envelope;
mod error;
mod port;

pub use envelope::Envelope;
pub use error::{ChannelError, ChannelResult};
pub use port::{make_port_pair, Port, PortMetricsSnapshot, PortPair, PortSender};
