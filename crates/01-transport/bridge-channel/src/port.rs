use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError};
use smallvec::SmallVec;

use crate::envelope::Envelope;
use crate::error::{ChannelError, ChannelResult};

/// Clonable sending half of a [`Port`].
#[derive(Clone)]
pub struct PortSender {
    tx: Sender<Vec<u8>>,
    metrics: Arc<PortMetrics>,
}

impl PortSender {
    /// Serializes and enqueues an envelope. Never blocks.
    pub fn send(&self, envelope: &Envelope) -> ChannelResult<()> {
        let frame = envelope.to_wire()?;
        self.tx
            .send(frame)
            .map_err(|_| ChannelError::Disconnected)?;
        self.metrics.sent.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

/// One end of a bidirectional channel.
pub struct Port {
    sender: PortSender,
    rx: Receiver<Vec<u8>>,
    metrics: Arc<PortMetrics>,
}

impl Port {
    pub fn send(&self, envelope: &Envelope) -> ChannelResult<()> {
        self.sender.send(envelope)
    }

    pub fn sender(&self) -> PortSender {
        self.sender.clone()
    }

    /// Drains up to `max` envelopes that have already arrived.
    ///
    /// Frames that fail to decode are logged and skipped; they still count
    /// against `max`.
    pub fn drain(&self, max: usize) -> SmallVec<[Envelope; 8]> {
        let mut out = SmallVec::new();
        let mut taken = 0;
        while taken < max {
            match self.rx.try_recv() {
                Ok(frame) => {
                    taken += 1;
                    if let Some(envelope) = self.decode(&frame) {
                        out.push(envelope);
                    }
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        out
    }

    /// Takes the next decodable envelope that has already arrived, skipping
    /// frames that fail to decode. `None` once nothing is waiting.
    pub fn try_recv(&self) -> Option<Envelope> {
        while let Ok(frame) = self.rx.try_recv() {
            if let Some(envelope) = self.decode(&frame) {
                return Some(envelope);
            }
        }
        None
    }

    /// Blocks until the next decodable envelope arrives.
    ///
    /// Returns [`ChannelError::Disconnected`] once the peer is gone and every
    /// frame it sent has been consumed.
    pub fn recv(&self) -> ChannelResult<Envelope> {
        loop {
            let frame = self.rx.recv().map_err(|_| ChannelError::Disconnected)?;
            if let Some(envelope) = self.decode(&frame) {
                return Ok(envelope);
            }
        }
    }

    /// Like [`Port::recv`] but gives up after `timeout`, returning `Ok(None)`.
    pub fn recv_timeout(&self, timeout: Duration) -> ChannelResult<Option<Envelope>> {
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.rx.recv_timeout(remaining) {
                Ok(frame) => {
                    if let Some(envelope) = self.decode(&frame) {
                        return Ok(Some(envelope));
                    }
                }
                Err(RecvTimeoutError::Timeout) => return Ok(None),
                Err(RecvTimeoutError::Disconnected) => return Err(ChannelError::Disconnected),
            }
        }
    }

    /// Returns true when no frames are waiting.
    pub fn is_idle(&self) -> bool {
        self.rx.is_empty()
    }

    pub fn metrics(&self) -> PortMetricsSnapshot {
        self.metrics.snapshot()
    }

    fn decode(&self, frame: &[u8]) -> Option<Envelope> {
        match Envelope::from_wire(frame) {
            Ok(envelope) => {
                self.metrics.received.fetch_add(1, Ordering::Relaxed);
                Some(envelope)
            }
            Err(err) => {
                self.metrics.rejected.fetch_add(1, Ordering::Relaxed);
                tracing::error!("failed to decode envelope: {err}");
                None
            }
        }
    }
}

#[derive(Default)]
struct PortMetrics {
    sent: AtomicU32,
    received: AtomicU32,
    rejected: AtomicU32,
}

impl PortMetrics {
    fn snapshot(&self) -> PortMetricsSnapshot {
        PortMetricsSnapshot {
            sent: self.sent.load(Ordering::Relaxed),
            received: self.received.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
        }
    }
}

/// Per-port counters. `sent` counts frames leaving this end, `received` and
/// `rejected` count frames arriving at it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PortMetricsSnapshot {
    pub sent: u32,
    pub received: u32,
    pub rejected: u32,
}

pub struct PortPair {
    pub host: Port,
    pub worker: Port,
}

/// Builds the two connected ends of the host/worker channel.
pub fn make_port_pair() -> PortPair {
    let (to_worker_tx, to_worker_rx) = crossbeam_channel::unbounded();
    let (to_host_tx, to_host_rx) = crossbeam_channel::unbounded();
    let host_metrics = Arc::new(PortMetrics::default());
    let worker_metrics = Arc::new(PortMetrics::default());

    let host = Port {
        sender: PortSender {
            tx: to_worker_tx,
            metrics: Arc::clone(&host_metrics),
        },
        rx: to_host_rx,
        metrics: host_metrics,
    };
    let worker = Port {
        sender: PortSender {
            tx: to_host_tx,
            metrics: Arc::clone(&worker_metrics),
        },
        rx: to_worker_rx,
        metrics: worker_metrics,
    };
    PortPair { host, worker }
}
