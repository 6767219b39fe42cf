use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use bridge_channel::{ChannelError, Envelope, Port};
use bridge_codecs::{BridgeCodec, HostMessage, WorkerMessage};
use parking_lot::RwLock;
use serde_json::Value;

use crate::runtime::{AppRuntime, SharedGlobals, WorkerGlobals};

/// Loading progress as seen from inside the worker.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShimStatus {
    /// No `loadBridgeConfig` handled yet.
    Idle,
    /// The last bundle load failed; the host was not told it finished.
    LoadFailed,
    /// A bundle is loaded and `bundleFinishedLoading` was sent.
    Loaded,
}

/// Message handler for the worker end of the channel.
pub struct WorkerShim<R> {
    runtime: R,
    globals: SharedGlobals,
    codec: BridgeCodec,
    status: ShimStatus,
}

impl<R: AppRuntime> WorkerShim<R> {
    /// Wraps an application runtime.
    pub fn new(runtime: R) -> Self {
        Self {
            runtime,
            globals: Arc::new(RwLock::new(WorkerGlobals::default())),
            codec: BridgeCodec,
            status: ShimStatus::Idle,
        }
    }

    /// Worker-global state shared with application code.
    pub fn globals(&self) -> SharedGlobals {
        Arc::clone(&self.globals)
    }

    /// Current loading status.
    pub fn status(&self) -> ShimStatus {
        self.status
    }

    /// Handles one decoded host message, returning the reply if any.
    pub fn handle(&mut self, msg: HostMessage) -> Option<WorkerMessage> {
        match msg {
            HostMessage::LoadBridgeConfig { config, bundle } => {
                {
                    let mut globals = self.globals.write();
                    globals.bridge_config = Some(config);
                    globals.bundle = Some(bundle.clone());
                }
                match self.runtime.load_bundle(&bundle, &self.globals) {
                    Ok(()) => {
                        tracing::debug!("bundle {bundle} loaded");
                        self.status = ShimStatus::Loaded;
                        Some(WorkerMessage::BundleFinishedLoading)
                    }
                    Err(err) => {
                        tracing::error!("failed to load bundle {bundle}: {err:#}");
                        self.status = ShimStatus::LoadFailed;
                        None
                    }
                }
            }
            HostMessage::CallFunctionReturnFlushedQueue(call) => {
                let target = format!("{}.{}", call.module, call.method);
                let flushed = match self.runtime.call_function_return_flushed_queue(call) {
                    Ok(queue) => queue,
                    Err(err) => {
                        tracing::error!("call to {target} failed: {err:#}");
                        Value::Null
                    }
                };
                Some(WorkerMessage::FlushedQueue(flushed))
            }
        }
    }

    /// Decodes, handles and re-encodes one envelope.
    pub fn handle_envelope(&mut self, envelope: Envelope) -> Option<Envelope> {
        let msg = match self.codec.decode_cmd(envelope) {
            Ok(msg) => msg,
            Err(err) => {
                tracing::warn!("worker ignoring message: {err}");
                return None;
            }
        };
        let reply = self.handle(msg)?;
        match self.codec.encode_rep(&reply) {
            Ok(envelope) => Some(envelope),
            Err(err) => {
                tracing::error!("failed to encode worker reply: {err}");
                None
            }
        }
    }

    /// Serves messages until the host end of the channel goes away.
    pub fn run(mut self, port: Port) {
        loop {
            let envelope = match port.recv() {
                Ok(envelope) => envelope,
                Err(ChannelError::Disconnected) => break,
                Err(err) => {
                    tracing::error!("worker receive failed: {err}");
                    break;
                }
            };
            if let Some(reply) = self.handle_envelope(envelope) {
                if let Err(err) = port.send(&reply) {
                    tracing::debug!("host gone while replying: {err}");
                    break;
                }
            }
        }
        tracing::debug!("worker shim stopped");
    }
}

/// Join handle for a worker started with [`spawn_worker`].
pub struct WorkerThread {
    handle: JoinHandle<()>,
}

impl WorkerThread {
    /// Waits for the worker loop to exit. Returns false if it panicked.
    pub fn join(self) -> bool {
        self.handle.join().is_ok()
    }

    /// Returns true once the worker loop has exited.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

/// Starts a shim for `runtime` on its own thread, serving `port`.
pub fn spawn_worker<R>(port: Port, runtime: R) -> io::Result<WorkerThread>
where
    R: AppRuntime + 'static,
{
    let handle = thread::Builder::new()
        .name("bridge-worker".into())
        .spawn(move || WorkerShim::new(runtime).run(port))?;
    Ok(WorkerThread { handle })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::MessageQueue;
    use crate::runtime::QueueRuntime;
    use anyhow::Result;
    use bridge_codecs::BridgeConfig;
    use module_abi::{JsCall, ModuleConfig};
    use serde_json::json;
    use std::time::{Duration, Instant};

    fn config() -> BridgeConfig {
        BridgeConfig::new(vec![ModuleConfig {
            name: "Foo".into(),
            constants: None,
            methods: vec!["bar".into()],
            promise_methods: vec![],
            sync_methods: vec![],
        }])
    }

    fn echo_runtime() -> impl AppRuntime {
        QueueRuntime::from_fn(
            |location: &str, globals: &WorkerGlobals, queue: &mut MessageQueue| -> Result<()> {
                assert_eq!(globals.bundle.as_deref(), Some(location));
                queue.register_callable_module("Echo", |method, args, native| {
                    native.enqueue_native_call("Foo", method, args)
                });
                Ok(())
            },
        )
    }

    #[test]
    fn config_is_visible_before_bundle_runs() {
        let mut shim = WorkerShim::new(QueueRuntime::from_fn(
            |_: &str, globals: &WorkerGlobals, _: &mut MessageQueue| -> Result<()> {
                let config = globals.bridge_config.as_ref().expect("config stored first");
                assert_eq!(config.module_id("Foo"), Some(0));
                Ok(())
            },
        ));
        let reply = shim.handle(HostMessage::LoadBridgeConfig {
            config: config(),
            bundle: "main.bundle".into(),
        });
        assert_eq!(reply, Some(WorkerMessage::BundleFinishedLoading));
        assert_eq!(shim.status(), ShimStatus::Loaded);
    }

    #[test]
    fn call_forwards_the_flushed_queue() {
        let mut shim = WorkerShim::new(echo_runtime());
        shim.handle(HostMessage::LoadBridgeConfig {
            config: config(),
            bundle: "main.bundle".into(),
        });
        let reply = shim.handle(HostMessage::CallFunctionReturnFlushedQueue(JsCall::new(
            "Echo",
            "bar",
            vec![json!("x")],
        )));
        assert_eq!(
            reply,
            Some(WorkerMessage::FlushedQueue(json!([[0], [0], [["x"]]])))
        );
    }

    #[test]
    fn failed_load_sends_nothing() {
        let mut shim = WorkerShim::new(QueueRuntime::from_fn(
            |_: &str, _: &WorkerGlobals, _: &mut MessageQueue| -> Result<()> {
                anyhow::bail!("syntax error")
            },
        ));
        let reply = shim.handle(HostMessage::LoadBridgeConfig {
            config: config(),
            bundle: "broken.bundle".into(),
        });
        assert_eq!(reply, None);
        assert_eq!(shim.status(), ShimStatus::LoadFailed);
    }

    #[test]
    fn failed_call_replies_with_null_queue() {
        let mut shim = WorkerShim::new(echo_runtime());
        let reply = shim.handle(HostMessage::CallFunctionReturnFlushedQueue(JsCall::new(
            "Echo",
            "bar",
            vec![],
        )));
        assert_eq!(reply, Some(WorkerMessage::FlushedQueue(Value::Null)));
    }

    #[test]
    fn worker_thread_exits_when_host_end_drops() {
        let pair = bridge_channel::make_port_pair();
        let worker = spawn_worker(pair.worker, echo_runtime()).expect("spawn");
        let load = BridgeCodec
            .encode_cmd(&HostMessage::LoadBridgeConfig {
                config: config(),
                bundle: "main.bundle".into(),
            })
            .expect("encode");
        pair.host.send(&load).expect("send");
        let reply = pair
            .host
            .recv_timeout(Duration::from_secs(5))
            .expect("connected")
            .expect("reply");
        assert_eq!(reply.topic, "bundleFinishedLoading");
        assert!(!worker.is_finished());

        drop(pair.host);
        let deadline = Instant::now() + Duration::from_secs(5);
        while !worker.is_finished() {
            assert!(Instant::now() < deadline, "worker kept running");
            thread::yield_now();
        }
        assert!(worker.join());
    }

    #[test]
    fn unknown_topics_are_ignored() {
        let mut shim = WorkerShim::new(echo_runtime());
        assert_eq!(shim.handle_envelope(Envelope::bare("devtoolsAttach")), None);
    }
}
