use std::any::TypeId;
use std::collections::HashMap;
use std::mem;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bridge_channel::{make_port_pair, Envelope, Port, PortMetricsSnapshot};
use bridge_codecs::{
    build_remote_config, decode_flushed_queue, BridgeCodec, BridgeConfig, HostMessage,
    WorkerMessage,
};
use module_abi::{
    BridgeHandle, BridgeModule, JsCall, JsCallSink, ModuleConfig, ModuleInstance, ModuleRegistry,
    NativeCall,
};
use serde_json::Value;
use worker_shim::{spawn_worker, AppRuntime, WorkerThread};

use crate::error::{BridgeError, BridgeResult};
use crate::options::BridgeOptions;
use crate::sink::HostSink;

/// Envelopes handled per [`Bridge::pump_messages`] call.
pub const DEFAULT_PUMP_BUDGET: usize = 256;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BridgeState {
    Uninitialized,
    AwaitingBundleLoad,
    Ready,
    /// Ready and inside [`Bridge::dispatch_frame`].
    Dispatching,
}

/// What one [`Bridge::dispatch_frame`] did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub dispatched: usize,
    pub elapsed: Duration,
}

type FatalHandler = Box<dyn FnMut(&BridgeError) + Send>;
type ReadyCallback = Box<dyn FnMut() + Send>;

/// Host end of the bridge.
pub struct Bridge {
    module_name: String,
    bundle_location: String,
    options: BridgeOptions,
    registry: ModuleRegistry,
    state: BridgeState,
    modules_initialized: bool,
    modules: Vec<(String, Box<dyn ModuleInstance>)>,
    by_name: HashMap<String, usize>,
    by_type: HashMap<TypeId, String>,
    /// Snapshot of the config sent to the worker; native call ids index into it.
    dispatch_table: Vec<ModuleConfig>,
    pending: Vec<NativeCall>,
    port: Port,
    codec: BridgeCodec,
    sink: Arc<HostSink>,
    on_bundle_finished: Option<ReadyCallback>,
    fatal_handler: Option<FatalHandler>,
    worker: Option<WorkerThread>,
}

impl Bridge {
    /// Creates a bridge serving the host end of `port`. Nothing is sent until
    /// [`Bridge::load_bridge_config`].
    pub fn new(
        registry: ModuleRegistry,
        module_name: impl Into<String>,
        bundle_location: impl Into<String>,
        port: Port,
        options: BridgeOptions,
    ) -> Self {
        let sink = Arc::new(HostSink::new(port.sender()));
        Self {
            module_name: module_name.into(),
            bundle_location: bundle_location.into(),
            options,
            registry,
            state: BridgeState::Uninitialized,
            modules_initialized: false,
            modules: Vec::new(),
            by_name: HashMap::new(),
            by_type: HashMap::new(),
            dispatch_table: Vec::new(),
            pending: Vec::new(),
            port,
            codec: BridgeCodec,
            sink,
            on_bundle_finished: None,
            fatal_handler: None,
            worker: None,
        }
    }

    /// Starts a worker thread running `runtime` and returns a bridge connected
    /// to it. The bridge still needs [`Bridge::start`].
    pub fn spawn<R>(
        registry: ModuleRegistry,
        module_name: impl Into<String>,
        bundle_location: impl Into<String>,
        runtime: R,
        options: BridgeOptions,
    ) -> BridgeResult<Self>
    where
        R: AppRuntime + 'static,
    {
        let pair = make_port_pair();
        let worker = spawn_worker(pair.worker, runtime)?;
        let mut bridge = Self::new(registry, module_name, bundle_location, pair.host, options);
        bridge.worker = Some(worker);
        Ok(bridge)
    }

    /// [`Bridge::initialize_modules`] followed by [`Bridge::load_bridge_config`].
    pub fn start(&mut self) -> BridgeResult<()> {
        self.initialize_modules()?;
        self.load_bridge_config()
    }

    pub fn initialize_modules(&mut self) -> BridgeResult<()> {
        if self.modules_initialized || self.state != BridgeState::Uninitialized {
            return Err(BridgeError::InvalidState {
                op: "initialize_modules",
                state: self.state,
            });
        }

        let types: Vec<_> = self.registry.types().to_vec();
        for module_type in types {
            let name = module_type.name();
            let sink: Arc<dyn JsCallSink> = self.sink.clone();
            let instance = module_type.instantiate(BridgeHandle::new(sink));
            match self.by_name.get(&name) {
                Some(&index) => {
                    tracing::warn!(
                        "module {} replaces {} under name {name:?}",
                        module_type.type_name(),
                        self.modules[index].1.type_name()
                    );
                    self.modules[index].1 = instance;
                }
                None => {
                    self.by_name.insert(name.clone(), self.modules.len());
                    self.modules.push((name.clone(), instance));
                }
            }
            self.by_type.insert(module_type.type_id(), name);
        }

        self.modules_initialized = true;
        tracing::debug!("initialized {} modules", self.modules.len());
        Ok(())
    }

    /// Ships the module config and bundle location to the worker.
    pub fn load_bridge_config(&mut self) -> BridgeResult<()> {
        if !self.modules_initialized || self.state != BridgeState::Uninitialized {
            return Err(BridgeError::InvalidState {
                op: "load_bridge_config",
                state: self.state,
            });
        }

        let remote_module_config = build_remote_config(&self.modules);
        let config = BridgeConfig {
            remote_module_config: remote_module_config.clone(),
            devtools: self.options.devtools,
            hot_reload: self.options.hot_reload,
        };
        self.sink.send(&HostMessage::LoadBridgeConfig {
            config,
            bundle: self.bundle_location.clone(),
        })?;
        self.dispatch_table = remote_module_config;
        self.transition(BridgeState::AwaitingBundleLoad);
        Ok(())
    }

    /// Registers the callback run when the worker reports its bundle loaded.
    pub fn on_bundle_finished(&mut self, callback: impl FnMut() + Send + 'static) {
        self.on_bundle_finished = Some(Box::new(callback));
    }

    /// Installs the supervisor notified of every fatal error.
    pub fn set_fatal_handler(&mut self, handler: impl FnMut(&BridgeError) + Send + 'static) {
        self.fatal_handler = Some(Box::new(handler));
    }

    /// Calls a function living in the worker. Fire-and-forget: any native
    /// calls it triggers come back through [`Bridge::pump_messages`].
    pub fn enqueue_js_call(
        &self,
        module: &str,
        method: &str,
        args: Vec<Value>,
    ) -> BridgeResult<()> {
        if !self.is_ready() {
            return Err(BridgeError::NotReady);
        }
        tracing::trace!("js call {module}.{method}");
        self.sink.send_js_call(JsCall::new(module, method, args))
    }

    /// Handles up to [`DEFAULT_PUMP_BUDGET`] envelopes that have already arrived.
    pub fn pump_messages(&mut self) -> BridgeResult<usize> {
        self.pump_messages_with_budget(DEFAULT_PUMP_BUDGET)
    }

    /// Handles arrived envelopes one at a time, so a fatal error leaves the
    /// rest in the channel.
    pub fn pump_messages_with_budget(&mut self, max: usize) -> BridgeResult<usize> {
        let mut handled = 0;
        while handled < max {
            let Some(envelope) = self.port.try_recv() else {
                break;
            };
            self.on_message(envelope)?;
            handled += 1;
        }
        Ok(handled)
    }

    /// Waits up to `timeout` for the worker to send something, then handles it
    /// along with anything else already waiting.
    pub fn pump_blocking(&mut self, timeout: Duration) -> BridgeResult<usize> {
        let Some(envelope) = self.port.recv_timeout(timeout)? else {
            return Ok(0);
        };
        self.on_message(envelope)?;
        Ok(1 + self.pump_messages()?)
    }

    /// Handles one envelope from the worker.
    pub fn on_message(&mut self, envelope: Envelope) -> BridgeResult<()> {
        let msg = match self.codec.decode_rep(envelope) {
            Ok(msg) => msg,
            Err(err) => {
                tracing::warn!("ignoring worker message: {err}");
                return Ok(());
            }
        };

        match msg {
            WorkerMessage::BundleFinishedLoading => {
                if self.state == BridgeState::Uninitialized {
                    tracing::warn!("bundle finished loading before any config was sent");
                }
                self.sink.set_ready();
                self.transition(BridgeState::Ready);
                tracing::debug!("bundle {} loaded for {}", self.bundle_location, self.module_name);
                if let Some(callback) = self.on_bundle_finished.as_mut() {
                    callback();
                }
            }
            WorkerMessage::FlushedQueue(payload) => match decode_flushed_queue(&payload) {
                Ok(Some(calls)) => {
                    tracing::trace!("queued {} native calls", calls.len());
                    self.pending.extend(calls);
                }
                Ok(None) => {}
                Err(err) => return Err(self.fail(err.into())),
            },
        }
        Ok(())
    }

    /// Runs every native call queued before this frame, in arrival order.
    ///
    /// Stops at the first failing call; that call and the rest of the batch
    /// are dropped.
    pub fn dispatch_frame(&mut self) -> BridgeResult<FrameStats> {
        let started = Instant::now();
        let calls = mem::take(&mut self.pending);
        if calls.is_empty() {
            return Ok(FrameStats::default());
        }

        let resume = self.state;
        if resume == BridgeState::Ready {
            self.state = BridgeState::Dispatching;
        }

        let total = calls.len();
        let mut dispatched = 0;
        for call in calls {
            if let Err(err) = self.call_native_module(call.module_id, call.method_id, call.args) {
                self.state = resume;
                tracing::error!(
                    "frame aborted after {dispatched} of {total} calls, {} discarded",
                    total - dispatched - 1
                );
                return Err(self.fail(err));
            }
            dispatched += 1;
        }

        self.state = resume;
        let stats = FrameStats {
            dispatched,
            elapsed: started.elapsed(),
        };
        tracing::debug!("dispatched {} calls in {:?}", stats.dispatched, stats.elapsed);
        Ok(stats)
    }

    /// Resolves one native call against the shipped config and invokes it.
    pub fn call_native_module(
        &mut self,
        module_id: usize,
        method_id: usize,
        args: Vec<Value>,
    ) -> BridgeResult<()> {
        let config = self
            .dispatch_table
            .get(module_id)
            .ok_or(BridgeError::UnknownModuleId(module_id))?;
        let module = config.name.clone();
        let method = config
            .method_name(method_id)
            .ok_or_else(|| BridgeError::UnknownMethodId {
                module: module.clone(),
                method_id,
            })?
            .to_string();

        let index = *self
            .by_name
            .get(&module)
            .ok_or_else(|| BridgeError::ModuleNotFound(module.clone()))?;
        let instance = &mut self.modules[index].1;
        if !instance.has_method(&method) {
            return Err(BridgeError::MethodNotFound { module, method });
        }

        tracing::trace!("native call {module}.{method}");
        instance
            .invoke(&method, args)
            .map_err(|source| BridgeError::Invocation {
                module,
                method,
                source,
            })
    }

    /// The live instance of module type `M`.
    pub fn module_for<M: BridgeModule>(&self) -> BridgeResult<&M> {
        let index = self.index_of::<M>()?;
        let (name, instance) = &self.modules[index];
        instance
            .as_any()
            .downcast_ref::<M>()
            .ok_or_else(|| BridgeError::ModuleNotFound(name.clone()))
    }

    pub fn module_for_mut<M: BridgeModule>(&mut self) -> BridgeResult<&mut M> {
        let index = self.index_of::<M>()?;
        let (name, instance) = &mut self.modules[index];
        let name = name.clone();
        instance
            .as_any_mut()
            .downcast_mut::<M>()
            .ok_or(BridgeError::ModuleNotFound(name))
    }

    pub fn module_by_name(&self, name: &str) -> Option<&dyn ModuleInstance> {
        let &index = self.by_name.get(name)?;
        Some(self.modules[index].1.as_ref())
    }

    /// Exported module names in config order.
    pub fn module_names(&self) -> impl Iterator<Item = &str> {
        self.modules.iter().map(|(name, _)| name.as_str())
    }

    /// Config entries native call ids resolve against. Empty until
    /// [`Bridge::load_bridge_config`].
    pub fn module_configs(&self) -> &[ModuleConfig] {
        &self.dispatch_table
    }

    pub fn state(&self) -> BridgeState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, BridgeState::Ready | BridgeState::Dispatching)
    }

    pub fn module_name(&self) -> &str {
        &self.module_name
    }

    pub fn bundle_location(&self) -> &str {
        &self.bundle_location
    }

    pub fn options(&self) -> BridgeOptions {
        self.options
    }

    /// Native calls waiting for the next frame.
    pub fn pending_calls(&self) -> usize {
        self.pending.len()
    }

    pub fn port_metrics(&self) -> PortMetricsSnapshot {
        self.port.metrics()
    }

    /// Closes the channel and waits for the worker thread, if this bridge
    /// started one. Returns false if the worker panicked.
    pub fn shutdown(mut self) -> bool {
        let worker = self.worker.take();
        drop(self);
        worker.map_or(true, WorkerThread::join)
    }

    fn index_of<M: BridgeModule>(&self) -> BridgeResult<usize> {
        let name = self
            .by_type
            .get(&TypeId::of::<M>())
            .ok_or(BridgeError::ModuleNotExported(M::TYPE_NAME))?;
        self.by_name
            .get(name)
            .copied()
            .ok_or_else(|| BridgeError::ModuleNotFound(name.clone()))
    }

    fn transition(&mut self, next: BridgeState) {
        if self.state != next {
            tracing::debug!("bridge {:?} -> {:?}", self.state, next);
            self.state = next;
        }
    }

    fn fail(&mut self, err: BridgeError) -> BridgeError {
        tracing::error!("fatal bridge error: {err}");
        if let Some(handler) = self.fatal_handler.as_mut() {
            handler(&err);
        }
        err
    }
}

impl Drop for Bridge {
    fn drop(&mut self) {
        // Module handles share the sink; closing it lets the worker see EOF.
        self.sink.close();
    }
}
