//! Runs a scripted bundle behind the bridge and drives it for a number of frames.

mod modules;
mod script;

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{anyhow, bail, Context, Result};
use bridge::{Bridge, BridgeOptions, MessageQueue, ModuleRegistry, QueueRuntime, WorkerGlobals};
use clap::Parser;
use serde_json::json;
use touch_handler::{EventDispatcher, NativeTouch, SimpleViewTree, TouchHandler, ViewId};
use tracing_subscriber::{fmt, EnvFilter};

use crate::modules::{RctDeviceInfo, RctLogger};
use crate::script::BundleScript;

const ROOT_VIEW: ViewId = ViewId(1);
const ROOT_TAG: u64 = 1;

/// Load a bundle into a worker and run the host frame loop.
#[derive(Parser, Debug)]
#[command(author, version, about = "Drive a bridged application bundle", long_about = None)]
struct Cli {
    /// Path to the JSON bundle script.
    #[arg(value_name = "BUNDLE")]
    bundle: PathBuf,

    /// Application module passed to AppRegistry.runApplication.
    #[arg(short, long, default_value = "App")]
    module: String,

    /// Number of frames to run before shutting down.
    #[arg(short, long, default_value_t = 60)]
    frames: u32,

    /// Frame interval in milliseconds.
    #[arg(long, default_value_t = 16)]
    frame_ms: u64,

    /// Location query string, e.g. "?devtools&hotreload".
    #[arg(short, long, default_value = "")]
    query: String,

    /// Milliseconds to wait for the worker to finish loading the bundle.
    #[arg(long, default_value_t = 5000)]
    ready_timeout_ms: u64,

    /// Simulate a tap on the root view at X,Y once the app is running.
    #[arg(long, value_parser = parse_point, value_name = "X,Y")]
    tap: Option<Point>,
}

#[derive(Clone, Copy, Debug)]
struct Point {
    x: f64,
    y: f64,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let bundle = cli
        .bundle
        .to_str()
        .ok_or_else(|| anyhow!("bundle path {:?} is not valid UTF-8", cli.bundle))?
        .to_string();
    let options = BridgeOptions::from_query(&cli.query);

    let registry = ModuleRegistry::new()
        .with::<RctLogger>()
        .with::<RctDeviceInfo>()
        .with::<EventDispatcher>();
    let runtime = QueueRuntime::from_fn(
        |location: &str, _globals: &WorkerGlobals, queue: &mut MessageQueue| {
            BundleScript::read(location)?.install(queue)
        },
    );

    let mut bridge = Bridge::spawn(registry, cli.module.clone(), bundle.clone(), runtime, options)
        .context("failed to start bridge")?;
    bridge.set_fatal_handler(|err| tracing::error!("bridge is unusable: {err}"));
    bridge.start().context("failed to send bridge config")?;

    wait_until_ready(&mut bridge, Duration::from_millis(cli.ready_timeout_ms))
        .with_context(|| format!("failed to load {bundle}"))?;

    bridge.enqueue_js_call(
        "AppRegistry",
        "runApplication",
        vec![json!(cli.module), json!({ "rootTag": ROOT_TAG })],
    )?;

    if let Some(point) = cli.tap {
        tap(&bridge, point)?;
    }

    let interval = Duration::from_millis(cli.frame_ms);
    let mut total = 0;
    for frame in 0..cli.frames {
        let started = Instant::now();
        bridge.pump_messages()?;
        let stats = bridge.dispatch_frame()?;
        total += stats.dispatched;
        if stats.dispatched > 0 {
            tracing::debug!("frame {frame}: {} calls in {:?}", stats.dispatched, stats.elapsed);
        }
        if let Some(rest) = interval.checked_sub(started.elapsed()) {
            bridge.pump_blocking(rest)?;
        }
    }

    let logged = bridge.module_for::<RctLogger>()?.lines;
    let metrics = bridge.port_metrics();
    tracing::info!(
        "ran {} frames: {total} native calls, {logged} log lines, {} sent, {} received",
        cli.frames,
        metrics.sent,
        metrics.received
    );

    if !bridge.shutdown() {
        bail!("worker thread panicked");
    }
    Ok(())
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // Ignore error if already set (e.g., during tests).
    let _ = fmt().with_env_filter(env_filter).try_init();
}

fn wait_until_ready(bridge: &mut Bridge, timeout: Duration) -> Result<()> {
    let deadline = Instant::now() + timeout;
    while !bridge.is_ready() {
        let Some(remaining) = deadline.checked_duration_since(Instant::now()) else {
            bail!("worker did not report the bundle loaded within {timeout:?}");
        };
        bridge.pump_blocking(remaining)?;
    }
    Ok(())
}

fn tap(bridge: &Bridge, Point { x, y }: Point) -> Result<()> {
    let mut tree = SimpleViewTree::new();
    tree.insert(ROOT_VIEW, None, Some(ROOT_TAG), true);

    let dispatcher = bridge.module_for::<EventDispatcher>()?.clone();
    let mut handler = TouchHandler::new(dispatcher);
    handler.attach_to_view(ROOT_VIEW, &tree);

    let touch = NativeTouch {
        view: ROOT_VIEW,
        identifier: 0,
        page_x: x,
        page_y: y,
        location_x: x,
        location_y: y,
        timestamp: 0.0,
    };
    handler.touches_began(&[touch.clone()], &tree)?;
    handler.touches_ended(&[touch])?;
    Ok(())
}

fn parse_point(s: &str) -> Result<Point, String> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| format!("expected X,Y, got {s:?}"))?;
    let parse = |v: &str| {
        v.trim()
            .parse::<f64>()
            .map_err(|err| format!("invalid coordinate {v:?}: {err}"))
    };
    Ok(Point {
        x: parse(x)?,
        y: parse(y)?,
    })
}
