// SPDX-License-Identifier: MIT OR Apache-2.0
use anyhow::{Context, Result};
use clap::Parser;
use faultline_boundary::{Boundary, capabilities_from_config};
use faultline_classify::{RegistryBuilder, install_global};
use faultline_config::{FaultlineConfig, LogFormat, load_config, validate_config};
use faultline_daemon::{AppState, DEFAULT_BIND, build_app};
use faultline_telemetry::{BufferedSink, TracingSink, drain};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "faultline-daemon", version, about = "faultline error boundary daemon")]
struct Args {
    /// Bind address (overrides the config file).
    #[arg(long)]
    bind: Option<String>,

    /// Path to a TOML config file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Render debug details in error bodies.
    #[arg(long)]
    debug: bool,

    /// Log output format: text or json.
    #[arg(long)]
    log_format: Option<LogFormat>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = load_config(args.config.as_deref()).context("load config")?;
    if args.debug {
        config.debug = true;
    }
    if let Some(format) = args.log_format {
        config.log_format = format;
    }
    if let Some(bind) = args.bind {
        config.bind = Some(bind);
    }

    init_tracing(&config);

    for warning in validate_config(&config).context("validate config")? {
        warn!(target: "faultline.daemon", %warning, "config warning");
    }

    let caps = capabilities_from_config(&config.capabilities);
    let registry = install_global(RegistryBuilder::with_builtins(&caps)?.freeze())?;

    let (sink, events) = BufferedSink::new(config.telemetry_buffer);
    tokio::spawn(drain(events, TracingSink));

    let boundary = Boundary::from_registry(registry.clone(), &config).with_sink(Arc::new(sink));
    let app = build_app(Arc::new(AppState::new(boundary)));

    let bind = config.bind.as_deref().unwrap_or(DEFAULT_BIND);
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("bind {bind}"))?;
    info!(
        target: "faultline.daemon",
        bind = %bind,
        translators = registry.len(),
        debug = config.debug,
        "faultline-daemon listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serve")
}

fn init_tracing(config: &FaultlineConfig) {
    let level = config.log_level.as_deref().unwrap_or("info");
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("faultline={level}")));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match config.log_format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!(target: "faultline.daemon", "shutdown requested");
    }
}
