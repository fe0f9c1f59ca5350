// src/main.rs

//! The main entry point for the pixelflood server application.

use anyhow::{Context, Result, anyhow};
use pixelflood::config::Config;
use pixelflood::core::sink::{FramebufferSink, ProxySink, RenderSink};
use pixelflood::server::Server;
use std::env;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{filter::EnvFilter, prelude::*};

const DEFAULT_CONFIG_PATH: &str = "pixelflood.toml";

#[tokio::main]
async fn main() -> Result<()> {
    run_app().await
}

async fn run_app() -> Result<()> {
    const VERSION: &str = env!("CARGO_PKG_VERSION");

    let args: Vec<String> = env::args().collect();

    if args.contains(&"--version".to_string()) {
        println!("pixelflood version {VERSION}");
        return Ok(());
    }

    let mut config = match load_config(&args) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("{e:#}");
            std::process::exit(1);
        }
    };

    // Command-line overrides.
    if let Some(port) = flag_value::<u16>(&args, "--port")? {
        config.port = port;
    }
    if let Some(width) = flag_value::<u16>(&args, "--width")? {
        config.width = width;
    }
    if let Some(height) = flag_value::<u16>(&args, "--height")? {
        config.height = height;
    }

    // Get initial log level from env var or config.
    let initial_log_level = env::var("RUST_LOG").unwrap_or_else(|_| config.log_level.clone());
    tracing_subscriber::registry()
        .with(EnvFilter::new(initial_log_level))
        .with(
            tracing_subscriber::fmt::layer()
                .compact() // Use the compact, single-line format.
                .with_ansi(true),
        )
        .init();

    info!("Starting pixelflood {VERSION}");

    let sinks = build_sinks(&config);
    let mut server = Server::new(config)
        .await
        .context("Failed to start the server")?;
    for sink in sinks {
        server = server.with_sink(sink);
    }
    let server = Arc::new(server);

    let mut runner = {
        let server = server.clone();
        tokio::spawn(async move { server.run().await })
    };

    tokio::select! {
        res = &mut runner => {
            let res = res.map_err(|e| anyhow!("Server task panicked: {e:?}"))?;
            if let Err(e) = res {
                error!("Server runtime error: {}", e);
                return Err(e.into());
            }
        }
        _ = shutdown_signal() => {
            info!("Shutdown signal received, initiating graceful shutdown.");
            server.stop().await;
            runner
                .await
                .map_err(|e| anyhow!("Server task panicked: {e:?}"))??;
        }
    }

    Ok(())
}

/// Loads the file named by `--config`, or the default file if it exists.
fn load_config(args: &[String]) -> Result<Config> {
    let explicit = args
        .iter()
        .position(|arg| arg == "--config")
        .map(|i| {
            args.get(i + 1)
                .map(String::as_str)
                .ok_or_else(|| anyhow!("--config flag requires a value"))
        })
        .transpose()?;

    match explicit {
        Some(path) => Config::from_file(path),
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => Config::from_file(DEFAULT_CONFIG_PATH),
        None => Ok(Config::default()),
    }
}

/// Parses the value following `flag`, if the flag is present.
fn flag_value<T: std::str::FromStr>(args: &[String], flag: &str) -> Result<Option<T>> {
    let Some(index) = args.iter().position(|arg| arg == flag) else {
        return Ok(None);
    };
    let raw = args
        .get(index + 1)
        .ok_or_else(|| anyhow!("{flag} flag requires a value"))?;
    raw.parse::<T>()
        .map(Some)
        .map_err(|_| anyhow!("Invalid value for {flag}: {raw}"))
}

fn build_sinks(config: &Config) -> Vec<Arc<dyn RenderSink>> {
    let mut sinks: Vec<Arc<dyn RenderSink>> = Vec::new();
    if config.framebuffer.enabled {
        sinks.push(Arc::new(FramebufferSink::from_config(&config.framebuffer)));
    }
    for proxy in &config.proxy {
        sinks.push(Arc::new(ProxySink::from_config(proxy)));
    }
    sinks
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to register SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
