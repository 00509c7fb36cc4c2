// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use survey3d_bridge::{BridgeConfig, BusBridge, ZmqConnector};
use survey3d_config::{
    apply_cli_overrides, apply_environment_overrides, find_config_file, load_config,
    validate_config, Survey3dConfig,
};
use survey3d_observability::{init_logging, CrateDebugFlags, LogFormat, ObservabilityConfig};
use survey3d_server::{Gateway, GatewayServer};
use survey3d_session::SessionManager;
use tracing::{info, warn};

/// Survey3D session server - WebSocket gateway plus lab bus bridge
#[derive(Parser, Debug)]
#[command(name = "survey3d-server", version, author, long_about = None)]
struct Args {
    /// Path to survey3d_configuration.toml (searched for when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory submitted surveys are written to
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Gateway port
    #[arg(short, long)]
    port: Option<u16>,

    /// Run without connecting to the message bus
    #[arg(long, default_value_t = false)]
    no_bus: bool,

    /// Enable debug logging for a crate (repeatable), e.g. --debug survey3d-bridge
    #[arg(long = "debug", value_name = "CRATE")]
    debug: Vec<String>,

    /// Enable debug logging for every crate
    #[arg(long, default_value_t = false)]
    debug_all: bool,

    /// Enable verbose logging
    #[arg(short, long, default_value_t = false)]
    verbose: bool,
}

impl Args {
    fn overrides(&self) -> HashMap<String, String> {
        let mut overrides = HashMap::new();
        if let Some(dir) = &self.data_dir {
            overrides.insert("storage.data_dir".to_string(), dir.display().to_string());
        }
        if let Some(port) = self.port {
            overrides.insert("gateway.port".to_string(), port.to_string());
        }
        if self.no_bus {
            overrides.insert("bus.enabled".to_string(), "false".to_string());
        }
        overrides
    }

    fn debug_flags(&self) -> CrateDebugFlags {
        let mut flags = CrateDebugFlags::from_args(self.debug.iter().map(|c| format!("--debug-{}", c)));
        if self.debug_all {
            flags.enable_all();
        }
        if let Ok(value) = std::env::var("SURVEY3D_DEBUG") {
            flags.merge_env_value(&value);
        }
        flags
    }
}

/// Load the configuration file, or fall back to defaults when none is found
fn load_configuration(args: &Args) -> Result<(Survey3dConfig, Option<PathBuf>)> {
    let overrides = args.overrides();

    let path = match &args.config {
        Some(path) => Some(path.clone()),
        None => find_config_file().ok(),
    };

    let config = match &path {
        Some(path) => load_config(Some(path.as_path()), Some(&overrides))
            .with_context(|| format!("Failed to load {}", path.display()))?,
        None => {
            let mut config = Survey3dConfig::default();
            apply_environment_overrides(&mut config);
            apply_cli_overrides(&mut config, &overrides);
            config
        }
    };

    validate_config(&config).context("Invalid configuration")?;
    Ok((config, path))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let (config, config_path) = load_configuration(&args)?;

    let observability = ObservabilityConfig {
        level: if args.verbose {
            "debug".to_string()
        } else {
            config.logging.level.clone()
        },
        format: LogFormat::Text,
        log_dir: config.logging.log_dir.clone(),
        file_logging: config.logging.file_logging,
        retention_days: config.logging.retention_days,
        retention_runs: config.logging.retention_runs,
    };
    let _logging = init_logging(&args.debug_flags(), &observability)?;

    info!("Survey3D server v{}", survey3d_server::VERSION);
    match &config_path {
        Some(path) => info!("[CONFIG] Loaded {}", path.display()),
        None => warn!("[CONFIG] No configuration file found, using defaults"),
    }

    let participant_file = config.storage.participant_config_path();
    let manager = Arc::new(
        SessionManager::open(&participant_file, config.storage.data_dir.clone())
            .with_context(|| format!("Failed to load {}", participant_file.display()))?,
    );
    info!(
        "Loaded {} participant(s); writing surveys to {}",
        manager.participant_config().len(),
        manager.data_path().display()
    );

    let mut gateway = Gateway::new(Arc::clone(&manager));
    let bridge = if config.bus.enabled {
        let handle = Arc::new(BusBridge::spawn(
            ZmqConnector::from_config(&config.bus),
            Arc::clone(&manager),
            BridgeConfig::from(&config.bus),
        )?);
        gateway = gateway.with_sink(handle.clone());
        Some(handle)
    } else {
        info!("Message bus disabled");
        None
    };

    let server = GatewayServer::bind(&config.gateway, gateway).await?;
    server
        .serve(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
            info!("Shutdown signal received...");
        })
        .await?;

    if let Some(bridge) = bridge {
        tokio::task::spawn_blocking(move || bridge.shutdown()).await?;
    }

    info!("Survey3D server stopped");
    Ok(())
}
