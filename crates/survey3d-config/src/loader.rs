// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration file loading with override support
//!
//! This module implements the 3-tier configuration loading system:
//! 1. TOML file (base defaults)
//! 2. Environment variables (runtime overrides)
//! 3. CLI arguments (explicit user overrides)

use crate::{ConfigError, ConfigResult, Survey3dConfig};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Name of the configuration file searched for on disk
pub const CONFIG_FILE_NAME: &str = "survey3d_configuration.toml";

/// Find the Survey3D configuration file
///
/// Search order:
/// 1. `SURVEY3D_CONFIG_PATH` environment variable
/// 2. Current working directory
/// 3. Up to 5 parent directories
///
/// # Errors
///
/// Returns `ConfigError::FileNotFound` if no config file is found in any location
pub fn find_config_file() -> ConfigResult<PathBuf> {
    if let Ok(env_path) = env::var("SURVEY3D_CONFIG_PATH") {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return Ok(path);
        } else {
            return Err(ConfigError::FileNotFound(format!(
                "Config file specified by SURVEY3D_CONFIG_PATH not found: {}",
                path.display()
            )));
        }
    }

    let mut search_paths = Vec::new();

    if let Ok(cwd) = env::current_dir() {
        search_paths.push(cwd.join(CONFIG_FILE_NAME));

        let mut current = cwd.clone();
        for _ in 0..5 {
            if let Some(parent) = current.parent() {
                search_paths.push(parent.join(CONFIG_FILE_NAME));
                current = parent.to_path_buf();
            }
        }
    }

    for path in &search_paths {
        if path.exists() {
            return Ok(path.clone());
        }
    }

    let search_list = search_paths
        .iter()
        .map(|p| format!("  - {}", p.display()))
        .collect::<Vec<_>>()
        .join("\n");

    Err(ConfigError::FileNotFound(format!(
        "Survey3D configuration file '{}' not found in any of these locations:\n{}\n\nSet SURVEY3D_CONFIG_PATH environment variable to specify custom location.",
        CONFIG_FILE_NAME, search_list
    )))
}

/// Load configuration from TOML file
///
/// # Arguments
///
/// * `config_path` - Optional path to config file. If `None`, will search for config file.
/// * `cli_args` - Optional CLI argument overrides
///
/// # Errors
///
/// Returns error if config file is not found or contains invalid TOML
pub fn load_config(
    config_path: Option<&Path>,
    cli_args: Option<&HashMap<String, String>>,
) -> ConfigResult<Survey3dConfig> {
    let config_file = if let Some(path) = config_path {
        path.to_path_buf()
    } else {
        find_config_file()?
    };

    let content = fs::read_to_string(&config_file)?;
    let mut config: Survey3dConfig = toml::from_str(&content)?;

    apply_environment_overrides(&mut config);

    if let Some(cli) = cli_args {
        apply_cli_overrides(&mut config, cli);
    }

    Ok(config)
}

/// Apply environment variable overrides to configuration
///
/// Supported environment variables:
/// - `SURVEY3D_GATEWAY_HOST` -> `gateway.host`
/// - `SURVEY3D_GATEWAY_PORT` -> `gateway.port`
/// - `SURVEY3D_CONFIG_DIR` -> `storage.config_dir`
/// - `SURVEY3D_DATA_DIR` -> `storage.data_dir`
/// - `SURVEY3D_BUS_SUB_ENDPOINT` -> `bus.subscribe_endpoint`
/// - `SURVEY3D_BUS_PUB_ENDPOINT` -> `bus.publish_endpoint`
/// - `SURVEY3D_LOG_LEVEL` -> `logging.level`
pub fn apply_environment_overrides(config: &mut Survey3dConfig) {
    if let Ok(value) = env::var("SURVEY3D_GATEWAY_HOST") {
        config.gateway.host = value;
    }
    if let Ok(value) = env::var("SURVEY3D_GATEWAY_PORT") {
        if let Ok(port) = value.parse::<u16>() {
            config.gateway.port = port;
        }
    }

    if let Ok(value) = env::var("SURVEY3D_CONFIG_DIR") {
        config.storage.config_dir = PathBuf::from(value);
    }
    if let Ok(value) = env::var("SURVEY3D_DATA_DIR") {
        config.storage.data_dir = PathBuf::from(value);
    }

    if let Ok(value) = env::var("SURVEY3D_BUS_SUB_ENDPOINT") {
        config.bus.subscribe_endpoint = value;
    }
    if let Ok(value) = env::var("SURVEY3D_BUS_PUB_ENDPOINT") {
        config.bus.publish_endpoint = value;
    }

    if let Ok(value) = env::var("SURVEY3D_LOG_LEVEL") {
        config.logging.level = value;
    }
}

/// Apply CLI argument overrides to configuration
///
/// Keys use the `section.field` form, e.g. `{"gateway.port": "9000"}`.
/// Values that fail to parse are ignored and the file/env value is kept.
pub fn apply_cli_overrides(config: &mut Survey3dConfig, cli_args: &HashMap<String, String>) {
    if let Some(value) = cli_args.get("gateway.host") {
        config.gateway.host = value.clone();
    }
    if let Some(value) = cli_args.get("gateway.port") {
        if let Ok(port) = value.parse::<u16>() {
            config.gateway.port = port;
        }
    }

    if let Some(value) = cli_args.get("storage.config_dir") {
        config.storage.config_dir = PathBuf::from(value);
    }
    if let Some(value) = cli_args.get("storage.data_dir") {
        config.storage.data_dir = PathBuf::from(value);
    }

    if let Some(value) = cli_args.get("bus.enabled") {
        config.bus.enabled = parse_bool(value);
    }
    if let Some(value) = cli_args.get("bus.subscribe_endpoint") {
        config.bus.subscribe_endpoint = value.clone();
    }
    if let Some(value) = cli_args.get("bus.publish_endpoint") {
        config.bus.publish_endpoint = value.clone();
    }
    if let Some(value) = cli_args.get("bus.reconnect_delay_ms") {
        if let Ok(ms) = value.parse::<u64>() {
            config.bus.reconnect_delay_ms = ms;
        }
    }
    if let Some(value) = cli_args.get("bus.liveness_timeout_ms") {
        if let Ok(ms) = value.parse::<u64>() {
            config.bus.liveness_timeout_ms = ms;
        }
    }

    if let Some(value) = cli_args.get("logging.level") {
        config.logging.level = value.clone();
    }
}

fn parse_bool(value: &str) -> bool {
    let lowered = value.to_lowercase();
    lowered == "true" || lowered == "1" || lowered == "yes"
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use std::sync::Mutex;
    use tempfile::tempdir;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn test_find_config_file_env_var() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("custom_config.toml");
        File::create(&config_path).unwrap();

        env::set_var("SURVEY3D_CONFIG_PATH", config_path.to_str().unwrap());
        let result = find_config_file();
        env::remove_var("SURVEY3D_CONFIG_PATH");

        assert_eq!(result.unwrap(), config_path);
    }

    #[test]
    fn test_find_config_file_env_var_missing() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        env::set_var("SURVEY3D_CONFIG_PATH", "/definitely/not/here.toml");
        let result = find_config_file();
        env::remove_var("SURVEY3D_CONFIG_PATH");

        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_environment_overrides() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        let mut config = Survey3dConfig::default();

        env::set_var("SURVEY3D_GATEWAY_PORT", "9100");
        env::set_var("SURVEY3D_DATA_DIR", "/tmp/surveys");
        apply_environment_overrides(&mut config);
        env::remove_var("SURVEY3D_GATEWAY_PORT");
        env::remove_var("SURVEY3D_DATA_DIR");

        assert_eq!(config.gateway.port, 9100);
        assert_eq!(config.storage.data_dir, PathBuf::from("/tmp/surveys"));
    }

    #[test]
    fn test_load_minimal_config() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        let dir = tempdir().unwrap();
        let config_path = dir.path().join(CONFIG_FILE_NAME);

        let mut file = File::create(&config_path).unwrap();
        writeln!(file, "[gateway]").unwrap();
        writeln!(file, "port = 9000").unwrap();
        writeln!(file, "[bus]").unwrap();
        writeln!(file, "reconnect_delay_ms = 250").unwrap();

        let config = load_config(Some(&config_path), None).unwrap();
        assert_eq!(config.gateway.port, 9000);
        assert_eq!(config.gateway.host, "127.0.0.1");
        assert_eq!(config.bus.reconnect_delay_ms, 250);
        assert_eq!(config.bus.poll_timeout_ms, 100);
    }

    #[test]
    fn test_cli_overrides_take_precedence() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        let dir = tempdir().unwrap();
        let config_path = dir.path().join(CONFIG_FILE_NAME);
        let mut file = File::create(&config_path).unwrap();
        writeln!(file, "[gateway]").unwrap();
        writeln!(file, "port = 9000").unwrap();

        let mut cli = HashMap::new();
        cli.insert("gateway.port".to_string(), "9500".to_string());
        cli.insert("bus.enabled".to_string(), "no".to_string());

        let config = load_config(Some(&config_path), Some(&cli)).unwrap();
        assert_eq!(config.gateway.port, 9500);
        assert!(!config.bus.enabled);
    }

    #[test]
    fn test_invalid_cli_value_is_ignored() {
        let mut config = Survey3dConfig::default();
        let mut cli = HashMap::new();
        cli.insert("gateway.port".to_string(), "not-a-port".to_string());

        apply_cli_overrides(&mut config, &cli);
        assert_eq!(config.gateway.port, 8000);
    }

    #[test]
    fn test_invalid_toml_is_parse_error() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join(CONFIG_FILE_NAME);
        let mut file = File::create(&config_path).unwrap();
        writeln!(file, "[gateway").unwrap();

        let result = load_config(Some(&config_path), None);
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }
}
