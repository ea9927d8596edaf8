//! Configuration Loader
//!
//! 实现多源配置加载与合并逻辑
//!
//! 优先级（从高到低）：
//! 1. 环境变量
//! 2. 配置文件（shadowing.toml）
//! 3. 默认值

use config::{Config, ConfigError as ConfigCrateError, Environment, File};
use std::path::Path;
use thiserror::Error;

use super::types::AppConfig;

/// 配置加载错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigCrateError> for ConfigError {
    fn from(err: ConfigCrateError) -> Self {
        ConfigError::LoadError(err.to_string())
    }
}

/// 配置文件搜索路径
const CONFIG_FILE_NAMES: &[&str] = &["shadowing", "shadowing.local"];

/// 加载应用配置
///
/// 按优先级从高到低合并配置：
/// 1. 环境变量（前缀 `SHADOWING_`，层级分隔符 `__`）
/// 2. 配置文件（shadowing.toml 或 shadowing.local.toml）
/// 3. 默认值
///
/// # 环境变量示例
/// - `SHADOWING_SYNTHESIS__URL=http://tts-server:8000`
/// - `SHADOWING_ASSETS__PROBE=http`
/// - `SHADOWING_PRELOAD__MAX_CONCURRENT=4`
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from_path(None)
}

/// 从指定路径加载配置
///
/// # 参数
/// - `config_path` - 可选的配置文件路径，如果为 None 则使用默认搜索路径
pub fn load_config_from_path(config_path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut builder = Config::builder();

    // 1. 默认值（最低优先级）
    builder = builder
        .set_default("assets.mapping_path", "public/audio/conversation/mapping.json")?
        .set_default("assets.base_url", "/audio/conversation")?
        .set_default("assets.root_dir", "public/audio/conversation")?
        .set_default("assets.probe", "file")?
        .set_default("assets.origin", "http://localhost:3000")?
        .set_default("assets.probe_timeout_secs", 5)?
        .set_default("synthesis.url", "http://localhost:8000")?
        .set_default("synthesis.timeout_secs", 30)?
        .set_default("synthesis.max_retries", 0)?
        .set_default("synthesis.voice", "alloy")?
        .set_default("synthesis.model", "tts-1")?
        .set_default("synthesis.speed", 1.0)?
        .set_default("playback.min_rate", 0.5)?
        .set_default("playback.max_rate", 2.0)?
        .set_default("playback.default_volume", 0.7)?
        .set_default("playback.skip_secs", 5.0)?
        .set_default("playback.time_update_interval_ms", 250)?
        .set_default("preload.max_concurrent", 0)?
        .set_default("preload.max_retained", 256)?
        .set_default("cache.persistent", true)?
        .set_default("cache.dir", "data/clips.sled")?
        .set_default("cache.max_size_bytes", 256_u64 * 1024 * 1024)?
        .set_default("log.level", "info")?
        .set_default("log.json", false)?;

    // 2. 配置文件（如果存在）
    if let Some(path) = config_path {
        builder = builder.add_source(File::from(path).required(true));
    } else {
        for name in CONFIG_FILE_NAMES {
            builder = builder.add_source(File::with_name(name).required(false));
        }
    }

    // 3. 环境变量（最高优先级）
    // 注意: 环境变量名会被转换为小写
    builder = builder.add_source(
        Environment::with_prefix("SHADOWING")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;

    let app_config: AppConfig = config.try_deserialize().map_err(|e| {
        ConfigError::ParseError(format!("Failed to deserialize config: {}", e))
    })?;

    validate_config(&app_config)?;

    Ok(app_config)
}

/// 验证配置有效性
fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    if config.assets.mapping_path.as_os_str().is_empty() {
        return Err(ConfigError::ValidationError(
            "Asset mapping path cannot be empty".to_string(),
        ));
    }

    if config.synthesis.url.is_empty() {
        return Err(ConfigError::ValidationError(
            "Synthesis URL cannot be empty".to_string(),
        ));
    }

    if !(config.synthesis.speed.is_finite() && config.synthesis.speed > 0.0) {
        return Err(ConfigError::ValidationError(format!(
            "Synthesis speed must be positive, got {}",
            config.synthesis.speed
        )));
    }

    let playback = &config.playback;
    if !(playback.min_rate.is_finite() && playback.min_rate > 0.0) {
        return Err(ConfigError::ValidationError(format!(
            "Minimum playback rate must be positive, got {}",
            playback.min_rate
        )));
    }

    if !playback.max_rate.is_finite() || playback.min_rate > playback.max_rate {
        return Err(ConfigError::ValidationError(format!(
            "Invalid playback rate range [{}, {}]",
            playback.min_rate, playback.max_rate
        )));
    }

    if !(0.0..=1.0).contains(&playback.default_volume) {
        return Err(ConfigError::ValidationError(format!(
            "Default volume must be within [0, 1], got {}",
            playback.default_volume
        )));
    }

    if !(playback.skip_secs.is_finite() && playback.skip_secs >= 0.0) {
        return Err(ConfigError::ValidationError(format!(
            "Skip step cannot be negative, got {}",
            playback.skip_secs
        )));
    }

    if playback.time_update_interval_ms == 0 {
        return Err(ConfigError::ValidationError(
            "Time update interval cannot be 0".to_string(),
        ));
    }

    if config.cache.persistent && config.cache.dir.as_os_str().is_empty() {
        return Err(ConfigError::ValidationError(
            "Clip store directory cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// 打印配置信息（用于启动时日志）
pub fn print_config(config: &AppConfig) {
    tracing::info!("=== Application Configuration ===");
    tracing::info!("Asset Mapping: {:?}", config.assets.mapping_path);
    tracing::info!("Asset Base URL: {}", config.assets.base_url);
    tracing::info!("Asset Probe: {:?}", config.assets.probe);
    tracing::info!("Synthesis URL: {}", config.synthesis.url);
    tracing::info!("Synthesis Timeout: {}s", config.synthesis.timeout_secs);
    tracing::info!(
        "Synthesis Defaults: voice={} model={} speed={}",
        config.synthesis.voice,
        config.synthesis.model,
        config.synthesis.speed
    );
    tracing::info!(
        "Playback Rate Range: [{}, {}]",
        config.playback.min_rate,
        config.playback.max_rate
    );
    tracing::info!("Preload Max Concurrent: {}", config.preload.max_concurrent);
    tracing::info!("Preload Max Retained: {}", config.preload.max_retained);
    if config.cache.persistent {
        tracing::info!("Clip Store: {:?}", config.cache.dir);
    } else {
        tracing::info!("Clip Store: in-memory");
    }
    tracing::info!("Log Level: {}", config.log.level);
    tracing::info!("=================================");
}
