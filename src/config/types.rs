//! Configuration Types
//!
//! 定义所有配置结构体

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::domain::audio::{ModelId, ResolutionOptions, VoiceId};
use crate::domain::playback::{PlaybackSettings, RateRange};
use crate::infrastructure::adapters::{AssetLocator, HttpSynthesisClientConfig};
use crate::infrastructure::persistence::SledClipStoreConfig;
use crate::infrastructure::worker::PreloadSchedulerConfig;

/// 应用主配置
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// 本地资源配置
    #[serde(default)]
    pub assets: AssetsConfig,

    /// 语音合成配置
    #[serde(default)]
    pub synthesis: SynthesisConfig,

    /// 播放配置
    #[serde(default)]
    pub playback: PlaybackConfig,

    /// 预加载配置
    #[serde(default)]
    pub preload: PreloadConfig,

    /// 合成片段存储配置
    #[serde(default)]
    pub cache: CacheConfig,

    /// 日志配置
    #[serde(default)]
    pub log: LogConfig,
}

/// 资源探测方式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeKind {
    /// HEAD 请求
    Http,
    /// 文件元数据
    #[default]
    File,
}

/// 本地资源配置
#[derive(Debug, Clone, Deserialize)]
pub struct AssetsConfig {
    /// 资源映射文件路径
    #[serde(default = "default_mapping_path")]
    pub mapping_path: PathBuf,

    /// 资源 URI 前缀
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// 文件探测的根目录
    #[serde(default = "default_root_dir")]
    pub root_dir: PathBuf,

    /// 探测方式
    #[serde(default)]
    pub probe: ProbeKind,

    /// HTTP 探测时补全相对 URI 的 origin
    #[serde(default = "default_origin")]
    pub origin: String,

    /// 探测超时（秒）
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_secs: u64,
}

fn default_mapping_path() -> PathBuf {
    PathBuf::from("public/audio/conversation/mapping.json")
}

fn default_base_url() -> String {
    "/audio/conversation".to_string()
}

fn default_root_dir() -> PathBuf {
    PathBuf::from("public/audio/conversation")
}

fn default_origin() -> String {
    "http://localhost:3000".to_string()
}

fn default_probe_timeout() -> u64 {
    5
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            mapping_path: default_mapping_path(),
            base_url: default_base_url(),
            root_dir: default_root_dir(),
            probe: ProbeKind::default(),
            origin: default_origin(),
            probe_timeout_secs: default_probe_timeout(),
        }
    }
}

impl AssetsConfig {
    pub fn locator(&self) -> AssetLocator {
        AssetLocator::new(&self.base_url, &self.root_dir, &self.origin)
    }
}

/// 语音合成配置
#[derive(Debug, Clone, Deserialize)]
pub struct SynthesisConfig {
    /// 合成服务基础 URL
    #[serde(default = "default_synthesis_url")]
    pub url: String,

    /// 请求超时时间（秒）
    #[serde(default = "default_synthesis_timeout")]
    pub timeout_secs: u64,

    /// 最大重试次数
    #[serde(default)]
    pub max_retries: u32,

    /// 默认音色
    #[serde(default = "default_voice")]
    pub voice: String,

    /// 默认模型
    #[serde(default = "default_model")]
    pub model: String,

    /// 默认语速
    #[serde(default = "default_speed")]
    pub speed: f32,
}

fn default_synthesis_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_synthesis_timeout() -> u64 {
    30
}

fn default_voice() -> String {
    "alloy".to_string()
}

fn default_model() -> String {
    "tts-1".to_string()
}

fn default_speed() -> f32 {
    1.0
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            url: default_synthesis_url(),
            timeout_secs: default_synthesis_timeout(),
            max_retries: 0,
            voice: default_voice(),
            model: default_model(),
            speed: default_speed(),
        }
    }
}

impl SynthesisConfig {
    pub fn client_config(&self) -> HttpSynthesisClientConfig {
        HttpSynthesisClientConfig::new(&self.url)
            .with_timeout(self.timeout_secs)
            .with_retries(self.max_retries)
    }

    /// 解析请求的默认参数
    pub fn default_options(&self) -> ResolutionOptions {
        ResolutionOptions {
            prefer_local_asset: true,
            voice: VoiceId::new(&self.voice),
            model: ModelId::new(&self.model),
            speed: self.speed,
        }
    }
}

/// 播放配置
#[derive(Debug, Clone, Deserialize)]
pub struct PlaybackConfig {
    #[serde(default = "default_min_rate")]
    pub min_rate: f64,

    #[serde(default = "default_max_rate")]
    pub max_rate: f64,

    /// 初始音量 (0.0 - 1.0)
    #[serde(default = "default_volume")]
    pub default_volume: f64,

    /// 快进/快退步长（秒）
    #[serde(default = "default_skip_secs")]
    pub skip_secs: f64,

    /// 播放进度事件间隔（毫秒）
    #[serde(default = "default_time_update_interval")]
    pub time_update_interval_ms: u64,
}

fn default_min_rate() -> f64 {
    0.5
}

fn default_max_rate() -> f64 {
    2.0
}

fn default_volume() -> f64 {
    0.7
}

fn default_skip_secs() -> f64 {
    5.0
}

fn default_time_update_interval() -> u64 {
    250
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            min_rate: default_min_rate(),
            max_rate: default_max_rate(),
            default_volume: default_volume(),
            skip_secs: default_skip_secs(),
            time_update_interval_ms: default_time_update_interval(),
        }
    }
}

impl PlaybackConfig {
    pub fn settings(&self) -> PlaybackSettings {
        PlaybackSettings {
            rate_range: RateRange::new(self.min_rate, self.max_rate),
            default_volume: self.default_volume,
            skip_secs: self.skip_secs,
        }
    }

    pub fn time_update_interval(&self) -> Duration {
        Duration::from_millis(self.time_update_interval_ms)
    }
}

/// 预加载配置
#[derive(Debug, Clone, Deserialize)]
pub struct PreloadConfig {
    /// 最大并发解析数，0 表示不限制
    #[serde(default)]
    pub max_concurrent: usize,

    /// 保留票据上限，0 表示不限制
    #[serde(default = "default_max_retained")]
    pub max_retained: usize,
}

fn default_max_retained() -> usize {
    256
}

impl Default for PreloadConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 0,
            max_retained: default_max_retained(),
        }
    }
}

impl PreloadConfig {
    pub fn scheduler_config(&self) -> PreloadSchedulerConfig {
        PreloadSchedulerConfig {
            max_concurrent: self.max_concurrent,
            max_retained: self.max_retained,
        }
    }
}

/// 合成片段存储配置
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// true 使用 sled 持久化，false 仅保存在内存
    #[serde(default = "default_persistent")]
    pub persistent: bool,

    /// sled 数据库目录
    #[serde(default = "default_cache_dir")]
    pub dir: PathBuf,

    /// 最大存储大小（字节）
    #[serde(default = "default_cache_size")]
    pub max_size_bytes: u64,
}

fn default_persistent() -> bool {
    true
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("data/clips.sled")
}

fn default_cache_size() -> u64 {
    256 * 1024 * 1024 // 256 MB
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            persistent: default_persistent(),
            dir: default_cache_dir(),
            max_size_bytes: default_cache_size(),
        }
    }
}

impl CacheConfig {
    pub fn sled_config(&self) -> SledClipStoreConfig {
        SledClipStoreConfig {
            db_path: self.dir.to_string_lossy().to_string(),
            max_size_bytes: self.max_size_bytes,
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// 日志级别
    #[serde(default = "default_log_level")]
    pub level: String,

    /// 是否启用 JSON 格式
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.assets.base_url, "/audio/conversation");
        assert_eq!(config.assets.probe, ProbeKind::File);
        assert_eq!(config.synthesis.url, "http://localhost:8000");
        assert_eq!(config.synthesis.voice, "alloy");
        assert_eq!(config.playback.default_volume, 0.7);
        assert_eq!(config.preload.max_concurrent, 0);
        assert_eq!(config.preload.max_retained, 256);
        assert_eq!(config.preload.scheduler_config().max_retained, 256);
        assert!(config.cache.persistent);
    }

    #[test]
    fn test_playback_settings() {
        let settings = PlaybackConfig::default().settings();
        assert_eq!(settings.rate_range.min(), 0.5);
        assert_eq!(settings.rate_range.max(), 2.0);
        assert_eq!(settings.skip_secs, 5.0);
    }

    #[test]
    fn test_default_options_follow_synthesis_config() {
        let config = SynthesisConfig {
            voice: "nova".to_string(),
            speed: 0.8,
            ..Default::default()
        };
        let options = config.default_options();
        assert_eq!(options.voice.as_str(), "nova");
        assert_eq!(options.model.as_str(), "tts-1");
        assert_eq!(options.speed, 0.8);
        assert!(options.prefer_local_asset);
    }

    #[test]
    fn test_probe_kind_deserialize() {
        let kind: ProbeKind = serde_json::from_str("\"http\"").unwrap();
        assert_eq!(kind, ProbeKind::Http);
    }
}
