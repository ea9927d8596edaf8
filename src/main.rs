//! Shadowing - 跟读练习音频演示
//!
//! 用法: shadowing [--config <path>] [text ...]
//!
//! 预加载命令行给出的文本，打印每条的解析结果，
//! 然后用无头播放器播放第一条并输出播放事件。

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

use shadowing::application::ports::{AssetProbePort, ClipStorePort, SpeechSynthesisPort};
use shadowing::application::services::{
    AssetAvailabilityChecker, AudioResolver, LoadOptions, PlaybackController,
};
use shadowing::config::{load_config, load_config_from_path, print_config, AppConfig, ProbeKind};
use shadowing::domain::asset::{AssetIndex, AssetMapping};
use shadowing::domain::playback::PlaybackState;
use shadowing::domain::preload::TicketStatus;
use shadowing::infrastructure::adapters::{
    FileAssetProbe, HeadlessMediaElement, HeadlessMediaElementConfig, HttpAssetProbe,
    HttpSynthesisClient,
};
use shadowing::infrastructure::events::EventPublisher;
use shadowing::infrastructure::memory::InMemoryClipStore;
use shadowing::infrastructure::persistence::SledClipStore;
use shadowing::infrastructure::worker::PreloadScheduler;

const DEFAULT_TEXT: &str = "こんにちは";

#[derive(Debug, Parser)]
#[command(name = "shadowing")]
#[command(about = "Resolve practice lines to audio and play the first one")]
struct Args {
    /// 配置文件路径
    #[arg(long)]
    config: Option<PathBuf>,

    /// 要预加载的文本
    #[arg(default_value = DEFAULT_TEXT)]
    texts: Vec<String>,
}

fn init_tracing(config: &AppConfig) {
    let log_filter = format!("{},shadowing={}", config.log.level, config.log.level);
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_filter));

    if config.log.json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // 加载配置（优先级：环境变量 > 配置文件 > 默认值）
    let config = match &args.config {
        Some(path) => load_config_from_path(Some(path)),
        None => load_config(),
    }
    .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;

    init_tracing(&config);
    tracing::info!("Shadowing - 跟读音频解析与播放");
    print_config(&config);

    // 资源映射
    let mapping = AssetMapping::load(&config.assets.mapping_path).await?;
    let index = Arc::new(AssetIndex::new(mapping, &config.assets.base_url));

    // 资源探测
    let probe: Arc<dyn AssetProbePort> = match config.assets.probe {
        ProbeKind::File => Arc::new(FileAssetProbe::new(config.assets.locator())),
        ProbeKind::Http => Arc::new(HttpAssetProbe::new(
            config.assets.locator(),
            config.assets.probe_timeout_secs,
        )?),
    };
    let availability = AssetAvailabilityChecker::new(probe).arc();

    // 合成客户端
    let synthesizer = Arc::new(HttpSynthesisClient::new(config.synthesis.client_config())?);
    if !synthesizer.health_check().await {
        tracing::warn!(
            url = %config.synthesis.url,
            "Synthesis service unavailable, uncached texts will fall back"
        );
    }

    // 合成片段存储
    let sled_store = if config.cache.persistent {
        if let Some(parent) = config.cache.dir.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Some(SledClipStore::new(&config.cache.sled_config())?.arc())
    } else {
        None
    };
    let clips: Arc<dyn ClipStorePort> = match &sled_store {
        Some(store) => store.clone(),
        None => InMemoryClipStore::new(config.cache.max_size_bytes).arc(),
    };

    let resolver = AudioResolver::new(index, availability, synthesizer, clips.clone()).arc();

    // 预加载
    let scheduler = PreloadScheduler::new(config.preload.scheduler_config(), resolver.clone());
    let options = config.synthesis.default_options();
    let tickets = scheduler.submit(&args.texts, &options);
    let ids: Vec<_> = tickets.iter().map(|t| t.id).collect();

    for ticket in scheduler.wait_all(&ids).await.into_iter().flatten() {
        match (&ticket.status, &ticket.resolved) {
            (TicketStatus::Loaded, Some(resolved)) => tracing::info!(
                text = %ticket.text,
                source = %resolved.source_kind(),
                uri = %resolved.uri(),
                "Resolved"
            ),
            _ => tracing::warn!(
                text = %ticket.text,
                status = ticket.status.as_str(),
                error = ?ticket.error,
                "Not resolved"
            ),
        }
    }

    let Some(first) = args
        .texts
        .iter()
        .find_map(|text| scheduler.take(text, &options).and_then(|t| t.resolved))
    else {
        tracing::warn!("Nothing to play");
        return Ok(());
    };

    // 播放
    let (media, mut media_events) = HeadlessMediaElement::spawn(
        HeadlessMediaElementConfig {
            locator: config.assets.locator(),
            time_update_interval: config.playback.time_update_interval(),
            fetch_timeout: std::time::Duration::from_secs(config.synthesis.timeout_secs),
        },
        clips.clone(),
    )?;

    let publisher = EventPublisher::new().arc();
    let mut controller =
        PlaybackController::new(Box::new(media), config.playback.settings(), publisher.clone());
    controller.set_on_ended(|session_id| {
        tracing::info!(session_id = %session_id, "Playback finished");
    });

    if let Some(mut events) = publisher.subscribe(controller.session_id()) {
        tokio::spawn(async move {
            while let Ok(event) = events.recv().await {
                tracing::debug!(event = ?event, "Playback event");
            }
        });
    }

    controller.load(first, LoadOptions::auto_play());

    loop {
        tokio::select! {
            event = media_events.recv() => {
                let Some(event) = event else { break };
                controller.handle_media_event(event);
                match controller.state() {
                    PlaybackState::Ended => break,
                    PlaybackState::Errored => {
                        tracing::error!(
                            error = controller.session().error().unwrap_or("unknown"),
                            "Playback failed"
                        );
                        break;
                    }
                    _ => {}
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Received shutdown signal");
                controller.stop();
                break;
            }
        }
    }

    let stats = clips.stats().await;
    tracing::info!(
        entries = stats.total_entries,
        size_bytes = stats.total_size_bytes,
        max_size_bytes = stats.max_size_bytes,
        hits = stats.hit_count,
        misses = stats.miss_count,
        "Clip store stats"
    );

    if let Some(store) = sled_store {
        store.flush()?;
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
