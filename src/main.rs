use actix::prelude::*;
use anyhow::Context as _;
use std::rc::Rc;
use std::sync::Arc;
use std::time::{Duration, Instant};

use animedown::cli::Args;
use animedown::config::Config;
use animedown::core::download::{
    CancelDownload, DownloadManagerActor, GetQueue, GetStats, QueueEpisode, StartDownloads,
};
use animedown::domain::Library;
use animedown::network::HttpTransfer;
use animedown::source::{CatalogSource, LocalSource, Source, SourceManager};
use animedown::ui::{self, DownloadSummary, ProgressManager};

const STATS_POLL_INTERVAL: Duration = Duration::from_millis(200);

#[actix::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!(
        "animedown {} ({})",
        env!("CARGO_PKG_VERSION"),
        option_env!("VERGEN_GIT_SHA").unwrap_or("unknown")
    );

    let (args, config) = Args::parse_args().context("参数解析失败")?;
    log::info!("配置文件路径: {}", args.config);
    println!("{}", config.get_summary());

    let library = Arc::new(Library::load(&args.catalog).context("无法加载目录文件")?);
    let sources = build_sources(&library, &config);

    if args.list {
        list_catalog(&library, &sources, &config).await;
        if args.episodes.is_empty() && !args.all {
            return Ok(());
        }
    }

    let episode_ids = args.selected_episodes(&library)?;
    let transfer = Rc::new(HttpTransfer::new(&config));
    let manager = DownloadManagerActor::new(
        config.clone(),
        library.clone(),
        library.clone(),
        sources,
        transfer,
    )
    .start();

    for id in &episode_ids {
        if !manager.send(QueueEpisode { episode_id: *id }).await? {
            ui::print_error(&format!("无法加入下载队列: 分集 {}", id));
        }
    }

    let queue = manager.send(GetQueue).await?;
    if queue.is_empty() {
        eprintln!("没有可下载的分集");
        return Ok(());
    }

    let progress = ProgressManager::new();
    for unit in &queue {
        progress.track(unit.clone());
    }

    let started = Instant::now();
    manager.send(StartDownloads).await?;
    log::info!("开始下载 {} 个分集", queue.len());

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                progress.println("收到中断信号，取消剩余下载");
                for unit in &queue {
                    manager.send(CancelDownload { episode_id: unit.episode_id() }).await?;
                }
                break;
            }
            _ = tokio::time::sleep(STATS_POLL_INTERVAL) => {
                if manager.send(GetStats).await?.is_idle() {
                    break;
                }
            }
        }
    }
    progress.wait().await;

    let stats = manager.send(GetStats).await?;
    let summary = DownloadSummary {
        total_episodes: queue.len(),
        total_size: stats.downloaded_bytes,
        elapsed_time: started.elapsed(),
        success_count: stats.completed,
        failed_count: stats.failed,
    };
    println!("{}", summary);
    log::info!("下载结束 - 成功: {}, 失败: {}", stats.completed, stats.failed);

    if summary.all_succeeded() {
        ui::print_success("全部分集下载完成");
        Ok(())
    } else {
        anyhow::bail!("{} 个分集未能完成下载", summary.total_episodes - summary.success_count)
    }
}

/// 注册目录声明的在线来源，以及配置中的本地来源
fn build_sources(library: &Arc<Library>, config: &Config) -> SourceManager {
    let mut sources = SourceManager::new();
    for entry in library.sources() {
        if entry.id == LocalSource::ID {
            log::warn!("来源 ID {} 保留给本地来源，忽略: {}", entry.id, entry.name);
            continue;
        }
        let source = CatalogSource::new(entry.id, &entry.name, &entry.base_url, Library::clone(library))
            .with_lang(&entry.lang);
        if !sources.register_remote(Arc::new(source)) {
            log::warn!("重复的来源 ID {}: {}", entry.id, entry.name);
        }
    }
    if !config.local_source_dir.is_empty() {
        sources.register_local(Arc::new(LocalSource::new(&config.local_source_dir)));
    }
    log::debug!("已注册 {} 个来源", sources.len());
    sources
}

/// 通过来源接口列出作品和分集
async fn list_catalog(library: &Library, sources: &SourceManager, config: &Config) {
    for work in library.works() {
        let Some(source) = sources.get(work.source) else {
            println!("{} [来源 {} 未注册]", work.title, work.source);
            continue;
        };
        let s_work = work.to_s_work();
        let details = match source.get_work_details(&s_work).await {
            Ok(details) => details,
            Err(e) => {
                ui::print_error(&format!("{}: {}", work.title, e));
                continue;
            }
        };
        println!("{} ({}) [{}] {:?}", details.title, work.id, source.name(), details.status);
        match source.get_episode_list(&details).await {
            Ok(episodes) => {
                for episode in episodes {
                    let id = library
                        .episode_by_url(&episode.url)
                        .map(|e| e.id.to_string())
                        .unwrap_or_else(|| "-".to_string());
                    println!("  {:>6}  {}", id, episode.name);
                }
            }
            Err(e) => ui::print_error(&format!("{}: {}", work.title, e)),
        }
    }

    if config.local_source_dir.is_empty() {
        return;
    }
    let local = LocalSource::new(&config.local_source_dir);
    match local.list_works().await {
        Ok(works) => {
            for work in works {
                let count = local.get_episode_list(&work).await.map(|e| e.len()).unwrap_or(0);
                println!("{} [{}] {} 集", work.title, local.name(), count);
            }
        }
        Err(e) => ui::print_error(&format!("{}: {}", config.local_source_dir, e)),
    }
}
