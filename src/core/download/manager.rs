use actix::prelude::*;
use futures::FutureExt;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::config::Config;
use crate::core::error::{DownloadError, DownloadResult};
use crate::domain::{EpisodeLookup, WorkLookup};
use crate::network::transfer::part_path;
use crate::network::{ProgressListener, Transfer, TransferRequest};
use crate::source::{RemoteSource, Source, SourceManager};
use crate::utils::validator::{sanitize_file_name, video_extension};
use super::messages::*;
use super::retry::{RetryContext, RetryStrategy};
use super::state::DownloadState;
use super::unit::DownloadUnit;

/// 下载调度 Actor
///
/// 负责把分集解析成下载单元、按并发上限派发传输，并在结束后把单元移出队列。
pub struct DownloadManagerActor {
    config: Config,
    episodes: Arc<dyn EpisodeLookup>,
    works: Arc<dyn WorkLookup>,
    sources: SourceManager,
    transfer: Rc<dyn Transfer>,
    queue: Vec<Arc<DownloadUnit>>,
    running: HashMap<i64, JoinHandle<()>>,
    started: bool,
    completed: usize,
    failed: usize,
    downloaded_bytes: u64,
}

impl Actor for DownloadManagerActor {
    type Context = Context<Self>;
}

impl DownloadManagerActor {
    pub fn new(
        config: Config,
        episodes: Arc<dyn EpisodeLookup>,
        works: Arc<dyn WorkLookup>,
        sources: SourceManager,
        transfer: Rc<dyn Transfer>,
    ) -> Self {
        Self {
            config,
            episodes,
            works,
            sources,
            transfer,
            queue: Vec::new(),
            running: HashMap::new(),
            started: false,
            completed: 0,
            failed: 0,
            downloaded_bytes: 0,
        }
    }

    fn enqueue(&mut self, unit: DownloadUnit, ctx: &mut Context<Self>) -> bool {
        if self.queue.iter().any(|u| u.episode_id() == unit.episode_id()) {
            log::debug!("分集已在队列中: {}", unit.episode().name);
            return false;
        }
        transition(&unit, DownloadState::Queue);
        log::info!("加入下载队列: {} - {}", unit.work().title, unit.episode().name);
        self.queue.push(Arc::new(unit));
        if self.started {
            self.launch(ctx);
        }
        true
    }

    /// 在并发上限内启动排队中的单元
    fn launch(&mut self, ctx: &mut Context<Self>) {
        let limit = self.config.max_concurrent_downloads.max(1);
        while self.running.len() < limit {
            let next = self
                .queue
                .iter()
                .find(|u| u.status() == DownloadState::Queue && !self.running.contains_key(&u.episode_id()))
                .cloned();
            let Some(unit) = next else {
                break;
            };
            self.spawn_download(unit, ctx);
        }
    }

    fn spawn_download(&mut self, unit: Arc<DownloadUnit>, ctx: &mut Context<Self>) {
        let episode_id = unit.episode_id();
        let transfer = self.transfer.clone();
        let download_dir = PathBuf::from(&self.config.download_dir);
        let strategy = RetryStrategy::from_config(&self.config);
        let addr = ctx.address();

        transition(&unit, DownloadState::Downloading);
        log::info!("开始下载: {} - {}", unit.work().title, unit.episode().name);

        let handle = actix::spawn(async move {
            let download = run_download(&unit, transfer.as_ref(), &download_dir, strategy);
            // 任务 panic 时也要通知调度器，否则单元会一直占用并发名额
            let result = match AssertUnwindSafe(download).catch_unwind().await {
                Ok(result) => result,
                Err(_) => {
                    log::error!("下载任务异常退出: {}", unit.episode().name);
                    Err(DownloadError::Unknown("下载任务异常退出".to_string()))
                }
            };
            addr.do_send(UnitFinished { episode_id, result });
        });
        self.running.insert(episode_id, handle);
    }

    /// 删除被取消单元留下的临时文件
    fn remove_partial(&self, unit: &DownloadUnit) {
        let Some(video) = unit.video() else {
            return;
        };
        let dest = episode_path(Path::new(&self.config.download_dir), unit, video.download_url());
        let part = part_path(&dest);
        match std::fs::remove_file(&part) {
            Ok(()) => log::debug!("已删除临时文件: {}", part.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => log::warn!("无法删除临时文件 {}: {}", part.display(), e),
        }
    }

    fn stats(&self) -> DownloadStats {
        let count = |state: DownloadState| self.queue.iter().filter(|u| u.status() == state).count();
        DownloadStats {
            queued: count(DownloadState::Queue),
            downloading: count(DownloadState::Downloading),
            completed: self.completed,
            failed: self.failed,
            downloaded_bytes: self.downloaded_bytes,
        }
    }
}

/// 调度器只做合法的迁移，其它情况记录警告后仍然写入
fn transition(unit: &DownloadUnit, next: DownloadState) {
    let current = unit.status();
    if !current.can_transition_to(next) {
        log::warn!("非法的状态迁移 {} -> {}: {}", current, next, unit.episode().name);
    }
    unit.set_status(next);
}

/// 分集的保存路径：<下载目录>/<来源>/<作品>/<分集>.<扩展名>
pub fn episode_path(download_dir: &Path, unit: &DownloadUnit, video_url: &str) -> PathBuf {
    let file_name = format!(
        "{}.{}",
        sanitize_file_name(&unit.episode().name),
        video_extension(video_url)
    );
    download_dir
        .join(sanitize_file_name(unit.source().name()))
        .join(sanitize_file_name(&unit.work().title))
        .join(file_name)
}

/// 下载一个单元，失败时按策略重试
///
/// 每次尝试都重新获取视频列表，传输的累计字节从 0 开始。
pub async fn run_download(
    unit: &Arc<DownloadUnit>,
    transfer: &dyn Transfer,
    download_dir: &Path,
    strategy: RetryStrategy,
) -> DownloadResult<u64> {
    let mut retry = RetryContext::new(strategy);
    loop {
        match attempt_download(unit, transfer, download_dir).await {
            Ok(bytes) => return Ok(bytes),
            Err(e) if retry.should_retry(&e) => {
                let delay = retry.next_delay();
                log::warn!(
                    "下载失败，将在 {:.1} 秒后重试 (第 {} 次): {} - {}",
                    delay.as_secs_f64(),
                    retry.retry_count,
                    unit.episode().name,
                    e
                );
                actix_rt::time::sleep(delay).await;
                if unit.status() != DownloadState::Downloading {
                    return Err(DownloadError::Cancelled);
                }
            }
            Err(e) => return Err(e),
        }
    }
}

/// 获取视频列表、选择第一个视频并传输
async fn attempt_download(unit: &Arc<DownloadUnit>, transfer: &dyn Transfer, download_dir: &Path) -> DownloadResult<u64> {
    let videos = unit.source().get_video_list(&unit.episode().to_s_episode()).await?;
    let video = videos
        .into_iter()
        .next()
        .ok_or_else(|| DownloadError::NoVideo(unit.episode().name.clone()))?;
    unit.set_video(Some(video.clone()));

    let mut headers = unit.source().headers();
    headers.extend(video.headers.iter().cloned());
    let request = TransferRequest {
        url: video.download_url().to_string(),
        headers,
        dest: episode_path(download_dir, unit, video.download_url()),
    };

    let listener: Arc<dyn ProgressListener> = unit.clone();
    transfer.fetch(&request, listener).await
}

impl Handler<QueueEpisode> for DownloadManagerActor {
    type Result = ResponseActFuture<Self, bool>;

    fn handle(&mut self, msg: QueueEpisode, _ctx: &mut Self::Context) -> Self::Result {
        let episodes = self.episodes.clone();
        let works = self.works.clone();
        let sources = self.sources.clone();
        let episode_id = msg.episode_id;

        Box::pin(
            async move { DownloadUnit::from_episode_id(episode_id, &*episodes, &*works, &sources).await }
                .into_actor(self)
                .map(move |unit, act, ctx| match unit {
                    Some(unit) => act.enqueue(unit, ctx),
                    None => {
                        log::warn!("无法解析分集 {}，忽略下载请求", episode_id);
                        false
                    }
                }),
        )
    }
}

impl Handler<StartDownloads> for DownloadManagerActor {
    type Result = ();

    fn handle(&mut self, _msg: StartDownloads, ctx: &mut Self::Context) {
        self.started = true;
        self.launch(ctx);
    }
}

impl Handler<StopDownloads> for DownloadManagerActor {
    type Result = ();

    fn handle(&mut self, _msg: StopDownloads, _ctx: &mut Self::Context) {
        self.started = false;
    }
}

impl Handler<CancelDownload> for DownloadManagerActor {
    type Result = bool;

    fn handle(&mut self, msg: CancelDownload, ctx: &mut Self::Context) -> bool {
        if let Some(handle) = self.running.remove(&msg.episode_id) {
            handle.abort();
        }
        let Some(pos) = self.queue.iter().position(|u| u.episode_id() == msg.episode_id) else {
            return false;
        };
        let unit = self.queue.remove(pos);
        transition(&unit, DownloadState::NotDownloaded);
        self.remove_partial(&unit);
        log::info!("已取消下载: {}", unit.episode().name);
        if self.started {
            self.launch(ctx);
        }
        true
    }
}

impl Handler<GetQueue> for DownloadManagerActor {
    type Result = MessageResult<GetQueue>;

    fn handle(&mut self, _msg: GetQueue, _ctx: &mut Self::Context) -> Self::Result {
        MessageResult(self.queue.clone())
    }
}

impl Handler<GetStats> for DownloadManagerActor {
    type Result = MessageResult<GetStats>;

    fn handle(&mut self, _msg: GetStats, _ctx: &mut Self::Context) -> Self::Result {
        MessageResult(self.stats())
    }
}

impl Handler<UnitFinished> for DownloadManagerActor {
    type Result = ();

    fn handle(&mut self, msg: UnitFinished, ctx: &mut Self::Context) {
        self.running.remove(&msg.episode_id);
        let Some(pos) = self.queue.iter().position(|u| u.episode_id() == msg.episode_id) else {
            return;
        };
        let unit = self.queue.remove(pos);
        match msg.result {
            Ok(bytes) => {
                transition(&unit, DownloadState::Downloaded);
                self.completed += 1;
                self.downloaded_bytes += bytes;
                log::info!("下载完成: {} - {} ({} 字节)", unit.work().title, unit.episode().name, bytes);
            }
            Err(e) => {
                transition(&unit, DownloadState::Error);
                self.failed += 1;
                log::error!("下载失败: {} - {}: {}", unit.work().title, unit.episode().name, e);
            }
        }
        if self.started {
            self.launch(ctx);
        }
    }
}
