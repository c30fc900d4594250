use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;

use super::state::DownloadState;
use crate::domain::{Episode, EpisodeLookup, Work, WorkLookup};
use crate::network::ProgressListener;
use crate::source::model::Video;
use crate::source::{RemoteSource, Source, SourceManager};

/// 进度未知时的取值
pub const PROGRESS_UNKNOWN: i32 = -1;

/// 单个分集的下载单元
///
/// 状态和进度通过 `watch` 通道对外发布：只有一个写者（驱动传输的任务或调度器），
/// 可以有任意多个读者。字节计数只在进程生命周期内有效，不会持久化。
pub struct DownloadUnit {
    source: Arc<dyn RemoteSource>,
    work: Work,
    episode: Episode,
    video: Mutex<Option<Video>>,
    status: watch::Sender<DownloadState>,
    progress: watch::Sender<i32>,
    total_content_length: AtomicU64,
    total_bytes_downloaded: AtomicU64,
    bytes_downloaded: AtomicU64,
}

impl DownloadUnit {
    pub fn new(source: Arc<dyn RemoteSource>, work: Work, episode: Episode) -> Self {
        let (status, _) = watch::channel(DownloadState::NotDownloaded);
        let (progress, _) = watch::channel(0);
        Self {
            source,
            work,
            episode,
            video: Mutex::new(None),
            status,
            progress,
            total_content_length: AtomicU64::new(0),
            total_bytes_downloaded: AtomicU64::new(0),
            bytes_downloaded: AtomicU64::new(0),
        }
    }

    /// 依次解析 分集 → 作品 → 来源，任何一步找不到都返回 `None`，
    /// 来源必须支持在线获取。
    pub async fn from_episode_id<E, W>(
        episode_id: i64,
        episodes: &E,
        works: &W,
        sources: &SourceManager,
    ) -> Option<Self>
    where
        E: EpisodeLookup + ?Sized,
        W: WorkLookup + ?Sized,
    {
        let episode = episodes.get_episode(episode_id).await?;
        let work = works.get_work(episode.work_id).await?;
        let source = sources.get_remote(work.source)?;
        Some(Self::new(source, work, episode))
    }

    pub fn source(&self) -> &Arc<dyn RemoteSource> {
        &self.source
    }

    pub fn work(&self) -> &Work {
        &self.work
    }

    pub fn episode(&self) -> &Episode {
        &self.episode
    }

    pub fn episode_id(&self) -> i64 {
        self.episode.id
    }

    pub fn video(&self) -> Option<Video> {
        self.video.lock().ok().and_then(|v| v.clone())
    }

    pub fn set_video(&self, video: Option<Video>) {
        if let Ok(mut guard) = self.video.lock() {
            *guard = video;
        }
    }

    pub fn status(&self) -> DownloadState {
        *self.status.borrow()
    }

    /// 设置状态，值未变化时不通知读者
    pub fn set_status(&self, status: DownloadState) -> bool {
        self.status.send_if_modified(|current| {
            if *current == status {
                false
            } else {
                *current = status;
                true
            }
        })
    }

    pub fn subscribe_status(&self) -> watch::Receiver<DownloadState> {
        self.status.subscribe()
    }

    /// 当前进度 0..=100，长度未知时为 `PROGRESS_UNKNOWN`
    pub fn progress(&self) -> i32 {
        *self.progress.borrow()
    }

    pub fn subscribe_progress(&self) -> watch::Receiver<i32> {
        self.progress.subscribe()
    }

    pub fn total_content_length(&self) -> u64 {
        self.total_content_length.load(Ordering::SeqCst)
    }

    pub fn total_bytes_downloaded(&self) -> u64 {
        self.total_bytes_downloaded.load(Ordering::SeqCst)
    }

    pub fn bytes_downloaded(&self) -> u64 {
        self.bytes_downloaded.load(Ordering::SeqCst)
    }

    /// 记录本次请求的累计字节数并折算进总数。
    /// 值变小说明开始了新的请求，新值整体计入；否则只计入增量。
    fn set_bytes_downloaded(&self, value: u64) {
        let previous = self.bytes_downloaded.swap(value, Ordering::SeqCst);
        let credited = if value < previous { value } else { value - previous };
        self.total_bytes_downloaded.fetch_add(credited, Ordering::SeqCst);
    }

    fn compute_progress(&self) -> i32 {
        let total_length = self.total_content_length();
        if total_length > 0 {
            (100 * self.total_bytes_downloaded() as u128 / total_length as u128) as i32
        } else {
            PROGRESS_UNKNOWN
        }
    }
}

impl ProgressListener for DownloadUnit {
    fn update(&self, bytes_read: u64, content_length: u64, _done: bool) {
        self.set_bytes_downloaded(bytes_read);
        self.total_content_length.fetch_max(content_length, Ordering::SeqCst);

        let new_progress = self.compute_progress();
        self.progress.send_if_modified(|current| {
            if *current == new_progress {
                false
            } else {
                *current = new_progress;
                true
            }
        });
    }
}

impl fmt::Debug for DownloadUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DownloadUnit")
            .field("source", &self.source.id())
            .field("work", &self.work.title)
            .field("episode", &self.episode.name)
            .field("status", &self.status())
            .field("progress", &self.progress())
            .finish()
    }
}
