//! 分集下载：下载单元、状态机、重试策略以及调度 Actor

pub mod manager;
pub mod messages;
pub mod retry;
pub mod state;
pub mod unit;

pub use manager::DownloadManagerActor;
pub use messages::{CancelDownload, DownloadStats, GetQueue, GetStats, QueueEpisode, StartDownloads, StopDownloads};
pub use retry::{RetryContext, RetryStrategy};
pub use state::DownloadState;
pub use unit::{DownloadUnit, PROGRESS_UNKNOWN};
