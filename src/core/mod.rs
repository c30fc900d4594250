//! Core: 下载单元、调度 Actor 和错误处理等核心逻辑模块

pub mod download;
pub mod error;

// 只导出主流程和其它模块实际用到的类型
pub use download::{
    DownloadManagerActor, DownloadState, DownloadStats, DownloadUnit,
    CancelDownload, GetQueue, GetStats, QueueEpisode, StartDownloads,
};
pub use error::{DownloadError, SourceError};
