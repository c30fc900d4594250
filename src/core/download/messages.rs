use actix::Message;
use serde::{Serialize, Deserialize};
use std::sync::Arc;

use crate::core::error::DownloadError;
use super::unit::DownloadUnit;

/// 把分集加入下载队列，返回是否真正入队
pub struct QueueEpisode {
    pub episode_id: i64,
}
impl Message for QueueEpisode { type Result = bool; }

/// 开始处理队列
pub struct StartDownloads;
impl Message for StartDownloads { type Result = (); }

/// 暂停派发新的下载，进行中的下载不受影响
pub struct StopDownloads;
impl Message for StopDownloads { type Result = (); }

/// 取消分集下载，状态回到未下载
pub struct CancelDownload {
    pub episode_id: i64,
}
impl Message for CancelDownload { type Result = bool; }

/// 查询队列中的下载单元
pub struct GetQueue;
impl Message for GetQueue { type Result = Vec<Arc<DownloadUnit>>; }

/// 查询统计信息
pub struct GetStats;
impl Message for GetStats { type Result = DownloadStats; }

/// 内部消息：单元下载结束
pub(crate) struct UnitFinished {
    pub episode_id: i64,
    pub result: Result<u64, DownloadError>,
}
impl Message for UnitFinished { type Result = (); }

/// 下载统计
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadStats {
    pub queued: usize,
    pub downloading: usize,
    pub completed: usize,
    pub failed: usize,
    pub downloaded_bytes: u64,
}

impl DownloadStats {
    pub fn total(&self) -> usize {
        self.queued + self.downloading + self.completed + self.failed
    }

    pub fn is_idle(&self) -> bool {
        self.queued == 0 && self.downloading == 0
    }
}
