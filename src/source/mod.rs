//! Source: 内容来源插件接口
//!
//! ## 主要组件
//!
//! - `Source`: 所有来源都必须实现的异步接口
//! - `RemoteSource`: 通过 HTTP 获取内容的来源，只有它们的分集可以被下载
//! - `LegacySource` / `LegacyAdapter`: 旧版流式接口及其兼容层
//! - `SourceManager`: 按 ID 注册和查找来源
//!
//! 列表类接口按来源给出的顺序返回，下标本身没有含义，排序交给展示层。

pub mod catalog;
pub mod legacy;
pub mod local;
pub mod manager;
pub mod model;

use async_trait::async_trait;

use crate::core::error::SourceResult;
use model::{SEpisode, SWork, Video};

pub use catalog::CatalogSource;
pub use legacy::{LegacyAdapter, LegacySource};
pub use local::LocalSource;
pub use manager::SourceManager;

/// 内容来源，可以是在线来源、本地来源等
#[async_trait]
pub trait Source: Send + Sync {
    /// 来源 ID，必须唯一
    fn id(&self) -> i64;

    fn name(&self) -> &str;

    fn lang(&self) -> &str {
        ""
    }

    /// 获取作品的最新详情
    async fn get_work_details(&self, work: &SWork) -> SourceResult<SWork>;

    /// 获取作品的全部分集
    async fn get_episode_list(&self, work: &SWork) -> SourceResult<Vec<SEpisode>>;

    /// 获取分集的视频列表，按期望的顺序返回
    async fn get_video_list(&self, episode: &SEpisode) -> SourceResult<Vec<Video>>;
}

/// 通过 HTTP 获取内容的来源
pub trait RemoteSource: Source {
    fn base_url(&self) -> &str;

    /// 下载视频时附加的请求头
    fn headers(&self) -> Vec<(String, String)> {
        Vec::new()
    }
}

impl std::fmt::Debug for dyn Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name(), self.id())
    }
}

impl std::fmt::Debug for dyn RemoteSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}, {})", self.name(), self.id(), self.base_url())
    }
}
