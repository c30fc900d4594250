//! Domain: 作品与分集的领域模型，以及按 ID 查询它们的接口
//!
//! 下载单元在构建时通过 `EpisodeLookup` 和 `WorkLookup` 解析分集所属作品，
//! 两者都由调用方注入，`Library` 是基于目录文件的内存实现。

pub mod library;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::source::model::{SEpisode, SWork};

pub use library::{Library, SourceEntry};

/// 作品（番剧或漫画）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Work {
    pub id: i64,
    /// 所属来源的 ID
    pub source: i64,
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub initialized: bool,
}

impl Work {
    pub fn to_s_work(&self) -> SWork {
        SWork {
            url: self.url.clone(),
            title: self.title.clone(),
            thumbnail_url: self.thumbnail_url.clone(),
            initialized: self.initialized,
            ..SWork::default()
        }
    }
}

/// 分集（或章节）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Episode {
    pub id: i64,
    pub work_id: i64,
    pub url: String,
    pub name: String,
    #[serde(default = "unknown_episode_number")]
    pub episode_number: f32,
    #[serde(default)]
    pub date_upload: i64,
    #[serde(default)]
    pub scanlator: Option<String>,
}

fn unknown_episode_number() -> f32 {
    -1.0
}

impl Episode {
    pub fn to_s_episode(&self) -> SEpisode {
        SEpisode {
            url: self.url.clone(),
            name: self.name.clone(),
            date_upload: self.date_upload,
            episode_number: self.episode_number,
            scanlator: self.scanlator.clone(),
        }
    }
}

/// 按 ID 查询分集
#[async_trait]
pub trait EpisodeLookup: Send + Sync {
    async fn get_episode(&self, id: i64) -> Option<Episode>;
}

/// 按 ID 查询作品
#[async_trait]
pub trait WorkLookup: Send + Sync {
    async fn get_work(&self, id: i64) -> Option<Work>;
}
