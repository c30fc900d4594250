//! 旧版来源插件的兼容层
//!
//! 旧插件通过返回流的同步接口提供数据。`LegacyAdapter` 把它们包装成
//! 统一的异步 `Source`：只取流中的第一个值，接口未实现时直接报错，不做回退。

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};

use super::model::{SEpisode, SWork, Video};
use super::{RemoteSource, Source};
use crate::core::error::{SourceError, SourceResult};

/// 旧版流式来源接口
pub trait LegacySource: Send + Sync {
    fn id(&self) -> i64;

    fn name(&self) -> &str;

    fn lang(&self) -> &str {
        ""
    }

    fn fetch_work_details(&self, _work: &SWork) -> BoxStream<'static, SourceResult<SWork>> {
        not_implemented("fetch_work_details")
    }

    fn fetch_episode_list(&self, _work: &SWork) -> BoxStream<'static, SourceResult<Vec<SEpisode>>> {
        not_implemented("fetch_episode_list")
    }

    /// 默认返回空流，适配后表现为 `SourceError::NoElement`
    fn fetch_video_list(&self, _episode: &SEpisode) -> BoxStream<'static, SourceResult<Vec<Video>>> {
        stream::empty().boxed()
    }
}

/// 基于 HTTP 的旧版来源
pub trait LegacyHttpSource: LegacySource {
    fn base_url(&self) -> &str;

    fn headers(&self) -> Vec<(String, String)> {
        Vec::new()
    }
}

fn not_implemented<T: Send + 'static>(operation: &'static str) -> BoxStream<'static, SourceResult<T>> {
    stream::once(async move { Err(SourceError::NotImplemented(operation)) }).boxed()
}

/// 等待流中的第一个值
async fn first_value<T>(mut stream: BoxStream<'static, SourceResult<T>>) -> SourceResult<T> {
    stream.next().await.unwrap_or(Err(SourceError::NoElement))
}

/// 把旧版流式来源适配为异步 `Source`
pub struct LegacyAdapter<L> {
    inner: L,
}

impl<L: LegacySource> LegacyAdapter<L> {
    pub fn new(inner: L) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &L {
        &self.inner
    }
}

#[async_trait]
impl<L: LegacySource> Source for LegacyAdapter<L> {
    fn id(&self) -> i64 {
        self.inner.id()
    }

    fn name(&self) -> &str {
        self.inner.name()
    }

    fn lang(&self) -> &str {
        self.inner.lang()
    }

    async fn get_work_details(&self, work: &SWork) -> SourceResult<SWork> {
        first_value(self.inner.fetch_work_details(work)).await
    }

    async fn get_episode_list(&self, work: &SWork) -> SourceResult<Vec<SEpisode>> {
        first_value(self.inner.fetch_episode_list(work)).await
    }

    async fn get_video_list(&self, episode: &SEpisode) -> SourceResult<Vec<Video>> {
        first_value(self.inner.fetch_video_list(episode)).await
    }
}

impl<L: LegacyHttpSource> RemoteSource for LegacyAdapter<L> {
    fn base_url(&self) -> &str {
        self.inner.base_url()
    }

    fn headers(&self) -> Vec<(String, String)> {
        self.inner.headers()
    }
}
