use async_trait::async_trait;
use url::Url;

use super::model::{SEpisode, SWork, Video};
use super::{RemoteSource, Source};
use crate::core::error::{SourceError, SourceResult};
use crate::domain::Library;

/// 基于目录文件的在线来源
///
/// 分集地址就是视频直链，相对地址以 `base_url` 为基准解析。
pub struct CatalogSource {
    id: i64,
    name: String,
    lang: String,
    base_url: String,
    library: Library,
}

impl CatalogSource {
    pub fn new(id: i64, name: impl Into<String>, base_url: impl Into<String>, library: Library) -> Self {
        Self {
            id,
            name: name.into(),
            lang: String::new(),
            base_url: base_url.into(),
            library,
        }
    }

    pub fn with_lang(mut self, lang: impl Into<String>) -> Self {
        self.lang = lang.into();
        self
    }

    fn resolve(&self, path: &str) -> SourceResult<String> {
        let base = Url::parse(&self.base_url)
            .map_err(|e| SourceError::Parse(format!("无效的来源地址 {}: {}", self.base_url, e)))?;
        base.join(path)
            .map(String::from)
            .map_err(|e| SourceError::Parse(format!("无效的分集地址 {}: {}", path, e)))
    }
}

#[async_trait]
impl Source for CatalogSource {
    fn id(&self) -> i64 {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn lang(&self) -> &str {
        &self.lang
    }

    async fn get_work_details(&self, work: &SWork) -> SourceResult<SWork> {
        let found = self
            .library
            .work_by_url(&work.url)
            .ok_or_else(|| SourceError::Parse(format!("目录中不存在作品: {}", work.url)))?;
        let mut details = found.to_s_work();
        details.description = work.description.clone();
        details.genre = work.genre.clone();
        details.status = work.status;
        details.initialized = true;
        Ok(details)
    }

    async fn get_episode_list(&self, work: &SWork) -> SourceResult<Vec<SEpisode>> {
        let found = self
            .library
            .work_by_url(&work.url)
            .ok_or_else(|| SourceError::Parse(format!("目录中不存在作品: {}", work.url)))?;
        Ok(self
            .library
            .episodes_of(found.id)
            .iter()
            .map(|e| e.to_s_episode())
            .collect())
    }

    async fn get_video_list(&self, episode: &SEpisode) -> SourceResult<Vec<Video>> {
        if self.library.episode_by_url(&episode.url).is_none() {
            return Err(SourceError::Parse(format!("目录中不存在分集: {}", episode.url)));
        }
        let url = self.resolve(&episode.url)?;
        Ok(vec![Video::new(url, "default")])
    }
}

impl RemoteSource for CatalogSource {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn headers(&self) -> Vec<(String, String)> {
        vec![("Referer".to_string(), self.base_url.clone())]
    }
}
