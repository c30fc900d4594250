use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use super::{Episode, EpisodeLookup, Work, WorkLookup};
use crate::core::error::DownloadError;

/// 目录文件中声明的在线来源
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceEntry {
    pub id: i64,
    pub name: String,
    pub base_url: String,
    #[serde(default)]
    pub lang: String,
}

/// 目录文件的磁盘格式
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct CatalogFile {
    #[serde(default)]
    pub sources: Vec<SourceEntry>,
    #[serde(default)]
    pub works: Vec<Work>,
    #[serde(default)]
    pub episodes: Vec<Episode>,
}

/// 内存中的作品库，保持目录文件中的顺序
#[derive(Debug, Default, Clone)]
pub struct Library {
    sources: Vec<SourceEntry>,
    works: Vec<Work>,
    episodes: Vec<Episode>,
    work_index: HashMap<i64, usize>,
    episode_index: HashMap<i64, usize>,
}

impl Library {
    pub fn new(works: Vec<Work>, episodes: Vec<Episode>) -> Self {
        let work_index = works.iter().enumerate().map(|(i, w)| (w.id, i)).collect();
        let episode_index = episodes.iter().enumerate().map(|(i, e)| (e.id, i)).collect();
        Self {
            sources: Vec::new(),
            works,
            episodes,
            work_index,
            episode_index,
        }
    }

    /// 从 JSON 目录文件加载
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, DownloadError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let catalog: CatalogFile = serde_json::from_str(&content)
            .map_err(|e| DownloadError::Config(format!("目录文件格式错误 {}: {}", path.display(), e)))?;
        log::info!(
            "已加载目录 {}: {} 部作品, {} 个分集",
            path.display(),
            catalog.works.len(),
            catalog.episodes.len()
        );
        Ok(Self::new(catalog.works, catalog.episodes).with_sources(catalog.sources))
    }

    pub fn with_sources(mut self, sources: Vec<SourceEntry>) -> Self {
        self.sources = sources;
        self
    }

    /// 目录声明的来源；未声明时按作品引用的来源 ID 生成，名称为 `Catalog <id>`
    pub fn sources(&self) -> Vec<SourceEntry> {
        if !self.sources.is_empty() {
            return self.sources.clone();
        }
        let mut ids: Vec<i64> = self.works.iter().map(|w| w.source).collect();
        ids.sort_unstable();
        ids.dedup();
        ids.into_iter()
            .map(|id| SourceEntry {
                id,
                name: format!("Catalog {}", id),
                base_url: "http://localhost/".to_string(),
                lang: String::new(),
            })
            .collect()
    }

    pub fn works(&self) -> &[Work] {
        &self.works
    }

    pub fn work(&self, id: i64) -> Option<&Work> {
        self.work_index.get(&id).map(|&i| &self.works[i])
    }

    pub fn episode(&self, id: i64) -> Option<&Episode> {
        self.episode_index.get(&id).map(|&i| &self.episodes[i])
    }

    pub fn work_by_url(&self, url: &str) -> Option<&Work> {
        self.works.iter().find(|w| w.url == url)
    }

    /// 作品下的所有分集，按目录顺序
    pub fn episodes_of(&self, work_id: i64) -> Vec<Episode> {
        self.episodes
            .iter()
            .filter(|e| e.work_id == work_id)
            .cloned()
            .collect()
    }

    pub fn episode_by_url(&self, url: &str) -> Option<&Episode> {
        self.episodes.iter().find(|e| e.url == url)
    }

    pub fn episode_ids(&self) -> Vec<i64> {
        self.episodes.iter().map(|e| e.id).collect()
    }
}

#[async_trait]
impl EpisodeLookup for Library {
    async fn get_episode(&self, id: i64) -> Option<Episode> {
        self.episode(id).cloned()
    }
}

#[async_trait]
impl WorkLookup for Library {
    async fn get_work(&self, id: i64) -> Option<Work> {
        self.work(id).cloned()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn sample_library() -> Library {
        let works = vec![Work {
            id: 10,
            source: 7,
            title: "Frieren".to_string(),
            url: "/anime/frieren".to_string(),
            thumbnail_url: None,
            initialized: true,
        }];
        let episodes = vec![
            Episode {
                id: 100,
                work_id: 10,
                url: "http://127.0.0.1/frieren/1.mp4".to_string(),
                name: "第1集".to_string(),
                episode_number: 1.0,
                date_upload: 0,
                scanlator: None,
            },
            Episode {
                id: 101,
                work_id: 10,
                url: "http://127.0.0.1/frieren/2.mp4".to_string(),
                name: "第2集".to_string(),
                episode_number: 2.0,
                date_upload: 0,
                scanlator: None,
            },
        ];
        Library::new(works, episodes)
    }

    #[test]
    fn test_lookup_by_id() {
        let library = sample_library();
        let episode = tokio_test::block_on(library.get_episode(101)).unwrap();
        assert_eq!(episode.name, "第2集");
        let work = tokio_test::block_on(library.get_work(episode.work_id)).unwrap();
        assert_eq!(work.title, "Frieren");
        assert!(tokio_test::block_on(library.get_episode(999)).is_none());
        assert!(tokio_test::block_on(library.get_work(999)).is_none());
    }

    #[test]
    fn test_episodes_keep_catalog_order() {
        let library = sample_library();
        let ids: Vec<i64> = library.episodes_of(10).iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![100, 101]);
        assert!(library.episodes_of(11).is_empty());
    }

    #[test]
    fn test_load_catalog_file() {
        let path = std::env::temp_dir().join("animedown_test_catalog.json");
        let content = r#"{
            "works": [{"id": 1, "source": 7, "title": "A", "url": "/a"}],
            "episodes": [{"id": 2, "work_id": 1, "url": "http://x/2.mp4", "name": "ep"}]
        }"#;
        fs::write(&path, content).unwrap();

        let library = Library::load(&path).unwrap();
        assert_eq!(library.works().len(), 1);
        let sources = library.sources();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].id, 7);
        assert_eq!(sources[0].name, "Catalog 7");
        let episode = library.episode(2).unwrap();
        assert_eq!(episode.episode_number, -1.0);
        assert!(!library.work(1).unwrap().initialized);

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_declared_sources() {
        let path = std::env::temp_dir().join("animedown_test_catalog_sources.json");
        let content = r#"{
            "sources": [{"id": 7, "name": "Example", "base_url": "https://example.com/"}],
            "works": [{"id": 1, "source": 7, "title": "A", "url": "/a"}]
        }"#;
        fs::write(&path, content).unwrap();

        let library = Library::load(&path).unwrap();
        let sources = library.sources();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].name, "Example");
        assert_eq!(sources[0].base_url, "https://example.com/");
        assert!(library.episode_ids().is_empty());

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_load_invalid_catalog() {
        let path = std::env::temp_dir().join("animedown_test_bad_catalog.json");
        fs::write(&path, "not json").unwrap();
        assert!(matches!(Library::load(&path), Err(DownloadError::Config(_))));
        let _ = fs::remove_file(&path);
    }
}
