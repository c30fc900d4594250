use async_trait::async_trait;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Deserialize;
use std::path::{Component, Path, PathBuf};
use std::sync::OnceLock;

use super::model::{SEpisode, SWork, SWorkStatus, Video};
use super::Source;
use crate::core::error::{SourceError, SourceResult};
use crate::utils::validator::is_video_extension;

/// 作品目录中可选的 `details.json`
#[derive(Debug, Default, Deserialize)]
struct LocalDetails {
    title: Option<String>,
    description: Option<String>,
    genre: Option<Vec<String>>,
    status: Option<i32>,
}

/// 本地文件系统来源
///
/// 根目录下的每个子目录是一部作品，目录中的视频文件是分集，按文件名排序。
/// 本地来源不是在线来源，它的分集不会进入下载队列。
pub struct LocalSource {
    root: PathBuf,
}

impl LocalSource {
    pub const ID: i64 = 0;

    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// 根目录下的作品，按目录名排序
    pub async fn list_works(&self) -> SourceResult<Vec<SWork>> {
        let mut names = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.root).await?;
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false) {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names
            .into_iter()
            .map(|name| SWork {
                url: name.clone(),
                title: name,
                ..SWork::default()
            })
            .collect())
    }

    /// 把来源内的相对地址解析到根目录下，拒绝 `..` 等越出根目录的路径
    fn resolve(&self, url: &str) -> SourceResult<PathBuf> {
        let relative = Path::new(url.trim_start_matches('/'));
        if relative.components().any(|c| !matches!(c, Component::Normal(_) | Component::CurDir)) {
            return Err(SourceError::Parse(format!("非法的本地路径: {}", url)));
        }
        Ok(self.root.join(relative))
    }

    async fn work_dir(&self, url: &str) -> SourceResult<PathBuf> {
        let dir = self.resolve(url)?;
        match tokio::fs::metadata(&dir).await {
            Ok(meta) if meta.is_dir() => Ok(dir),
            _ => Err(SourceError::Io(format!("作品目录不存在: {}", dir.display()))),
        }
    }

    async fn read_details(dir: &Path) -> SourceResult<LocalDetails> {
        let path = dir.join("details.json");
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(LocalDetails::default()),
            Err(e) => return Err(e.into()),
        };
        serde_json::from_str(&content)
            .map_err(|e| SourceError::Parse(format!("{}: {}", path.display(), e)))
    }

    /// 从文件名中解析分集号，取第一个数字
    fn parse_episode_number(name: &str) -> f32 {
        static NUMBER: OnceLock<Regex> = OnceLock::new();
        let re = NUMBER.get_or_init(|| Regex::new(r"\d+(?:\.\d+)?").expect("valid regex"));
        re.find(name)
            .and_then(|m| m.as_str().parse::<f32>().ok())
            .unwrap_or(-1.0)
    }

    fn is_video(path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(is_video_extension)
            .unwrap_or(false)
    }
}

#[async_trait]
impl Source for LocalSource {
    fn id(&self) -> i64 {
        Self::ID
    }

    fn name(&self) -> &str {
        "Local source"
    }

    fn lang(&self) -> &str {
        "other"
    }

    async fn get_work_details(&self, work: &SWork) -> SourceResult<SWork> {
        let dir = self.work_dir(&work.url).await?;
        let details = Self::read_details(&dir).await?;
        let dir_name = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(SWork {
            url: work.url.clone(),
            title: details.title.unwrap_or(dir_name),
            description: details.description.or_else(|| work.description.clone()),
            genre: details.genre.map(|g| g.join(", ")).or_else(|| work.genre.clone()),
            status: details.status.map(SWorkStatus::from_value).unwrap_or(work.status),
            thumbnail_url: work.thumbnail_url.clone(),
            initialized: true,
        })
    }

    async fn get_episode_list(&self, work: &SWork) -> SourceResult<Vec<SEpisode>> {
        let dir = self.work_dir(&work.url).await?;
        let mut files: Vec<(PathBuf, i64)> = Vec::new();
        let mut entries = tokio::fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if !Self::is_video(&path) {
                continue;
            }
            let Ok(meta) = entry.metadata().await else {
                continue;
            };
            if !meta.is_file() {
                continue;
            }
            let date_upload = meta
                .modified()
                .map(|t| DateTime::<Utc>::from(t).timestamp_millis())
                .unwrap_or(0);
            files.push((path, date_upload));
        }
        files.sort();

        let work_url = work.url.trim_start_matches('/');
        let episodes = files
            .into_iter()
            .map(|(path, date_upload)| {
                let file_name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
                let name = path.file_stem().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
                SEpisode {
                    url: format!("{}/{}", work_url, file_name),
                    episode_number: Self::parse_episode_number(&name),
                    name,
                    date_upload,
                    scanlator: None,
                }
            })
            .collect();
        Ok(episodes)
    }

    async fn get_video_list(&self, episode: &SEpisode) -> SourceResult<Vec<Video>> {
        let path = self.resolve(&episode.url)?;
        let is_file = tokio::fs::metadata(&path).await.map(|m| m.is_file()).unwrap_or(false);
        if !is_file {
            return Err(SourceError::Io(format!("视频文件不存在: {}", path.display())));
        }
        Ok(vec![Video::new(path.to_string_lossy(), "local")])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn setup(name: &str) -> PathBuf {
        let root = std::env::temp_dir().join(format!("animedown_local_{}", name));
        let _ = fs::remove_dir_all(&root);
        let work = root.join("Mushishi");
        fs::create_dir_all(&work).unwrap();
        fs::write(work.join("Episode 02.mkv"), b"b").unwrap();
        fs::write(work.join("Episode 01.mp4"), b"a").unwrap();
        fs::write(work.join("cover.jpg"), b"c").unwrap();
        fs::write(
            work.join("details.json"),
            r#"{"title": "蟲師", "genre": ["Mystery", "Slice of Life"], "status": 2}"#,
        )
        .unwrap();
        root
    }

    #[test]
    fn test_local_work_details() {
        let root = setup("details");
        let source = LocalSource::new(&root);
        let work = SWork {
            url: "Mushishi".to_string(),
            ..SWork::default()
        };
        let details = tokio_test::block_on(source.get_work_details(&work)).unwrap();
        assert_eq!(details.title, "蟲師");
        assert_eq!(details.genre.as_deref(), Some("Mystery, Slice of Life"));
        assert_eq!(details.status, SWorkStatus::Completed);
        assert!(details.initialized);
        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn test_local_episode_list() {
        let root = setup("episodes");
        let source = LocalSource::new(&root);
        let work = SWork {
            url: "Mushishi".to_string(),
            ..SWork::default()
        };
        let episodes = tokio_test::block_on(source.get_episode_list(&work)).unwrap();
        assert_eq!(episodes.len(), 2);
        assert_eq!(episodes[0].name, "Episode 01");
        assert_eq!(episodes[0].episode_number, 1.0);
        assert_eq!(episodes[1].url, "Mushishi/Episode 02.mkv");

        let videos = tokio_test::block_on(source.get_video_list(&episodes[1])).unwrap();
        assert_eq!(videos[0].quality, "local");
        assert!(videos[0].url.ends_with("Episode 02.mkv"));
        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn test_list_works() {
        let root = setup("list");
        fs::create_dir_all(root.join("Aria")).unwrap();
        let source = LocalSource::new(&root);
        let works = tokio_test::block_on(source.list_works()).unwrap();
        let titles: Vec<&str> = works.iter().map(|w| w.title.as_str()).collect();
        assert_eq!(titles, vec!["Aria", "Mushishi"]);
        assert_eq!(works[1].url, "Mushishi");
        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn test_rejects_paths_outside_root() {
        let root = setup("escape");
        let source = LocalSource::new(root.join("Mushishi"));
        let work = SWork {
            url: "../Mushishi".to_string(),
            ..SWork::default()
        };
        let result = tokio_test::block_on(source.get_episode_list(&work));
        assert!(matches!(result, Err(SourceError::Parse(_))));

        let episode = SEpisode {
            url: "/../Mushishi/Episode 01.mp4".to_string(),
            ..SEpisode::default()
        };
        let result = tokio_test::block_on(source.get_video_list(&episode));
        assert!(matches!(result, Err(SourceError::Parse(_))));

        // 根目录内的相对地址仍然可用
        let episode = SEpisode {
            url: "./Episode 01.mp4".to_string(),
            ..SEpisode::default()
        };
        assert!(tokio_test::block_on(source.get_video_list(&episode)).is_ok());
        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn test_missing_work_dir() {
        let source = LocalSource::new(std::env::temp_dir().join("animedown_local_missing"));
        let work = SWork {
            url: "nothing".to_string(),
            ..SWork::default()
        };
        assert!(tokio_test::block_on(source.get_episode_list(&work)).is_err());
    }

    #[test]
    fn test_parse_episode_number() {
        assert_eq!(LocalSource::parse_episode_number("Episode 12"), 12.0);
        assert_eq!(LocalSource::parse_episode_number("第7.5话"), 7.5);
        assert_eq!(LocalSource::parse_episode_number("OVA"), -1.0);
    }
}
