use serde::{Deserialize, Serialize};

/// 作品连载状态，数值与来源插件约定一致
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SWorkStatus {
    #[default]
    Unknown,
    Ongoing,
    Completed,
    Licensed,
    PublishingFinished,
    Cancelled,
    OnHiatus,
}

impl SWorkStatus {
    pub fn value(self) -> i32 {
        match self {
            SWorkStatus::Unknown => 0,
            SWorkStatus::Ongoing => 1,
            SWorkStatus::Completed => 2,
            SWorkStatus::Licensed => 3,
            SWorkStatus::PublishingFinished => 4,
            SWorkStatus::Cancelled => 5,
            SWorkStatus::OnHiatus => 6,
        }
    }

    pub fn from_value(value: i32) -> Self {
        match value {
            1 => SWorkStatus::Ongoing,
            2 => SWorkStatus::Completed,
            3 => SWorkStatus::Licensed,
            4 => SWorkStatus::PublishingFinished,
            5 => SWorkStatus::Cancelled,
            6 => SWorkStatus::OnHiatus,
            _ => SWorkStatus::Unknown,
        }
    }
}

/// 来源插件交换的作品信息
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SWork {
    pub url: String,
    pub title: String,
    pub description: Option<String>,
    pub genre: Option<String>,
    pub status: SWorkStatus,
    pub thumbnail_url: Option<String>,
    pub initialized: bool,
}

impl SWork {
    pub fn genres(&self) -> Vec<String> {
        self.genre
            .as_deref()
            .map(|g| {
                g.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// 来源插件交换的分集信息
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SEpisode {
    pub url: String,
    pub name: String,
    pub date_upload: i64,
    pub episode_number: f32,
    pub scanlator: Option<String>,
}

/// 分集中的一个可播放视频
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Video {
    /// 视频所在页面的地址
    pub url: String,
    pub quality: String,
    /// 解析后的直链，`None` 表示与 `url` 相同
    pub video_url: Option<String>,
    #[serde(default)]
    pub headers: Vec<(String, String)>,
}

impl Video {
    pub fn new(url: impl Into<String>, quality: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            quality: quality.into(),
            video_url: None,
            headers: Vec::new(),
        }
    }

    /// 实际下载使用的地址
    pub fn download_url(&self) -> &str {
        self.video_url.as_deref().unwrap_or(&self.url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_values() {
        assert_eq!(SWorkStatus::OnHiatus.value(), 6);
        assert_eq!(SWorkStatus::from_value(2), SWorkStatus::Completed);
        assert_eq!(SWorkStatus::from_value(42), SWorkStatus::Unknown);
    }

    #[test]
    fn test_genres() {
        let work = SWork {
            genre: Some("Action, Fantasy,,Drama ".to_string()),
            ..SWork::default()
        };
        assert_eq!(work.genres(), vec!["Action", "Fantasy", "Drama"]);
        assert!(SWork::default().genres().is_empty());
    }

    #[test]
    fn test_video_download_url() {
        let mut video = Video::new("https://example.com/watch/1", "1080p");
        assert_eq!(video.download_url(), "https://example.com/watch/1");
        video.video_url = Some("https://cdn.example.com/1.mp4".to_string());
        assert_eq!(video.download_url(), "https://cdn.example.com/1.mp4");
    }
}
