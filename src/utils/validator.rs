use regex::Regex;
use std::sync::OnceLock;
use url::Url;

/// 可识别的视频扩展名
pub const VIDEO_EXTENSIONS: [&str; 6] = ["mp4", "mkv", "webm", "avi", "mov", "m4v"];

/// 无法识别扩展名时使用
pub const DEFAULT_VIDEO_EXTENSION: &str = "mp4";

/// 只接受 http/https 地址
pub fn is_valid_url(url: &str) -> bool {
    match Url::parse(url) {
        Ok(parsed) => matches!(parsed.scheme(), "http" | "https") && parsed.host().is_some(),
        Err(_) => false,
    }
}

pub fn is_video_extension(ext: &str) -> bool {
    VIDEO_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str())
}

/// 从视频地址推断扩展名，忽略查询参数
pub fn video_extension(url: &str) -> String {
    let path = match Url::parse(url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => url.split(['?', '#']).next().unwrap_or_default().to_string(),
    };
    path.rsplit('/')
        .next()
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| is_video_extension(ext))
        .unwrap_or_else(|| DEFAULT_VIDEO_EXTENSION.to_string())
}

/// 把作品名、分集名变成可用的文件名
pub fn sanitize_file_name(name: &str) -> String {
    static INVALID: OnceLock<Regex> = OnceLock::new();
    let re = INVALID.get_or_init(|| Regex::new(r#"[<>:"/\\|?*\x00-\x1f]"#).expect("valid regex"));
    let cleaned = re.replace_all(name.trim(), "_");
    let cleaned = cleaned.trim_end_matches(['.', ' ']);
    if cleaned.is_empty() {
        "_".to_string()
    } else {
        cleaned.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_validation() {
        assert!(is_valid_url("https://example.com"));
        assert!(is_valid_url("http://127.0.0.1:8080/a.mp4"));
        assert!(!is_valid_url("ftp://example.com/a.mp4"));
        assert!(!is_valid_url("invalid-url"));
        assert!(!is_valid_url("/relative/path.mp4"));
    }

    #[test]
    fn test_video_extension() {
        assert_eq!(video_extension("http://a.com/ep/1.mkv"), "mkv");
        assert_eq!(video_extension("http://a.com/ep/1.MP4?token=abc"), "mp4");
        assert_eq!(video_extension("http://a.com/ep/playlist.m3u8"), "mp4");
        assert_eq!(video_extension("http://a.com/ep/stream"), "mp4");
        assert_eq!(video_extension("not a url.webm#t=1"), "webm");
    }

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("第1集"), "第1集");
        assert_eq!(sanitize_file_name("Re:Zero / S2"), "Re_Zero _ S2");
        assert_eq!(sanitize_file_name(" Title. "), "Title");
        assert_eq!(sanitize_file_name("..."), "_");
        assert_eq!(sanitize_file_name("a?b*c"), "a_b_c");
    }
}
