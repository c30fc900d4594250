//! CLI: 命令行接口和参数解析模块
//!
//! ## 支持的命令
//!
//! - 列出作品：`animedown catalog.json --list`
//! - 下载分集：`animedown catalog.json -e 100 -e 101`
//! - 下载全部：`animedown catalog.json --all`
//! - 指定配置：`animedown -c config.toml catalog.json --all`
//!
//! ## 平台支持
//!
//! - Windows: `%APPDATA%/animedown/animedown.toml`
//! - macOS: `~/Library/Application Support/animedown/animedown.toml`
//! - Linux: `~/.config/animedown/animedown.toml`

use clap::Parser;
use std::env;

use crate::config::Config;
use crate::core::error::DownloadError;
use crate::domain::Library;

/// 获取平台默认配置文件路径
pub fn default_config_path() -> String {
    #[cfg(target_os = "windows")]
    {
        let appdata = env::var("APPDATA").unwrap_or_else(|_| ".".to_string());
        format!("{}/animedown/animedown.toml", appdata)
    }
    #[cfg(target_os = "macos")]
    {
        let home = env::var("HOME").unwrap_or_else(|_| ".".to_string());
        format!("{}/Library/Application Support/animedown/animedown.toml", home)
    }
    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        let home = env::var("HOME").unwrap_or_else(|_| ".".to_string());
        format!("{}/.config/animedown/animedown.toml", home)
    }
}

/// animedown 命令行参数
#[derive(Parser, Debug, Clone)]
#[command(
    name = "animedown",
    version = env!("CARGO_PKG_VERSION"),
    about = "按分集下载番剧的命令行工具",
    long_about = "从目录文件读取作品和分集，通过来源获取视频地址并下载，实时显示每个分集的进度。\n\n示例：\n  animedown catalog.json --list\n  animedown catalog.json -e 100 -e 101\n  animedown catalog.json --all -j 4\n"
)]
pub struct Args {
    /// 目录文件（JSON），包含作品和分集
    #[arg(help = "目录文件路径（JSON），包含 works 和 episodes 两个列表。")]
    pub catalog: String,

    /// 要下载的分集 ID
    #[arg(short = 'e', long = "episode", help = "要下载的分集 ID，可以重复指定。")]
    pub episodes: Vec<i64>,

    /// 下载目录中的全部分集
    #[arg(long, conflicts_with = "episodes", help = "下载目录中的全部分集。")]
    pub all: bool,

    /// 只列出作品和分集
    #[arg(long, help = "列出来源提供的作品和分集后退出。")]
    pub list: bool,

    /// 配置文件路径，默认为平台推荐路径
    #[arg(short = 'c', long, default_value_t = default_config_path(), help = "配置文件路径，默认为平台推荐路径。")]
    pub config: String,

    /// 指定下载目录
    #[arg(short = 'd', long, help = "指定下载目录，覆盖配置文件中的设置。")]
    pub download_dir: Option<String>,

    /// 并发下载数
    #[arg(short = 'j', long, help = "同时进行的下载数，覆盖配置文件中的设置。")]
    pub jobs: Option<usize>,

    /// 本地来源根目录
    #[arg(long, help = "本地来源根目录，覆盖配置文件中的设置。")]
    pub local_dir: Option<String>,
}

impl Args {
    /// 解析命令行参数并加载合并后的配置
    pub fn parse_args() -> Result<(Self, Config), DownloadError> {
        let args = Args::parse();
        let config = args.load_config()?;
        Ok((args, config))
    }

    pub fn load_config(&self) -> Result<Config, DownloadError> {
        let mut config = Config::load(&self.config)?;
        config.merge_from_args(self);
        config
            .validate()
            .map_err(|e| DownloadError::Config(format!("配置无效: {}", e)))?;
        Ok(config)
    }

    /// 根据参数选出要下载的分集，未知 ID 直接报错
    pub fn selected_episodes(&self, library: &Library) -> Result<Vec<i64>, DownloadError> {
        if self.all {
            return Ok(library.episode_ids());
        }
        if self.episodes.is_empty() && !self.list {
            return Err(DownloadError::Config(
                "未指定任何分集。请使用 -e <ID>、--all 或 --list".to_string(),
            ));
        }
        if let Some(missing) = self.episodes.iter().find(|id| library.episode(**id).is_none()) {
            return Err(DownloadError::Config(format!("目录中不存在分集: {}", missing)));
        }
        Ok(self.episodes.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::library::tests::sample_library;

    #[test]
    fn test_parse_episodes() {
        let args = Args::parse_from(["animedown", "catalog.json", "-e", "100", "--episode", "101"]);
        assert_eq!(args.catalog, "catalog.json");
        assert_eq!(args.episodes, vec![100, 101]);
        assert!(!args.all);
        assert_eq!(args.config, default_config_path());
        assert_eq!(args.selected_episodes(&sample_library()).unwrap(), vec![100, 101]);
    }

    #[test]
    fn test_all_conflicts_with_episodes() {
        assert!(Args::try_parse_from(["animedown", "catalog.json", "--all", "-e", "100"]).is_err());

        let args = Args::parse_from(["animedown", "catalog.json", "--all"]);
        assert_eq!(args.selected_episodes(&sample_library()).unwrap(), vec![100, 101]);
    }

    #[test]
    fn test_selection_errors() {
        let library = sample_library();
        let args = Args::parse_from(["animedown", "catalog.json"]);
        assert!(args.selected_episodes(&library).is_err());

        let args = Args::parse_from(["animedown", "catalog.json", "-e", "5"]);
        assert!(matches!(args.selected_episodes(&library), Err(DownloadError::Config(_))));

        let args = Args::parse_from(["animedown", "catalog.json", "--list"]);
        assert!(args.selected_episodes(&library).unwrap().is_empty());
    }

    #[test]
    fn test_load_config_applies_overrides() {
        let path = std::env::temp_dir().join("animedown_cli_config.toml");
        let path = path.to_string_lossy().into_owned();
        let _ = std::fs::remove_file(&path);

        let args = Args::parse_from(["animedown", "catalog.json", "-c", path.as_str(), "-j", "0"]);
        assert!(args.load_config().is_err());

        let args = Args::parse_from(["animedown", "catalog.json", "-c", path.as_str(), "-j", "3", "--local-dir", "/media"]);
        let config = args.load_config().unwrap();
        assert_eq!(config.max_concurrent_downloads, 3);
        assert_eq!(config.local_source_dir, "/media");

        let _ = std::fs::remove_file(&path);
    }
}
