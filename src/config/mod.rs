use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use crate::core::error::DownloadError;

/// 重试次数上限
pub const MAX_RETRY_COUNT: usize = 20;

/// 配置结构体
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    /// 默认下载目录
    pub download_dir: String,
    /// 最大并发下载数
    pub max_concurrent_downloads: usize,
    /// 网络超时时间（秒）
    pub timeout: u64,
    /// User-Agent
    pub user_agent: String,
    /// 重试次数
    pub retry_count: usize,
    /// 重试延迟（秒）
    pub retry_delay: u64,
    /// 最大重试延迟（秒）
    pub retry_max_delay: u64,
    /// 本地来源的根目录，为空时不注册本地来源
    pub local_source_dir: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            download_dir: "./downloads".to_string(),
            max_concurrent_downloads: 2,
            timeout: 30,
            user_agent: format!("animedown/{}", env!("CARGO_PKG_VERSION")),
            retry_count: 3,
            retry_delay: 5,
            retry_max_delay: 60,
            local_source_dir: String::new(),
        }
    }
}

impl Config {
    /// 加载配置文件，不存在时写入默认配置
    pub fn load(path: &str) -> Result<Self, DownloadError> {
        if !Path::new(path).exists() {
            let config = Config::default();
            config.save_with_tutorial(path)?;
            log::info!("已创建默认配置文件: {}", path);
            return Ok(config);
        }
        let content = fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| DownloadError::Config(format!("配置文件格式错误 {}: {}", path, e)))
    }

    /// 保存带教程的配置文件（唯一写入方法）
    pub fn save_with_tutorial(&self, path: &str) -> Result<(), DownloadError> {
        if let Some(parent) = Path::new(path).parent() {
            fs::create_dir_all(parent)?;
        }
        let config_content = toml::to_string_pretty(self)
            .map_err(|e| DownloadError::Config(format!("无法序列化配置: {}", e)))?;
        let full_content = format!("{}\n{}", TUTORIAL, config_content);
        fs::write(path, full_content)?;
        Ok(())
    }

    /// 校验配置合法性
    pub fn validate(&self) -> Result<(), DownloadError> {
        if self.max_concurrent_downloads == 0 {
            return Err(DownloadError::Config("并发下载数必须大于0".to_string()));
        }

        if self.timeout == 0 {
            return Err(DownloadError::Config("超时时间必须大于0".to_string()));
        }

        if self.download_dir.trim().is_empty() {
            return Err(DownloadError::Config("下载目录不能为空".to_string()));
        }

        if self.user_agent.trim().is_empty() {
            return Err(DownloadError::Config("User-Agent 不能为空".to_string()));
        }

        if self.retry_count > MAX_RETRY_COUNT {
            return Err(DownloadError::Config(format!("重试次数不能超过{}", MAX_RETRY_COUNT)));
        }

        if self.retry_delay > self.retry_max_delay {
            return Err(DownloadError::Config("重试延迟不能大于最大重试延迟".to_string()));
        }

        Ok(())
    }

    /// 合并命令行参数到配置，命令行优先
    pub fn merge_from_args(&mut self, args: &crate::cli::Args) {
        if let Some(dir) = &args.download_dir {
            self.download_dir = dir.clone();
        }

        if let Some(jobs) = args.jobs {
            self.max_concurrent_downloads = jobs;
        }

        if let Some(dir) = &args.local_dir {
            self.local_source_dir = dir.clone();
        }
    }

    /// 获取配置摘要信息
    pub fn get_summary(&self) -> String {
        format!(
            "配置摘要:\n\
            - 下载目录: {}\n\
            - 并发数: {}\n\
            - 超时时间: {} 秒\n\
            - 重试: {} 次 (延迟 {}-{} 秒)\n\
            - 本地来源: {}",
            self.download_dir,
            self.max_concurrent_downloads,
            self.timeout,
            self.retry_count,
            self.retry_delay,
            self.retry_max_delay,
            if self.local_source_dir.is_empty() { "未启用" } else { &self.local_source_dir },
        )
    }
}

const TUTORIAL: &str = r#"# animedown 配置文件
# ====================
#
# TOML 格式，修改后保存即可生效。
# 命令行参数会覆盖配置文件中的设置，优先级：命令行 > 配置文件 > 默认值
#
# 使用示例：
#   animedown catalog.json --list              # 列出目录中的作品和分集
#   animedown catalog.json -e 100 -e 101       # 下载指定分集
#   animedown catalog.json --all -j 4          # 下载全部分集，4 个并发
#   animedown catalog.json --all -d /data/tv   # 指定下载目录
#
# ==================== 配置项说明 ====================
#
# download_dir              下载目录，文件保存为 <目录>/<来源>/<作品>/<分集>.<扩展名>
# max_concurrent_downloads  同时进行的下载数，建议 1-4
# timeout                   连接超时时间（秒）
# user_agent                请求使用的 User-Agent
# retry_count               网络错误时的重试次数，0 表示不重试，最多 20
# retry_delay               第一次重试前的等待时间（秒），之后指数退避
# retry_max_delay           重试等待时间的上限（秒）
# local_source_dir          本地来源根目录，每个子目录是一部作品，留空则不启用
#
# ==================== 故障排除 ====================
#
# 问题：经常下载失败
# 解决：增加 retry_count 或 timeout 值
#
# 问题：服务器拒绝请求
# 解决：修改 user_agent
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn temp_path(name: &str) -> String {
        std::env::temp_dir().join(name).to_string_lossy().into_owned()
    }

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.max_concurrent_downloads, 2);
        assert_eq!(config.timeout, 30);
        assert_eq!(config.retry_count, 3);
        assert!(config.local_source_dir.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        config.max_concurrent_downloads = 0;
        assert!(matches!(config.validate(), Err(DownloadError::Config(_))));

        config = Config::default();
        config.download_dir = "  ".to_string();
        assert!(config.validate().is_err());

        config = Config::default();
        config.retry_delay = 120;
        assert!(config.validate().is_err());

        config = Config::default();
        config.retry_count = MAX_RETRY_COUNT + 1;
        assert!(matches!(config.validate(), Err(DownloadError::Config(_))));

        // 不重试是合法的
        config = Config::default();
        config.retry_count = 0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_save_load() {
        let path = temp_path("animedown_test_config.toml");
        let config = Config {
            max_concurrent_downloads: 4,
            local_source_dir: "/media/anime".to_string(),
            ..Config::default()
        };

        config.save_with_tutorial(&path).expect("保存带教程的配置失败");
        let content = std::fs::read_to_string(&path).expect("读取配置文件失败");
        assert!(content.contains("animedown 配置文件"));
        assert!(content.contains("故障排除"));

        let loaded = Config::load(&path).expect("加载配置失败");
        assert_eq!(loaded, config);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_load_creates_missing_file() {
        let path = temp_path("animedown_test_missing/config.toml");
        let _ = std::fs::remove_file(&path);

        let config = Config::load(&path).expect("加载配置失败");
        assert_eq!(config, Config::default());
        assert!(Path::new(&path).exists());

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_partial_and_invalid_file() {
        let path = temp_path("animedown_test_partial.toml");
        std::fs::write(&path, "max_concurrent_downloads = 5\n").unwrap();
        let config = Config::load(&path).unwrap();
        assert_eq!(config.max_concurrent_downloads, 5);
        assert_eq!(config.timeout, Config::default().timeout);

        std::fs::write(&path, "timeout = \"soon\"\n").unwrap();
        assert!(matches!(Config::load(&path), Err(DownloadError::Config(_))));

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_merge_from_args() {
        let args = crate::cli::Args::parse_from(["animedown", "catalog.json", "-d", "/tmp/tv", "-j", "5"]);
        let mut config = Config::default();
        config.merge_from_args(&args);
        assert_eq!(config.download_dir, "/tmp/tv");
        assert_eq!(config.max_concurrent_downloads, 5);
        assert!(config.local_source_dir.is_empty());
    }

    #[test]
    fn test_config_summary() {
        let summary = Config::default().get_summary();
        assert!(summary.contains("配置摘要"));
        assert!(summary.contains("下载目录"));
        assert!(summary.contains("未启用"));
    }
}
