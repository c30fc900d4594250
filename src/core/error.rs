use thiserror::Error;
use std::io;

/// 内容来源插件返回的错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    /// 旧版流式接口未被来源实现
    #[error("来源未实现该接口: {0}")]
    NotImplemented(&'static str),

    /// 旧版流式接口没有产生任何值
    #[error("来源没有返回任何结果")]
    NoElement,

    #[error("来源网络错误: {0}")]
    Network(String),

    #[error("来源数据解析失败: {0}")]
    Parse(String),

    #[error("来源IO错误: {0}")]
    Io(String),
}

impl From<io::Error> for SourceError {
    fn from(error: io::Error) -> Self {
        SourceError::Io(error.to_string())
    }
}

#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("网络错误: {0}")]
    NetworkError(String),

    #[error("IO错误: {0}")]
    IoError(#[from] io::Error),

    #[error("无效的URL: {0}")]
    InvalidUrl(String),

    #[error("下载超时")]
    Timeout,

    #[error("下载被取消")]
    Cancelled,

    #[error("服务器错误: {0}")]
    ServerError(String),

    #[error("文件大小不匹配: 预期 {expected} 字节, 实际 {actual} 字节")]
    SizeMismatch {
        expected: u64,
        actual: u64,
    },

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error("分集没有可下载的视频: {0}")]
    NoVideo(String),

    #[error("配置错误: {0}")]
    Config(String),

    #[error("未知错误: {0}")]
    Unknown(String),
}

impl DownloadError {
    pub fn is_retryable(&self) -> bool {
        match self {
            DownloadError::NetworkError(_) | DownloadError::Timeout => true,
            DownloadError::ServerError(msg) => msg.starts_with('5'),
            DownloadError::SizeMismatch { .. } => true,
            DownloadError::Source(SourceError::Network(_)) => true,
            _ => false,
        }
    }
}

pub type DownloadResult<T> = Result<T, DownloadError>;

pub type SourceResult<T> = Result<T, SourceError>;
