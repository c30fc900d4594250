use async_trait::async_trait;
use awc::error::SendRequestError;
use awc::http::header;
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncWriteExt, BufWriter};

use super::progress::{ProgressListener, ProgressStream};
use crate::config::Config;
use crate::core::error::{DownloadError, DownloadResult};

const WRITE_BUFFER_SIZE: usize = 256 * 1024;

/// 一次视频传输请求
#[derive(Debug, Clone, PartialEq)]
pub struct TransferRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub dest: PathBuf,
}

/// 把视频传输到本地文件，返回写入的字节数
///
/// 实现必须在收到数据时回调 `listener`，每次调用都是一次独立的请求尝试。
#[async_trait(?Send)]
pub trait Transfer {
    async fn fetch(&self, request: &TransferRequest, listener: Arc<dyn ProgressListener>) -> DownloadResult<u64>;
}

/// 下载中的临时文件路径
pub fn part_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".part");
    dest.with_file_name(name)
}

/// 基于 awc 的 HTTP 传输
pub struct HttpTransfer {
    client: awc::Client,
}

impl HttpTransfer {
    pub fn new(config: &Config) -> Self {
        let connector = awc::Connector::new().timeout(Duration::from_secs(config.timeout));
        let client = awc::Client::builder()
            .connector(connector)
            .add_default_header((header::USER_AGENT, config.user_agent.clone()))
            // 视频体积大，整体超时只作用于连接阶段
            .disable_timeout()
            .finish();
        Self { client }
    }
}

#[async_trait(?Send)]
impl Transfer for HttpTransfer {
    async fn fetch(&self, request: &TransferRequest, listener: Arc<dyn ProgressListener>) -> DownloadResult<u64> {
        if !crate::utils::validator::is_valid_url(&request.url) {
            return Err(DownloadError::InvalidUrl(request.url.clone()));
        }

        // 关闭压缩，保证 Content-Length 与写入的字节数一致
        let mut builder = self
            .client
            .get(&request.url)
            .no_decompress()
            .insert_header((header::ACCEPT_ENCODING, "identity"));
        for (name, value) in &request.headers {
            builder = builder.insert_header((name.as_str(), value.as_str()));
        }

        let response = builder.send().await.map_err(|e| match e {
            SendRequestError::Timeout => DownloadError::Timeout,
            other => DownloadError::NetworkError(other.to_string()),
        })?;

        if !response.status().is_success() {
            return Err(DownloadError::ServerError(response.status().to_string()));
        }

        let content_length = response
            .headers()
            .get(header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(0);

        if let Some(parent) = request.dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let part = part_path(&request.dest);
        let body = ProgressStream::new(response, content_length, listener);
        let written = match write_part(body, content_length, &part).await {
            Ok(written) => written,
            Err(e) => {
                let _ = tokio::fs::remove_file(&part).await;
                return Err(e);
            }
        };

        tokio::fs::rename(&part, &request.dest).await?;
        log::debug!("传输完成: {} -> {} ({} 字节)", request.url, request.dest.display(), written);
        Ok(written)
    }
}

/// 把响应体写入临时文件并校验长度
async fn write_part<S, E>(mut body: ProgressStream<S>, content_length: u64, part: &Path) -> DownloadResult<u64>
where
    S: futures::Stream<Item = Result<bytes::Bytes, E>> + Unpin,
    E: std::fmt::Display,
{
    let file = tokio::fs::File::create(part).await?;
    let mut writer = BufWriter::with_capacity(WRITE_BUFFER_SIZE, file);

    while let Some(chunk) = body.next().await {
        let chunk = chunk.map_err(|e| DownloadError::NetworkError(format!("网络流错误: {}", e)))?;
        writer.write_all(&chunk).await?;
    }
    writer.flush().await?;

    let written = body.bytes_read();
    if content_length > 0 && written != content_length {
        log::error!("文件大小不匹配: 预期 {} 实际 {}", content_length, written);
        return Err(DownloadError::SizeMismatch {
            expected: content_length,
            actual: written,
        });
    }
    Ok(written)
}
