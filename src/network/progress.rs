use bytes::Bytes;
use futures::Stream;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

/// 传输层在收到数据时回调的进度接口
///
/// `bytes_read` 是本次请求累计读取的字节数，不是增量；
/// `content_length` 为 0 表示长度未知。
pub trait ProgressListener: Send + Sync {
    fn update(&self, bytes_read: u64, content_length: u64, done: bool);
}

/// 包装响应体，每收到一块数据就上报本次请求的累计字节数
pub struct ProgressStream<S> {
    inner: S,
    listener: Arc<dyn ProgressListener>,
    bytes_read: u64,
    content_length: u64,
    finished: bool,
}

impl<S> ProgressStream<S> {
    pub fn new(inner: S, content_length: u64, listener: Arc<dyn ProgressListener>) -> Self {
        Self {
            inner,
            listener,
            bytes_read: 0,
            content_length,
            finished: false,
        }
    }

    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }
}

impl<S, E> Stream for ProgressStream<S>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
{
    type Item = Result<Bytes, E>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;
        match Pin::new(&mut this.inner).poll_next(cx) {
            Poll::Ready(Some(Ok(chunk))) => {
                this.bytes_read += chunk.len() as u64;
                this.listener.update(this.bytes_read, this.content_length, false);
                Poll::Ready(Some(Ok(chunk)))
            }
            Poll::Ready(None) => {
                if !this.finished {
                    this.finished = true;
                    this.listener.update(this.bytes_read, this.content_length, true);
                }
                Poll::Ready(None)
            }
            other => other,
        }
    }
}
