//! Network: 视频传输与进度回调
//!
//! - `progress`: `ProgressListener` 回调接口与计数包装流 `ProgressStream`
//! - `transfer`: `Transfer` 接口和基于 awc 的 `HttpTransfer`

pub mod progress;
pub mod transfer;

pub use progress::{ProgressListener, ProgressStream};
pub use transfer::{HttpTransfer, Transfer, TransferRequest};
