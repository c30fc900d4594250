use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;

use super::format_size;
use crate::core::download::{DownloadState, DownloadUnit, PROGRESS_UNKNOWN};

/// 为每个下载单元维护一个进度条
///
/// 进度条只读取单元发布的状态和进度，不会反向修改单元。
pub struct ProgressManager {
    multi: MultiProgress,
    watchers: Mutex<Vec<JoinHandle<()>>>,
}

impl Default for ProgressManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressManager {
    pub fn new() -> Self {
        Self::with_target(ProgressDrawTarget::stderr())
    }

    /// 不输出到终端，用于测试和非交互环境
    pub fn hidden() -> Self {
        Self::with_target(ProgressDrawTarget::hidden())
    }

    fn with_target(target: ProgressDrawTarget) -> Self {
        Self {
            multi: MultiProgress::with_draw_target(target),
            watchers: Mutex::new(Vec::new()),
        }
    }

    /// 开始跟踪一个已入队的单元，单元结束或被取消时进度条完成
    pub fn track(&self, unit: Arc<DownloadUnit>) -> ProgressBar {
        let bar = self.multi.add(ProgressBar::new(100));
        bar.set_prefix(format!("{} {}", unit.work().title, unit.episode().name));

        let mut status = unit.subscribe_status();
        let mut progress = unit.subscribe_progress();
        let watched = bar.clone();
        let handle = actix::spawn(async move {
            loop {
                let state = render(&watched, &unit);
                if state.is_terminal() || state == DownloadState::NotDownloaded {
                    break;
                }
                tokio::select! {
                    changed = status.changed() => if changed.is_err() { break },
                    changed = progress.changed() => if changed.is_err() { break },
                }
            }
        });

        if let Ok(mut watchers) = self.watchers.lock() {
            watchers.push(handle);
        }
        bar
    }

    /// 等待所有进度条完成
    pub async fn wait(&self) {
        let handles = match self.watchers.lock() {
            Ok(mut watchers) => std::mem::take(&mut *watchers),
            Err(_) => return,
        };
        for handle in handles {
            let _ = handle.await;
        }
    }

    pub fn println(&self, message: &str) {
        let _ = self.multi.println(message);
    }
}

fn bar_style() -> ProgressStyle {
    ProgressStyle::with_template("{prefix:30!} [{bar:40.cyan/blue}] {pos:>3}% {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=>-")
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("{prefix:30!} {spinner:.green} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

/// 按单元当前的状态刷新进度条，返回刷新时的状态
fn render(bar: &ProgressBar, unit: &DownloadUnit) -> DownloadState {
    let state = unit.status();
    let progress = unit.progress();

    if progress == PROGRESS_UNKNOWN {
        bar.set_style(spinner_style());
        bar.set_message(format!("{} {}", state, format_size(unit.total_bytes_downloaded())));
        bar.tick();
    } else {
        bar.set_style(bar_style());
        bar.set_position(progress.clamp(0, 100) as u64);
        bar.set_message(state.to_string());
    }

    match state {
        DownloadState::Downloaded => bar.finish_with_message(state.to_string()),
        DownloadState::Error => bar.abandon_with_message(state.to_string()),
        DownloadState::NotDownloaded => bar.abandon_with_message("已取消"),
        _ => {}
    }
    state
}
