use serde::{Serialize, Deserialize};
use std::fmt;

/// 下载状态
///
/// NotDownloaded → Queue → Downloading → Downloaded，
/// Queue 和 Downloading 都可能进入 Error。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DownloadState {
    #[default]
    NotDownloaded,
    Queue,
    Downloading,
    Downloaded,
    Error,
}

impl DownloadState {
    pub fn value(self) -> i32 {
        match self {
            DownloadState::NotDownloaded => 0,
            DownloadState::Queue => 1,
            DownloadState::Downloading => 2,
            DownloadState::Downloaded => 3,
            DownloadState::Error => 4,
        }
    }

    pub fn from_value(value: i32) -> Option<Self> {
        match value {
            0 => Some(DownloadState::NotDownloaded),
            1 => Some(DownloadState::Queue),
            2 => Some(DownloadState::Downloading),
            3 => Some(DownloadState::Downloaded),
            4 => Some(DownloadState::Error),
            _ => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, DownloadState::Downloaded | DownloadState::Error)
    }

    /// 调度器使用的合法迁移；取消时可以从任何状态回到 NotDownloaded
    pub fn can_transition_to(self, next: DownloadState) -> bool {
        use DownloadState::*;
        match (self, next) {
            (_, NotDownloaded) => true,
            (NotDownloaded, Queue) => true,
            (Queue, Downloading) | (Queue, Error) => true,
            (Downloading, Downloaded) | (Downloading, Error) => true,
            (Error, Queue) => true,
            _ => false,
        }
    }
}

impl fmt::Display for DownloadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DownloadState::NotDownloaded => "未下载",
            DownloadState::Queue => "排队中",
            DownloadState::Downloading => "下载中",
            DownloadState::Downloaded => "已完成",
            DownloadState::Error => "失败",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_values() {
        for value in 0..=4 {
            assert_eq!(DownloadState::from_value(value).unwrap().value(), value);
        }
        assert_eq!(DownloadState::from_value(5), None);
        assert_eq!(DownloadState::default(), DownloadState::NotDownloaded);
    }

    #[test]
    fn test_transitions() {
        use DownloadState::*;
        assert!(NotDownloaded.can_transition_to(Queue));
        assert!(Queue.can_transition_to(Downloading));
        assert!(Queue.can_transition_to(Error));
        assert!(Downloading.can_transition_to(Downloaded));
        assert!(Downloading.can_transition_to(Error));
        assert!(Downloading.can_transition_to(NotDownloaded));
        assert!(!NotDownloaded.can_transition_to(Downloaded));
        assert!(!Downloaded.can_transition_to(Downloading));
        assert!(!Queue.can_transition_to(Downloaded));
    }

    #[test]
    fn test_terminal() {
        assert!(DownloadState::Downloaded.is_terminal());
        assert!(DownloadState::Error.is_terminal());
        assert!(!DownloadState::Downloading.is_terminal());
    }
}
