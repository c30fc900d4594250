use std::collections::BTreeMap;
use std::sync::Arc;

use super::{RemoteSource, Source};

#[derive(Clone)]
enum RegisteredSource {
    Remote {
        source: Arc<dyn Source>,
        remote: Arc<dyn RemoteSource>,
    },
    Local(Arc<dyn Source>),
}

/// 来源注册表
#[derive(Clone, Default)]
pub struct SourceManager {
    sources: BTreeMap<i64, RegisteredSource>,
}

impl SourceManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册在线来源，返回被替换的同 ID 来源是否存在
    pub fn register_remote<S: RemoteSource + 'static>(&mut self, source: Arc<S>) -> bool {
        let id = source.id();
        log::debug!("注册在线来源: {} ({})", source.name(), id);
        let registered = RegisteredSource::Remote {
            source: source.clone(),
            remote: source,
        };
        self.sources.insert(id, registered).is_some()
    }

    pub fn register_local<S: Source + 'static>(&mut self, source: Arc<S>) -> bool {
        let id = source.id();
        log::debug!("注册本地来源: {} ({})", source.name(), id);
        self.sources.insert(id, RegisteredSource::Local(source)).is_some()
    }

    pub fn get(&self, id: i64) -> Option<Arc<dyn Source>> {
        self.sources.get(&id).map(|registered| match registered {
            RegisteredSource::Remote { source, .. } | RegisteredSource::Local(source) => source.clone(),
        })
    }

    /// 只返回支持在线获取的来源
    pub fn get_remote(&self, id: i64) -> Option<Arc<dyn RemoteSource>> {
        match self.sources.get(&id)? {
            RegisteredSource::Remote { remote, .. } => Some(remote.clone()),
            RegisteredSource::Local(_) => None,
        }
    }

    pub fn is_remote(&self, id: i64) -> bool {
        self.get_remote(id).is_some()
    }

    /// 所有来源，按 ID 排序
    pub fn all(&self) -> Vec<Arc<dyn Source>> {
        self.sources.keys().filter_map(|&id| self.get(id)).collect()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::library::tests::sample_library;
    use crate::source::{CatalogSource, LocalSource};

    fn manager() -> SourceManager {
        let mut manager = SourceManager::new();
        manager.register_remote(Arc::new(CatalogSource::new(7, "Catalog", "http://127.0.0.1", sample_library())));
        manager.register_local(Arc::new(LocalSource::new(std::env::temp_dir())));
        manager
    }

    #[test]
    fn test_get_any_source() {
        let manager = manager();
        assert_eq!(manager.len(), 2);
        assert_eq!(manager.get(7).unwrap().name(), "Catalog");
        assert_eq!(manager.get(LocalSource::ID).unwrap().name(), "Local source");
        assert!(manager.get(1).is_none());
    }

    #[test]
    fn test_remote_capability_check() {
        let manager = manager();
        assert!(manager.is_remote(7));
        assert!(!manager.is_remote(LocalSource::ID));
        assert!(manager.get_remote(LocalSource::ID).is_none());
        assert_eq!(manager.get_remote(7).unwrap().base_url(), "http://127.0.0.1");
    }

    #[test]
    fn test_all_sorted_by_id() {
        let manager = manager();
        let ids: Vec<i64> = manager.all().iter().map(|s| s.id()).collect();
        assert_eq!(ids, vec![LocalSource::ID, 7]);
    }

    #[test]
    fn test_register_replaces_same_id() {
        let mut manager = manager();
        let replaced = manager.register_local(Arc::new(LocalSource::new(std::env::temp_dir())));
        assert!(replaced);
        assert_eq!(manager.len(), 2);
    }
}
