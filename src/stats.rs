//! 概览页统计与配置文件状态

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::model::{Bookmarks, Services};
use crate::store::ListStore;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Stats {
    pub bookmarks_count: usize,
    pub bookmarks_groups: usize,
    pub services_count: usize,
    pub services_groups: usize,
    pub widgets_count: usize,
    pub docker_instances: usize,
    pub configured_settings: usize,
}

impl Stats {
    /// 由已加载的列表在本地计算；小工具、Docker、设置项需另行填入
    pub fn from_lists(bookmarks: &ListStore<Bookmarks>, services: &ListStore<Services>) -> Self {
        Self {
            bookmarks_count: bookmarks.item_count(),
            bookmarks_groups: bookmarks.group_count(),
            services_count: services.item_count(),
            services_groups: services.group_count(),
            ..Default::default()
        }
    }
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "书签: {} 个 ({} 个分组)", self.bookmarks_count, self.bookmarks_groups)?;
        writeln!(f, "服务: {} 个 ({} 个分组)", self.services_count, self.services_groups)?;
        writeln!(f, "小工具: {}", self.widgets_count)?;
        writeln!(f, "Docker 实例: {}", self.docker_instances)?;
        write!(f, "已配置设置项: {}", self.configured_settings)
    }
}

/// 单个配置文件的状态
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileStatus {
    pub exists: bool,
    pub size: u64,
    pub modified: Option<String>,
}

/// 配置类型名 -> 文件状态
pub type ConfigStatus = BTreeMap<String, FileStatus>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ItemConfig;
    use serde_json::json;

    #[test]
    fn test_from_lists() {
        let mut bookmarks = ListStore::<Bookmarks>::new();
        bookmarks.add_group("A").unwrap();
        bookmarks.add_group("B").unwrap();
        bookmarks.add_item("A", "x", ItemConfig::new("/x")).unwrap();
        bookmarks.add_item("B", "y", ItemConfig::new("/y")).unwrap();
        let services = ListStore::<Services>::new();

        let stats = Stats::from_lists(&bookmarks, &services);
        assert_eq!(stats.bookmarks_count, 2);
        assert_eq!(stats.bookmarks_groups, 2);
        assert_eq!(stats.services_count, 0);
        assert!(stats.to_string().contains("书签: 2 个 (2 个分组)"));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let stats: Stats = serde_json::from_value(json!({ "bookmarks_count": 7 })).unwrap();
        assert_eq!(stats.bookmarks_count, 7);
        assert_eq!(stats.docker_instances, 0);

        let status: ConfigStatus = serde_json::from_value(json!({
            "settings": { "exists": true, "size": 120, "modified": "2024-01-01 10:00:00" },
            "docker": { "exists": false, "size": 0, "modified": null }
        }))
        .unwrap();
        assert!(status["settings"].exists);
        assert_eq!(status["docker"].modified, None);
    }
}
