//! 页面内嵌的初始数据
//!
//! 服务端渲染页面时把 JSON 写进指定 id 的元素（`bookmarks-data`、`services-data`、
//! `stats-data`、`config-status-data`）。缺失或格式错误时退回空集合，不视为致命错误。

use scraper::{Html, Selector};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::model::{parse_groups, ItemKind};
use crate::stats::{ConfigStatus, Stats};
use crate::store::ListStore;

pub const STATS_ELEMENT: &str = "stats-data";
pub const CONFIG_STATUS_ELEMENT: &str = "config-status-data";

/// 取出元素文本并按 JSON 解析
pub fn extract<T: DeserializeOwned + Default>(html: &str, element_id: &str) -> T {
    match parse_element(html, element_id) {
        Ok(value) => value,
        Err(reason) => {
            warn!("⚠️  #{} {}，使用空数据", element_id, reason);
            T::default()
        }
    }
}

fn parse_element<T: DeserializeOwned>(html: &str, element_id: &str) -> Result<T, String> {
    let text = element_text(html, element_id).ok_or_else(|| "数据元素不存在".to_string())?;
    serde_json::from_str(text.trim()).map_err(|e| format!("解析失败: {}", e))
}

fn element_text(html: &str, element_id: &str) -> Option<String> {
    let document = Html::parse_document(html);
    // id 可能含有 CSS 选择器里的特殊字符，用属性选择器并转义引号
    let selector = Selector::parse(&format!(r#"[id="{}"]"#, element_id.replace('"', "\\\""))).ok()?;
    let element = document.select(&selector).next()?;
    Some(element.text().collect::<String>())
}

/// 严格加载：数据元素缺失或结构无效时返回 `None`
pub fn try_load_list<K: ItemKind>(html: &str) -> Option<ListStore<K>> {
    let value: Value = parse_element(html, K::DATA_ELEMENT)
        .map_err(|reason| warn!("⚠️  #{} {}", K::DATA_ELEMENT, reason))
        .ok()?;
    match parse_groups::<K>(value) {
        Ok(groups) => Some(ListStore::from_groups(groups)),
        Err(e) => {
            warn!("⚠️  {}数据结构无效: {}", K::LABEL, e);
            None
        }
    }
}

/// 页面加载：任何问题都退回空列表
pub fn load_list<K: ItemKind>(html: &str) -> ListStore<K> {
    let store = try_load_list::<K>(html).unwrap_or_default();
    debug!("📥 加载{}: {} 个分组, {} 个条目", K::LABEL, store.group_count(), store.item_count());
    store
}

pub fn load_stats(html: &str) -> Stats {
    extract(html, STATS_ELEMENT)
}

pub fn load_config_status(html: &str) -> ConfigStatus {
    extract(html, CONFIG_STATUS_ELEMENT)
}
