//! 快速添加：单个输入框生成一个条目
//!
//! 这里只负责把输入变成名称和配置，写入存储、绘制和保存/回滚在编辑器里完成。

use tracing::debug;

use crate::error::{AdminError, AdminResult};
use crate::model::{Item, ItemConfig, ItemKind};
use crate::validation::{derive_site_name, is_valid_href, normalize_href, FALLBACK_ABBR};

/// 快速添加生成的条目
#[derive(Debug, Clone, PartialEq)]
pub struct QuickAddEntry {
    pub name: String,
    pub config: ItemConfig,
}

impl QuickAddEntry {
    pub fn into_item<K: ItemKind>(self) -> Item<K> {
        Item::new(self.name, self.config)
    }
}

/// 裁剪 -> 补协议 -> 校验 -> 由主机名推导名称与缩写
pub fn prepare<K: ItemKind>(input: &str) -> AdminResult<QuickAddEntry> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(AdminError::EmptyField("网址"));
    }
    let href = normalize_href(trimmed);
    if !is_valid_href(&href) {
        return Err(AdminError::InvalidUrl(trimmed.to_string()));
    }
    // 站内路径没有主机名，推导不出名称
    let site = derive_site_name(&href).ok_or_else(|| AdminError::InvalidUrl(trimmed.to_string()))?;

    let mut config = ItemConfig::new(href);
    if K::HAS_ABBR && site.abbr != FALLBACK_ABBR {
        config.abbr = Some(site.abbr);
    }
    debug!("⚡ 快速添加解析: {} -> {}", trimmed, site.name);
    Ok(QuickAddEntry {
        name: site.name,
        config,
    })
}

/// 名称已被占用时追加序号：`Example`、`Example 2`、`Example 3` ...
pub fn unique_name(base: &str, taken: impl Fn(&str) -> bool) -> String {
    if !taken(base) {
        return base.to_string();
    }
    (2..)
        .map(|n| format!("{} {}", base, n))
        .find(|candidate| !taken(candidate))
        .unwrap_or_else(|| base.to_string())
}
