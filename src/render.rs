//! 条目卡片渲染与页面片段模型
//!
//! `FragmentView` 是页面 DOM 的内存模型：每个分组一个容器，容器内是按顺序排列的卡片。
//! 卡片上的操作按钮只带 `data-action` / `data-group` / `data-item` 属性，
//! 由事件委托统一分发，不再内联函数调用。

use std::fmt::Write as _;
use tracing::debug;

use crate::model::{Item, ItemConfig, ItemKind};
use crate::store::ListStore;

/// 页面视图
pub trait View<K: ItemKind> {
    /// 在分组容器末尾追加一张卡片（乐观添加）
    fn paint_item(&mut self, group: &str, item: &Item<K>);

    /// 移除一张卡片（回滚、删除）
    fn remove_item(&mut self, group: &str, name: &str);

    /// 原地更新分组标题与各卡片的分组属性
    fn rename_group(&mut self, old: &str, new: &str);

    /// 按存储内容整页重绘
    fn reload(&mut self, store: &ListStore<K>);
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// 图标优先，其次缩写徽标，最后是地球图标
fn icon_html(name: &str, config: &ItemConfig) -> String {
    match (config.icon.as_deref(), config.abbr.as_deref()) {
        (Some(icon), _) if !icon.is_empty() => format!(
            r#"<img src="{}" alt="{}" class="item-icon">"#,
            escape_html(icon),
            escape_html(name)
        ),
        (_, Some(abbr)) if !abbr.is_empty() => {
            format!(r#"<span class="badge bg-primary">{}</span>"#, escape_html(abbr))
        }
        _ => r#"<i class="fas fa-globe text-muted"></i>"#.to_string(),
    }
}

pub fn render_item_card<K: ItemKind>(group: &str, item: &Item<K>) -> String {
    let slug = K::SLUG;
    let group = escape_html(group);
    let name = escape_html(&item.name);
    let href = escape_html(&item.config.href);
    let subtitle = escape_html(item.config.description.as_deref().unwrap_or(&item.config.href));

    let mut html = String::new();
    let _ = write!(
        html,
        r#"<div class="card {slug}-card" data-group="{group}" data-item="{name}">"#
    );
    let _ = write!(
        html,
        r#"<input type="checkbox" class="multi-select-checkbox d-none" data-group="{group}" data-item="{name}">"#
    );
    let _ = write!(
        html,
        r#"<div class="{slug}-actions"><button data-action="edit" data-group="{group}" data-item="{name}" title="编辑"><i class="fas fa-edit"></i></button><button data-action="delete" data-group="{group}" data-item="{name}" title="删除"><i class="fas fa-trash"></i></button></div>"#
    );
    let _ = write!(
        html,
        r#"<div class="{slug}-content"><div class="{slug}-icon-wrapper">{}</div><a href="{href}" target="_blank" class="{slug}-title-link">{name}</a><a href="{href}" target="_blank" class="{slug}-url-link"><small>{subtitle}</small></a></div>"#,
        icon_html(&item.name, &item.config)
    );
    html.push_str("</div>");
    html
}

/// 单张卡片
#[derive(Debug, Clone, PartialEq)]
pub struct Card {
    pub name: String,
    pub html: String,
}

/// 分组容器
#[derive(Debug, Clone, PartialEq)]
pub struct GroupContainer {
    pub name: String,
    pub cards: Vec<Card>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FragmentView {
    containers: Vec<GroupContainer>,
    reloads: usize,
}

impl FragmentView {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    /// 整页重绘的次数
    pub fn reload_count(&self) -> usize {
        self.reloads
    }

    #[cfg(test)]
    pub fn has_card(&self, group: &str, name: &str) -> bool {
        self.container(group)
            .map(|c| c.cards.iter().any(|card| card.name == name))
            .unwrap_or(false)
    }

    #[cfg(test)]
    pub fn card_names(&self, group: &str) -> Vec<&str> {
        self.container(group)
            .map(|c| c.cards.iter().map(|card| card.name.as_str()).collect())
            .unwrap_or_default()
    }

    fn container(&self, group: &str) -> Option<&GroupContainer> {
        self.containers.iter().find(|c| c.name == group)
    }

    fn container_mut(&mut self, group: &str) -> Option<&mut GroupContainer> {
        self.containers.iter_mut().find(|c| c.name == group)
    }

    /// 整个页面的 HTML
    pub fn to_html(&self) -> String {
        let mut html = String::new();
        for container in &self.containers {
            let group = escape_html(&container.name);
            let _ = write!(
                html,
                r#"<section class="group-section" data-group="{group}"><h5 class="group-title" data-action="rename-group" data-group="{group}">{group}</h5><div class="group-items">"#
            );
            for card in &container.cards {
                html.push_str(&card.html);
            }
            html.push_str("</div></section>");
        }
        html
    }
}

impl<K: ItemKind> View<K> for FragmentView {
    fn paint_item(&mut self, group: &str, item: &Item<K>) {
        let html = render_item_card(group, item);
        // 找不到容器时什么也不画，和页面上 querySelector 落空一致
        if let Some(container) = self.container_mut(group) {
            container.cards.push(Card { name: item.name.clone(), html });
        }
    }

    fn remove_item(&mut self, group: &str, name: &str) {
        if let Some(container) = self.container_mut(group) {
            container.cards.retain(|card| card.name != name);
        }
    }

    fn rename_group(&mut self, old: &str, new: &str) {
        let from = format!(r#"data-group="{}""#, escape_html(old));
        let to = format!(r#"data-group="{}""#, escape_html(new));
        if let Some(container) = self.container_mut(old) {
            container.name = new.to_string();
            for card in &mut container.cards {
                card.html = card.html.replace(&from, &to);
            }
        }
    }

    fn reload(&mut self, store: &ListStore<K>) {
        self.containers = store
            .groups()
            .iter()
            .map(|group| GroupContainer {
                name: group.name.clone(),
                cards: group
                    .items
                    .iter()
                    .map(|item| Card {
                        name: item.name.clone(),
                        html: render_item_card(&group.name, item),
                    })
                    .collect(),
            })
            .collect();
        self.reloads += 1;
        debug!("🔄 重绘{}: {} 个分组 (第 {} 次)", K::LABEL, self.containers.len(), self.reloads);
    }
}
