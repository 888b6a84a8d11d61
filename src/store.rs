//! 列表存储
//!
//! 页面内存中的分组/条目工作副本。所有修改都是同步的、就地的；
//! 失败的操作不会改变存储。持久化由调用方在修改之后发起。

use serde_json::Value;
use std::collections::HashSet;
use tracing::debug;

use crate::error::{AdminError, AdminResult};
use crate::model::{Group, Item, ItemConfig, ItemKind};
use crate::validation::check_href;

/// 可逆的存储修改
///
/// `ListStore::apply` 执行操作并返回预先计算好的逆操作，
/// 乐观更新失败时直接执行逆操作即可回滚。
#[derive(Debug, Clone, PartialEq)]
pub enum StoreOp<K: ItemKind> {
    AddGroup { name: String },
    InsertGroup { index: usize, group: Group<K> },
    RenameGroup { old: String, new: String },
    RemoveGroup { name: String },
    AddItem { group: String, item: Item<K> },
    InsertItem { group: String, index: usize, item: Item<K> },
    ReplaceItem { group: String, original: String, item: Item<K> },
    RemoveItem { group: String, name: String },
    MoveItem { from_group: String, to_group: String, from_index: usize, to_index: usize },
    MoveGroup { from_index: usize, to_index: usize },
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ListStore<K: ItemKind> {
    groups: Vec<Group<K>>,
}

fn required(value: &str, field: &'static str) -> AdminResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(AdminError::EmptyField(field))
    } else {
        Ok(trimmed.to_string())
    }
}

impl<K: ItemKind> ListStore<K> {
    pub fn new() -> Self {
        Self { groups: Vec::new() }
    }

    pub fn from_groups(groups: Vec<Group<K>>) -> Self {
        Self { groups }
    }

    /// 从 JSON 文本构建，分组名和组内条目名必须唯一
    pub fn from_json(text: &str) -> AdminResult<Self> {
        let groups: Vec<Group<K>> = serde_json::from_str(text)?;
        let store = Self { groups };
        store.check_unique_names()?;
        Ok(store)
    }

    /// 外部数据不经过增删操作，名称唯一性要单独检查
    pub fn check_unique_names(&self) -> AdminResult<()> {
        let mut groups = HashSet::new();
        for group in &self.groups {
            if !groups.insert(group.name.as_str()) {
                return Err(AdminError::DuplicateGroup(group.name.clone()));
            }
            let mut items = HashSet::new();
            for item in &group.items {
                if !items.insert(item.name.as_str()) {
                    return Err(AdminError::DuplicateItem {
                        group: group.name.clone(),
                        name: item.name.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    pub fn to_json(&self) -> Value {
        // Group 的 Serialize 只会写字符串键和 ItemConfig，不会失败
        serde_json::to_value(&self.groups).unwrap_or(Value::Array(Vec::new()))
    }

    pub fn to_json_pretty(&self) -> AdminResult<String> {
        Ok(serde_json::to_string_pretty(&self.groups)?)
    }

    pub fn groups(&self) -> &[Group<K>] {
        &self.groups
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    pub fn item_count(&self) -> usize {
        self.groups.iter().map(|g| g.items.len()).sum()
    }

    pub fn group_index(&self, name: &str) -> Option<usize> {
        self.groups.iter().position(|g| g.name == name)
    }

    pub fn group(&self, name: &str) -> Option<&Group<K>> {
        self.groups.iter().find(|g| g.name == name)
    }

    pub fn item(&self, group: &str, name: &str) -> Option<&Item<K>> {
        self.group(group).and_then(|g| g.item(name))
    }

    fn require_group(&self, name: &str) -> AdminResult<usize> {
        self.group_index(name)
            .ok_or_else(|| AdminError::GroupNotFound(name.to_string()))
    }

    fn require_item(&self, group: &str, name: &str) -> AdminResult<(usize, usize)> {
        let gi = self.require_group(group)?;
        let ii = self.groups[gi].position(name).ok_or_else(|| AdminError::ItemNotFound {
            group: group.to_string(),
            name: name.to_string(),
        })?;
        Ok((gi, ii))
    }

    pub fn add_group(&mut self, name: &str) -> AdminResult<()> {
        let name = required(name, "分组名称")?;
        if self.group_index(&name).is_some() {
            return Err(AdminError::DuplicateGroup(name));
        }
        debug!("➕ 添加分组: {}", name);
        self.groups.push(Group::new(name));
        Ok(())
    }

    pub fn insert_group_at(&mut self, index: usize, group: Group<K>) -> AdminResult<()> {
        if self.group_index(&group.name).is_some() {
            return Err(AdminError::DuplicateGroup(group.name));
        }
        if index > self.groups.len() {
            return Err(AdminError::IndexOutOfRange { index, len: self.groups.len() });
        }
        self.groups.insert(index, group);
        Ok(())
    }

    /// 重命名分组，位置和条目保持不变；新旧名称相同时什么也不做
    pub fn rename_group(&mut self, old: &str, new: &str) -> AdminResult<()> {
        let new = required(new, "分组名称")?;
        let gi = self.require_group(old)?;
        if new == old {
            return Ok(());
        }
        if self.group_index(&new).is_some() {
            return Err(AdminError::DuplicateGroup(new));
        }
        debug!("✏️  重命名分组: {} -> {}", old, new);
        self.groups[gi].name = new;
        Ok(())
    }

    pub fn remove_group(&mut self, name: &str) -> AdminResult<(usize, Group<K>)> {
        let gi = self.require_group(name)?;
        debug!("🗑️  删除分组: {}", name);
        Ok((gi, self.groups.remove(gi)))
    }

    pub fn add_item(&mut self, group: &str, name: &str, config: ItemConfig) -> AdminResult<()> {
        let name = required(name, "名称")?;
        check_href(&config.href)?;
        let gi = self.require_group(group)?;
        if self.groups[gi].contains(&name) {
            return Err(AdminError::DuplicateItem { group: group.to_string(), name });
        }
        debug!("➕ 添加{} {} 到分组 {}", K::LABEL, name, group);
        self.groups[gi].items.push(Item::new(name, config));
        Ok(())
    }

    pub fn insert_item_at(&mut self, group: &str, index: usize, item: Item<K>) -> AdminResult<()> {
        let gi = self.require_group(group)?;
        let target = &mut self.groups[gi];
        if target.contains(&item.name) {
            return Err(AdminError::DuplicateItem { group: group.to_string(), name: item.name });
        }
        if index > target.items.len() {
            return Err(AdminError::IndexOutOfRange { index, len: target.items.len() });
        }
        target.items.insert(index, item);
        Ok(())
    }

    /// 编辑表单保存：原位置替换，允许保留原名称
    pub fn replace_item(&mut self, group: &str, original: &str, name: &str, config: ItemConfig) -> AdminResult<Item<K>> {
        let name = required(name, "名称")?;
        check_href(&config.href)?;
        let (gi, ii) = self.require_item(group, original)?;
        if name != original && self.groups[gi].contains(&name) {
            return Err(AdminError::DuplicateItem { group: group.to_string(), name });
        }
        let previous = std::mem::replace(&mut self.groups[gi].items[ii], Item::new(name, config));
        Ok(previous)
    }

    pub fn rename_item(&mut self, group: &str, old: &str, new: &str) -> AdminResult<()> {
        let new = required(new, "名称")?;
        let (gi, ii) = self.require_item(group, old)?;
        if new == old {
            return Ok(());
        }
        if self.groups[gi].contains(&new) {
            return Err(AdminError::DuplicateItem { group: group.to_string(), name: new });
        }
        self.groups[gi].items[ii].name = new;
        Ok(())
    }

    pub fn remove_item(&mut self, group: &str, name: &str) -> AdminResult<(usize, Item<K>)> {
        let (gi, ii) = self.require_item(group, name)?;
        debug!("🗑️  删除{} {} (分组 {})", K::LABEL, name, group);
        Ok((ii, self.groups[gi].items.remove(ii)))
    }

    /// 先从源位置取出，再插入目标位置。
    ///
    /// 同一分组内移动时，目标索引按取出之后的序列解释，因此元素恰好出现一次。
    /// 目标索引超出范围时追加到末尾。返回实际插入位置。
    pub fn move_item(&mut self, from_group: &str, to_group: &str, from_index: usize, to_index: usize) -> AdminResult<usize> {
        let from = self.require_group(from_group)?;
        let to = self.require_group(to_group)?;
        let len = self.groups[from].items.len();
        if from_index >= len {
            return Err(AdminError::IndexOutOfRange { index: from_index, len });
        }
        if from != to {
            let name = &self.groups[from].items[from_index].name;
            if self.groups[to].contains(name) {
                return Err(AdminError::DuplicateItem { group: to_group.to_string(), name: name.clone() });
            }
        }

        let item = self.groups[from].items.remove(from_index);
        let dest = &mut self.groups[to].items;
        let index = to_index.min(dest.len());
        dest.insert(index, item);
        debug!("↔️  移动{}: {}[{}] -> {}[{}]", K::LABEL, from_group, from_index, to_group, index);
        Ok(index)
    }

    pub fn move_group(&mut self, from_index: usize, to_index: usize) -> AdminResult<usize> {
        let len = self.groups.len();
        if from_index >= len {
            return Err(AdminError::IndexOutOfRange { index: from_index, len });
        }
        let group = self.groups.remove(from_index);
        let index = to_index.min(self.groups.len());
        self.groups.insert(index, group);
        debug!("↔️  移动分组: {} -> {}", from_index, index);
        Ok(index)
    }

    /// 执行操作并返回逆操作
    pub fn apply(&mut self, op: StoreOp<K>) -> AdminResult<StoreOp<K>> {
        let inverse = match op {
            StoreOp::AddGroup { name } => {
                self.add_group(&name)?;
                StoreOp::RemoveGroup { name: name.trim().to_string() }
            }
            StoreOp::InsertGroup { index, group } => {
                let name = group.name.clone();
                self.insert_group_at(index, group)?;
                StoreOp::RemoveGroup { name }
            }
            StoreOp::RenameGroup { old, new } => {
                self.rename_group(&old, &new)?;
                StoreOp::RenameGroup { old: new.trim().to_string(), new: old }
            }
            StoreOp::RemoveGroup { name } => {
                let (index, group) = self.remove_group(&name)?;
                StoreOp::InsertGroup { index, group }
            }
            StoreOp::AddItem { group, item } => {
                let name = item.name.trim().to_string();
                self.add_item(&group, &item.name, item.config)?;
                StoreOp::RemoveItem { group, name }
            }
            StoreOp::InsertItem { group, index, item } => {
                let name = item.name.clone();
                self.insert_item_at(&group, index, item)?;
                StoreOp::RemoveItem { group, name }
            }
            StoreOp::ReplaceItem { group, original, item } => {
                let name = item.name.trim().to_string();
                let previous = self.replace_item(&group, &original, &item.name, item.config)?;
                StoreOp::ReplaceItem { group, original: name, item: previous }
            }
            StoreOp::RemoveItem { group, name } => {
                let (index, item) = self.remove_item(&group, &name)?;
                StoreOp::InsertItem { group, index, item }
            }
            StoreOp::MoveItem { from_group, to_group, from_index, to_index } => {
                let placed = self.move_item(&from_group, &to_group, from_index, to_index)?;
                StoreOp::MoveItem {
                    from_group: to_group,
                    to_group: from_group,
                    from_index: placed,
                    to_index: from_index,
                }
            }
            StoreOp::MoveGroup { from_index, to_index } => {
                let placed = self.move_group(from_index, to_index)?;
                StoreOp::MoveGroup { from_index: placed, to_index: from_index }
            }
        };
        Ok(inverse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Bookmarks, Services};
    use proptest::prelude::*;

    fn sample() -> ListStore<Bookmarks> {
        let mut store = ListStore::new();
        store.add_group("Dev").unwrap();
        store.add_group("Media").unwrap();
        for name in ["a", "b", "c", "d"] {
            store.add_item("Dev", name, ItemConfig::new(format!("https://{}.example.com", name))).unwrap();
        }
        store.add_item("Media", "tv", ItemConfig::new("http://tv.lan.io")).unwrap();
        store
    }

    fn names(store: &ListStore<Bookmarks>, group: &str) -> Vec<String> {
        store.group(group).unwrap().items.iter().map(|i| i.name.clone()).collect()
    }

    #[test]
    fn test_add_then_remove_restores_serialized_form() {
        let mut store = sample();
        let before = store.to_json();
        store.add_item("Media", "new", ItemConfig::new("https://new.example.com")).unwrap();
        assert_ne!(store.to_json(), before);
        store.remove_item("Media", "new").unwrap();
        assert_eq!(store.to_json(), before);
    }

    #[test]
    fn test_duplicate_group_rejected_without_mutation() {
        let mut store = sample();
        let before = store.clone();
        assert!(matches!(store.add_group("Dev"), Err(AdminError::DuplicateGroup(_))));
        assert!(matches!(store.rename_group("Media", "Dev"), Err(AdminError::DuplicateGroup(_))));
        assert!(matches!(store.add_group("   "), Err(AdminError::EmptyField(_))));
        assert_eq!(store, before);
    }

    #[test]
    fn test_rename_group_keeps_position_and_items() {
        let mut store = sample();
        store.rename_group("Dev", "Development").unwrap();
        assert_eq!(store.groups()[0].name, "Development");
        assert_eq!(store.groups()[0].items.len(), 4);
        // 同名是空操作
        store.rename_group("Media", "Media").unwrap();
        assert!(matches!(store.rename_group("Nope", "X"), Err(AdminError::GroupNotFound(_))));
    }

    #[test]
    fn test_add_item_rules() {
        let mut store = sample();
        assert!(matches!(
            store.add_item("Dev", "a", ItemConfig::new("https://dup.example.com")),
            Err(AdminError::DuplicateItem { .. })
        ));
        assert!(matches!(
            store.add_item("Dev", "z", ItemConfig::new("not a url")),
            Err(AdminError::InvalidUrl(_))
        ));
        assert!(matches!(
            store.add_item("Nope", "z", ItemConfig::new("/z")),
            Err(AdminError::GroupNotFound(_))
        ));
        assert_eq!(store.item_count(), 5);
    }

    #[test]
    fn test_replace_and_rename_item() {
        let mut store = sample();
        let previous = store.replace_item("Dev", "b", "b", ItemConfig::new("/b2")).unwrap();
        assert_eq!(previous.config.href, "https://b.example.com");
        assert_eq!(store.item("Dev", "b").unwrap().config.href, "/b2");
        assert!(store.replace_item("Dev", "b", "c", ItemConfig::new("/c")).is_err());

        store.rename_item("Dev", "b", "beta").unwrap();
        assert_eq!(names(&store, "Dev"), vec!["a", "beta", "c", "d"]);
        assert!(matches!(store.rename_item("Dev", "beta", "a"), Err(AdminError::DuplicateItem { .. })));
    }

    #[test]
    fn test_move_within_group_keeps_single_occurrence() {
        let mut store = sample();
        store.move_item("Dev", "Dev", 0, 2).unwrap();
        assert_eq!(names(&store, "Dev"), vec!["b", "c", "a", "d"]);
        store.move_item("Dev", "Dev", 3, 0).unwrap();
        assert_eq!(names(&store, "Dev"), vec!["d", "b", "c", "a"]);
        // 超出范围的目标索引追加到末尾
        store.move_item("Dev", "Dev", 0, 99).unwrap();
        assert_eq!(names(&store, "Dev"), vec!["b", "c", "a", "d"]);
    }

    #[test]
    fn test_move_across_groups() {
        let mut store = sample();
        store.move_item("Dev", "Media", 1, 0).unwrap();
        assert_eq!(names(&store, "Dev"), vec!["a", "c", "d"]);
        assert_eq!(names(&store, "Media"), vec!["b", "tv"]);
        assert!(matches!(store.move_item("Dev", "Media", 10, 0), Err(AdminError::IndexOutOfRange { .. })));
    }

    #[test]
    fn test_move_across_groups_rejects_name_clash() {
        let mut store = sample();
        store.add_item("Media", "a", ItemConfig::new("/a")).unwrap();
        let before = store.clone();
        assert!(store.move_item("Dev", "Media", 0, 0).is_err());
        assert_eq!(store, before);
    }

    #[test]
    fn test_move_group() {
        let mut store = sample();
        store.add_group("Tools").unwrap();
        store.move_group(2, 0).unwrap();
        let order: Vec<_> = store.groups().iter().map(|g| g.name.as_str()).collect();
        assert_eq!(order, vec!["Tools", "Dev", "Media"]);
    }

    #[test]
    fn test_inverse_ops_restore_store() {
        let ops = vec![
            StoreOp::AddGroup { name: "New".into() },
            StoreOp::RenameGroup { old: "Dev".into(), new: "Code".into() },
            StoreOp::RemoveGroup { name: "Media".into() },
            StoreOp::AddItem { group: "Dev".into(), item: Item::new("e", ItemConfig::new("/e")) },
            StoreOp::ReplaceItem { group: "Dev".into(), original: "a".into(), item: Item::new("alpha", ItemConfig::new("/alpha")) },
            StoreOp::RemoveItem { group: "Dev".into(), name: "c".into() },
            StoreOp::MoveItem { from_group: "Dev".into(), to_group: "Media".into(), from_index: 0, to_index: 5 },
            StoreOp::MoveGroup { from_index: 1, to_index: 0 },
        ];
        for op in ops {
            let mut store = sample();
            let before = store.clone();
            let inverse = store.apply(op.clone()).unwrap();
            assert_ne!(store, before, "{:?} should change the store", op);
            store.apply(inverse).unwrap();
            assert_eq!(store, before, "inverse of {:?} should restore", op);
        }
    }

    #[test]
    fn test_services_store_json() {
        let mut store = ListStore::<Services>::new();
        store.add_group("Infra").unwrap();
        store.add_item("Infra", "Proxmox", ItemConfig::new("https://pve.example.com:8006")).unwrap();
        let text = store.to_json_pretty().unwrap();
        let parsed = ListStore::<Services>::from_json(&text).unwrap();
        assert_eq!(parsed, store);
    }

    #[test]
    fn test_from_json_rejects_duplicate_names() {
        let dup_groups = r#"[{"G": []}, {"G": []}]"#;
        assert!(matches!(
            ListStore::<Bookmarks>::from_json(dup_groups),
            Err(AdminError::DuplicateGroup(ref g)) if g == "G"
        ));
        let dup_items = r#"[{"G": [{"x": [{"href": "/a"}]}, {"x": [{"href": "/b"}]}]}]"#;
        assert!(matches!(
            ListStore::<Bookmarks>::from_json(dup_items),
            Err(AdminError::DuplicateItem { ref name, .. }) if name == "x"
        ));
        // 不同分组里同名条目是允许的
        let same_name = r#"[{"A": [{"x": [{"href": "/a"}]}]}, {"B": [{"x": [{"href": "/b"}]}]}]"#;
        assert_eq!(ListStore::<Bookmarks>::from_json(same_name).unwrap().item_count(), 2);
    }

    proptest! {
        #[test]
        fn prop_move_and_back_restores_order(len in 1usize..12, i in 0usize..12, j in 0usize..12) {
            let i = i % len;
            let j = j % len;
            let mut store = ListStore::<Bookmarks>::new();
            store.add_group("G").unwrap();
            for n in 0..len {
                store.add_item("G", &format!("item{}", n), ItemConfig::new(format!("/p{}", n))).unwrap();
            }
            let before = store.clone();
            store.move_item("G", "G", i, j).unwrap();
            prop_assert_eq!(store.item_count(), len);
            store.move_item("G", "G", j, i).unwrap();
            prop_assert_eq!(store, before);
        }

        #[test]
        fn prop_cross_group_move_preserves_total(len_a in 1usize..8, len_b in 0usize..8, from in 0usize..8, to in 0usize..10) {
            let from = from % len_a;
            let mut store = ListStore::<Bookmarks>::new();
            store.add_group("A").unwrap();
            store.add_group("B").unwrap();
            for n in 0..len_a {
                store.add_item("A", &format!("a{}", n), ItemConfig::new("/a")).unwrap();
            }
            for n in 0..len_b {
                store.add_item("B", &format!("b{}", n), ItemConfig::new("/b")).unwrap();
            }
            let moved = store.group("A").unwrap().items[from].name.clone();
            store.move_item("A", "B", from, to).unwrap();
            prop_assert_eq!(store.group("A").unwrap().items.len(), len_a - 1);
            prop_assert_eq!(store.group("B").unwrap().items.len(), len_b + 1);
            prop_assert!(store.group("B").unwrap().contains(&moved));
            prop_assert!(!store.group("A").unwrap().contains(&moved));
        }
    }
}
