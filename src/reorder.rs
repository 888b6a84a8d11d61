//! 拖拽排序事件
//!
//! 拖拽库在结束时给出源/目标容器的 `data-group` 属性和前后索引，
//! 这里把它们翻译成存储操作。未知分组和原地放下都不产生操作。

use tracing::warn;

use crate::model::ItemKind;
use crate::store::{ListStore, StoreOp};

/// 分组整体拖动
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupDrop {
    pub old_index: usize,
    pub new_index: usize,
}

/// 条目拖动，可跨分组
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemDrop {
    pub from_group: String,
    pub to_group: String,
    pub old_index: usize,
    pub new_index: usize,
}

impl GroupDrop {
    pub fn to_op<K: ItemKind>(&self, store: &ListStore<K>) -> Option<StoreOp<K>> {
        if self.old_index == self.new_index {
            return None;
        }
        if self.old_index >= store.group_count() {
            warn!("⚠️  拖动的分组索引无效: {}", self.old_index);
            return None;
        }
        Some(StoreOp::MoveGroup {
            from_index: self.old_index,
            to_index: self.new_index,
        })
    }
}

impl ItemDrop {
    pub fn is_cross_group(&self) -> bool {
        self.from_group != self.to_group
    }

    pub fn to_op<K: ItemKind>(&self, store: &ListStore<K>) -> Option<StoreOp<K>> {
        if !self.is_cross_group() && self.old_index == self.new_index {
            return None;
        }
        let Some(source) = store.group(&self.from_group) else {
            warn!("⚠️  拖动来源分组不存在: {}", self.from_group);
            return None;
        };
        if store.group(&self.to_group).is_none() {
            warn!("⚠️  拖动目标分组不存在: {}", self.to_group);
            return None;
        }
        if self.old_index >= source.items.len() {
            warn!("⚠️  拖动的{}索引无效: {}", K::LABEL, self.old_index);
            return None;
        }
        Some(StoreOp::MoveItem {
            from_group: self.from_group.clone(),
            to_group: self.to_group.clone(),
            from_index: self.old_index,
            to_index: self.new_index,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Bookmarks, ItemConfig};

    fn store() -> ListStore<Bookmarks> {
        let mut store = ListStore::new();
        store.add_group("A").unwrap();
        store.add_group("B").unwrap();
        store.add_item("A", "x", ItemConfig::new("/x")).unwrap();
        store
    }

    fn item_drop(from: &str, to: &str, old_index: usize, new_index: usize) -> ItemDrop {
        ItemDrop {
            from_group: from.into(),
            to_group: to.into(),
            old_index,
            new_index,
        }
    }

    #[test]
    fn test_noop_and_unknown_drops() {
        let store = store();
        assert!(item_drop("A", "A", 0, 0).to_op(&store).is_none());
        assert!(item_drop("Z", "A", 0, 0).to_op(&store).is_none());
        assert!(item_drop("A", "Z", 0, 0).to_op(&store).is_none());
        assert!(item_drop("A", "B", 5, 0).to_op(&store).is_none());
        assert!(GroupDrop { old_index: 1, new_index: 1 }.to_op(&store).is_none());
        assert!(GroupDrop { old_index: 9, new_index: 0 }.to_op(&store).is_none());
    }

    #[test]
    fn test_cross_group_drop_at_same_index_moves() {
        let store = store();
        let op = item_drop("A", "B", 0, 0).to_op(&store).unwrap();
        assert!(matches!(op, StoreOp::MoveItem { ref to_group, .. } if to_group == "B"));
        let op = GroupDrop { old_index: 1, new_index: 0 }.to_op(&store).unwrap();
        assert_eq!(op, StoreOp::MoveGroup { from_index: 1, to_index: 0 });
    }
}
