//! 列表编辑器
//!
//! 一个页面对应一个 `ListEditor`：持有存储、网关、视图、提示和当前编辑指针。
//! 所有修改都在 `&mut self` 上同步完成，保存是等待中的 future。
//!
//! 保存分两段：`start_save` 快照整份列表并领取编号，`finish_save` 等待结果并落地。
//! 乐观修改在失败时执行预先算好的逆操作回滚。过期的失败先挂起逆操作：
//! 之后的保存成功时丢弃（服务端已有这次修改），最新的保存也失败时一并回滚。

use futures::future::BoxFuture;
use futures::FutureExt;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::bootstrap;
use crate::error::{AdminError, AdminResult, ErrorCategory};
use crate::forms::ItemForm;
use crate::gateway::{save_list, PersistenceGateway, SaveMode, SaveOutcome, SaveSequencer, SaveTicket};
use crate::model::{parse_groups, Item, ItemKind};
use crate::notify::Notifier;
use crate::quick_add;
use crate::render::View;
use crate::reorder::{GroupDrop, ItemDrop};
use crate::store::{ListStore, StoreOp};
use crate::validation::validate_list;

/// 当前打开的编辑表单
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditTarget {
    AddGroup,
    EditGroup(String),
    AddItem(String),
    EditItem { group: String, name: String },
}

/// 已发出、尚未落地的保存
pub struct PendingSave {
    ticket: SaveTicket,
    request: BoxFuture<'static, AdminResult<()>>,
}

pub struct ListEditor<K, G, V, N>
where
    K: ItemKind,
    G: PersistenceGateway + 'static,
    V: View<K>,
    N: Notifier,
{
    store: ListStore<K>,
    gateway: Arc<G>,
    view: V,
    notifier: N,
    sequencer: SaveSequencer,
    editing: Option<EditTarget>,
    renaming: Option<String>,
    /// 过期失败挂起的逆操作，按编号递增
    deferred: Vec<(SaveTicket, StoreOp<K>)>,
}

impl<K, G, V, N> ListEditor<K, G, V, N>
where
    K: ItemKind,
    G: PersistenceGateway + 'static,
    V: View<K>,
    N: Notifier,
{
    pub fn new(store: ListStore<K>, gateway: Arc<G>, mut view: V, notifier: N) -> Self {
        view.reload(&store);
        Self {
            store,
            gateway,
            view,
            notifier,
            sequencer: SaveSequencer::default(),
            editing: None,
            renaming: None,
            deferred: Vec::new(),
        }
    }

    pub fn store(&self) -> &ListStore<K> {
        &self.store
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    pub fn editing(&self) -> Option<&EditTarget> {
        self.editing.as_ref()
    }

    pub fn renaming(&self) -> Option<&str> {
        self.renaming.as_deref()
    }

    /// 校验失败统一转成错误提示
    fn reject<T>(&mut self, err: AdminError) -> AdminResult<T> {
        self.notifier.error(&err.to_string());
        Err(err)
    }

    fn require_group(&mut self, group: &str) -> AdminResult<()> {
        if self.store.group(group).is_some() {
            Ok(())
        } else {
            self.reject(AdminError::GroupNotFound(group.to_string()))
        }
    }

    // ---- 保存 ----

    /// 快照当前列表并领取编号
    pub fn start_save(&self) -> PendingSave {
        let ticket = self.sequencer.issue();
        let gateway = Arc::clone(&self.gateway);
        let snapshot = self.store.clone();
        debug!("📤 保存{} #{:?}", K::LABEL, ticket);
        let request = async move { save_list(gateway.as_ref(), &snapshot).await }.boxed();
        PendingSave { ticket, request }
    }

    /// 等待保存结果并更新界面
    ///
    /// 过期的响应不重绘、不提示成功。失败总是提示错误；
    /// 最新的失败立即执行 `rollback`，过期的失败交给之后的保存结果决定。
    pub async fn finish_save(
        &mut self,
        pending: PendingSave,
        mode: SaveMode,
        rollback: Option<StoreOp<K>>,
        success: Option<String>,
    ) -> SaveOutcome {
        let PendingSave { ticket, request } = pending;
        let result = request.await;
        let latest = self.sequencer.is_latest(ticket);

        match result {
            Ok(()) => {
                self.sequencer.record_success(ticket);
                // 这次的快照已包含更早的修改
                self.deferred.retain(|(pending, _)| *pending > ticket);
                if !latest {
                    debug!("⏭️  保存 #{:?} 已被后续保存取代", ticket);
                    return SaveOutcome::Superseded { succeeded: true };
                }
                if let Some(message) = success {
                    self.notifier.success(&message);
                }
                if mode == SaveMode::Reload {
                    self.view.reload(&self.store);
                }
                SaveOutcome::Saved
            }
            Err(err) => {
                match err.category() {
                    ErrorCategory::Server => warn!("⚠️  服务端拒绝保存{}: {}", K::LABEL, err),
                    _ => warn!("⚠️  保存{}请求失败: {}", K::LABEL, err),
                }
                let message = format!("保存失败: {}", err);
                self.notifier.error(&message);

                if !latest {
                    match rollback {
                        Some(_) if self.sequencer.is_covered(ticket) => {
                            debug!("⏭️  保存 #{:?} 的修改已由后续保存提交，不回滚", ticket);
                        }
                        Some(inverse) => self.deferred.push((ticket, inverse)),
                        None => {}
                    }
                    return SaveOutcome::Superseded { succeeded: false };
                }

                if let Some(inverse) = rollback {
                    self.roll_back(inverse);
                }
                // 没有任何后续保存提交过的过期修改，从新到旧撤销
                for (_, inverse) in std::mem::take(&mut self.deferred).into_iter().rev() {
                    self.roll_back(inverse);
                }
                if mode == SaveMode::Reload {
                    self.resync().await;
                }
                SaveOutcome::Failed(message)
            }
        }
    }

    async fn commit(&mut self, mode: SaveMode, rollback: Option<StoreOp<K>>, success: Option<String>) -> SaveOutcome {
        let pending = self.start_save();
        self.finish_save(pending, mode, rollback, success).await
    }

    fn roll_back(&mut self, inverse: StoreOp<K>) {
        let removed = match &inverse {
            StoreOp::RemoveItem { group, name } => Some((group.clone(), name.clone())),
            _ => None,
        };
        match self.store.apply(inverse) {
            Ok(_) => match removed {
                Some((group, name)) => {
                    info!("↩️  已撤销{} {} (分组 {})", K::LABEL, name, group);
                    self.view.remove_item(&group, &name);
                }
                None => self.view.reload(&self.store),
            },
            Err(err) => {
                warn!("⚠️  回滚失败: {}", err);
                self.view.reload(&self.store);
            }
        }
    }

    /// 整页保存失败后，按服务端的副本重新同步
    async fn resync(&mut self) {
        match self.gateway.fetch_page(K::ENDPOINT).await {
            Ok(html) => match bootstrap::try_load_list::<K>(&html) {
                Some(fresh) => {
                    info!("🔄 已从服务端重新加载{}", K::LABEL);
                    self.store = fresh;
                }
                None => warn!("⚠️  服务端页面缺少{}数据，保留本地修改", K::LABEL),
            },
            Err(err) => warn!("⚠️  无法从服务端重新加载{}: {}", K::LABEL, err),
        }
        self.view.reload(&self.store);
    }

    // ---- 分组 ----

    pub fn open_add_group(&mut self) {
        self.editing = Some(EditTarget::AddGroup);
    }

    pub fn open_edit_group(&mut self, group: &str) -> AdminResult<()> {
        self.require_group(group)?;
        self.editing = Some(EditTarget::EditGroup(group.to_string()));
        Ok(())
    }

    /// 分组表单提交；没有打开的表单时按新增处理
    pub async fn submit_group_form(&mut self, name: &str) -> AdminResult<SaveOutcome> {
        let (op, message) = match self.editing.clone() {
            Some(EditTarget::EditGroup(old)) => (StoreOp::RenameGroup { old, new: name.to_string() }, "分组已更新"),
            _ => (StoreOp::AddGroup { name: name.to_string() }, "分组已添加"),
        };
        if let Err(err) = self.store.apply(op) {
            return self.reject(err);
        }
        self.editing = None;
        Ok(self.commit(SaveMode::Reload, None, Some(message.to_string())).await)
    }

    pub fn begin_inline_rename(&mut self, group: &str) -> AdminResult<()> {
        self.require_group(group)?;
        self.renaming = Some(group.to_string());
        Ok(())
    }

    pub fn cancel_inline_rename(&mut self) {
        self.renaming = None;
    }

    /// 结束行内重命名
    ///
    /// 空名称或重名时报错并保持编辑状态；名称未变时直接结束，不保存。
    pub async fn finish_inline_rename(&mut self, new_name: &str) -> AdminResult<Option<SaveOutcome>> {
        let Some(old) = self.renaming.clone() else {
            return Ok(None);
        };
        let new_name = new_name.trim();
        if new_name == old {
            self.renaming = None;
            return Ok(None);
        }
        if let Err(err) = self.store.rename_group(&old, new_name) {
            return self.reject(err);
        }
        self.renaming = None;
        self.view.rename_group(&old, new_name);
        let message = format!("分组名称已更改为\"{}\"", new_name);
        Ok(Some(self.commit(SaveMode::Reload, None, Some(message)).await))
    }

    pub async fn delete_group(&mut self, group: &str) -> AdminResult<SaveOutcome> {
        if let Err(err) = self.store.remove_group(group) {
            return self.reject(err);
        }
        Ok(self.commit(SaveMode::Reload, None, Some(format!("分组 \"{}\" 已删除", group))).await)
    }

    // ---- 条目 ----

    pub fn open_add_item(&mut self, group: &str) -> AdminResult<()> {
        self.require_group(group)?;
        self.editing = Some(EditTarget::AddItem(group.to_string()));
        Ok(())
    }

    /// 打开编辑表单，返回用原条目填好的表单
    pub fn open_edit_item<F: ItemForm<K>>(&mut self, group: &str, name: &str) -> AdminResult<F> {
        let Some(form) = self.store.item(group, name).map(F::from_item) else {
            return self.reject(AdminError::ItemNotFound {
                group: group.to_string(),
                name: name.to_string(),
            });
        };
        self.editing = Some(EditTarget::EditItem {
            group: group.to_string(),
            name: name.to_string(),
        });
        Ok(form)
    }

    pub async fn submit_item_form<F: ItemForm<K>>(&mut self, form: F) -> AdminResult<SaveOutcome> {
        let name = form.name();
        let result = match self.editing.clone() {
            Some(EditTarget::AddItem(group)) => form
                .into_config(None)
                .and_then(|config| self.store.add_item(&group, &name, config)),
            Some(EditTarget::EditItem { group, name: original }) => {
                let previous = self.store.item(&group, &original).map(|item| item.config.clone());
                form.into_config(previous.as_ref())
                    .and_then(|config| self.store.replace_item(&group, &original, &name, config))
                    .map(|_| ())
            }
            _ => Err(AdminError::EmptyField("分组")),
        };
        if let Err(err) = result {
            return self.reject(err);
        }
        self.editing = None;
        let message = format!("{} \"{}\" 已保存", K::LABEL, name);
        Ok(self.commit(SaveMode::Reload, None, Some(message)).await)
    }

    /// 只改名称，保留配置和位置
    pub async fn rename_item(&mut self, group: &str, old: &str, new: &str) -> AdminResult<SaveOutcome> {
        let new = new.trim();
        if let Err(err) = self.store.rename_item(group, old, new) {
            return self.reject(err);
        }
        let message = format!("{} \"{}\" 已重命名为 \"{}\"", K::LABEL, old, new);
        Ok(self.commit(SaveMode::Reload, None, Some(message)).await)
    }

    pub async fn delete_item(&mut self, group: &str, name: &str) -> AdminResult<SaveOutcome> {
        if let Err(err) = self.store.remove_item(group, name) {
            return self.reject(err);
        }
        Ok(self.commit(SaveMode::Reload, None, Some(format!("{} \"{}\" 已删除", K::LABEL, name))).await)
    }

    /// 多选删除：不存在的条目跳过，至少删掉一个才保存
    pub async fn delete_selected(&mut self, selected: &[(String, String)]) -> AdminResult<SaveOutcome> {
        if selected.is_empty() {
            return self.reject(AdminError::EmptyField("选中的条目"));
        }
        let mut removed = 0;
        for (group, name) in selected {
            match self.store.remove_item(group, name) {
                Ok(_) => removed += 1,
                Err(err) => warn!("⚠️  跳过: {}", err),
            }
        }
        if removed == 0 {
            let (group, name) = &selected[0];
            return self.reject(AdminError::ItemNotFound {
                group: group.clone(),
                name: name.clone(),
            });
        }
        let message = format!("已删除 {} 个{}", removed, K::LABEL);
        Ok(self.commit(SaveMode::Reload, None, Some(message)).await)
    }

    /// 快速添加，乐观更新，失败时回滚
    ///
    /// 返回添加的条目名称和保存结果。
    pub async fn quick_add(&mut self, group: &str, input: &str) -> AdminResult<(String, SaveOutcome)> {
        let mut entry = match quick_add::prepare::<K>(input) {
            Ok(entry) => entry,
            Err(err) => return self.reject(err),
        };
        self.require_group(group)?;
        if let Some(target) = self.store.group(group) {
            entry.name = quick_add::unique_name(&entry.name, |candidate| target.contains(candidate));
        }
        let name = entry.name.clone();
        let item: Item<K> = entry.into_item();

        let inverse = match self.store.apply(StoreOp::AddItem {
            group: group.to_string(),
            item: item.clone(),
        }) {
            Ok(inverse) => inverse,
            Err(err) => return self.reject(err),
        };
        self.view.paint_item(group, &item);

        let message = format!("已添加{} \"{}\" 到分组 \"{}\"", K::LABEL, name, group);
        let outcome = self.commit(SaveMode::Optimistic, Some(inverse), Some(message)).await;
        Ok((name, outcome))
    }

    // ---- 拖拽 ----

    /// 分组拖动结束；无效或原地放下返回 `None`，不保存
    pub async fn on_group_drop(&mut self, drop: GroupDrop) -> Option<SaveOutcome> {
        let op = drop.to_op(&self.store)?;
        self.apply_drop(op).await
    }

    /// 条目拖动结束，跨分组时两个分组都更新，只保存一次
    pub async fn on_item_drop(&mut self, drop: ItemDrop) -> Option<SaveOutcome> {
        let op = drop.to_op(&self.store)?;
        self.apply_drop(op).await
    }

    async fn apply_drop(&mut self, op: StoreOp<K>) -> Option<SaveOutcome> {
        if let Err(err) = self.store.apply(op) {
            // 跨分组重名
            self.notifier.error(&err.to_string());
            self.view.reload(&self.store);
            return None;
        }
        Some(self.commit(SaveMode::Reload, None, None).await)
    }

    // ---- 导入导出 ----

    /// 整份替换并保存；JSON 必须是分组列表，且通过整体校验
    pub async fn import_json(&mut self, text: &str) -> AdminResult<SaveOutcome> {
        let groups = match serde_json::from_str::<serde_json::Value>(text)
            .map_err(AdminError::from)
            .and_then(|value| {
                if value.is_array() {
                    parse_groups::<K>(value).map_err(AdminError::from)
                } else {
                    Err(AdminError::Decode("导入数据格式错误".to_string()))
                }
            }) {
            Ok(groups) => groups,
            Err(err) => return self.reject(err),
        };
        let candidate = ListStore::from_groups(groups);
        if let Err(err) = validate_list(&candidate) {
            return self.reject(err);
        }
        info!("📥 导入{}: {} 个分组, {} 个条目", K::LABEL, candidate.group_count(), candidate.item_count());
        self.store = candidate;
        Ok(self.commit(SaveMode::Reload, None, Some(format!("{}导入成功", K::LABEL))).await)
    }

    pub fn export_json(&self) -> AdminResult<String> {
        self.store.to_json_pretty()
    }
}
