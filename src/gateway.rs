//! 持久化网关
//!
//! 每次保存都提交整份列表（不是增量），由后端整体覆盖 YAML 文件。
//! 面板假定单用户单会话编辑，因此没有冲突处理；
//! 并发保存通过 `SaveSequencer` 编号，过期的响应不会再驱动界面。

use futures::future::BoxFuture;
use futures::FutureExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info};

use crate::config::ClientConfig;
use crate::error::{AdminError, AdminResult};
use crate::model::ItemKind;
use crate::store::ListStore;

/// 后端统一的 `{status, message}` 响应
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveResponse {
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
}

impl SaveResponse {
    pub fn success() -> Self {
        Self {
            status: "success".to_string(),
            message: None,
        }
    }

    #[cfg(test)]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            message: Some(message.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == "success"
    }

    /// 非成功响应转成错误，保留服务端给出的消息
    pub fn into_result(self) -> AdminResult<()> {
        if self.is_success() {
            Ok(())
        } else {
            Err(AdminError::Server(
                self.message.unwrap_or_else(|| format!("status: {}", self.status)),
            ))
        }
    }
}

/// 保存成功之后界面怎么做
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveMode {
    /// 成功后按权威数据整页重绘；失败后从服务端重新同步
    Reload,
    /// 成功后保持乐观更新的界面；失败由调用方回滚
    Optimistic,
}

/// 一次保存的最终结果
#[derive(Debug, Clone, PartialEq)]
pub enum SaveOutcome {
    Saved,
    /// 传输失败或服务端拒绝，附带展示给用户的消息
    Failed(String),
    /// 在它之后又发起了新的保存，这个响应不再驱动界面
    Superseded { succeeded: bool },
}

impl SaveOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, SaveOutcome::Failed(_) | SaveOutcome::Superseded { succeeded: false })
    }
}

/// 保存请求编号
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SaveTicket(u64);

#[derive(Debug, Default)]
pub struct SaveSequencer {
    latest: AtomicU64,
    /// 已成功落地的最大编号，0 表示还没有
    saved: AtomicU64,
}

impl SaveSequencer {
    pub fn issue(&self) -> SaveTicket {
        SaveTicket(self.latest.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn is_latest(&self, ticket: SaveTicket) -> bool {
        self.latest.load(Ordering::SeqCst) == ticket.0
    }

    pub fn record_success(&self, ticket: SaveTicket) {
        self.saved.fetch_max(ticket.0, Ordering::SeqCst);
    }

    /// 之后发出的某次保存已经成功，它的快照包含了这次的修改
    pub fn is_covered(&self, ticket: SaveTicket) -> bool {
        self.saved.load(Ordering::SeqCst) > ticket.0
    }
}

/// 与后端之间的保存/重新加载边界
pub trait PersistenceGateway: Send + Sync {
    /// 提交整份 JSON 文档
    fn save<'a>(&'a self, endpoint: &'a str, body: Value) -> BoxFuture<'a, AdminResult<SaveResponse>>;

    /// 取回服务端渲染的页面（内嵌初始数据）
    fn fetch_page<'a>(&'a self, path: &'a str) -> BoxFuture<'a, AdminResult<String>>;
}

/// 保存一份列表，非成功状态转为 `AdminError::Server`
pub async fn save_list<K, G>(gateway: &G, store: &ListStore<K>) -> AdminResult<()>
where
    K: ItemKind,
    G: PersistenceGateway + ?Sized,
{
    debug!("💾 保存{}: {} 个分组, {} 个条目", K::LABEL, store.group_count(), store.item_count());
    gateway.save(K::ENDPOINT, store.to_json()).await?.into_result()
}

/// 基于 reqwest 的网关
pub struct HttpGateway {
    config: ClientConfig,
    client: Client,
}

impl HttpGateway {
    pub fn new(config: ClientConfig) -> AdminResult<Self> {
        let client = config.build_client()?;
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    async fn post_json(&self, endpoint: &str, body: Value) -> AdminResult<SaveResponse> {
        let url = self.config.endpoint(endpoint)?;
        debug!("📤 POST {}", url);
        let response = self.client.post(url).json(&body).send().await?;
        let status = response.status();
        let text = response.text().await?;
        match serde_json::from_str::<SaveResponse>(&text) {
            Ok(parsed) => Ok(parsed),
            Err(_) if !status.is_success() => {
                Err(AdminError::Transport(format!("HTTP {} - {}", status, text.trim())))
            }
            Err(e) => Err(AdminError::Decode(e.to_string())),
        }
    }

    async fn get_text(&self, path: &str) -> AdminResult<String> {
        let url = self.config.endpoint(path)?;
        debug!("📥 GET {}", url);
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AdminError::Transport(format!("HTTP {}", status)));
        }
        Ok(response.text().await?)
    }
}

impl PersistenceGateway for HttpGateway {
    fn save<'a>(&'a self, endpoint: &'a str, body: Value) -> BoxFuture<'a, AdminResult<SaveResponse>> {
        self.post_json(endpoint, body).boxed()
    }

    fn fetch_page<'a>(&'a self, path: &'a str) -> BoxFuture<'a, AdminResult<String>> {
        self.get_text(path).boxed()
    }
}

/// `--dry-run`：只记录将要提交的内容，不发请求
#[derive(Debug, Default)]
pub struct DryRunGateway;

impl PersistenceGateway for DryRunGateway {
    fn save<'a>(&'a self, endpoint: &'a str, body: Value) -> BoxFuture<'a, AdminResult<SaveResponse>> {
        async move {
            info!("🔍 [dry-run] 跳过提交 {}", endpoint);
            debug!("{}", serde_json::to_string_pretty(&body)?);
            Ok(SaveResponse::success())
        }
        .boxed()
    }

    fn fetch_page<'a>(&'a self, path: &'a str) -> BoxFuture<'a, AdminResult<String>> {
        async move {
            Err(AdminError::Transport(format!("dry-run 模式下无法加载 {}", path)))
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Bookmarks, ItemConfig};
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    async fn spawn_backend(router: Router) -> ClientConfig {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        ClientConfig::default().with_overrides(Some(format!("http://{}", addr)), Some(5))
    }

    fn sample_store() -> ListStore<Bookmarks> {
        let mut store = ListStore::new();
        store.add_group("Dev").unwrap();
        store.add_item("Dev", "GitHub", ItemConfig::new("https://github.com")).unwrap();
        store
    }

    #[test]
    fn test_sequencer_tracks_latest() {
        let seq = SaveSequencer::default();
        let first = seq.issue();
        assert!(seq.is_latest(first));
        let second = seq.issue();
        assert!(!seq.is_latest(first));
        assert!(seq.is_latest(second));
        assert!(first < second);

        assert!(!seq.is_covered(first));
        seq.record_success(second);
        assert!(seq.is_covered(first));
        assert!(!seq.is_covered(second));
        // 较早的成功不会把记录往回拨
        seq.record_success(first);
        assert!(seq.is_covered(first));
    }

    #[test]
    fn test_response_into_result() {
        assert!(SaveResponse::success().into_result().is_ok());
        let err = SaveResponse::error("书签验证失败").into_result().unwrap_err();
        assert_eq!(err.to_string(), "书签验证失败");
        let bare = SaveResponse { status: "error".into(), message: None };
        assert!(matches!(bare.into_result(), Err(AdminError::Server(_))));
    }

    #[tokio::test]
    async fn test_http_gateway_posts_full_document() {
        let seen: Arc<Mutex<Vec<Value>>> = Arc::new(Mutex::new(Vec::new()));
        let captured = seen.clone();
        let router = Router::new().route(
            "/bookmarks",
            post(move |Json(body): Json<Value>| {
                let captured = captured.clone();
                async move {
                    captured.lock().unwrap().push(body);
                    Json(json!({ "status": "success", "message": "书签保存成功！" }))
                }
            }),
        );
        let config = spawn_backend(router).await;
        let gateway = HttpGateway::new(config).unwrap();
        let store = sample_store();

        save_list(&gateway, &store).await.unwrap();

        let bodies = seen.lock().unwrap();
        assert_eq!(bodies.len(), 1);
        assert_eq!(bodies[0], json!([{ "Dev": [{ "GitHub": [{ "href": "https://github.com" }] }] }]));
    }

    #[tokio::test]
    async fn test_http_gateway_surfaces_server_message() {
        let router = Router::new().route(
            "/bookmarks",
            post(|| async { Json(json!({ "status": "error", "message": "书签验证失败：href" })) }),
        );
        let gateway = HttpGateway::new(spawn_backend(router).await).unwrap();
        let err = save_list(&gateway, &sample_store()).await.unwrap_err();
        assert!(matches!(err, AdminError::Server(ref m) if m == "书签验证失败：href"));
    }

    #[tokio::test]
    async fn test_http_gateway_non_json_error_is_transport() {
        let router = Router::new().route(
            "/bookmarks",
            post(|| async { (axum::http::StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
        );
        let gateway = HttpGateway::new(spawn_backend(router).await).unwrap();
        let err = save_list(&gateway, &sample_store()).await.unwrap_err();
        assert!(matches!(err, AdminError::Transport(_)));
    }

    #[tokio::test]
    async fn test_fetch_page() {
        let router = Router::new().route("/bookmarks", get(|| async { "<html>ok</html>" }));
        let gateway = HttpGateway::new(spawn_backend(router).await).unwrap();
        assert_eq!(gateway.fetch_page("/bookmarks").await.unwrap(), "<html>ok</html>");
        assert!(gateway.fetch_page("/missing").await.is_err());
    }

    #[tokio::test]
    async fn test_dry_run_gateway() {
        let gateway = DryRunGateway;
        assert!(save_list(&gateway, &sample_store()).await.is_ok());
        assert!(gateway.fetch_page("/bookmarks").await.is_err());
    }
}
