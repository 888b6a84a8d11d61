//! YAML 配置文件与备份接口
//!
//! 后端管理五个 YAML 文件，配置页和 YAML 编辑器通过这些接口查看、校验、预览、保存、备份，
//! 也包括配置页上的整体操作（全部校验、完整性检查、导出导入）和概览页的统计刷新。

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Local, NaiveDate};
use clap::ValueEnum;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method, Response};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::stats::{ConfigStatus, Stats};
use crate::validation::validate_backup_name;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ConfigType {
    Settings,
    Bookmarks,
    Services,
    Widgets,
    Docker,
}

impl ConfigType {
    pub const ALL: [ConfigType; 5] = [
        ConfigType::Settings,
        ConfigType::Bookmarks,
        ConfigType::Services,
        ConfigType::Widgets,
        ConfigType::Docker,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigType::Settings => "settings",
            ConfigType::Bookmarks => "bookmarks",
            ConfigType::Services => "services",
            ConfigType::Widgets => "widgets",
            ConfigType::Docker => "docker",
        }
    }

    pub fn file_name(&self) -> String {
        format!("{}.yaml", self.as_str())
    }
}

impl fmt::Display for ConfigType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 后端响应外层：`{status, message}`，旧接口是 `{success, error}`
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(flatten)]
    payload: Map<String, Value>,
}

impl Envelope {
    fn is_success(&self) -> bool {
        self.status.as_deref() == Some("success") || self.success == Some(true)
    }

    fn failure_message(&self) -> String {
        self.message
            .clone()
            .or_else(|| self.error.clone())
            .unwrap_or_else(|| "未知错误".to_string())
    }

    fn field<T: serde::de::DeserializeOwned + Default>(&self, key: &str) -> Result<T> {
        match self.payload.get(key) {
            Some(value) if !value.is_null() => {
                serde_json::from_value(value.clone()).with_context(|| format!("响应字段 {} 格式错误", key))
            }
            _ => Ok(T::default()),
        }
    }
}

/// 读取到的配置文件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigContent {
    pub content: String,
    pub exists: bool,
}

/// YAML 校验结果
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct YamlValidation {
    pub valid: bool,
    pub message: Option<String>,
}

/// 完整性检查发现的问题
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct IntegrityIssue {
    pub config: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupInfo {
    pub name: String,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub size: Option<Value>,
    #[serde(default)]
    pub timestamp: Option<f64>,
}

/// 默认备份名：`backup_2024-05-01T09-30`
pub fn default_backup_name(now: DateTime<Local>) -> String {
    format!("backup_{}", now.format("%Y-%m-%dT%H-%M"))
}

/// 整体导出的归档名：`homepage-configs-2024-05-01.tar.gz`
pub fn export_file_name(date: NaiveDate) -> String {
    format!("homepage-configs-{}.tar.gz", date.format("%Y-%m-%d"))
}

pub struct ConfigClient {
    config: ClientConfig,
    client: Client,
}

impl ConfigClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let client = config.build_client()?;
        Ok(Self { config, client })
    }

    async fn send(&self, method: Method, path: &str, body: Option<Value>) -> Result<Response> {
        let url = self.config.endpoint(path)?;
        debug!("🌐 {} {}", method, url);
        let mut request = self.client.request(method, url);
        if let Some(body) = body {
            request = request.json(&body);
        }
        request
            .send()
            .await
            .with_context(|| format!("请求 {} 失败", path))
    }

    /// 发送请求并解析统一响应，非成功状态转为错误
    async fn call(&self, method: Method, path: &str, body: Option<Value>) -> Result<Envelope> {
        let response = self.send(method, path, body).await?;
        Self::envelope(response).await
    }

    async fn envelope(response: Response) -> Result<Envelope> {
        let status = response.status();
        let text = response.text().await.context("读取响应失败")?;
        let envelope: Envelope = match serde_json::from_str(&text) {
            Ok(envelope) => envelope,
            Err(_) if !status.is_success() => bail!("{} - {}", status, text.trim()),
            Err(e) => return Err(e).context("响应不是有效的 JSON"),
        };
        if !envelope.is_success() {
            bail!("{}", envelope.failure_message());
        }
        Ok(envelope)
    }

    pub async fn load_config(&self, config_type: ConfigType) -> Result<ConfigContent> {
        let envelope = self
            .call(Method::GET, &format!("/api/config/{}", config_type), None)
            .await
            .with_context(|| format!("加载配置失败: {}", config_type.file_name()))?;
        Ok(ConfigContent {
            content: envelope.field::<Option<String>>("content")?.unwrap_or_default(),
            exists: envelope.field::<Option<bool>>("exists")?.unwrap_or(true),
        })
    }

    pub async fn save_config(&self, config_type: ConfigType, content: &str) -> Result<String> {
        let body = json!({ "content": content, "config_type": config_type });
        let envelope = self
            .call(Method::POST, "/api/save-config", Some(body))
            .await
            .context("保存配置失败")?;
        info!("✅ 已保存 {}", config_type.file_name());
        Ok(envelope.message.unwrap_or_else(|| "配置保存成功".to_string()))
    }

    /// 服务端 YAML 语法校验；`status == success` 但 `valid == false` 表示语法错误
    pub async fn validate_yaml(&self, config_type: ConfigType, content: &str) -> Result<YamlValidation> {
        let body = json!({ "content": content, "config_type": config_type });
        let envelope = self
            .call(Method::POST, "/api/validate-yaml", Some(body))
            .await
            .context("验证失败")?;
        Ok(YamlValidation {
            valid: envelope.field::<Option<bool>>("valid")?.unwrap_or(false),
            message: envelope.message,
        })
    }

    /// 服务端按当前内容生成的预览
    pub async fn preview_config(&self, config_type: ConfigType, content: &str) -> Result<String> {
        let body = json!({ "content": content, "config_type": config_type });
        let envelope = self
            .call(Method::POST, "/api/preview-config", Some(body))
            .await
            .context("预览失败")?;
        Ok(envelope.field::<Option<String>>("preview")?.unwrap_or_default())
    }

    /// 校验全部配置文件，返回 配置名 -> 结果
    pub async fn validate_all_configs(&self) -> Result<BTreeMap<String, YamlValidation>> {
        let envelope = self
            .call(Method::GET, "/api/validate-all-configs", None)
            .await
            .context("验证失败")?;
        let results: BTreeMap<String, YamlValidation> = envelope.field("results")?;
        let passed = results.values().filter(|r| r.valid).count();
        if passed == results.len() {
            info!("✅ 所有配置验证通过 ({}/{})", passed, results.len());
        } else {
            warn!("⚠️  配置验证完成，{}/{} 个通过", passed, results.len());
        }
        Ok(results)
    }

    /// 实时的配置文件状态（页面内嵌数据只是加载时的快照）
    pub async fn config_status(&self) -> Result<ConfigStatus> {
        let envelope = self
            .call(Method::GET, "/api/config-status", None)
            .await
            .context("刷新配置状态失败")?;
        envelope.field("config_status")
    }

    pub async fn check_integrity(&self) -> Result<Vec<IntegrityIssue>> {
        let envelope = self
            .call(Method::GET, "/api/check-integrity", None)
            .await
            .context("检查失败")?;
        let issues: Vec<IntegrityIssue> = envelope.field("issues")?;
        if issues.is_empty() {
            info!("✅ 配置完整性检查通过");
        } else {
            warn!("⚠️  发现 {} 个问题", issues.len());
        }
        Ok(issues)
    }

    pub async fn clear_cache(&self) -> Result<()> {
        self.call(Method::POST, "/api/clear-cache", None)
            .await
            .context("清理失败")?;
        info!("🧹 配置缓存清理成功");
        Ok(())
    }

    /// 导出全部配置到 `dir/homepage-configs-<date>.tar.gz`
    pub async fn export_configs(&self, dir: &Path, date: NaiveDate) -> Result<PathBuf> {
        let path = dir.join(export_file_name(date));
        self.download("/api/export-configs", &path).await.context("导出失败")?;
        Ok(path)
    }

    /// 上传 `.tar.gz` 归档替换全部配置
    pub async fn import_configs(&self, file: &Path) -> Result<String> {
        let file_name = file
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .filter(|n| n.ends_with(".tar.gz"));
        let Some(file_name) = file_name else {
            bail!("请选择有效的配置文件（.tar.gz格式）: {}", file.display());
        };
        let bytes = tokio::fs::read(file)
            .await
            .with_context(|| format!("读取 {} 失败", file.display()))?;
        let part = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("application/gzip")?;
        let url = self.config.endpoint("/api/import-configs")?;
        debug!("🌐 POST {} (multipart)", url);
        let response = self
            .client
            .post(url)
            .multipart(Form::new().part("config_file", part))
            .send()
            .await
            .context("请求 /api/import-configs 失败")?;
        let envelope = Self::envelope(response).await.context("导入失败")?;
        info!("✅ 配置导入成功");
        Ok(envelope.message.unwrap_or_else(|| "配置导入成功".to_string()))
    }

    /// 概览页统计的实时刷新
    pub async fn stats(&self) -> Result<Stats> {
        let envelope = self
            .call(Method::GET, "/api/stats", None)
            .await
            .context("刷新统计失败")?;
        envelope.field("stats")
    }

    pub async fn delete_config(&self, config_type: ConfigType) -> Result<()> {
        self.call(Method::DELETE, &format!("/api/config/{}", config_type), None)
            .await
            .with_context(|| format!("删除失败: {}", config_type.file_name()))?;
        info!("🗑️  已删除 {}", config_type.file_name());
        Ok(())
    }

    pub async fn list_backups(&self) -> Result<Vec<BackupInfo>> {
        let envelope = self
            .call(Method::GET, "/api/backups", None)
            .await
            .context("加载备份列表失败")?;
        envelope.field("backups")
    }

    /// 创建备份，返回服务端给出的备份路径
    pub async fn create_backup(&self, name: &str) -> Result<Option<String>> {
        validate_backup_name(name)?;
        let envelope = self
            .call(Method::POST, "/api/backup", Some(json!({ "name": name })))
            .await
            .context("创建备份失败")?;
        info!("✅ 备份\"{}\"创建成功", name);
        envelope.field("backup_path")
    }

    pub async fn delete_backup(&self, name: &str) -> Result<()> {
        validate_backup_name(name)?;
        self.call(Method::DELETE, &format!("/api/backup/{}", name), None)
            .await
            .context("删除失败")?;
        info!("🗑️  备份\"{}\"删除成功", name);
        Ok(())
    }

    pub async fn preview_backup(&self, name: &str) -> Result<String> {
        validate_backup_name(name)?;
        let envelope = self
            .call(Method::GET, &format!("/api/backup/{}/preview", name), None)
            .await
            .context("预览失败")?;
        Ok(envelope.field::<Option<String>>("content")?.unwrap_or_default())
    }

    pub async fn restore_backup(&self, name: &str) -> Result<String> {
        validate_backup_name(name)?;
        let envelope = self
            .call(Method::POST, &format!("/api/backup/{}/restore", name), None)
            .await
            .context("恢复失败")?;
        info!("✅ 备份\"{}\"恢复成功", name);
        Ok(envelope.message.unwrap_or_default())
    }

    /// 下载备份归档到 `dir/<name>.tar.gz`
    pub async fn download_backup(&self, name: &str, dir: &Path) -> Result<PathBuf> {
        validate_backup_name(name)?;
        let path = dir.join(format!("{}.tar.gz", name));
        self.download(&format!("/api/backup/{}/download", name), &path)
            .await
            .context("下载备份失败")?;
        Ok(path)
    }

    async fn download(&self, endpoint: &str, path: &Path) -> Result<()> {
        let response = self.send(Method::GET, endpoint, None).await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("{} - {}", status, body.trim());
        }
        let bytes = response.bytes().await.context("读取归档内容失败")?;
        tokio::fs::write(path, &bytes)
            .await
            .with_context(|| format!("写入 {} 失败", path.display()))?;
        info!("📦 已下载 {} ({} 字节)", path.display(), bytes.len());
        Ok(())
    }
}

/// YAML 编辑器缓冲区
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigDocument {
    pub config_type: ConfigType,
    original: String,
    current: String,
    exists: bool,
}

impl ConfigDocument {
    pub fn new(config_type: ConfigType, loaded: ConfigContent) -> Self {
        Self {
            config_type,
            original: loaded.content.clone(),
            current: loaded.content,
            exists: loaded.exists,
        }
    }

    pub fn content(&self) -> &str {
        &self.current
    }

    pub fn exists(&self) -> bool {
        self.exists
    }

    pub fn set_content(&mut self, content: impl Into<String>) {
        self.current = content.into();
    }

    pub fn is_dirty(&self) -> bool {
        self.current != self.original
    }

    pub fn mark_saved(&mut self) {
        self.original = self.current.clone();
        self.exists = true;
    }

    /// 送去校验的内容；空白内容不校验
    pub fn validation_input(&self) -> Option<&str> {
        if self.current.trim().is_empty() {
            warn!("⚠️  配置内容为空");
            None
        } else {
            Some(&self.current)
        }
    }

    pub async fn validate(&self, client: &ConfigClient) -> Result<Option<YamlValidation>> {
        match self.validation_input() {
            Some(content) => Ok(Some(client.validate_yaml(self.config_type, content).await?)),
            None => Ok(None),
        }
    }

    /// 预览当前内容；空白内容不预览
    pub async fn preview(&self, client: &ConfigClient) -> Result<Option<String>> {
        match self.validation_input() {
            Some(content) => Ok(Some(client.preview_config(self.config_type, content).await?)),
            None => Ok(None),
        }
    }

    /// 保存当前内容，成功后清除未保存标记
    pub async fn save(&mut self, client: &ConfigClient) -> Result<String> {
        let message = client.save_config(self.config_type, &self.current).await?;
        self.mark_saved();
        Ok(message)
    }
}
