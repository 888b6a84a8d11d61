//! 客户端配置
//!
//! 默认值 -> 环境变量 (`HOMEMAN_URL`, `HOMEMAN_TIMEOUT_SECS`) -> 命令行参数，后者覆盖前者。

use reqwest::{Client, Url};
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{AdminError, AdminResult};

pub const ENV_URL: &str = "HOMEMAN_URL";
pub const ENV_TIMEOUT: &str = "HOMEMAN_TIMEOUT_SECS";

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// 管理面板地址 (如 http://localhost:5000)
    pub base_url: String,
    /// 请求超时秒数
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            timeout_secs: 10,
            user_agent: format!("homeman-admin/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(url) = lookup(ENV_URL).filter(|u| !u.trim().is_empty()) {
            config.base_url = url.trim().to_string();
        }
        if let Some(raw) = lookup(ENV_TIMEOUT) {
            match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => config.timeout_secs = secs,
                _ => warn!("⚠️  忽略无效的 {}: {}", ENV_TIMEOUT, raw),
            }
        }
        config
    }

    /// 命令行参数覆盖
    pub fn with_overrides(mut self, url: Option<String>, timeout_secs: Option<u64>) -> Self {
        if let Some(url) = url {
            self.base_url = url;
        }
        if let Some(secs) = timeout_secs {
            self.timeout_secs = secs;
        }
        self
    }

    /// 拼接接口地址，保留 base_url 中的路径前缀
    pub fn endpoint(&self, path: &str) -> AdminResult<Url> {
        let joined = format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        Url::parse(&joined).map_err(|e| AdminError::InvalidUrl(format!("{} ({})", joined, e)))
    }

    pub fn build_client(&self) -> AdminResult<Client> {
        debug!("🌐 管理面板地址: {} (超时 {}s)", self.base_url, self.timeout_secs);
        Ok(Client::builder()
            .timeout(Duration::from_secs(self.timeout_secs))
            .user_agent(&self.user_agent)
            .build()?)
    }
}
