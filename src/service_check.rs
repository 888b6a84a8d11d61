//! 服务连通性测试
//!
//! 对条目地址发一次 HEAD 请求，服务端不支持 HEAD (405) 时回退到 GET。
//! 只要拿到 HTTP 响应就算能连上，状态码仅用于展示。

use reqwest::{Client, Url};
use std::time::Instant;
use tracing::debug;

use crate::config::ClientConfig;
use crate::error::{AdminError, AdminResult};

/// 单次连通性测试的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceCheck {
    pub url: String,
    /// None 表示没有拿到响应
    pub status_code: Option<u16>,
    pub latency_ms: u64,
    pub error: Option<String>,
}

impl ServiceCheck {
    pub fn is_reachable(&self) -> bool {
        self.status_code.is_some()
    }
}

/// 站内路径按管理面板地址补全
pub fn resolve_href(config: &ClientConfig, href: &str) -> AdminResult<Url> {
    if href.starts_with('/') {
        config.endpoint(href)
    } else {
        Url::parse(href).map_err(|e| AdminError::InvalidUrl(format!("{} ({})", href, e)))
    }
}

pub async fn check_service(client: &Client, url: Url) -> ServiceCheck {
    let start = Instant::now();
    let result = match client.head(url.clone()).send().await {
        Ok(response) if response.status().as_u16() == 405 => {
            debug!("HEAD 返回 405，回退到 GET: {}", url);
            client.get(url.clone()).send().await
        }
        other => other,
    };
    let latency_ms = start.elapsed().as_millis() as u64;

    match result {
        Ok(response) => ServiceCheck {
            url: url.to_string(),
            status_code: Some(response.status().as_u16()),
            latency_ms,
            error: None,
        },
        Err(e) => ServiceCheck {
            url: url.to_string(),
            status_code: None,
            latency_ms,
            error: Some(if e.is_timeout() { "请求超时".to_string() } else { e.to_string() }),
        },
    }
}
