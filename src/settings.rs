//! 全局设置表单
//!
//! 提交前在本地校验 URL、列数和各个枚举字段，通过后以表单编码 POST 到 `/settings`。
//! 导出时从设置页的 `#settingsForm` 读出当前值，导入的 JSON 用同样的后端字段名。

use anyhow::{bail, Context, Result};
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::error::{AdminError, AdminResult};
use crate::validation::is_valid_web_url;

pub const THEMES: &[&str] = &["light", "dark"];

pub const COLORS: &[&str] = &[
    "slate", "gray", "zinc", "neutral", "stone", "amber", "yellow", "lime", "green", "emerald", "teal",
    "cyan", "sky", "blue", "indigo", "violet", "purple", "fuchsia", "pink", "rose", "red", "white",
];

pub const HEADER_STYLES: &[&str] = &["underlined", "boxed", "clean", "boxedWidgets"];

pub const TARGETS: &[&str] = &["_self", "_blank", "_top"];

pub const LANGUAGES: &[&str] = &[
    "ca", "de", "en", "es", "fr", "he", "hr", "hu", "it", "nb-NO", "nl", "pt", "ru", "sv", "vi", "zh-CN",
    "zh-Hant",
];

pub const COLUMN_RANGE: std::ops::RangeInclusive<u32> = 1..=8;

/// 设置页提交后服务端通过 flash 消息报告的失败
const FAILURE_MARKERS: &[&str] = &["设置验证失败", "保存失败", "保存异常"];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SettingsForm {
    pub title: Option<String>,
    pub base: Option<String>,
    pub favicon: Option<String>,
    pub background: Option<String>,
    pub theme: Option<String>,
    pub color: Option<String>,
    pub header_style: Option<String>,
    pub target: Option<String>,
    pub language: Option<String>,
    /// 原始输入，校验时解析
    pub columns: Option<String>,
    pub bookmark_columns: Option<String>,
}

fn filled(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn check_url(field: &'static str, value: &Option<String>) -> AdminResult<()> {
    match filled(value) {
        Some(url) if !is_valid_web_url(url) => Err(AdminError::InvalidSetting {
            field,
            message: format!("请输入有效的URL地址: {}", url),
        }),
        _ => Ok(()),
    }
}

fn check_choice(field: &'static str, value: &Option<String>, accepted: &[&str]) -> AdminResult<()> {
    match filled(value) {
        Some(choice) if !accepted.contains(&choice) => Err(AdminError::InvalidSetting {
            field,
            message: format!("不支持的值 \"{}\"，可选: {}", choice, accepted.join(", ")),
        }),
        _ => Ok(()),
    }
}

fn check_columns(field: &'static str, value: &Option<String>) -> AdminResult<Option<u32>> {
    let Some(raw) = filled(value) else {
        return Ok(None);
    };
    match raw.parse::<u32>() {
        Ok(n) if COLUMN_RANGE.contains(&n) => Ok(Some(n)),
        _ => Err(AdminError::InvalidSetting {
            field,
            message: format!("请输入 {} 到 {} 之间的数字", COLUMN_RANGE.start(), COLUMN_RANGE.end()),
        }),
    }
}

impl SettingsForm {
    /// 逐项校验，返回全部错误
    pub fn validate(&self) -> Vec<AdminError> {
        let checks = [
            check_url("base", &self.base),
            check_url("favicon", &self.favicon),
            check_url("background", &self.background),
            check_columns("maxGroupColumns", &self.columns).map(|_| ()),
            check_columns("maxBookmarkGroupColumns", &self.bookmark_columns).map(|_| ()),
            check_choice("theme", &self.theme, THEMES),
            check_choice("color", &self.color, COLORS),
            check_choice("headerStyle", &self.header_style, HEADER_STYLES),
            check_choice("target", &self.target, TARGETS),
            check_choice("language", &self.language, LANGUAGES),
        ];
        checks.into_iter().filter_map(Result::err).collect()
    }

    /// 后端表单字段名 -> 值，只包含已填写的字段
    pub fn to_form_pairs(&self) -> AdminResult<Vec<(&'static str, String)>> {
        let mut pairs = Vec::new();
        let text_fields = [
            ("title", &self.title),
            ("base", &self.base),
            ("favicon", &self.favicon),
            ("background", &self.background),
            ("theme", &self.theme),
            ("color", &self.color),
            ("headerStyle", &self.header_style),
            ("target", &self.target),
            ("language", &self.language),
        ];
        for (key, value) in text_fields {
            if let Some(v) = filled(value) {
                pairs.push((key, v.to_string()));
            }
        }
        if let Some(n) = check_columns("maxGroupColumns", &self.columns)? {
            pairs.push(("maxGroupColumns", n.to_string()));
        }
        if let Some(n) = check_columns("maxBookmarkGroupColumns", &self.bookmark_columns)? {
            pairs.push(("maxBookmarkGroupColumns", n.to_string()));
        }
        Ok(pairs)
    }
}

impl SettingsForm {
    /// 按后端字段名填充，未知字段忽略；数字和布尔值转成文本
    pub fn from_pairs(pairs: &BTreeMap<String, Value>) -> Self {
        let get = |key: &str| match pairs.get(key)? {
            Value::String(text) => Some(text.clone()),
            Value::Null => None,
            other => Some(other.to_string()),
        };
        for key in pairs.keys() {
            if !FORM_KEYS.contains(&key.as_str()) {
                debug!("忽略未知设置项: {}", key);
            }
        }
        Self {
            title: get("title"),
            base: get("base"),
            favicon: get("favicon"),
            background: get("background"),
            theme: get("theme"),
            color: get("color"),
            header_style: get("headerStyle"),
            target: get("target"),
            language: get("language"),
            columns: get("maxGroupColumns"),
            bookmark_columns: get("maxBookmarkGroupColumns"),
        }
    }

    /// 用 `overrides` 中给出的字段覆盖当前值
    pub fn overlay(self, overrides: SettingsForm) -> Self {
        Self {
            title: overrides.title.or(self.title),
            base: overrides.base.or(self.base),
            favicon: overrides.favicon.or(self.favicon),
            background: overrides.background.or(self.background),
            theme: overrides.theme.or(self.theme),
            color: overrides.color.or(self.color),
            header_style: overrides.header_style.or(self.header_style),
            target: overrides.target.or(self.target),
            language: overrides.language.or(self.language),
            columns: overrides.columns.or(self.columns),
            bookmark_columns: overrides.bookmark_columns.or(self.bookmark_columns),
        }
    }
}

const FORM_KEYS: &[&str] = &[
    "title",
    "base",
    "favicon",
    "background",
    "theme",
    "color",
    "headerStyle",
    "target",
    "language",
    "maxGroupColumns",
    "maxBookmarkGroupColumns",
];

/// 读取导出的设置 JSON
pub fn parse_settings_json(text: &str) -> Result<SettingsForm> {
    let pairs: BTreeMap<String, Value> = serde_json::from_str(text).context("导入失败：JSON格式错误")?;
    Ok(SettingsForm::from_pairs(&pairs))
}

fn field_value(element: ElementRef<'_>) -> Option<String> {
    let value = element.value();
    match value.name() {
        "input" => match value.attr("type").unwrap_or("text") {
            "submit" | "button" | "file" | "reset" => None,
            // 未勾选的复选框不提交
            "checkbox" | "radio" => value
                .attr("checked")
                .map(|_| value.attr("value").unwrap_or("on").to_string()),
            _ => Some(value.attr("value").unwrap_or_default().to_string()),
        },
        "select" => {
            let options = Selector::parse("option").ok()?;
            // 没有 selected 时浏览器提交第一个选项
            let chosen = element
                .select(&options)
                .find(|o| o.value().attr("selected").is_some())
                .or_else(|| element.select(&options).next())?;
            Some(
                chosen
                    .value()
                    .attr("value")
                    .map(str::to_string)
                    .unwrap_or_else(|| chosen.text().collect::<String>().trim().to_string()),
            )
        }
        "textarea" => Some(element.text().collect()),
        _ => None,
    }
}

/// 从设置页 HTML 读出表单的当前值
pub fn scrape_settings(html: &str) -> BTreeMap<String, String> {
    let document = Html::parse_document(html);
    let mut pairs = BTreeMap::new();
    let Ok(selector) = Selector::parse(
        "#settingsForm input[name], #settingsForm select[name], #settingsForm textarea[name]",
    ) else {
        return pairs;
    };
    for element in document.select(&selector) {
        let Some(name) = element.value().attr("name") else {
            continue;
        };
        if let Some(value) = field_value(element) {
            pairs.insert(name.to_string(), value);
        }
    }
    if pairs.is_empty() {
        warn!("⚠️  设置页没有找到 #settingsForm 表单字段");
    }
    pairs
}

/// 导出当前设置
pub async fn export_settings(config: &ClientConfig) -> Result<BTreeMap<String, String>> {
    let client = config.build_client()?;
    let response = client
        .get(config.endpoint("/settings")?)
        .send()
        .await
        .context("加载设置页面失败")?;
    let status = response.status();
    if !status.is_success() {
        bail!("加载设置页面失败: {}", status);
    }
    let html = response.text().await.context("读取响应失败")?;
    let pairs = scrape_settings(&html);
    info!("📤 导出 {} 项设置", pairs.len());
    Ok(pairs)
}

/// 校验并提交设置
pub async fn submit_settings(config: &ClientConfig, form: &SettingsForm) -> Result<()> {
    if let Some(first) = form.validate().into_iter().next() {
        return Err(first).context("设置验证失败");
    }
    let pairs = form.to_form_pairs()?;
    debug!("📤 提交 {} 项设置", pairs.len());

    let client = config.build_client()?;
    let response = client
        .post(config.endpoint("/settings")?)
        .form(&pairs)
        .send()
        .await
        .context("提交设置失败")?;
    let status = response.status();
    if !status.is_success() {
        bail!("提交设置失败: {}", status);
    }
    let body = response.text().await.context("读取响应失败")?;
    if let Some(marker) = FAILURE_MARKERS.iter().find(|m| body.contains(*m)) {
        bail!("服务端拒绝了设置: {}", marker);
    }
    info!("✅ 设置保存成功");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::{Form, Router};
    use std::collections::HashMap;

    fn valid_form() -> SettingsForm {
        SettingsForm {
            title: Some("Home Lab".into()),
            base: Some("https://home.example.com".into()),
            theme: Some("dark".into()),
            color: Some("slate".into()),
            language: Some("zh-CN".into()),
            columns: Some("4".into()),
            bookmark_columns: Some(" 6 ".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_valid_form() {
        let form = valid_form();
        assert!(form.validate().is_empty());
        let pairs = form.to_form_pairs().unwrap();
        assert!(pairs.contains(&("maxBookmarkGroupColumns", "6".to_string())));
        assert!(pairs.contains(&("theme", "dark".to_string())));
        assert!(!pairs.iter().any(|(k, _)| *k == "favicon"));
    }

    #[test]
    fn test_invalid_fields_collected() {
        let form = SettingsForm {
            favicon: Some("not a url".into()),
            columns: Some("9".into()),
            bookmark_columns: Some("x".into()),
            theme: Some("solarized".into()),
            target: Some("_parent".into()),
            ..Default::default()
        };
        let errors = form.validate();
        assert_eq!(errors.len(), 5);
        assert!(errors
            .iter()
            .all(|e| matches!(e, AdminError::InvalidSetting { .. })));
    }

    #[test]
    fn test_import_json_and_overlay() {
        let imported = parse_settings_json(
            r#"{"title": "Lab", "theme": "light", "maxGroupColumns": 5, "unknown": "x", "favicon": null}"#,
        )
        .unwrap();
        assert_eq!(imported.title.as_deref(), Some("Lab"));
        assert_eq!(imported.columns.as_deref(), Some("5"));
        assert_eq!(imported.favicon, None);

        let flags = SettingsForm { theme: Some("dark".into()), ..Default::default() };
        let merged = imported.overlay(flags);
        assert_eq!(merged.theme.as_deref(), Some("dark"));
        assert_eq!(merged.title.as_deref(), Some("Lab"));
        assert!(merged.validate().is_empty());

        assert!(parse_settings_json("[1, 2]").is_err());
    }

    const SETTINGS_PAGE: &str = r#"<html><body>
        <form id="settingsForm">
          <input name="title" value="Home Lab">
          <input name="base" type="url" value="">
          <select name="theme"><option value="light">Light</option><option value="dark" selected>Dark</option></select>
          <select name="language"><option value="en">English</option></select>
          <input type="checkbox" name="hideErrors" checked>
          <input type="checkbox" name="showStats">
          <textarea name="background">https://img.example.com/bg.jpg</textarea>
          <button type="submit" name="save">保存</button>
        </form>
        <input name="outside" value="ignored">
    </body></html>"#;

    #[test]
    fn test_scrape_settings() {
        let pairs = scrape_settings(SETTINGS_PAGE);
        assert_eq!(pairs["title"], "Home Lab");
        assert_eq!(pairs["base"], "");
        assert_eq!(pairs["theme"], "dark");
        assert_eq!(pairs["language"], "en");
        assert_eq!(pairs["hideErrors"], "on");
        assert_eq!(pairs["background"], "https://img.example.com/bg.jpg");
        assert!(!pairs.contains_key("showStats"));
        assert!(!pairs.contains_key("save"));
        assert!(!pairs.contains_key("outside"));

        assert!(scrape_settings("<html></html>").is_empty());
    }

    #[tokio::test]
    async fn test_export_settings() {
        let router = Router::new().route("/settings", axum::routing::get(|| async { axum::response::Html(SETTINGS_PAGE) }));
        let config = spawn_backend(router).await;
        let pairs = export_settings(&config).await.unwrap();
        assert_eq!(pairs["title"], "Home Lab");
    }

    #[test]
    fn test_empty_optional_urls_are_fine() {
        let form = SettingsForm {
            base: Some("   ".into()),
            background: None,
            ..Default::default()
        };
        assert!(form.validate().is_empty());
        assert!(form.to_form_pairs().unwrap().is_empty());
    }

    async fn spawn_backend(router: Router) -> ClientConfig {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        ClientConfig::default().with_overrides(Some(format!("http://{}", addr)), Some(5))
    }

    /// 声明的长度比实际内容长，读 body 时连接已关闭
    async fn spawn_truncated_backend() -> ClientConfig {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                request.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&request).to_string();
                if let Some(end) = text.find("\r\n\r\n") {
                    let length = text
                        .lines()
                        .find_map(|l| l.to_ascii_lowercase().strip_prefix("content-length:").map(|v| v.trim().to_string()))
                        .and_then(|v| v.parse::<usize>().ok())
                        .unwrap_or(0);
                    if request.len() >= end + 4 + length {
                        break;
                    }
                }
                if n == 0 {
                    break;
                }
            }
            socket
                .write_all(b"HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Length: 4096\r\n\r\n<p>partial")
                .await
                .unwrap();
            socket.shutdown().await.unwrap();
        });
        ClientConfig::default().with_overrides(Some(format!("http://{}", addr)), Some(5))
    }

    #[tokio::test]
    async fn test_unreadable_response_is_an_error() {
        let config = spawn_truncated_backend().await;
        assert!(submit_settings(&config, &valid_form()).await.is_err());
    }

    #[tokio::test]
    async fn test_submit_settings() {
        let router = Router::new().route(
            "/settings",
            post(|Form(fields): Form<HashMap<String, String>>| async move {
                if fields.get("color").map(String::as_str) == Some("white") {
                    (StatusCode::OK, "<div class=\"alert\">设置验证失败：color</div>".to_string())
                } else {
                    (StatusCode::OK, format!("<p>ok {}</p>", fields.len()))
                }
            }),
        );
        let config = spawn_backend(router).await;
        submit_settings(&config, &valid_form()).await.unwrap();

        let mut rejected = valid_form();
        rejected.color = Some("white".into());
        assert!(submit_settings(&config, &rejected).await.is_err());

        let mut invalid = valid_form();
        invalid.columns = Some("0".into());
        let err = submit_settings(&config, &invalid).await.unwrap_err();
        assert!(format!("{:#}", err).contains("maxGroupColumns"));
    }
}
