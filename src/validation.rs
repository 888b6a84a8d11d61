//! 字段校验
//!
//! URL 语法与后端校验器保持一致：http/https + 域名、localhost 或 IPv4，
//! 可选端口与路径；另外接受以 `/` 开头的站内路径。

use regex::Regex;
use reqwest::Url;
use std::net::Ipv4Addr;
use std::sync::OnceLock;
use tracing::warn;

use crate::error::{AdminError, AdminResult};
use crate::model::{ItemConfig, ItemKind};
use crate::store::ListStore;

fn compile(pattern: &str) -> Option<Regex> {
    match Regex::new(pattern) {
        Ok(regex) => Some(regex),
        Err(e) => {
            warn!("⚠️  正则编译失败 {}: {}", pattern, e);
            None
        }
    }
}

fn url_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| {
            compile(
                r"(?i)^https?://(?:(?:[A-Z0-9](?:[A-Z0-9-]{0,61}[A-Z0-9])?\.)+[A-Z]{2,6}\.?|localhost|\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3})(?::\d+)?(?:/?|[/?]\S+)$",
            )
        })
        .as_ref()
}

fn domain_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| {
            compile(r"^[a-zA-Z0-9]([a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(\.[a-zA-Z0-9]([a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$")
        })
        .as_ref()
}

fn icon_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            r"(?i)^[a-z0-9_-]+\.(png|jpg|jpeg|gif|svg|webp)$",
            r"(?i)^mdi-[a-z0-9_-]+(-#[a-f0-9]{6})?$",
            r"(?i)^si-[a-z0-9_-]+(-#[a-f0-9]{6})?$",
            r"(?i)^sh-[a-z0-9_-]+(\.(svg|png|webp))?$",
        ]
        .iter()
        .filter_map(|p| compile(p))
        .collect()
    })
}

fn backup_name_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN.get_or_init(|| compile(r"^[a-zA-Z0-9_-]+$")).as_ref()
}

/// 没有协议且不是站内路径时补上 `http://`
pub fn normalize_href(input: &str) -> String {
    let trimmed = input.trim();
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") || trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("http://{}", trimmed)
    }
}

/// 书签/快速添加使用的 URL 语法
pub fn is_valid_href(url: &str) -> bool {
    if url.is_empty() {
        return false;
    }
    if url.starts_with('/') {
        return true;
    }
    url_pattern().is_some_and(|p| p.is_match(url))
}

pub fn check_href(url: &str) -> AdminResult<()> {
    if url.trim().is_empty() {
        return Err(AdminError::EmptyField("链接地址"));
    }
    if is_valid_href(url) {
        Ok(())
    } else {
        Err(AdminError::InvalidUrl(url.to_string()))
    }
}

/// 服务表单和设置页使用的严格 Web URL 校验
pub fn is_valid_web_url(url: &str) -> bool {
    let Ok(parsed) = Url::parse(url) else {
        return false;
    };
    if !matches!(parsed.scheme(), "http" | "https") {
        return false;
    }
    let Some(host) = parsed.host_str() else {
        return false;
    };
    if host.is_empty() {
        return false;
    }
    if host == "localhost" || host.parse::<Ipv4Addr>().is_ok() {
        return true;
    }
    // 除了 localhost 和 IP，必须有顶级域名
    domain_pattern().is_some_and(|p| p.is_match(host)) && host.contains('.')
}

pub fn validate_icon(icon: &str) -> bool {
    if icon.is_empty() {
        return true;
    }
    if icon_patterns().iter().any(|p| p.is_match(icon)) {
        return true;
    }
    if Url::parse(icon).is_ok() {
        return true;
    }
    icon.starts_with('/') || icon.starts_with("./") || icon.starts_with("../")
}

pub fn validate_abbr(abbr: &str) -> AdminResult<()> {
    if abbr.chars().count() > 2 {
        Err(AdminError::InvalidAbbr(abbr.to_string()))
    } else {
        Ok(())
    }
}

pub fn validate_backup_name(name: &str) -> AdminResult<()> {
    if backup_name_pattern().is_some_and(|p| p.is_match(name)) {
        Ok(())
    } else {
        Err(AdminError::InvalidBackupName(name.to_string()))
    }
}

/// 从主机名第一段推导的显示名称和缩写
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteName {
    pub name: String,
    pub abbr: String,
}

pub const FALLBACK_NAME: &str = "New Bookmark";
pub const FALLBACK_ABBR: &str = "NB";

impl SiteName {
    pub fn fallback() -> Self {
        Self {
            name: FALLBACK_NAME.to_string(),
            abbr: FALLBACK_ABBR.to_string(),
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.abbr == FALLBACK_ABBR && self.name == FALLBACK_NAME
    }
}

fn capitalize(label: &str) -> String {
    let mut chars = label.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// `http://www.example.com/x` -> `Example` / `EX`
///
/// 站内路径无法解析出主机名，返回 `None`。
pub fn derive_site_name(normalized_url: &str) -> Option<SiteName> {
    let parsed = Url::parse(normalized_url).ok()?;
    let host = parsed.host_str()?;
    let host = host.strip_prefix("www.").unwrap_or(host);
    let labels: Vec<&str> = host.split('.').collect();
    if labels.len() < 2 || labels[0].is_empty() {
        return Some(SiteName::fallback());
    }
    let name = capitalize(labels[0]);
    let abbr = name.chars().take(2).collect::<String>().to_uppercase();
    Some(SiteName { name, abbr })
}

/// 表单自动填充名称：只在能推导出真实名称时返回
pub fn auto_fill_name(href: &str) -> Option<String> {
    let normalized = normalize_href(href);
    if !is_valid_href(&normalized) {
        return None;
    }
    derive_site_name(&normalized)
        .filter(|site| !site.is_fallback())
        .map(|site| site.name)
}

/// 单个条目配置的校验，与后端的书签/服务校验规则一致
pub fn validate_config<K: ItemKind>(config: &ItemConfig) -> AdminResult<()> {
    check_href(&config.href)?;
    if K::HAS_ABBR {
        if let Some(abbr) = &config.abbr {
            validate_abbr(abbr)?;
        }
    }
    Ok(())
}

/// 导入前的整份列表预检，与后端校验器规则一致
pub fn validate_list<K: ItemKind>(store: &ListStore<K>) -> AdminResult<()> {
    store.check_unique_names()?;
    for group in store.groups() {
        for item in &group.items {
            validate_config::<K>(&item.config)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Bookmarks;
    use proptest::prelude::*;

    #[test]
    fn test_normalize_href() {
        assert_eq!(normalize_href("example.com"), "http://example.com");
        assert_eq!(normalize_href("  https://a.io/x "), "https://a.io/x");
        assert_eq!(normalize_href("/local/path"), "/local/path");
        assert_eq!(normalize_href("http://x.org"), "http://x.org");
    }

    #[test]
    fn test_href_grammar() {
        assert!(is_valid_href("http://example.com"));
        assert!(is_valid_href("https://sub.example.co.uk:8443/path?q=1"));
        assert!(is_valid_href("http://localhost:3000"));
        assert!(is_valid_href("http://192.168.1.10/admin"));
        assert!(is_valid_href("/internal"));
        assert!(!is_valid_href(""));
        assert!(!is_valid_href("http://not a url"));
        assert!(!is_valid_href("ftp://example.com"));
        assert!(!is_valid_href("http://nodot"));
    }

    #[test]
    fn test_web_url() {
        assert!(is_valid_web_url("http://localhost:8080"));
        assert!(is_valid_web_url("https://grafana.example.com/d/abc"));
        assert!(is_valid_web_url("http://10.0.0.1"));
        assert!(!is_valid_web_url("http://intranet"));
        assert!(!is_valid_web_url("mailto:a@b.c"));
        assert!(!is_valid_web_url("/relative"));
    }

    #[test]
    fn test_icons() {
        assert!(validate_icon(""));
        assert!(validate_icon("jellyfin.png"));
        assert!(validate_icon("mdi-home"));
        assert!(validate_icon("mdi-home-#ff00aa"));
        assert!(validate_icon("si-github"));
        assert!(validate_icon("sh-plex.webp"));
        assert!(validate_icon("https://cdn.example.com/i.svg"));
        assert!(validate_icon("./icons/a.png"));
        assert!(!validate_icon("not an icon"));
    }

    #[test]
    fn test_site_name_derivation() {
        let site = derive_site_name("http://example.com").unwrap();
        assert_eq!(site.name, "Example");
        assert_eq!(site.abbr, "EX");

        let site = derive_site_name("https://www.github.com/rust-lang").unwrap();
        assert_eq!(site.name, "Github");
        assert_eq!(site.abbr, "GI");

        assert!(derive_site_name("http://localhost:8080").unwrap().is_fallback());
        assert!(derive_site_name("/docs").is_none());
    }

    #[test]
    fn test_auto_fill() {
        assert_eq!(auto_fill_name("jellyfin.example.org"), Some("Jellyfin".to_string()));
        assert_eq!(auto_fill_name("http://localhost"), None);
        assert_eq!(auto_fill_name("bad url"), None);
    }

    #[test]
    fn test_abbr_and_backup_names() {
        assert!(validate_abbr("GH").is_ok());
        assert!(validate_abbr("中文").is_ok());
        assert!(validate_abbr("ABC").is_err());
        assert!(validate_backup_name("backup_2024-01-01T10-00").is_ok());
        assert!(validate_backup_name("bad name").is_err());
        assert!(validate_backup_name("").is_err());
    }

    #[test]
    fn test_validate_config() {
        let mut config = ItemConfig::new("https://example.com");
        assert!(validate_config::<Bookmarks>(&config).is_ok());
        config.abbr = Some("TOO".into());
        assert!(matches!(validate_config::<Bookmarks>(&config), Err(AdminError::InvalidAbbr(_))));
        config.href = String::new();
        assert!(matches!(validate_config::<Bookmarks>(&config), Err(AdminError::EmptyField(_))));
    }

    #[test]
    fn test_validate_list() {
        let mut store = ListStore::<Bookmarks>::new();
        store.add_group("Dev").unwrap();
        store.add_item("Dev", "GitHub", ItemConfig::new("https://github.com")).unwrap();
        assert!(validate_list(&store).is_ok());

        let mut groups = store.groups().to_vec();
        groups.push(groups[0].clone());
        let duplicated = ListStore::from_groups(groups);
        assert!(matches!(validate_list(&duplicated), Err(AdminError::DuplicateGroup(_))));
    }

    proptest! {
        #[test]
        fn prop_normalized_bare_domains_are_valid(label in "[a-z][a-z0-9]{0,10}", tld in "(com|org|net|io)") {
            let normalized = normalize_href(&format!("{}.{}", label, tld));
            prop_assert!(normalized.starts_with("http://"));
            prop_assert!(is_valid_href(&normalized));
            let site = derive_site_name(&normalized).unwrap();
            prop_assert_eq!(site.abbr.chars().count(), label.chars().take(2).count());
        }

        #[test]
        fn prop_inputs_with_spaces_rejected(a in "[a-z]{1,8}", b in "[a-z]{1,8}") {
            let normalized = normalize_href(&format!("{} {}", a, b));
            prop_assert!(!is_valid_href(&normalized));
        }
    }
}
