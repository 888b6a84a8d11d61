//! 书签/服务编辑表单
//!
//! 表单字段都是原始文本，`into_config` 负责裁剪、规范化和校验，
//! 编辑已有条目时保留表单上没有的字段（siteMonitor、widget 的 key 等）。

use serde_json::Value;

use crate::error::{AdminError, AdminResult};
use crate::model::{Bookmarks, Item, ItemConfig, ItemKind, Services, Widget};
use crate::validation::{check_href, is_valid_web_url, normalize_href, validate_abbr, validate_icon};

/// 空白视为未填写
fn optional(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn check_icon(icon: &Option<String>) -> AdminResult<()> {
    match icon {
        Some(icon) if !validate_icon(icon) => Err(AdminError::InvalidIcon(icon.clone())),
        _ => Ok(()),
    }
}

/// 条目表单
pub trait ItemForm<K: ItemKind> {
    /// 提交的名称（已裁剪）
    fn name(&self) -> String;

    /// 校验并生成配置；`previous` 是被编辑条目的原配置
    fn into_config(self, previous: Option<&ItemConfig>) -> AdminResult<ItemConfig>;

    /// 用已有条目填充表单
    fn from_item(item: &Item<K>) -> Self;
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookmarkForm {
    pub name: String,
    pub href: String,
    pub icon: String,
    pub abbr: String,
    pub description: String,
}

impl ItemForm<Bookmarks> for BookmarkForm {
    fn name(&self) -> String {
        self.name.trim().to_string()
    }

    fn into_config(self, previous: Option<&ItemConfig>) -> AdminResult<ItemConfig> {
        if self.name.trim().is_empty() {
            return Err(AdminError::EmptyField("书签名称"));
        }
        if self.href.trim().is_empty() {
            return Err(AdminError::EmptyField("链接地址"));
        }
        let href = normalize_href(&self.href);
        check_href(&href)?;

        let icon = optional(&self.icon);
        check_icon(&icon)?;
        let abbr = optional(&self.abbr);
        if let Some(abbr) = &abbr {
            validate_abbr(abbr)?;
        }

        Ok(ItemConfig {
            href,
            icon,
            abbr,
            description: optional(&self.description),
            widget: None,
            extra: previous.map(|p| p.extra.clone()).unwrap_or_default(),
        })
    }

    fn from_item(item: &Item<Bookmarks>) -> Self {
        let config = &item.config;
        Self {
            name: item.name.clone(),
            href: config.href.clone(),
            icon: config.icon.clone().unwrap_or_default(),
            abbr: config.abbr.clone().unwrap_or_default(),
            description: config.description.clone().unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServiceForm {
    pub name: String,
    pub href: String,
    pub icon: String,
    pub description: String,
    /// 小工具类型，留空表示没有小工具
    pub widget_type: String,
    pub widget_url: String,
    /// JSON 文本
    pub widget_fields: String,
}

impl ServiceForm {
    fn widget(&self, previous: Option<&Widget>) -> AdminResult<Option<Widget>> {
        let Some(kind) = optional(&self.widget_type) else {
            return Ok(None);
        };
        let fields = match optional(&self.widget_fields) {
            Some(text) => Some(
                serde_json::from_str::<Value>(&text)
                    .map_err(|e| AdminError::InvalidWidgetFields(e.to_string()))?,
            ),
            None => None,
        };
        // 同类型小工具保留 key、username 等额外字段
        let extra = previous
            .filter(|w| w.kind == kind)
            .map(|w| w.extra.clone())
            .unwrap_or_default();
        Ok(Some(Widget {
            kind,
            url: optional(&self.widget_url),
            fields,
            extra,
        }))
    }
}

impl ItemForm<Services> for ServiceForm {
    fn name(&self) -> String {
        self.name.trim().to_string()
    }

    fn into_config(self, previous: Option<&ItemConfig>) -> AdminResult<ItemConfig> {
        if self.name.trim().is_empty() {
            return Err(AdminError::EmptyField("服务名称"));
        }
        let href = self.href.trim().to_string();
        if href.is_empty() {
            return Err(AdminError::EmptyField("URL"));
        }
        if !is_valid_web_url(&href) {
            return Err(AdminError::InvalidUrl(href));
        }

        let icon = optional(&self.icon);
        check_icon(&icon)?;
        let widget = self.widget(previous.and_then(|p| p.widget.as_ref()))?;

        Ok(ItemConfig {
            href,
            icon,
            abbr: None,
            description: optional(&self.description),
            widget,
            extra: previous.map(|p| p.extra.clone()).unwrap_or_default(),
        })
    }

    fn from_item(item: &Item<Services>) -> Self {
        let config = &item.config;
        let widget = config.widget.as_ref();
        Self {
            name: item.name.clone(),
            href: config.href.clone(),
            icon: config.icon.clone().unwrap_or_default(),
            description: config.description.clone().unwrap_or_default(),
            widget_type: widget.map(|w| w.kind.clone()).unwrap_or_default(),
            widget_url: widget.and_then(|w| w.url.clone()).unwrap_or_default(),
            widget_fields: widget
                .and_then(|w| w.fields.as_ref())
                .and_then(|f| serde_json::to_string_pretty(f).ok())
                .unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn bookmark(name: &str, href: &str) -> BookmarkForm {
        BookmarkForm {
            name: name.into(),
            href: href.into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_bookmark_form_normalizes_and_trims() {
        let mut form = bookmark("  GitHub ", " github.com ");
        form.abbr = " GH ".into();
        form.description = "   ".into();
        assert_eq!(ItemForm::<Bookmarks>::name(&form), "GitHub");
        let config = form.into_config(None).unwrap();
        assert_eq!(config.href, "http://github.com");
        assert_eq!(config.abbr.as_deref(), Some("GH"));
        assert_eq!(config.description, None);
    }

    #[test]
    fn test_bookmark_form_rejections() {
        assert!(matches!(bookmark("", "a.com").into_config(None), Err(AdminError::EmptyField(_))));
        assert!(matches!(bookmark("x", "  ").into_config(None), Err(AdminError::EmptyField(_))));
        assert!(matches!(bookmark("x", "not a url").into_config(None), Err(AdminError::InvalidUrl(_))));

        let mut form = bookmark("x", "a.com");
        form.abbr = "ABC".into();
        assert!(matches!(form.into_config(None), Err(AdminError::InvalidAbbr(_))));

        let mut form = bookmark("x", "a.com");
        form.icon = "bad icon".into();
        assert!(matches!(form.into_config(None), Err(AdminError::InvalidIcon(_))));
    }

    #[test]
    fn test_edit_keeps_unknown_fields() {
        let mut previous = ItemConfig::new("https://old.example.com");
        previous.extra.insert("target".into(), json!("_self"));
        let config = bookmark("x", "https://new.example.com").into_config(Some(&previous)).unwrap();
        assert_eq!(config.href, "https://new.example.com");
        assert_eq!(config.extra.get("target"), Some(&json!("_self")));
    }

    #[test]
    fn test_service_form_widget() {
        let form = ServiceForm {
            name: "Jellyfin".into(),
            href: "http://jellyfin.example.com".into(),
            widget_type: "jellyfin".into(),
            widget_url: "http://jellyfin.example.com".into(),
            widget_fields: r#"["movies", "series"]"#.into(),
            ..Default::default()
        };
        let config = form.into_config(None).unwrap();
        let widget = config.widget.unwrap();
        assert_eq!(widget.kind, "jellyfin");
        assert_eq!(widget.fields, Some(json!(["movies", "series"])));
    }

    #[test]
    fn test_service_form_rejections() {
        let mut form = ServiceForm {
            name: "S".into(),
            href: "http://intranet".into(),
            ..Default::default()
        };
        assert!(matches!(form.clone().into_config(None), Err(AdminError::InvalidUrl(_))));

        form.href = "http://10.0.0.2:8080".into();
        form.widget_type = "custom".into();
        form.widget_fields = "{broken".into();
        assert!(matches!(form.clone().into_config(None), Err(AdminError::InvalidWidgetFields(_))));

        // 没有小工具类型时忽略其它小工具字段
        form.widget_type = String::new();
        assert!(form.into_config(None).unwrap().widget.is_none());
    }

    #[test]
    fn test_service_form_roundtrip_from_item() {
        let mut widget_extra = serde_json::Map::new();
        widget_extra.insert("key".into(), json!("secret"));
        let mut config = ItemConfig::new("https://sonarr.example.com");
        config.widget = Some(Widget {
            kind: "sonarr".into(),
            url: None,
            fields: Some(json!(["queued"])),
            extra: widget_extra,
        });
        let item = Item::<Services>::new("Sonarr", config.clone());
        let form = ServiceForm::from_item(&item);
        assert_eq!(form.widget_type, "sonarr");
        let rebuilt = form.into_config(Some(&config)).unwrap();
        assert_eq!(rebuilt, config);
    }
}
