//! 分组/条目数据模型
//!
//! 后端 YAML 的形状是"单键映射的列表"：
//!
//! ```yaml
//! - Developer:              # 分组
//!     - GitHub:             # 条目
//!         - href: https://github.com     # 书签: 只含一个配置对象的列表
//! - Media:
//!     - Jellyfin:
//!         href: http://jellyfin.lan      # 服务: 直接是配置对象
//! ```
//!
//! `Group<K>` 与 `Item<K>` 手写 serde 实现，保证序列化结果与上面的嵌套形状完全一致，
//! 且顺序原样往返。

use serde::de::{self, DeserializeSeed, IgnoredAny, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;
use std::marker::PhantomData;
use tracing::warn;

/// 条目配置
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ItemConfig {
    /// 绝对URL或以 `/` 开头的站内路径
    #[serde(default)]
    pub href: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    /// 书签专用，最多2个字符
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abbr: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// 服务专用
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub widget: Option<Widget>,
    /// 其余字段 (siteMonitor, ping, target ...) 原样保留
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ItemConfig {
    pub fn new(href: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            ..Default::default()
        }
    }
}

/// 服务小工具配置
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Widget {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// 列表类型：书签或服务
///
/// 两者共享分组/条目结构，只在条目值的包装方式、保存地址和页面数据元素上不同。
pub trait ItemKind: fmt::Debug + Clone + Copy + PartialEq + Default + Send + Sync + 'static {
    /// 显示名称
    const LABEL: &'static str;
    /// 页面元素的 class/data 属性前缀
    const SLUG: &'static str;
    /// 保存整份列表的地址
    const ENDPOINT: &'static str;
    /// 页面内嵌 JSON 的元素 id
    const DATA_ELEMENT: &'static str;
    /// 是否允许 `abbr`
    const HAS_ABBR: bool;
    /// 是否允许 `widget`
    const HAS_WIDGET: bool;
    /// 分组标题上直接改名（书签），否则走分组编辑表单（服务）
    const INLINE_GROUP_RENAME: bool;

    fn serialize_config<S: Serializer>(config: &ItemConfig, serializer: S) -> Result<S::Ok, S::Error>;

    fn deserialize_config<'de, D: Deserializer<'de>>(deserializer: D) -> Result<ItemConfig, D::Error>;
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Bookmarks;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Services;

impl ItemKind for Bookmarks {
    const LABEL: &'static str = "书签";
    const SLUG: &'static str = "bookmark";
    const ENDPOINT: &'static str = "/bookmarks";
    const DATA_ELEMENT: &'static str = "bookmarks-data";
    const HAS_ABBR: bool = true;
    const HAS_WIDGET: bool = false;
    const INLINE_GROUP_RENAME: bool = true;

    fn serialize_config<S: Serializer>(config: &ItemConfig, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(std::iter::once(config))
    }

    fn deserialize_config<'de, D: Deserializer<'de>>(deserializer: D) -> Result<ItemConfig, D::Error> {
        let configs = Vec::<ItemConfig>::deserialize(deserializer)?;
        if configs.len() > 1 {
            warn!("⚠️  书签条目包含 {} 个配置对象，仅保留第一个", configs.len());
        }
        configs
            .into_iter()
            .next()
            .ok_or_else(|| de::Error::custom("bookmark entry must contain one config object"))
    }
}

impl ItemKind for Services {
    const LABEL: &'static str = "服务";
    const SLUG: &'static str = "service";
    const ENDPOINT: &'static str = "/services";
    const DATA_ELEMENT: &'static str = "services-data";
    const HAS_ABBR: bool = false;
    const HAS_WIDGET: bool = true;
    const INLINE_GROUP_RENAME: bool = false;

    fn serialize_config<S: Serializer>(config: &ItemConfig, serializer: S) -> Result<S::Ok, S::Error> {
        config.serialize(serializer)
    }

    fn deserialize_config<'de, D: Deserializer<'de>>(deserializer: D) -> Result<ItemConfig, D::Error> {
        ItemConfig::deserialize(deserializer)
    }
}

/// 分组内的单个条目
#[derive(Debug, Clone, PartialEq)]
pub struct Item<K: ItemKind> {
    pub name: String,
    pub config: ItemConfig,
    kind: PhantomData<K>,
}

impl<K: ItemKind> Item<K> {
    pub fn new(name: impl Into<String>, config: ItemConfig) -> Self {
        Self {
            name: name.into(),
            config,
            kind: PhantomData,
        }
    }
}

/// 命名的有序条目集合
#[derive(Debug, Clone, PartialEq)]
pub struct Group<K: ItemKind> {
    pub name: String,
    pub items: Vec<Item<K>>,
}

impl<K: ItemKind> Group<K> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            items: Vec::new(),
        }
    }

    pub fn with_items(name: impl Into<String>, items: Vec<Item<K>>) -> Self {
        Self {
            name: name.into(),
            items,
        }
    }

    pub fn position(&self, item_name: &str) -> Option<usize> {
        self.items.iter().position(|i| i.name == item_name)
    }

    pub fn item(&self, item_name: &str) -> Option<&Item<K>> {
        self.items.iter().find(|i| i.name == item_name)
    }

    pub fn contains(&self, item_name: &str) -> bool {
        self.position(item_name).is_some()
    }
}

struct ConfigRef<'a, K: ItemKind>(&'a ItemConfig, PhantomData<K>);

impl<K: ItemKind> Serialize for ConfigRef<'_, K> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        K::serialize_config(self.0, serializer)
    }
}

struct ConfigSeed<K: ItemKind>(PhantomData<K>);

impl<'de, K: ItemKind> DeserializeSeed<'de> for ConfigSeed<K> {
    type Value = ItemConfig;

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> Result<ItemConfig, D::Error> {
        K::deserialize_config(deserializer)
    }
}

impl<K: ItemKind> Serialize for Item<K> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(&self.name, &ConfigRef::<K>(&self.config, PhantomData))?;
        map.end()
    }
}

impl<K: ItemKind> Serialize for Group<K> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(&self.name, &self.items)?;
        map.end()
    }
}

/// 读取单键映射：先取唯一的键，再用 `seed` 读取值，多余的键报错
fn single_key_entry<'de, A, T>(mut map: A, seed: T, what: &str) -> Result<(String, T::Value), A::Error>
where
    A: MapAccess<'de>,
    T: DeserializeSeed<'de>,
{
    let name: String = map
        .next_key()?
        .ok_or_else(|| de::Error::custom(format!("{} must have exactly one key, found none", what)))?;
    let value = map.next_value_seed(seed)?;
    if map.next_key::<IgnoredAny>()?.is_some() {
        return Err(de::Error::custom(format!("{} \"{}\" must have exactly one key", what, name)));
    }
    Ok((name, value))
}

struct ItemVisitor<K: ItemKind>(PhantomData<K>);

impl<'de, K: ItemKind> Visitor<'de> for ItemVisitor<K> {
    type Value = Item<K>;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "a single-key map describing one {}", K::LABEL)
    }

    fn visit_map<A: MapAccess<'de>>(self, map: A) -> Result<Item<K>, A::Error> {
        let (name, config) = single_key_entry(map, ConfigSeed::<K>(PhantomData), "item")?;
        Ok(Item::new(name, config))
    }
}

impl<'de, K: ItemKind> Deserialize<'de> for Item<K> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(ItemVisitor::<K>(PhantomData))
    }
}

/// 空分组在 YAML 中可能是 `- Dev:`，即 null
struct ItemsSeed<K: ItemKind>(PhantomData<K>);

impl<'de, K: ItemKind> DeserializeSeed<'de> for ItemsSeed<K> {
    type Value = Vec<Item<K>>;

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> Result<Self::Value, D::Error> {
        Ok(Option::<Vec<Item<K>>>::deserialize(deserializer)?.unwrap_or_default())
    }
}

struct GroupVisitor<K: ItemKind>(PhantomData<K>);

impl<'de, K: ItemKind> Visitor<'de> for GroupVisitor<K> {
    type Value = Group<K>;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "a single-key map from group name to {} list", K::LABEL)
    }

    fn visit_map<A: MapAccess<'de>>(self, map: A) -> Result<Group<K>, A::Error> {
        let (name, items) = single_key_entry(map, ItemsSeed::<K>(PhantomData), "group")?;
        Ok(Group::with_items(name, items))
    }
}

impl<'de, K: ItemKind> Deserialize<'de> for Group<K> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(GroupVisitor::<K>(PhantomData))
    }
}

pub fn parse_groups<K: ItemKind>(value: Value) -> serde_json::Result<Vec<Group<K>>> {
    serde_json::from_value(value)
}
