//! 管理面板客户端错误类型
//!
//! 三类错误：客户端校验失败、网络传输失败、服务端返回的逻辑失败。
//! 任何错误都不会中断页面，只会变成一条提示消息。

use thiserror::Error;

/// 错误分类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// 字段为空或格式非法，阻止提交，不发起网络请求
    Validation,
    /// 网络或解码失败
    Transport,
    /// 服务端返回 status != "success"
    Server,
}

#[derive(Debug, Error)]
pub enum AdminError {
    #[error("{0}不能为空")]
    EmptyField(&'static str),

    #[error("无效的网址格式: {0}")]
    InvalidUrl(String),

    #[error("缩写最多2个字符: {0}")]
    InvalidAbbr(String),

    #[error("无效的图标格式: {0}")]
    InvalidIcon(String),

    #[error("小工具字段格式错误，请输入有效的JSON: {0}")]
    InvalidWidgetFields(String),

    #[error("备份名称只能包含字母、数字、下划线和横杠: {0}")]
    InvalidBackupName(String),

    #[error("{field}: {message}")]
    InvalidSetting { field: &'static str, message: String },

    #[error("分组名称已存在: {0}")]
    DuplicateGroup(String),

    #[error("分组 \"{group}\" 中已存在 \"{name}\"")]
    DuplicateItem { group: String, name: String },

    #[error("分组不存在: {0}")]
    GroupNotFound(String),

    #[error("分组 \"{group}\" 中找不到 \"{name}\"")]
    ItemNotFound { group: String, name: String },

    #[error("索引越界: {index} (长度 {len})")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("网络请求失败: {0}")]
    Transport(String),

    #[error("{0}")]
    Server(String),

    #[error("数据格式错误: {0}")]
    Decode(String),
}

impl AdminError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            AdminError::Transport(_) | AdminError::Decode(_) => ErrorCategory::Transport,
            AdminError::Server(_) => ErrorCategory::Server,
            _ => ErrorCategory::Validation,
        }
    }
}

impl From<reqwest::Error> for AdminError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            AdminError::Decode(err.to_string())
        } else {
            AdminError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for AdminError {
    fn from(err: serde_json::Error) -> Self {
        AdminError::Decode(err.to_string())
    }
}

pub type AdminResult<T> = std::result::Result<T, AdminError>;
