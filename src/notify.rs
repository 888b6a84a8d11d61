//! 用户可见的提示消息（toast）

use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastLevel {
    Success,
    Info,
    Warning,
    Error,
}

#[cfg(test)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub level: ToastLevel,
    pub message: String,
}

pub trait Notifier {
    fn notify(&mut self, level: ToastLevel, message: &str);

    fn success(&mut self, message: &str) {
        self.notify(ToastLevel::Success, message);
    }

    fn info(&mut self, message: &str) {
        self.notify(ToastLevel::Info, message);
    }

    fn warning(&mut self, message: &str) {
        self.notify(ToastLevel::Warning, message);
    }

    fn error(&mut self, message: &str) {
        self.notify(ToastLevel::Error, message);
    }
}

/// 命令行下把提示写进日志
#[derive(Debug, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&mut self, level: ToastLevel, message: &str) {
        match level {
            ToastLevel::Success => info!("✅ {}", message),
            ToastLevel::Info => info!("ℹ️  {}", message),
            ToastLevel::Warning => warn!("⚠️  {}", message),
            ToastLevel::Error => error!("❌ {}", message),
        }
    }
}

/// 收集所有提示，便于检查
#[cfg(test)]
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    pub toasts: Vec<Toast>,
}

#[cfg(test)]
impl RecordingNotifier {
    pub fn last(&self) -> Option<&Toast> {
        self.toasts.last()
    }

    pub fn errors(&self) -> impl Iterator<Item = &Toast> {
        self.toasts.iter().filter(|t| t.level == ToastLevel::Error)
    }
}

#[cfg(test)]
impl Notifier for RecordingNotifier {
    fn notify(&mut self, level: ToastLevel, message: &str) {
        self.toasts.push(Toast {
            level,
            message: message.to_string(),
        });
    }
}
