use crate::error::AgriError;
use serde_json::Value;

/// 后台 worker 发回控制台的事件
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    Message(String),
    Error { kind: &'static str, message: String },
    Json(Value),
    Shutdown,
}

impl AppEvent {
    pub fn from_error(err: &AgriError) -> Self {
        AppEvent::Error {
            kind: err.kind(),
            message: err.to_string(),
        }
    }

    /// 控制台输出文本
    pub fn render(&self) -> String {
        match self {
            AppEvent::Message(msg) => msg.clone(),
            AppEvent::Error { kind, message } => format!("✗ [{}] {}", kind, message),
            AppEvent::Json(value) => {
                serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
            }
            AppEvent::Shutdown => "再见".to_string(),
        }
    }
}

/// worker 持有的会话状态：只保存 token，每条命令重新解析身份
#[derive(Debug, Default, Clone)]
pub struct SessionState {
    pub token: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_render_with_kind_label() {
        let event = AppEvent::from_error(&AgriError::InsufficientStock("Urea".to_string()));
        assert_eq!(event.render(), "✗ [INSUFFICIENT_STOCK] insufficient stock: Urea");
    }

    #[test]
    fn json_renders_pretty() {
        let event = AppEvent::Json(serde_json::json!({"id": "p-1"}));
        assert_eq!(event.render(), "{\n  \"id\": \"p-1\"\n}");
    }
}
