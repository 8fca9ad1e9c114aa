//! 翻译模块统一错误处理
//!
//! 提供结构化错误类型。所有翻译错误最终都会被吞掉并回退为原文，
//! 这里的分类只用于诊断日志。

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// 翻译错误类型
#[derive(Error, Debug, Clone)]
pub enum TranslationError {
    /// 网络错误
    #[error("网络错误: {0}")]
    NetworkError(String),

    /// 非 2xx 响应
    #[error("HTTP {status}: {reason}")]
    HttpStatus { status: u16, reason: String },

    /// 响应体格式不符合预期
    #[error("响应格式错误: {0}")]
    MalformedResponse(String),

    /// 消息通道错误
    #[error("消息通道错误: {0}")]
    ChannelError(String),

    /// 后台服务返回失败
    #[error("后台翻译失败: {0}")]
    RemoteError(String),

    /// 超时错误
    #[error("操作超时: {0:?}")]
    TimeoutError(Duration),

    /// 输入验证错误
    #[error("输入无效: {0}")]
    InvalidInput(String),

    /// 配置错误
    #[error("配置错误: {0}")]
    ConfigError(String),
}

/// 错误类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    Network,
    Response,
    Messaging,
    Timeout,
    Input,
    Configuration,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorCategory::Network => "network",
            ErrorCategory::Response => "response",
            ErrorCategory::Messaging => "messaging",
            ErrorCategory::Timeout => "timeout",
            ErrorCategory::Input => "input",
            ErrorCategory::Configuration => "configuration",
        };
        f.write_str(name)
    }
}

impl TranslationError {
    /// 获取错误类别
    pub fn category(&self) -> ErrorCategory {
        match self {
            TranslationError::NetworkError(_) => ErrorCategory::Network,
            TranslationError::HttpStatus { .. } => ErrorCategory::Network,
            TranslationError::MalformedResponse(_) => ErrorCategory::Response,
            TranslationError::ChannelError(_) => ErrorCategory::Messaging,
            TranslationError::RemoteError(_) => ErrorCategory::Messaging,
            TranslationError::TimeoutError(_) => ErrorCategory::Timeout,
            TranslationError::InvalidInput(_) => ErrorCategory::Input,
            TranslationError::ConfigError(_) => ErrorCategory::Configuration,
        }
    }

    /// 按类别记录日志
    pub fn log(&self, context: &str) {
        match self.category() {
            ErrorCategory::Timeout => tracing::warn!("{}: {}", context, self),
            ErrorCategory::Input => tracing::debug!("{}: {}", context, self),
            _ => tracing::error!(category = %self.category(), "{}: {}", context, self),
        }
    }
}

impl From<reqwest::Error> for TranslationError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            TranslationError::NetworkError(format!("请求超时: {}", error))
        } else if let Some(status) = error.status() {
            TranslationError::HttpStatus {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("").to_string(),
            }
        } else {
            TranslationError::NetworkError(error.to_string())
        }
    }
}

impl From<serde_json::Error> for TranslationError {
    fn from(error: serde_json::Error) -> Self {
        TranslationError::MalformedResponse(format!("JSON解析错误: {}", error))
    }
}

impl From<url::ParseError> for TranslationError {
    fn from(error: url::ParseError) -> Self {
        TranslationError::ConfigError(format!("无效的URL: {}", error))
    }
}

impl From<regex::Error> for TranslationError {
    fn from(error: regex::Error) -> Self {
        TranslationError::ConfigError(format!("无效的正则表达式: {}", error))
    }
}

/// 错误结果类型别名
pub type TranslationResult<T> = Result<T, TranslationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categories_follow_taxonomy() {
        assert_eq!(
            TranslationError::HttpStatus {
                status: 500,
                reason: "Internal Server Error".to_string()
            }
            .category(),
            ErrorCategory::Network
        );
        assert_eq!(
            TranslationError::MalformedResponse("x".into()).category(),
            ErrorCategory::Response
        );
        assert_eq!(
            TranslationError::ChannelError("closed".into()).category(),
            ErrorCategory::Messaging
        );
        assert_eq!(
            TranslationError::TimeoutError(Duration::from_secs(5)).category(),
            ErrorCategory::Timeout
        );
    }

    #[test]
    fn json_errors_are_malformed_responses() {
        let error: TranslationError = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert!(matches!(error, TranslationError::MalformedResponse(_)));
    }

    #[test]
    fn display_includes_status() {
        let error = TranslationError::HttpStatus {
            status: 503,
            reason: "Service Unavailable".to_string(),
        };
        assert_eq!(error.to_string(), "HTTP 503: Service Unavailable");
    }
}
