use std::fmt;
use std::error::Error as StdError;
use serde::{Serialize, Deserialize};

/// 客户端错误类型
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ClientError {
    /// 内部错误
    Internal(String),
    /// 配置错误
    Configuration(String),
    /// 网络错误
    Network(String),
    /// 序列化错误
    Serialization(String),
    /// 超时错误
    Timeout(String),
    /// 通知权限被拒绝（用户级，会话内终态）
    PermissionDenied(String),
    /// 后台 Worker 注册失败（非致命，降级为仅前台模式）
    RegistrationFailed(String),
    /// DeliveryToken 获取失败（非致命，后端注册不可用）
    TokenFetchFailed(String),
    /// 畸形 Payload（缺失 notification 等预期字段）
    MalformedPayload(String),
    /// Provider 错误
    Provider(String),
    /// Token Sink 错误
    Sink(String),
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientError::Internal(msg) => write!(f, "Internal error: {}", msg),
            ClientError::Configuration(msg) => write!(f, "Configuration error: {}", msg),
            ClientError::Network(msg) => write!(f, "Network error: {}", msg),
            ClientError::Serialization(msg) => write!(f, "Serialization error: {}", msg),
            ClientError::Timeout(msg) => write!(f, "Timeout error: {}", msg),
            ClientError::PermissionDenied(msg) => write!(f, "Permission denied: {}", msg),
            ClientError::RegistrationFailed(msg) => write!(f, "Worker registration failed: {}", msg),
            ClientError::TokenFetchFailed(msg) => write!(f, "Token fetch failed: {}", msg),
            ClientError::MalformedPayload(msg) => write!(f, "Malformed payload: {}", msg),
            ClientError::Provider(msg) => write!(f, "Provider error: {}", msg),
            ClientError::Sink(msg) => write!(f, "Token sink error: {}", msg),
        }
    }
}

impl StdError for ClientError {}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        ClientError::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::Serialization(err.to_string())
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ClientError::Timeout(err.to_string())
        } else {
            ClientError::Network(err.to_string())
        }
    }
}

impl From<tokio::time::error::Elapsed> for ClientError {
    fn from(err: tokio::time::error::Elapsed) -> Self {
        ClientError::Timeout(err.to_string())
    }
}

/// 结果类型别名
pub type Result<T> = std::result::Result<T, ClientError>;
