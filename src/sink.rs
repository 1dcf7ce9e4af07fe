use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info};
use uuid::Uuid;

use crate::error::{ClientError, Result};

/// 设备注册信息（发往应用后端的 token 注册记录）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceRegistration {
    /// 本地生成的设备 ID
    pub device_id: Uuid,
    /// DeliveryToken
    pub device_token: String,
    /// 设备名称
    pub device_name: String,
    /// 提供商类型（fcm / mock）
    pub provider_kind: String,
    /// 注册时间
    pub registered_at: DateTime<Utc>,
}

impl DeviceRegistration {
    pub fn new(
        device_token: impl Into<String>,
        device_name: impl Into<String>,
        provider_kind: impl Into<String>,
    ) -> Self {
        Self {
            device_id: Uuid::new_v4(),
            device_token: device_token.into(),
            device_name: device_name.into(),
            provider_kind: provider_kind.into(),
            registered_at: Utc::now(),
        }
    }
}

/// Sink 错误
#[derive(Debug, Error)]
pub enum SinkError {
    /// 后端拒绝了注册请求
    #[error("sink endpoint rejected registration: {0}")]
    Rejected(String),
    /// 请求本身失败（网络等）
    #[error("sink request failed: {0}")]
    Request(String),
}

impl From<SinkError> for ClientError {
    fn from(err: SinkError) -> Self {
        ClientError::Sink(err.to_string())
    }
}

/// Token Sink（应用后端接口）
///
/// 接收 `(token) -> ack`：注册成功即视为后端已确认，可以向该设备推送。
#[async_trait]
pub trait TokenSink: Send + Sync {
    /// 将 DeliveryToken 注册到应用后端
    async fn register_token(&self, registration: &DeviceRegistration) -> Result<()>;
}

/// Log Sink（演示/测试）
///
/// 不调用真实后端，只打印日志并直接 ack。
pub struct LogSink;

#[async_trait]
impl TokenSink for LogSink {
    async fn register_token(&self, registration: &DeviceRegistration) -> Result<()> {
        info!(
            "[LOG SINK] Token registered: device_id={}, device_name={}, provider={}, token={}",
            registration.device_id,
            registration.device_name,
            registration.provider_kind,
            registration.device_token
        );
        Ok(())
    }
}

/// HTTP Token Sink
///
/// 将注册记录以 JSON POST 到后端设备注册接口。
pub struct HttpTokenSink {
    client: Client,
    endpoint: String,
}

impl HttpTokenSink {
    /// 创建新的 HTTP Sink（endpoint 必须是合法 URL）
    pub fn new(endpoint: impl Into<String>) -> Result<Self> {
        let endpoint = endpoint.into();
        url::Url::parse(&endpoint)
            .map_err(|e| ClientError::Configuration(format!("invalid sink endpoint: {}", e)))?;
        Ok(Self {
            client: Client::new(),
            endpoint,
        })
    }
}

#[async_trait]
impl TokenSink for HttpTokenSink {
    async fn register_token(&self, registration: &DeviceRegistration) -> Result<()> {
        info!(
            "[HTTP SINK] Registering token: endpoint={}, device_id={}",
            self.endpoint, registration.device_id
        );

        let response = self
            .client
            .post(&self.endpoint)
            .json(registration)
            .send()
            .await
            .map_err(|e| SinkError::Request(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            info!(
                "[HTTP SINK] Token registered: device_id={}",
                registration.device_id
            );
            Ok(())
        } else {
            let error_text = response.text().await.unwrap_or_default();
            error!(
                "[HTTP SINK] Registration rejected: status={}, error={}",
                status, error_text
            );
            Err(SinkError::Rejected(format!(
                "status={}, error={}",
                status, error_text
            ))
            .into())
        }
    }
}
