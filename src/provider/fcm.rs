use std::sync::Arc;
use async_trait::async_trait;
use dashmap::DashMap;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::{mpsc, RwLock};
use tracing::{error, info, warn};

use crate::config::ProviderConfig;
use crate::error::{ClientError, Result};
use crate::provider::provider_trait::MessagingProvider;
use crate::provider::types::{DeliveryScope, MessageStream, NotificationPayload, ProviderKind};

/// 每个订阅通道的缓冲大小
const CHANNEL_CAPACITY: usize = 64;

/// FCM (Firebase Cloud Messaging) Provider
///
/// 使用 FCM Web Registration HTTP API 获取 DeliveryToken。消息传输本身
/// （WebPush 长连接）归推送服务所有，投递通过 `delivery_sender` 接缝进入
/// 订阅流。
pub struct FcmProvider {
    client: Client,
    config: Arc<ProviderConfig>,
    /// 注册接口地址（可覆盖，便于私有化部署）
    endpoint: String,
    /// SDK 侧 token 缓存：轮换由提供商决定，本地只按需重取
    token_cache: RwLock<Option<String>>,
    senders: DashMap<DeliveryScope, mpsc::Sender<NotificationPayload>>,
}

#[derive(Debug, Deserialize)]
struct RegistrationResponse {
    token: String,
}

impl FcmProvider {
    /// 创建新的 FCM Provider
    pub fn new(config: Arc<ProviderConfig>) -> Self {
        let endpoint = format!(
            "https://fcmregistrations.googleapis.com/v1/projects/{}/registrations",
            config.project_id
        );
        Self {
            client: Client::new(),
            config,
            endpoint,
            token_cache: RwLock::new(None),
            senders: DashMap::new(),
        }
    }

    /// 覆盖注册接口地址
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// 构建注册请求 payload
    fn build_registration_payload(&self) -> serde_json::Value {
        json!({
            "web": {
                "applicationPubKey": self.config.vapid_key,
                "appId": self.config.app_id,
                "senderId": self.config.sender_id,
            }
        })
    }

    /// 传输层投递接缝
    ///
    /// 推送服务的长连接（本系统的 Non-goal）收到消息后，经此投递到对应
    /// 范围的订阅流。无订阅者时返回 None，消息按平台语义丢弃。
    pub fn delivery_sender(
        &self,
        scope: DeliveryScope,
    ) -> Option<mpsc::Sender<NotificationPayload>> {
        self.senders.get(&scope).map(|s| s.value().clone())
    }
}

#[async_trait]
impl MessagingProvider for FcmProvider {
    async fn fetch_token(&self) -> Result<String> {
        // SDK 缓存：已有 token 直接返回（轮换不可见，失效由提供商回收）
        if let Some(token) = self.token_cache.read().await.clone() {
            info!("[FCM] Returning cached token");
            return Ok(token);
        }

        let payload = self.build_registration_payload();

        info!(
            "[FCM] Requesting delivery token: project_id={}",
            self.config.project_id
        );

        let response = self
            .client
            .post(&self.endpoint)
            .header("x-goog-api-key", &self.config.api_key)
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await
            .map_err(|e| ClientError::TokenFetchFailed(format!("FCM request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!(
                "[FCM] Token fetch failed: status={}, error={}",
                status, error_text
            );
            return Err(ClientError::TokenFetchFailed(format!(
                "FCM registration failed: status={}, error={}",
                status, error_text
            )));
        }

        let registration: RegistrationResponse = response
            .json()
            .await
            .map_err(|e| ClientError::TokenFetchFailed(format!("FCM response parse failed: {}", e)))?;

        info!("[FCM] Delivery token obtained");
        *self.token_cache.write().await = Some(registration.token.clone());
        Ok(registration.token)
    }

    async fn subscribe(&self, scope: DeliveryScope) -> Result<MessageStream> {
        let (sender, receiver) = mpsc::channel(CHANNEL_CAPACITY);
        if self.senders.insert(scope, sender).is_some() {
            warn!(
                "[FCM] Subscription replaced for scope: {}",
                scope.as_str()
            );
        }
        info!("[FCM] Subscribed: scope={}", scope.as_str());
        Ok(MessageStream::new(receiver))
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Fcm
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> Arc<ProviderConfig> {
        Arc::new(ProviderConfig {
            api_key: "test-api-key".to_string(),
            project_id: "test-project".to_string(),
            sender_id: "123456".to_string(),
            app_id: "1:123456:web:abc".to_string(),
            vapid_key: "test-vapid".to_string(),
        })
    }

    #[test]
    fn test_registration_payload_shape() {
        let provider = FcmProvider::new(test_config());
        let payload = provider.build_registration_payload();

        assert_eq!(payload["web"]["applicationPubKey"], "test-vapid");
        assert_eq!(payload["web"]["senderId"], "123456");
        assert!(provider.endpoint.contains("/projects/test-project/"));
    }

    #[tokio::test]
    async fn test_delivery_seam_reaches_subscriber() {
        let provider = FcmProvider::new(test_config());

        let mut stream = provider.subscribe(DeliveryScope::Background).await.unwrap();
        let sender = provider
            .delivery_sender(DeliveryScope::Background)
            .expect("subscriber registered");

        sender
            .send(NotificationPayload::new("hello", "world"))
            .await
            .unwrap();

        let payload = stream.recv().await.unwrap();
        assert_eq!(payload.notification.unwrap().title, "hello");
        // 未订阅的范围没有投递端
        assert!(provider.delivery_sender(DeliveryScope::Foreground).is_none());
    }
}
