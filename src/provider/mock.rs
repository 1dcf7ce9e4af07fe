use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info, warn};

use crate::error::{ClientError, Result};
use crate::provider::provider_trait::MessagingProvider;
use crate::provider::types::{DeliveryScope, MessageStream, NotificationPayload, ProviderKind};

/// 每个订阅通道的缓冲大小
const CHANNEL_CAPACITY: usize = 64;

struct MockState {
    /// 当前 token（可通过 handle 轮换）
    token: RwLock<String>,
    /// 下一次 fetch_token 是否失败
    fail_token_fetch: AtomicBool,
    /// fetch_token 实际调用次数
    fetch_count: AtomicU32,
    /// 各范围的投递端（单消费者，重复订阅替换）
    senders: DashMap<DeliveryScope, mpsc::Sender<NotificationPayload>>,
}

/// Mock Provider（用于演示和测试）
///
/// 不调用真实 API：token 与消息都由 `MockHandle` 在进程内注入。
pub struct MockProvider {
    state: Arc<MockState>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::with_token("mock-token")
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            state: Arc::new(MockState {
                token: RwLock::new(token.into()),
                fail_token_fetch: AtomicBool::new(false),
                fetch_count: AtomicU32::new(0),
                senders: DashMap::new(),
            }),
        }
    }

    /// 获取注入句柄
    pub fn handle(&self) -> MockHandle {
        MockHandle {
            state: self.state.clone(),
        }
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessagingProvider for MockProvider {
    async fn fetch_token(&self) -> Result<String> {
        self.state.fetch_count.fetch_add(1, Ordering::SeqCst);

        if self.state.fail_token_fetch.load(Ordering::SeqCst) {
            warn!("[MOCK PROVIDER] Token fetch failing as scripted");
            return Err(ClientError::TokenFetchFailed(
                "mock provider scripted failure".to_string(),
            ));
        }

        let token = self.state.token.read().await.clone();
        info!("[MOCK PROVIDER] Token fetched: {}", token);
        Ok(token)
    }

    async fn subscribe(&self, scope: DeliveryScope) -> Result<MessageStream> {
        let (sender, receiver) = mpsc::channel(CHANNEL_CAPACITY);
        // 重复订阅：替换旧投递端，旧流随 sender drop 关闭
        if self.state.senders.insert(scope, sender).is_some() {
            warn!(
                "[MOCK PROVIDER] Subscription replaced for scope: {}",
                scope.as_str()
            );
        }
        info!("[MOCK PROVIDER] Subscribed: scope={}", scope.as_str());
        Ok(MessageStream::new(receiver))
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Mock
    }
}

/// Mock Provider 的注入句柄（演示/测试驱动端）
#[derive(Clone)]
pub struct MockHandle {
    state: Arc<MockState>,
}

impl MockHandle {
    /// 轮换 token（模拟提供商侧 rotation）
    pub async fn rotate_token(&self, token: impl Into<String>) {
        let token = token.into();
        info!("[MOCK PROVIDER] Token rotated: {}", token);
        *self.state.token.write().await = token;
    }

    /// 编排 fetch_token 失败
    pub fn set_token_fetch_failure(&self, fail: bool) {
        self.state.fail_token_fetch.store(fail, Ordering::SeqCst);
    }

    /// fetch_token 实际被调用的次数
    pub fn token_fetch_count(&self) -> u32 {
        self.state.fetch_count.load(Ordering::SeqCst)
    }

    /// 向指定范围注入一条消息
    ///
    /// 无订阅者时视为投递失败（消息丢弃，与平台无人接收的语义一致）。
    pub async fn inject(&self, scope: DeliveryScope, payload: NotificationPayload) -> Result<()> {
        let Some(sender) = self.state.senders.get(&scope).map(|s| s.value().clone()) else {
            debug!(
                "[MOCK PROVIDER] No subscriber for scope {}, message dropped",
                scope.as_str()
            );
            return Err(ClientError::Provider(format!(
                "no subscriber for scope: {}",
                scope.as_str()
            )));
        };

        sender
            .send(payload)
            .await
            .map_err(|_| ClientError::Provider("subscriber gone, message dropped".to_string()))?;
        Ok(())
    }
}
