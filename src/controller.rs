use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use chrono::{DateTime, Utc};
use parking_lot::RwLock as SyncRwLock;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use crate::context::ClientContext;
use crate::error::{ClientError, Result};
use crate::platform::PermissionState;
use crate::provider::{DeliveryScope, NotificationContent};
use crate::sink::DeviceRegistration;

/// 会话状态
///
/// 线性 best-effort 流水线，没有回滚：Worker 注册失败只降级，权限拒绝后
/// 会话进入降级终态，不会再触发 token 获取。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// 初始
    Idle,
    /// 正在注册后台 Worker
    WorkerRegistering,
    /// Worker 就绪
    WorkerReady,
    /// Worker 注册失败（非致命，仅前台模式）
    WorkerFailed,
    /// 等待权限弹窗结果
    PermissionPending,
    /// 权限已授予
    PermissionGranted,
    /// 权限被拒绝（含用户关掉弹窗未作答）
    PermissionDenied,
    /// 正在获取 DeliveryToken
    TokenFetching,
    /// Token 就绪
    TokenReady,
    /// Token 获取失败（重试已耗尽）
    TokenFailed,
    /// 降级终态（通知不可用）
    Degraded,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::WorkerRegistering => "worker_registering",
            SessionState::WorkerReady => "worker_ready",
            SessionState::WorkerFailed => "worker_failed",
            SessionState::PermissionPending => "permission_pending",
            SessionState::PermissionGranted => "permission_granted",
            SessionState::PermissionDenied => "permission_denied",
            SessionState::TokenFetching => "token_fetching",
            SessionState::TokenReady => "token_ready",
            SessionState::TokenFailed => "token_failed",
            SessionState::Degraded => "degraded",
        }
    }
}

/// 已渲染到 UI 的通知
#[derive(Debug, Clone)]
pub struct RenderedNotification {
    pub title: String,
    pub body: String,
    pub data: HashMap<String, String>,
    pub received_at: DateTime<Utc>,
}

/// 前台 UI 状态
///
/// 每条消息按到达顺序恰好渲染一次；不做去重——提供商重投递就渲染两次，
/// 重投递语义归提供商所有。
#[derive(Default)]
pub struct UiState {
    rendered: SyncRwLock<Vec<RenderedNotification>>,
}

impl UiState {
    pub(crate) fn render(&self, content: NotificationContent, data: HashMap<String, String>) {
        let notification = RenderedNotification {
            title: content.title,
            body: content.body,
            data,
            received_at: Utc::now(),
        };
        debug!(
            "[CONTROLLER] UI rendered: {} - {}",
            notification.title, notification.body
        );
        self.rendered.write().push(notification);
    }

    /// 已渲染通知的快照（到达顺序）
    pub fn rendered(&self) -> Vec<RenderedNotification> {
        self.rendered.read().clone()
    }

    pub fn len(&self) -> usize {
        self.rendered.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rendered.read().is_empty()
    }

    pub fn last(&self) -> Option<RenderedNotification> {
        self.rendered.read().last().cloned()
    }
}

/// 前台控制器
///
/// 每次页面会话执行一遍：注册后台 Worker → 协商权限 → 获取 token 并注册到
/// 后端 → 消费前台消息流。各阶段失败都被就地捕获，不会让会话崩溃。
pub struct ForegroundController {
    context: ClientContext,
    state: RwLock<SessionState>,
    token: RwLock<Option<String>>,
    ui: Arc<UiState>,
}

impl ForegroundController {
    pub fn new(context: ClientContext) -> Self {
        Self {
            context,
            state: RwLock::new(SessionState::Idle),
            token: RwLock::new(None),
            ui: Arc::new(UiState::default()),
        }
    }

    /// 当前会话状态
    pub async fn state(&self) -> SessionState {
        *self.state.read().await
    }

    /// 当前 DeliveryToken（TokenReady 之前为 None）
    pub async fn token(&self) -> Option<String> {
        self.token.read().await.clone()
    }

    /// 前台 UI 状态句柄
    pub fn ui(&self) -> Arc<UiState> {
        self.ui.clone()
    }

    async fn set_state(&self, next: SessionState) {
        let mut state = self.state.write().await;
        debug!(
            "[CONTROLLER] State: {} -> {}",
            state.as_str(),
            next.as_str()
        );
        *state = next;
    }

    /// 运行一次完整会话，返回终态
    pub async fn run_session(&self) -> Result<SessionState> {
        let config = &self.context.config;

        // 1. 注册后台 Worker（失败非致命：后台通知不可用，流程继续）
        self.set_state(SessionState::WorkerRegistering).await;
        match self
            .context
            .platform
            .register_worker(&config.worker_script_path)
            .await
        {
            Ok(registration) => {
                info!("[CONTROLLER] Worker ready: {}", registration.script_path);
                self.set_state(SessionState::WorkerReady).await;
            }
            Err(e) => {
                warn!(
                    "[CONTROLLER] Worker registration failed, foreground-only mode: {}",
                    e
                );
                self.set_state(SessionState::WorkerFailed).await;
            }
        }

        // 2. 挂上前台消息订阅（与权限/token 无顺序依赖，尽早开始消费）
        self.spawn_foreground_consumer().await?;

        // 3. 权限协商
        self.set_state(SessionState::PermissionPending).await;
        let permission = self.context.platform.request_permission().await?;
        if permission != PermissionState::Granted {
            // denied / default：平台策略禁止自动重新弹窗，直接进入降级终态
            warn!(
                "[CONTROLLER] Notifications unavailable: permission={}",
                permission.as_str()
            );
            self.set_state(SessionState::PermissionDenied).await;
            self.set_state(SessionState::Degraded).await;
            return Ok(SessionState::Degraded);
        }
        self.set_state(SessionState::PermissionGranted).await;

        // 4. 获取 token 并注册到后端
        self.set_state(SessionState::TokenFetching).await;
        match self.fetch_token_with_retry().await {
            Ok(token) => {
                info!("[CONTROLLER] Delivery token ready");
                *self.token.write().await = Some(token.clone());
                self.set_state(SessionState::TokenReady).await;

                // Sink 失败只影响后端注册，不影响会话结果
                let registration = DeviceRegistration::new(
                    token,
                    config.device_name.clone(),
                    self.context.provider.kind().as_str(),
                );
                if let Err(e) = self.context.sink.register_token(&registration).await {
                    warn!("[CONTROLLER] Token sink registration failed: {}", e);
                }
                Ok(SessionState::TokenReady)
            }
            Err(e) => {
                error!(
                    "[CONTROLLER] Token fetch failed, delivery unavailable: {}",
                    e
                );
                self.set_state(SessionState::TokenFailed).await;
                Ok(SessionState::TokenFailed)
            }
        }
    }

    /// 带重试的 token 获取（有界指数退避 + 抖动，单请求串行在途）
    async fn fetch_token_with_retry(&self) -> Result<String> {
        let retry = &self.context.config.token_retry;
        let mut last_err = None;

        for attempt in 1..=retry.attempts {
            match self.context.provider.fetch_token().await {
                Ok(token) => return Ok(token),
                Err(e) => {
                    warn!(
                        "[CONTROLLER] Token fetch attempt {}/{} failed: {}",
                        attempt, retry.attempts, e
                    );
                    last_err = Some(e);
                    if attempt < retry.attempts {
                        let exp = 1u64 << (attempt - 1).min(10);
                        let backoff = retry
                            .base_delay_ms
                            .saturating_mul(exp)
                            .min(retry.max_delay_ms);
                        let jitter = fastrand::u64(0..=retry.base_delay_ms / 2);
                        tokio::time::sleep(Duration::from_millis(backoff + jitter)).await;
                    }
                }
            }
        }

        Err(last_err
            .unwrap_or_else(|| ClientError::TokenFetchFailed("retries exhausted".to_string())))
    }

    /// 启动前台消息流消费任务
    async fn spawn_foreground_consumer(&self) -> Result<()> {
        let mut stream = self
            .context
            .provider
            .subscribe(DeliveryScope::Foreground)
            .await?;
        let ui = self.ui.clone();

        tokio::spawn(async move {
            while let Some(payload) = stream.recv().await {
                match payload.notification {
                    Some(content) => {
                        ui.render(content, payload.data);
                    }
                    None => {
                        // data-only 消息没有可渲染内容
                        debug!(
                            "[CONTROLLER] Foreground data-only message ignored (keys: {:?})",
                            payload.data.keys().collect::<Vec<_>>()
                        );
                    }
                }
            }
            debug!("[CONTROLLER] Foreground message stream closed");
        });

        Ok(())
    }
}
