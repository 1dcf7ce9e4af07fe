use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashSet;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::error::{ClientError, Result};

/// 通知权限状态（平台持有，只能通过用户授权弹窗改变）
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum PermissionState {
    Default,
    Granted,
    Denied,
}

impl PermissionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PermissionState::Default => "default",
            PermissionState::Granted => "granted",
            PermissionState::Denied => "denied",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "default" => Some(PermissionState::Default),
            "granted" => Some(PermissionState::Granted),
            "denied" => Some(PermissionState::Denied),
            _ => None,
        }
    }

    /// 是否已有明确结果（granted / denied）
    pub fn is_resolved(&self) -> bool {
        !matches!(self, PermissionState::Default)
    }
}

/// 后台 Worker 注册句柄
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerRegistration {
    /// 注册的脚本路径
    pub script_path: String,
    /// 注册时间
    pub registered_at: DateTime<Utc>,
}

/// 通知展示选项
#[derive(Debug, Clone, Default)]
pub struct NotificationOptions {
    /// 通知正文
    pub body: String,
    /// 图标资源路径
    pub icon: Option<String>,
}

/// 已展示的通知记录（模拟平台用于断言）
#[derive(Debug, Clone)]
pub struct DisplayedNotification {
    pub title: String,
    pub body: String,
    pub icon: Option<String>,
    pub shown_at: DateTime<Utc>,
}

/// 平台接口（通知权限 / Worker 注册 / 通知展示）
#[async_trait]
pub trait Platform: Send + Sync {
    /// 查询当前权限状态（不弹窗）
    async fn permission_state(&self) -> PermissionState;

    /// 请求通知权限
    ///
    /// 幂等：已有明确结果时直接返回，不会再次弹窗（平台策略禁止重复打扰）。
    async fn request_permission(&self) -> Result<PermissionState>;

    /// 注册后台 Worker 脚本
    ///
    /// 每个源至多一个活跃注册；对已注册路径重复注册是 no-op 成功。
    async fn register_worker(&self, script_path: &str) -> Result<WorkerRegistration>;

    /// 展示一条平台通知
    async fn show_notification(&self, title: &str, options: &NotificationOptions) -> Result<()>;
}

/// 模拟平台实现
///
/// 在进程内模拟权限弹窗、Worker 注册与通知面板，演示与测试共用。
/// 弹窗结果通过 `prompt_outcome` 预先编排。
pub struct SimulatedPlatform {
    /// 当前权限状态
    permission: RwLock<PermissionState>,
    /// 用户在弹窗里给出的回答
    prompt_outcome: PermissionState,
    /// 实际弹窗次数
    prompt_count: AtomicU32,
    /// 当前源上的活跃注册（至多一个）
    registration: RwLock<Option<WorkerRegistration>>,
    /// 会 404 的脚本路径（模拟脚本拉取失败）
    missing_scripts: DashSet<String>,
    /// 已展示的通知
    displayed: RwLock<Vec<DisplayedNotification>>,
}

impl SimulatedPlatform {
    pub fn new() -> Self {
        Self {
            permission: RwLock::new(PermissionState::Default),
            prompt_outcome: PermissionState::Granted,
            prompt_count: AtomicU32::new(0),
            registration: RwLock::new(None),
            missing_scripts: DashSet::new(),
            displayed: RwLock::new(Vec::new()),
        }
    }

    /// 编排弹窗结果
    pub fn with_prompt_outcome(mut self, outcome: PermissionState) -> Self {
        self.prompt_outcome = outcome;
        self
    }

    /// 让指定脚本路径 404（注册将失败）
    pub fn with_missing_script(self, script_path: &str) -> Self {
        self.missing_scripts.insert(script_path.to_string());
        self
    }

    pub fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// 实际弹窗次数（幂等性断言用）
    pub fn prompt_count(&self) -> u32 {
        self.prompt_count.load(Ordering::SeqCst)
    }

    /// 当前活跃注册
    pub async fn registration(&self) -> Option<WorkerRegistration> {
        self.registration.read().await.clone()
    }

    /// 已展示通知的快照
    pub async fn displayed_notifications(&self) -> Vec<DisplayedNotification> {
        self.displayed.read().await.clone()
    }
}

impl Default for SimulatedPlatform {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Platform for SimulatedPlatform {
    async fn permission_state(&self) -> PermissionState {
        *self.permission.read().await
    }

    async fn request_permission(&self) -> Result<PermissionState> {
        let mut permission = self.permission.write().await;

        // 已有明确结果：直接返回，不再弹窗
        if permission.is_resolved() {
            debug!(
                "[PLATFORM] Permission already resolved: {}",
                permission.as_str()
            );
            return Ok(*permission);
        }

        // 弹窗，用户给出编排好的回答
        self.prompt_count.fetch_add(1, Ordering::SeqCst);
        *permission = self.prompt_outcome;
        info!(
            "[PLATFORM] Permission prompt answered: {}",
            permission.as_str()
        );
        Ok(*permission)
    }

    async fn register_worker(&self, script_path: &str) -> Result<WorkerRegistration> {
        if self.missing_scripts.contains(script_path) {
            return Err(ClientError::RegistrationFailed(format!(
                "worker script not found (404): {}",
                script_path
            )));
        }

        let mut registration = self.registration.write().await;

        // 重复注册同一路径：no-op 成功，返回现有句柄
        if let Some(existing) = registration.as_ref() {
            if existing.script_path == script_path {
                debug!(
                    "[PLATFORM] Worker already registered: {}",
                    script_path
                );
                return Ok(existing.clone());
            }
            // 换脚本路径视为更新注册，旧注册被替换
            warn!(
                "[PLATFORM] Replacing worker registration: {} -> {}",
                existing.script_path, script_path
            );
        }

        let handle = WorkerRegistration {
            script_path: script_path.to_string(),
            registered_at: Utc::now(),
        };
        *registration = Some(handle.clone());
        info!("[PLATFORM] Worker registered: {}", script_path);
        Ok(handle)
    }

    async fn show_notification(&self, title: &str, options: &NotificationOptions) -> Result<()> {
        let record = DisplayedNotification {
            title: title.to_string(),
            body: options.body.clone(),
            icon: options.icon.clone(),
            shown_at: Utc::now(),
        };
        info!(
            "[PLATFORM] Notification shown: title={}, body={}",
            record.title, record.body
        );
        self.displayed.write().await.push(record);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_permission_prompt_is_idempotent() {
        let platform = SimulatedPlatform::new().with_prompt_outcome(PermissionState::Granted);

        let first = platform.request_permission().await.unwrap();
        let second = platform.request_permission().await.unwrap();

        assert_eq!(first, PermissionState::Granted);
        assert_eq!(second, PermissionState::Granted);
        // 已授权后不会再次弹窗
        assert_eq!(platform.prompt_count(), 1);
    }

    #[tokio::test]
    async fn test_register_worker_twice_is_noop() {
        let platform = SimulatedPlatform::new();

        let first = platform.register_worker("/push-worker.js").await.unwrap();
        let second = platform.register_worker("/push-worker.js").await.unwrap();

        assert_eq!(first.script_path, second.script_path);
        assert_eq!(first.registered_at, second.registered_at);
        assert!(platform.registration().await.is_some());
    }

    #[tokio::test]
    async fn test_missing_script_fails_registration() {
        let platform = SimulatedPlatform::new().with_missing_script("/push-worker.js");

        let result = platform.register_worker("/push-worker.js").await;
        assert!(matches!(result, Err(ClientError::RegistrationFailed(_))));
        assert!(platform.registration().await.is_none());
    }
}
