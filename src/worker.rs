use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::context::ClientContext;
use crate::error::{ClientError, Result};
use crate::platform::{NotificationOptions, Platform};
use crate::provider::NotificationPayload;

/// 后台 Worker
///
/// 职责：
/// - 启动时用共享的 ProviderConfig 初始化（平台每次激活都会重走一遍）
/// - 订阅后台消息流
/// - 逐条把 notification.title / notification.body 交给平台通知面板展示
///
/// 独立执行上下文，无页面 DOM/UI 访问；处理是 fire-and-forget 的，单条
/// 失败只记录日志，不中断循环。
pub struct BackgroundWorker {
    context: ClientContext,
}

impl BackgroundWorker {
    pub fn new(context: ClientContext) -> Self {
        Self { context }
    }

    /// 初始化并启动后台消息处理，返回任务句柄
    pub async fn start(&self) -> Result<JoinHandle<()>> {
        let config = &self.context.config;
        info!(
            "[WORKER] Background worker starting: project_id={}, icon={}",
            config.provider.project_id, config.notification_icon
        );

        let mut stream = self
            .context
            .provider
            .subscribe(crate::provider::DeliveryScope::Background)
            .await?;
        let platform = self.context.platform.clone();
        let icon = config.notification_icon.clone();

        let handle = tokio::spawn(async move {
            while let Some(payload) = stream.recv().await {
                match Self::handle_message(&platform, &icon, payload).await {
                    Ok(()) => {}
                    Err(ClientError::MalformedPayload(msg)) => {
                        // 缺字段的消息：记录后丢弃（而不是无声吞掉）
                        warn!("[WORKER] Message dropped: {}", msg);
                    }
                    Err(e) => {
                        error!("[WORKER] Failed to handle background message: {}", e);
                    }
                }
            }
            info!("[WORKER] Background message stream closed");
        });

        Ok(handle)
    }

    /// 处理单条后台消息
    ///
    /// `notification` 字段可能缺失（data-only 消息），必须守护访问：
    /// 既不能 panic，也不能展示 title/body 为空的通知。
    async fn handle_message(
        platform: &Arc<dyn Platform>,
        icon: &str,
        payload: NotificationPayload,
    ) -> Result<()> {
        let Some(content) = payload.notification else {
            return Err(ClientError::MalformedPayload(format!(
                "payload missing notification field (data keys: {:?})",
                payload.data.keys().collect::<Vec<_>>()
            )));
        };

        platform
            .show_notification(
                &content.title,
                &NotificationOptions {
                    body: content.body,
                    icon: Some(icon.to_string()),
                },
            )
            .await
    }
}
