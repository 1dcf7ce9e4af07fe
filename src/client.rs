use std::sync::Arc;
use tracing::info;

use crate::config::ClientConfig;
use crate::context::ClientContext;
use crate::controller::{ForegroundController, SessionState};
use crate::error::{ClientError, Result};
use crate::platform::{PermissionState, Platform, SimulatedPlatform};
use crate::provider::{FcmProvider, MessagingProvider, MockHandle, MockProvider};
use crate::sink::{HttpTokenSink, LogSink, TokenSink};
use crate::worker::BackgroundWorker;

/// 推送客户端
///
/// 组装配置、Provider、平台与 Sink，并驱动一次完整会话：后台 Worker 先行
/// 启动（其生命周期独立于任何打开的页面），随后运行前台控制器流水线。
pub struct PushClient {
    context: ClientContext,
    controller: Arc<ForegroundController>,
    worker: BackgroundWorker,
    /// provider=mock 时的注入句柄（演示/测试驱动端）
    mock_handle: Option<MockHandle>,
    /// 平台为模拟实现时的具体句柄（读取已展示通知等）
    simulated_platform: Option<Arc<SimulatedPlatform>>,
}

impl PushClient {
    /// 创建新的推送客户端
    pub fn new(config: ClientConfig) -> Result<Self> {
        info!("🔧 初始化推送客户端组件...");
        config
            .validate()
            .map_err(|e| ClientError::Configuration(e.to_string()))?;
        let config = Arc::new(config);

        // Provider（mock / fcm）
        let (provider, mock_handle): (Arc<dyn MessagingProvider>, Option<MockHandle>) =
            match config.provider_kind.as_str() {
                "fcm" => {
                    info!(
                        "📡 Provider: FCM (project_id={})",
                        config.provider.project_id
                    );
                    let provider = FcmProvider::new(Arc::new(config.provider.clone()));
                    (Arc::new(provider), None)
                }
                _ => {
                    info!("📡 Provider: Mock");
                    let provider = MockProvider::new();
                    let handle = provider.handle();
                    (Arc::new(provider), Some(handle))
                }
            };

        // 平台（模拟实现；弹窗结果由配置编排）
        let outcome = PermissionState::from_str(&config.permission_prompt)
            .unwrap_or(PermissionState::Granted);
        let simulated = SimulatedPlatform::new()
            .with_prompt_outcome(outcome)
            .into_arc();
        let platform: Arc<dyn Platform> = simulated.clone();

        // Token Sink（log / http）
        let sink: Arc<dyn TokenSink> = match config.sink.kind.as_str() {
            "http" => {
                let endpoint = config.sink.endpoint.clone().ok_or_else(|| {
                    ClientError::Configuration("sink=http requires endpoint".to_string())
                })?;
                info!("📮 Token Sink: HTTP ({})", endpoint);
                Arc::new(HttpTokenSink::new(endpoint)?)
            }
            _ => {
                info!("📮 Token Sink: Log");
                Arc::new(LogSink)
            }
        };

        let context = ClientContext::new(config, provider, platform, sink);
        let controller = Arc::new(ForegroundController::new(context.clone()));
        let worker = BackgroundWorker::new(context.clone());

        Ok(Self {
            context,
            controller,
            worker,
            mock_handle,
            simulated_platform: Some(simulated),
        })
    }

    /// 使用外部组装好的上下文创建客户端（自定义平台/Provider 时使用）
    pub fn from_context(context: ClientContext) -> Self {
        let controller = Arc::new(ForegroundController::new(context.clone()));
        let worker = BackgroundWorker::new(context.clone());
        Self {
            context,
            controller,
            worker,
            mock_handle: None,
            simulated_platform: None,
        }
    }

    /// 运行一次完整会话，返回终态
    pub async fn run(&self) -> Result<SessionState> {
        // 后台 Worker 先启动：生命周期不依赖页面
        let _worker_task = self.worker.start().await?;

        let final_state = self.controller.run_session().await?;
        info!("🏁 Session finished: state={}", final_state.as_str());
        Ok(final_state)
    }

    pub fn context(&self) -> &ClientContext {
        &self.context
    }

    pub fn controller(&self) -> &ForegroundController {
        &self.controller
    }

    pub fn mock_handle(&self) -> Option<MockHandle> {
        self.mock_handle.clone()
    }

    pub fn simulated_platform(&self) -> Option<Arc<SimulatedPlatform>> {
        self.simulated_platform.clone()
    }
}
