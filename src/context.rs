use std::sync::Arc;

use crate::config::ClientConfig;
use crate::platform::Platform;
use crate::provider::MessagingProvider;
use crate::sink::TokenSink;

/// 客户端上下文
///
/// 启动时构造一次的显式句柄集合，按引用传给需要它的组件。所有协作方
/// （配置 / Provider / 平台 / Sink）都经由这里流动，不存在模块级单例。
#[derive(Clone)]
pub struct ClientContext {
    /// 客户端配置（只读共享）
    pub config: Arc<ClientConfig>,
    /// 消息提供商
    pub provider: Arc<dyn MessagingProvider>,
    /// 平台接口
    pub platform: Arc<dyn Platform>,
    /// Token Sink（应用后端）
    pub sink: Arc<dyn TokenSink>,
}

impl ClientContext {
    /// 创建新的客户端上下文
    pub fn new(
        config: Arc<ClientConfig>,
        provider: Arc<dyn MessagingProvider>,
        platform: Arc<dyn Platform>,
        sink: Arc<dyn TokenSink>,
    ) -> Self {
        Self {
            config,
            provider,
            platform,
            sink,
        }
    }
}
