use crate::error::Result;
use crate::provider::types::{DeliveryScope, MessageStream, ProviderKind};
use async_trait::async_trait;

/// Messaging Provider Trait（消息提供商接口）
///
/// 对外部推送 SDK 的不透明封装：本系统只依赖调用/回调形状，token 管理与
/// 消息投递语义（重投递、去重、多设备）全部归提供商所有。
#[async_trait]
pub trait MessagingProvider: Send + Sync {
    /// 获取 DeliveryToken
    ///
    /// 惰性注册：首次调用才向提供商申请；提供商可能缓存，轮换不可见，
    /// 调用方按需重取即可。
    async fn fetch_token(&self) -> Result<String>;

    /// 订阅指定范围的消息流
    ///
    /// 每个范围单消费者；重复订阅会替换旧消费者（旧流随之关闭）。
    async fn subscribe(&self, scope: DeliveryScope) -> Result<MessageStream>;

    /// 获取 Provider 对应的类型
    fn kind(&self) -> ProviderKind;
}
