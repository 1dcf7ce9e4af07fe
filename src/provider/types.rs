use std::collections::HashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

/// 消息提供商类型
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    Fcm,
    Mock,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Fcm => "fcm",
            ProviderKind::Mock => "mock",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "fcm" => Some(ProviderKind::Fcm),
            "mock" => Some(ProviderKind::Mock),
            _ => None,
        }
    }
}

/// 订阅范围：前台（页面可见）/ 后台（Worker）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeliveryScope {
    Foreground,
    Background,
}

impl DeliveryScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryScope::Foreground => "foreground",
            DeliveryScope::Background => "background",
        }
    }
}

/// 通知内容（title / body）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationContent {
    pub title: String,
    pub body: String,
}

/// 推送 Payload
///
/// `notification` 可能缺失：提供商允许发送 data-only 消息，消费方必须做
/// 防御性处理，不能假定字段存在。Payload 是瞬态的，渲染后即丢弃。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotificationPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification: Option<NotificationContent>,
    #[serde(default)]
    pub data: HashMap<String, String>,
}

impl NotificationPayload {
    /// 构造带通知内容的 Payload
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            notification: Some(NotificationContent {
                title: title.into(),
                body: body.into(),
            }),
            data: HashMap::new(),
        }
    }

    /// 构造 data-only Payload（无通知内容）
    pub fn data_only(data: HashMap<String, String>) -> Self {
        Self {
            notification: None,
            data,
        }
    }

    /// 附加 data 字段
    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }
}

/// 消息流
///
/// 长连接事件流：单消费者、不可重启，流关闭即订阅终止。
pub struct MessageStream {
    receiver: mpsc::Receiver<NotificationPayload>,
}

impl MessageStream {
    pub(crate) fn new(receiver: mpsc::Receiver<NotificationPayload>) -> Self {
        Self { receiver }
    }

    /// 接收下一条消息；流关闭时返回 None
    pub async fn recv(&mut self) -> Option<NotificationPayload> {
        self.receiver.recv().await
    }

    /// 转为 `futures::Stream`
    pub fn into_stream(self) -> ReceiverStream<NotificationPayload> {
        ReceiverStream::new(self.receiver)
    }
}
