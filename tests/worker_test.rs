//! 后台 Worker 集成测试
//!
//! 测试场景：
//! 1. 后台消息经平台通知面板展示（带固定图标）
//! 2. 缺失 notification 字段的消息：不 panic、不展示，记录后丢弃
//! 3. 单条消息失败不中断处理循环

use std::sync::Arc;
use std::time::Duration;

use privpush::{
    BackgroundWorker, ClientConfig, ClientContext, DeliveryScope, LogSink, MockProvider,
    NotificationPayload, SimulatedPlatform,
};

fn setup(
    platform: Arc<SimulatedPlatform>,
) -> (BackgroundWorker, privpush::MockHandle) {
    let mut config = ClientConfig::default();
    config.provider_kind = "mock".to_string();
    config.notification_icon = "/notification-logo.png".to_string();

    let provider = MockProvider::new();
    let handle = provider.handle();
    let context = ClientContext::new(
        Arc::new(config),
        Arc::new(provider),
        platform,
        Arc::new(LogSink),
    );
    (BackgroundWorker::new(context), handle)
}

/// 轮询等待条件成立
async fn wait_until<F, Fut>(mut condition: F)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..100 {
        if condition().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached within timeout");
}

// ============================================================
// 测试场景 1: 后台消息展示
// ============================================================

#[tokio::test]
async fn test_background_message_shows_notification() {
    let platform = SimulatedPlatform::new().into_arc();
    let (worker, handle) = setup(platform.clone());

    let _task = worker.start().await.unwrap();

    handle
        .inject(
            DeliveryScope::Background,
            NotificationPayload::new("新消息", "来自后台的推送"),
        )
        .await
        .unwrap();

    let p = platform.clone();
    wait_until(move || {
        let p = p.clone();
        async move { p.displayed_notifications().await.len() == 1 }
    })
    .await;

    let displayed = platform.displayed_notifications().await;
    assert_eq!(displayed.len(), 1);
    assert_eq!(displayed[0].title, "新消息");
    assert_eq!(displayed[0].body, "来自后台的推送");
    assert_eq!(displayed[0].icon.as_deref(), Some("/notification-logo.png"));
}

// ============================================================
// 测试场景 2: data-only 消息防御性处理
// ============================================================

#[tokio::test]
async fn test_data_only_payload_is_dropped_without_display() {
    let platform = SimulatedPlatform::new().into_arc();
    let (worker, handle) = setup(platform.clone());

    let _task = worker.start().await.unwrap();

    let mut data = std::collections::HashMap::new();
    data.insert("silent".to_string(), "true".to_string());
    handle
        .inject(DeliveryScope::Background, NotificationPayload::data_only(data))
        .await
        .unwrap();

    // 给消费者留出处理时间，再确认没有任何展示
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(platform.displayed_notifications().await.is_empty());
}

// ============================================================
// 测试场景 3: 单条失败不中断循环
// ============================================================

#[tokio::test]
async fn test_worker_continues_after_malformed_payload() {
    let platform = SimulatedPlatform::new().into_arc();
    let (worker, handle) = setup(platform.clone());

    let _task = worker.start().await.unwrap();

    // 先投一条畸形消息，再投一条正常消息
    handle
        .inject(
            DeliveryScope::Background,
            NotificationPayload::data_only(Default::default()),
        )
        .await
        .unwrap();
    handle
        .inject(
            DeliveryScope::Background,
            NotificationPayload::new("正常消息", "畸形消息之后照常处理"),
        )
        .await
        .unwrap();

    let p = platform.clone();
    wait_until(move || {
        let p = p.clone();
        async move { p.displayed_notifications().await.len() == 1 }
    })
    .await;

    let displayed = platform.displayed_notifications().await;
    assert_eq!(displayed.len(), 1);
    assert_eq!(displayed[0].title, "正常消息");
}
