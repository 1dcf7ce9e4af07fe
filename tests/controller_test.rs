//! 前台控制器集成测试
//!
//! 测试场景：
//! 1. 授权会话端到端到达 TokenReady
//! 2. 拒绝授权直接进入降级终态（绝不触发 token 获取）
//! 3. Worker 注册失败不阻塞权限/token 流程
//! 4. 前台消息按到达顺序恰好渲染一次（不去重）
//! 5. Token 获取失败耗尽重试后进入 TokenFailed

use std::sync::Arc;
use std::time::Duration;

use privpush::{
    ClientConfig, ClientContext, DeliveryScope, ForegroundController, LogSink, MockProvider,
    NotificationPayload, PermissionState, SessionState, SimulatedPlatform,
};

/// 搭建测试上下文（mock provider + 模拟平台 + log sink）
fn setup(
    platform: Arc<SimulatedPlatform>,
    config: ClientConfig,
) -> (ForegroundController, privpush::MockHandle) {
    let provider = MockProvider::with_token("tok-123");
    let handle = provider.handle();
    let context = ClientContext::new(
        Arc::new(config),
        Arc::new(provider),
        platform,
        Arc::new(LogSink),
    );
    (ForegroundController::new(context), handle)
}

fn fast_retry_config() -> ClientConfig {
    let mut config = ClientConfig::default();
    config.provider_kind = "mock".to_string();
    config.token_retry.attempts = 2;
    config.token_retry.base_delay_ms = 1;
    config.token_retry.max_delay_ms = 2;
    config
}

/// 轮询等待条件成立（异步消费者处理需要时间）
async fn wait_until<F>(mut condition: F)
where
    F: FnMut() -> bool,
{
    for _ in 0..100 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached within timeout");
}

// ============================================================
// 测试场景 1: 授权会话端到端
// ============================================================

#[tokio::test]
async fn test_granted_session_reaches_token_ready() {
    let platform = SimulatedPlatform::new()
        .with_prompt_outcome(PermissionState::Granted)
        .into_arc();
    let (controller, handle) = setup(platform.clone(), fast_retry_config());

    let final_state = controller.run_session().await.unwrap();

    assert_eq!(final_state, SessionState::TokenReady);
    assert_eq!(controller.state().await, SessionState::TokenReady);
    assert_eq!(controller.token().await.as_deref(), Some("tok-123"));
    assert_eq!(handle.token_fetch_count(), 1);
    // Worker 注册成功
    assert!(platform.registration().await.is_some());
}

#[tokio::test]
async fn test_token_is_stable_across_fetches() {
    let platform = SimulatedPlatform::new().into_arc();
    let (controller, _handle) = setup(platform, fast_retry_config());

    controller.run_session().await.unwrap();
    let first = controller.token().await.unwrap();

    // 无提供商侧轮换时，再次获取返回同一 token
    let provider = MockProvider::with_token("tok-123");
    use privpush::MessagingProvider;
    let again = provider.fetch_token().await.unwrap();
    let twice = provider.fetch_token().await.unwrap();

    assert_eq!(first, "tok-123");
    assert_eq!(again, twice);
}

// ============================================================
// 测试场景 2: 拒绝授权 → 降级终态
// ============================================================

#[tokio::test]
async fn test_denied_session_is_degraded_without_token_fetch() {
    let platform = SimulatedPlatform::new()
        .with_prompt_outcome(PermissionState::Denied)
        .into_arc();
    let (controller, handle) = setup(platform, fast_retry_config());

    let final_state = controller.run_session().await.unwrap();

    assert_eq!(final_state, SessionState::Degraded);
    assert_eq!(controller.state().await, SessionState::Degraded);
    assert!(controller.token().await.is_none());
    // 拒绝之后绝不能触发 token 获取
    assert_eq!(handle.token_fetch_count(), 0);
}

#[tokio::test]
async fn test_unanswered_prompt_also_degrades() {
    // 用户关掉弹窗（保持 default）同样进入降级终态，且不自动重新弹窗
    let platform = SimulatedPlatform::new()
        .with_prompt_outcome(PermissionState::Default)
        .into_arc();
    let (controller, handle) = setup(platform.clone(), fast_retry_config());

    let final_state = controller.run_session().await.unwrap();

    assert_eq!(final_state, SessionState::Degraded);
    assert_eq!(handle.token_fetch_count(), 0);
    assert_eq!(platform.prompt_count(), 1);
}

// ============================================================
// 测试场景 3: Worker 注册失败（404）不阻塞流程
// ============================================================

#[tokio::test]
async fn test_registration_failure_does_not_block_flow() {
    let config = fast_retry_config();
    let platform = SimulatedPlatform::new()
        .with_prompt_outcome(PermissionState::Granted)
        .with_missing_script(&config.worker_script_path)
        .into_arc();
    let (controller, handle) = setup(platform.clone(), config);

    let final_state = controller.run_session().await.unwrap();

    // 注册失败只降级为仅前台模式，权限与 token 流程照常走完
    assert_eq!(final_state, SessionState::TokenReady);
    assert_eq!(handle.token_fetch_count(), 1);
    assert!(platform.registration().await.is_none());
}

// ============================================================
// 测试场景 4: 前台消息渲染（顺序、恰好一次、不去重）
// ============================================================

#[tokio::test]
async fn test_foreground_message_renders_exactly_once() {
    let platform = SimulatedPlatform::new().into_arc();
    let (controller, handle) = setup(platform, fast_retry_config());

    controller.run_session().await.unwrap();

    handle
        .inject(
            DeliveryScope::Foreground,
            NotificationPayload::new("A", "B"),
        )
        .await
        .unwrap();

    let ui = controller.ui();
    wait_until(|| ui.len() == 1).await;

    let rendered = ui.rendered();
    assert_eq!(rendered.len(), 1);
    assert_eq!(rendered[0].title, "A");
    assert_eq!(rendered[0].body, "B");
}

#[tokio::test]
async fn test_foreground_messages_render_in_arrival_order() {
    let platform = SimulatedPlatform::new().into_arc();
    let (controller, handle) = setup(platform, fast_retry_config());

    controller.run_session().await.unwrap();

    for i in 1..=3 {
        handle
            .inject(
                DeliveryScope::Foreground,
                NotificationPayload::new(format!("msg-{}", i), "body"),
            )
            .await
            .unwrap();
    }

    let ui = controller.ui();
    wait_until(|| ui.len() == 3).await;

    let titles: Vec<String> = ui.rendered().into_iter().map(|n| n.title).collect();
    assert_eq!(titles, vec!["msg-1", "msg-2", "msg-3"]);
}

#[tokio::test]
async fn test_redelivered_message_renders_twice() {
    // 不做去重：提供商重投递就重复渲染（重投递语义归提供商）
    let platform = SimulatedPlatform::new().into_arc();
    let (controller, handle) = setup(platform, fast_retry_config());

    controller.run_session().await.unwrap();

    let payload = NotificationPayload::new("dup", "same");
    handle
        .inject(DeliveryScope::Foreground, payload.clone())
        .await
        .unwrap();
    handle
        .inject(DeliveryScope::Foreground, payload)
        .await
        .unwrap();

    let ui = controller.ui();
    wait_until(|| ui.len() == 2).await;
    assert_eq!(ui.len(), 2);
}

#[tokio::test]
async fn test_foreground_data_only_message_renders_nothing() {
    let platform = SimulatedPlatform::new().into_arc();
    let (controller, handle) = setup(platform, fast_retry_config());

    controller.run_session().await.unwrap();

    let mut data = std::collections::HashMap::new();
    data.insert("k".to_string(), "v".to_string());
    handle
        .inject(DeliveryScope::Foreground, NotificationPayload::data_only(data))
        .await
        .unwrap();
    handle
        .inject(
            DeliveryScope::Foreground,
            NotificationPayload::new("after", "data-only"),
        )
        .await
        .unwrap();

    let ui = controller.ui();
    wait_until(|| ui.len() == 1).await;

    // data-only 消息没有可渲染内容，后续消息照常处理
    let rendered = ui.rendered();
    assert_eq!(rendered.len(), 1);
    assert_eq!(rendered[0].title, "after");
}

// ============================================================
// 测试场景 5: Token 获取失败 → TokenFailed
// ============================================================

#[tokio::test]
async fn test_token_fetch_failure_lands_in_token_failed() {
    let platform = SimulatedPlatform::new().into_arc();
    let (controller, handle) = setup(platform, fast_retry_config());
    handle.set_token_fetch_failure(true);

    let final_state = controller.run_session().await.unwrap();

    assert_eq!(final_state, SessionState::TokenFailed);
    assert!(controller.token().await.is_none());
    // 重试策略：attempts=2，耗尽后不再自动尝试
    assert_eq!(handle.token_fetch_count(), 2);
}
