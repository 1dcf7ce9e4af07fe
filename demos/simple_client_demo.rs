use tokio::time::{sleep, Duration};

use privpush::provider::{DeliveryScope, NotificationPayload};
use privpush::{ClientConfig, PushClient};

// 完整会话演示：注册 Worker → 授权 → 获取 token → 两条投递路径
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 初始化日志
    tracing_subscriber::fmt::init();

    println!("🚀 PrivPush 客户端会话演示开始");

    // mock provider + 授权通过的模拟平台
    let mut config = ClientConfig::default();
    config.provider_kind = "mock".to_string();
    config.permission_prompt = "granted".to_string();

    let client = PushClient::new(config)?;
    let final_state = client.run().await?;

    println!("✅ 会话完成: state={}", final_state.as_str());
    println!(
        "   - DeliveryToken: {:?}",
        client.controller().token().await
    );

    // 注入一条前台消息、一条后台消息
    let handle = client.mock_handle().expect("mock provider");
    handle
        .inject(
            DeliveryScope::Foreground,
            NotificationPayload::new("前台消息", "页面可见时直接渲染").with_data("kind", "demo"),
        )
        .await?;
    handle
        .inject(
            DeliveryScope::Background,
            NotificationPayload::new("后台消息", "经平台通知面板展示"),
        )
        .await?;

    sleep(Duration::from_millis(200)).await;

    println!("📥 前台 UI 渲染结果:");
    for n in client.controller().ui().rendered() {
        println!("   - {} / {} (data: {:?})", n.title, n.body, n.data);
    }

    println!("🔔 平台通知面板:");
    let platform = client.simulated_platform().expect("simulated platform");
    for n in platform.displayed_notifications().await {
        println!("   - {} / {} (icon: {:?})", n.title, n.body, n.icon);
    }

    println!("🎉 演示完成！");
    Ok(())
}
