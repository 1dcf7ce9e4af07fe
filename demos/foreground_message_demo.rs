use std::sync::Arc;
use futures::StreamExt;
use tokio::time::{sleep, Duration};

use privpush::provider::{DeliveryScope, NotificationPayload};
use privpush::{MessagingProvider, MockProvider};

// 前台消息流演示：以 futures::Stream 方式消费订阅流
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    println!("🚀 前台消息流演示开始");

    let provider = Arc::new(MockProvider::with_token("demo-token"));
    let handle = provider.handle();

    // 订阅前台消息流并转为 futures::Stream
    let stream = provider.subscribe(DeliveryScope::Foreground).await?;
    let consumer = tokio::spawn(async move {
        let mut stream = stream.into_stream();
        while let Some(payload) = stream.next().await {
            match payload.notification {
                Some(content) => println!("📥 收到: {} / {}", content.title, content.body),
                None => println!("📦 data-only 消息: {:?}", payload.data),
            }
        }
        println!("📪 消息流关闭");
    });

    // 逐条注入，观察到达顺序
    for i in 1..=5 {
        handle
            .inject(
                DeliveryScope::Foreground,
                NotificationPayload::new(format!("消息 {}", i), "按到达顺序渲染"),
            )
            .await?;
        sleep(Duration::from_millis(50)).await;
    }

    // 一条 data-only 消息（无可渲染内容）
    let mut data = std::collections::HashMap::new();
    data.insert("sync".to_string(), "inbox".to_string());
    handle
        .inject(DeliveryScope::Foreground, NotificationPayload::data_only(data))
        .await?;

    sleep(Duration::from_millis(200)).await;
    drop(handle);
    drop(provider);
    let _ = consumer.await;

    println!("🎉 演示完成！");
    Ok(())
}
