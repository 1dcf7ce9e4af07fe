use std::sync::Arc;

use privpush::{
    ClientConfig, ClientContext, LogSink, MockProvider, PermissionState, PushClient,
    SimulatedPlatform,
};

// 降级路径演示：Worker 脚本 404 + 用户拒绝授权
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    println!("🚀 降级会话演示开始");

    // 场景 1: Worker 脚本 404，授权照常走完
    println!("📋 场景1: Worker 注册失败（脚本 404）");
    let mut config = ClientConfig::default();
    config.provider_kind = "mock".to_string();

    let platform = SimulatedPlatform::new()
        .with_prompt_outcome(PermissionState::Granted)
        .with_missing_script(&config.worker_script_path)
        .into_arc();
    let provider = MockProvider::with_token("degraded-demo-token");
    let context = ClientContext::new(
        Arc::new(config.clone()),
        Arc::new(provider),
        platform.clone(),
        Arc::new(LogSink),
    );
    let client = PushClient::from_context(context);
    let state = client.run().await?;
    println!("✅ 终态: {}（后台通知不可用，前台与 token 正常）", state.as_str());
    println!("   - 活跃注册: {:?}", platform.registration().await);
    println!("   - Token: {:?}", client.controller().token().await);

    // 场景 2: 用户拒绝授权
    println!("📋 场景2: 权限被拒绝");
    let mut config = ClientConfig::default();
    config.provider_kind = "mock".to_string();
    config.permission_prompt = "denied".to_string();

    let client = PushClient::new(config)?;
    let state = client.run().await?;
    println!("✅ 终态: {}（拒绝后绝不触发 token 获取）", state.as_str());
    println!("   - Token: {:?}", client.controller().token().await);

    println!("🎉 演示完成！");
    Ok(())
}
