use anyhow::{Context, Result};
use privpush::{
    cli::{Cli, Commands},
    config::{self, ClientConfig},
    logging, PushClient,
};
use std::fs;
use std::path::Path;
use std::process;

#[tokio::main]
async fn main() -> Result<()> {
    // 加载 .env 文件（如果存在）
    let _ = dotenvy::dotenv();

    // 解析命令行参数
    let cli = Cli::parse();

    // 处理子命令
    if let Some(command) = &cli.command {
        match command {
            Commands::GenerateConfig { path } => {
                return generate_config(path);
            }
            Commands::ValidateConfig { path } => {
                return validate_config(path);
            }
            Commands::ShowConfig => {
                return show_config(&cli);
            }
        }
    }

    // 快速读取 config.toml 的 [logging] 段（不加载完整配置）
    let early_log = config::load_early_logging_config(cli.config_file.as_deref());

    // 合并日志配置（优先级：CLI > config.toml > 默认值）
    let log_level = cli
        .get_log_level()
        .or(early_log.level)
        .unwrap_or_else(|| "info".to_string());
    let log_format = cli.get_log_format().or(early_log.format);
    let log_file = cli.log_file.as_deref().or(early_log.file.as_deref());

    let _log_guard = logging::init_logging(&log_level, log_format.as_deref(), log_file, cli.quiet)?;

    tracing::info!("🚀 PrivPush Client starting...");

    // 加载配置（按优先级：命令行 > 环境变量 > 配置文件 > 默认值）
    let mut config = ClientConfig::load(&cli).context("加载配置失败")?;

    // 凭据托管在后端时，从远程接口拉取 Provider 配置
    if let Some(url) = &cli.remote_config_url {
        config
            .apply_remote_config(url)
            .await
            .context("远程配置拉取失败")?;
    }

    if cli.dev {
        tracing::info!("🔧 开发模式已启用");
    }

    // 显示配置信息
    tracing::info!("📊 Client Configuration:");
    tracing::info!("  - Provider: {}", config.provider_kind);
    tracing::info!("  - Project ID: {}", config.provider.project_id);
    tracing::info!("  - Worker Script: {}", config.worker_script_path);
    tracing::info!("  - Notification Icon: {}", config.notification_icon);
    tracing::info!("  - Token Sink: {}", config.sink.kind);
    tracing::info!("  - Permission Prompt: {}", config.permission_prompt);
    tracing::info!("  - Token Retry Attempts: {}", config.token_retry.attempts);
    tracing::info!("  - Log Level: {}", log_level);
    tracing::info!(
        "  - Log Format: {:?}",
        log_format.as_deref().unwrap_or("compact")
    );
    if let Some(f) = log_file {
        tracing::info!("  - Log File: {}", f);
    }

    // 创建客户端（配置校验失败会打印错误并退出）
    let client = match PushClient::new(config) {
        Ok(client) => client,
        Err(e) => {
            tracing::error!("❌ 客户端初始化失败: {}", e);
            tracing::error!("💡 请检查配置与凭据注入方式后重试");
            process::exit(1);
        }
    };

    // 运行会话
    let final_state = match client.run().await {
        Ok(state) => state,
        Err(e) => {
            tracing::error!("❌ 会话运行失败: {}", e);
            process::exit(1);
        }
    };

    // 演示模式：注入示例消息，观察前台渲染与后台通知
    if cli.demo {
        run_demo(&client).await;
    }

    tracing::info!("✅ PrivPush Client exiting (state={})", final_state.as_str());
    Ok(())
}

/// 注入示例消息并打印两条投递路径的结果
async fn run_demo(client: &PushClient) {
    use privpush::provider::{DeliveryScope, NotificationPayload};

    let Some(handle) = client.mock_handle() else {
        tracing::warn!("⚠️ --demo 仅在 provider=mock 下可用");
        return;
    };

    tracing::info!("🎬 注入示例消息...");
    let _ = handle
        .inject(
            DeliveryScope::Foreground,
            NotificationPayload::new("前台消息", "页面可见时直接渲染到 UI")
                .with_data("kind", "demo"),
        )
        .await;
    let _ = handle
        .inject(
            DeliveryScope::Background,
            NotificationPayload::new("后台消息", "经平台通知面板展示"),
        )
        .await;

    // 等待两个异步消费者处理完
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;

    for n in client.controller().ui().rendered() {
        tracing::info!("🖼️ UI rendered: {} - {}", n.title, n.body);
    }
    if let Some(platform) = client.simulated_platform() {
        for n in platform.displayed_notifications().await {
            tracing::info!("🔔 Notification shown: {} - {}", n.title, n.body);
        }
    }
}

/// 生成默认配置文件
fn generate_config(path: &str) -> Result<()> {
    if Path::new(path).exists() {
        anyhow::bail!("配置文件已存在: {}", path);
    }

    let config = ClientConfig::default();
    fs::write(path, config.to_toml_string()?)
        .with_context(|| format!("无法写入配置文件: {}", path))?;

    println!("✅ 默认配置已生成: {}", path);
    Ok(())
}

/// 验证配置文件
fn validate_config(path: &str) -> Result<()> {
    let config = ClientConfig::from_toml_file(path)?;
    config.validate()?;
    println!("✅ 配置有效: {}", path);
    Ok(())
}

/// 显示最终配置（合并后的配置）
fn show_config(cli: &Cli) -> Result<()> {
    let config = ClientConfig::load(cli)?;
    println!("{}", config.to_toml_string()?);
    Ok(())
}
