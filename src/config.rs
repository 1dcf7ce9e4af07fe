use std::env;
use std::fs;
use std::path::Path;
use tracing::info;
use serde::{Deserialize, Serialize};
use anyhow::{Result, Context};

/// 提供商凭据配置
///
/// 前台控制器与后台 Worker 共享同一份（只读），两边出现漂移会导致提供商侧
/// 静默鉴权失败。凭据一律来自配置文件 / 环境变量，禁止硬编码在源码里。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// API Key
    pub api_key: String,
    /// 项目 ID
    pub project_id: String,
    /// 发送方 ID
    pub sender_id: String,
    /// 应用 ID
    pub app_id: String,
    /// VAPID 公钥（授权推送订阅）
    pub vapid_key: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: env::var("PUSH_API_KEY")
                .unwrap_or_else(|_| "your_api_key_here".to_string()),
            project_id: env::var("PUSH_PROJECT_ID")
                .unwrap_or_else(|_| "demo-project".to_string()),
            sender_id: env::var("PUSH_SENDER_ID")
                .unwrap_or_else(|_| "000000000000".to_string()),
            app_id: env::var("PUSH_APP_ID")
                .unwrap_or_else(|_| "1:000000000000:web:demo".to_string()),
            vapid_key: env::var("PUSH_VAPID_KEY")
                .unwrap_or_else(|_| "your_vapid_key_here".to_string()),
        }
    }
}

impl ProviderConfig {
    /// 是否仍是占位凭据（未注入真实配置）
    pub fn is_placeholder(&self) -> bool {
        self.api_key.is_empty()
            || self.vapid_key.is_empty()
            || self.api_key.starts_with("your_")
            || self.vapid_key.starts_with("your_")
    }
}

/// Token 获取重试策略（有界指数退避 + 抖动）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// 最大尝试次数（含首次）
    pub attempts: u32,
    /// 基础退避延迟（毫秒）
    pub base_delay_ms: u64,
    /// 退避延迟上限（毫秒）
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            attempts: 3,
            base_delay_ms: 500,
            max_delay_ms: 8000,
        }
    }
}

/// Token Sink 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkConfig {
    /// Sink 类型（log / http）
    pub kind: String,
    /// 后端注册接口地址（kind=http 时必填）
    pub endpoint: Option<String>,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            kind: "log".to_string(),
            endpoint: env::var("PUSH_SINK_ENDPOINT").ok(),
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// 日志级别
    pub level: Option<String>,
    /// 日志格式（pretty / json / compact）
    pub format: Option<String>,
    /// 日志文件路径
    pub file: Option<String>,
}

/// 客户端配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// 消息提供商类型（mock / fcm）
    pub provider_kind: String,
    /// 后台 Worker 脚本路径（必须从源根提供，才能获得推送作用域）
    pub worker_script_path: String,
    /// 通知图标资源路径
    pub notification_icon: String,
    /// 设备名称（注册到后端时使用）
    pub device_name: String,
    /// 模拟权限弹窗结果（granted / denied / default）
    pub permission_prompt: String,
    /// 提供商凭据
    pub provider: ProviderConfig,
    /// Token 获取重试策略
    pub token_retry: RetryConfig,
    /// Token Sink 配置
    pub sink: SinkConfig,
    /// 日志配置
    pub logging: LoggingConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            provider_kind: env::var("PUSH_PROVIDER").unwrap_or_else(|_| "mock".to_string()),
            worker_script_path: "/push-worker.js".to_string(),
            notification_icon: "/notification-logo.png".to_string(),
            device_name: env::var("PUSH_DEVICE_NAME").unwrap_or_else(|_| "privpush-demo".to_string()),
            permission_prompt: "granted".to_string(),
            provider: ProviderConfig::default(),
            token_retry: RetryConfig::default(),
            sink: SinkConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl ClientConfig {
    /// 创建新的客户端配置
    pub fn new() -> Self {
        Self::default()
    }

    /// 从 TOML 文件加载配置
    pub fn from_toml_file(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("无法读取配置文件: {}", path))?;
        let config: ClientConfig = toml::from_str(&content)
            .with_context(|| format!("配置文件解析失败: {}", path))?;
        Ok(config)
    }

    /// 序列化为 TOML（generate-config 使用）
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).context("配置序列化失败")
    }

    /// 从环境变量合并（优先级高于配置文件）
    pub fn merge_from_env(&mut self) -> Result<()> {
        if let Ok(kind) = env::var("PUSH_PROVIDER") {
            self.provider_kind = kind;
        }
        if let Ok(v) = env::var("PUSH_API_KEY") {
            self.provider.api_key = v;
        }
        if let Ok(v) = env::var("PUSH_PROJECT_ID") {
            self.provider.project_id = v;
        }
        if let Ok(v) = env::var("PUSH_SENDER_ID") {
            self.provider.sender_id = v;
        }
        if let Ok(v) = env::var("PUSH_APP_ID") {
            self.provider.app_id = v;
        }
        if let Ok(v) = env::var("PUSH_VAPID_KEY") {
            self.provider.vapid_key = v;
        }
        if let Ok(v) = env::var("PUSH_SINK") {
            self.sink.kind = v;
        }
        if let Ok(v) = env::var("PUSH_SINK_ENDPOINT") {
            self.sink.endpoint = Some(v);
        }
        if let Ok(v) = env::var("PUSH_WORKER_SCRIPT") {
            self.worker_script_path = v;
        }
        if let Ok(v) = env::var("PUSH_DEVICE_NAME") {
            self.device_name = v;
        }
        Ok(())
    }

    /// 从命令行参数合并（最高优先级）
    pub fn merge_from_cli(&mut self, cli: &crate::cli::Cli) {
        if let Some(provider) = &cli.provider {
            self.provider_kind = provider.clone();
        }
        if let Some(sink) = &cli.sink {
            self.sink.kind = sink.clone();
        }
        if let Some(endpoint) = &cli.sink_endpoint {
            self.sink.endpoint = Some(endpoint.clone());
        }
        if let Some(permission) = &cli.permission {
            self.permission_prompt = permission.clone();
        }
        if let Some(path) = &cli.worker_script {
            self.worker_script_path = path.clone();
        }
        if let Some(level) = cli.get_log_level() {
            self.logging.level = Some(level);
        }
        if let Some(format) = cli.get_log_format() {
            self.logging.format = Some(format);
        }
        if let Some(file) = &cli.log_file {
            self.logging.file = Some(file.clone());
        }
    }

    /// 加载配置（按优先级：命令行 > 环境变量 > 配置文件 > 默认值）
    pub fn load(cli: &crate::cli::Cli) -> Result<Self> {
        // 1. 从默认配置开始
        let mut config = if let Some(env_str) = &cli.env {
            match env_str.as_str() {
                "production" => {
                    info!("🔧 Production 环境");
                    Self::default()
                }
                "development" | "dev" => {
                    info!("🔧 Development 环境");
                    Self::default()
                }
                _ => Self::default(),
            }
        } else {
            Self::new()
        };

        // 2. 从配置文件加载（如果指定）
        if let Some(config_file) = &cli.config_file {
            if Path::new(config_file).exists() {
                info!("📄 从配置文件加载: {}", config_file);
                config = Self::from_toml_file(config_file)?;
            } else {
                tracing::warn!("⚠️ 配置文件不存在: {}", config_file);
            }
        } else if Path::new("config.toml").exists() {
            // 尝试加载默认配置文件
            info!("📄 从默认配置文件加载: config.toml");
            config = Self::from_toml_file("config.toml")?;
        }

        // 3. 从环境变量合并（优先级高于配置文件）
        config.merge_from_env()?;

        // 4. 从命令行参数合并（最高优先级）
        config.merge_from_cli(cli);

        Ok(config)
    }

    /// 校验配置
    pub fn validate(&self) -> Result<()> {
        match self.provider_kind.as_str() {
            "mock" | "fcm" => {}
            other => anyhow::bail!("未知的消息提供商: {}", other),
        }

        // fcm 模式要求注入真实凭据，占位值直接拒绝
        if self.provider_kind == "fcm" && self.provider.is_placeholder() {
            anyhow::bail!(
                "provider=fcm 需要真实凭据（通过配置文件或 PUSH_API_KEY / PUSH_VAPID_KEY 等环境变量注入）"
            );
        }

        // Worker 脚本必须从源根提供，否则拿不到推送作用域
        if !self.worker_script_path.starts_with('/') {
            anyhow::bail!(
                "worker_script_path 必须是源根路径（以 / 开头）: {}",
                self.worker_script_path
            );
        }

        match self.sink.kind.as_str() {
            "log" => {}
            "http" => {
                let endpoint = self
                    .sink
                    .endpoint
                    .as_deref()
                    .ok_or_else(|| anyhow::anyhow!("sink=http 需要配置 endpoint"))?;
                url::Url::parse(endpoint)
                    .with_context(|| format!("无效的 sink endpoint: {}", endpoint))?;
            }
            other => anyhow::bail!("未知的 Token Sink 类型: {}", other),
        }

        match self.permission_prompt.as_str() {
            "granted" | "denied" | "default" => {}
            other => anyhow::bail!("未知的权限弹窗结果: {}", other),
        }

        if self.token_retry.attempts == 0 {
            anyhow::bail!("token_retry.attempts 至少为 1");
        }

        Ok(())
    }
}

/// 远程 Provider 配置（应用后端下发）
///
/// 后端统一托管凭据与 VAPID key，客户端启动时拉取，避免把密钥打进公开分发的
/// 脚本里。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteProviderConfig {
    /// VAPID 公钥
    pub vapid_key: String,
    /// 提供商凭据
    pub provider_config: ProviderConfig,
}

impl ClientConfig {
    /// 从应用后端拉取远程配置并应用
    pub async fn apply_remote_config(&mut self, url: &str) -> Result<()> {
        info!("🌐 从远程地址拉取 Provider 配置: {}", url);
        let remote = fetch_remote_config(url).await?;
        self.provider = remote.provider_config;
        self.provider.vapid_key = remote.vapid_key;
        Ok(())
    }
}

/// 拉取远程 Provider 配置
pub async fn fetch_remote_config(url: &str) -> Result<RemoteProviderConfig> {
    let response = reqwest::get(url)
        .await
        .with_context(|| format!("远程配置请求失败: {}", url))?;

    if !response.status().is_success() {
        anyhow::bail!("远程配置接口返回错误状态: {}", response.status());
    }

    let remote: RemoteProviderConfig = response
        .json()
        .await
        .context("远程配置解析失败")?;
    Ok(remote)
}

/// 提前读取日志配置（不加载完整配置）
///
/// main 在完整配置加载前需要先初始化日志，这里只解析 [logging] 段。
pub fn load_early_logging_config(config_file: Option<&str>) -> LoggingConfig {
    let path = config_file.unwrap_or("config.toml");
    if !Path::new(path).exists() {
        return LoggingConfig::default();
    }

    let Ok(content) = fs::read_to_string(path) else {
        return LoggingConfig::default();
    };

    #[derive(Default, Deserialize)]
    struct EarlyConfig {
        #[serde(default)]
        logging: LoggingConfig,
    }

    toml::from_str::<EarlyConfig>(&content)
        .map(|c| c.logging)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> ClientConfig {
        ClientConfig {
            provider_kind: "mock".to_string(),
            ..ClientConfig::default()
        }
    }

    #[test]
    fn test_default_config_validates() {
        let mut config = base_config();
        config.permission_prompt = "granted".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_fcm_rejects_placeholder_credentials() {
        let mut config = base_config();
        config.provider_kind = "fcm".to_string();
        config.provider.api_key = "your_api_key_here".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_worker_script_must_be_origin_rooted() {
        let mut config = base_config();
        config.worker_script_path = "push-worker.js".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_http_sink_requires_valid_endpoint() {
        let mut config = base_config();
        config.sink.kind = "http".to_string();
        config.sink.endpoint = None;
        assert!(config.validate().is_err());

        config.sink.endpoint = Some("not a url".to_string());
        assert!(config.validate().is_err());

        config.sink.endpoint = Some("http://localhost:8000/api/devices/".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let toml_str = r#"
            provider_kind = "mock"

            [provider]
            api_key = "k"
            project_id = "p"
            sender_id = "s"
            app_id = "a"
            vapid_key = "v"
        "#;
        let config: ClientConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.provider_kind, "mock");
        assert_eq!(config.worker_script_path, "/push-worker.js");
        assert_eq!(config.token_retry.attempts, 3);
    }
}
