//! 配置管理
//!
//! 配置来源按优先级从低到高：内置默认值、配置文件、`HMS_` 前缀的环境变量
//! （嵌套字段用 `__` 分隔，例如 `HMS_DATABASE__URL`）。

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info};

/// 配置管理器
#[derive(Debug)]
pub struct ConfigManager {
    /// 配置数据
    config: Arc<RwLock<HmsConfig>>,
}

/// 医院管理系统完整配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HmsConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub session: SessionConfig,
    pub registration: RegistrationConfig,
    pub logging: LoggingConfig,
}

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// 监听主机
    pub host: String,
    /// 监听端口
    pub port: u16,
}

/// 数据库配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// 连接字符串，例如 `sqlite://hms.db`
    pub url: String,
    /// 最大连接数
    pub max_connections: u32,
    /// 科室表为空时写入默认科室
    pub seed_default_department: bool,
}

/// 会话配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// 会话 Cookie 名称
    pub cookie_name: String,
    /// 无操作超时（秒）
    pub timeout_secs: u64,
    /// 仅通过 HTTPS 发送 Cookie
    pub secure_cookie: bool,
}

/// 自助注册配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrationConfig {
    pub enabled: bool,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// 日志级别，`RUST_LOG` 优先
    pub level: String,
    /// 输出格式：pretty 或 json
    pub format: String,
}

/// 配置验证器
#[derive(Debug)]
pub struct ConfigValidator {
    validation_rules: Vec<ValidationRule>,
}

/// 验证规则
#[derive(Debug)]
struct ValidationRule {
    field_path: &'static str,
    validator: fn(&HmsConfig) -> bool,
    error_message: &'static str,
}

impl ConfigManager {
    /// 加载并校验配置
    pub fn new(config_path: Option<&str>) -> Result<Self> {
        let config = Self::load_config(config_path)?;
        ConfigValidator::new().validate(&config)?;

        Ok(Self {
            config: Arc::new(RwLock::new(config)),
        })
    }

    fn load_config(config_path: Option<&str>) -> Result<HmsConfig> {
        let mut builder = Config::builder()
            .add_source(Config::try_from(&HmsConfig::default()).context("Failed to build defaults")?);

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path));
        }

        let settings = builder
            .add_source(
                Environment::with_prefix("HMS")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to read configuration")?;

        let config: HmsConfig = settings
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        match config_path {
            Some(path) => info!("Configuration loaded from: {}", path),
            None => info!("Configuration loaded from defaults and environment"),
        }
        Ok(config)
    }

    /// 获取当前配置
    pub async fn get_config(&self) -> HmsConfig {
        self.config.read().await.clone()
    }
}

impl ConfigValidator {
    pub fn new() -> Self {
        let validation_rules = vec![
            ValidationRule {
                field_path: "server.port",
                validator: |config| config.server.port != 0,
                error_message: "Server port cannot be 0",
            },
            ValidationRule {
                field_path: "database.max_connections",
                validator: |config| config.database.max_connections != 0,
                error_message: "Database max connections cannot be 0",
            },
            ValidationRule {
                field_path: "database.url",
                validator: |config| !config.database.url.trim().is_empty(),
                error_message: "Database url cannot be empty",
            },
            ValidationRule {
                field_path: "session.timeout_secs",
                validator: |config| config.session.timeout_secs != 0,
                error_message: "Session timeout cannot be 0",
            },
            ValidationRule {
                field_path: "session.cookie_name",
                validator: |config| {
                    let name = &config.session.cookie_name;
                    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
                },
                error_message: "Session cookie name must be a non-empty token",
            },
            ValidationRule {
                field_path: "logging.format",
                validator: |config| matches!(config.logging.format.as_str(), "pretty" | "json"),
                error_message: "Logging format must be pretty or json",
            },
        ];

        Self { validation_rules }
    }

    pub fn validate(&self, config: &HmsConfig) -> Result<()> {
        for rule in &self.validation_rules {
            if !(rule.validator)(config) {
                error!("Configuration validation failed for {}", rule.field_path);
                return Err(anyhow::anyhow!("{}: {}", rule.field_path, rule.error_message));
            }
        }

        info!("Configuration validation passed");
        Ok(())
    }
}

impl Default for ConfigValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://hms.db".to_string(),
            max_connections: 5,
            seed_default_department: true,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: "hms_session".to_string(),
            timeout_secs: 3600,
            secure_cookie: false,
        }
    }
}

impl Default for RegistrationConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = HmsConfig::default();
        assert!(ConfigValidator::new().validate(&config).is_ok());
        assert_eq!(config.session.cookie_name, "hms_session");
        assert!(config.registration.enabled);
    }

    #[test]
    fn test_validator_rejects_bad_values() {
        let validator = ConfigValidator::new();

        let mut config = HmsConfig::default();
        config.server.port = 0;
        assert!(validator.validate(&config).is_err());

        let mut config = HmsConfig::default();
        config.logging.format = "xml".to_string();
        assert!(validator.validate(&config).is_err());

        let mut config = HmsConfig::default();
        config.session.cookie_name = "bad name;".to_string();
        assert!(validator.validate(&config).is_err());
    }

    #[tokio::test]
    async fn test_file_overrides_defaults() {
        let path = std::env::temp_dir().join(format!("hms-config-test-{}.toml", std::process::id()));
        std::fs::write(
            &path,
            "[server]\nport = 9191\n\n[database]\nurl = \"sqlite://test.db\"\n\n[registration]\nenabled = false\n",
        )
        .unwrap();

        let manager = ConfigManager::new(path.to_str()).unwrap();
        let config = manager.get_config().await;
        std::fs::remove_file(&path).ok();

        assert_eq!(config.server.port, 9191);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.database.url, "sqlite://test.db");
        assert_eq!(config.database.max_connections, 5);
        assert!(!config.registration.enabled);
    }

    #[test]
    fn test_invalid_file_is_rejected() {
        let path = std::env::temp_dir().join(format!("hms-config-invalid-{}.toml", std::process::id()));
        std::fs::write(&path, "[session]\ntimeout_secs = 0\n").unwrap();

        let outcome = ConfigManager::new(path.to_str());
        std::fs::remove_file(&path).ok();

        assert!(outcome.is_err());
    }
}
