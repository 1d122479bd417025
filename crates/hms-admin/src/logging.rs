//! 日志初始化

use anyhow::Result;
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// 构造日志过滤器，`RUST_LOG` 优先于配置中的级别
pub fn env_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(&config.level)
            .map_err(|e| anyhow::anyhow!("Invalid log level {:?}: {}", config.level, e)),
    }
}

/// 安装全局 tracing 订阅者，整个进程只调用一次
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    let filter = env_filter(config)?;
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    let installed = match config.format.as_str() {
        "json" => builder.json().with_current_span(true).try_init(),
        _ => builder.with_target(true).try_init(),
    };
    installed.map_err(|e| anyhow::anyhow!("Failed to install tracing subscriber: {}", e))?;

    tracing::debug!("Logging initialised ({} format)", config.format);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_level_is_rejected() {
        if std::env::var_os("RUST_LOG").is_some() {
            return;
        }
        let config = LoggingConfig {
            level: "hms=notalevel".to_string(),
            format: "pretty".to_string(),
        };
        assert!(env_filter(&config).is_err());
        assert!(env_filter(&LoggingConfig::default()).is_ok());
    }
}
