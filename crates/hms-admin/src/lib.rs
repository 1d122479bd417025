//! # HMS管理模块
//!
//! 提供运维相关功能：配置加载与校验、日志初始化、Prometheus 指标

pub mod config;
pub mod logging;
pub mod metrics;

pub use config::{
    ConfigManager, ConfigValidator, DatabaseConfig, HmsConfig, LoggingConfig, RegistrationConfig,
    ServerConfig, SessionConfig,
};
pub use logging::init_tracing;
pub use metrics::Metrics;
