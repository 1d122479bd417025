//! 医院管理系统服务器主程序

use anyhow::{Context, Result};
use clap::Parser;
use hms_admin::{init_tracing, ConfigManager, ConfigValidator, Metrics};
use hms_database::{DatabasePool, DatabaseQueries};
use hms_web::{AppState, WebServer};
use std::net::SocketAddr;
use tracing::{error, info};

/// 服务器命令行参数，优先于配置文件和环境变量
#[derive(Parser, Debug)]
#[command(name = "hms-server")]
#[command(about = "Hospital Management System 服务器")]
struct Args {
    /// 配置文件路径
    #[arg(short, long)]
    config: Option<String>,

    /// 监听主机
    #[arg(long)]
    host: Option<String>,

    /// 监听端口
    #[arg(short, long)]
    port: Option<u16>,

    /// 数据库连接字符串
    #[arg(short, long)]
    database_url: Option<String>,

    /// 日志级别
    #[arg(short, long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let manager = ConfigManager::new(args.config.as_deref())?;
    let mut config = manager.get_config().await;
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(url) = args.database_url {
        config.database.url = url;
    }
    if let Some(level) = args.log_level {
        config.logging.level = level;
    }
    ConfigValidator::new().validate(&config)?;

    init_tracing(&config.logging)?;
    info!("Starting Hospital Management System...");
    info!("  Database: {}", config.database.url);
    info!("  Self-registration: {}", config.registration.enabled);

    let db = DatabasePool::connect(&config.database.url, config.database.max_connections).await?;
    let queries = DatabaseQueries::new(&db);
    queries.create_tables().await?;
    if config.database.seed_default_department {
        queries.seed_default_department().await?;
    }

    let metrics = Metrics::new()?;
    let state = AppState::new(db.clone(), &config, metrics);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .with_context(|| format!("Invalid listen address {}:{}", config.server.host, config.server.port))?;

    let server = WebServer::new(addr, state);
    let outcome = server.run().await;
    db.close().await;

    if let Err(e) = outcome {
        error!("Server stopped with error: {}", e);
        return Err(e);
    }
    Ok(())
}
