//! 数据库连接管理

use hms_core::{HmsError, Result};
use sqlx::pool::PoolConnection;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::Sqlite;
use std::str::FromStr;
use std::time::Duration;

use crate::Tx;

/// 数据库连接池
#[derive(Debug, Clone)]
pub struct DatabasePool {
    pool: SqlitePool,
}

impl DatabasePool {
    /// 连接到数据库，文件不存在时自动创建
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        if url.contains(":memory:") {
            return Self::in_memory().await;
        }

        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| HmsError::Config(format!("Invalid database url {}: {}", url, e)))?
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .map_err(|e| HmsError::Database(format!("Failed to open {}: {}", url, e)))?;

        tracing::info!("Connected to database {}", url);
        Ok(Self { pool })
    }

    /// 内存数据库，仅用于测试和演示
    ///
    /// 每个 SQLite 内存连接都是独立的数据库，因此只保留一个永不过期的连接。
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| HmsError::Config(e.to_string()))?
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|e| HmsError::Database(e.to_string()))?;

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// 取出单个连接，用于不需要事务的单语句写操作
    pub async fn acquire(&self) -> Result<PoolConnection<Sqlite>> {
        Ok(self.pool.acquire().await?)
    }

    /// 开启写事务
    pub async fn begin(&self) -> Result<Tx> {
        let conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| HmsError::Transaction(format!("Failed to begin transaction: {}", e)))?;
        Tx::begin(conn).await
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}
