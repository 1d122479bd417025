//! 写事务与事务收尾
//!
//! 所有多语句业务操作以同样方式结束：成功则提交；失败则回滚并记录日志。
//! 校验和业务规则错误原样返回给调用方，其余错误统一包装为事务错误。

use hms_core::{HmsError, Result};
use sqlx::pool::PoolConnection;
use sqlx::{Sqlite, SqliteConnection};
use std::ops::{Deref, DerefMut};

const CLOSED: &str = "transaction used after commit or rollback";

/// 写事务
///
/// 以 `BEGIN IMMEDIATE` 开启，开始时即持有写锁。先读后写的操作不会在锁升级时
/// 收到 SQLITE_BUSY，并发写事务在 `busy_timeout` 内排队。
/// 未提交也未回滚就被丢弃时，连接在后台回滚后归还连接池。
pub struct Tx {
    conn: Option<PoolConnection<Sqlite>>,
}

impl Tx {
    pub(crate) async fn begin(mut conn: PoolConnection<Sqlite>) -> Result<Self> {
        sqlx::query("BEGIN IMMEDIATE")
            .execute(&mut *conn)
            .await
            .map_err(|e| HmsError::Transaction(format!("Failed to begin transaction: {}", e)))?;

        Ok(Self { conn: Some(conn) })
    }

    pub async fn commit(mut self) -> Result<()> {
        let Some(mut conn) = self.conn.take() else {
            return Ok(());
        };

        let committed = sqlx::query("COMMIT").execute(&mut *conn).await;
        if let Err(e) = committed {
            let rolled_back = sqlx::query("ROLLBACK").execute(&mut *conn).await;
            if rolled_back.is_err() {
                drop(conn.detach());
            }
            return Err(e.into());
        }
        Ok(())
    }

    pub async fn rollback(mut self) -> Result<()> {
        let Some(mut conn) = self.conn.take() else {
            return Ok(());
        };

        let rolled_back = sqlx::query("ROLLBACK").execute(&mut *conn).await;
        if let Err(e) = rolled_back {
            drop(conn.detach());
            return Err(e.into());
        }
        Ok(())
    }
}

impl Deref for Tx {
    type Target = SqliteConnection;

    fn deref(&self) -> &SqliteConnection {
        self.conn.as_deref().expect(CLOSED)
    }
}

impl DerefMut for Tx {
    fn deref_mut(&mut self) -> &mut SqliteConnection {
        self.conn.as_deref_mut().expect(CLOSED)
    }
}

impl Drop for Tx {
    fn drop(&mut self) {
        let Some(mut conn) = self.conn.take() else {
            return;
        };

        // 事务仍处于打开状态的连接不能直接归还连接池
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    let rolled_back = sqlx::query("ROLLBACK").execute(&mut *conn).await;
                    if let Err(e) = rolled_back {
                        tracing::error!("Rollback of abandoned transaction failed: {}", e);
                        drop(conn.detach());
                    }
                });
            }
            Err(_) => drop(conn.detach()),
        }
    }
}

/// 根据业务结果提交或回滚事务
pub async fn finish<T>(tx: Tx, operation: &str, outcome: Result<T>) -> Result<T> {
    match outcome {
        Ok(value) => {
            tx.commit().await.map_err(|e| {
                tracing::error!("Failed to commit {}: {}", operation, e);
                HmsError::Transaction(format!("{}: {}", operation, e))
            })?;
            Ok(value)
        }
        Err(err) => {
            if let Err(e) = tx.rollback().await {
                tracing::error!("Rollback of {} failed: {}", operation, e);
            }

            if err.is_user_facing() || matches!(err, HmsError::Permission(_)) {
                tracing::warn!("{} refused: {}", operation, err);
                Err(err)
            } else {
                tracing::error!("Failed to {}: {}", operation, err);
                Err(HmsError::Transaction(format!("{}: {}", operation, err)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DatabasePool;

    async fn create_notes(db: &DatabasePool) {
        sqlx::query("CREATE TABLE IF NOT EXISTS notes (id INTEGER PRIMARY KEY, body TEXT NOT NULL)")
            .execute(db.pool())
            .await
            .unwrap();
    }

    async fn append_after_read(conn: &mut SqliteConnection, writer: usize) -> Result<()> {
        let seen: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM notes")
            .fetch_one(&mut *conn)
            .await?;
        sqlx::query("INSERT INTO notes (body) VALUES (?)")
            .bind(format!("writer {} saw {}", writer, seen))
            .execute(&mut *conn)
            .await?;
        Ok(())
    }

    async fn setup() -> DatabasePool {
        let db = DatabasePool::in_memory().await.unwrap();
        create_notes(&db).await;
        db
    }

    async fn count(db: &DatabasePool) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM notes")
            .fetch_one(db.pool())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_commit_on_success() {
        let db = setup().await;
        let mut tx = db.begin().await.unwrap();
        let outcome = sqlx::query("INSERT INTO notes (body) VALUES ('a')")
            .execute(&mut *tx)
            .await
            .map(|_| ())
            .map_err(HmsError::from);

        finish(tx, "write note", outcome).await.unwrap();
        assert_eq!(count(&db).await, 1);
    }

    #[tokio::test]
    async fn test_domain_error_rolls_back_and_passes_through() {
        let db = setup().await;
        let mut tx = db.begin().await.unwrap();
        sqlx::query("INSERT INTO notes (body) VALUES ('a')")
            .execute(&mut *tx)
            .await
            .unwrap();

        let outcome: Result<()> = Err(HmsError::domain("not allowed"));
        let err = finish(tx, "write note", outcome).await.unwrap_err();
        assert!(matches!(err, HmsError::Domain(_)));
        assert_eq!(count(&db).await, 0);
    }

    #[tokio::test]
    async fn test_database_error_becomes_transaction_error() {
        let db = setup().await;
        let mut tx = db.begin().await.unwrap();
        sqlx::query("INSERT INTO notes (body) VALUES ('a')")
            .execute(&mut *tx)
            .await
            .unwrap();
        let outcome = sqlx::query("INSERT INTO notes (body) VALUES (NULL)")
            .execute(&mut *tx)
            .await
            .map(|_| ())
            .map_err(HmsError::from);

        let err = finish(tx, "write note", outcome).await.unwrap_err();
        assert!(matches!(err, HmsError::Transaction(_)));
        assert_eq!(count(&db).await, 0);
    }

    #[tokio::test]
    async fn test_dropped_transaction_rolls_back() {
        let db = setup().await;
        let mut tx = db.begin().await.unwrap();
        sqlx::query("INSERT INTO notes (body) VALUES ('a')")
            .execute(&mut *tx)
            .await
            .unwrap();
        drop(tx);

        assert_eq!(count(&db).await, 0);
        let tx = db.begin().await.unwrap();
        tx.rollback().await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_read_then_write_transactions_all_commit() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("notes.db").display());
        let db = DatabasePool::connect(&url, 8).await.unwrap();
        create_notes(&db).await;

        let tasks: Vec<_> = (0..8)
            .map(|writer| {
                let db = db.clone();
                tokio::spawn(async move {
                    let mut tx = db.begin().await?;
                    let outcome = append_after_read(&mut tx, writer).await;
                    finish(tx, "append note", outcome).await
                })
            })
            .collect();

        for task in tasks {
            task.await.unwrap().unwrap();
        }
        assert_eq!(count(&db).await, 8);
    }
}
