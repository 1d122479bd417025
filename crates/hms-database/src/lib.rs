//! # HMS数据库模块
//!
//! 负责医院管理数据的存储，提供SQLite连接池、表结构、读查询、
//! 事务内写语句以及事务提交/回滚辅助。

pub mod connection;
pub mod models;
pub mod queries;
pub mod schema;
pub mod statements;
pub mod transaction;

// 重新导出主要类型
pub use connection::DatabasePool;
pub use queries::{DashboardCounts, DatabaseQueries};
pub use transaction::{finish, Tx};

pub use sqlx::SqliteConnection;
