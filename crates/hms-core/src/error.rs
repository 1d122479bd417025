//! 错误定义模块

use thiserror::Error;

/// 医院管理系统统一错误类型
#[derive(Error, Debug)]
pub enum HmsError {
    /// 必填字段缺失或格式错误，不产生任何修改
    #[error("{0}")]
    Validation(String),

    /// 业务规则冲突，例如删除仍在院的患者
    #[error("{0}")]
    Domain(String),

    /// 多语句事务中途失败，已回滚
    #[error("事务失败: {0}")]
    Transaction(String),

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("未登录")]
    Unauthenticated,

    #[error("权限不足: {0}")]
    Permission(String),

    #[error("{0}")]
    NotFound(String),

    #[error("数据库错误: {0}")]
    Database(String),

    #[error("配置错误: {0}")]
    Config(String),

    #[error("系统内部错误: {0}")]
    Internal(String),
}

impl HmsError {
    /// 是否应作为页面内提示展示给用户（而不是整页错误）
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            HmsError::Validation(_)
                | HmsError::Domain(_)
                | HmsError::InvalidCredentials
                | HmsError::NotFound(_)
        )
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        HmsError::Validation(msg.into())
    }

    pub fn domain(msg: impl Into<String>) -> Self {
        HmsError::Domain(msg.into())
    }
}

#[cfg(feature = "database")]
impl From<sqlx::Error> for HmsError {
    fn from(e: sqlx::Error) -> Self {
        HmsError::Database(e.to_string())
    }
}

/// 系统统一结果类型
pub type Result<T> = std::result::Result<T, HmsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_facing_errors() {
        assert!(HmsError::validation("First name is required").is_user_facing());
        assert!(HmsError::domain("Room is not available").is_user_facing());
        assert!(HmsError::InvalidCredentials.is_user_facing());
        assert!(!HmsError::Transaction("admit patient".into()).is_user_facing());
        assert!(!HmsError::Permission("admin".into()).is_user_facing());
    }

    #[test]
    fn test_inline_messages_are_unprefixed() {
        let err = HmsError::validation("New passwords do not match!");
        assert_eq!(err.to_string(), "New passwords do not match!");
    }
}
