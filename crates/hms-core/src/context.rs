//! 请求上下文
//!
//! 每个请求由会话守卫构造，显式传递给各组件操作，替代全局会话状态。

use serde::{Deserialize, Serialize};

use crate::error::{HmsError, Result};
use crate::models::Role;

/// 已认证身份（会话中保存的最小信息）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    pub user_id: i64,
    pub username: String,
    pub role: Role,
}

/// 单次请求的上下文
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub user: AuthenticatedUser,
    pub ip_address: String,
}

impl RequestContext {
    pub fn new(user: AuthenticatedUser, ip_address: impl Into<String>) -> Self {
        Self {
            user,
            ip_address: ip_address.into(),
        }
    }

    pub fn has_role(&self, allowed: &[Role]) -> bool {
        allowed.contains(&self.user.role)
    }

    /// 校验当前用户角色，不满足时返回权限错误
    pub fn require_role(&self, allowed: &[Role]) -> Result<()> {
        if self.has_role(allowed) {
            Ok(())
        } else {
            tracing::warn!(
                "User {} ({}) denied: requires one of {:?}",
                self.user.username,
                self.user.role,
                allowed
            );
            Err(HmsError::Permission(format!(
                "{} role cannot perform this action",
                self.user.role
            )))
        }
    }
}

/// 各页面允许的角色
pub mod access {
    use crate::models::Role;

    pub const PATIENTS: &[Role] = &[Role::Admin, Role::Doctor, Role::Nurse];
    pub const ROOMS: &[Role] = &[Role::Admin, Role::Doctor];
    pub const STAFF: &[Role] = &[Role::Admin];
    pub const ADMINISTRATION: &[Role] = &[Role::Admin];
    pub const DASHBOARD_STATS: &[Role] = &[Role::Admin, Role::Doctor];
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(role: Role) -> RequestContext {
        RequestContext::new(
            AuthenticatedUser {
                user_id: 1,
                username: "tester".to_string(),
                role,
            },
            "127.0.0.1",
        )
    }

    #[test]
    fn test_require_role() {
        assert!(ctx(Role::Nurse).require_role(access::PATIENTS).is_ok());
        assert!(ctx(Role::Nurse).require_role(access::ROOMS).is_err());
        assert!(matches!(
            ctx(Role::Doctor).require_role(access::STAFF),
            Err(HmsError::Permission(_))
        ));
        assert!(!ctx(Role::SupportStaff).has_role(access::DASHBOARD_STATS));
    }
}
