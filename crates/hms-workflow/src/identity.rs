//! 身份与访问
//!
//! 登录成功后的最后登录时间与访问日志写入都是尽力而为的，失败只记录告警。

use chrono::Utc;
use hms_core::models::*;
use hms_core::utils::{hash_password, verify_password};
use hms_core::{AuthenticatedUser, HmsError, RequestContext, Result};
use hms_database::statements::{self, StaffRecord};
use hms_database::{finish, DatabasePool, DatabaseQueries, SqliteConnection};

/// 自助注册
#[derive(Debug, Clone)]
pub struct Registration {
    pub username: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub role: Role,
}

/// 修改密码
#[derive(Debug, Clone)]
pub struct PasswordChange {
    pub current_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

/// 仪表盘上的账号操作
#[derive(Debug, Clone)]
pub enum AccountCommand {
    ChangePassword(PasswordChange),
}

pub struct IdentityService<'a> {
    db: &'a DatabasePool,
}

impl<'a> IdentityService<'a> {
    pub fn new(db: &'a DatabasePool) -> Self {
        Self { db }
    }

    pub async fn execute(&self, ctx: &RequestContext, command: AccountCommand) -> Result<String> {
        match command {
            AccountCommand::ChangePassword(change) => {
                self.change_password(ctx, change).await?;
                Ok("Password updated successfully!".to_string())
            }
        }
    }

    /// 校验用户名和密码；账号不存在、已停用或密码不符统一返回 InvalidCredentials
    pub async fn authenticate(
        &self,
        username: &str,
        password: &str,
        ip_address: &str,
    ) -> Result<AuthenticatedUser> {
        let username = username.trim();
        let user = DatabaseQueries::new(self.db)
            .find_active_user(username)
            .await?
            .filter(|user| verify_password(password, &user.password_hash));

        let user = match user {
            Some(user) => user,
            None => {
                tracing::warn!("Failed login for {:?} from {}", username, ip_address);
                return Err(HmsError::InvalidCredentials);
            }
        };

        let now = Utc::now();
        if let Err(e) = self.record_login(user.id, ip_address, now).await {
            tracing::warn!("Could not record login for user {}: {}", user.id, e);
        }

        tracing::info!("User {} logged in from {}", user.username, ip_address);
        Ok(AuthenticatedUser {
            user_id: user.id,
            username: user.username,
            role: user.role,
        })
    }

    async fn record_login(&self, user_id: i64, ip_address: &str, at: chrono::DateTime<Utc>) -> Result<()> {
        let mut conn = self.db.acquire().await?;
        statements::touch_last_login(&mut conn, user_id, at).await?;
        statements::append_access_log(&mut conn, user_id, AccessAction::Login, ip_address, at).await?;
        Ok(())
    }

    /// 记录登出；会话销毁由调用方负责
    pub async fn logout(&self, ctx: &RequestContext) {
        let outcome: Result<i64> = async {
            let mut conn = self.db.acquire().await?;
            statements::append_access_log(
                &mut conn,
                ctx.user.user_id,
                AccessAction::Logout,
                &ctx.ip_address,
                Utc::now(),
            )
            .await
        }
        .await;

        match outcome {
            Ok(_) => tracing::info!("User {} logged out", ctx.user.username),
            Err(e) => tracing::warn!(
                "Could not record logout for user {}: {}",
                ctx.user.username,
                e
            ),
        }
    }

    /// 自助注册：员工记录与账号在同一事务内创建
    pub async fn register(&self, registration: Registration) -> Result<i64> {
        for (field, value) in [
            ("Username", &registration.username),
            ("First name", &registration.first_name),
            ("Last name", &registration.last_name),
            ("Email", &registration.email),
        ] {
            if value.trim().is_empty() {
                return Err(HmsError::Validation(format!("{} is required", field)));
            }
        }
        if registration.password.trim().is_empty() {
            return Err(HmsError::validation("Password is required"));
        }

        let password_hash = hash_password(&registration.password)?;

        let mut tx = self.db.begin().await?;
        let outcome = register_in(&mut tx, &registration, &password_hash).await;
        let user_id = finish(tx, "register account", outcome).await?;

        tracing::info!(
            "Registered account {} ({})",
            registration.username.trim(),
            registration.role
        );
        Ok(user_id)
    }

    /// 修改密码：先验证当前密码，再校验两次输入一致
    pub async fn change_password(&self, ctx: &RequestContext, change: PasswordChange) -> Result<()> {
        let user = DatabaseQueries::new(self.db)
            .get_user(ctx.user.user_id)
            .await?
            .ok_or(HmsError::Unauthenticated)?;

        if !verify_password(&change.current_password, &user.password_hash) {
            return Err(HmsError::validation("Current password is incorrect!"));
        }
        if change.new_password != change.confirm_password {
            return Err(HmsError::validation("New passwords do not match!"));
        }
        if change.new_password.trim().is_empty() {
            return Err(HmsError::validation("New password is required"));
        }

        let password_hash = hash_password(&change.new_password)?;
        let mut conn = self.db.acquire().await?;
        statements::update_password_hash(&mut conn, user.id, &password_hash).await?;

        tracing::info!("User {} changed their password", user.username);
        Ok(())
    }
}

async fn register_in(conn: &mut SqliteConnection, registration: &Registration, password_hash: &str) -> Result<i64> {
    let username = registration.username.trim();
    if statements::username_taken(conn, username).await? {
        return Err(HmsError::domain("Username is already taken"));
    }

    let department_id = statements::first_department(conn)
        .await?
        .ok_or_else(|| HmsError::domain("No department is available for registration"))?;

    let staff_id = statements::insert_staff(
        conn,
        &StaffRecord {
            first_name: registration.first_name.trim(),
            last_name: registration.last_name.trim(),
            department_id,
            job_role: registration.role,
            email: registration.email.trim(),
            phone: None,
            hire_date: None,
            status: StaffStatus::Active,
        },
    )
    .await?;

    statements::insert_user(conn, username, password_hash, registration.role, Some(staff_id)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{self, ctx};

    fn registration(username: &str) -> Registration {
        Registration {
            username: username.to_string(),
            password: "correct horse".to_string(),
            first_name: "Nora".to_string(),
            last_name: "Nurse".to_string(),
            email: "nora@example.org".to_string(),
            role: Role::Nurse,
        }
    }

    async fn log_actions(db: &DatabasePool) -> Vec<String> {
        sqlx::query_scalar("SELECT action FROM access_logs ORDER BY log_id")
            .fetch_all(db.pool())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_register_then_login_and_logout() {
        let db = testing::database().await;
        let identity = IdentityService::new(&db);
        let user_id = identity.register(registration("nora")).await.unwrap();

        let user = identity
            .authenticate("nora", "correct horse", "10.0.0.5")
            .await
            .unwrap();
        assert_eq!(user.user_id, user_id);
        assert_eq!(user.role, Role::Nurse);

        let stored = DatabaseQueries::new(&db).get_user(user_id).await.unwrap().unwrap();
        assert!(stored.last_login.is_some());

        identity.logout(&RequestContext::new(user, "10.0.0.5")).await;
        assert_eq!(log_actions(&db).await, ["login", "logout"]);

        let activity = DatabaseQueries::new(&db).recent_activity(10).await.unwrap();
        assert_eq!(activity.len(), 2);
        assert_eq!(activity[0].username, "nora");
    }

    #[tokio::test]
    async fn test_invalid_credentials() {
        let db = testing::database().await;
        let identity = IdentityService::new(&db);
        identity.register(registration("nora")).await.unwrap();

        assert!(matches!(
            identity.authenticate("nora", "wrong", "10.0.0.5").await,
            Err(HmsError::InvalidCredentials)
        ));
        assert!(matches!(
            identity.authenticate("nobody", "correct horse", "10.0.0.5").await,
            Err(HmsError::InvalidCredentials)
        ));
        assert!(log_actions(&db).await.is_empty());
    }

    #[tokio::test]
    async fn test_inactive_account_cannot_login() {
        let db = testing::database().await;
        let identity = IdentityService::new(&db);
        let user_id = identity.register(registration("nora")).await.unwrap();
        sqlx::query("UPDATE users SET is_active = 0 WHERE user_id = ?")
            .bind(user_id)
            .execute(db.pool())
            .await
            .unwrap();

        assert!(matches!(
            identity.authenticate("nora", "correct horse", "10.0.0.5").await,
            Err(HmsError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_duplicate_username_is_rejected_without_staff_row() {
        let db = testing::database().await;
        let identity = IdentityService::new(&db);
        identity.register(registration("nora")).await.unwrap();

        let err = identity.register(registration("nora")).await.unwrap_err();
        assert!(matches!(err, HmsError::Domain(_)));

        let staff = DatabaseQueries::new(&db).list_staff().await.unwrap();
        assert_eq!(staff.len(), 1);
        assert_eq!(staff[0].department_name, "General");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_registrations_all_commit() {
        let dir = tempfile::tempdir().unwrap();
        let db = testing::file_database(&dir, 8).await;

        let tasks: Vec<_> = (0..8)
            .map(|i| {
                let db = db.clone();
                tokio::spawn(async move {
                    IdentityService::new(&db)
                        .register(registration(&format!("nurse{}", i)))
                        .await
                })
            })
            .collect();

        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let users: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(users, 8);
    }

    #[tokio::test]
    async fn test_change_password() {
        let db = testing::database().await;
        let identity = IdentityService::new(&db);
        let user_id = identity.register(registration("nora")).await.unwrap();
        let mut session = ctx(Role::Nurse);
        session.user.user_id = user_id;

        let mismatch = PasswordChange {
            current_password: "correct horse".to_string(),
            new_password: "battery staple".to_string(),
            confirm_password: "battery stapler".to_string(),
        };
        let err = identity.change_password(&session, mismatch).await.unwrap_err();
        assert_eq!(err.to_string(), "New passwords do not match!");

        let wrong_current = PasswordChange {
            current_password: "nope".to_string(),
            new_password: "battery staple".to_string(),
            confirm_password: "battery staple".to_string(),
        };
        let err = identity.change_password(&session, wrong_current).await.unwrap_err();
        assert_eq!(err.to_string(), "Current password is incorrect!");
        identity.authenticate("nora", "correct horse", "::1").await.unwrap();

        let ok = PasswordChange {
            current_password: "correct horse".to_string(),
            new_password: "battery staple".to_string(),
            confirm_password: "battery staple".to_string(),
        };
        identity.change_password(&session, ok).await.unwrap();
        assert!(identity.authenticate("nora", "correct horse", "::1").await.is_err());
        identity.authenticate("nora", "battery staple", "::1").await.unwrap();
    }
}
