//! 仪表盘

use hms_core::models::*;
use hms_core::{access, HmsError, RequestContext, Result};
use hms_database::{DashboardCounts, DatabasePool, DatabaseQueries};

/// 最近访问记录条数
pub const RECENT_ACTIVITY_LIMIT: i64 = 10;

/// 仪表盘页面数据
#[derive(Debug, Clone)]
pub struct DashboardPage {
    pub profile: UserProfile,
    /// 仅 Admin、Doctor 可见
    pub counts: Option<DashboardCounts>,
    pub recent_activity: Vec<ActivityEntry>,
}

pub struct Dashboard<'a> {
    db: &'a DatabasePool,
}

impl<'a> Dashboard<'a> {
    pub fn new(db: &'a DatabasePool) -> Self {
        Self { db }
    }

    pub async fn page(&self, ctx: &RequestContext) -> Result<DashboardPage> {
        let queries = DatabaseQueries::new(self.db);

        let profile = queries
            .get_user_profile(ctx.user.user_id)
            .await?
            .ok_or(HmsError::Unauthenticated)?;

        let counts = if ctx.has_role(access::DASHBOARD_STATS) {
            Some(queries.dashboard_counts().await?)
        } else {
            None
        };

        let recent_activity = queries.recent_activity(RECENT_ACTIVITY_LIMIT).await?;
        tracing::debug!(
            "Dashboard for {} with {} activity entries",
            ctx.user.username,
            recent_activity.len()
        );

        Ok(DashboardPage {
            profile,
            counts,
            recent_activity,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{IdentityService, Registration};
    use crate::testing;
    use hms_core::AuthenticatedUser;

    async fn signed_in(db: &DatabasePool, username: &str, role: Role) -> RequestContext {
        let identity = IdentityService::new(db);
        identity
            .register(Registration {
                username: username.to_string(),
                password: "pw".to_string(),
                first_name: "Sam".to_string(),
                last_name: "Smith".to_string(),
                email: "sam@example.org".to_string(),
                role,
            })
            .await
            .unwrap();
        let user: AuthenticatedUser = identity.authenticate(username, "pw", "127.0.0.1").await.unwrap();
        RequestContext::new(user, "127.0.0.1")
    }

    #[tokio::test]
    async fn test_counts_visible_to_admin_only_roles() {
        let db = testing::database().await;
        let room_id = testing::room(&db, "101").await;
        testing::room(&db, "102").await;
        testing::patient(&db, "Ann", "Lee").await;
        let mut conn = db.acquire().await.unwrap();
        hms_database::statements::occupy_room_if_available(&mut conn, room_id)
            .await
            .unwrap();
        drop(conn);

        let admin = signed_in(&db, "admin", Role::Admin).await;
        let page = Dashboard::new(&db).page(&admin).await.unwrap();
        assert_eq!(page.profile.display_name(), "Sam Smith");
        let counts = page.counts.unwrap();
        assert_eq!(counts.total_patients, 1);
        assert_eq!(counts.occupied_rooms, 1);
        assert_eq!(counts.active_staff, 1);
        assert_eq!(counts.low_stock_items, 0);

        let nurse = signed_in(&db, "nurse", Role::Nurse).await;
        let page = Dashboard::new(&db).page(&nurse).await.unwrap();
        assert!(page.counts.is_none());
        assert_eq!(page.recent_activity.len(), 2);
    }
}
