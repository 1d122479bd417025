//! 会话存储
//!
//! 会话只保存已认证身份（用户编号、用户名、角色），按无操作时长过期。

use async_trait::async_trait;
use hms_core::AuthenticatedUser;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use uuid::Uuid;

/// 会话存储接口
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// 为已认证用户创建会话，返回会话编号
    async fn create(&self, user: AuthenticatedUser) -> String;

    /// 查找会话并刷新活动时间；过期会话视为不存在
    async fn get(&self, session_id: &str) -> Option<AuthenticatedUser>;

    /// 销毁会话，返回其中的身份
    async fn destroy(&self, session_id: &str) -> Option<AuthenticatedUser>;
}

#[derive(Debug, Clone)]
struct SessionEntry {
    user: AuthenticatedUser,
    last_seen: Instant,
}

/// 进程内会话存储
#[derive(Debug)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<String, SessionEntry>>,
    timeout: Duration,
}

impl MemorySessionStore {
    pub fn new(timeout: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            timeout,
        }
    }

    /// 清理过期会话，返回清理数量
    pub async fn purge_expired(&self) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        let timeout = self.timeout;
        sessions.retain(|_, entry| entry.last_seen.elapsed() < timeout);
        let purged = before - sessions.len();
        if purged > 0 {
            tracing::debug!("Purged {} expired sessions", purged);
        }
        purged
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn create(&self, user: AuthenticatedUser) -> String {
        self.purge_expired().await;
        let session_id = Uuid::new_v4().simple().to_string();
        tracing::debug!("Session created for {}", user.username);
        self.sessions.write().await.insert(
            session_id.clone(),
            SessionEntry {
                user,
                last_seen: Instant::now(),
            },
        );
        session_id
    }

    async fn get(&self, session_id: &str) -> Option<AuthenticatedUser> {
        let mut sessions = self.sessions.write().await;
        let expired = match sessions.get_mut(session_id) {
            Some(entry) if entry.last_seen.elapsed() < self.timeout => {
                entry.last_seen = Instant::now();
                return Some(entry.user.clone());
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            if let Some(entry) = sessions.remove(session_id) {
                tracing::info!("Session for {} expired", entry.user.username);
            }
        }
        None
    }

    async fn destroy(&self, session_id: &str) -> Option<AuthenticatedUser> {
        self.sessions
            .write()
            .await
            .remove(session_id)
            .map(|entry| entry.user)
    }
}
