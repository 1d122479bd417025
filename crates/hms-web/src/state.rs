//! 应用共享状态

use hms_admin::{HmsConfig, Metrics};
use hms_database::DatabasePool;
use std::sync::Arc;
use std::time::Duration;

use crate::session::{MemorySessionStore, SessionStore};

/// 页面层使用的设置
#[derive(Debug, Clone)]
pub struct WebSettings {
    pub cookie_name: String,
    pub secure_cookie: bool,
    pub registration_enabled: bool,
}

impl WebSettings {
    pub fn from_config(config: &HmsConfig) -> Self {
        Self {
            cookie_name: config.session.cookie_name.clone(),
            secure_cookie: config.session.secure_cookie,
            registration_enabled: config.registration.enabled,
        }
    }
}

impl Default for WebSettings {
    fn default() -> Self {
        Self::from_config(&HmsConfig::default())
    }
}

/// 所有处理器共享的状态
#[derive(Clone)]
pub struct AppState {
    pub db: DatabasePool,
    pub sessions: Arc<dyn SessionStore>,
    pub settings: Arc<WebSettings>,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(db: DatabasePool, config: &HmsConfig, metrics: Metrics) -> Self {
        let sessions = MemorySessionStore::new(Duration::from_secs(config.session.timeout_secs));
        Self {
            db,
            sessions: Arc::new(sessions),
            settings: Arc::new(WebSettings::from_config(config)),
            metrics,
        }
    }
}
