//! Web服务器

use anyhow::Result;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Json, Redirect},
    routing::get,
    Router,
};
use serde_json::json;
use std::net::SocketAddr;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::auth::{login_page, login_submit, logout, register_page, register_submit};
use crate::pages::{admin, dashboard, patients, rooms, staff};
use crate::state::AppState;

pub struct WebServer {
    addr: SocketAddr,
    app: Router,
}

impl WebServer {
    pub fn new(addr: SocketAddr, state: AppState) -> Self {
        Self {
            addr,
            app: router(state),
        }
    }

    pub async fn run(self) -> Result<()> {
        info!("Starting web server on {}", self.addr);

        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        axum::serve(
            listener,
            self.app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .map_err(|e| anyhow::anyhow!("Failed to start web server: {}", e))?;

        Ok(())
    }
}

/// 完整路由
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(|| async { Redirect::to("/dashboard") }))
        // 认证
        .route("/login", get(login_page).post(login_submit))
        .route("/logout", get(logout).post(logout))
        .route("/register", get(register_page).post(register_submit))
        // 业务页面
        .route("/dashboard", get(dashboard::show).post(dashboard::submit))
        .route("/patients", get(patients::show).post(patients::submit))
        .route("/rooms", get(rooms::show).post(rooms::submit))
        .route("/staff", get(staff::show).post(staff::submit))
        .route("/admin", get(admin::show).post(admin::submit))
        // 运维
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .with_state(state)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
}

/// 健康检查处理器
async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Prometheus 文本格式指标
async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    match state.metrics.render() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => {
            error!("Failed to render metrics: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
