//! 错误到 HTTP 响应的映射

use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};
use hms_core::HmsError;

use crate::views::error_page;

/// 页面处理器的错误
///
/// 未登录跳转登录页，权限不足跳回仪表盘，其余错误渲染整页错误。
#[derive(Debug)]
pub struct AppError(pub HmsError);

pub type WebResult<T> = std::result::Result<T, AppError>;

impl From<HmsError> for AppError {
    fn from(e: HmsError) -> Self {
        AppError(e)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self.0 {
            HmsError::Unauthenticated => return Redirect::to("/login").into_response(),
            HmsError::Permission(_) => return Redirect::to("/dashboard").into_response(),
            HmsError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            e if e.is_user_facing() => (StatusCode::BAD_REQUEST, e.to_string()),
            e => {
                tracing::error!("Request failed: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "The request could not be completed. No changes were saved.".to_string(),
                )
            }
        };

        (status, Html(error_page(status, &message))).into_response()
    }
}
