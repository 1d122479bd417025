//! 业务页面
//!
//! 每个页面有一个 GET 处理器渲染当前数据，一个 POST 处理器执行表单动作后
//! 带着提示重新渲染。

pub mod admin;
pub mod dashboard;
pub mod patients;
pub mod rooms;
pub mod staff;

use axum::extract::rejection::FormRejection;
use axum::Form;
use chrono::{DateTime, Utc};
use hms_core::{HmsError, Result};
use tracing::warn;

use crate::error::WebResult;
use crate::state::AppState;
use crate::views::Notice;

/// 取出表单；缺字段或未知动作视为校验错误
pub(crate) fn decode<T>(form: std::result::Result<Form<T>, FormRejection>) -> Result<T> {
    match form {
        Ok(Form(form)) => Ok(form),
        Err(rejection) => {
            warn!("Form submission rejected: {}", rejection);
            Err(HmsError::validation("The submitted form was incomplete or invalid"))
        }
    }
}

/// 把操作结果转成页面提示
///
/// 用户可见的错误留在页面内提示；事务失败、未登录、权限不足和系统错误
/// 交给 `AppError` 处理。
pub(crate) fn settle(state: &AppState, outcome: Result<String>) -> WebResult<Notice> {
    match outcome {
        Ok(message) => Ok(Notice::Success(message)),
        Err(e) if e.is_user_facing() => Ok(Notice::Error(e.to_string())),
        Err(e) => {
            if matches!(e, HmsError::Transaction(_)) {
                state.metrics.record_transaction_failure();
            }
            Err(e.into())
        }
    }
}

pub(crate) fn timestamp(at: &DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M").to_string()
}
