//! 会话守卫与登录、登出、注册处理器

use axum::{
    extract::{rejection::FormRejection, ConnectInfo, FromRequestParts, Query, State},
    http::{header, request::Parts, HeaderMap, HeaderValue},
    response::{Html, IntoResponse, Redirect, Response},
    Form,
};
use hms_core::{AuthenticatedUser, HmsError, RequestContext, Role};
use hms_database::DatabaseQueries;
use hms_workflow::IdentityService;
use serde::Deserialize;
use std::net::SocketAddr;
use tracing::{info, warn};

use crate::error::{AppError, WebResult};
use crate::forms::{LoginForm, RegisterForm};
use crate::state::{AppState, WebSettings};
use crate::views::{escape_html, options, public_layout, Notice};

/// 已登录用户的请求上下文
///
/// 没有有效会话时拒绝请求并跳转登录页。账号被停用后，其已有会话在下一次请求时失效。
#[derive(Debug, Clone)]
pub struct CurrentUser(pub RequestContext);

#[axum::async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let session_id = session_cookie(&parts.headers, &state.settings.cookie_name)
            .ok_or(AppError(HmsError::Unauthenticated))?;
        let user = state
            .sessions
            .get(&session_id)
            .await
            .ok_or(AppError(HmsError::Unauthenticated))?;

        let account = DatabaseQueries::new(&state.db).get_user(user.user_id).await?;
        if !account.is_some_and(|account| account.is_active) {
            warn!("Session of inactive account {} revoked", user.username);
            state.sessions.destroy(&session_id).await;
            return Err(AppError(HmsError::Unauthenticated));
        }

        Ok(CurrentUser(RequestContext::new(user, client_ip(parts))))
    }
}

/// 从 Cookie 头中读取会话编号
pub fn session_cookie(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == cookie_name)
        .map(|(_, value)| value.to_string())
        .filter(|value| !value.is_empty())
}

/// 客户端地址：优先取连接地址，其次取 X-Forwarded-For 的第一项
pub fn client_ip(parts: &Parts) -> String {
    if let Some(ConnectInfo(addr)) = parts.extensions.get::<ConnectInfo<SocketAddr>>() {
        return addr.ip().to_string();
    }
    parts
        .headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or("unknown")
        .to_string()
}

fn session_set_cookie(settings: &WebSettings, session_id: &str) -> String {
    let mut cookie = format!(
        "{}={}; HttpOnly; SameSite=Lax; Path=/",
        settings.cookie_name, session_id
    );
    if settings.secure_cookie {
        cookie.push_str("; Secure");
    }
    cookie
}

fn session_clear_cookie(settings: &WebSettings) -> String {
    format!(
        "{}=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0",
        settings.cookie_name
    )
}

fn with_cookie(cookie: String, response: impl IntoResponse) -> Response {
    match HeaderValue::from_str(&cookie) {
        Ok(value) => ([(header::SET_COOKIE, value)], response).into_response(),
        Err(e) => {
            warn!("Session cookie could not be encoded: {}", e);
            response.into_response()
        }
    }
}

async fn signed_in(headers: &HeaderMap, state: &AppState) -> Option<AuthenticatedUser> {
    let session_id = session_cookie(headers, &state.settings.cookie_name)?;
    state.sessions.get(&session_id).await
}

#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    registered: Option<String>,
}

fn login_view(state: &AppState, username: &str, notice: &Notice) -> Html<String> {
    let register_link = if state.settings.registration_enabled {
        r#"<p class="muted" style="margin-top:12px;">No account? <a href="/register">Register</a></p>"#
    } else {
        ""
    };
    let body = format!(
        r#"<form method="post" action="/login">
    <label>Username</label><input name="username" value="{username}" required autofocus>
    <label style="margin-top:10px;">Password</label><input type="password" name="password" required>
    <button type="submit">Login</button>
</form>{register_link}"#,
        username = escape_html(username),
        register_link = register_link,
    );
    Html(public_layout("Login", notice, &body))
}

/// 登录页；已登录时直接进入仪表盘
pub async fn login_page(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<LoginQuery>,
) -> Response {
    if signed_in(&headers, &state).await.is_some() {
        return Redirect::to("/dashboard").into_response();
    }
    let notice = match query.registered {
        Some(_) => Notice::Success("Registration successful! Please login.".to_string()),
        None => Notice::None,
    };
    login_view(&state, "", &notice).into_response()
}

pub async fn login_submit(
    State(state): State<AppState>,
    ConnectIp(ip): ConnectIp,
    form: Result<Form<LoginForm>, FormRejection>,
) -> WebResult<Response> {
    let form = match form {
        Ok(Form(form)) => form,
        Err(rejection) => {
            warn!("Login form rejected: {}", rejection);
            let notice = Notice::Error("Username and password are required".to_string());
            return Ok(login_view(&state, "", &notice).into_response());
        }
    };

    let identity = IdentityService::new(&state.db);
    match identity.authenticate(&form.username, &form.password, &ip).await {
        Ok(user) => {
            state.metrics.record_login(true);
            let session_id = state.sessions.create(user).await;
            let cookie = session_set_cookie(&state.settings, &session_id);
            Ok(with_cookie(cookie, Redirect::to("/dashboard")))
        }
        Err(HmsError::InvalidCredentials) => {
            state.metrics.record_login(false);
            let notice = Notice::Error(HmsError::InvalidCredentials.to_string());
            Ok(login_view(&state, form.username.trim(), &notice).into_response())
        }
        Err(e) => Err(e.into()),
    }
}

/// 登出：记录访问日志，销毁会话并清除 Cookie
pub async fn logout(
    State(state): State<AppState>,
    current: Option<CurrentUser>,
    headers: HeaderMap,
) -> Response {
    if let Some(CurrentUser(ctx)) = current {
        IdentityService::new(&state.db).logout(&ctx).await;
    }
    if let Some(session_id) = session_cookie(&headers, &state.settings.cookie_name) {
        if let Some(user) = state.sessions.destroy(&session_id).await {
            info!("User {} logged out", user.username);
        }
    }
    with_cookie(session_clear_cookie(&state.settings), Redirect::to("/login"))
}

fn register_view(form: &RegisterForm, notice: &Notice) -> Html<String> {
    let role = form.role.parse::<Role>().ok();
    let body = format!(
        r#"<form method="post" action="/register">
    <label>Username</label><input name="username" value="{username}" required>
    <label style="margin-top:10px;">Password</label><input type="password" name="password" required>
    <label style="margin-top:10px;">First name</label><input name="first_name" value="{first_name}" required>
    <label style="margin-top:10px;">Last name</label><input name="last_name" value="{last_name}" required>
    <label style="margin-top:10px;">Email</label><input type="email" name="email" value="{email}" required>
    <label style="margin-top:10px;">Role</label><select name="role">{roles}</select>
    <button type="submit">Register</button>
</form>
<p class="muted" style="margin-top:12px;">Already registered? <a href="/login">Login</a></p>"#,
        username = escape_html(&form.username),
        first_name = escape_html(&form.first_name),
        last_name = escape_html(&form.last_name),
        email = escape_html(&form.email),
        roles = options(Role::ALL, role.as_ref()),
    );
    Html(public_layout("Register", notice, &body))
}

pub async fn register_page(State(state): State<AppState>) -> Response {
    if !state.settings.registration_enabled {
        return Redirect::to("/login").into_response();
    }
    register_view(&RegisterForm::default(), &Notice::None).into_response()
}

/// 自助注册；成功后回到登录页并提示
pub async fn register_submit(
    State(state): State<AppState>,
    form: Result<Form<RegisterForm>, FormRejection>,
) -> WebResult<Response> {
    if !state.settings.registration_enabled {
        return Ok(Redirect::to("/login").into_response());
    }
    let form = match form {
        Ok(Form(form)) => form,
        Err(rejection) => {
            warn!("Registration form rejected: {}", rejection);
            let notice = Notice::Error("The submitted form was incomplete".to_string());
            return Ok(register_view(&RegisterForm::default(), &notice).into_response());
        }
    };

    let echo = RegisterForm {
        password: String::new(),
        ..form.clone()
    };
    let outcome = match form.into_registration() {
        Ok(registration) => IdentityService::new(&state.db).register(registration).await,
        Err(e) => Err(e),
    };

    match outcome {
        Ok(_) => Ok(Redirect::to("/login?registered=1").into_response()),
        Err(e) if e.is_user_facing() => {
            Ok(register_view(&echo, &Notice::Error(e.to_string())).into_response())
        }
        Err(e) => {
            if matches!(e, HmsError::Transaction(_)) {
                state.metrics.record_transaction_failure();
            }
            Err(e.into())
        }
    }
}

/// 客户端地址提取器，用于尚未登录的请求
#[derive(Debug, Clone)]
pub struct ConnectIp(pub String);

#[axum::async_trait]
impl<S: Send + Sync> FromRequestParts<S> for ConnectIp {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(ConnectIp(client_ip(parts)))
    }
}
