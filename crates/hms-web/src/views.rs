//! 页面渲染
//!
//! 所有页面共用同一个布局和内联样式表，页面主体由各页面模块拼接。

use axum::http::StatusCode;
use hms_core::{access, AuthenticatedUser, Role};
use std::fmt::Display;

const STYLE: &str = r#"
        * { margin: 0; padding: 0; box-sizing: border-box; }
        body { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; background: #f4f6f9; color: #333; }
        nav { background: #2c3e50; padding: 0 20px; display: flex; align-items: center; gap: 18px; }
        nav .brand { color: #fff; font-weight: 600; padding: 14px 0; margin-right: auto; }
        nav a { color: #ecf0f1; text-decoration: none; padding: 14px 4px; }
        nav a.active { border-bottom: 3px solid #3498db; }
        .container { max-width: 1200px; margin: 0 auto; padding: 24px 20px; }
        h1 { margin-bottom: 18px; }
        h2 { margin: 24px 0 12px; font-size: 1.2rem; }
        .card { background: #fff; border-radius: 8px; padding: 18px; margin-bottom: 18px; box-shadow: 0 1px 3px rgba(0,0,0,.08); }
        .stats { display: grid; grid-template-columns: repeat(auto-fit, minmax(200px, 1fr)); gap: 16px; }
        .stat { font-size: 2rem; font-weight: 600; color: #2c3e50; }
        .alert { padding: 12px 16px; border-radius: 6px; margin-bottom: 16px; }
        .alert.success { background: #e8f6ee; color: #1e7d45; }
        .alert.error { background: #fdecea; color: #b3261e; }
        table { width: 100%; border-collapse: collapse; }
        th, td { text-align: left; padding: 8px 10px; border-bottom: 1px solid #e5e8ec; vertical-align: top; }
        th { background: #f8f9fb; }
        form.inline { display: inline; }
        .grid { display: grid; grid-template-columns: repeat(auto-fit, minmax(220px, 1fr)); gap: 12px; }
        label { display: block; font-size: .9rem; margin-bottom: 4px; }
        input, select, textarea { width: 100%; padding: 8px; border: 1px solid #ccd2da; border-radius: 4px; }
        button { background: #3498db; color: #fff; border: 0; border-radius: 4px; padding: 8px 14px; cursor: pointer; margin-top: 10px; }
        button.danger { background: #c0392b; }
        .low { color: #b3261e; font-weight: 600; }
        .muted { color: #7f8c8d; }
"#;

/// 表单提交后的提示
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    None,
    Success(String),
    Error(String),
}

impl Notice {
    pub fn render(&self) -> String {
        match self {
            Notice::None => String::new(),
            Notice::Success(msg) => format!(r#"<div class="alert success">{}</div>"#, escape_html(msg)),
            Notice::Error(msg) => format!(r#"<div class="alert error">{}</div>"#, escape_html(msg)),
        }
    }
}

/// HTML 转义
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// 转义任意可显示值
pub fn esc(value: impl Display) -> String {
    escape_html(&value.to_string())
}

/// 下拉选项，`selected` 与值相同时选中
pub fn options<T: Display>(values: &[T], selected: Option<&T>) -> String
where
    T: PartialEq,
{
    values
        .iter()
        .map(|v| {
            let mark = if Some(v) == selected { " selected" } else { "" };
            format!(r#"<option value="{0}"{1}>{0}</option>"#, esc(v), mark)
        })
        .collect()
}

/// 当前用户可以访问的导航项
pub fn navigation(role: Role) -> Vec<(&'static str, &'static str)> {
    let mut items = vec![("/dashboard", "Dashboard")];
    if access::PATIENTS.contains(&role) {
        items.push(("/patients", "Patients"));
    }
    if access::ROOMS.contains(&role) {
        items.push(("/rooms", "Rooms"));
    }
    if access::STAFF.contains(&role) {
        items.push(("/staff", "Staff"));
    }
    if access::ADMINISTRATION.contains(&role) {
        items.push(("/admin", "Administration"));
    }
    items
}

fn document(title: &str, nav: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title} - Hospital Management System</title>
    <style>{style}</style>
</head>
<body>
{nav}
<div class="container">
{body}
</div>
</body>
</html>"#,
        title = escape_html(title),
        style = STYLE,
        nav = nav,
        body = body,
    )
}

/// 已登录页面的布局
pub fn layout(title: &str, user: &AuthenticatedUser, active: &str, notice: &Notice, body: &str) -> String {
    let links: String = navigation(user.role)
        .into_iter()
        .map(|(href, label)| {
            let class = if href == active { r#" class="active""# } else { "" };
            format!(r#"<a href="{}"{}>{}</a>"#, href, class, label)
        })
        .collect();

    let nav = format!(
        r#"<nav><span class="brand">Hospital Management System</span>{links}<span class="muted">{user} ({role})</span><a href="/logout">Logout</a></nav>"#,
        links = links,
        user = escape_html(&user.username),
        role = esc(user.role),
    );

    let body = format!("<h1>{}</h1>\n{}\n{}", escape_html(title), notice.render(), body);
    document(title, &nav, &body)
}

/// 未登录页面（登录、注册）的布局
pub fn public_layout(title: &str, notice: &Notice, body: &str) -> String {
    let body = format!(
        r#"<div class="card" style="max-width:420px;margin:60px auto;"><h1>{}</h1>{}{}</div>"#,
        escape_html(title),
        notice.render(),
        body
    );
    document(title, "", &body)
}

/// 整页错误
pub fn error_page(status: StatusCode, message: &str) -> String {
    let body = format!(
        r#"<div class="card"><h1>{}</h1><p>{}</p><p><a href="/dashboard">Back to dashboard</a></p></div>"#,
        status.as_u16(),
        escape_html(message)
    );
    document("Error", "", &body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hms_core::RoomStatus;

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<script>alert("x")</script> & 'y'"#),
            "&lt;script&gt;alert(&quot;x&quot;)&lt;/script&gt; &amp; &#39;y&#39;"
        );
    }

    #[test]
    fn test_navigation_follows_roles() {
        let labels = |role| navigation(role).into_iter().map(|(_, l)| l).collect::<Vec<_>>();
        assert_eq!(
            labels(Role::Admin),
            ["Dashboard", "Patients", "Rooms", "Staff", "Administration"]
        );
        assert_eq!(labels(Role::Doctor), ["Dashboard", "Patients", "Rooms"]);
        assert_eq!(labels(Role::Nurse), ["Dashboard", "Patients"]);
        assert_eq!(labels(Role::SupportStaff), ["Dashboard"]);
    }

    #[test]
    fn test_options_marks_selection() {
        let html = options(RoomStatus::ALL, Some(&RoomStatus::Occupied));
        assert!(html.contains(r#"<option value="Occupied" selected>Occupied</option>"#));
        assert!(html.contains(r#"<option value="Under Maintenance">Under Maintenance</option>"#));
    }
}
