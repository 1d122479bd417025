//! 仪表盘：统计、快捷入口、最近访问记录和修改密码

use axum::{
    extract::{rejection::FormRejection, State},
    response::Html,
    Form,
};
use hms_core::{RequestContext, Result};
use hms_workflow::{Dashboard, DashboardPage, IdentityService};

use super::{decode, settle, timestamp};
use crate::auth::CurrentUser;
use crate::error::WebResult;
use crate::forms::AccountForm;
use crate::state::AppState;
use crate::views::{escape_html, layout, navigation, Notice};

pub async fn show(State(state): State<AppState>, CurrentUser(ctx): CurrentUser) -> WebResult<Html<String>> {
    render(&state, &ctx, Notice::None).await
}

pub async fn submit(
    State(state): State<AppState>,
    CurrentUser(ctx): CurrentUser,
    form: std::result::Result<Form<AccountForm>, FormRejection>,
) -> WebResult<Html<String>> {
    let identity = IdentityService::new(&state.db);
    let outcome: Result<String> = async {
        let command = decode(form)?.into_command();
        identity.execute(&ctx, command).await
    }
    .await;

    let notice = settle(&state, outcome)?;
    render(&state, &ctx, notice).await
}

async fn render(state: &AppState, ctx: &RequestContext, notice: Notice) -> WebResult<Html<String>> {
    let page = Dashboard::new(&state.db).page(ctx).await?;
    Ok(Html(layout("Dashboard", &ctx.user, "/dashboard", &notice, &body(&page))))
}

fn body(page: &DashboardPage) -> String {
    let user = &page.profile.user;
    let last_login = user
        .last_login
        .as_ref()
        .map(timestamp)
        .unwrap_or_else(|| "never".to_string());

    let mut html = format!(
        r#"<div class="card"><h2>Welcome, {name}</h2><p class="muted">Role: {role} &middot; Last login: {last_login}</p></div>"#,
        name = escape_html(&page.profile.display_name()),
        role = user.role,
        last_login = last_login,
    );

    if let Some(counts) = &page.counts {
        html.push_str(&format!(
            r#"<div class="stats">
    <div class="card"><div class="muted">Patients</div><div class="stat">{}</div></div>
    <div class="card"><div class="muted">Occupied rooms</div><div class="stat">{}</div></div>
    <div class="card"><div class="muted">Active staff</div><div class="stat">{}</div></div>
    <div class="card"><div class="muted">Low stock items</div><div class="stat">{}</div></div>
</div>"#,
            counts.total_patients, counts.occupied_rooms, counts.active_staff, counts.low_stock_items
        ));
    }

    let links: Vec<String> = navigation(user.role)
        .into_iter()
        .filter(|(href, _)| *href != "/dashboard")
        .map(|(href, label)| format!(r#"<a href="{}">{}</a>"#, href, label))
        .collect();
    if !links.is_empty() {
        html.push_str(&format!(
            r#"<div class="card"><h2>Quick Links</h2><p>{}</p></div>"#,
            links.join(" &middot; ")
        ));
    }

    if !page.recent_activity.is_empty() {
        html.push_str(
            r#"<div class="card"><h2>Recent Activity</h2><table><tr><th>User</th><th>Action</th><th>IP address</th><th>Time</th></tr>"#,
        );
        for entry in &page.recent_activity {
            html.push_str(&format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                escape_html(&entry.username),
                escape_html(&entry.log.action),
                escape_html(&entry.log.ip_address),
                timestamp(&entry.log.timestamp)
            ));
        }
        html.push_str("</table></div>");
    }

    html.push_str(
        r#"<div class="card"><h2>Change Password</h2>
<form method="post" action="/dashboard">
<input type="hidden" name="action" value="change_password">
<div class="grid">
    <div><label>Current password</label><input type="password" name="current_password" required></div>
    <div><label>New password</label><input type="password" name="new_password" required></div>
    <div><label>Confirm new password</label><input type="password" name="confirm_password" required></div>
</div>
<button type="submit">Change Password</button>
</form></div>"#,
    );
    html
}
