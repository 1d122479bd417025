//! 员工与科室页面

use axum::{
    extract::{rejection::FormRejection, State},
    response::Html,
    Form,
};
use hms_core::{RequestContext, Result, Role, StaffStatus};
use hms_workflow::{StaffDirectory, StaffPage};

use super::{decode, settle};
use crate::auth::CurrentUser;
use crate::error::WebResult;
use crate::forms::StaffForm;
use crate::state::AppState;
use crate::views::{esc, escape_html, layout, options, Notice};

pub async fn show(State(state): State<AppState>, CurrentUser(ctx): CurrentUser) -> WebResult<Html<String>> {
    render(&state, &ctx, Notice::None).await
}

pub async fn submit(
    State(state): State<AppState>,
    CurrentUser(ctx): CurrentUser,
    form: std::result::Result<Form<StaffForm>, FormRejection>,
) -> WebResult<Html<String>> {
    let directory = StaffDirectory::new(&state.db);
    let outcome: Result<String> = async {
        let command = decode(form)?.into_command()?;
        directory.execute(&ctx, command).await
    }
    .await;

    let notice = settle(&state, outcome)?;
    render(&state, &ctx, notice).await
}

async fn render(state: &AppState, ctx: &RequestContext, notice: Notice) -> WebResult<Html<String>> {
    let page = StaffDirectory::new(&state.db).page(ctx).await?;
    Ok(Html(layout("Staff", &ctx.user, "/staff", &notice, &body(&page))))
}

fn body(page: &StaffPage) -> String {
    let department_options: String = page
        .departments
        .iter()
        .map(|d| format!(r#"<option value="{}">{}</option>"#, d.id, escape_html(&d.name)))
        .collect();

    let mut html = format!(
        r#"<div class="card"><h2>Add Department</h2>
<form method="post" action="/staff">
<input type="hidden" name="action" value="add_department">
<div class="grid">
    <div><label>Name</label><input name="department_name" required></div>
    <div><label>Description</label><input name="description"></div>
</div>
<button type="submit">Add Department</button>
</form></div>
<div class="card"><h2>Add Staff Member</h2>
<p class="muted">A login account with a temporary password is created for every new staff member.</p>
<form method="post" action="/staff">
<input type="hidden" name="action" value="add_staff">
<div class="grid">
    <div><label>First name</label><input name="first_name" required></div>
    <div><label>Last name</label><input name="last_name" required></div>
    <div><label>Department</label><select name="department_id">{departments}</select></div>
    <div><label>Role</label><select name="role">{roles}</select></div>
    <div><label>Email</label><input type="email" name="email" required></div>
    <div><label>Phone</label><input name="phone" required></div>
    <div><label>Hire date</label><input type="date" name="hire_date" required></div>
</div>
<button type="submit">Add Staff</button>
</form></div>"#,
        departments = department_options,
        roles = options(Role::ALL, None),
    );

    html.push_str(r#"<div class="card"><h2>Departments</h2><table><tr><th>Name</th><th>Description</th></tr>"#);
    for department in &page.departments {
        html.push_str(&format!(
            "<tr><td>{}</td><td>{}</td></tr>",
            escape_html(&department.name),
            escape_html(department.description.as_deref().unwrap_or(""))
        ));
    }
    html.push_str("</table></div>");

    html.push_str(
        r#"<div class="card"><h2>Staff</h2><table>
<tr><th>Name</th><th>Department</th><th>Role</th><th>Email</th><th>Phone</th><th>Hired</th><th>Status</th></tr>"#,
    );
    for listing in &page.staff {
        let staff = &listing.staff;
        html.push_str(&format!(
            r#"<tr><td>{name}</td><td>{department}</td><td>{role}</td><td>{email}</td><td>{phone}</td><td>{hired}</td>
<td><form method="post" action="/staff" class="inline">
<input type="hidden" name="action" value="update_staff_status">
<input type="hidden" name="staff_id" value="{id}">
<select name="status">{statuses}</select>
<button type="submit">Update</button>
</form></td></tr>"#,
            name = escape_html(&staff.full_name()),
            department = escape_html(&listing.department_name),
            role = esc(staff.job_role),
            email = escape_html(&staff.email),
            phone = escape_html(staff.phone.as_deref().unwrap_or("")),
            hired = staff.hire_date.map(|d| d.to_string()).unwrap_or_default(),
            id = staff.id,
            statuses = options(StaffStatus::ALL, Some(&staff.status)),
        ));
    }
    html.push_str("</table></div>");
    html
}
