//! 管理页面：库存与支出

use axum::{
    extract::{rejection::FormRejection, State},
    response::Html,
    Form,
};
use chrono::Utc;
use hms_core::{InventoryItem, RequestContext, Result};
use hms_workflow::{AdminPage, InventoryLedger};
use tracing::warn;

use super::{decode, settle, timestamp};
use crate::auth::CurrentUser;
use crate::error::WebResult;
use crate::forms::{AdminForm, EXPENSE_CATEGORIES, INVENTORY_CATEGORIES};
use crate::state::AppState;
use crate::views::{escape_html, layout, options, Notice};

pub async fn show(State(state): State<AppState>, CurrentUser(ctx): CurrentUser) -> WebResult<Html<String>> {
    render(&state, &ctx, Notice::None).await
}

pub async fn submit(
    State(state): State<AppState>,
    CurrentUser(ctx): CurrentUser,
    form: std::result::Result<Form<AdminForm>, FormRejection>,
) -> WebResult<Html<String>> {
    let ledger = InventoryLedger::new(&state.db);
    let outcome: Result<String> = async {
        let command = decode(form)?.into_command()?;
        ledger.execute(&ctx, command).await
    }
    .await;

    let notice = settle(&state, outcome)?;
    render(&state, &ctx, notice).await
}

async fn render(state: &AppState, ctx: &RequestContext, notice: Notice) -> WebResult<Html<String>> {
    let page = InventoryLedger::new(&state.db).page(ctx).await?;
    Ok(Html(layout("Administration", &ctx.user, "/admin", &notice, &body(&page))))
}

/// 更新对话框使用的物品数据
fn item_json(item: &InventoryItem) -> String {
    serde_json::to_string(item).unwrap_or_else(|e| {
        warn!("Inventory item {} could not be serialized: {}", item.id, e);
        String::new()
    })
}

fn body(page: &AdminPage) -> String {
    let mut html = String::new();

    if !page.low_stock.is_empty() {
        let names: Vec<String> = page
            .low_stock
            .iter()
            .map(|item| format!("{} ({} {})", escape_html(&item.name), item.quantity, escape_html(&item.unit)))
            .collect();
        html.push_str(&format!(
            r#"<div class="alert error">Low stock: {}</div>"#,
            names.join(", ")
        ));
    }

    html.push_str(&format!(
        r#"<div class="card"><h2>Add Inventory Item</h2>
<form method="post" action="/admin">
<input type="hidden" name="action" value="add_inventory">
<div class="grid">
    <div><label>Name</label><input name="item_name" required></div>
    <div><label>Category</label><select name="category">{categories}</select></div>
    <div><label>Quantity</label><input type="number" name="quantity" min="0" value="0" required></div>
    <div><label>Unit</label><input name="unit" required></div>
    <div><label>Reorder level</label><input type="number" name="reorder_level" min="0" value="0" required></div>
</div>
<button type="submit">Add Item</button>
</form></div>"#,
        categories = options(INVENTORY_CATEGORIES, None),
    ));

    html.push_str(
        r#"<div class="card"><h2>Inventory</h2><table>
<tr><th>Item</th><th>Category</th><th>Stock</th><th>Updated</th><th></th></tr>"#,
    );
    for item in &page.inventory {
        let class = if item.is_low_stock() { r#" class="low""# } else { "" };
        html.push_str(&format!(
            r#"<tr data-item="{data}"><td>{name}</td><td>{category}</td><td{class}>{quantity} {unit}</td><td>{updated}</td>
<td><form method="post" action="/admin" class="inline">
<input type="hidden" name="action" value="update_inventory">
<input type="hidden" name="item_id" value="{id}">
<input type="number" name="quantity" min="0" value="{quantity}" style="width:90px">
<input type="number" name="reorder_level" min="0" value="{reorder}" style="width:90px">
<button type="submit">Update</button>
</form>
<form method="post" action="/admin" class="inline">
<input type="hidden" name="action" value="remove_inventory">
<input type="hidden" name="item_id" value="{id}">
<button type="submit" class="danger">Remove</button>
</form></td></tr>"#,
            data = escape_html(&item_json(item)),
            name = escape_html(&item.name),
            category = escape_html(&item.category),
            class = class,
            quantity = item.quantity,
            unit = escape_html(&item.unit),
            updated = timestamp(&item.last_updated),
            id = item.id,
            reorder = item.reorder_level,
        ));
    }
    html.push_str("</table></div>");

    let recorders: String = page
        .staff
        .iter()
        .map(|listing| {
            format!(
                r#"<option value="{}">{}</option>"#,
                listing.staff.id,
                escape_html(&listing.staff.full_name())
            )
        })
        .collect();
    html.push_str(&format!(
        r#"<div class="card"><h2>Record Expense</h2>
<form method="post" action="/admin">
<input type="hidden" name="action" value="add_expense">
<div class="grid">
    <div><label>Category</label><select name="expense_category">{categories}</select></div>
    <div><label>Amount</label><input type="number" name="amount" min="0" step="0.01" required></div>
    <div><label>Date</label><input type="date" name="date" value="{today}" required></div>
    <div><label>Recorded by</label><select name="recorded_by">{recorders}</select></div>
</div>
<label style="margin-top:10px;">Description</label><textarea name="description" rows="2" required></textarea>
<button type="submit">Add Expense</button>
</form></div>"#,
        categories = options(EXPENSE_CATEGORIES, None),
        today = Utc::now().date_naive(),
        recorders = recorders,
    ));

    html.push_str(r#"<div class="card"><h2>Expenses by Category</h2><table><tr><th>Category</th><th>Total</th></tr>"#);
    for (category, total) in &page.expense_totals {
        html.push_str(&format!(
            "<tr><td>{}</td><td>{:.2}</td></tr>",
            escape_html(category),
            total
        ));
    }
    html.push_str("</table></div>");

    html.push_str(
        r#"<div class="card"><h2>Expenses</h2><table>
<tr><th>Date</th><th>Category</th><th>Amount</th><th>Description</th><th>Recorded by</th><th></th></tr>"#,
    );
    for listing in &page.expenses {
        let expense = &listing.expense;
        html.push_str(&format!(
            r#"<tr><td>{date}</td><td>{category}</td><td>{amount:.2}</td><td>{description}</td><td>{recorder}</td>
<td><form method="post" action="/admin" class="inline">
<input type="hidden" name="action" value="remove_expense">
<input type="hidden" name="expense_id" value="{id}">
<button type="submit" class="danger">Remove</button>
</form></td></tr>"#,
            date = expense.date,
            category = escape_html(&expense.category),
            amount = expense.amount,
            description = escape_html(&expense.description),
            recorder = escape_html(&listing.recorder_name),
            id = expense.id,
        ));
    }
    html.push_str("</table></div>");
    html
}
