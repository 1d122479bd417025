//! 病房页面

use axum::{
    extract::{rejection::FormRejection, State},
    response::Html,
    Form,
};
use hms_core::{RequestContext, Result, RoomStatus, RoomType};
use hms_workflow::{RoomManager, RoomsPage};

use super::{decode, settle};
use crate::auth::CurrentUser;
use crate::error::WebResult;
use crate::forms::RoomForm;
use crate::state::AppState;
use crate::views::{escape_html, layout, options, Notice};

pub async fn show(State(state): State<AppState>, CurrentUser(ctx): CurrentUser) -> WebResult<Html<String>> {
    render(&state, &ctx, Notice::None).await
}

pub async fn submit(
    State(state): State<AppState>,
    CurrentUser(ctx): CurrentUser,
    form: std::result::Result<Form<RoomForm>, FormRejection>,
) -> WebResult<Html<String>> {
    let manager = RoomManager::new(&state.db);
    let outcome: Result<String> = async {
        let command = decode(form)?.into_command()?;
        manager.execute(&ctx, command).await
    }
    .await;

    let notice = settle(&state, outcome)?;
    render(&state, &ctx, notice).await
}

async fn render(state: &AppState, ctx: &RequestContext, notice: Notice) -> WebResult<Html<String>> {
    let page = RoomManager::new(&state.db).page(ctx).await?;
    Ok(Html(layout("Rooms", &ctx.user, "/rooms", &notice, &body(&page))))
}

fn body(page: &RoomsPage) -> String {
    let mut html = format!(
        r#"<div class="card"><h2>Add Room</h2>
<form method="post" action="/rooms">
<input type="hidden" name="action" value="add">
<div class="grid">
    <div><label>Room number</label><input name="room_number" required></div>
    <div><label>Room type</label><select name="room_type">{room_types}</select></div>
    <div><label>Capacity</label><input type="number" name="capacity" min="1" value="1" required></div>
    <div><label>Floor</label><input type="number" name="floor_number" min="1" value="1" required></div>
</div>
<button type="submit">Add Room</button>
</form></div>
<div class="card"><h2>Rooms</h2><table>
<tr><th>Room</th><th>Type</th><th>Floor</th><th>Occupancy</th><th>Status</th></tr>"#,
        room_types = options(RoomType::ALL, None),
    );

    for room in &page.rooms {
        html.push_str(&format!(
            r#"<tr><td>{number}</td><td>{room_type}</td><td>{floor}</td><td>{occupied}/{capacity}</td>
<td><form method="post" action="/rooms" class="inline">
<input type="hidden" name="action" value="update">
<input type="hidden" name="room_id" value="{id}">
<select name="status">{statuses}</select>
<button type="submit">Update</button>
</form></td></tr>"#,
            number = escape_html(&room.room_number),
            room_type = room.room_type,
            floor = room.floor_number,
            occupied = room.occupied,
            capacity = room.capacity,
            id = room.id,
            statuses = options(RoomStatus::ALL, Some(&room.status)),
        ));
    }
    html.push_str("</table></div>");
    html
}
