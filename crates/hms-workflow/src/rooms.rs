//! 病房管理

use hms_core::models::*;
use hms_core::{access, HmsError, RequestContext, Result};
use hms_database::statements;
use hms_database::{DatabasePool, DatabaseQueries};
use serde::Serialize;

/// 新病房
#[derive(Debug, Clone)]
pub struct NewRoom {
    pub room_number: String,
    pub room_type: RoomType,
    pub capacity: i64,
    pub floor_number: i64,
}

/// 病房页面的操作
#[derive(Debug, Clone)]
pub enum RoomCommand {
    Add(NewRoom),
    SetStatus { room_id: i64, status: RoomStatus },
}

#[derive(Debug, Clone, Serialize)]
pub struct RoomsPage {
    pub rooms: Vec<Room>,
}

pub struct RoomManager<'a> {
    db: &'a DatabasePool,
}

impl<'a> RoomManager<'a> {
    pub fn new(db: &'a DatabasePool) -> Self {
        Self { db }
    }

    pub async fn execute(&self, ctx: &RequestContext, command: RoomCommand) -> Result<String> {
        match command {
            RoomCommand::Add(room) => {
                self.add_room(ctx, room).await?;
                Ok("Room added successfully".to_string())
            }
            RoomCommand::SetStatus { room_id, status } => {
                self.set_status(ctx, room_id, status).await?;
                Ok("Room status updated successfully".to_string())
            }
        }
    }

    /// 新增病房，初始为 Available、占用数为零
    pub async fn add_room(&self, ctx: &RequestContext, room: NewRoom) -> Result<i64> {
        ctx.require_role(access::ROOMS)?;
        let room_number = room.room_number.trim();
        if room_number.is_empty() {
            return Err(HmsError::validation("Room number is required"));
        }
        if room.capacity < 1 {
            return Err(HmsError::validation("Capacity must be at least 1"));
        }
        if room.floor_number < 1 {
            return Err(HmsError::validation("Floor number must be at least 1"));
        }

        let mut conn = self.db.acquire().await?;
        let room_id = statements::insert_room(
            &mut conn,
            room_number,
            room.room_type,
            room.capacity,
            room.floor_number,
        )
        .await?;

        tracing::info!("Room {} ({}) added on floor {}", room_number, room.room_type, room.floor_number);
        Ok(room_id)
    }

    /// 手动设置病房状态，不校验当前占用数
    pub async fn set_status(&self, ctx: &RequestContext, room_id: i64, status: RoomStatus) -> Result<()> {
        ctx.require_role(access::ROOMS)?;

        let room = DatabaseQueries::new(self.db)
            .get_room(room_id)
            .await?
            .ok_or_else(|| HmsError::NotFound("Room not found".to_string()))?;

        if status == RoomStatus::Available && room.occupied > 0 {
            tracing::warn!(
                "Room {} forced to Available while {} patients are recorded in it",
                room.room_number,
                room.occupied
            );
        }

        let mut conn = self.db.acquire().await?;
        statements::set_room_status(&mut conn, room_id, status).await?;

        tracing::info!("Room {} status set to {} by {}", room.room_number, status, ctx.user.username);
        Ok(())
    }

    pub async fn page(&self, ctx: &RequestContext) -> Result<RoomsPage> {
        ctx.require_role(access::ROOMS)?;
        Ok(RoomsPage {
            rooms: DatabaseQueries::new(self.db).list_rooms().await?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{self, ctx};

    fn new_room(number: &str, floor_number: i64) -> NewRoom {
        NewRoom {
            room_number: number.to_string(),
            room_type: RoomType::Icu,
            capacity: 1,
            floor_number,
        }
    }

    #[tokio::test]
    async fn test_add_room_and_listing_order() {
        let db = testing::database().await;
        let rooms = RoomManager::new(&db);
        let doctor = ctx(Role::Doctor);

        rooms.add_room(&doctor, new_room("201", 2)).await.unwrap();
        rooms.add_room(&doctor, new_room("102", 1)).await.unwrap();
        rooms.add_room(&doctor, new_room("101", 1)).await.unwrap();

        let page = rooms.page(&doctor).await.unwrap();
        let numbers: Vec<_> = page.rooms.iter().map(|r| r.room_number.as_str()).collect();
        assert_eq!(numbers, ["101", "102", "201"]);
        assert!(page
            .rooms
            .iter()
            .all(|r| r.status == RoomStatus::Available && r.occupied == 0));
    }

    #[tokio::test]
    async fn test_add_room_validation() {
        let db = testing::database().await;
        let rooms = RoomManager::new(&db);
        let admin = ctx(Role::Admin);

        let mut room = new_room("301", 3);
        room.capacity = 0;
        assert!(matches!(
            rooms.add_room(&admin, room).await,
            Err(HmsError::Validation(_))
        ));
        assert!(matches!(
            rooms.add_room(&admin, new_room("", 3)).await,
            Err(HmsError::Validation(_))
        ));
        assert!(matches!(
            rooms.add_room(&ctx(Role::Nurse), new_room("301", 3)).await,
            Err(HmsError::Permission(_))
        ));
    }

    #[tokio::test]
    async fn test_set_status_does_not_touch_occupancy() {
        let db = testing::database().await;
        let room_id = testing::room(&db, "401").await;
        let mut conn = db.acquire().await.unwrap();
        statements::occupy_room_if_available(&mut conn, room_id).await.unwrap();
        drop(conn);

        let rooms = RoomManager::new(&db);
        rooms
            .set_status(&ctx(Role::Admin), room_id, RoomStatus::Available)
            .await
            .unwrap();
        assert_eq!(testing::room_state(&db, room_id).await, (1, RoomStatus::Available));

        assert!(matches!(
            rooms.set_status(&ctx(Role::Admin), 999, RoomStatus::Occupied).await,
            Err(HmsError::NotFound(_))
        ));
    }
}
