//! 测试夹具

use chrono::NaiveDate;
use hms_core::models::*;
use hms_core::{AuthenticatedUser, RequestContext};
use hms_database::statements::{self, PatientRecord, StaffRecord};
use hms_database::{DatabasePool, DatabaseQueries};

pub async fn database() -> DatabasePool {
    let db = DatabasePool::in_memory().await.unwrap();
    prepare(&db).await;
    db
}

/// 文件数据库，多个连接并发执行
pub async fn file_database(dir: &tempfile::TempDir, connections: u32) -> DatabasePool {
    let url = format!("sqlite://{}", dir.path().join("hms.db").display());
    let db = DatabasePool::connect(&url, connections).await.unwrap();
    prepare(&db).await;
    db
}

async fn prepare(db: &DatabasePool) {
    let queries = DatabaseQueries::new(db);
    queries.create_tables().await.unwrap();
    queries.seed_default_department().await.unwrap();
}

pub fn ctx(role: Role) -> RequestContext {
    RequestContext::new(
        AuthenticatedUser {
            user_id: 1,
            username: "tester".to_string(),
            role,
        },
        "127.0.0.1",
    )
}

pub async fn staff_member(db: &DatabasePool, first: &str, last: &str, role: Role, status: StaffStatus) -> i64 {
    let mut conn = db.acquire().await.unwrap();
    let department_id = statements::first_department(&mut conn).await.unwrap().unwrap();
    statements::insert_staff(
        &mut conn,
        &StaffRecord {
            first_name: first,
            last_name: last,
            department_id,
            job_role: role,
            email: "staff@example.org",
            phone: None,
            hire_date: None,
            status,
        },
    )
    .await
    .unwrap()
}

pub async fn doctor(db: &DatabasePool) -> i64 {
    staff_member(db, "Gregory", "House", Role::Doctor, StaffStatus::Active).await
}

pub async fn room(db: &DatabasePool, number: &str) -> i64 {
    let mut conn = db.acquire().await.unwrap();
    statements::insert_room(&mut conn, number, RoomType::General, 2, 1)
        .await
        .unwrap()
}

pub async fn patient(db: &DatabasePool, first: &str, last: &str) -> i64 {
    let mut conn = db.acquire().await.unwrap();
    statements::insert_patient(
        &mut conn,
        &PatientRecord {
            first_name: first,
            last_name: last,
            date_of_birth: NaiveDate::from_ymd_opt(1980, 5, 17).unwrap(),
            gender: Gender::Female,
            address: "1 Main St",
            phone: "555-0100",
            email: None,
            emergency_contact: "555-0199",
            blood_group: BloodGroup::OPositive,
        },
    )
    .await
    .unwrap()
}

pub async fn room_state(db: &DatabasePool, room_id: i64) -> (i64, RoomStatus) {
    let room = DatabaseQueries::new(db).get_room(room_id).await.unwrap().unwrap();
    (room.occupied, room.status)
}
