//! 写语句
//!
//! 每个函数执行一条（或一组紧密相关的）SQL 语句，接收单个连接，
//! 由调用方决定是否放在事务中执行：`statements::insert_patient(&mut *tx, ...)`。

use chrono::{DateTime, NaiveDate, Utc};
use hms_core::models::*;
use hms_core::Result;
use sqlx::SqliteConnection;

// ========== 患者与住院 ==========

/// 新患者插入模型
#[derive(Debug, Clone)]
pub struct PatientRecord<'a> {
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub date_of_birth: NaiveDate,
    pub gender: Gender,
    pub address: &'a str,
    pub phone: &'a str,
    pub email: Option<&'a str>,
    pub emergency_contact: &'a str,
    pub blood_group: BloodGroup,
}

pub async fn insert_patient(conn: &mut SqliteConnection, patient: &PatientRecord<'_>) -> Result<i64> {
    let id = sqlx::query_scalar(
        "INSERT INTO patients (first_name, last_name, date_of_birth, gender, address, phone, email, emergency_contact, blood_group) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?) RETURNING patient_id",
    )
    .bind(patient.first_name)
    .bind(patient.last_name)
    .bind(patient.date_of_birth)
    .bind(patient.gender.as_str())
    .bind(patient.address)
    .bind(patient.phone)
    .bind(patient.email)
    .bind(patient.emergency_contact)
    .bind(patient.blood_group.as_str())
    .fetch_one(conn)
    .await?;

    Ok(id)
}

pub async fn patient_exists(conn: &mut SqliteConnection, patient_id: i64) -> Result<bool> {
    let found: Option<i64> = sqlx::query_scalar("SELECT patient_id FROM patients WHERE patient_id = ?")
        .bind(patient_id)
        .fetch_optional(conn)
        .await?;

    Ok(found.is_some())
}

/// 占用病房：仅当病房当前为 Available 时递增占用数并置为 Occupied
///
/// 单条条件更新即比较并交换；返回是否命中。
pub async fn occupy_room_if_available(conn: &mut SqliteConnection, room_id: i64) -> Result<bool> {
    let result = sqlx::query(
        "UPDATE rooms SET occupied = occupied + 1, status = ? WHERE room_id = ? AND status = ?",
    )
    .bind(RoomStatus::Occupied.as_str())
    .bind(room_id)
    .bind(RoomStatus::Available.as_str())
    .execute(conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

pub async fn insert_admission(
    conn: &mut SqliteConnection,
    patient_id: i64,
    room_id: i64,
    doctor_id: i64,
    diagnosis: &str,
    admitted_at: DateTime<Utc>,
) -> Result<i64> {
    let id = sqlx::query_scalar(
        "INSERT INTO patient_admissions (patient_id, room_id, admission_date, doctor_id, diagnosis) \
         VALUES (?, ?, ?, ?, ?) RETURNING admission_id",
    )
    .bind(patient_id)
    .bind(room_id)
    .bind(admitted_at)
    .bind(doctor_id)
    .bind(diagnosis)
    .fetch_one(conn)
    .await?;

    Ok(id)
}

/// 关闭住院记录，仅作用于尚未出院的记录；返回记录所在病房，已出院时返回 None
pub async fn close_admission(
    conn: &mut SqliteConnection,
    admission_id: i64,
    discharge_notes: Option<&str>,
    discharged_at: DateTime<Utc>,
) -> Result<Option<i64>> {
    let room_id = sqlx::query_scalar(
        "UPDATE patient_admissions SET discharge_date = ?, discharge_notes = ? \
         WHERE admission_id = ? AND discharge_date IS NULL RETURNING room_id",
    )
    .bind(discharged_at)
    .bind(discharge_notes)
    .bind(admission_id)
    .fetch_optional(conn)
    .await?;

    Ok(room_id)
}

pub async fn admission_exists(conn: &mut SqliteConnection, admission_id: i64) -> Result<bool> {
    let found: Option<i64> =
        sqlx::query_scalar("SELECT admission_id FROM patient_admissions WHERE admission_id = ?")
            .bind(admission_id)
            .fetch_optional(conn)
            .await?;

    Ok(found.is_some())
}

/// 释放病房：占用数减一（不低于零），减到零及以下时恢复 Available，否则保持原状态
pub async fn release_room(conn: &mut SqliteConnection, room_id: i64) -> Result<bool> {
    let result = sqlx::query(
        "UPDATE rooms SET occupied = MAX(occupied - 1, 0), \
         status = CASE WHEN occupied - 1 <= 0 THEN ? ELSE status END \
         WHERE room_id = ?",
    )
    .bind(RoomStatus::Available.as_str())
    .bind(room_id)
    .execute(conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

pub async fn count_open_admissions(conn: &mut SqliteConnection, patient_id: i64) -> Result<i64> {
    let count = sqlx::query_scalar(
        "SELECT COUNT(*) FROM patient_admissions WHERE patient_id = ? AND discharge_date IS NULL",
    )
    .bind(patient_id)
    .fetch_one(conn)
    .await?;

    Ok(count)
}

pub async fn delete_admissions_for_patient(conn: &mut SqliteConnection, patient_id: i64) -> Result<u64> {
    let result = sqlx::query("DELETE FROM patient_admissions WHERE patient_id = ?")
        .bind(patient_id)
        .execute(conn)
        .await?;

    Ok(result.rows_affected())
}

pub async fn delete_patient(conn: &mut SqliteConnection, patient_id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM patients WHERE patient_id = ?")
        .bind(patient_id)
        .execute(conn)
        .await?;

    Ok(result.rows_affected() == 1)
}

// ========== 科室、员工与账号 ==========

pub async fn insert_department(
    conn: &mut SqliteConnection,
    name: &str,
    description: Option<&str>,
) -> Result<i64> {
    let id = sqlx::query_scalar(
        "INSERT INTO departments (name, description) VALUES (?, ?) RETURNING department_id",
    )
    .bind(name)
    .bind(description)
    .fetch_one(conn)
    .await?;

    Ok(id)
}

pub async fn department_exists(conn: &mut SqliteConnection, department_id: i64) -> Result<bool> {
    let found: Option<i64> =
        sqlx::query_scalar("SELECT department_id FROM departments WHERE department_id = ?")
            .bind(department_id)
            .fetch_optional(conn)
            .await?;

    Ok(found.is_some())
}

/// 编号最小的科室
pub async fn first_department(conn: &mut SqliteConnection) -> Result<Option<i64>> {
    let id = sqlx::query_scalar("SELECT MIN(department_id) FROM departments")
        .fetch_one(conn)
        .await?;

    Ok(id)
}

/// 新员工插入模型
#[derive(Debug, Clone)]
pub struct StaffRecord<'a> {
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub department_id: i64,
    pub job_role: Role,
    pub email: &'a str,
    pub phone: Option<&'a str>,
    pub hire_date: Option<NaiveDate>,
    pub status: StaffStatus,
}

pub async fn insert_staff(conn: &mut SqliteConnection, staff: &StaffRecord<'_>) -> Result<i64> {
    let id = sqlx::query_scalar(
        "INSERT INTO staff (first_name, last_name, department_id, role, email, phone, hire_date, status) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?) RETURNING staff_id",
    )
    .bind(staff.first_name)
    .bind(staff.last_name)
    .bind(staff.department_id)
    .bind(staff.job_role.as_str())
    .bind(staff.email)
    .bind(staff.phone)
    .bind(staff.hire_date)
    .bind(staff.status.as_str())
    .fetch_one(conn)
    .await?;

    Ok(id)
}

/// 员工职务与在职状态
pub async fn staff_role_and_status(
    conn: &mut SqliteConnection,
    staff_id: i64,
) -> Result<Option<(Role, StaffStatus)>> {
    let row: Option<(String, String)> =
        sqlx::query_as("SELECT role, status FROM staff WHERE staff_id = ?")
            .bind(staff_id)
            .fetch_optional(conn)
            .await?;

    Ok(row.and_then(|(role, status)| Some((role.parse().ok()?, status.parse().ok()?))))
}

pub async fn set_staff_status(conn: &mut SqliteConnection, staff_id: i64, status: StaffStatus) -> Result<bool> {
    let result = sqlx::query("UPDATE staff SET status = ? WHERE staff_id = ?")
        .bind(status.as_str())
        .bind(staff_id)
        .execute(conn)
        .await?;

    Ok(result.rows_affected() == 1)
}

/// 停用员工关联的全部账号，返回受影响账号数
pub async fn deactivate_users_for_staff(conn: &mut SqliteConnection, staff_id: i64) -> Result<u64> {
    let result = sqlx::query("UPDATE users SET is_active = 0 WHERE staff_id = ?")
        .bind(staff_id)
        .execute(conn)
        .await?;

    Ok(result.rows_affected())
}

pub async fn username_taken(conn: &mut SqliteConnection, username: &str) -> Result<bool> {
    let found: Option<i64> = sqlx::query_scalar("SELECT user_id FROM users WHERE username = ?")
        .bind(username)
        .fetch_optional(conn)
        .await?;

    Ok(found.is_some())
}

pub async fn insert_user(
    conn: &mut SqliteConnection,
    username: &str,
    password_hash: &str,
    role: Role,
    staff_id: Option<i64>,
) -> Result<i64> {
    let id = sqlx::query_scalar(
        "INSERT INTO users (username, password_hash, staff_id, role, is_active) \
         VALUES (?, ?, ?, ?, 1) RETURNING user_id",
    )
    .bind(username)
    .bind(password_hash)
    .bind(staff_id)
    .bind(role.as_str())
    .fetch_one(conn)
    .await?;

    Ok(id)
}

pub async fn touch_last_login(conn: &mut SqliteConnection, user_id: i64, at: DateTime<Utc>) -> Result<()> {
    sqlx::query("UPDATE users SET last_login = ? WHERE user_id = ?")
        .bind(at)
        .bind(user_id)
        .execute(conn)
        .await?;

    Ok(())
}

pub async fn update_password_hash(conn: &mut SqliteConnection, user_id: i64, password_hash: &str) -> Result<bool> {
    let result = sqlx::query("UPDATE users SET password_hash = ? WHERE user_id = ?")
        .bind(password_hash)
        .bind(user_id)
        .execute(conn)
        .await?;

    Ok(result.rows_affected() == 1)
}

pub async fn append_access_log(
    conn: &mut SqliteConnection,
    user_id: i64,
    action: AccessAction,
    ip_address: &str,
    at: DateTime<Utc>,
) -> Result<i64> {
    let id = sqlx::query_scalar(
        "INSERT INTO access_logs (user_id, action, ip_address, timestamp) VALUES (?, ?, ?, ?) RETURNING log_id",
    )
    .bind(user_id)
    .bind(action.as_str())
    .bind(ip_address)
    .bind(at)
    .fetch_one(conn)
    .await?;

    Ok(id)
}

// ========== 病房 ==========

pub async fn insert_room(
    conn: &mut SqliteConnection,
    room_number: &str,
    room_type: RoomType,
    capacity: i64,
    floor_number: i64,
) -> Result<i64> {
    let id = sqlx::query_scalar(
        "INSERT INTO rooms (room_number, room_type, capacity, floor_number, occupied, status) \
         VALUES (?, ?, ?, ?, 0, ?) RETURNING room_id",
    )
    .bind(room_number)
    .bind(room_type.as_str())
    .bind(capacity)
    .bind(floor_number)
    .bind(RoomStatus::Available.as_str())
    .fetch_one(conn)
    .await?;

    Ok(id)
}

pub async fn room_exists(conn: &mut SqliteConnection, room_id: i64) -> Result<bool> {
    let found: Option<i64> = sqlx::query_scalar("SELECT room_id FROM rooms WHERE room_id = ?")
        .bind(room_id)
        .fetch_optional(conn)
        .await?;

    Ok(found.is_some())
}

pub async fn set_room_status(conn: &mut SqliteConnection, room_id: i64, status: RoomStatus) -> Result<bool> {
    let result = sqlx::query("UPDATE rooms SET status = ? WHERE room_id = ?")
        .bind(status.as_str())
        .bind(room_id)
        .execute(conn)
        .await?;

    Ok(result.rows_affected() == 1)
}

// ========== 库存与支出 ==========

pub async fn insert_inventory_item(
    conn: &mut SqliteConnection,
    name: &str,
    category: &str,
    quantity: i64,
    unit: &str,
    reorder_level: i64,
    at: DateTime<Utc>,
) -> Result<i64> {
    let id = sqlx::query_scalar(
        "INSERT INTO inventory (name, category, quantity, unit, reorder_level, last_updated) \
         VALUES (?, ?, ?, ?, ?, ?) RETURNING item_id",
    )
    .bind(name)
    .bind(category)
    .bind(quantity)
    .bind(unit)
    .bind(reorder_level)
    .bind(at)
    .fetch_one(conn)
    .await?;

    Ok(id)
}

pub async fn update_inventory_stock(
    conn: &mut SqliteConnection,
    item_id: i64,
    quantity: i64,
    reorder_level: i64,
    at: DateTime<Utc>,
) -> Result<bool> {
    let result = sqlx::query(
        "UPDATE inventory SET quantity = ?, reorder_level = ?, last_updated = ? WHERE item_id = ?",
    )
    .bind(quantity)
    .bind(reorder_level)
    .bind(at)
    .bind(item_id)
    .execute(conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

pub async fn delete_inventory_item(conn: &mut SqliteConnection, item_id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM inventory WHERE item_id = ?")
        .bind(item_id)
        .execute(conn)
        .await?;

    Ok(result.rows_affected() == 1)
}

pub async fn staff_exists(conn: &mut SqliteConnection, staff_id: i64) -> Result<bool> {
    let found: Option<i64> = sqlx::query_scalar("SELECT staff_id FROM staff WHERE staff_id = ?")
        .bind(staff_id)
        .fetch_optional(conn)
        .await?;

    Ok(found.is_some())
}

pub async fn insert_expense(
    conn: &mut SqliteConnection,
    category: &str,
    amount: f64,
    description: &str,
    date: NaiveDate,
    recorded_by: i64,
) -> Result<i64> {
    let id = sqlx::query_scalar(
        "INSERT INTO expenses (category, amount, description, date, recorded_by) \
         VALUES (?, ?, ?, ?, ?) RETURNING expense_id",
    )
    .bind(category)
    .bind(amount)
    .bind(description)
    .bind(date)
    .bind(recorded_by)
    .fetch_one(conn)
    .await?;

    Ok(id)
}

pub async fn delete_expense(conn: &mut SqliteConnection, expense_id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM expenses WHERE expense_id = ?")
        .bind(expense_id)
        .execute(conn)
        .await?;

    Ok(result.rows_affected() == 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DatabasePool, DatabaseQueries};

    async fn setup() -> DatabasePool {
        let db = DatabasePool::in_memory().await.unwrap();
        DatabaseQueries::new(&db).create_tables().await.unwrap();
        db
    }

    #[tokio::test]
    async fn test_occupy_room_only_when_available() {
        let db = setup().await;
        let mut conn = db.pool().acquire().await.unwrap();
        let room_id = insert_room(&mut conn, "101", RoomType::General, 2, 1).await.unwrap();

        assert!(occupy_room_if_available(&mut conn, room_id).await.unwrap());
        assert!(!occupy_room_if_available(&mut conn, room_id).await.unwrap());
        drop(conn);

        let room = DatabaseQueries::new(&db).get_room(room_id).await.unwrap().unwrap();
        assert_eq!(room.occupied, 1);
        assert_eq!(room.status, RoomStatus::Occupied);
    }

    #[tokio::test]
    async fn test_release_room_clamps_at_zero() {
        let db = setup().await;
        let mut conn = db.pool().acquire().await.unwrap();
        let room_id = insert_room(&mut conn, "102", RoomType::Private, 1, 1).await.unwrap();
        set_room_status(&mut conn, room_id, RoomStatus::Occupied).await.unwrap();

        release_room(&mut conn, room_id).await.unwrap();
        release_room(&mut conn, room_id).await.unwrap();
        drop(conn);

        let room = DatabaseQueries::new(&db).get_room(room_id).await.unwrap().unwrap();
        assert_eq!(room.occupied, 0);
        assert_eq!(room.status, RoomStatus::Available);
    }

    #[tokio::test]
    async fn test_release_room_keeps_status_while_still_occupied() {
        let db = setup().await;
        let mut conn = db.pool().acquire().await.unwrap();
        let room_id = insert_room(&mut conn, "103", RoomType::General, 4, 1).await.unwrap();
        sqlx::query("UPDATE rooms SET occupied = 2, status = 'Occupied' WHERE room_id = ?")
            .bind(room_id)
            .execute(&mut *conn)
            .await
            .unwrap();

        release_room(&mut conn, room_id).await.unwrap();
        drop(conn);

        let room = DatabaseQueries::new(&db).get_room(room_id).await.unwrap().unwrap();
        assert_eq!(room.occupied, 1);
        assert_eq!(room.status, RoomStatus::Occupied);
    }

    #[tokio::test]
    async fn test_first_department_on_empty_table() {
        let db = setup().await;
        let mut conn = db.pool().acquire().await.unwrap();
        assert_eq!(first_department(&mut conn).await.unwrap(), None);

        let id = insert_department(&mut conn, "Cardiology", None).await.unwrap();
        assert_eq!(first_department(&mut conn).await.unwrap(), Some(id));
    }
}
