//! 数据库模型

use chrono::{DateTime, NaiveDate, Utc};
use hms_core::models::*;
use sqlx::FromRow;
use std::fmt::Debug;
use std::str::FromStr;

// 数据库表模型 - 使用FromRow trait用于SQL查询
// 枚举列存储为字符串，读取时转换；无法识别的取值回退到最保守的枚举并记录告警

fn parse_stored<T>(column: &str, value: &str, fallback: T) -> T
where
    T: FromStr + Debug,
{
    value.parse().unwrap_or_else(|_| {
        tracing::warn!(
            "Unrecognized {} value {:?}, falling back to {:?}",
            column,
            value,
            fallback
        );
        fallback
    })
}

/// 数据库用户表
#[derive(Debug, FromRow)]
pub struct DbUser {
    pub user_id: i64,
    pub username: String,
    pub password_hash: String,
    pub role: String,
    pub is_active: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub staff_id: Option<i64>,
}

impl From<DbUser> for User {
    fn from(db_user: DbUser) -> Self {
        User {
            id: db_user.user_id,
            username: db_user.username,
            password_hash: db_user.password_hash,
            role: parse_stored("users.role", &db_user.role, Role::SupportStaff),
            is_active: db_user.is_active,
            last_login: db_user.last_login,
            staff_id: db_user.staff_id,
        }
    }
}

/// 用户及关联员工姓名
#[derive(Debug, FromRow)]
pub struct DbUserProfile {
    #[sqlx(flatten)]
    pub user: DbUser,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl From<DbUserProfile> for UserProfile {
    fn from(row: DbUserProfile) -> Self {
        UserProfile {
            user: User::from(row.user),
            first_name: row.first_name,
            last_name: row.last_name,
        }
    }
}

/// 数据库科室表
#[derive(Debug, FromRow)]
pub struct DbDepartment {
    pub department_id: i64,
    pub name: String,
    pub description: Option<String>,
}

impl From<DbDepartment> for Department {
    fn from(row: DbDepartment) -> Self {
        Department {
            id: row.department_id,
            name: row.name,
            description: row.description,
        }
    }
}

/// 数据库员工表
#[derive(Debug, FromRow)]
pub struct DbStaff {
    pub staff_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub department_id: i64,
    pub role: String,
    pub email: String,
    pub phone: Option<String>,
    pub hire_date: Option<NaiveDate>,
    pub status: String,
}

impl From<DbStaff> for Staff {
    fn from(row: DbStaff) -> Self {
        Staff {
            id: row.staff_id,
            first_name: row.first_name,
            last_name: row.last_name,
            department_id: row.department_id,
            job_role: parse_stored("staff.role", &row.role, Role::SupportStaff),
            email: row.email,
            phone: row.phone,
            hire_date: row.hire_date,
            status: parse_stored("staff.status", &row.status, StaffStatus::Inactive),
        }
    }
}

/// 员工及科室名称
#[derive(Debug, FromRow)]
pub struct DbStaffListing {
    #[sqlx(flatten)]
    pub staff: DbStaff,
    pub department_name: String,
}

impl From<DbStaffListing> for StaffListing {
    fn from(row: DbStaffListing) -> Self {
        StaffListing {
            staff: Staff::from(row.staff),
            department_name: row.department_name,
        }
    }
}

/// 数据库患者表
#[derive(Debug, FromRow)]
pub struct DbPatient {
    pub patient_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: NaiveDate,
    pub gender: String,
    pub address: String,
    pub phone: String,
    pub email: Option<String>,
    pub emergency_contact: String,
    pub blood_group: String,
}

impl From<DbPatient> for Patient {
    fn from(row: DbPatient) -> Self {
        Patient {
            id: row.patient_id,
            first_name: row.first_name,
            last_name: row.last_name,
            date_of_birth: row.date_of_birth,
            gender: parse_stored("patients.gender", &row.gender, Gender::Other),
            address: row.address,
            phone: row.phone,
            email: row.email,
            emergency_contact: row.emergency_contact,
            blood_group: parse_stored("patients.blood_group", &row.blood_group, BloodGroup::ONegative),
        }
    }
}

/// 数据库住院记录表
#[derive(Debug, FromRow)]
pub struct DbAdmission {
    pub admission_id: i64,
    pub patient_id: i64,
    pub room_id: i64,
    pub doctor_id: i64,
    pub admission_date: DateTime<Utc>,
    pub diagnosis: String,
    pub discharge_date: Option<DateTime<Utc>>,
    pub discharge_notes: Option<String>,
}

impl From<DbAdmission> for Admission {
    fn from(row: DbAdmission) -> Self {
        Admission {
            id: row.admission_id,
            patient_id: row.patient_id,
            room_id: row.room_id,
            doctor_id: row.doctor_id,
            admission_date: row.admission_date,
            diagnosis: row.diagnosis,
            discharge_date: row.discharge_date,
            discharge_notes: row.discharge_notes,
        }
    }
}

/// 在院记录及病房、医生信息
#[derive(Debug, FromRow)]
pub struct DbOpenAdmission {
    #[sqlx(flatten)]
    pub admission: DbAdmission,
    pub room_number: String,
    pub room_type: String,
    pub doctor_first_name: String,
    pub doctor_last_name: String,
}

impl From<DbOpenAdmission> for OpenAdmission {
    fn from(row: DbOpenAdmission) -> Self {
        OpenAdmission {
            admission: Admission::from(row.admission),
            room_number: row.room_number,
            room_type: parse_stored("rooms.room_type", &row.room_type, RoomType::General),
            doctor_name: format!("{} {}", row.doctor_first_name, row.doctor_last_name),
        }
    }
}

/// 数据库病房表
#[derive(Debug, FromRow)]
pub struct DbRoom {
    pub room_id: i64,
    pub room_number: String,
    pub room_type: String,
    pub capacity: i64,
    pub floor_number: i64,
    pub occupied: i64,
    pub status: String,
}

impl From<DbRoom> for Room {
    fn from(row: DbRoom) -> Self {
        Room {
            id: row.room_id,
            room_number: row.room_number,
            room_type: parse_stored("rooms.room_type", &row.room_type, RoomType::General),
            capacity: row.capacity,
            floor_number: row.floor_number,
            occupied: row.occupied,
            status: parse_stored("rooms.status", &row.status, RoomStatus::UnderMaintenance),
        }
    }
}

/// 数据库库存表
#[derive(Debug, FromRow)]
pub struct DbInventoryItem {
    pub item_id: i64,
    pub name: String,
    pub category: String,
    pub quantity: i64,
    pub unit: String,
    pub reorder_level: i64,
    pub last_updated: DateTime<Utc>,
}

impl From<DbInventoryItem> for InventoryItem {
    fn from(row: DbInventoryItem) -> Self {
        InventoryItem {
            id: row.item_id,
            name: row.name,
            category: row.category,
            quantity: row.quantity,
            unit: row.unit,
            reorder_level: row.reorder_level,
            last_updated: row.last_updated,
        }
    }
}

/// 数据库支出表
#[derive(Debug, FromRow)]
pub struct DbExpense {
    pub expense_id: i64,
    pub category: String,
    pub amount: f64,
    pub description: String,
    pub date: NaiveDate,
    pub recorded_by: i64,
}

impl From<DbExpense> for Expense {
    fn from(row: DbExpense) -> Self {
        Expense {
            id: row.expense_id,
            category: row.category,
            amount: row.amount,
            description: row.description,
            date: row.date,
            recorded_by: row.recorded_by,
        }
    }
}

/// 支出及登记人
#[derive(Debug, FromRow)]
pub struct DbExpenseListing {
    #[sqlx(flatten)]
    pub expense: DbExpense,
    pub first_name: String,
    pub last_name: String,
}

impl From<DbExpenseListing> for ExpenseListing {
    fn from(row: DbExpenseListing) -> Self {
        ExpenseListing {
            expense: Expense::from(row.expense),
            recorder_name: format!("{} {}", row.first_name, row.last_name),
        }
    }
}

/// 数据库访问日志表
#[derive(Debug, FromRow)]
pub struct DbAccessLog {
    pub log_id: i64,
    pub user_id: i64,
    pub action: String,
    pub ip_address: String,
    pub timestamp: DateTime<Utc>,
}

/// 访问日志及用户名
#[derive(Debug, FromRow)]
pub struct DbActivity {
    #[sqlx(flatten)]
    pub log: DbAccessLog,
    pub username: String,
}

impl From<DbActivity> for ActivityEntry {
    fn from(row: DbActivity) -> Self {
        ActivityEntry {
            log: AccessLog {
                id: row.log.log_id,
                user_id: row.log.user_id,
                action: row.log.action,
                ip_address: row.log.ip_address,
                timestamp: row.log.timestamp,
            },
            username: row.username,
        }
    }
}
