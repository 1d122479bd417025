//! 核心数据模型定义

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::HmsError;

/// 为以固定字符串存储的枚举生成 `as_str`、`Display` 与 `FromStr`
macro_rules! stored_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident => $text:literal $(| $alias:literal)* ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
        pub enum $name {
            $( $(#[$vmeta])* #[serde(rename = $text)] $variant ),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = HmsError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim() {
                    $($text $(| $alias)* => Ok($name::$variant),)+
                    other => Err(HmsError::Validation(format!(
                        "Invalid {}: {}",
                        stringify!($name),
                        other
                    ))),
                }
            }
        }
    };
}

stored_enum! {
    /// 角色
    ///
    /// 用户表中的角色是访问控制的唯一依据；员工表中的角色仅作为职务标签，
    /// 二者在创建时复制，之后不再同步。
    pub enum Role {
        Admin => "Admin",
        Doctor => "Doctor",
        Nurse => "Nurse",
        SupportStaff => "Support Staff" | "Staff",
    }
}

stored_enum! {
    /// 员工在职状态
    pub enum StaffStatus {
        Active => "Active",
        Inactive => "Inactive",
        OnLeave => "On Leave",
    }
}

stored_enum! {
    /// 病房状态
    pub enum RoomStatus {
        Available => "Available",
        Occupied => "Occupied",
        UnderMaintenance => "Under Maintenance",
    }
}

stored_enum! {
    /// 病房类型
    pub enum RoomType {
        General => "General",
        Private => "Private",
        Icu => "ICU",
        OperationTheatre => "Operation Theatre",
    }
}

stored_enum! {
    /// 性别
    pub enum Gender {
        Male => "Male",
        Female => "Female",
        Other => "Other",
    }
}

stored_enum! {
    /// 血型
    pub enum BloodGroup {
        APositive => "A+",
        ANegative => "A-",
        BPositive => "B+",
        BNegative => "B-",
        AbPositive => "AB+",
        AbNegative => "AB-",
        OPositive => "O+",
        ONegative => "O-",
    }
}

stored_enum! {
    /// 访问日志动作
    pub enum AccessAction {
        Login => "login",
        Logout => "logout",
    }
}

/// 系统账号
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    pub is_active: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub staff_id: Option<i64>,
}

/// 账号及其关联员工姓名（仪表盘欢迎语）
#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    pub user: User,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl UserProfile {
    pub fn display_name(&self) -> String {
        match (&self.first_name, &self.last_name) {
            (Some(first), Some(last)) => format!("{} {}", first, last),
            _ => self.user.username.clone(),
        }
    }
}

/// 科室
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Department {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
}

/// 员工档案
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Staff {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub department_id: i64,
    /// 职务标签，不参与权限判断
    pub job_role: Role,
    pub email: String,
    pub phone: Option<String>,
    pub hire_date: Option<NaiveDate>,
    pub status: StaffStatus,
}

impl Staff {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// 员工及所属科室名称
#[derive(Debug, Clone, Serialize)]
pub struct StaffListing {
    pub staff: Staff,
    pub department_name: String,
}

/// 患者基本信息
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Patient {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: NaiveDate,
    pub gender: Gender,
    pub address: String,
    pub phone: String,
    pub email: Option<String>,
    pub emergency_contact: String,
    pub blood_group: BloodGroup,
}

impl Patient {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// 住院记录
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Admission {
    pub id: i64,
    pub patient_id: i64,
    pub room_id: i64,
    pub doctor_id: i64,
    pub admission_date: DateTime<Utc>,
    pub diagnosis: String,
    pub discharge_date: Option<DateTime<Utc>>,
    pub discharge_notes: Option<String>,
}

impl Admission {
    /// 尚未出院
    pub fn is_open(&self) -> bool {
        self.discharge_date.is_none()
    }
}

/// 在院记录及病房、主治医生信息
#[derive(Debug, Clone, Serialize)]
pub struct OpenAdmission {
    pub admission: Admission,
    pub room_number: String,
    pub room_type: RoomType,
    pub doctor_name: String,
}

/// 病房
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    pub id: i64,
    pub room_number: String,
    pub room_type: RoomType,
    pub capacity: i64,
    pub floor_number: i64,
    pub occupied: i64,
    pub status: RoomStatus,
}

/// 库存物品
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryItem {
    pub id: i64,
    pub name: String,
    pub category: String,
    pub quantity: i64,
    pub unit: String,
    pub reorder_level: i64,
    pub last_updated: DateTime<Utc>,
}

impl InventoryItem {
    /// 库存不高于补货线即视为低库存
    pub fn is_low_stock(&self) -> bool {
        self.quantity <= self.reorder_level
    }
}

/// 支出记录
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Expense {
    pub id: i64,
    pub category: String,
    pub amount: f64,
    pub description: String,
    pub date: NaiveDate,
    pub recorded_by: i64,
}

/// 支出及登记人姓名
#[derive(Debug, Clone, Serialize)]
pub struct ExpenseListing {
    pub expense: Expense,
    pub recorder_name: String,
}

/// 访问日志（只追加）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessLog {
    pub id: i64,
    pub user_id: i64,
    pub action: String,
    pub ip_address: String,
    pub timestamp: DateTime<Utc>,
}

/// 最近活动条目
#[derive(Debug, Clone, Serialize)]
pub struct ActivityEntry {
    pub log: AccessLog,
    pub username: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parsing() {
        assert_eq!("Admin".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!("Support Staff".parse::<Role>().unwrap(), Role::SupportStaff);
        // 注册页面使用的旧称
        assert_eq!("Staff".parse::<Role>().unwrap(), Role::SupportStaff);
        assert!("Janitor".parse::<Role>().is_err());
        assert_eq!(Role::SupportStaff.to_string(), "Support Staff");
    }

    #[test]
    fn test_status_strings() {
        assert_eq!(StaffStatus::OnLeave.as_str(), "On Leave");
        assert_eq!(
            "Under Maintenance".parse::<RoomStatus>().unwrap(),
            RoomStatus::UnderMaintenance
        );
        assert_eq!(" O- ".parse::<BloodGroup>().unwrap(), BloodGroup::ONegative);
        assert_eq!(RoomType::ALL.len(), 4);
    }

    #[test]
    fn test_low_stock_boundary() {
        let mut item = InventoryItem {
            id: 1,
            name: "Saline".to_string(),
            category: "Supplies".to_string(),
            quantity: 10,
            unit: "bags".to_string(),
            reorder_level: 10,
            last_updated: Utc::now(),
        };
        assert!(item.is_low_stock());
        item.quantity = 11;
        assert!(!item.is_low_stock());
    }
}
