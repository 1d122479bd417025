//! 数据库查询操作（只读）

use crate::connection::DatabasePool;
use crate::models::*;
use hms_core::models::*;
use hms_core::Result;

/// 仪表盘统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DashboardCounts {
    pub total_patients: i64,
    pub occupied_rooms: i64,
    pub active_staff: i64,
    pub low_stock_items: i64,
}

/// 数据库查询操作接口
pub struct DatabaseQueries<'a> {
    pub(crate) pool: &'a DatabasePool,
}

const STAFF_COLUMNS: &str = "s.staff_id, s.first_name, s.last_name, s.department_id, s.role, \
                             s.email, s.phone, s.hire_date, s.status";

const USER_COLUMNS: &str =
    "u.user_id, u.username, u.password_hash, u.role, u.is_active, u.last_login, u.staff_id";

impl<'a> DatabaseQueries<'a> {
    pub fn new(pool: &'a DatabasePool) -> Self {
        Self { pool }
    }

    // ========== 账号相关查询 ==========

    /// 按用户名查找启用中的账号
    pub async fn find_active_user(&self, username: &str) -> Result<Option<User>> {
        let sql = format!(
            "SELECT {} FROM users u WHERE u.username = ? AND u.is_active = 1",
            USER_COLUMNS
        );
        let row = sqlx::query_as::<_, DbUser>(&sql)
            .bind(username)
            .fetch_optional(self.pool.pool())
            .await?;

        Ok(row.map(User::from))
    }

    pub async fn get_user(&self, user_id: i64) -> Result<Option<User>> {
        let sql = format!("SELECT {} FROM users u WHERE u.user_id = ?", USER_COLUMNS);
        let row = sqlx::query_as::<_, DbUser>(&sql)
            .bind(user_id)
            .fetch_optional(self.pool.pool())
            .await?;

        Ok(row.map(User::from))
    }

    /// 员工对应的账号
    pub async fn get_user_for_staff(&self, staff_id: i64) -> Result<Option<User>> {
        let sql = format!("SELECT {} FROM users u WHERE u.staff_id = ?", USER_COLUMNS);
        let row = sqlx::query_as::<_, DbUser>(&sql)
            .bind(staff_id)
            .fetch_optional(self.pool.pool())
            .await?;

        Ok(row.map(User::from))
    }

    /// 账号及关联员工姓名
    pub async fn get_user_profile(&self, user_id: i64) -> Result<Option<UserProfile>> {
        let sql = format!(
            "SELECT {}, s.first_name, s.last_name \
             FROM users u LEFT JOIN staff s ON u.staff_id = s.staff_id \
             WHERE u.user_id = ?",
            USER_COLUMNS
        );
        let row = sqlx::query_as::<_, DbUserProfile>(&sql)
            .bind(user_id)
            .fetch_optional(self.pool.pool())
            .await?;

        Ok(row.map(UserProfile::from))
    }

    /// 最近的访问记录
    pub async fn recent_activity(&self, limit: i64) -> Result<Vec<ActivityEntry>> {
        let rows = sqlx::query_as::<_, DbActivity>(
            "SELECT al.log_id, al.user_id, al.action, al.ip_address, al.timestamp, u.username \
             FROM access_logs al JOIN users u ON al.user_id = u.user_id \
             ORDER BY al.timestamp DESC, al.log_id DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(self.pool.pool())
        .await?;

        Ok(rows.into_iter().map(ActivityEntry::from).collect())
    }

    // ========== 科室与员工 ==========

    pub async fn list_departments(&self) -> Result<Vec<Department>> {
        let rows = sqlx::query_as::<_, DbDepartment>(
            "SELECT department_id, name, description FROM departments ORDER BY name",
        )
        .fetch_all(self.pool.pool())
        .await?;

        Ok(rows.into_iter().map(Department::from).collect())
    }

    /// 员工列表（含科室名称），按姓、名排序
    pub async fn list_staff(&self) -> Result<Vec<StaffListing>> {
        let sql = format!(
            "SELECT {}, d.name AS department_name \
             FROM staff s JOIN departments d ON s.department_id = d.department_id \
             ORDER BY s.last_name, s.first_name",
            STAFF_COLUMNS
        );
        let rows = sqlx::query_as::<_, DbStaffListing>(&sql)
            .fetch_all(self.pool.pool())
            .await?;

        Ok(rows.into_iter().map(StaffListing::from).collect())
    }

    pub async fn get_staff(&self, staff_id: i64) -> Result<Option<Staff>> {
        let sql = format!("SELECT {} FROM staff s WHERE s.staff_id = ?", STAFF_COLUMNS);
        let row = sqlx::query_as::<_, DbStaff>(&sql)
            .bind(staff_id)
            .fetch_optional(self.pool.pool())
            .await?;

        Ok(row.map(Staff::from))
    }

    /// 在职医生（按职务标签筛选）
    pub async fn active_doctors(&self) -> Result<Vec<Staff>> {
        let sql = format!(
            "SELECT {} FROM staff s WHERE s.role = ? AND s.status = ? \
             ORDER BY s.last_name, s.first_name",
            STAFF_COLUMNS
        );
        let rows = sqlx::query_as::<_, DbStaff>(&sql)
            .bind(Role::Doctor.as_str())
            .bind(StaffStatus::Active.as_str())
            .fetch_all(self.pool.pool())
            .await?;

        Ok(rows.into_iter().map(Staff::from).collect())
    }

    // ========== 患者与住院 ==========

    pub async fn list_patients(&self) -> Result<Vec<Patient>> {
        let rows = sqlx::query_as::<_, DbPatient>(
            "SELECT * FROM patients ORDER BY last_name, first_name",
        )
        .fetch_all(self.pool.pool())
        .await?;

        Ok(rows.into_iter().map(Patient::from).collect())
    }

    pub async fn get_patient(&self, patient_id: i64) -> Result<Option<Patient>> {
        let row = sqlx::query_as::<_, DbPatient>("SELECT * FROM patients WHERE patient_id = ?")
            .bind(patient_id)
            .fetch_optional(self.pool.pool())
            .await?;

        Ok(row.map(Patient::from))
    }

    pub async fn get_admission(&self, admission_id: i64) -> Result<Option<Admission>> {
        let row = sqlx::query_as::<_, DbAdmission>(
            "SELECT * FROM patient_admissions WHERE admission_id = ?",
        )
        .bind(admission_id)
        .fetch_optional(self.pool.pool())
        .await?;

        Ok(row.map(Admission::from))
    }

    /// 患者的全部住院记录
    pub async fn admissions_for_patient(&self, patient_id: i64) -> Result<Vec<Admission>> {
        let rows = sqlx::query_as::<_, DbAdmission>(
            "SELECT * FROM patient_admissions WHERE patient_id = ? ORDER BY admission_date, admission_id",
        )
        .bind(patient_id)
        .fetch_all(self.pool.pool())
        .await?;

        Ok(rows.into_iter().map(Admission::from).collect())
    }

    /// 所有尚未出院的住院记录
    pub async fn open_admissions(&self) -> Result<Vec<OpenAdmission>> {
        let rows = sqlx::query_as::<_, DbOpenAdmission>(
            "SELECT pa.admission_id, pa.patient_id, pa.room_id, pa.doctor_id, pa.admission_date, \
                    pa.diagnosis, pa.discharge_date, pa.discharge_notes, \
                    r.room_number, r.room_type, \
                    s.first_name AS doctor_first_name, s.last_name AS doctor_last_name \
             FROM patient_admissions pa \
             JOIN rooms r ON pa.room_id = r.room_id \
             JOIN staff s ON pa.doctor_id = s.staff_id \
             WHERE pa.discharge_date IS NULL \
             ORDER BY pa.admission_date, pa.admission_id",
        )
        .fetch_all(self.pool.pool())
        .await?;

        Ok(rows.into_iter().map(OpenAdmission::from).collect())
    }

    // ========== 病房 ==========

    pub async fn list_rooms(&self) -> Result<Vec<Room>> {
        let rows = sqlx::query_as::<_, DbRoom>(
            "SELECT * FROM rooms ORDER BY floor_number, room_number",
        )
        .fetch_all(self.pool.pool())
        .await?;

        Ok(rows.into_iter().map(Room::from).collect())
    }

    pub async fn available_rooms(&self) -> Result<Vec<Room>> {
        let rows = sqlx::query_as::<_, DbRoom>(
            "SELECT * FROM rooms WHERE status = ? ORDER BY floor_number, room_number",
        )
        .bind(RoomStatus::Available.as_str())
        .fetch_all(self.pool.pool())
        .await?;

        Ok(rows.into_iter().map(Room::from).collect())
    }

    pub async fn get_room(&self, room_id: i64) -> Result<Option<Room>> {
        let row = sqlx::query_as::<_, DbRoom>("SELECT * FROM rooms WHERE room_id = ?")
            .bind(room_id)
            .fetch_optional(self.pool.pool())
            .await?;

        Ok(row.map(Room::from))
    }

    // ========== 库存与支出 ==========

    pub async fn list_inventory(&self) -> Result<Vec<InventoryItem>> {
        let rows = sqlx::query_as::<_, DbInventoryItem>(
            "SELECT * FROM inventory ORDER BY category, name",
        )
        .fetch_all(self.pool.pool())
        .await?;

        Ok(rows.into_iter().map(InventoryItem::from).collect())
    }

    pub async fn get_inventory_item(&self, item_id: i64) -> Result<Option<InventoryItem>> {
        let row = sqlx::query_as::<_, DbInventoryItem>("SELECT * FROM inventory WHERE item_id = ?")
            .bind(item_id)
            .fetch_optional(self.pool.pool())
            .await?;

        Ok(row.map(InventoryItem::from))
    }

    /// 支出列表（含登记人），按日期倒序
    pub async fn list_expenses(&self) -> Result<Vec<ExpenseListing>> {
        let rows = sqlx::query_as::<_, DbExpenseListing>(
            "SELECT e.expense_id, e.category, e.amount, e.description, e.date, e.recorded_by, \
                    s.first_name, s.last_name \
             FROM expenses e JOIN staff s ON e.recorded_by = s.staff_id \
             ORDER BY e.date DESC, e.expense_id DESC",
        )
        .fetch_all(self.pool.pool())
        .await?;

        Ok(rows.into_iter().map(ExpenseListing::from).collect())
    }

    // ========== 仪表盘统计 ==========

    pub async fn dashboard_counts(&self) -> Result<DashboardCounts> {
        let pool = self.pool.pool();

        let total_patients: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM patients")
            .fetch_one(pool)
            .await?;
        let occupied_rooms: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM rooms WHERE status = ?")
            .bind(RoomStatus::Occupied.as_str())
            .fetch_one(pool)
            .await?;
        let active_staff: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM staff WHERE status = ?")
            .bind(StaffStatus::Active.as_str())
            .fetch_one(pool)
            .await?;
        let low_stock_items: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM inventory WHERE quantity <= reorder_level")
                .fetch_one(pool)
                .await?;

        Ok(DashboardCounts {
            total_patients,
            occupied_rooms,
            active_staff,
            low_stock_items,
        })
    }
}
