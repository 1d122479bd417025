//! 数据库表结构

use hms_core::{HmsError, Result};

use crate::queries::DatabaseQueries;

const TABLES: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS departments (
        department_id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        description TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS staff (
        staff_id INTEGER PRIMARY KEY AUTOINCREMENT,
        first_name TEXT NOT NULL,
        last_name TEXT NOT NULL,
        department_id INTEGER NOT NULL REFERENCES departments(department_id),
        role TEXT NOT NULL,
        email TEXT NOT NULL,
        phone TEXT,
        hire_date TEXT,
        status TEXT NOT NULL DEFAULT 'Active'
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS users (
        user_id INTEGER PRIMARY KEY AUTOINCREMENT,
        username TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        role TEXT NOT NULL,
        is_active INTEGER NOT NULL DEFAULT 1,
        last_login TEXT,
        staff_id INTEGER REFERENCES staff(staff_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS patients (
        patient_id INTEGER PRIMARY KEY AUTOINCREMENT,
        first_name TEXT NOT NULL,
        last_name TEXT NOT NULL,
        date_of_birth TEXT NOT NULL,
        gender TEXT NOT NULL,
        address TEXT NOT NULL,
        phone TEXT NOT NULL,
        email TEXT,
        emergency_contact TEXT NOT NULL,
        blood_group TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS rooms (
        room_id INTEGER PRIMARY KEY AUTOINCREMENT,
        room_number TEXT NOT NULL,
        room_type TEXT NOT NULL,
        capacity INTEGER NOT NULL,
        floor_number INTEGER NOT NULL,
        occupied INTEGER NOT NULL DEFAULT 0 CHECK (occupied >= 0),
        status TEXT NOT NULL DEFAULT 'Available'
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS patient_admissions (
        admission_id INTEGER PRIMARY KEY AUTOINCREMENT,
        patient_id INTEGER NOT NULL REFERENCES patients(patient_id),
        room_id INTEGER NOT NULL REFERENCES rooms(room_id),
        admission_date TEXT NOT NULL,
        doctor_id INTEGER NOT NULL REFERENCES staff(staff_id),
        diagnosis TEXT NOT NULL,
        discharge_date TEXT,
        discharge_notes TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS inventory (
        item_id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        category TEXT NOT NULL,
        quantity INTEGER NOT NULL,
        unit TEXT NOT NULL,
        reorder_level INTEGER NOT NULL,
        last_updated TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS expenses (
        expense_id INTEGER PRIMARY KEY AUTOINCREMENT,
        category TEXT NOT NULL,
        amount REAL NOT NULL,
        description TEXT NOT NULL,
        date TEXT NOT NULL,
        recorded_by INTEGER NOT NULL REFERENCES staff(staff_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS access_logs (
        log_id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL REFERENCES users(user_id),
        action TEXT NOT NULL,
        ip_address TEXT NOT NULL,
        timestamp TEXT NOT NULL
    )
    "#,
];

const INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_staff_department_id ON staff(department_id)",
    "CREATE INDEX IF NOT EXISTS idx_users_staff_id ON users(staff_id)",
    "CREATE INDEX IF NOT EXISTS idx_patients_name ON patients(last_name, first_name)",
    "CREATE INDEX IF NOT EXISTS idx_admissions_patient_id ON patient_admissions(patient_id)",
    "CREATE INDEX IF NOT EXISTS idx_admissions_open ON patient_admissions(discharge_date)",
    "CREATE INDEX IF NOT EXISTS idx_rooms_status ON rooms(status)",
    "CREATE INDEX IF NOT EXISTS idx_access_logs_timestamp ON access_logs(timestamp)",
];

impl<'a> DatabaseQueries<'a> {
    /// 创建数据库表
    pub async fn create_tables(&self) -> Result<()> {
        let pool = self.pool.pool();

        for table_sql in TABLES {
            sqlx::query(table_sql)
                .execute(pool)
                .await
                .map_err(|e| HmsError::Database(e.to_string()))?;
        }

        self.create_indexes().await?;

        tracing::info!("Database tables created successfully");
        Ok(())
    }

    /// 创建数据库索引
    async fn create_indexes(&self) -> Result<()> {
        let pool = self.pool.pool();

        for index_sql in INDEXES {
            sqlx::query(index_sql)
                .execute(pool)
                .await
                .map_err(|e| HmsError::Database(e.to_string()))?;
        }

        tracing::debug!("Database indexes created successfully");
        Ok(())
    }

    /// 科室表为空时写入默认科室，自助注册的员工挂在该科室下
    pub async fn seed_default_department(&self) -> Result<()> {
        let pool = self.pool.pool();

        let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM departments")
            .fetch_one(pool)
            .await
            .map_err(|e| HmsError::Database(e.to_string()))?;

        if existing == 0 {
            sqlx::query("INSERT INTO departments (name, description) VALUES ('General', 'Default department')")
                .execute(pool)
                .await
                .map_err(|e| HmsError::Database(e.to_string()))?;
            tracing::info!("Seeded default department");
        }

        Ok(())
    }
}
