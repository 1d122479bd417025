//! 员工与科室管理
//!
//! 员工入职同时创建员工记录和登录账号，两者要么都存在，要么都不存在。

use chrono::NaiveDate;
use hms_core::models::*;
use hms_core::utils::{derive_username, generate_temp_password, hash_password, TemporaryCredentials};
use hms_core::{access, HmsError, RequestContext, Result};
use hms_database::statements::{self, StaffRecord};
use hms_database::{finish, DatabasePool, DatabaseQueries, SqliteConnection};
use serde::Serialize;

/// 新科室
#[derive(Debug, Clone)]
pub struct NewDepartment {
    pub name: String,
    pub description: Option<String>,
}

/// 新员工
#[derive(Debug, Clone)]
pub struct NewStaff {
    pub first_name: String,
    pub last_name: String,
    pub department_id: i64,
    pub role: Role,
    pub email: String,
    pub phone: String,
    pub hire_date: NaiveDate,
}

/// 入职结果，临时密码只在这里出现一次
#[derive(Debug, Clone)]
pub struct OnboardedStaff {
    pub staff_id: i64,
    pub user_id: i64,
    pub credentials: TemporaryCredentials,
}

/// 员工页面的操作
#[derive(Debug, Clone)]
pub enum StaffCommand {
    AddDepartment(NewDepartment),
    Onboard(NewStaff),
    UpdateStatus { staff_id: i64, status: StaffStatus },
}

/// 员工页面数据
#[derive(Debug, Clone, Serialize)]
pub struct StaffPage {
    pub departments: Vec<Department>,
    pub staff: Vec<StaffListing>,
}

pub struct StaffDirectory<'a> {
    db: &'a DatabasePool,
}

impl<'a> StaffDirectory<'a> {
    pub fn new(db: &'a DatabasePool) -> Self {
        Self { db }
    }

    pub async fn execute(&self, ctx: &RequestContext, command: StaffCommand) -> Result<String> {
        match command {
            StaffCommand::AddDepartment(department) => {
                self.add_department(ctx, department).await?;
                Ok("Department added successfully".to_string())
            }
            StaffCommand::Onboard(staff) => {
                let onboarded = self.onboard(ctx, staff).await?;
                Ok(format!(
                    "Staff member added successfully. Username: {} Temporary password: {}",
                    onboarded.credentials.username, onboarded.credentials.password
                ))
            }
            StaffCommand::UpdateStatus { staff_id, status } => {
                self.update_status(ctx, staff_id, status).await?;
                Ok("Staff status updated successfully".to_string())
            }
        }
    }

    pub async fn add_department(&self, ctx: &RequestContext, department: NewDepartment) -> Result<i64> {
        ctx.require_role(access::STAFF)?;
        let name = department.name.trim();
        if name.is_empty() {
            return Err(HmsError::validation("Department name is required"));
        }
        let description = department
            .description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty());

        let mut conn = self.db.acquire().await?;
        let department_id = statements::insert_department(&mut conn, name, description).await?;

        tracing::info!("Department {} ({}) created", name, department_id);
        Ok(department_id)
    }

    /// 员工入职：员工记录、用户名、临时密码和账号在一个事务内完成
    ///
    /// 任何一步失败都会回滚，不会留下没有账号的员工记录。
    pub async fn onboard(&self, ctx: &RequestContext, staff: NewStaff) -> Result<OnboardedStaff> {
        ctx.require_role(access::STAFF)?;
        validate_staff(&staff)?;

        let mut tx = self.db.begin().await?;
        let outcome = onboard_in(&mut tx, &staff).await;
        let onboarded = finish(tx, "onboard staff", outcome).await?;

        tracing::info!(
            "Staff {} onboarded with account {} ({})",
            onboarded.staff_id,
            onboarded.credentials.username,
            staff.role
        );
        Ok(onboarded)
    }

    /// 变更在职状态；设为 Inactive 时同时停用关联账号
    pub async fn update_status(
        &self,
        ctx: &RequestContext,
        staff_id: i64,
        status: StaffStatus,
    ) -> Result<u64> {
        ctx.require_role(access::STAFF)?;

        let mut tx = self.db.begin().await?;
        let outcome = update_status_in(&mut tx, staff_id, status).await;
        let deactivated = finish(tx, "update staff status", outcome).await?;

        tracing::info!(
            "Staff {} status set to {} ({} accounts deactivated)",
            staff_id,
            status,
            deactivated
        );
        Ok(deactivated)
    }

    pub async fn page(&self, ctx: &RequestContext) -> Result<StaffPage> {
        ctx.require_role(access::STAFF)?;
        let queries = DatabaseQueries::new(self.db);

        Ok(StaffPage {
            departments: queries.list_departments().await?,
            staff: queries.list_staff().await?,
        })
    }
}

fn validate_staff(staff: &NewStaff) -> Result<()> {
    for (field, value) in [
        ("First name", &staff.first_name),
        ("Last name", &staff.last_name),
        ("Email", &staff.email),
        ("Phone", &staff.phone),
    ] {
        if value.trim().is_empty() {
            return Err(HmsError::Validation(format!("{} is required", field)));
        }
    }
    if !staff.first_name.chars().any(char::is_alphanumeric)
        || !staff.last_name.chars().any(char::is_alphanumeric)
    {
        return Err(HmsError::validation(
            "Names must contain at least one letter or digit",
        ));
    }
    Ok(())
}

async fn onboard_in(conn: &mut SqliteConnection, staff: &NewStaff) -> Result<OnboardedStaff> {
    if !statements::department_exists(conn, staff.department_id).await? {
        return Err(HmsError::NotFound("Department not found".to_string()));
    }

    let first_name = staff.first_name.trim();
    let last_name = staff.last_name.trim();
    let staff_id = statements::insert_staff(
        conn,
        &StaffRecord {
            first_name,
            last_name,
            department_id: staff.department_id,
            job_role: staff.role,
            email: staff.email.trim(),
            phone: Some(staff.phone.trim()),
            hire_date: Some(staff.hire_date),
            status: StaffStatus::Active,
        },
    )
    .await?;

    let username = derive_username(first_name, last_name, staff_id);
    let password = generate_temp_password();
    let password_hash = hash_password(&password)?;
    let user_id =
        statements::insert_user(conn, &username, &password_hash, staff.role, Some(staff_id)).await?;

    Ok(OnboardedStaff {
        staff_id,
        user_id,
        credentials: TemporaryCredentials { username, password },
    })
}

async fn update_status_in(conn: &mut SqliteConnection, staff_id: i64, status: StaffStatus) -> Result<u64> {
    if !statements::set_staff_status(conn, staff_id, status).await? {
        return Err(HmsError::NotFound("Staff member not found".to_string()));
    }

    if status == StaffStatus::Inactive {
        statements::deactivate_users_for_staff(conn, staff_id).await
    } else {
        Ok(0)
    }
}
