//! 患者生命周期
//!
//! 入院与出院同时修改住院记录和病房占用，两者必须在同一事务内提交或回滚。

use chrono::{NaiveDate, Utc};
use hms_core::models::*;
use hms_core::{access, HmsError, RequestContext, Result};
use hms_database::statements::{self, PatientRecord};
use hms_database::{finish, DatabasePool, DatabaseQueries, SqliteConnection};
use serde::Serialize;

/// 新患者登记
#[derive(Debug, Clone)]
pub struct NewPatient {
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

impl NewPatient {
    fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("First name", &self.first_name),
            ("Last name", &self.last_name),
            ("Address", &self.address),
            ("Phone", &self.phone),
            ("Emergency contact", &self.emergency_contact),
        ] {
            if value.trim().is_empty() {
                return Err(HmsError::Validation(format!("{} is required", field)));
            }
        }
        if self.date_of_birth > Utc::now().date_naive() {
            return Err(HmsError::validation("Date of birth cannot be in the future"));
        }
        Ok(())
    }

    fn record(&self) -> PatientRecord<'_> {
        PatientRecord {
            first_name: self.first_name.trim(),
            last_name: self.last_name.trim(),
            date_of_birth: self.date_of_birth,
            gender: self.gender,
            address: self.address.trim(),
            phone: self.phone.trim(),
            email: self.email.as_deref().map(str::trim).filter(|e| !e.is_empty()),
            emergency_contact: self.emergency_contact.trim(),
            blood_group: self.blood_group,
        }
    }
}

/// 入院请求
#[derive(Debug, Clone)]
pub struct AdmitPatient {
    pub patient_id: i64,
    pub room_id: i64,
    pub doctor_id: i64,
    pub diagnosis: String,
}

/// 出院请求
#[derive(Debug, Clone)]
pub struct DischargePatient {
    pub admission_id: i64,
    pub room_id: i64,
    pub notes: Option<String>,
}

/// 出院结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DischargeOutcome {
    Discharged,
    /// 住院记录此前已关闭，本次调用未做任何修改
    AlreadyDischarged,
}

/// 患者页面的操作
#[derive(Debug, Clone)]
pub enum PatientCommand {
    Add(NewPatient),
    Admit(AdmitPatient),
    Discharge(DischargePatient),
    Remove { patient_id: i64 },
}

/// 患者命令的执行结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatientOutcome {
    Added(i64),
    Admitted(i64),
    Discharged(DischargeOutcome),
    Removed,
}

impl PatientOutcome {
    /// 展示给用户的提示
    pub fn notice(&self) -> &'static str {
        match self {
            PatientOutcome::Added(_) => "Patient added successfully",
            PatientOutcome::Admitted(_) => "Patient admitted successfully",
            PatientOutcome::Discharged(DischargeOutcome::Discharged) => "Patient discharged successfully",
            PatientOutcome::Discharged(DischargeOutcome::AlreadyDischarged) => {
                "Patient was already discharged"
            }
            PatientOutcome::Removed => "Patient removed successfully",
        }
    }
}

/// 患者及其在院记录
#[derive(Debug, Clone, Serialize)]
pub struct PatientRow {
    pub patient: Patient,
    pub open_admissions: Vec<OpenAdmission>,
}

/// 患者页面数据
#[derive(Debug, Clone, Serialize)]
pub struct PatientsPage {
    pub patients: Vec<PatientRow>,
    pub available_rooms: Vec<Room>,
    pub doctors: Vec<Staff>,
}

/// 患者生命周期组件
pub struct PatientLifecycle<'a> {
    db: &'a DatabasePool,
}

impl<'a> PatientLifecycle<'a> {
    pub fn new(db: &'a DatabasePool) -> Self {
        Self { db }
    }

    /// 执行页面命令
    pub async fn execute(&self, ctx: &RequestContext, command: PatientCommand) -> Result<PatientOutcome> {
        match command {
            PatientCommand::Add(patient) => self.add_patient(ctx, patient).await.map(PatientOutcome::Added),
            PatientCommand::Admit(request) => self.admit(ctx, request).await.map(PatientOutcome::Admitted),
            PatientCommand::Discharge(request) => {
                self.discharge(ctx, request).await.map(PatientOutcome::Discharged)
            }
            PatientCommand::Remove { patient_id } => {
                self.remove(ctx, patient_id).await?;
                Ok(PatientOutcome::Removed)
            }
        }
    }

    /// 登记新患者
    pub async fn add_patient(&self, ctx: &RequestContext, patient: NewPatient) -> Result<i64> {
        ctx.require_role(access::PATIENTS)?;
        patient.validate()?;

        let mut conn = self.db.acquire().await?;
        let patient_id = statements::insert_patient(&mut conn, &patient.record()).await?;

        tracing::info!("Patient {} registered by {}", patient_id, ctx.user.username);
        Ok(patient_id)
    }

    /// 入院：病房占用（比较并交换）与住院记录在同一事务内完成
    ///
    /// 病房不是 Available 时不写入住院记录。
    pub async fn admit(&self, ctx: &RequestContext, request: AdmitPatient) -> Result<i64> {
        ctx.require_role(access::PATIENTS)?;
        if request.diagnosis.trim().is_empty() {
            return Err(HmsError::validation("Diagnosis is required"));
        }

        let mut tx = self.db.begin().await?;
        let outcome = admit_in(&mut tx, &request).await;
        let admission_id = finish(tx, "admit patient", outcome).await?;

        tracing::info!(
            "Patient {} admitted to room {} under doctor {} (admission {})",
            request.patient_id,
            request.room_id,
            request.doctor_id,
            admission_id
        );
        Ok(admission_id)
    }

    /// 出院：关闭住院记录并释放病房；重复出院不做任何修改
    pub async fn discharge(
        &self,
        ctx: &RequestContext,
        request: DischargePatient,
    ) -> Result<DischargeOutcome> {
        ctx.require_role(access::PATIENTS)?;

        let mut tx = self.db.begin().await?;
        let outcome = discharge_in(&mut tx, &request).await;
        let outcome = finish(tx, "discharge patient", outcome).await?;

        match outcome {
            DischargeOutcome::Discharged => tracing::info!(
                "Admission {} discharged from room {}",
                request.admission_id,
                request.room_id
            ),
            DischargeOutcome::AlreadyDischarged => tracing::info!(
                "Admission {} was already discharged, nothing to do",
                request.admission_id
            ),
        }
        Ok(outcome)
    }

    /// 删除患者及其住院历史；仍有在院记录时拒绝
    pub async fn remove(&self, ctx: &RequestContext, patient_id: i64) -> Result<()> {
        ctx.require_role(access::PATIENTS)?;

        let mut tx = self.db.begin().await?;
        let outcome = remove_in(&mut tx, patient_id).await;
        let removed_admissions = finish(tx, "remove patient", outcome).await?;

        tracing::info!(
            "Patient {} removed with {} past admissions",
            patient_id,
            removed_admissions
        );
        Ok(())
    }

    /// 患者页面数据
    pub async fn page(&self, ctx: &RequestContext) -> Result<PatientsPage> {
        ctx.require_role(access::PATIENTS)?;
        let queries = DatabaseQueries::new(self.db);

        let mut open = queries.open_admissions().await?;
        let patients = queries
            .list_patients()
            .await?
            .into_iter()
            .map(|patient| {
                let (mine, rest): (Vec<_>, Vec<_>) = open
                    .drain(..)
                    .partition(|a| a.admission.patient_id == patient.id);
                open = rest;
                PatientRow {
                    patient,
                    open_admissions: mine,
                }
            })
            .collect();

        Ok(PatientsPage {
            patients,
            available_rooms: queries.available_rooms().await?,
            doctors: queries.active_doctors().await?,
        })
    }
}

async fn admit_in(conn: &mut SqliteConnection, request: &AdmitPatient) -> Result<i64> {
    if !statements::occupy_room_if_available(conn, request.room_id).await? {
        return if statements::room_exists(conn, request.room_id).await? {
            Err(HmsError::domain("Room is not available for admission"))
        } else {
            Err(HmsError::NotFound("Room not found".to_string()))
        };
    }

    if !statements::patient_exists(conn, request.patient_id).await? {
        return Err(HmsError::NotFound("Patient not found".to_string()));
    }

    match statements::staff_role_and_status(conn, request.doctor_id).await? {
        Some((Role::Doctor, StaffStatus::Active)) => {}
        Some(_) => return Err(HmsError::domain("Selected staff member is not an active doctor")),
        None => return Err(HmsError::NotFound("Doctor not found".to_string())),
    }

    statements::insert_admission(
        conn,
        request.patient_id,
        request.room_id,
        request.doctor_id,
        request.diagnosis.trim(),
        Utc::now(),
    )
    .await
}

async fn discharge_in(conn: &mut SqliteConnection, request: &DischargePatient) -> Result<DischargeOutcome> {
    let notes = request.notes.as_deref().map(str::trim).filter(|n| !n.is_empty());

    match statements::close_admission(conn, request.admission_id, notes, Utc::now()).await? {
        Some(room_id) if room_id != request.room_id => Err(HmsError::domain(
            "Admission does not belong to the selected room",
        )),
        Some(room_id) => {
            statements::release_room(conn, room_id).await?;
            Ok(DischargeOutcome::Discharged)
        }
        None => {
            if statements::admission_exists(conn, request.admission_id).await? {
                Ok(DischargeOutcome::AlreadyDischarged)
            } else {
                Err(HmsError::NotFound("Admission not found".to_string()))
            }
        }
    }
}

async fn remove_in(conn: &mut SqliteConnection, patient_id: i64) -> Result<u64> {
    if !statements::patient_exists(conn, patient_id).await? {
        return Err(HmsError::NotFound("Patient not found".to_string()));
    }

    if statements::count_open_admissions(conn, patient_id).await? > 0 {
        return Err(HmsError::domain(
            "Cannot remove patient with active admissions",
        ));
    }

    let removed = statements::delete_admissions_for_patient(conn, patient_id).await?;
    statements::delete_patient(conn, patient_id).await?;
    Ok(removed)
}
