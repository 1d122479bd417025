//! 患者页面

use axum::{
    extract::{rejection::FormRejection, State},
    response::Html,
    Form,
};
use hms_core::{BloodGroup, Gender, RequestContext, Result};
use hms_workflow::{DischargeOutcome, PatientLifecycle, PatientOutcome, PatientsPage};

use super::{decode, settle, timestamp};
use crate::auth::CurrentUser;
use crate::error::WebResult;
use crate::forms::PatientForm;
use crate::state::AppState;
use crate::views::{esc, escape_html, layout, options, Notice};

pub async fn show(State(state): State<AppState>, CurrentUser(ctx): CurrentUser) -> WebResult<Html<String>> {
    render(&state, &ctx, Notice::None).await
}

pub async fn submit(
    State(state): State<AppState>,
    CurrentUser(ctx): CurrentUser,
    form: std::result::Result<Form<PatientForm>, FormRejection>,
) -> WebResult<Html<String>> {
    let lifecycle = PatientLifecycle::new(&state.db);
    let outcome: Result<PatientOutcome> = async {
        let command = decode(form)?.into_command()?;
        lifecycle.execute(&ctx, command).await
    }
    .await;

    match &outcome {
        Ok(PatientOutcome::Admitted(_)) => state.metrics.record_admission(),
        Ok(PatientOutcome::Discharged(DischargeOutcome::Discharged)) => state.metrics.record_discharge(),
        _ => {}
    }

    let notice = settle(&state, outcome.map(|o| o.notice().to_string()))?;
    render(&state, &ctx, notice).await
}

async fn render(state: &AppState, ctx: &RequestContext, notice: Notice) -> WebResult<Html<String>> {
    let page = PatientLifecycle::new(&state.db).page(ctx).await?;
    Ok(Html(layout("Patients", &ctx.user, "/patients", &notice, &body(&page))))
}

fn body(page: &PatientsPage) -> String {
    let mut html = String::new();

    html.push_str(&format!(
        r#"<div class="card"><h2>Register Patient</h2>
<form method="post" action="/patients">
<input type="hidden" name="action" value="add">
<div class="grid">
    <div><label>First name</label><input name="first_name" required></div>
    <div><label>Last name</label><input name="last_name" required></div>
    <div><label>Date of birth</label><input type="date" name="date_of_birth" required></div>
    <div><label>Gender</label><select name="gender">{genders}</select></div>
    <div><label>Blood group</label><select name="blood_group">{blood_groups}</select></div>
    <div><label>Phone</label><input name="phone" required></div>
    <div><label>Email</label><input type="email" name="email"></div>
    <div><label>Emergency contact</label><input name="emergency_contact" required></div>
</div>
<label style="margin-top:10px;">Address</label><textarea name="address" rows="2" required></textarea>
<button type="submit">Add Patient</button>
</form></div>"#,
        genders = options(Gender::ALL, None),
        blood_groups = options(BloodGroup::ALL, None),
    ));

    let patient_options: String = page
        .patients
        .iter()
        .map(|row| {
            format!(
                r#"<option value="{}">{}</option>"#,
                row.patient.id,
                escape_html(&row.patient.full_name())
            )
        })
        .collect();
    let room_options: String = page
        .available_rooms
        .iter()
        .map(|room| {
            format!(
                r#"<option value="{}">{} ({}, {}/{} occupied)</option>"#,
                room.id,
                escape_html(&room.room_number),
                room.room_type,
                room.occupied,
                room.capacity
            )
        })
        .collect();
    let doctor_options: String = page
        .doctors
        .iter()
        .map(|doctor| {
            format!(
                r#"<option value="{}">Dr. {}</option>"#,
                doctor.id,
                escape_html(&doctor.full_name())
            )
        })
        .collect();

    html.push_str(&format!(
        r#"<div class="card"><h2>Admit Patient</h2>
<form method="post" action="/patients">
<input type="hidden" name="action" value="admit">
<div class="grid">
    <div><label>Patient</label><select name="patient_id" required>{patient_options}</select></div>
    <div><label>Room</label><select name="room_id" required>{room_options}</select></div>
    <div><label>Doctor</label><select name="doctor_id" required>{doctor_options}</select></div>
</div>
<label style="margin-top:10px;">Diagnosis</label><textarea name="diagnosis" rows="2" required></textarea>
<button type="submit">Admit</button>
</form></div>"#,
    ));

    html.push_str(
        r#"<div class="card"><h2>Patients</h2><table>
<tr><th>Name</th><th>Date of birth</th><th>Gender</th><th>Blood group</th><th>Phone</th><th>Current admission</th><th></th></tr>"#,
    );
    for row in &page.patients {
        let patient = &row.patient;
        let admissions: String = if row.open_admissions.is_empty() {
            r#"<span class="muted">Not admitted</span>"#.to_string()
        } else {
            row.open_admissions
                .iter()
                .map(|open| {
                    format!(
                        r#"<div>Room {room} ({room_type}) with Dr. {doctor} since {since}<br><span class="muted">{diagnosis}</span>
<form method="post" action="/patients">
<input type="hidden" name="action" value="discharge">
<input type="hidden" name="admission_id" value="{admission_id}">
<input type="hidden" name="room_id" value="{room_id}">
<input name="discharge_notes" placeholder="Discharge notes">
<button type="submit">Discharge</button>
</form></div>"#,
                        room = escape_html(&open.room_number),
                        room_type = open.room_type,
                        doctor = escape_html(&open.doctor_name),
                        since = timestamp(&open.admission.admission_date),
                        diagnosis = escape_html(&open.admission.diagnosis),
                        admission_id = open.admission.id,
                        room_id = open.admission.room_id,
                    )
                })
                .collect()
        };

        html.push_str(&format!(
            r#"<tr><td>{name}</td><td>{dob}</td><td>{gender}</td><td>{blood}</td><td>{phone}</td><td>{admissions}</td>
<td><form method="post" action="/patients" class="inline">
<input type="hidden" name="action" value="remove">
<input type="hidden" name="patient_id" value="{id}">
<button type="submit" class="danger">Remove</button>
</form></td></tr>"#,
            name = escape_html(&patient.full_name()),
            dob = patient.date_of_birth,
            gender = esc(patient.gender),
            blood = esc(patient.blood_group),
            phone = escape_html(&patient.phone),
            admissions = admissions,
            id = patient.id,
        ));
    }
    html.push_str("</table></div>");
    html
}
