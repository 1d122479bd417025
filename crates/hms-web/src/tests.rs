use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use chrono::NaiveDate;
use hms_admin::{HmsConfig, Metrics};
use hms_core::{AuthenticatedUser, BloodGroup, Gender, RequestContext, Role, RoomType, StaffStatus};
use hms_database::{DatabasePool, DatabaseQueries};
use hms_workflow::{
    IdentityService, NewPatient, NewRoom, NewStaff, PatientLifecycle, Registration, RoomManager,
    StaffDirectory,
};
use tower::ServiceExt;

use crate::server::router;
use crate::state::AppState;

struct Harness {
    app: Router,
    db: DatabasePool,
    state: AppState,
}

async fn harness(config: HmsConfig) -> Harness {
    let db = DatabasePool::in_memory().await.unwrap();
    let queries = DatabaseQueries::new(&db);
    queries.create_tables().await.unwrap();
    queries.seed_default_department().await.unwrap();

    let identity = IdentityService::new(&db);
    for (username, role) in [("admin", Role::Admin), ("nurse", Role::Nurse)] {
        identity
            .register(Registration {
                username: username.to_string(),
                password: "secret".to_string(),
                first_name: "Test".to_string(),
                last_name: username.to_string(),
                email: format!("{}@example.org", username),
                role,
            })
            .await
            .unwrap();
    }

    let state = AppState::new(db.clone(), &config, Metrics::new().unwrap());
    Harness {
        app: router(state.clone()),
        db,
        state,
    }
}

async fn send(app: &Router, request: Request<Body>) -> Response {
    app.clone().oneshot(request).await.unwrap()
}

fn form(uri: &str, body: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

fn location(response: &Response) -> &str {
    response.headers()[header::LOCATION].to_str().unwrap()
}

async fn text(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// 登录并返回可直接放入 Cookie 头的会话
async fn login(app: &Router, username: &str) -> String {
    let response = send(app, form("/login", &format!("username={}&password=secret", username), None)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/dashboard");
    let set_cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
    assert!(set_cookie.contains("HttpOnly"));
    set_cookie.split(';').next().unwrap().to_string()
}

fn admin_ctx() -> RequestContext {
    RequestContext::new(
        AuthenticatedUser {
            user_id: 1,
            username: "admin".to_string(),
            role: Role::Admin,
        },
        "127.0.0.1",
    )
}

#[tokio::test]
async fn test_pages_require_login() {
    let h = harness(HmsConfig::default()).await;
    for uri in ["/dashboard", "/patients", "/rooms", "/staff", "/admin"] {
        let response = send(&h.app, get(uri, None)).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER, "{}", uri);
        assert_eq!(location(&response), "/login");
    }

    let response = send(&h.app, get("/dashboard", Some("hms_session=forged"))).await;
    assert_eq!(location(&response), "/login");
}

#[tokio::test]
async fn test_login_and_dashboard() {
    let h = harness(HmsConfig::default()).await;
    let cookie = login(&h.app, "admin").await;

    let response = send(&h.app, get("/dashboard", Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = text(response).await;
    assert!(html.contains("Welcome, Test admin"));
    assert!(html.contains("Occupied rooms"));
    assert!(html.contains("login"));

    let response = send(&h.app, get("/login", Some(&cookie))).await;
    assert_eq!(location(&response), "/dashboard");
}

#[tokio::test]
async fn test_rejected_login_stays_on_form() {
    let h = harness(HmsConfig::default()).await;
    let response = send(&h.app, form("/login", "username=admin&password=wrong", None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get(header::SET_COOKIE).is_none());
    assert!(text(response).await.contains("Invalid username or password"));

    let metrics = h.state.metrics.render().unwrap();
    assert!(metrics.contains("hms_logins_failed_total 1"));
}

#[tokio::test]
async fn test_deactivated_account_loses_its_session() {
    let h = harness(HmsConfig::default()).await;
    let cookie = login(&h.app, "nurse").await;
    let session_id = cookie.split_once('=').unwrap().1.to_string();

    let response = send(&h.app, get("/patients", Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::OK);

    let nurse = DatabaseQueries::new(&h.db).find_active_user("nurse").await.unwrap().unwrap();
    StaffDirectory::new(&h.db)
        .update_status(&admin_ctx(), nurse.staff_id.unwrap(), StaffStatus::Inactive)
        .await
        .unwrap();

    let response = send(&h.app, get("/patients", Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/login");
    assert!(h.state.sessions.get(&session_id).await.is_none());
}

#[tokio::test]
async fn test_role_gating_redirects_to_dashboard() {
    let h = harness(HmsConfig::default()).await;
    let cookie = login(&h.app, "nurse").await;

    let response = send(&h.app, get("/patients", Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::OK);

    for uri in ["/rooms", "/staff", "/admin"] {
        let response = send(&h.app, get(uri, Some(&cookie))).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER, "{}", uri);
        assert_eq!(location(&response), "/dashboard");
    }

    let response = send(
        &h.app,
        form("/rooms", "action=add&room_number=9&room_type=General&capacity=1&floor_number=1", Some(&cookie)),
    )
    .await;
    assert_eq!(location(&response), "/dashboard");

    let nurse_dashboard = text(send(&h.app, get("/dashboard", Some(&cookie))).await).await;
    assert!(!nurse_dashboard.contains("Occupied rooms"));
}

#[tokio::test]
async fn test_admit_and_discharge_through_forms() {
    let h = harness(HmsConfig::default()).await;
    let ctx = admin_ctx();

    let room_id = RoomManager::new(&h.db)
        .add_room(
            &ctx,
            NewRoom {
                room_number: "101".to_string(),
                room_type: RoomType::General,
                capacity: 1,
                floor_number: 1,
            },
        )
        .await
        .unwrap();
    let doctor = StaffDirectory::new(&h.db)
        .onboard(
            &ctx,
            NewStaff {
                first_name: "Gregory".to_string(),
                last_name: "House".to_string(),
                department_id: 1,
                role: Role::Doctor,
                email: "house@example.org".to_string(),
                phone: "555-0101".to_string(),
                hire_date: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
            },
        )
        .await
        .unwrap();
    let patient_id = PatientLifecycle::new(&h.db)
        .add_patient(
            &ctx,
            NewPatient {
                first_name: "Jane".to_string(),
                last_name: "Doe".to_string(),
                date_of_birth: NaiveDate::from_ymd_opt(1975, 3, 2).unwrap(),
                gender: Gender::Female,
                address: "1 Main St".to_string(),
                phone: "555-0100".to_string(),
                email: None,
                emergency_contact: "John Doe".to_string(),
                blood_group: BloodGroup::APositive,
            },
        )
        .await
        .unwrap();

    let cookie = login(&h.app, "nurse").await;
    let body = format!(
        "action=admit&patient_id={}&room_id={}&doctor_id={}&diagnosis=flu",
        patient_id, room_id, doctor.staff_id
    );
    let response = send(&h.app, form("/patients", &body, Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = text(response).await;
    assert!(html.contains("Patient admitted successfully"));
    assert!(html.contains("Room 101 (General) with Dr. Gregory House"));

    // 单床病房已满，再次入院被拒绝
    let response = send(&h.app, form("/patients", &body, Some(&cookie))).await;
    assert!(text(response).await.contains("Room is not available for admission"));

    let admission_id = DatabaseQueries::new(&h.db)
        .admissions_for_patient(patient_id)
        .await
        .unwrap()[0]
        .id;
    let body = format!(
        "action=discharge&admission_id={}&room_id={}&discharge_notes=recovered",
        admission_id, room_id
    );
    let response = send(&h.app, form("/patients", &body, Some(&cookie))).await;
    assert!(text(response).await.contains("Patient discharged successfully"));
    let response = send(&h.app, form("/patients", &body, Some(&cookie))).await;
    assert!(text(response).await.contains("Patient was already discharged"));

    let room = DatabaseQueries::new(&h.db).get_room(room_id).await.unwrap().unwrap();
    assert_eq!(room.occupied, 0);

    let metrics = h.state.metrics.render().unwrap();
    assert!(metrics.contains("hms_admissions_total 1"));
    assert!(metrics.contains("hms_discharges_total 1"));
}

#[tokio::test]
async fn test_invalid_form_is_reported_inline() {
    let h = harness(HmsConfig::default()).await;
    let cookie = login(&h.app, "admin").await;

    let response = send(&h.app, form("/rooms", "action=teleport", Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(text(response).await.contains("The submitted form was incomplete or invalid"));

    let response = send(
        &h.app,
        form("/rooms", "action=add&room_number=7&room_type=General&capacity=0&floor_number=1", Some(&cookie)),
    )
    .await;
    assert!(text(response).await.contains("Capacity must be at least 1"));
}

#[tokio::test]
async fn test_registration_and_logout() {
    let h = harness(HmsConfig::default()).await;
    let response = send(
        &h.app,
        form(
            "/register",
            "username=amy&password=pond&first_name=Amy&last_name=Pond&email=amy%40example.org&role=Doctor",
            None,
        ),
    )
    .await;
    assert_eq!(location(&response), "/login?registered=1");

    let response = send(&h.app, get("/login?registered=1", None)).await;
    assert!(text(response).await.contains("Registration successful! Please login."));

    let response = send(
        &h.app,
        form(
            "/register",
            "username=amy&password=x&first_name=A&last_name=P&email=a%40b.c&role=Nurse",
            None,
        ),
    )
    .await;
    assert!(text(response).await.contains("Username is already taken"));

    let cookie = login(&h.app, "admin").await;
    let response = send(&h.app, get("/logout", Some(&cookie))).await;
    assert_eq!(location(&response), "/login");
    assert!(response.headers()[header::SET_COOKIE]
        .to_str()
        .unwrap()
        .contains("Max-Age=0"));

    let response = send(&h.app, get("/dashboard", Some(&cookie))).await;
    assert_eq!(location(&response), "/login");
}

#[tokio::test]
async fn test_registration_can_be_disabled() {
    let mut config = HmsConfig::default();
    config.registration.enabled = false;
    let h = harness(config).await;

    let response = send(&h.app, get("/register", None)).await;
    assert_eq!(location(&response), "/login");
    let response = send(
        &h.app,
        form("/register", "username=x&password=y&first_name=a&last_name=b&email=c&role=Admin", None),
    )
    .await;
    assert_eq!(location(&response), "/login");
}

#[tokio::test]
async fn test_health_and_metrics() {
    let h = harness(HmsConfig::default()).await;

    let response = send(&h.app, get("/health", None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = serde_json::from_str(&text(response).await).unwrap();
    assert_eq!(body["status"], "healthy");

    let response = send(&h.app, get("/metrics", None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(text(response).await.contains("hms_logins_succeeded_total"));

    let response = send(&h.app, get("/", None)).await;
    assert_eq!(location(&response), "/dashboard");
}

#[tokio::test]
async fn test_admin_inventory_forms() {
    let h = harness(HmsConfig::default()).await;
    let cookie = login(&h.app, "admin").await;

    let response = send(
        &h.app,
        form(
            "/admin",
            "action=add_inventory&item_name=Gauze&category=Supplies&quantity=2&unit=box&reorder_level=5",
            Some(&cookie),
        ),
    )
    .await;
    let html = text(response).await;
    assert!(html.contains("Inventory item added successfully"));
    assert!(html.contains("Low stock: Gauze (2 box)"));
    assert!(html.contains(r#"data-item="{&quot;id&quot;:1,&quot;name&quot;:&quot;Gauze&quot;"#));

    let response = send(
        &h.app,
        form("/admin", "action=update_inventory&item_id=1&quantity=50&reorder_level=5", Some(&cookie)),
    )
    .await;
    let html = text(response).await;
    assert!(html.contains("Inventory updated successfully"));
    assert!(!html.contains("Low stock"));

    let response = send(
        &h.app,
        form("/admin", "action=remove_inventory&item_id=99", Some(&cookie)),
    )
    .await;
    assert!(text(response).await.contains("Inventory item not found"));
}
