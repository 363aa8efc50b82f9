//! Router-level tests: real handlers, in-memory database, minted tokens.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use chairside_api::{build_router, AppState, JwtManager};
use chairside_core::{DiscountType, Money, Percent, Role};
use chairside_db::{Database, DbConfig, NewDiscountCode};

struct TestApp {
    router: Router,
    db: Database,
    jwt: JwtManager,
    boss_id: i64,
    staff_id: i64,
    client_id: i64,
    haircut_id: i64,
}

impl TestApp {
    async fn spawn() -> TestApp {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let boss = db.users().create("Boss", Role::Boss, None, None).await.unwrap();
        let staff = db.users().create("Amir", Role::Staff, None, None).await.unwrap();
        let client = db.clients().create("Farah", None).await.unwrap();
        let haircut = db
            .packages()
            .create("Haircut", Money::from_cents(8000), 45)
            .await
            .unwrap();
        db.discount_codes()
            .create(NewDiscountCode {
                code: "SAVE10".to_string(),
                discount_type: DiscountType::Percentage,
                percent: Some(Percent::from_bps(1000)),
                amount: None,
                applicable_packages: vec![],
            })
            .await
            .unwrap();

        let jwt = JwtManager::new("test-secret".to_string(), 3600);
        let router = build_router(AppState::new(db.clone(), jwt.clone()));

        TestApp {
            router,
            db,
            jwt,
            boss_id: boss.id,
            staff_id: staff.id,
            client_id: client.id,
            haircut_id: haircut.id,
        }
    }

    fn token(&self, user_id: i64, role: Role) -> String {
        self.jwt.generate_access_token(user_id, role).unwrap()
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    async fn create_appointment(&self, body: Value) -> (StatusCode, Value) {
        self.send(json_request("POST", "/appointments", None, body)).await
    }
}

fn json_request(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn empty_request(method: &str, uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_health() {
    let app = TestApp::spawn().await;
    let (status, body) = app.send(empty_request("GET", "/health", None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["database"], "ok");
}

#[tokio::test]
async fn test_create_with_discount_code() {
    let app = TestApp::spawn().await;
    let (status, body) = app
        .create_appointment(json!({
            "clientId": app.client_id,
            "packageId": app.haircut_id,
            "discountCode": "save10",
        }))
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["status"], "pending");
    assert_eq!(body["data"]["originalPrice"], 80.0);
    assert_eq!(body["data"]["discountAmount"], 8.0);
    assert_eq!(body["data"]["finalPrice"], 72.0);
    assert_eq!(body["data"]["discounts"].as_array().unwrap().len(), 1);

    // Second booking with the same single-use code is refused
    let (status, body) = app
        .create_appointment(json!({
            "clientId": app.client_id,
            "packageId": app.haircut_id,
            "discountCode": "SAVE10",
        }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_create_rejects_both_discount_forms() {
    let app = TestApp::spawn().await;
    let (status, body) = app
        .create_appointment(json!({
            "clientId": app.client_id,
            "packageId": app.haircut_id,
            "discountCode": "SAVE10",
            "multipleDiscountCodes": [{ "code": "SAVE10" }],
        }))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_create_unknown_package() {
    let app = TestApp::spawn().await;
    let (status, body) = app
        .create_appointment(json!({ "clientId": app.client_id, "packageId": 9999 }))
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "PACKAGE_NOT_FOUND");
}

#[tokio::test]
async fn test_malformed_json_uses_error_body() {
    let app = TestApp::spawn().await;
    let request = Request::builder()
        .method("POST")
        .uri("/appointments")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = app.send(request).await;

    assert!(status.is_client_error());
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_protected_routes_need_token() {
    let app = TestApp::spawn().await;

    let (status, body) = app.send(empty_request("GET", "/appointments/1", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "UNAUTHORIZED");

    let (status, _) = app
        .send(empty_request("GET", "/financial/overview", Some("not-a-token")))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_staff_completes_and_boss_deletes() {
    let app = TestApp::spawn().await;
    let (_, created) = app
        .create_appointment(json!({ "clientId": app.client_id, "packageId": app.haircut_id }))
        .await;
    let id = created["data"]["id"].as_i64().unwrap();
    let uri = format!("/appointments/{}", id);

    let staff_token = app.token(app.staff_id, Role::Staff);
    let (status, body) = app
        .send(json_request("PUT", &uri, Some(&staff_token), json!({ "status": "completed" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "completed");
    // Completing without a barber assigns the actor
    assert_eq!(body["data"]["barberId"], app.staff_id);

    let (status, body) = app.send(empty_request("DELETE", &uri, Some(&staff_token))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "PERMISSION_DENIED");

    let boss_token = app.token(app.boss_id, Role::Boss);
    let (status, body) = app.send(empty_request("DELETE", &uri, Some(&boss_token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let (status, _) = app.send(empty_request("GET", &uri, Some(&boss_token))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_bad_appointment_id() {
    let app = TestApp::spawn().await;
    let token = app.token(app.boss_id, Role::Boss);
    let (status, _) = app
        .send(empty_request("GET", "/appointments/abc", Some(&token)))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_validate_discount() {
    let app = TestApp::spawn().await;

    let (status, body) = app
        .send(json_request(
            "POST",
            "/discounts/validate",
            None,
            json!({ "code": "SAVE10", "clientId": app.client_id, "packageIds": [app.haircut_id] }),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["valid"], true);

    let (status, body) = app
        .send(json_request(
            "POST",
            "/discounts/validate",
            None,
            json!({ "code": "NOPE", "clientId": app.client_id }),
        ))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "DISCOUNT_NOT_FOUND");
}

#[tokio::test]
async fn test_overview_is_boss_only() {
    let app = TestApp::spawn().await;
    let (_, created) = app
        .create_appointment(json!({
            "clientId": app.client_id,
            "packageId": app.haircut_id,
            "barberId": app.staff_id,
            "discountCode": "SAVE10",
        }))
        .await;
    let id = created["data"]["id"].as_i64().unwrap();
    let boss_token = app.token(app.boss_id, Role::Boss);
    app.send(json_request(
        "PUT",
        &format!("/appointments/{}", id),
        Some(&boss_token),
        json!({ "status": "completed" }),
    ))
    .await;

    let staff_token = app.token(app.staff_id, Role::Staff);
    let (status, _) = app
        .send(empty_request("GET", "/financial/overview", Some(&staff_token)))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .send(empty_request("GET", "/financial/overview", Some(&boss_token)))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["serviceRevenue"], 72.0);
    assert_eq!(body["data"]["completedAppointments"], 1);
    // 40% default commission on RM72
    assert_eq!(body["data"]["totalCommissionPaid"], 28.8);

    let (status, body) = app
        .send(empty_request("GET", "/financial/staff-report", Some(&staff_token)))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_overview_rejects_bad_dates() {
    let app = TestApp::spawn().await;
    let token = app.token(app.boss_id, Role::Boss);
    let (status, body) = app
        .send(empty_request(
            "GET",
            "/financial/overview?startDate=01-03-2024",
            Some(&token),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_expenses_and_monthly_reset() {
    let app = TestApp::spawn().await;
    let boss_token = app.token(app.boss_id, Role::Boss);
    let staff_token = app.token(app.staff_id, Role::Staff);

    let expense = json!({
        "description": "Rent",
        "amount": 1500.0,
        "incurredAt": "2024-03-01T00:00:00Z",
    });
    let (status, _) = app
        .send(json_request("POST", "/expenses", Some(&staff_token), expense.clone()))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .send(json_request("POST", "/expenses", Some(&boss_token), expense))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["amount"], 1500.0);

    let (status, body) = app
        .send(json_request(
            "POST",
            "/financial/monthly-reset",
            Some(&boss_token),
            json!({ "cutoff": "2024-04-01T00:00:00Z" }),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["deletedExpenses"], 1);

    assert!(app.db.expenses().list_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_product_sale_for_another_seller_needs_boss() {
    let app = TestApp::spawn().await;
    let pomade = app
        .db
        .products()
        .create("Pomade", Money::from_cents(3990))
        .await
        .unwrap();
    let staff_token = app.token(app.staff_id, Role::Staff);

    let (status, body) = app
        .send(json_request(
            "POST",
            "/product-sales",
            Some(&staff_token),
            json!({ "productId": pomade.id, "quantity": 2 }),
        ))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["staffId"], app.staff_id);
    assert_eq!(body["data"]["totalPrice"], 79.8);

    let (status, _) = app
        .send(json_request(
            "POST",
            "/product-sales",
            Some(&staff_token),
            json!({ "productId": pomade.id, "staffId": app.boss_id, "quantity": 1 }),
        ))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}
