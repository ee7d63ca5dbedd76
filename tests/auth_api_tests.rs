use actix_web::{test, web, App};
use serde_json::json;
use std::sync::Arc;

use savory_bliss::api::{self, AppState};
use savory_bliss::auth::AuthService;
use savory_bliss::store::Store;

fn create_app_state() -> AppState {
    let store = Arc::new(Store::new(":memory:").unwrap());
    let auth_service = Arc::new(AuthService::new(
        "test_secret".to_string(),
        "test_refresh_secret".to_string(),
    ));
    AppState::new(store, auth_service)
}

macro_rules! app {
    () => {
        test::init_service(
            App::new()
                .app_data(web::Data::new(create_app_state()))
                .configure(api::configure_routes),
        )
        .await
    };
}

fn register_body(username: &str, email: &str, password: &str) -> serde_json::Value {
    json!({ "username": username, "email": email, "password": password })
}

// ==================== Registration Tests ====================

#[actix_web::test]
async fn test_register_success() {
    let app = app!();

    let req = test::TestRequest::post()
        .uri("/api/auth/register")
        .set_json(register_body("chefanna", "Anna@Example.com", "secret123"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 201);

    let body: serde_json::Value = test::read_body_json(resp).await;
    assert!(body["token"].is_string());
    assert!(body["refreshToken"].is_string());
    assert_eq!(body["user"]["username"], "chefanna");
    assert_eq!(body["user"]["email"], "anna@example.com");
    assert_eq!(body["user"]["name"], "chefanna");
    assert!(body["user"]["passwordHash"].is_null());
    assert_eq!(body["user"]["savedRecipes"], json!([]));
}

#[actix_web::test]
async fn test_register_validation() {
    let app = app!();

    let cases = [
        register_body("ann", "ann@example.com", "secret123"),
        register_body("chefanna", "   ", "secret123"),
        register_body("chefanna", "ann@example.com", "12345"),
    ];
    for body in cases {
        let req = test::TestRequest::post()
            .uri("/api/auth/register")
            .set_json(&body)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 400, "expected 400 for {}", body);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], false);
        assert!(body["error"].is_string());
    }
}

#[actix_web::test]
async fn test_register_duplicate_email() {
    let app = app!();

    let req = test::TestRequest::post()
        .uri("/api/auth/register")
        .set_json(register_body("chefanna", "anna@example.com", "secret123"))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 201);

    let req = test::TestRequest::post()
        .uri("/api/auth/register")
        .set_json(register_body("otheranna", "ANNA@example.com", "secret456"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 409);
}

// ==================== Login Tests ====================

#[actix_web::test]
async fn test_login_and_verify() {
    let app = app!();

    let req = test::TestRequest::post()
        .uri("/api/auth/register")
        .set_json(register_body("chefanna", "anna@example.com", "secret123"))
        .to_request();
    test::call_service(&app, req).await;

    let req = test::TestRequest::post()
        .uri("/api/auth/login")
        .set_json(json!({ "email": "anna@example.com", "password": "secret123" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = test::read_body_json(resp).await;
    let token = body["token"].as_str().unwrap().to_string();

    let req = test::TestRequest::get()
        .uri("/api/auth/verify")
        .insert_header(("Authorization", format!("Bearer {}", token)))
        .to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["username"], "chefanna");
}

#[actix_web::test]
async fn test_login_invalid_credentials() {
    let app = app!();

    let req = test::TestRequest::post()
        .uri("/api/auth/register")
        .set_json(register_body("chefanna", "anna@example.com", "secret123"))
        .to_request();
    test::call_service(&app, req).await;

    let req = test::TestRequest::post()
        .uri("/api/auth/login")
        .set_json(json!({ "email": "anna@example.com", "password": "wrongpass" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 401);

    let req = test::TestRequest::post()
        .uri("/api/auth/login")
        .set_json(json!({ "email": "nobody@example.com", "password": "secret123" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 401);
}

#[actix_web::test]
async fn test_verify_requires_token() {
    let app = app!();

    let req = test::TestRequest::get().uri("/api/auth/verify").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 401);

    let req = test::TestRequest::get()
        .uri("/api/auth/verify")
        .insert_header(("Authorization", "Bearer not-a-token"))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 401);
}

// ==================== Refresh Tests ====================

#[actix_web::test]
async fn test_refresh_issues_new_pair() {
    let app = app!();

    let req = test::TestRequest::post()
        .uri("/api/auth/register")
        .set_json(register_body("chefanna", "anna@example.com", "secret123"))
        .to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    let access = body["token"].as_str().unwrap().to_string();
    let refresh = body["refreshToken"].as_str().unwrap().to_string();

    let req = test::TestRequest::post()
        .uri("/api/auth/refresh")
        .set_json(json!({ "refreshToken": refresh }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert!(body["token"].is_string());
    assert!(body["refreshToken"].is_string());

    // An access token is not accepted as a refresh token.
    let req = test::TestRequest::post()
        .uri("/api/auth/refresh")
        .set_json(json!({ "refreshToken": access }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 401);
}

// ==================== Profile Tests ====================

#[actix_web::test]
async fn test_update_profile_and_change_password() {
    let app = app!();

    let req = test::TestRequest::post()
        .uri("/api/auth/register")
        .set_json(register_body("chefanna", "anna@example.com", "secret123"))
        .to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    let token = body["token"].as_str().unwrap().to_string();

    let req = test::TestRequest::put()
        .uri("/api/auth/profile")
        .insert_header(("Authorization", format!("Bearer {}", token)))
        .set_json(json!({ "name": "Anna B.", "bio": "Pastry first" }))
        .to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["name"], "Anna B.");
    assert_eq!(body["data"]["bio"], "Pastry first");

    let req = test::TestRequest::patch()
        .uri("/api/auth/password")
        .insert_header(("Authorization", format!("Bearer {}", token)))
        .set_json(json!({ "currentPassword": "wrongpass", "newPassword": "newsecret1" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 401);

    let req = test::TestRequest::patch()
        .uri("/api/auth/password")
        .insert_header(("Authorization", format!("Bearer {}", token)))
        .set_json(json!({ "currentPassword": "secret123", "newPassword": "newsecret1" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 200);

    let req = test::TestRequest::post()
        .uri("/api/auth/login")
        .set_json(json!({ "email": "anna@example.com", "password": "newsecret1" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 200);
}
