use actix_web::{test, web, App};
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;

use savory_bliss::api::{self, AppState};
use savory_bliss::auth::AuthService;
use savory_bliss::models::User;
use savory_bliss::store::Store;

/// Helper to create the shared store, auth service and AppState
fn create_app_state() -> (Arc<Store>, Arc<AuthService>, AppState) {
    let store = Arc::new(Store::new(":memory:").unwrap());
    let auth_service = Arc::new(AuthService::new(
        "test_secret".to_string(),
        "test_refresh_secret".to_string(),
    ));
    let state = AppState::new(store.clone(), auth_service.clone());
    (store, auth_service, state)
}

/// Helper to create a test user and return their id and access token
fn create_test_user(store: &Store, auth_service: &AuthService, username: &str) -> (String, String) {
    let mut user = User {
        id: String::new(),
        username: username.to_string(),
        email: format!("{}@test.com", username),
        password_hash: "not-used".to_string(),
        name: username.to_string(),
        avatar: String::new(),
        bio: String::new(),
        saved_recipes: Vec::new(),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    };
    store.create_user(&mut user).unwrap();
    let token = auth_service.generate_token(&user.id).unwrap();
    (user.id, token)
}

fn bearer(token: &str) -> (&'static str, String) {
    ("Authorization", format!("Bearer {}", token))
}

const BOUNDARY: &str = "----savorybliss";

enum Part<'a> {
    Text(&'a str, &'a str),
    File(&'a str, &'a str, &'a str, &'a [u8]),
}

fn multipart_body(parts: &[Part]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
            Part::File(name, filename, content_type, data) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                        name, filename, content_type
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(data);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

// ==================== Create Tests ====================

#[actix_web::test]
async fn test_create_recipe_json() {
    let (store, auth_service, state) = create_app_state();
    let (user_id, token) = create_test_user(&store, &auth_service, "chefanna");
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .configure(api::configure_routes),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/api/recipes")
        .insert_header(bearer(&token))
        .set_json(json!({
            "title": "  Pancakes ",
            "description": "Fluffy",
            "tags": "breakfast, Sweet, sweet",
            "ingredients": "flour\nmilk\n\neggs",
            "sections": [{ "id": "section-1", "title": "Batter", "content": "Whisk" }]
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 201);

    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], true);
    let recipe = &body["data"];
    assert_eq!(recipe["title"], "Pancakes");
    assert_eq!(recipe["tags"], json!(["breakfast", "Sweet"]));
    assert_eq!(recipe["ingredients"], json!(["flour", "milk", "eggs"]));
    assert_eq!(recipe["sections"][0]["title"], "Batter");
    assert_eq!(recipe["author"], user_id.as_str());
    assert_eq!(recipe["authorProfile"]["username"], "chefanna");
    assert_eq!(recipe["views"], 0);
    assert_eq!(recipe["likes"], json!([]));
}

#[actix_web::test]
async fn test_create_recipe_requires_title_and_auth() {
    let (store, auth_service, state) = create_app_state();
    let (_, token) = create_test_user(&store, &auth_service, "chefanna");
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .configure(api::configure_routes),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/api/recipes")
        .set_json(json!({ "title": "Soup" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 401);

    let req = test::TestRequest::post()
        .uri("/api/recipes")
        .insert_header(bearer(&token))
        .set_json(json!({ "title": "   " }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 400);
}

#[actix_web::test]
async fn test_create_recipe_multipart_with_images() {
    let (store, auth_service, state) = create_app_state();
    let (_, token) = create_test_user(&store, &auth_service, "chefanna");
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .configure(api::configure_routes),
    )
    .await;

    let sections = r#"[{"id":"section-1","title":"Dough","content":"Knead"},{"id":"section-2","title":"Bake","content":"Hot oven"}]"#;
    let png: &[u8] = &[0x89, 0x50, 0x4E, 0x47];
    let body = multipart_body(&[
        Part::Text("title", "Focaccia"),
        Part::Text("tags", "bread,italian"),
        Part::Text("ingredients", "flour\nwater"),
        Part::Text("sections", sections),
        Part::File("image", "cover.png", "image/png", png),
        Part::File("sectionImages", "section-2.png", "image/png", png),
    ]);

    let req = test::TestRequest::post()
        .uri("/api/recipes")
        .insert_header(bearer(&token))
        .insert_header((
            "Content-Type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        ))
        .set_payload(body)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 201);

    let body: serde_json::Value = test::read_body_json(resp).await;
    let recipe = &body["data"];
    assert_eq!(recipe["title"], "Focaccia");
    assert_eq!(recipe["tags"], json!(["bread", "italian"]));
    assert_eq!(recipe["imageUrl"], "data:image/png;base64,iVBORw==");
    assert!(recipe["sections"][0]["imageUrl"].is_null());
    assert_eq!(recipe["sections"][1]["imageUrl"], "data:image/png;base64,iVBORw==");
}

#[actix_web::test]
async fn test_create_recipe_skips_blank_file_inputs() {
    let (store, auth_service, state) = create_app_state();
    let (_, token) = create_test_user(&store, &auth_service, "chefanna");
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .configure(api::configure_routes),
    )
    .await;

    let body = multipart_body(&[
        Part::Text("title", "Pho"),
        Part::Text("sections", r#"[{"id":"section-1","title":"Broth","content":"Simmer"}]"#),
        Part::File("image", "", "application/octet-stream", b""),
        Part::File("sectionImages", "", "application/octet-stream", b""),
    ]);
    let req = test::TestRequest::post()
        .uri("/api/recipes")
        .insert_header(bearer(&token))
        .insert_header((
            "Content-Type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        ))
        .set_payload(body)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 201);

    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["title"], "Pho");
    assert!(body["data"]["imageUrl"].is_null());
    assert!(body["data"]["sections"][0]["imageUrl"].is_null());
}

#[actix_web::test]
async fn test_create_recipe_rejects_non_image_cover() {
    let (store, auth_service, state) = create_app_state();
    let (_, token) = create_test_user(&store, &auth_service, "chefanna");
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .configure(api::configure_routes),
    )
    .await;

    let body = multipart_body(&[
        Part::Text("title", "Focaccia"),
        Part::File("image", "notes.txt", "text/plain", b"hello"),
    ]);
    let req = test::TestRequest::post()
        .uri("/api/recipes")
        .insert_header(bearer(&token))
        .insert_header((
            "Content-Type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        ))
        .set_payload(body)
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 400);
}

// ==================== Read Tests ====================

#[actix_web::test]
async fn test_get_recipe_counts_views_and_reconciles_comments() {
    let (store, auth_service, state) = create_app_state();
    let (_, token) = create_test_user(&store, &auth_service, "chefanna");
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .configure(api::configure_routes),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/api/recipes")
        .insert_header(bearer(&token))
        .set_json(json!({ "title": "Tiramisu", "tags": "dessert" }))
        .to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    let id = body["data"]["id"].as_str().unwrap().to_string();

    for content in ["Lovely", "Too sweet"] {
        let req = test::TestRequest::post()
            .uri("/api/comments")
            .insert_header(bearer(&token))
            .set_json(json!({ "recipeId": id, "content": content }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 201);
    }

    let req = test::TestRequest::get()
        .uri(&format!("/api/recipes/{}", id))
        .to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["views"], 1);
    assert_eq!(body["data"]["commentsCount"], 2);
    assert_eq!(body["data"]["isLiked"], false);

    let req = test::TestRequest::get()
        .uri(&format!("/api/recipes/{}", id))
        .to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["views"], 2);
}

#[actix_web::test]
async fn test_get_missing_recipe() {
    let (_, _, state) = create_app_state();
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .configure(api::configure_routes),
    )
    .await;

    let req = test::TestRequest::get()
        .uri("/api/recipes/does-not-exist")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 404);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Recipe not found");
}

#[actix_web::test]
async fn test_list_by_user_and_tag() {
    let (store, auth_service, state) = create_app_state();
    let (anna_id, anna) = create_test_user(&store, &auth_service, "chefanna");
    let (_, bruno) = create_test_user(&store, &auth_service, "chefbruno");
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .configure(api::configure_routes),
    )
    .await;

    for (token, title, tags) in [
        (&anna, "Brownies", "dessert,chocolate"),
        (&bruno, "Ramen", "soup"),
        (&anna, "Lemon Tart", "dessert"),
    ] {
        let req = test::TestRequest::post()
            .uri("/api/recipes")
            .insert_header(bearer(token))
            .set_json(json!({ "title": title, "tags": tags }))
            .to_request();
        test::call_service(&app, req).await;
    }

    let req = test::TestRequest::get()
        .uri(&format!("/api/recipes/user/{}", anna_id))
        .to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    let titles: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["Lemon Tart", "Brownies"]);

    let req = test::TestRequest::get()
        .uri("/api/recipes/tag/soup")
        .to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"][0]["title"], "Ramen");

    let req = test::TestRequest::get().uri("/api/recipes").to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 3);
    assert_eq!(body["data"][0]["title"], "Lemon Tart");
}

// ==================== Update / Delete Tests ====================

#[actix_web::test]
async fn test_update_and_delete_enforce_ownership() {
    let (store, auth_service, state) = create_app_state();
    let (_, anna) = create_test_user(&store, &auth_service, "chefanna");
    let (_, bruno) = create_test_user(&store, &auth_service, "chefbruno");
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .configure(api::configure_routes),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/api/recipes")
        .insert_header(bearer(&anna))
        .set_json(json!({ "title": "Risotto", "tags": "rice" }))
        .to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    let id = body["data"]["id"].as_str().unwrap().to_string();

    let req = test::TestRequest::put()
        .uri(&format!("/api/recipes/{}", id))
        .insert_header(bearer(&bruno))
        .set_json(json!({ "title": "Stolen" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 403);

    let req = test::TestRequest::delete()
        .uri(&format!("/api/recipes/{}", id))
        .insert_header(bearer(&bruno))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 403);

    let req = test::TestRequest::delete()
        .uri(&format!("/api/recipes/{}", id))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 401);

    let req = test::TestRequest::put()
        .uri(&format!("/api/recipes/{}", id))
        .insert_header(bearer(&anna))
        .set_json(json!({ "title": "Mushroom Risotto", "tags": ["rice", "vegetarian"] }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["title"], "Mushroom Risotto");
    assert_eq!(body["data"]["tags"], json!(["rice", "vegetarian"]));

    let req = test::TestRequest::delete()
        .uri(&format!("/api/recipes/{}", id))
        .insert_header(bearer(&anna))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 200);

    let req = test::TestRequest::get()
        .uri(&format!("/api/recipes/{}", id))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 404);
}

#[actix_web::test]
async fn test_update_keeps_unsent_fields() {
    let (store, auth_service, state) = create_app_state();
    let (_, anna) = create_test_user(&store, &auth_service, "chefanna");
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .configure(api::configure_routes),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/api/recipes")
        .insert_header(bearer(&anna))
        .set_json(json!({
            "title": "Chili",
            "description": "Smoky",
            "ingredients": ["beans", "chipotle"]
        }))
        .to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    let id = body["data"]["id"].as_str().unwrap().to_string();

    let req = test::TestRequest::put()
        .uri(&format!("/api/recipes/{}", id))
        .insert_header(bearer(&anna))
        .set_json(json!({ "description": "Smoky and hot" }))
        .to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["title"], "Chili");
    assert_eq!(body["data"]["description"], "Smoky and hot");
    assert_eq!(body["data"]["ingredients"], json!(["beans", "chipotle"]));
}

#[actix_web::test]
async fn test_health() {
    let (_, _, state) = create_app_state();
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .configure(api::configure_routes),
    )
    .await;

    let req = test::TestRequest::get().uri("/health").to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["status"], "ok");
}
