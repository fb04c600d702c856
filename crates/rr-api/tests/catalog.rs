mod common;

use axum::http::StatusCode;
use common::TestApp;
use rr_core::models::Role;
use serde_json::json;

#[tokio::test]
async fn test_taxonomy_is_admin_write_public_read() {
    let app = TestApp::new().await;
    let (_, user) = app.user("reader", Role::User).await;
    let (_, admin) = app.user("boss", Role::Admin).await;
    let body = json!({ "name": "Films", "slug": "films" });

    let (status, _) = app.post("/api/v1/categories/", None, body.clone()).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = app.post("/api/v1/categories/", Some(&user), body.clone()).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, created) = app.post("/api/v1/categories/", Some(&admin), body).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created, json!({ "name": "Films", "slug": "films" }));

    let (status, list) = app.get("/api/v1/categories/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list["count"], 1);
    assert_eq!(list["results"][0]["slug"], "films");
    assert!(list["next"].is_null());
}

#[tokio::test]
async fn test_superuser_flag_grants_admin() {
    let app = TestApp::new().await;
    let (mut owner, _) = app.user("root", Role::User).await;
    owner.is_superuser = true;
    rr_core::traits::UserRepo::update_user(app.repo.as_ref(), &owner).await.unwrap();
    let token = rr_core::traits::AuthProvider::issue_access_token(app.auth.as_ref(), &owner).unwrap();

    let (status, _) = app
        .post("/api/v1/genres/", Some(&token), json!({ "name": "Drama", "slug": "drama" }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_slug_keyed_delete() {
    let app = TestApp::new().await;
    let (_, admin) = app.user("boss", Role::Admin).await;
    app.post("/api/v1/genres/", Some(&admin), json!({ "name": "Drama", "slug": "drama" }))
        .await;

    let (status, _) = app.get("/api/v1/genres/drama/", None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.delete("/api/v1/genres/drama/", Some(&admin)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, body) = app.get("/api/v1/genres/drama/", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["detail"].is_string());
}

#[tokio::test]
async fn test_taxon_patch_and_invalid_slug() {
    let app = TestApp::new().await;
    let (_, admin) = app.user("boss", Role::Admin).await;
    app.post("/api/v1/genres/", Some(&admin), json!({ "name": "Drama", "slug": "drama" }))
        .await;

    let (status, body) = app
        .patch("/api/v1/genres/drama/", Some(&admin), json!({ "name": "Melodrama" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "name": "Melodrama", "slug": "drama" }));

    let (status, body) = app
        .post("/api/v1/genres/", Some(&admin), json!({ "name": "Bad", "slug": "not a slug" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["slug"].is_array());
}

#[tokio::test]
async fn test_title_write_echoes_slugs_and_read_nests() {
    let app = TestApp::new().await;
    let (_, admin) = app.user("boss", Role::Admin).await;
    app.post("/api/v1/categories/", Some(&admin), json!({ "name": "Films", "slug": "films" }))
        .await;
    app.post("/api/v1/genres/", Some(&admin), json!({ "name": "Sci-Fi", "slug": "sci-fi" }))
        .await;

    let (status, written) = app
        .post(
            "/api/v1/titles/",
            Some(&admin),
            json!({ "name": "Stalker", "year": 1979, "category": "films", "genre": ["sci-fi"] }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", written);
    assert_eq!(written["category"], "films");
    assert_eq!(written["genre"], json!(["sci-fi"]));

    let id = written["id"].as_i64().unwrap();
    let (status, read) = app.get(&format!("/api/v1/titles/{}/", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(read["category"], json!({ "name": "Films", "slug": "films" }));
    assert_eq!(read["genre"], json!([{ "name": "Sci-Fi", "slug": "sci-fi" }]));
    assert!(read["rating"].is_null());
}

#[tokio::test]
async fn test_title_with_unknown_genre_is_a_field_error() {
    let app = TestApp::new().await;
    let (_, admin) = app.user("boss", Role::Admin).await;
    let (status, body) = app
        .post("/api/v1/titles/", Some(&admin), json!({ "name": "Stalker", "year": 1979, "genre": ["nope"] }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["genre"][0], "Object with slug=nope does not exist.");
}

#[tokio::test]
async fn test_category_delete_leaves_title_uncategorized() {
    let app = TestApp::new().await;
    let (_, admin) = app.user("boss", Role::Admin).await;
    app.post("/api/v1/categories/", Some(&admin), json!({ "name": "Films", "slug": "films" }))
        .await;
    let (_, written) = app
        .post("/api/v1/titles/", Some(&admin), json!({ "name": "Stalker", "year": 1979, "category": "films" }))
        .await;
    let id = written["id"].as_i64().unwrap();

    app.delete("/api/v1/categories/films/", Some(&admin)).await;
    let (status, read) = app.get(&format!("/api/v1/titles/{}/", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(read["category"].is_null());
    assert_eq!(read["name"], "Stalker");
}

#[tokio::test]
async fn test_title_filters_and_pagination_links() {
    let app = TestApp::new().await;
    let (_, admin) = app.user("boss", Role::Admin).await;
    for n in 0..3 {
        app.title(&admin, &format!("Part {}", n)).await;
    }
    app.post("/api/v1/titles/", Some(&admin), json!({ "name": "Other", "year": 2001 }))
        .await;

    let (_, body) = app.get("/api/v1/titles/?year=1979&limit=2", None).await;
    assert_eq!(body["count"], 3);
    assert_eq!(body["results"].as_array().unwrap().len(), 2);
    assert_eq!(body["next"], "/api/v1/titles/?year=1979&limit=2&offset=2");
    assert!(body["previous"].is_null());

    let (_, body) = app.get("/api/v1/titles/?name=part%201", None).await;
    assert_eq!(body["count"], 1);

    let (status, body) = app.get("/api/v1/titles/?year=abc", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["non_field_errors"].is_array());
}

#[tokio::test]
async fn test_malformed_json_is_a_validation_error() {
    let app = TestApp::new().await;
    let (_, admin) = app.user("boss", Role::Admin).await;
    let request = axum::http::Request::builder()
        .method("POST")
        .uri("/api/v1/titles/")
        .header("authorization", format!("Bearer {}", admin))
        .header("content-type", "application/json")
        .body(axum::body::Body::from("{not json"))
        .unwrap();
    let response = tower::ServiceExt::oneshot(app.router.clone(), request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_missing_title_is_not_found() {
    let app = TestApp::new().await;
    let (status, _) = app.get("/api/v1/titles/404/", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app.get("/api/v1/titles/abc/", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_out_of_range_offset_is_an_empty_page() {
    let app = TestApp::new().await;
    let (status, body) = app.get("/api/v1/genres/?offset=9223372036854775807", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 0);
    assert!(body["results"].as_array().unwrap().is_empty());
    assert!(body["next"].is_null());
    assert!(body["previous"].as_str().unwrap().starts_with("/api/v1/genres/?limit=10&offset="));
}

#[tokio::test]
async fn test_non_admin_write_is_forbidden_before_body_is_read() {
    let app = TestApp::new().await;
    let (_, user) = app.user("reader", Role::User).await;
    let request = axum::http::Request::builder()
        .method("POST")
        .uri("/api/v1/genres/")
        .header("authorization", format!("Bearer {}", user))
        .header("content-type", "application/json")
        .body(axum::body::Body::from("[1, 2"))
        .unwrap();
    let response = tower::ServiceExt::oneshot(app.router.clone(), request).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
