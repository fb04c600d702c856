mod common;

use axum::http::StatusCode;
use common::TestApp;
use rr_core::models::Role;
use serde_json::json;

#[tokio::test]
async fn test_anonymous_review_is_unauthorized() {
    let app = TestApp::new().await;
    let (_, admin) = app.user("boss", Role::Admin).await;
    let title = app.title(&admin, "Stalker").await;

    let (status, body) = app
        .post(&format!("/api/v1/titles/{}/reviews/", title), None, json!({ "text": "ok", "score": 9 }))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["detail"].is_string());

    let (status, _) = app.get(&format!("/api/v1/titles/{}/reviews/", title), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_author_and_title_come_from_context() {
    let app = TestApp::new().await;
    let (_, admin) = app.user("boss", Role::Admin).await;
    let (_, first) = app.user("first", Role::User).await;
    let (_, second) = app.user("second", Role::User).await;
    let title = app.title(&admin, "Stalker").await;
    let other = app.title(&admin, "Mirror").await;
    let uri = format!("/api/v1/titles/{}/reviews/", title);

    let (status, _) = app.post(&uri, Some(&first), json!({ "text": "ok", "score": 9 })).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app
        .post(&uri, Some(&second), json!({ "text": "ok", "score": 9, "author": "first", "title": other }))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["author"], "second");
    assert!(body.get("title").is_none());

    let (_, list) = app.get(&uri, None).await;
    assert_eq!(list["count"], 2);
    let (_, other_list) = app.get(&format!("/api/v1/titles/{}/reviews/", other), None).await;
    assert_eq!(other_list["count"], 0);
}

#[tokio::test]
async fn test_second_review_on_same_title_is_rejected() {
    let app = TestApp::new().await;
    let (_, admin) = app.user("boss", Role::Admin).await;
    let (_, user) = app.user("critic", Role::User).await;
    let title = app.title(&admin, "Stalker").await;
    let other = app.title(&admin, "Mirror").await;
    let uri = format!("/api/v1/titles/{}/reviews/", title);

    app.post(&uri, Some(&user), json!({ "text": "great", "score": 10 })).await;
    let (status, body) = app.post(&uri, Some(&user), json!({ "text": "again", "score": 2 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["non_field_errors"].is_array());

    let (status, _) = app
        .post(&format!("/api/v1/titles/{}/reviews/", other), Some(&user), json!({ "text": "fine", "score": 6 }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_review_score_bounds() {
    let app = TestApp::new().await;
    let (_, admin) = app.user("boss", Role::Admin).await;
    let (_, user) = app.user("critic", Role::User).await;
    let title = app.title(&admin, "Stalker").await;
    let uri = format!("/api/v1/titles/{}/reviews/", title);

    let (status, body) = app.post(&uri, Some(&user), json!({ "text": "x", "score": 11 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["score"].is_array());
    let (status, body) = app.post(&uri, Some(&user), json!({ "score": 5 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["text"].is_array());
}

#[tokio::test]
async fn test_review_on_missing_title_is_not_found() {
    let app = TestApp::new().await;
    let (_, user) = app.user("critic", Role::User).await;
    let (status, _) = app
        .post("/api/v1/titles/999/reviews/", Some(&user), json!({ "text": "ok", "score": 5 }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_foreign_review_mutation_by_role() {
    let app = TestApp::new().await;
    let (_, admin) = app.user("boss", Role::Admin).await;
    let (_, author) = app.user("author", Role::User).await;
    let (_, plain) = app.user("plain", Role::User).await;
    let (_, moderator) = app.user("mod", Role::Moderator).await;
    let title = app.title(&admin, "Stalker").await;

    let (_, review) = app
        .post(&format!("/api/v1/titles/{}/reviews/", title), Some(&author), json!({ "text": "ok", "score": 5 }))
        .await;
    let uri = format!("/api/v1/titles/{}/reviews/{}/", title, review["id"]);

    let (status, _) = app.patch(&uri, Some(&plain), json!({ "score": 1 })).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app.patch(&uri, None, json!({ "score": 1 })).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    for (token, score) in [(&author, 6), (&moderator, 7), (&admin, 8)] {
        let (status, body) = app.patch(&uri, Some(token), json!({ "score": score })).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["score"], score);
        assert_eq!(body["text"], "ok");
        assert_eq!(body["author"], "author");
    }

    for token in [&plain, &author, &moderator, &admin] {
        let (status, _) = app.get(&uri, Some(token)).await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, _) = app.delete(&uri, Some(&plain)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app.delete(&uri, Some(&moderator)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = app.get(&uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_rating_is_the_rounded_mean() {
    let app = TestApp::new().await;
    let (_, admin) = app.user("boss", Role::Admin).await;
    let title = app.title(&admin, "Stalker").await;
    let uri = format!("/api/v1/titles/{}/reviews/", title);

    for (name, score) in [("a", 8), ("b", 6), ("c", 10)] {
        let (_, token) = app.user(name, Role::User).await;
        app.post(&uri, Some(&token), json!({ "text": "t", "score": score })).await;
    }
    let (_, body) = app.get(&format!("/api/v1/titles/{}/", title), None).await;
    assert_eq!(body["rating"], 8);

    let (_, token) = app.user("d", Role::User).await;
    app.post(&uri, Some(&token), json!({ "text": "t", "score": 4 })).await;
    let (_, body) = app.get(&format!("/api/v1/titles/{}/", title), None).await;
    assert_eq!(body["rating"], 7);
}

#[tokio::test]
async fn test_comments_are_scoped_to_their_review() {
    let app = TestApp::new().await;
    let (_, admin) = app.user("boss", Role::Admin).await;
    let (_, author) = app.user("author", Role::User).await;
    let (_, replier) = app.user("replier", Role::User).await;
    let title = app.title(&admin, "Stalker").await;
    let other = app.title(&admin, "Mirror").await;

    let (_, review) = app
        .post(&format!("/api/v1/titles/{}/reviews/", title), Some(&author), json!({ "text": "ok", "score": 5 }))
        .await;
    let comments = format!("/api/v1/titles/{}/reviews/{}/comments/", title, review["id"]);

    let (status, comment) = app.post(&comments, Some(&replier), json!({ "text": "agreed" })).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(comment["author"], "replier");

    let wrong_parent = format!("/api/v1/titles/{}/reviews/{}/comments/", other, review["id"]);
    let (status, _) = app.get(&wrong_parent, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let detail = format!("{}{}/", comments, comment["id"]);
    let (status, _) = app.patch(&detail, Some(&author), json!({ "text": "hijack" })).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, body) = app.patch(&detail, Some(&replier), json!({ "text": "edited" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["text"], "edited");
}

#[tokio::test]
async fn test_review_delete_removes_its_comments() {
    let app = TestApp::new().await;
    let (_, admin) = app.user("boss", Role::Admin).await;
    let (_, author) = app.user("author", Role::User).await;
    let title = app.title(&admin, "Stalker").await;
    let (_, review) = app
        .post(&format!("/api/v1/titles/{}/reviews/", title), Some(&author), json!({ "text": "ok", "score": 5 }))
        .await;
    let review_uri = format!("/api/v1/titles/{}/reviews/{}/", title, review["id"]);
    let (_, comment) = app
        .post(&format!("{}comments/", review_uri), Some(&author), json!({ "text": "self reply" }))
        .await;

    let (status, _) = app.delete(&review_uri, Some(&author)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = app.get(&format!("{}comments/{}/", review_uri, comment["id"]), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

async fn send_raw(app: &TestApp, uri: &str, token: Option<&str>, body: &'static str) -> StatusCode {
    let mut request = axum::http::Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = token {
        request = request.header("authorization", format!("Bearer {}", token));
    }
    let request = request.body(axum::body::Body::from(body)).unwrap();
    tower::ServiceExt::oneshot(app.router.clone(), request).await.unwrap().status()
}

#[tokio::test]
async fn test_permission_and_lookup_come_before_body_parsing() {
    let app = TestApp::new().await;
    let (_, admin) = app.user("boss", Role::Admin).await;
    let (_, user) = app.user("critic", Role::User).await;
    let title = app.title(&admin, "Stalker").await;
    let uri = format!("/api/v1/titles/{}/reviews/", title);

    assert_eq!(send_raw(&app, &uri, None, "{not json").await, StatusCode::UNAUTHORIZED);
    assert_eq!(
        send_raw(&app, "/api/v1/titles/999/reviews/", Some(&user), r#"{"text": 5, "score": "high"}"#).await,
        StatusCode::NOT_FOUND
    );
    assert_eq!(send_raw(&app, &uri, Some(&user), "{not json").await, StatusCode::BAD_REQUEST);
}
