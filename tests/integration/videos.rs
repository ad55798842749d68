//! Video endpoint integration tests
//!
//! Tests for upload, listing, lookup and deletion:
//! - Upload registers metadata and renames the file
//! - Videos are only visible to their owner
//! - The upload tier throttles independently of general traffic

use axum::http::StatusCode;
use axum_test::TestServer;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

use crate::common::{bearer, client, register_and_login, test_server};

fn upload_body(title: &str) -> Value {
    json!({
        "title": title,
        "description": "eight counts",
        "fileName": "routine.MOV",
        "contentType": "video/quicktime",
        "fileSize": 1_048_576,
    })
}

async fn upload(server: &TestServer, token: &str, ip: &str, title: &str) -> axum_test::TestResponse {
    let (name, value) = client(ip);
    let (auth_name, auth_value) = bearer(token);
    server
        .post("/api/v1/videos/upload")
        .add_header(name, value)
        .add_header(auth_name, auth_value)
        .json(&upload_body(title))
        .await
}

#[tokio::test]
async fn test_upload_and_list() {
    let (server, _state) = test_server();
    let ip = "203.0.113.50";
    let token = register_and_login(&server, "13800000001", ip).await;

    let response = upload(&server, &token, ip, "Warm-up").await;
    response.assert_status(StatusCode::CREATED);
    let video: Value = response.json();
    assert_eq!(video["title"], "Warm-up");
    assert_eq!(video["contentType"], "video/quicktime");
    let file_name = video["fileName"].as_str().unwrap();
    assert!(file_name.starts_with(&format!("{}_", video["userId"])));
    assert!(file_name.ends_with(".mov"));

    let (name, value) = client(ip);
    let (auth_name, auth_value) = bearer(&token);
    let response = server
        .get("/api/v1/videos")
        .add_header(name, value)
        .add_header(auth_name, auth_value)
        .await;
    response.assert_status_ok();
    let list: Value = response.json();
    assert_eq!(list["total"], 1);
    assert_eq!(list["videos"][0]["id"], video["id"]);
}

#[tokio::test]
async fn test_upload_rejects_unsupported_type() {
    let (server, _state) = test_server();
    let ip = "203.0.113.51";
    let token = register_and_login(&server, "13800000002", ip).await;
    let (name, value) = client(ip);
    let (auth_name, auth_value) = bearer(&token);

    let mut body = upload_body("Snapshot");
    body["contentType"] = json!("image/png");

    let response = server
        .post("/api/v1/videos/upload")
        .add_header(name, value)
        .add_header(auth_name, auth_value)
        .json(&body)
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_other_users_video_is_forbidden() {
    let (server, _state) = test_server();
    let owner = register_and_login(&server, "13800000003", "203.0.113.52").await;
    let intruder = register_and_login(&server, "13800000004", "203.0.113.53").await;

    let video: Value = upload(&server, &owner, "203.0.113.52", "Mine").await.json();
    let path = format!("/api/v1/videos/{}", video["id"]);

    let (name, value) = client("203.0.113.53");
    let (auth_name, auth_value) = bearer(&intruder);
    server
        .get(&path)
        .add_header(name.clone(), value.clone())
        .add_header(auth_name.clone(), auth_value.clone())
        .await
        .assert_status(StatusCode::FORBIDDEN);
    server
        .delete(&path)
        .add_header(name, value)
        .add_header(auth_name, auth_value)
        .await
        .assert_status(StatusCode::FORBIDDEN);

    let (name, value) = client("203.0.113.52");
    let (auth_name, auth_value) = bearer(&owner);
    server
        .get(&path)
        .add_header(name, value)
        .add_header(auth_name, auth_value)
        .await
        .assert_status_ok();
}

#[tokio::test]
async fn test_delete_then_not_found() {
    let (server, _state) = test_server();
    let ip = "203.0.113.54";
    let token = register_and_login(&server, "13800000005", ip).await;
    let video: Value = upload(&server, &token, ip, "Temp").await.json();
    let path = format!("/api/v1/videos/{}", video["id"]);
    let (name, value) = client(ip);
    let (auth_name, auth_value) = bearer(&token);

    server
        .delete(&path)
        .add_header(name.clone(), value.clone())
        .add_header(auth_name.clone(), auth_value.clone())
        .await
        .assert_status(StatusCode::NO_CONTENT);

    server
        .get(&path)
        .add_header(name.clone(), value.clone())
        .add_header(auth_name.clone(), auth_value.clone())
        .await
        .assert_status(StatusCode::NOT_FOUND);

    server
        .get("/api/v1/videos/not-a-number")
        .add_header(name, value)
        .add_header(auth_name, auth_value)
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_upload_tier_throttles_third_upload() {
    let (server, _state) = test_server();
    let ip = "203.0.113.55";
    let token = register_and_login(&server, "13800000006", ip).await;

    upload(&server, &token, ip, "one").await.assert_status(StatusCode::CREATED);
    upload(&server, &token, ip, "two").await.assert_status(StatusCode::CREATED);

    let response = upload(&server, &token, ip, "three").await;
    response.assert_status(StatusCode::TOO_MANY_REQUESTS);
    let json: Value = response.json();
    assert_eq!(json["error"]["details"]["limit"], 2);

    // General traffic from the same client is still admitted
    let (name, value) = client(ip);
    let (auth_name, auth_value) = bearer(&token);
    server
        .get("/api/v1/videos")
        .add_header(name, value)
        .add_header(auth_name, auth_value)
        .await
        .assert_status_ok();
}

#[tokio::test]
async fn test_upload_without_token_still_spends_upload_permit() {
    let (server, _state) = test_server();
    let (name, value) = client("203.0.113.56");

    for _ in 0..2 {
        server
            .post("/api/v1/videos/upload")
            .add_header(name.clone(), value.clone())
            .json(&upload_body("anon"))
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
    }

    server
        .post("/api/v1/videos/upload")
        .add_header(name, value)
        .json(&upload_body("anon"))
        .await
        .assert_status(StatusCode::TOO_MANY_REQUESTS);
}
