//! Account endpoint integration tests
//!
//! Tests for registration and login:
//! - Register then log in, token works on protected routes
//! - Duplicate phone conflicts
//! - Unknown phone and wrong password look the same

use axum::http::StatusCode;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

use crate::common::{client, constants, register_body, test_server};

#[tokio::test]
async fn test_register_and_login_flow() {
    let (server, state) = test_server();
    let (name, value) = client("192.0.2.30");

    let response = server
        .post("/api/v1/register")
        .add_header(name.clone(), value.clone())
        .json(&register_body(constants::TEST_PHONE))
        .await;
    response.assert_status(StatusCode::CREATED);

    let response = server
        .post("/api/v1/login")
        .add_header(name, value)
        .json(&json!({ "phone": constants::TEST_PHONE, "password": constants::TEST_PASSWORD }))
        .await;
    response.assert_status_ok();

    let json: Value = response.json();
    assert_eq!(json["tokenType"], "Bearer");
    assert_eq!(json["expiresIn"], 3600);

    let token = json["token"].as_str().unwrap();
    let user = state.users.get_by_phone(constants::TEST_PHONE).await.unwrap().unwrap();
    assert_eq!(state.tokens.verify(token).unwrap(), user.id);
}

#[tokio::test]
async fn test_duplicate_phone_conflicts() {
    let (server, _state) = test_server();
    let (name, value) = client("192.0.2.31");

    server
        .post("/api/v1/register")
        .add_header(name.clone(), value.clone())
        .json(&register_body(constants::TEST_PHONE))
        .await
        .assert_status(StatusCode::CREATED);

    let response = server
        .post("/api/v1/register")
        .add_header(name, value)
        .json(&register_body(constants::TEST_PHONE))
        .await;

    response.assert_status(StatusCode::CONFLICT);
    let json: Value = response.json();
    assert_eq!(json["error"]["code"], "CONFLICT");
}

#[tokio::test]
async fn test_bad_credentials_are_indistinguishable() {
    let (server, _state) = test_server();
    let (name, value) = client("192.0.2.32");

    server
        .post("/api/v1/register")
        .add_header(name.clone(), value.clone())
        .json(&register_body(constants::TEST_PHONE))
        .await
        .assert_status(StatusCode::CREATED);

    let wrong_password = server
        .post("/api/v1/login")
        .add_header(name.clone(), value.clone())
        .json(&json!({ "phone": constants::TEST_PHONE, "password": "not-my-password" }))
        .await;
    let unknown_phone = server
        .post("/api/v1/login")
        .add_header(name, value)
        .json(&json!({ "phone": "13999999999", "password": constants::TEST_PASSWORD }))
        .await;

    wrong_password.assert_status(StatusCode::BAD_REQUEST);
    unknown_phone.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(wrong_password.text(), unknown_phone.text());
}

#[tokio::test]
async fn test_register_validation() {
    let (server, _state) = test_server();
    let (name, value) = client("192.0.2.33");

    let response = server
        .post("/api/v1/register")
        .add_header(name.clone(), value.clone())
        .json(&register_body("12345"))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let response = server
        .post("/api/v1/register")
        .add_header(name, value)
        .json(&json!({ "phone": constants::TEST_PHONE }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let json: Value = response.json();
    assert_eq!(json["error"]["code"], "BAD_REQUEST");
}
