pub mod common;

use helpdesk::api;
use reqwest::{Method, StatusCode};
use serde_json::json;

#[tokio::test]
async fn registers_and_logs_in_with_role() {
    let base_url = common::spawn_app().await;
    let (tech, me) =
        common::Client::signed_up(&base_url, "Tina", api::user::Role::Tech)
            .await;

    assert!(tech.auth_token.is_some());
    assert_eq!(me.first_name, "Tina");
    assert_eq!(me.role, api::user::Role::Tech);
    assert_eq!(me.department.as_deref(), Some("IT"));
}

#[tokio::test]
async fn registration_defaults_to_user_role() {
    let base_url = common::spawn_app().await;
    let mut client = common::Client::new(&base_url);
    client
        .register(&json!({
            "firstName": "Uma",
            "lastName": "User",
            "email": "uma@example.com",
            "password": common::PASSWORD,
        }))
        .await
        .unwrap();
    client.auth_token = Some(
        client
            .login("uma@example.com", common::PASSWORD)
            .await
            .unwrap()
            .token,
    );

    assert_eq!(client.me().await.unwrap().role, api::user::Role::User);
}

#[tokio::test]
async fn rejects_duplicate_email() {
    let base_url = common::spawn_app().await;
    let client = common::Client::new(&base_url);
    let body = json!({
        "firstName": "Dora",
        "lastName": "Dup",
        "email": "dora@example.com",
        "password": common::PASSWORD,
    });
    client.register(&body).await.unwrap();

    assert_eq!(
        client.register(&body).await.unwrap_err(),
        StatusCode::BAD_REQUEST
    );
}

#[tokio::test]
async fn rejects_malformed_body() {
    let base_url = common::spawn_app().await;
    let client = common::Client::new(&base_url);

    let (status, body) = client
        .raw(Method::POST, "/auth/register", &json!({ "email": 42 }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn wrong_password_and_unknown_email_look_alike() {
    let base_url = common::spawn_app().await;
    let (_, me) =
        common::Client::signed_up(&base_url, "Lena", api::user::Role::User)
            .await;
    let client = common::Client::new(&base_url);

    let wrong_password = client
        .raw(
            Method::POST,
            "/auth/login",
            &json!({ "email": me.email, "password": "nope" }),
        )
        .await;
    let unknown_email = client
        .raw(
            Method::POST,
            "/auth/login",
            &json!({ "email": "ghost@example.com", "password": "nope" }),
        )
        .await;

    assert_eq!(wrong_password.0, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_password, unknown_email);
}

#[tokio::test]
async fn me_requires_valid_token() {
    let base_url = common::spawn_app().await;
    let mut client = common::Client::new(&base_url);
    assert_eq!(client.me().await.unwrap_err(), StatusCode::UNAUTHORIZED);

    client.auth_token = Some("not-a-jwt".to_owned());
    assert_eq!(client.me().await.unwrap_err(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn forgot_password_does_not_reveal_accounts() {
    let base_url = common::spawn_app().await;
    let (_, me) =
        common::Client::signed_up(&base_url, "Fay", api::user::Role::User)
            .await;
    let client = common::Client::new(&base_url);

    let known = client.forgot_password(&me.email).await.unwrap();
    let unknown = client.forgot_password("ghost@example.com").await.unwrap();

    assert_eq!(known.message, unknown.message);
    assert_eq!(known.simulation_token.len(), 26);
    assert_eq!(unknown.simulation_token.len(), 26);
}

#[tokio::test]
async fn reset_token_works_once() {
    let base_url = common::spawn_app().await;
    let (_, me) =
        common::Client::signed_up(&base_url, "Rita", api::user::Role::User)
            .await;
    let client = common::Client::new(&base_url);

    let token = client
        .forgot_password(&me.email)
        .await
        .unwrap()
        .simulation_token;
    client.reset_password(&token, "new password").await.unwrap();

    client.login(&me.email, "new password").await.unwrap();
    assert_eq!(
        client.login(&me.email, common::PASSWORD).await.unwrap_err(),
        StatusCode::UNAUTHORIZED
    );
    assert_eq!(
        client.reset_password(&token, "again").await.unwrap_err(),
        StatusCode::BAD_REQUEST
    );
}

#[tokio::test]
async fn decoy_reset_token_is_useless() {
    let base_url = common::spawn_app().await;
    let client = common::Client::new(&base_url);

    let token = client
        .forgot_password("ghost@example.com")
        .await
        .unwrap()
        .simulation_token;
    assert_eq!(
        client.reset_password(&token, "whatever").await.unwrap_err(),
        StatusCode::BAD_REQUEST
    );
}
