mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::json;

#[tokio::test]
async fn login_requires_password_and_identifier() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/api/auth/login", server.base_url))
        .json(&json!({}))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["error"], true);
    assert_eq!(
        body["message"],
        "Password and either username or email are required"
    );

    let res = client
        .post(format!("{}/api/auth/login", server.base_url))
        .json(&json!({"email": "user@example.com"}))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn login_rejects_malformed_email() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/api/auth/login", server.base_url))
        .json(&json!({"email": "not-an-email", "password": "secret123"}))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["message"], "Invalid email format");
    Ok(())
}

#[tokio::test]
async fn login_with_unknown_user_does_not_reveal_accounts() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/api/auth/login", server.base_url))
        .json(&json!({"username": "no-such-user", "password": "secret123"}))
        .send()
        .await?;

    // 401 with a database; 500/503 when no database is reachable. Either
    // way the endpoint must not return 404 for an unknown identifier.
    assert!(
        res.status() == StatusCode::UNAUTHORIZED
            || res.status() == StatusCode::INTERNAL_SERVER_ERROR
            || res.status() == StatusCode::SERVICE_UNAVAILABLE,
        "unexpected status: {}",
        res.status()
    );

    let status = res.status();
    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["error"], true);
    if status == StatusCode::UNAUTHORIZED {
        assert_eq!(body["message"], "Invalid username/email or password");
    }
    Ok(())
}
