//! E2E tests for session introspection and protected routes

mod common;

use common::TestServer;

#[tokio::test]
async fn test_session_without_cookie_reports_null_user() {
    let server = TestServer::new().await;

    let response = server
        .client
        .get(server.url("/session"))
        .send()
        .await
        .expect("request succeeds");

    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.expect("json body");
    assert!(body["user"].is_null());
}

#[tokio::test]
async fn test_session_cookie_restores_user() {
    let server = TestServer::new().await;
    let user = server.create_local_user("ada@example.com", "correct horse").await;
    let token = server.session_token_for(&user.id);

    let response = server
        .client
        .get(server.url("/session"))
        .header("Cookie", format!("session={token}"))
        .send()
        .await
        .expect("request succeeds");

    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.expect("json body");
    assert_eq!(body["user"]["id"], user.id.as_str());
    assert_eq!(body["user"]["email"], "ada@example.com");
}

#[tokio::test]
async fn test_session_accepts_bearer_token() {
    let server = TestServer::new().await;
    let user = server.create_local_user("ada@example.com", "correct horse").await;
    let token = server.session_token_for(&user.id);

    let response = server
        .client
        .get(server.url("/session"))
        .header("Authorization", format!("Bearer {token}"))
        .send()
        .await
        .expect("request succeeds");

    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.expect("json body");
    assert_eq!(body["user"]["id"], user.id.as_str());
}

#[tokio::test]
async fn test_session_for_vanished_user_reports_null() {
    let server = TestServer::new().await;
    let token = server.session_token_for("no-such-user-id");

    // The token is honest about who it was minted for; the row is gone.
    let response = server
        .client
        .get(server.url("/session"))
        .header("Cookie", format!("session={token}"))
        .send()
        .await
        .expect("request succeeds");

    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.expect("json body");
    assert!(body["user"].is_null());
}

#[tokio::test]
async fn test_session_rejects_tampered_token() {
    let server = TestServer::new().await;
    let user = server.create_local_user("ada@example.com", "correct horse").await;
    let mut token = server.session_token_for(&user.id);
    token.push('A');

    let response = server
        .client
        .get(server.url("/session"))
        .header("Cookie", format!("session={token}"))
        .send()
        .await
        .expect("request succeeds");

    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn test_users_me_requires_authentication() {
    let server = TestServer::new().await;

    let response = server
        .client
        .get(server.url("/users/me"))
        .send()
        .await
        .expect("request succeeds");

    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn test_users_me_returns_current_user() {
    let server = TestServer::new().await;
    let user = server.create_local_user("ada@example.com", "correct horse").await;
    let token = server.session_token_for(&user.id);

    let response = server
        .client
        .get(server.url("/users/me"))
        .header("Authorization", format!("Bearer {token}"))
        .send()
        .await
        .expect("request succeeds");

    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.expect("json body");
    assert_eq!(body["id"], user.id.as_str());
    assert_eq!(body["email"], "ada@example.com");
    assert!(body.get("password_hash").is_none());
}

#[tokio::test]
async fn test_users_me_rejects_token_for_vanished_user() {
    let server = TestServer::new().await;
    let token = server.session_token_for("no-such-user-id");

    let response = server
        .client
        .get(server.url("/users/me"))
        .header("Authorization", format!("Bearer {token}"))
        .send()
        .await
        .expect("request succeeds");

    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn test_logout_clears_session_cookies() {
    let server = TestServer::new().await;
    let client = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .timeout(std::time::Duration::from_secs(10))
        .build()
        .expect("failed to build no-redirect client");

    let response = client
        .post(server.url("/logout"))
        .header("Cookie", "session=dummy-session; oauth_state=dummy-state")
        .send()
        .await
        .expect("request succeeds");

    assert!(response.status().is_redirection());
    let set_cookie_values: Vec<String> = response
        .headers()
        .get_all("set-cookie")
        .iter()
        .filter_map(|v| v.to_str().ok().map(ToString::to_string))
        .collect();
    assert!(
        set_cookie_values
            .iter()
            .any(|v| v.contains("session=") || v.contains("oauth_state=")),
        "expected cookie removal headers, got: {set_cookie_values:?}"
    );
}
