//! E2E tests for health check and basic server functionality

mod common;

use common::TestServer;

#[tokio::test]
async fn test_health_check() {
    let server = TestServer::new().await;

    let response = server
        .client
        .get(&server.url("/health"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let body = response.text().await.unwrap();
    assert_eq!(body, "OK");
}

#[tokio::test]
async fn test_server_starts_successfully() {
    let server = TestServer::new().await;

    // Verify server is accessible
    let response = server.client.get(&server.url("/health")).send().await;

    assert!(response.is_ok());
}

#[tokio::test]
async fn test_cors_headers() {
    let server = TestServer::new().await;

    let response = server
        .client
        .get(&server.url("/health"))
        .header("Origin", "https://auth.test.example.com")
        .send()
        .await
        .unwrap();

    // CORS should allow the configured public origin.
    assert!(
        response
            .headers()
            .contains_key("access-control-allow-origin")
    );
}

#[tokio::test]
async fn test_404_for_unknown_routes() {
    let server = TestServer::new().await;

    let response = server
        .client
        .get(&server.url("/unknown/route"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn test_metrics_exposes_auth_counters() {
    let server = TestServer::new().await;

    // A labeled counter only shows up once a label set has fired.
    let login = server
        .client
        .post(server.url("/login"))
        .json(&serde_json::json!({
            "email": "nobody@example.com",
            "password": "wrong",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(login.status(), 401);

    let response = server
        .client
        .get(&server.url("/metrics"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let body = response.text().await.unwrap();
    assert!(body.contains("gatehouse_db_connections_active"));
    assert!(body.contains("gatehouse_login_attempts_total"));
}
