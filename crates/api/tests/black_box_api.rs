use std::sync::Arc;

use chrono::Duration as ChronoDuration;
use reqwest::StatusCode;
use serde_json::json;

use capstone_api::app::{build_app, services::{build_services, AppServices}};
use capstone_api::config::ServerConfig;
use capstone_auth::Role;

const SECRET: &str = "correct horse battery staple";

struct TestServer {
    base_url: String,
    services: Arc<AppServices>,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        Self::spawn_with(test_config()).await
    }

    async fn spawn_with(config: ServerConfig) -> Self {
        // Same router as prod, bound to an ephemeral port.
        let services = Arc::new(build_services(config).expect("failed to build services"));
        services
            .accounts
            .register("s1234", SECRET, Role::STUDENT, "Ada Lovelace")
            .unwrap();
        services
            .accounts
            .register("grace@example.edu", SECRET, Role::TEACHER, "Grace Hopper")
            .unwrap();

        let app = build_app(services.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            services,
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn test_config() -> ServerConfig {
    ServerConfig {
        jwt_secret: "test-secret".to_string(),
        // Plain HTTP in tests; a Secure cookie would never be sent back.
        cookie_secure: false,
        ..ServerConfig::default()
    }
}

fn refresh_cookie(res: &reqwest::Response) -> Option<String> {
    res.headers()
        .get_all(reqwest::header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with("refresh_token="))
        .map(str::to_string)
}

fn cookie_value(set_cookie: &str) -> String {
    set_cookie
        .split(';')
        .next()
        .and_then(|pair| pair.split_once('='))
        .map(|(_, v)| v.to_string())
        .unwrap_or_default()
}

async fn login(client: &reqwest::Client, srv: &TestServer, identifier: &str, secret: &str) -> reqwest::Response {
    client
        .post(srv.url("/auth/login"))
        .json(&json!({ "identifier": identifier, "secret": secret }))
        .send()
        .await
        .unwrap()
}

async fn refresh_with(client: &reqwest::Client, srv: &TestServer, token: &str) -> reqwest::Response {
    client
        .post(srv.url("/auth/refresh"))
        .header(reqwest::header::COOKIE, format!("refresh_token={token}"))
        .send()
        .await
        .unwrap()
}

#[tokio::test]
async fn health_is_public() {
    let srv = TestServer::spawn().await;
    let res = reqwest::get(srv.url("/health")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn auth_required_for_protected_endpoints() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client.get(srv.url("/whoami")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = client
        .get(srv.url("/whoami"))
        .bearer_auth("not-a-jwt")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "unauthorized");
}

#[tokio::test]
async fn login_returns_token_user_and_http_only_cookie() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = login(&client, &srv, "S1234", SECRET).await;
    assert_eq!(res.status(), StatusCode::OK);

    let cookie = refresh_cookie(&res).expect("refresh cookie");
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("SameSite=Strict"));
    assert!(cookie.contains("Path=/auth"));
    assert!(!cookie.contains("Secure"));

    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["user"]["role"], "Student");
    assert_eq!(body["user"]["displayName"], "Ada Lovelace");
    let token = body["accessToken"].as_str().unwrap();
    assert!(!cookie.contains(token));

    let res = client.get(srv.url("/whoami")).bearer_auth(token).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let who: serde_json::Value = res.json().await.unwrap();
    assert_eq!(who["role"], "Student");
    assert_eq!(who["userId"], body["user"]["id"]);
}

#[tokio::test]
async fn secure_cookie_flag_follows_config() {
    let srv = TestServer::spawn_with(ServerConfig {
        cookie_secure: true,
        ..test_config()
    })
    .await;
    let res = login(&reqwest::Client::new(), &srv, "s1234", SECRET).await;
    assert!(refresh_cookie(&res).unwrap().contains("Secure"));
}

#[tokio::test]
async fn bad_credentials_and_disabled_accounts_are_distinguished() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = login(&client, &srv, "s1234", "wrong").await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert!(refresh_cookie(&res).is_none());
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "invalid_credentials");

    let res = login(&client, &srv, "nobody", SECRET).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    srv.services.accounts.set_disabled("s1234", true);
    let res = login(&client, &srv, "s1234", SECRET).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "account_disabled");
}

#[tokio::test]
async fn refresh_rotates_cookie_and_rejects_reuse() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = login(&client, &srv, "s1234", SECRET).await;
    let first = cookie_value(&refresh_cookie(&res).unwrap());

    let res = refresh_with(&client, &srv, &first).await;
    assert_eq!(res.status(), StatusCode::OK);
    let second = cookie_value(&refresh_cookie(&res).unwrap());
    assert_ne!(first, second);
    let body: serde_json::Value = res.json().await.unwrap();
    assert!(body["accessToken"].as_str().is_some());
    assert_eq!(body["user"]["role"], "Student");

    // Replaying the retired value revokes the whole family.
    let res = refresh_with(&client, &srv, &first).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert!(refresh_cookie(&res).unwrap().contains("Max-Age=0"));
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "refresh_failed");

    let res = refresh_with(&client, &srv, &second).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn refresh_without_cookie_fails() {
    let srv = TestServer::spawn().await;
    let res = reqwest::Client::new()
        .post(srv.url("/auth/refresh"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "refresh_failed");
}

#[tokio::test]
async fn refresh_fails_once_account_is_disabled() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let res = login(&client, &srv, "s1234", SECRET).await;
    let token = cookie_value(&refresh_cookie(&res).unwrap());

    srv.services.accounts.set_disabled("s1234", true);
    let res = refresh_with(&client, &srv, &token).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn logout_revokes_and_is_idempotent() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let res = login(&client, &srv, "s1234", SECRET).await;
    let token = cookie_value(&refresh_cookie(&res).unwrap());

    for _ in 0..2 {
        let res = client
            .post(srv.url("/auth/logout"))
            .header(reqwest::header::COOKIE, format!("refresh_token={token}"))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NO_CONTENT);
        assert!(refresh_cookie(&res).unwrap().contains("Max-Age=0"));
    }

    let res = client.post(srv.url("/auth/logout")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let res = refresh_with(&client, &srv, &token).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn access_endpoints_explain_gate_decisions() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let body: serde_json::Value = login(&client, &srv, "s1234", SECRET).await.json().await.unwrap();
    let token = body["accessToken"].as_str().unwrap().to_string();

    let pages: serde_json::Value = client
        .get(srv.url("/access/pages"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(pages["landingPage"], "dashboard");
    assert!(pages["pages"].as_array().unwrap().iter().any(|p| p == "phases"));
    assert!(!pages["pages"].as_array().unwrap().iter().any(|p| p == "admin-tasks"));
    let menu = pages["menu"].as_array().unwrap();
    assert_eq!(menu.len(), pages["pages"].as_array().unwrap().len());
    assert_eq!(menu[0]["page"], "dashboard");
    assert_eq!(menu[0]["title"], "Dashboard");
    assert!(menu.iter().any(|e| e["page"] == "task-details" && e["title"] == "Task Details"));

    let explained: serde_json::Value = client
        .get(srv.url("/access/explain/admin-tasks"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(explained["granted"], false);
    assert!(explained["grantingRoles"].as_array().unwrap().iter().any(|r| r == "Teacher"));

    let res = client
        .get(srv.url("/access/explain/nope"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn expired_access_token_is_rejected() {
    let srv = TestServer::spawn().await;
    let user = srv.services.accounts.authenticate("s1234", SECRET).unwrap();
    let (token, _) = srv
        .services
        .jwt
        .issue(&user, chrono::Utc::now() - ChronoDuration::hours(1), ChronoDuration::minutes(15))
        .unwrap();

    let res = reqwest::Client::new()
        .get(srv.url("/whoami"))
        .bearer_auth(token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}
