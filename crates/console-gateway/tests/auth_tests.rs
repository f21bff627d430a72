//! Delegated authentication, end to end.

use axum::{
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use console_gateway::auth::{AuthMode, Claims};
use console_gateway::backends::UpstreamKind;
use console_gateway::{Console, StartupError};
use jsonwebtoken::{EncodingKey, Header, encode};

mod common;
use common::{TestEnv, body_json, get, get_with_bearer, request, send, spawn_echo};

const SECRET: &str = "integration-secret-at-least-32-characters";

fn session_token(username: &str, exp_offset: i64) -> String {
    let claims = Claims {
        sub: format!("u-{username}"),
        exp: chrono::Utc::now().timestamp() + exp_offset,
        iat: Some(chrono::Utc::now().timestamp()),
        email: None,
        name: None,
        preferred_username: Some(username.to_string()),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap()
}

fn delegated(mut env: TestEnv) -> TestEnv {
    env.config.auth.mode = AuthMode::Delegated;
    env.config.auth.jwt_secret = Some(SECRET.to_string());
    env.config.auth.login_url = Some("https://sso.example.com/login".to_string());
    env
}

#[tokio::test]
async fn test_guarded_routes_require_a_session() {
    let addr = spawn_echo().await;
    let app = delegated(TestEnv::new().with_backends(addr, &[UpstreamKind::Kubernetes])).router();

    let response = send(&app, get("/api/kubernetes/api/v1/pods")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(response.headers().contains_key(header::WWW_AUTHENTICATE));
    let json = body_json(response).await;
    assert_eq!(json["reason"], "no_session");

    let response = send(&app, get_with_bearer("/api/kubernetes/api/v1/pods", "garbage")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = send(&app, get("/api/console/version")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_session_token_is_forwarded() {
    let addr = spawn_echo().await;
    let app = delegated(TestEnv::new().with_backends(addr, &[UpstreamKind::Kubernetes])).router();
    let token = session_token("alice", 3600);

    let json = body_json(send(&app, get_with_bearer("/api/kubernetes/api/v1/pods", &token)).await).await;
    assert_eq!(json["authorization"], format!("Bearer {token}"));

    let req = Request::builder()
        .uri("/api/kubernetes/api/v1/pods")
        .header(header::COOKIE, format!("console-session-token={token}"))
        .body(Body::empty())
        .unwrap();
    let json = body_json(send(&app, req).await).await;
    assert_eq!(json["authorization"], format!("Bearer {token}"));
}

#[tokio::test]
async fn test_expired_session_is_rejected() {
    let addr = spawn_echo().await;
    let app = delegated(TestEnv::new().with_backends(addr, &[UpstreamKind::Kiali])).router();

    let response = send(
        &app,
        get_with_bearer("/api/kiali/api/namespaces", &session_token("alice", -3600)),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["reason"], "session_expired");
}

#[tokio::test]
async fn test_public_routes_skip_the_gate() {
    let addr = spawn_echo().await;
    let env = delegated(TestEnv::new().with_backends(addr, &[UpstreamKind::HelmChartRepo]));
    let app = env.router();

    assert_eq!(send(&app, get("/health")).await.status(), StatusCode::OK);
    assert_eq!(send(&app, get("/")).await.status(), StatusCode::OK);
    assert_eq!(
        send(&app, get("/static/main.css")).await.status(),
        StatusCode::OK
    );
    assert_eq!(
        send(&app, get("/api/helm/charts/index.yaml")).await.status(),
        StatusCode::OK
    );
}

#[tokio::test]
async fn test_login_redirects_to_provider() {
    let mut env = delegated(TestEnv::new());
    env.config.server.base_address = Some("https://console.example.com".to_string());
    let app = env.router();

    let response = send(&app, get("/auth/login")).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        response.headers()[header::LOCATION],
        "https://sso.example.com/login?redirect_uri=https%3A%2F%2Fconsole.example.com%2Fauth%2Fcallback"
    );
}

#[tokio::test]
async fn test_callback_sets_session_cookie() {
    let app = delegated(TestEnv::new()).router();
    let token = session_token("bob", 3600);

    let response = send(&app, get(&format!("/auth/callback?token={token}"))).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], "/");
    let cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
    assert!(cookie.starts_with(&format!("console-session-token={token}")));
    assert!(cookie.contains("HttpOnly"));
}

#[tokio::test]
async fn test_logout_clears_session_cookie() {
    let app = delegated(TestEnv::new()).router();

    let response = send(&app, get("/auth/logout")).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
    assert!(cookie.contains("Max-Age=0"));
}

#[tokio::test]
async fn test_delete_token_revokes_callers_token() {
    let addr = spawn_echo().await;
    let app = delegated(TestEnv::new().with_backends(addr, &[UpstreamKind::Kubernetes])).router();
    let token = session_token("alice", 3600);

    let req = Request::builder()
        .method(Method::POST)
        .uri("/api/openshift/delete-token")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    let json = body_json(send(&app, req).await).await;
    assert_eq!(json["method"], "DELETE");
    assert_eq!(
        json["path"],
        format!("/apis/oauth.openshift.io/v1/oauthaccesstokens/{token}")
    );
    assert_eq!(json["authorization"], format!("Bearer {token}"));

    let response = send(&app, get_with_bearer("/api/openshift/delete-token", &token)).await;
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(response.headers()[header::ALLOW], "POST");

    let response = send(&app, request(Method::POST, "/api/openshift/delete-token")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_delegated_mode_requires_a_strong_secret() {
    let mut env = delegated(TestEnv::new());
    env.config.auth.jwt_secret = Some("too-short".to_string());
    assert!(matches!(
        Console::from_config(&env.config),
        Err(StartupError::Auth(_))
    ));
}

#[tokio::test]
async fn test_missing_index_page_fails_startup() {
    let env = TestEnv::new();
    std::fs::remove_file(env.public_dir.path().join("index.html")).unwrap();
    assert!(matches!(
        Console::from_config(&env.config),
        Err(StartupError::Template { .. })
    ));
}
