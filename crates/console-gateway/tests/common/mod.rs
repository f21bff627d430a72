//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Json, Router,
    body::Body,
    http::{HeaderMap, Method, Request, StatusCode, Uri, header},
    response::{IntoResponse, Response},
};
use console_gateway::{
    AppConfig, Console,
    backends::UpstreamKind,
    create_router,
};
use serde_json::{Value, json};
use tempfile::TempDir;
use tokio::net::TcpListener;
use tower::ServiceExt;

pub const INDEX_HTML: &str =
    "<!doctype html><html><head><script>window.SERVER_FLAGS = [[ .ServerFlags ]];</script></head></html>";

pub const STATIC_TOKEN: &str = "static-sa-token";

/// Reply with what the upstream saw. `?status=NNN` picks the status code.
async fn echo(method: Method, uri: Uri, headers: HeaderMap, body: String) -> Response {
    let status = uri
        .query()
        .and_then(|q| q.split('&').find_map(|pair| pair.strip_prefix("status=")))
        .and_then(|code| code.parse::<u16>().ok())
        .and_then(|code| StatusCode::from_u16(code).ok())
        .unwrap_or(StatusCode::OK);

    let header_value = |name: header::HeaderName| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(String::from)
    };

    let reply = json!({
        "method": method.as_str(),
        "path": uri.path(),
        "query": uri.query(),
        "authorization": header_value(header::AUTHORIZATION),
        "origin": header_value(header::ORIGIN),
        "host": header_value(header::HOST),
        "body": body,
    });

    (status, [("x-upstream", "echo")], Json(reply)).into_response()
}

/// Start an echo upstream on an ephemeral port.
pub async fn spawn_echo() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = Router::new().fallback(echo);
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

/// A config serving the index page from a temporary public directory.
pub struct TestEnv {
    pub config: AppConfig,
    pub public_dir: TempDir,
}

impl TestEnv {
    pub fn new() -> Self {
        let public_dir = tempfile::tempdir().unwrap();
        std::fs::write(public_dir.path().join("index.html"), INDEX_HTML).unwrap();
        std::fs::write(public_dir.path().join("main.css"), "body {}").unwrap();

        let mut config = AppConfig::default();
        config.server.public_dir = public_dir.path().to_path_buf();
        config.auth.static_user.token = STATIC_TOKEN.to_string();

        Self { config, public_dir }
    }

    /// Point `kinds` at `addr`.
    pub fn with_backends(mut self, addr: SocketAddr, kinds: &[UpstreamKind]) -> Self {
        for kind in kinds {
            self.config
                .backends
                .set_endpoint(*kind, format!("http://{addr}"));
        }
        self
    }

    pub fn router(&self) -> Router {
        let console = Console::from_config(&self.config).unwrap();
        create_router(Arc::new(console))
    }
}

pub fn request(method: Method, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

pub fn get(uri: &str) -> Request<Body> {
    request(Method::GET, uri)
}

pub fn get_with_bearer(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap()
}

pub async fn send(app: &Router, req: Request<Body>) -> Response {
    app.clone().oneshot(req).await.unwrap()
}

pub async fn body_text(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub async fn body_json(response: Response) -> Value {
    serde_json::from_str(&body_text(response).await).unwrap()
}
