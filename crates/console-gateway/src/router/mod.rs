//! Request routing.
//!
//! One fallback handler hands every request to [`Console::handle`], which
//! looks the path up in the [`RouteTable`], runs the auth gate for guarded
//! entries and dispatches to the matched endpoint.

mod console;
mod table;

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    extract::State,
    http::{
        HeaderName, HeaderValue, Request, StatusCode,
        header::{REFERRER_POLICY, X_CONTENT_TYPE_OPTIONS, X_FRAME_OPTIONS, X_XSS_PROTECTION},
    },
    response::{IntoResponse, Response},
};
use tower_http::trace::TraceLayer;

pub use console::{
    API_PREFIX, AUTH_CALLBACK, AUTH_LOGIN, AUTH_LOGOUT, Console, DELETE_TOKEN, HEALTH,
    KNATIVE_EVENT_SOURCES, MONITORING_DASHBOARDS, STATIC_PREFIX, VERSION,
};
pub use table::{Endpoint, Guard, RouteEntry, RouteTable};

/// Fixed response for unmatched API paths.
pub fn not_found() -> Response {
    (StatusCode::NOT_FOUND, "not found").into_response()
}

const SECURITY_HEADERS: [(HeaderName, &str); 4] = [
    (X_FRAME_OPTIONS, "DENY"),
    (X_CONTENT_TYPE_OPTIONS, "nosniff"),
    (X_XSS_PROTECTION, "1; mode=block"),
    (REFERRER_POLICY, "strict-origin-when-cross-origin"),
];

/// Add the browser hardening headers served with the shell and its assets.
pub fn with_security_headers(mut response: Response) -> Response {
    let headers = response.headers_mut();
    for (name, value) in SECURITY_HEADERS {
        headers.insert(name, HeaderValue::from_static(value));
    }
    response
}

/// Create the application router.
pub fn create_router(console: Arc<Console>) -> Router {
    Router::new()
        .fallback(route)
        .with_state(console)
        .layer(TraceLayer::new_for_http())
}

async fn route(State(console): State<Arc<Console>>, req: Request<Body>) -> Response {
    console.handle(req).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header::CONTENT_TYPE;

    #[tokio::test]
    async fn test_not_found_is_plain_text() {
        let response = not_found();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.headers()[CONTENT_TYPE], "text/plain; charset=utf-8");
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"not found");
    }

    #[test]
    fn test_security_headers() {
        let response = with_security_headers(StatusCode::OK.into_response());
        assert_eq!(response.headers()[X_FRAME_OPTIONS], "DENY");
        assert_eq!(response.headers()[X_CONTENT_TYPE_OPTIONS], "nosniff");
        assert_eq!(response.headers()[X_XSS_PROTECTION], "1; mode=block");
        assert_eq!(
            response.headers()[REFERRER_POLICY],
            "strict-origin-when-cross-origin"
        );
    }
}
