use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::CookieJar;
use serde::Deserialize;

use common::ErrorCode;

#[derive(Debug, thiserror::Error)]
pub enum IntrospectionError {
    #[error("introspection request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Asks the authorization server whether a token is still active.
#[async_trait]
pub trait TokenIntrospector: Send + Sync {
    async fn is_active(&self, token: &str, client_ip: Option<&str>)
    -> Result<bool, IntrospectionError>;
}

#[derive(Debug, Deserialize)]
struct IntrospectionResponse {
    #[serde(default)]
    active: bool,
}

/// Where the authorization server introspects tokens.
#[derive(Debug, Clone, Deserialize)]
pub struct IntrospectionSettings {
    pub introspect_url: String,
}

impl IntrospectionSettings {
    pub fn introspector(&self) -> Arc<dyn TokenIntrospector> {
        Arc::new(AuthServerIntrospector::new(self.introspect_url.clone()))
    }
}

/// Introspects tokens against `<auth server>/oauth2/introspect`.
#[derive(Debug, Clone)]
pub struct AuthServerIntrospector {
    client: reqwest::Client,
    introspect_url: String,
}

impl AuthServerIntrospector {
    pub fn new(introspect_url: impl Into<String>) -> Self {
        AuthServerIntrospector {
            client: reqwest::Client::new(),
            introspect_url: introspect_url.into(),
        }
    }
}

#[async_trait]
impl TokenIntrospector for AuthServerIntrospector {
    async fn is_active(
        &self,
        token: &str,
        client_ip: Option<&str>,
    ) -> Result<bool, IntrospectionError> {
        let mut request = self
            .client
            .post(&self.introspect_url)
            .form(&[("token", token)]);
        if let Some(ip) = client_ip {
            request = request.header("X-Client-IP", ip);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            tracing::debug!("Introspection returned {}", response.status());
            return Ok(false);
        }

        let body: IntrospectionResponse = response.json().await?;
        Ok(body.active)
    }
}

/// Bearer token from the `Authorization` header, falling back to the `session` cookie.
pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get("Authorization")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string);

    bearer.or_else(|| {
        CookieJar::from_headers(headers)
            .get("session")
            .map(|cookie| cookie.value().to_string())
    })
}

fn client_ip(headers: &HeaderMap) -> Option<String> {
    headers
        .get("X-Forwarded-For")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(|ip| ip.trim().to_string())
        .filter(|ip| !ip.is_empty())
}

/// Middleware admitting only requests that carry an active token.
pub async fn token_auth(
    State(introspector): State<Arc<dyn TokenIntrospector>>,
    req: Request,
    next: Next,
) -> Response {
    let Some(token) = extract_token(req.headers()) else {
        tracing::debug!("No access token on request to {}", req.uri().path());
        return ErrorCode::Unauthorized.into_response();
    };
    let ip = client_ip(req.headers());

    match introspector.is_active(&token, ip.as_deref()).await {
        Ok(true) => next.run(req).await,
        Ok(false) => {
            tracing::debug!("Inactive token on request to {}", req.uri().path());
            ErrorCode::Unauthorized.into_response()
        }
        Err(err) => {
            tracing::error!("Token introspection failed: {}", err);
            ErrorCode::ApplicationError.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::{
        Router,
        body::Body,
        http::{Request, StatusCode},
        middleware::from_fn_with_state,
        routing::get,
    };
    use tower::ServiceExt;

    use super::*;

    struct StaticIntrospector(&'static str);

    #[async_trait]
    impl TokenIntrospector for StaticIntrospector {
        async fn is_active(
            &self,
            token: &str,
            _client_ip: Option<&str>,
        ) -> Result<bool, IntrospectionError> {
            Ok(token == self.0)
        }
    }

    fn app() -> Router {
        let introspector: Arc<dyn TokenIntrospector> = Arc::new(StaticIntrospector("good"));
        Router::new()
            .route("/participantInfo", get(|| async { "ok" }))
            .layer(from_fn_with_state(introspector, token_auth))
    }

    #[test]
    fn bearer_wins_over_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert("Authorization", "Bearer abc".parse().unwrap());
        headers.insert("Cookie", "session=def".parse().unwrap());
        assert_eq!(extract_token(&headers).as_deref(), Some("abc"));

        headers.remove("Authorization");
        assert_eq!(extract_token(&headers).as_deref(), Some("def"));
    }

    #[test]
    fn first_forwarded_hop_is_client_ip() {
        let mut headers = HeaderMap::new();
        headers.insert("X-Forwarded-For", "10.0.0.1, 10.0.0.2".parse().unwrap());
        assert_eq!(client_ip(&headers).as_deref(), Some("10.0.0.1"));
    }

    #[tokio::test]
    async fn missing_token_is_unauthorized() {
        let response = app()
            .oneshot(Request::get("/participantInfo").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn active_token_is_forwarded() {
        let response = app()
            .oneshot(
                Request::get("/participantInfo")
                    .header("Authorization", "Bearer good")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn inactive_token_is_unauthorized() {
        let response = app()
            .oneshot(
                Request::get("/participantInfo")
                    .header("Authorization", "Bearer stale")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
