use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{
        header::{AUTHORIZATION, RETRY_AFTER},
        request::Parts,
        HeaderMap, HeaderName, HeaderValue,
    },
    middleware::Next,
    response::{IntoResponse, Response},
};
use subtle::ConstantTimeEq;
use tokio::sync::Mutex;
use uuid::Uuid;

use rrv_core::{AppConfig, Session};

use crate::api::ApiError;

pub const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");
pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_NAME_HEADER: &str = "x-user-name";
pub const USER_EMAIL_HEADER: &str = "x-user-email";

/// Budget shared by every caller that is not identified by an API key.
const ANONYMOUS_CLIENT: &str = "anonymous";
/// Upper bound on tracked key budgets. New clients past it share the
/// anonymous budget until expired windows are swept.
const MAX_TRACKED_CLIENTS: usize = 1024;

/// Correlation id for one request, available to handlers as an extension.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

impl RequestId {
    fn from_parts(parts: &Parts) -> String {
        parts
            .extensions
            .get::<RequestId>()
            .map(|r| r.0.clone())
            .unwrap_or_default()
    }
}

/// Position of the API key that authenticated the request, set by
/// [`require_bearer_auth`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApiClient(pub usize);

/// Bearer API keys accepted on protected routes.
#[derive(Debug, Clone)]
pub struct AuthState {
    api_keys: Arc<Vec<String>>,
    pub enabled: bool,
}

impl AuthState {
    /// Auth is enabled whenever keys are configured. Configuration loading
    /// already refuses to start without keys outside development.
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        if config.api_keys.is_empty() {
            tracing::warn!("RRV_API_KEYS not set; bearer auth disabled");
        }
        Self::new(config.api_keys.clone())
    }

    #[must_use]
    pub fn new(api_keys: Vec<String>) -> Self {
        let enabled = !api_keys.is_empty();
        Self {
            api_keys: Arc::new(api_keys),
            enabled,
        }
    }

    fn matching_key(&self, token: &str) -> Option<ApiClient> {
        // Compares every key so timing does not reveal which one matched.
        let matches: Vec<bool> = self
            .api_keys
            .iter()
            .map(|key| bool::from(key.as_bytes().ct_eq(token.as_bytes())))
            .collect();
        matches.iter().position(|m| *m).map(ApiClient)
    }
}

#[derive(Debug, Clone, Copy)]
struct ClientWindow {
    opened: Instant,
    used: usize,
}

/// Fixed-window request budget, tracked separately for each API key and
/// shared by callers without one.
///
/// Keys come from state the server verified, never from caller-supplied
/// headers, so a caller cannot mint fresh budgets.
#[derive(Debug, Clone)]
pub struct RateLimitState {
    budget: usize,
    window: Duration,
    clients: Arc<Mutex<HashMap<String, ClientWindow>>>,
}

impl RateLimitState {
    #[must_use]
    pub fn new(budget: usize, window: Duration) -> Self {
        Self {
            budget,
            window,
            clients: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Spends one request from `client`'s budget.
    ///
    /// Returns the time until the window reopens when the budget is spent.
    async fn acquire(&self, client: &str, now: Instant) -> Result<(), Duration> {
        let mut clients = self.clients.lock().await;

        let mut client = client;
        if !clients.contains_key(client) && clients.len() >= MAX_TRACKED_CLIENTS {
            clients.retain(|_, w| now.duration_since(w.opened) < self.window);
            if clients.len() >= MAX_TRACKED_CLIENTS {
                client = ANONYMOUS_CLIENT;
            }
        }

        let window = clients.entry(client.to_string()).or_insert(ClientWindow {
            opened: now,
            used: 0,
        });
        if now.duration_since(window.opened) >= self.window {
            *window = ClientWindow {
                opened: now,
                used: 0,
            };
        }

        if window.used >= self.budget {
            return Err(self.window.saturating_sub(now.duration_since(window.opened)));
        }
        window.used += 1;
        Ok(())
    }
}

fn client_key(req: &Request) -> String {
    req.extensions()
        .get::<ApiClient>()
        .map_or_else(|| ANONYMOUS_CLIENT.to_string(), |c| format!("key:{}", c.0))
}

/// Tags every request with an id, reusing an incoming `x-request-id` when
/// present, and echoes it on the response.
pub async fn request_id(mut req: Request, next: Next) -> Response {
    let id = req
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map_or_else(|| Uuid::new_v4().to_string(), String::from);

    req.extensions_mut().insert(RequestId(id.clone()));
    let mut response = next.run(req).await;

    if let Ok(value) = HeaderValue::from_str(&id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

/// Rejects protected requests without a configured bearer key and tags
/// accepted ones with the matching [`ApiClient`].
pub async fn require_bearer_auth(
    State(auth): State<AuthState>,
    mut req: Request,
    next: Next,
) -> Response {
    if !auth.enabled {
        return next.run(req).await;
    }

    let client =
        extract_bearer_token(req.headers().get(AUTHORIZATION)).and_then(|t| auth.matching_key(t));
    match client {
        Some(client) => {
            req.extensions_mut().insert(client);
            next.run(req).await
        }
        None => {
            let request_id = request_id_of(&req);
            ApiError::new(request_id, "unauthorized", "missing or invalid bearer token")
                .into_response()
        }
    }
}

/// Answers `429` with `Retry-After` once the caller's budget is spent.
///
/// Must run inside [`require_bearer_auth`] so the [`ApiClient`] is known.
pub async fn enforce_rate_limit(
    State(rate_limit): State<RateLimitState>,
    req: Request,
    next: Next,
) -> Response {
    let client = client_key(&req);

    match rate_limit.acquire(&client, Instant::now()).await {
        Ok(()) => next.run(req).await,
        Err(retry_after) => {
            tracing::warn!(client = %client, "rate limit exceeded");
            let mut response =
                ApiError::new(request_id_of(&req), "rate_limited", "rate limit exceeded")
                    .into_response();
            // Round up so clients never retry inside the closed window.
            let secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
            response
                .headers_mut()
                .insert(RETRY_AFTER, HeaderValue::from(secs.max(1)));
            response
        }
    }
}

fn request_id_of(req: &Request) -> String {
    req.extensions()
        .get::<RequestId>()
        .map(|r| r.0.clone())
        .unwrap_or_default()
}

fn extract_bearer_token(value: Option<&HeaderValue>) -> Option<&str> {
    value
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .filter(|s| !s.trim().is_empty())
}

/// The signed-in user, asserted by the identity provider in front of the
/// API through `x-user-*` headers.
///
/// Handlers that act on behalf of a user take this extractor; requests
/// without `x-user-id` are rejected with `unauthorized`.
#[derive(Debug, Clone)]
pub struct CurrentSession(pub Session);

impl<S: Send + Sync> FromRequestParts<S> for CurrentSession {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        session_from_headers(&parts.headers)
            .map(CurrentSession)
            .ok_or_else(|| {
                ApiError::new(
                    RequestId::from_parts(parts),
                    "unauthorized",
                    "sign in to continue",
                )
            })
    }
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

fn session_from_headers(headers: &HeaderMap) -> Option<Session> {
    let mut session = Session::new(header_value(headers, USER_ID_HEADER)?);
    if let Some(name) = header_value(headers, USER_NAME_HEADER) {
        session = session.with_display_name(name);
    }
    if let Some(email) = header_value(headers, USER_EMAIL_HEADER) {
        session = session.with_email(email);
    }
    Some(session)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_token_is_taken_from_bearer_scheme_only() {
        let bearer = HeaderValue::from_static("Bearer k-123");
        let basic = HeaderValue::from_static("Basic abc123");
        let blank = HeaderValue::from_static("Bearer   ");
        assert_eq!(extract_bearer_token(Some(&bearer)), Some("k-123"));
        assert_eq!(extract_bearer_token(Some(&basic)), None);
        assert_eq!(extract_bearer_token(Some(&blank)), None);
        assert_eq!(extract_bearer_token(None), None);
    }

    #[test]
    fn auth_state_disabled_without_keys() {
        let state = AuthState::new(Vec::new());
        assert!(!state.enabled);
    }

    #[test]
    fn auth_state_allows_only_configured_keys() {
        let state = AuthState::new(vec!["key-a".to_string(), "key-b".to_string()]);
        assert!(state.enabled);
        assert_eq!(state.matching_key("key-b"), Some(ApiClient(1)));
        assert_eq!(state.matching_key("key-c"), None);
        assert_eq!(state.matching_key("key-"), None);
    }

    #[tokio::test]
    async fn budgets_are_tracked_per_client() {
        let limiter = RateLimitState::new(2, Duration::from_secs(60));
        let now = Instant::now();

        assert!(limiter.acquire("key:0", now).await.is_ok());
        assert!(limiter.acquire("key:0", now).await.is_ok());
        assert!(limiter.acquire("key:0", now).await.is_err());
        assert!(limiter.acquire("key:1", now).await.is_ok());
    }

    #[tokio::test]
    async fn tracked_budgets_are_capped() {
        let limiter = RateLimitState::new(1, Duration::from_secs(60));
        let now = Instant::now();

        for i in 0..MAX_TRACKED_CLIENTS {
            assert!(limiter.acquire(&format!("key:{i}"), now).await.is_ok());
        }
        assert_eq!(limiter.clients.lock().await.len(), MAX_TRACKED_CLIENTS);

        // Overflow clients land on the shared budget.
        assert!(limiter.acquire("key:overflow-a", now).await.is_ok());
        assert!(limiter.acquire("key:overflow-b", now).await.is_err());
        assert_eq!(limiter.clients.lock().await.len(), MAX_TRACKED_CLIENTS + 1);

        // Expired windows make room again.
        let later = now + Duration::from_secs(60);
        assert!(limiter.acquire("key:overflow-a", later).await.is_ok());
        assert_eq!(limiter.clients.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn budget_resets_when_window_elapses() {
        let limiter = RateLimitState::new(1, Duration::from_secs(10));
        let start = Instant::now();

        assert!(limiter.acquire(ANONYMOUS_CLIENT, start).await.is_ok());
        let retry = limiter
            .acquire(ANONYMOUS_CLIENT, start + Duration::from_secs(4))
            .await
            .expect_err("budget spent");
        assert_eq!(retry, Duration::from_secs(6));

        assert!(limiter
            .acquire(ANONYMOUS_CLIENT, start + Duration::from_secs(10))
            .await
            .is_ok());
    }

    #[test]
    fn client_key_ignores_session_headers() {
        let mut req = Request::builder()
            .header(USER_ID_HEADER, "uid-9")
            .body(axum::body::Body::empty())
            .expect("request");
        assert_eq!(client_key(&req), ANONYMOUS_CLIENT);

        req.extensions_mut().insert(ApiClient(3));
        assert_eq!(client_key(&req), "key:3");
    }

    #[test]
    fn session_requires_user_id_header() {
        let mut headers = HeaderMap::new();
        headers.insert(USER_NAME_HEADER, HeaderValue::from_static("Alice"));
        assert!(session_from_headers(&headers).is_none());

        headers.insert(USER_ID_HEADER, HeaderValue::from_static("uid-1"));
        headers.insert(USER_EMAIL_HEADER, HeaderValue::from_static("a@example.com"));
        let session = session_from_headers(&headers).expect("session");
        assert_eq!(session.user_id, "uid-1");
        assert_eq!(session.display_name.as_deref(), Some("Alice"));
        assert_eq!(session.email.as_deref(), Some("a@example.com"));
    }

    #[test]
    fn blank_optional_headers_are_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(USER_ID_HEADER, HeaderValue::from_static("uid-2"));
        headers.insert(USER_NAME_HEADER, HeaderValue::from_static("  "));
        let session = session_from_headers(&headers).expect("session");
        assert!(session.display_name.is_none());
        assert_eq!(session.author_name(), "Anonymous");
    }
}
