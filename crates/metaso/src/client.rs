//! Metaso search API client.

use std::sync::Arc;

use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::redirect::Policy;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::settings::Settings;
use crate::{Error, Result};

const SEARCH_PATH: &str = "/api/v1/search";

pub const DEFAULT_SCOPE: &str = "webpage";
pub const DEFAULT_SIZE: u32 = 10;

/// One search call. Built with [`SearchRequest::new`] and the setters below.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub query: String,
    pub scope: String,
    pub size: u32,
    pub include_summary: bool,
    pub include_raw_content: bool,
    pub concise_snippet: bool,
    /// Provider-specific fields merged over the canonical ones.
    pub extra_params: Map<String, Value>,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            scope: DEFAULT_SCOPE.to_string(),
            size: DEFAULT_SIZE,
            include_summary: false,
            include_raw_content: false,
            concise_snippet: false,
            extra_params: Map::new(),
        }
    }

    pub fn scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    pub fn size(mut self, size: u32) -> Self {
        self.size = size;
        self
    }

    pub fn include_summary(mut self, include: bool) -> Self {
        self.include_summary = include;
        self
    }

    pub fn include_raw_content(mut self, include: bool) -> Self {
        self.include_raw_content = include;
        self
    }

    pub fn concise_snippet(mut self, concise: bool) -> Self {
        self.concise_snippet = concise;
        self
    }

    pub fn extra_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra_params.insert(key.into(), value.into());
        self
    }

    /// Provider-facing body: canonical fields, then `extra_params` on top.
    pub fn to_body(&self) -> Result<Map<String, Value>> {
        let api_request = ApiRequest {
            q: &self.query,
            scope: &self.scope,
            include_summary: self.include_summary,
            size: self.size.to_string(),
            include_raw_content: self.include_raw_content,
            concise_snippet: self.concise_snippet,
        };

        let mut body = match serde_json::to_value(api_request) {
            Ok(Value::Object(map)) => map,
            Ok(other) => {
                return Err(Error::Invocation(format!(
                    "Metaso request failed: request body encoded as {other}, not an object"
                )));
            }
            Err(e) => {
                return Err(Error::Invocation(format!(
                    "Metaso request failed: could not encode request body: {e}"
                )));
            }
        };
        body.extend(self.extra_params.clone());
        Ok(body)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// API Wire Types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ApiRequest<'a> {
    q: &'a str,
    scope: &'a str,
    include_summary: bool,
    size: String,
    include_raw_content: bool,
    concise_snippet: bool,
}

/// Client for the Metaso search endpoint.
///
/// Every call opens its own connection pool and drops it on return, so no
/// connection outlives a request.
#[derive(Debug, Clone)]
pub struct MetasoClient {
    settings: Arc<Settings>,
}

impl MetasoClient {
    pub fn new(settings: Arc<Settings>) -> Self {
        Self { settings }
    }

    fn endpoint(&self) -> String {
        format!("{}{SEARCH_PATH}", self.settings.base_url())
    }

    /// Run a search and return the provider's JSON payload untouched.
    ///
    /// Exactly one attempt is made; any failure is an [`Error::Invocation`].
    /// Redirects are not followed, so a 3xx is reported like any other
    /// non-success status.
    pub async fn search(&self, request: &SearchRequest) -> Result<Value> {
        let body = request.to_body()?;
        let client = reqwest::Client::builder()
            .timeout(self.settings.timeout())
            .redirect(Policy::none())
            .build()
            .map_err(request_failed)?;

        debug!(
            scope = %request.scope,
            size = request.size,
            extra_params = request.extra_params.len(),
            "sending Metaso search"
        );

        let response = client
            .post(self.endpoint())
            .bearer_auth(self.settings.api_key())
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "application/json")
            .json(&body)
            .send()
            .await
            .map_err(request_failed)?;

        let status = response.status();
        let body = response.bytes().await.map_err(request_failed)?;

        if !status.is_success() {
            warn!(status = status.as_u16(), "Metaso API returned an error");
            return Err(Error::Invocation(format!(
                "Metaso API error {}: {}",
                status.as_u16(),
                render_body(&body)
            )));
        }

        debug!(status = status.as_u16(), bytes = body.len(), "Metaso search succeeded");
        serde_json::from_slice(&body).map_err(|e| {
            Error::Invocation(format!("Metaso request failed: invalid JSON response: {e}"))
        })
    }
}

fn request_failed(err: reqwest::Error) -> Error {
    Error::Invocation(format!("Metaso request failed: {err}"))
}

/// Error bodies are shown as compact JSON when they parse, raw text otherwise.
fn render_body(body: &[u8]) -> String {
    match serde_json::from_slice::<Value>(body) {
        Ok(json) => json.to_string(),
        Err(_) => String::from_utf8_lossy(body).into_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::{Duration, Instant};
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer, timeout_secs: f64) -> MetasoClient {
        let settings = Settings::new("test-key", &server.uri(), timeout_secs).unwrap();
        MetasoClient::new(Arc::new(settings))
    }

    #[test]
    fn body_uses_provider_field_names() {
        let body = SearchRequest::new("rust async")
            .include_summary(true)
            .size(25)
            .to_body()
            .unwrap();

        assert_eq!(
            Value::Object(body),
            json!({
                "q": "rust async",
                "scope": "webpage",
                "includeSummary": true,
                "size": "25",
                "includeRawContent": false,
                "conciseSnippet": false,
            })
        );
    }

    #[test]
    fn extra_params_override_canonical_fields() {
        let body = SearchRequest::new("q1")
            .extra_param("scope", "zhihu")
            .extra_param("page", 2)
            .to_body()
            .unwrap();

        assert_eq!(body.len(), 7);
        assert_eq!(body["scope"], "zhihu");
        assert_eq!(body["page"], 2);
        assert_eq!(body["q"], "q1");
    }

    #[test]
    fn error_body_rendering() {
        assert_eq!(render_body(br#"{ "message": "x" }"#), r#"{"message":"x"}"#);
        assert_eq!(render_body(b"Bad Gateway"), "Bad Gateway");
    }

    #[tokio::test]
    async fn search_posts_authenticated_json() {
        let server = MockServer::start().await;
        let payload = json!({"data": [{"title": "a"}, {"title": "b"}]});

        Mock::given(method("POST"))
            .and(path("/api/v1/search"))
            .and(header("authorization", "Bearer test-key"))
            .and(header("accept", "application/json"))
            .and(header("content-type", "application/json"))
            .and(body_json(json!({
                "q": "metaso",
                "scope": "weibo",
                "includeSummary": false,
                "size": "5",
                "includeRawContent": true,
                "conciseSnippet": true,
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(payload.clone()))
            .expect(1)
            .mount(&server)
            .await;

        let request = SearchRequest::new("metaso")
            .scope("weibo")
            .size(5)
            .include_raw_content(true)
            .concise_snippet(true);
        let result = client_for(&server, 5.0).search(&request).await.unwrap();

        assert_eq!(result, payload);
    }

    #[tokio::test]
    async fn provider_error_embeds_status_and_json_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(401).set_body_json(json!({"message": "invalid token"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let err = client_for(&server, 5.0)
            .search(&SearchRequest::new("q"))
            .await
            .unwrap_err();

        let message = err.to_string();
        assert!(matches!(err, Error::Invocation(_)));
        assert!(message.starts_with("Metaso API error 401: "), "{message}");
        assert!(message.contains("invalid token"), "{message}");
    }

    #[tokio::test]
    async fn provider_error_with_text_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502).set_body_string("upstream unavailable"))
            .expect(1)
            .mount(&server)
            .await;

        let err = client_for(&server, 5.0)
            .search(&SearchRequest::new("q"))
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "Metaso API error 502: upstream unavailable");
    }

    #[tokio::test]
    async fn redirects_are_reported_not_followed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/search"))
            .respond_with(ResponseTemplate::new(302).insert_header("location", "/moved"))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(path("/moved"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
            .expect(0)
            .mount(&server)
            .await;

        let err = client_for(&server, 5.0)
            .search(&SearchRequest::new("q"))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Invocation(_)));
        assert!(err.to_string().starts_with("Metaso API error 302:"), "{err}");
        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].url.path(), "/api/v1/search");
    }

    #[tokio::test]
    async fn non_json_success_is_an_invocation_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let err = client_for(&server, 5.0)
            .search(&SearchRequest::new("q"))
            .await
            .unwrap_err();

        assert!(err.to_string().contains("invalid JSON response"), "{err}");
    }

    #[tokio::test]
    async fn timeout_fails_after_configured_window() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"data": []}))
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let started = Instant::now();
        let err = client_for(&server, 0.3)
            .search(&SearchRequest::new("slow"))
            .await
            .unwrap_err();
        let elapsed = started.elapsed();

        assert!(err.to_string().starts_with("Metaso request failed: "), "{err}");
        assert!(elapsed >= Duration::from_millis(300), "{elapsed:?}");
        assert!(elapsed < Duration::from_secs(3), "{elapsed:?}");
    }

    #[tokio::test]
    async fn connection_refused_is_reported_once() {
        // Reserve a port, then free it so nothing is listening.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let settings = Settings::new("k", &format!("http://{addr}"), 2.0).unwrap();
        let err = MetasoClient::new(Arc::new(settings))
            .search(&SearchRequest::new("q"))
            .await
            .unwrap_err();

        assert!(err.to_string().starts_with("Metaso request failed: "), "{err}");
    }
}
