//! Stripe API client over the [`HttpTransport`] boundary.
//!
//! The client covers exactly the surface the sync engine needs: the acting
//! account, paginated list calls, single retrieves, and webhook-endpoint
//! CRUD. Transient failures are retried here with exponential backoff, so
//! callers only ever see terminal outcomes.

use std::sync::Arc;
use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};
use serde_json::Value;

use crate::entity::object_kind::ObjectKind;
use crate::http::{
    HttpMethod, HttpRequest, HttpTransport, header_get, reqwest_transport::ReqwestTransport,
};

use super::error::{Result, StripeError};
use super::types::{Account, Page, WebhookEndpoint};

/// Production API origin.
pub const DEFAULT_BASE_URL: &str = "https://api.stripe.com";

/// Initial backoff delay for transient failures.
const INITIAL_BACKOFF: Duration = Duration::from_millis(500);

/// Backoff cap.
const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Retry attempts per request after the first try.
const MAX_RETRIES: usize = 5;

/// Retry configuration for provider calls.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub min_delay: Duration,
    pub max_delay: Duration,
    pub max_retries: usize,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            min_delay: INITIAL_BACKOFF,
            max_delay: MAX_BACKOFF,
            max_retries: MAX_RETRIES,
        }
    }
}

impl RetryConfig {
    /// Build the exponential backoff strategy for this configuration.
    #[must_use]
    pub fn backoff(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(self.min_delay)
            .with_max_delay(self.max_delay)
            .with_max_times(self.max_retries)
            .with_jitter()
    }
}

/// Parameters for paginated list calls.
#[derive(Debug, Clone, Default)]
pub struct ListParams {
    /// Cursor: id of the last object of the previous page.
    pub starting_after: Option<String>,
    /// Only objects created at or after this Unix timestamp.
    pub created_gte: Option<i64>,
    /// Page size (1..=100).
    pub limit: u64,
}

/// Parameters for creating or updating a webhook endpoint.
#[derive(Debug, Clone, Default)]
pub struct WebhookEndpointParams {
    pub url: String,
    pub enabled_events: Vec<String>,
    pub description: Option<String>,
    pub metadata: Vec<(String, String)>,
}

/// Stripe API client.
///
/// Cheap to clone; all state is behind `Arc`s and the client itself is
/// stateless between calls.
#[derive(Clone)]
pub struct StripeClient {
    transport: Arc<dyn HttpTransport>,
    secret_key: Arc<String>,
    api_version: Option<Arc<String>>,
    base_url: Arc<String>,
    retry: RetryConfig,
}

impl StripeClient {
    /// Create a client backed by a real HTTP transport.
    pub fn new(
        secret_key: &str,
        api_version: Option<&str>,
        timeout: Duration,
    ) -> Result<Self> {
        let transport = ReqwestTransport::with_timeout(timeout)
            .map_err(|e| StripeError::network(e.to_string()))?;
        Ok(Self::with_transport(Arc::new(transport), secret_key, api_version))
    }

    /// Create a client over an arbitrary transport (tests use the mock).
    pub fn with_transport(
        transport: Arc<dyn HttpTransport>,
        secret_key: &str,
        api_version: Option<&str>,
    ) -> Self {
        Self {
            transport,
            secret_key: Arc::new(secret_key.to_string()),
            api_version: api_version.map(|v| Arc::new(v.to_string())),
            base_url: Arc::new(DEFAULT_BASE_URL.to_string()),
            retry: RetryConfig::default(),
        }
    }

    /// Point the client at a different API origin.
    #[must_use]
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = Arc::new(base_url.trim_end_matches('/').to_string());
        self
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Retrieve the acting account (`GET /v1/account`).
    pub async fn retrieve_account(&self) -> Result<Account> {
        let value = self.request(HttpMethod::Get, "account", &[], None).await?;
        serde_json::from_value(value)
            .map_err(|e| StripeError::deserialize(format!("account: {}", e)))
    }

    /// List one page of `kind` (`GET /v1/{path}`).
    pub async fn list(&self, kind: ObjectKind, params: &ListParams) -> Result<Page> {
        let mut query: Vec<(String, String)> =
            vec![("limit".to_string(), params.limit.to_string())];
        if let Some(cursor) = &params.starting_after {
            query.push(("starting_after".to_string(), cursor.clone()));
        }
        if let Some(created) = params.created_gte {
            query.push(("created[gte]".to_string(), created.to_string()));
        }
        // Canceled subscriptions are excluded by default; we mirror them too.
        if kind == ObjectKind::Subscription {
            query.push(("status".to_string(), "all".to_string()));
        }

        let value = self
            .request(HttpMethod::Get, kind.api_path(), &query, None)
            .await?;
        serde_json::from_value(value)
            .map_err(|e| StripeError::deserialize(format!("{} list: {}", kind, e)))
    }

    /// Retrieve one object by id; `Ok(None)` when the provider reports 404.
    pub async fn retrieve(&self, kind: ObjectKind, id: &str) -> Result<Option<Value>> {
        let path = format!("{}/{}", kind.api_path(), id);
        match self.request(HttpMethod::Get, &path, &[], None).await {
            Ok(value) => Ok(Some(value)),
            Err(StripeError::NotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Create a webhook endpoint (`POST /v1/webhook_endpoints`).
    pub async fn create_webhook_endpoint(
        &self,
        params: &WebhookEndpointParams,
    ) -> Result<WebhookEndpoint> {
        let form = webhook_endpoint_form(params);
        let value = self
            .request(HttpMethod::Post, "webhook_endpoints", &[], Some(&form))
            .await?;
        serde_json::from_value(value)
            .map_err(|e| StripeError::deserialize(format!("webhook endpoint: {}", e)))
    }

    /// Update a webhook endpoint (`POST /v1/webhook_endpoints/{id}`).
    pub async fn update_webhook_endpoint(
        &self,
        id: &str,
        params: &WebhookEndpointParams,
    ) -> Result<WebhookEndpoint> {
        let form = webhook_endpoint_form(params);
        let path = format!("webhook_endpoints/{}", id);
        let value = self
            .request(HttpMethod::Post, &path, &[], Some(&form))
            .await?;
        serde_json::from_value(value)
            .map_err(|e| StripeError::deserialize(format!("webhook endpoint: {}", e)))
    }

    /// Retrieve a webhook endpoint; `Ok(None)` when absent on the provider.
    pub async fn retrieve_webhook_endpoint(&self, id: &str) -> Result<Option<WebhookEndpoint>> {
        let path = format!("webhook_endpoints/{}", id);
        match self.request(HttpMethod::Get, &path, &[], None).await {
            Ok(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|e| StripeError::deserialize(format!("webhook endpoint: {}", e))),
            Err(StripeError::NotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// List all webhook endpoints, following pagination.
    pub async fn list_webhook_endpoints(&self) -> Result<Vec<WebhookEndpoint>> {
        let mut endpoints: Vec<WebhookEndpoint> = Vec::new();
        let mut starting_after: Option<String> = None;

        loop {
            let mut query: Vec<(String, String)> =
                vec![("limit".to_string(), "100".to_string())];
            if let Some(cursor) = &starting_after {
                query.push(("starting_after".to_string(), cursor.clone()));
            }

            let value = self
                .request(HttpMethod::Get, "webhook_endpoints", &query, None)
                .await?;
            let page: Page = serde_json::from_value(value)
                .map_err(|e| StripeError::deserialize(format!("webhook endpoints: {}", e)))?;

            starting_after = page.last_id().map(String::from);
            let batch: Vec<WebhookEndpoint> = page
                .data
                .into_iter()
                .map(serde_json::from_value)
                .collect::<std::result::Result<_, _>>()
                .map_err(|e| StripeError::deserialize(format!("webhook endpoints: {}", e)))?;
            endpoints.extend(batch);

            if !page.has_more || starting_after.is_none() {
                break;
            }
        }

        Ok(endpoints)
    }

    /// Delete a webhook endpoint. Returns `false` when it was already gone.
    pub async fn delete_webhook_endpoint(&self, id: &str) -> Result<bool> {
        let path = format!("webhook_endpoints/{}", id);
        match self.request(HttpMethod::Delete, &path, &[], None).await {
            Ok(_) => Ok(true),
            Err(StripeError::NotFound { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Issue one request with retry on transient failures.
    ///
    /// Rate limits honor the provider-suggested `Retry-After`; everything
    /// else backs off exponentially starting at 500ms, capped at 30s, for
    /// up to 5 attempts.
    async fn request(
        &self,
        method: HttpMethod,
        path: &str,
        query: &[(String, String)],
        form: Option<&[(String, String)]>,
    ) -> Result<Value> {
        let send = || self.send_once(method, path, query, form);

        send.retry(self.retry.backoff())
            .when(StripeError::is_retryable)
            .adjust(|err: &StripeError, dur| err.retry_after().or(dur))
            .notify(|err, dur| {
                tracing::debug!(
                    path = %path,
                    retry_in_ms = dur.as_millis() as u64,
                    error = %err,
                    "Transient provider failure, backing off"
                );
            })
            .await
    }

    async fn send_once(
        &self,
        method: HttpMethod,
        path: &str,
        query: &[(String, String)],
        form: Option<&[(String, String)]>,
    ) -> Result<Value> {
        let mut url = format!("{}/v1/{}", self.base_url, path);
        if !query.is_empty() {
            url.push('?');
            url.push_str(&encode_pairs(query));
        }

        let mut headers = vec![(
            "Authorization".to_string(),
            format!("Bearer {}", self.secret_key),
        )];
        if let Some(version) = &self.api_version {
            headers.push(("Stripe-Version".to_string(), version.to_string()));
        }

        let body = match form {
            Some(pairs) => {
                headers.push((
                    "Content-Type".to_string(),
                    "application/x-www-form-urlencoded".to_string(),
                ));
                encode_pairs(pairs).into_bytes()
            }
            None => Vec::new(),
        };

        let response = self
            .transport
            .send(HttpRequest {
                method,
                url,
                headers,
                body,
            })
            .await
            .map_err(|e| StripeError::network(e.to_string()))?;

        match response.status {
            200..=299 => serde_json::from_slice(&response.body)
                .map_err(|e| StripeError::deserialize(format!("{}: {}", path, e))),
            401 | 403 => Err(StripeError::AuthRequired),
            404 => Err(StripeError::not_found(path)),
            429 => {
                let retry_after = header_get(&response.headers, "retry-after")
                    .and_then(|v| v.parse::<u64>().ok())
                    .map(Duration::from_secs);
                Err(StripeError::RateLimited { retry_after })
            }
            status => Err(StripeError::api(status, error_message(&response.body))),
        }
    }
}

fn webhook_endpoint_form(params: &WebhookEndpointParams) -> Vec<(String, String)> {
    let mut form: Vec<(String, String)> = vec![("url".to_string(), params.url.clone())];
    for (i, event) in params.enabled_events.iter().enumerate() {
        form.push((format!("enabled_events[{}]", i), event.clone()));
    }
    if let Some(description) = &params.description {
        form.push(("description".to_string(), description.clone()));
    }
    for (key, value) in &params.metadata {
        form.push((format!("metadata[{}]", key), value.clone()));
    }
    form
}

/// Form/query encoding per the provider's `application/x-www-form-urlencoded`
/// conventions.
fn encode_pairs(pairs: &[(String, String)]) -> String {
    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    for (key, value) in pairs {
        serializer.append_pair(key, value);
    }
    serializer.finish()
}

/// Pull the human-readable message out of a Stripe error body.
fn error_message(body: &[u8]) -> String {
    serde_json::from_slice::<Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")?
                .get("message")
                .and_then(Value::as_str)
                .map(String::from)
        })
        .unwrap_or_else(|| String::from_utf8_lossy(body).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{HttpResponse, MockTransport};
    use serde_json::json;

    fn client(transport: &MockTransport) -> StripeClient {
        StripeClient::with_transport(Arc::new(transport.clone()), "sk_test_abc", None)
            .with_retry(RetryConfig {
                min_delay: Duration::from_millis(1),
                max_delay: Duration::from_millis(10),
                max_retries: 5,
            })
    }

    #[tokio::test]
    async fn list_builds_cursor_query_and_sends_bearer_auth() {
        let transport = MockTransport::new();
        transport.push_json(
            HttpMethod::Get,
            "https://api.stripe.com/v1/customers?limit=100&starting_after=cus_2",
            &json!({"object": "list", "data": [{"id": "cus_3"}], "has_more": false}),
        );

        let page = client(&transport)
            .list(
                ObjectKind::Customer,
                &ListParams {
                    starting_after: Some("cus_2".to_string()),
                    created_gte: None,
                    limit: 100,
                },
            )
            .await
            .expect("page");

        assert_eq!(page.last_id(), Some("cus_3"));
        assert!(!page.has_more);

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(
            header_get(&requests[0].headers, "authorization"),
            Some("Bearer sk_test_abc")
        );
    }

    #[tokio::test]
    async fn subscription_lists_include_canceled() {
        let transport = MockTransport::new();
        transport.push_json(
            HttpMethod::Get,
            "https://api.stripe.com/v1/subscriptions?limit=50&status=all",
            &json!({"object": "list", "data": [], "has_more": false}),
        );

        client(&transport)
            .list(
                ObjectKind::Subscription,
                &ListParams {
                    limit: 50,
                    ..ListParams::default()
                },
            )
            .await
            .expect("page");
    }

    #[tokio::test]
    async fn retrieve_maps_404_to_none() {
        let transport = MockTransport::new();
        transport.push_response(
            HttpMethod::Get,
            "https://api.stripe.com/v1/customers/cus_gone",
            HttpResponse {
                status: 404,
                headers: Vec::new(),
                body: br#"{"error":{"message":"No such customer"}}"#.to_vec(),
            },
        );

        let found = client(&transport)
            .retrieve(ObjectKind::Customer, "cus_gone")
            .await
            .expect("retrieve");
        assert!(found.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limits_are_retried_until_success() {
        let transport = MockTransport::new();
        let url = "https://api.stripe.com/v1/charges?limit=100";
        for _ in 0..2 {
            transport.push_response(
                HttpMethod::Get,
                url,
                HttpResponse {
                    status: 429,
                    headers: vec![("Retry-After".to_string(), "1".to_string())],
                    body: b"{}".to_vec(),
                },
            );
        }
        transport.push_json(
            HttpMethod::Get,
            url,
            &json!({"object": "list", "data": [{"id": "ch_1"}], "has_more": false}),
        );

        let page = client(&transport)
            .list(
                ObjectKind::Charge,
                &ListParams {
                    limit: 100,
                    ..ListParams::default()
                },
            )
            .await
            .expect("page after retries");

        assert_eq!(page.data.len(), 1);
        assert_eq!(transport.requests().len(), 3);
    }

    #[tokio::test]
    async fn auth_failures_are_not_retried() {
        let transport = MockTransport::new();
        transport.push_response(
            HttpMethod::Get,
            "https://api.stripe.com/v1/account",
            HttpResponse {
                status: 401,
                headers: Vec::new(),
                body: br#"{"error":{"message":"Invalid API Key"}}"#.to_vec(),
            },
        );

        let err = client(&transport).retrieve_account().await.unwrap_err();
        assert!(matches!(err, StripeError::AuthRequired));
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn server_errors_exhaust_retries_then_surface() {
        let transport = MockTransport::new();
        let url = "https://api.stripe.com/v1/products?limit=100";
        for _ in 0..6 {
            transport.push_response(
                HttpMethod::Get,
                url,
                HttpResponse {
                    status: 503,
                    headers: Vec::new(),
                    body: b"{}".to_vec(),
                },
            );
        }

        let err = client(&transport)
            .list(
                ObjectKind::Product,
                &ListParams {
                    limit: 100,
                    ..ListParams::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StripeError::Api { status: 503, .. }));
        assert_eq!(transport.requests().len(), 6);
    }

    #[test]
    fn webhook_endpoint_form_encodes_nested_params() {
        let form = webhook_endpoint_form(&WebhookEndpointParams {
            url: "https://x.example/hook".to_string(),
            enabled_events: vec!["*".to_string()],
            description: Some("Stripe Sync managed webhook".to_string()),
            metadata: vec![("managed_by".to_string(), "stripe-sync".to_string())],
        });
        assert!(form.contains(&("enabled_events[0]".to_string(), "*".to_string())));
        assert!(form.contains(&("metadata[managed_by]".to_string(), "stripe-sync".to_string())));

        let encoded = encode_pairs(&form);
        assert!(encoded.contains("url=https%3A%2F%2Fx.example%2Fhook"));
        assert!(encoded.contains("metadata%5Bmanaged_by%5D=stripe-sync"));
    }
}
