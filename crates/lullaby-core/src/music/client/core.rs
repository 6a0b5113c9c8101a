//! Shared HTTP client for music providers
//!
//! One connection-pooled reqwest client is cloned into every adapter.
//! Every response is classified into the [`GenerationError`] taxonomy here,
//! so adapters only deal with successful JSON bodies.

use std::time::Duration;

use bytes::Bytes;
use reqwest::{Client, RequestBuilder, Response};
use serde_json::Value;
use tracing::{debug, error};

use crate::constants;
use crate::music::config::ProviderSettings;
use crate::music::error::GenerationError;
use crate::music::providers::AuthHeader;
use crate::music::retry::{parse_retry_after, with_retry, RetryConfig};

/// HTTP client handle shared by all adapters; cheap to clone
#[derive(Debug, Clone)]
pub struct MusicHttp {
    http: Client,
}

impl Default for MusicHttp {
    fn default() -> Self {
        Self::new()
    }
}

impl MusicHttp {
    /// Create the HTTP client with pooled connections and a connect timeout
    fn create_http_client() -> Client {
        Client::builder()
            .user_agent(constants::http::USER_AGENT)
            .connect_timeout(constants::http::CONNECT_TIMEOUT)
            .build()
            .unwrap_or_else(|e| {
                error!("Failed to build HTTP client: {}. Using default client.", e);
                Client::new()
            })
    }

    pub fn new() -> Self {
        Self {
            http: Self::create_http_client(),
        }
    }

    /// Attach the provider's auth header and JSON accept header
    pub(crate) fn authorized(
        &self,
        request: RequestBuilder,
        settings: &ProviderSettings,
    ) -> RequestBuilder {
        let request = match settings.auth_header() {
            AuthHeader::Bearer => {
                request.header("authorization", format!("Bearer {}", settings.api_key))
            }
            AuthHeader::XApiKey => request.header("x-api-key", &settings.api_key),
        };
        request.header("accept", "application/json")
    }

    /// Build an authenticated POST with a JSON body
    pub(crate) fn post_json(
        &self,
        url: &str,
        settings: &ProviderSettings,
        body: &Value,
    ) -> RequestBuilder {
        self.authorized(self.http.post(url), settings)
            .timeout(constants::http::SUBMIT_TIMEOUT)
            .json(body)
    }

    /// Build an authenticated GET
    pub(crate) fn get(&self, url: &str, settings: &ProviderSettings) -> RequestBuilder {
        self.authorized(self.http.get(url), settings)
            .timeout(constants::http::STATUS_TIMEOUT)
    }

    /// Send a request and return its JSON body, classifying every failure.
    ///
    /// `codes` maps a non-2xx `code` field inside a successful HTTP response.
    pub(crate) async fn send_json(
        &self,
        request: RequestBuilder,
        codes: EnvelopeCodes,
    ) -> Result<Value, GenerationError> {
        let response = request
            .send()
            .await
            .map_err(|e| GenerationError::from_transport(&e))?;
        let response = handle_error_response(response).await?;

        let text = response
            .text()
            .await
            .map_err(|e| GenerationError::from_transport(&e))?;
        let json: Value = serde_json::from_str(&text).map_err(|e| {
            GenerationError::ProviderUnavailable(format!("response is not JSON: {}", e))
        })?;

        if let Some(err) = classify_envelope(&json, codes) {
            error!("API error envelope: {}", err);
            return Err(err);
        }
        Ok(json)
    }

    /// Download a finished audio file, retrying transient failures
    pub async fn download_audio(&self, audio_url: &str) -> Result<Bytes, GenerationError> {
        debug!(audio_url, "Downloading audio");
        with_retry(&RetryConfig::default(), || async move {
            let response = self
                .http
                .get(audio_url)
                .timeout(constants::http::DOWNLOAD_TIMEOUT)
                .send()
                .await
                .map_err(|e| GenerationError::from_transport(&e))?;
            let response = handle_error_response(response).await?;
            response
                .bytes()
                .await
                .map_err(|e| GenerationError::from_transport(&e))
        })
        .await
    }
}

/// Pass successful responses through; classify the rest
async fn handle_error_response(response: Response) -> Result<Response, GenerationError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let retry_after = response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_retry_after);
    let error_text = response.text().await.unwrap_or_default();
    error!("API error response: {} - {}", status, error_text);

    let message = serde_json::from_str::<Value>(&error_text)
        .ok()
        .and_then(|json| error_message(&json))
        .unwrap_or(error_text);
    Err(classify_status(status.as_u16(), message, retry_after))
}

/// Map an HTTP (or envelope) status code to the error taxonomy
pub fn classify_status(
    status: u16,
    message: impl Into<String>,
    retry_after: Option<Duration>,
) -> GenerationError {
    let message = message.into();
    let message = if message.trim().is_empty() {
        format!("HTTP {}", status)
    } else {
        format!("HTTP {}: {}", status, message)
    };

    match status {
        401 | 403 => GenerationError::Auth(message),
        402 => GenerationError::PaymentRequired(message),
        429 => GenerationError::RateLimited {
            message,
            retry_after,
        },
        400 | 422 => GenerationError::InvalidRequest(message),
        404 => GenerationError::NotFound(message),
        405..=499 => GenerationError::InvalidRequest(message),
        _ => GenerationError::ProviderUnavailable(message),
    }
}

/// Provider table for error codes carried inside an HTTP 200 body
pub type EnvelopeCodes = fn(u16, String) -> GenerationError;

/// Default table: in-body codes mean the same as HTTP statuses
pub fn http_codes(code: u16, message: String) -> GenerationError {
    classify_status(code, message, None)
}

/// Some providers answer HTTP 200 with `{"code": 429, "msg": ...}`
pub fn classify_envelope(body: &Value, codes: EnvelopeCodes) -> Option<GenerationError> {
    let code = body.get("code").and_then(Value::as_u64)?;
    if (200..300).contains(&code) {
        return None;
    }
    let message = error_message(body).unwrap_or_default();
    match u16::try_from(code) {
        Ok(code) => Some(codes(code, message)),
        Err(_) => Some(GenerationError::ProviderUnavailable(format!(
            "unrecognized error code {}: {}",
            code, message
        ))),
    }
}

/// Best-effort human-readable message from an error body
pub(crate) fn error_message(body: &Value) -> Option<String> {
    let candidates = [
        body.pointer("/error/message"),
        body.get("msg"),
        body.get("message"),
        body.get("error"),
        body.get("detail"),
    ];
    candidates
        .into_iter()
        .flatten()
        .find_map(|v| v.as_str().map(str::to_string))
        .filter(|m| !m.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::music::providers::ProviderId;
    use crate::music::test_support::StubServer;
    use serde_json::json;

    #[test]
    fn test_classify_status_taxonomy() {
        assert!(matches!(classify_status(401, "", None), GenerationError::Auth(_)));
        assert!(matches!(classify_status(403, "", None), GenerationError::Auth(_)));
        assert!(matches!(
            classify_status(402, "", None),
            GenerationError::PaymentRequired(_)
        ));
        assert!(matches!(
            classify_status(429, "", Some(Duration::from_secs(7))),
            GenerationError::RateLimited { retry_after: Some(d), .. } if d == Duration::from_secs(7)
        ));
        assert!(matches!(
            classify_status(400, "", None),
            GenerationError::InvalidRequest(_)
        ));
        assert!(matches!(
            classify_status(422, "", None),
            GenerationError::InvalidRequest(_)
        ));
        assert!(matches!(classify_status(404, "", None), GenerationError::NotFound(_)));
        assert!(matches!(
            classify_status(500, "", None),
            GenerationError::ProviderUnavailable(_)
        ));
        assert!(matches!(
            classify_status(503, "", None),
            GenerationError::ProviderUnavailable(_)
        ));
    }

    #[test]
    fn test_classify_envelope() {
        assert_eq!(classify_envelope(&json!({"code": 200, "data": {}}), http_codes), None);
        assert_eq!(classify_envelope(&json!({"data": {}}), http_codes), None);

        let err =
            classify_envelope(&json!({"code": 503, "msg": "overloaded"}), http_codes).unwrap();
        assert!(matches!(err, GenerationError::ProviderUnavailable(_)));
        assert!(err.to_string().contains("overloaded"));
    }

    #[test]
    fn test_envelope_code_outside_u16_is_not_truncated() {
        // 65_937 would wrap to 401 if cast
        let err = classify_envelope(&json!({"code": 65_937, "msg": "odd"}), http_codes).unwrap();
        assert!(matches!(err, GenerationError::ProviderUnavailable(msg) if msg.contains("65937")));
    }

    #[test]
    fn test_envelope_uses_provider_table() {
        fn always_rate_limited(_code: u16, message: String) -> GenerationError {
            GenerationError::RateLimited {
                message,
                retry_after: None,
            }
        }
        let err = classify_envelope(&json!({"code": 430, "msg": "slow down"}), always_rate_limited);
        assert!(matches!(err, Some(GenerationError::RateLimited { .. })));
    }

    #[test]
    fn test_error_message_paths() {
        assert_eq!(
            error_message(&json!({"error": {"message": "bad prompt"}})).as_deref(),
            Some("bad prompt")
        );
        assert_eq!(error_message(&json!({"msg": "nope"})).as_deref(), Some("nope"));
        assert_eq!(error_message(&json!({"code": 500})), None);
    }

    #[tokio::test]
    async fn test_send_json_classifies_http_status() {
        let server = StubServer::start(vec![(
            429,
            r#"{"message": "too many requests"}"#.to_string(),
        )]);
        let http = MusicHttp::new();
        let settings = ProviderSettings::new(ProviderId::PiapiUdio, "k");
        let err = http
            .send_json(http.get(&server.url("/api/v1/task/x"), &settings), http_codes)
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::RateLimited { .. }));
        assert!(err.to_string().contains("too many requests"));
    }

    #[tokio::test]
    async fn test_send_json_rejects_non_json_body() {
        let server = StubServer::start(vec![(200, "<html>gateway</html>".to_string())]);
        let http = MusicHttp::new();
        let settings = ProviderSettings::new(ProviderId::PiapiUdio, "k");
        let err = http
            .send_json(http.get(&server.url("/"), &settings), http_codes)
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::ProviderUnavailable(_)));
    }

    #[tokio::test]
    async fn test_connection_refused_is_unavailable() {
        let http = MusicHttp::new();
        let settings = ProviderSettings::new(ProviderId::PiapiUdio, "k");
        // Port 9 (discard) is essentially never listening on loopback
        let err = http
            .send_json(http.get("http://127.0.0.1:9/", &settings), http_codes)
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::ProviderUnavailable(_)));
    }

    #[tokio::test]
    async fn test_download_audio_returns_bytes() {
        let server = StubServer::start(vec![(200, "ID3-fake-audio".to_string())]);
        let http = MusicHttp::new();
        let bytes = http.download_audio(&server.url("/song.mp3")).await.unwrap();
        assert_eq!(&bytes[..], b"ID3-fake-audio");
    }
}
