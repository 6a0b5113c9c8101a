//! Test doubles: a scripted adapter and a loopback HTTP stub

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::time::Instant;

use super::adapter::ProviderAdapter;
use super::error::GenerationError;
use super::providers::ProviderId;
use super::types::{GenerationRequest, ProviderJob, RawStatusPayload};

/// Adapter that replays canned submit and status results
pub(crate) struct ScriptedAdapter {
    provider: ProviderId,
    submit: Mutex<Option<Result<String, GenerationError>>>,
    statuses: Mutex<VecDeque<Result<Value, GenerationError>>>,
    /// Returned once the script runs out
    fallback: Result<Value, GenerationError>,
    submit_calls: AtomicU32,
    status_calls: AtomicU32,
    status_times: Mutex<Vec<Instant>>,
}

impl ScriptedAdapter {
    pub fn new(statuses: Vec<Result<Value, GenerationError>>) -> Self {
        Self {
            provider: ProviderId::PiapiUdio,
            submit: Mutex::new(Some(Ok("task-1".to_string()))),
            statuses: Mutex::new(statuses.into()),
            fallback: Ok(serde_json::json!({"data": {"status": "processing"}})),
            submit_calls: AtomicU32::new(0),
            status_calls: AtomicU32::new(0),
            status_times: Mutex::new(Vec::new()),
        }
    }

    pub fn with_submit_error(self, err: GenerationError) -> Self {
        *self.submit.lock().unwrap() = Some(Err(err));
        self
    }

    pub fn with_fallback(mut self, fallback: Result<Value, GenerationError>) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn status_calls(&self) -> u32 {
        self.status_calls.load(Ordering::SeqCst)
    }

    pub fn submit_calls(&self) -> u32 {
        self.submit_calls.load(Ordering::SeqCst)
    }

    /// Time between consecutive status checks
    pub fn status_gaps(&self) -> Vec<Duration> {
        let times = self.status_times.lock().unwrap();
        times.windows(2).map(|w| w[1] - w[0]).collect()
    }
}

#[async_trait]
impl ProviderAdapter for ScriptedAdapter {
    fn provider_id(&self) -> ProviderId {
        self.provider
    }

    async fn submit(&self, request: &GenerationRequest) -> Result<ProviderJob, GenerationError> {
        request.validate()?;
        self.submit_calls.fetch_add(1, Ordering::SeqCst);
        let scripted = self
            .submit
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| Ok("task-1".to_string()));
        scripted.map(|id| ProviderJob::new(self.provider, id))
    }

    async fn fetch_status(&self, _job: &ProviderJob) -> Result<RawStatusPayload, GenerationError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        self.status_times.lock().unwrap().push(Instant::now());
        let next = self
            .statuses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());
        next.map(|body| RawStatusPayload::new(self.provider, body))
    }
}

/// One canned HTTP response
pub(crate) struct StubResponse {
    pub status: u16,
    pub body: String,
    pub headers: Vec<(String, String)>,
}

impl StubResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            headers: Vec::new(),
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }
}

impl From<(u16, String)> for StubResponse {
    fn from((status, body): (u16, String)) -> Self {
        Self::new(status, body)
    }
}

/// A request the stub received
#[derive(Debug, Clone)]
pub(crate) struct RecordedRequest {
    pub method: String,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        let name = name.to_lowercase();
        self.headers
            .iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn json(&self) -> Value {
        serde_json::from_str(&self.body).unwrap_or(Value::Null)
    }
}

/// Loopback HTTP server answering requests with a fixed script, in order
pub(crate) struct StubServer {
    base_url: String,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl StubServer {
    pub fn start<R: Into<StubResponse>>(responses: Vec<R>) -> Self {
        let server = tiny_http::Server::http("127.0.0.1:0").expect("Failed to bind stub server");
        let port = server
            .server_addr()
            .to_ip()
            .expect("Stub server has no IP address")
            .port();
        let responses: Vec<StubResponse> = responses.into_iter().map(Into::into).collect();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&requests);

        thread::spawn(move || {
            for canned in responses {
                let mut request = match server.recv() {
                    Ok(request) => request,
                    Err(_) => return,
                };

                let mut body = String::new();
                let _ = request.as_reader().read_to_string(&mut body);
                recorded.lock().unwrap().push(RecordedRequest {
                    method: request.method().to_string(),
                    url: request.url().to_string(),
                    headers: request
                        .headers()
                        .iter()
                        .map(|h| {
                            (
                                h.field.as_str().as_str().to_lowercase(),
                                h.value.as_str().to_string(),
                            )
                        })
                        .collect(),
                    body,
                });

                let mut response = tiny_http::Response::from_string(canned.body)
                    .with_status_code(canned.status);
                if let Ok(header) =
                    tiny_http::Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..])
                {
                    response = response.with_header(header);
                }
                for (name, value) in &canned.headers {
                    if let Ok(header) =
                        tiny_http::Header::from_bytes(name.as_bytes(), value.as_bytes())
                    {
                        response = response.with_header(header);
                    }
                }
                let _ = request.respond(response);
            }
        });

        Self {
            base_url: format!("http://127.0.0.1:{}", port),
            requests,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }
}
