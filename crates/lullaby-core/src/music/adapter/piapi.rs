//! PiAPI adapters
//!
//! PiAPI fronts several music models with `X-API-Key` auth. Udio jobs are
//! created through the unified task endpoint, Suno jobs through the Suno
//! music endpoint; both are polled at `/api/v1/task/{task_id}`.

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, info};

use super::{require_task_id, ProviderAdapter};
use crate::constants::providers as defaults;
use crate::music::client::{http_codes, MusicHttp};
use crate::music::config::ProviderSettings;
use crate::music::error::GenerationError;
use crate::music::providers::ProviderId;
use crate::music::types::{GenerationRequest, ProviderJob, RawStatusPayload};

const TASK_ID_POINTERS: &[&str] = &["/data/task_id", "/data/data/task_id", "/task_id"];

/// Plumbing shared by both PiAPI models
struct PiapiClient {
    settings: ProviderSettings,
    http: MusicHttp,
}

impl PiapiClient {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.settings.base(), path)
    }

    fn task_url(&self, task_id: &str) -> Result<String, GenerationError> {
        let mut url = url::Url::parse(&self.url("/api/v1/task"))
            .map_err(|e| GenerationError::Config(format!("invalid status URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| GenerationError::Config("base URL cannot carry a path".to_string()))?
            .push(task_id);
        Ok(url.to_string())
    }

    async fn submit(
        &self,
        provider: ProviderId,
        path: &str,
        body: &Value,
    ) -> Result<ProviderJob, GenerationError> {
        debug!(%provider, request = %body, "PiAPI request");
        let response = self
            .http
            .send_json(
                self.http.post_json(&self.url(path), &self.settings, body),
                http_codes,
            )
            .await?;
        let task_id = require_task_id(provider, &response, TASK_ID_POINTERS)?;

        info!(
            %provider,
            task_id = %task_id,
            model = %self.settings.model,
            "PiAPI generation initiated"
        );
        Ok(ProviderJob::new(provider, task_id))
    }

    async fn fetch_status(&self, job: &ProviderJob) -> Result<RawStatusPayload, GenerationError> {
        let url = self.task_url(&job.external_task_id)?;
        let body = self
            .http
            .send_json(self.http.get(&url, &self.settings), http_codes)
            .await
            .map_err(|e| match e {
                GenerationError::NotFound(msg) => GenerationError::NotFound(format!(
                    "task {}: {}",
                    job.external_task_id, msg
                )),
                other => other,
            })?;
        Ok(RawStatusPayload::new(job.provider, body))
    }
}

/// Udio (`music-u`) through the PiAPI unified task API
pub struct PiapiUdioAdapter {
    client: PiapiClient,
}

impl PiapiUdioAdapter {
    pub fn new(settings: ProviderSettings, http: MusicHttp) -> Self {
        Self {
            client: PiapiClient { settings, http },
        }
    }

    /// Request body for `POST /api/v1/task`
    pub(crate) fn build_body(&self, request: &GenerationRequest) -> Value {
        let mut description = request.prompt.clone();
        if let Some(style) = request.style.as_deref().filter(|s| !s.is_empty()) {
            description = format!("{}, {}", description, style);
        }
        if let Some(extra) = request.music_parameters.as_ref().and_then(|p| p.describe()) {
            description = format!("{}. {}", description, extra);
        }

        let lyrics = request.custom_lyrics();
        let lyrics_type = if request.instrumental {
            "instrumental"
        } else if lyrics.is_some() {
            "user"
        } else {
            "generate"
        };

        let mut input = json!({
            "gpt_description_prompt": description,
            "lyrics_type": lyrics_type,
            "negative_tags": "",
            "seed": -1,
        });
        if let Some(lyrics) = lyrics.filter(|_| !request.instrumental) {
            input["lyrics"] = json!(lyrics);
        }
        if let Some(title) = request.title.as_deref().filter(|t| !t.is_empty()) {
            input["title"] = json!(title);
        }

        json!({
            "model": self.client.settings.model,
            "task_type": "generate_music",
            "input": input,
            "config": {"service_mode": "public"},
        })
    }
}

#[async_trait]
impl ProviderAdapter for PiapiUdioAdapter {
    fn provider_id(&self) -> ProviderId {
        ProviderId::PiapiUdio
    }

    async fn submit(&self, request: &GenerationRequest) -> Result<ProviderJob, GenerationError> {
        request.validate()?;
        let body = self.build_body(request);
        self.client
            .submit(ProviderId::PiapiUdio, "/api/v1/task", &body)
            .await
    }

    async fn fetch_status(&self, job: &ProviderJob) -> Result<RawStatusPayload, GenerationError> {
        self.client.fetch_status(job).await
    }
}

/// Suno (`chirp-*`) through PiAPI
pub struct PiapiSunoAdapter {
    client: PiapiClient,
}

impl PiapiSunoAdapter {
    pub fn new(settings: ProviderSettings, http: MusicHttp) -> Self {
        Self {
            client: PiapiClient { settings, http },
        }
    }

    /// Request body for `POST /api/suno/v1/music`
    pub(crate) fn build_body(&self, request: &GenerationRequest) -> Value {
        let mut tags = request
            .style
            .clone()
            .unwrap_or_else(|| defaults::DEFAULT_STYLE.to_string());
        if let Some(params) = &request.music_parameters {
            for fragment in params.tag_fragments() {
                tags.push_str(", ");
                tags.push_str(&fragment);
            }
        }

        // In custom mode Suno sings the prompt, so lyrics take its place
        let prompt = request.custom_lyrics().unwrap_or(&request.prompt);

        json!({
            "custom_mode": request.custom_mode,
            "mv": self.client.settings.model,
            "input": {
                "prompt": prompt,
                "title": request.title.as_deref().unwrap_or(defaults::DEFAULT_TITLE),
                "tags": tags,
                "make_instrumental": request.instrumental,
            },
        })
    }
}

#[async_trait]
impl ProviderAdapter for PiapiSunoAdapter {
    fn provider_id(&self) -> ProviderId {
        ProviderId::PiapiSuno
    }

    async fn submit(&self, request: &GenerationRequest) -> Result<ProviderJob, GenerationError> {
        request.validate()?;
        let body = self.build_body(request);
        self.client
            .submit(ProviderId::PiapiSuno, "/api/suno/v1/music", &body)
            .await
    }

    async fn fetch_status(&self, job: &ProviderJob) -> Result<RawStatusPayload, GenerationError> {
        self.client.fetch_status(job).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::music::test_support::{StubResponse, StubServer};
    use crate::music::types::MusicParameters;

    fn settings(provider: ProviderId, server: &StubServer) -> ProviderSettings {
        ProviderSettings::new(provider, "pi-key").with_base_url(server.base_url())
    }

    #[test]
    fn test_udio_body_with_user_lyrics() {
        let adapter = PiapiUdioAdapter::new(
            ProviderSettings::new(ProviderId::PiapiUdio, "k"),
            MusicHttp::new(),
        );
        let request = GenerationRequest::new("lullaby, piano, gentle")
            .with_title("Goodnight Sam")
            .with_lyrics("Sleep now Sam")
            .with_music_parameters(MusicParameters {
                bpm: Some(60),
                ..Default::default()
            });

        let body = adapter.build_body(&request);
        assert_eq!(body["model"], "music-u");
        assert_eq!(body["task_type"], "generate_music");
        assert_eq!(body["input"]["lyrics_type"], "user");
        assert_eq!(body["input"]["lyrics"], "Sleep now Sam");
        assert_eq!(body["input"]["title"], "Goodnight Sam");
        assert_eq!(body["input"]["seed"], -1);
        assert_eq!(
            body["input"]["gpt_description_prompt"],
            "lullaby, piano, gentle. Musical characteristics: 60 BPM"
        );
        assert_eq!(body["config"]["service_mode"], "public");
    }

    #[test]
    fn test_udio_body_generated_and_instrumental() {
        let adapter = PiapiUdioAdapter::new(
            ProviderSettings::new(ProviderId::PiapiUdio, "k"),
            MusicHttp::new(),
        );
        let body = adapter.build_body(&GenerationRequest::new("rain"));
        assert_eq!(body["input"]["lyrics_type"], "generate");
        assert!(body["input"].get("lyrics").is_none());
        assert!(body["input"].get("title").is_none());

        let body = adapter.build_body(
            &GenerationRequest::new("rain")
                .with_lyrics("ignored")
                .with_instrumental(true),
        );
        assert_eq!(body["input"]["lyrics_type"], "instrumental");
        assert!(body["input"].get("lyrics").is_none());
    }

    #[test]
    fn test_suno_body_uses_lyrics_as_prompt() {
        let adapter = PiapiSunoAdapter::new(
            ProviderSettings::new(ProviderId::PiapiSuno, "k"),
            MusicHttp::new(),
        );
        let body = adapter.build_body(
            &GenerationRequest::new("a bedtime song")
                .with_lyrics("Twinkle twinkle")
                .with_style("soft"),
        );
        assert_eq!(body["mv"], "chirp-v3-5");
        assert_eq!(body["custom_mode"], true);
        assert_eq!(body["input"]["prompt"], "Twinkle twinkle");
        assert_eq!(body["input"]["tags"], "soft");
        assert_eq!(body["input"]["title"], "Untitled Song");
    }

    #[tokio::test]
    async fn test_udio_submit_and_status() {
        let server = StubServer::start(vec![
            StubResponse::new(200, r#"{"code": 200, "data": {"task_id": "udio-9"}}"#),
            StubResponse::new(200, r#"{"code": 200, "data": {"status": "processing"}}"#),
        ]);
        let adapter = PiapiUdioAdapter::new(
            settings(ProviderId::PiapiUdio, &server),
            MusicHttp::new(),
        );

        let job = adapter.submit(&GenerationRequest::new("ocean waves")).await.unwrap();
        assert_eq!(job.external_task_id, "udio-9");
        let raw = adapter.fetch_status(&job).await.unwrap();
        assert_eq!(raw.provider, ProviderId::PiapiUdio);

        let requests = server.requests();
        assert_eq!(requests[0].url, "/api/v1/task");
        assert_eq!(requests[0].header("x-api-key"), Some("pi-key"));
        assert_eq!(requests[0].header("authorization"), None);
        assert_eq!(requests[1].method, "GET");
        assert_eq!(requests[1].url, "/api/v1/task/udio-9");
    }

    #[tokio::test]
    async fn test_suno_submit_endpoint() {
        let server = StubServer::start(vec![StubResponse::new(
            200,
            r#"{"code": 200, "data": {"task_id": "chirp-1"}}"#,
        )]);
        let adapter = PiapiSunoAdapter::new(
            settings(ProviderId::PiapiSuno, &server),
            MusicHttp::new(),
        );
        let job = adapter.submit(&GenerationRequest::new("stars")).await.unwrap();
        assert_eq!(job.provider, ProviderId::PiapiSuno);
        assert_eq!(server.requests()[0].url, "/api/suno/v1/music");
    }

    #[tokio::test]
    async fn test_rate_limit_carries_retry_after() {
        let server = StubServer::start(vec![
            StubResponse::new(429, "{}").with_header("Retry-After", "12")
        ]);
        let adapter = PiapiUdioAdapter::new(
            settings(ProviderId::PiapiUdio, &server),
            MusicHttp::new(),
        );
        let job = ProviderJob::new(ProviderId::PiapiUdio, "t");
        let err = adapter.fetch_status(&job).await.unwrap_err();
        assert_eq!(
            err,
            GenerationError::RateLimited {
                message: "HTTP 429".into(),
                retry_after: Some(std::time::Duration::from_secs(12)),
            }
        );
    }

    #[tokio::test]
    async fn test_unprocessable_submission() {
        let server = StubServer::start(vec![StubResponse::new(
            422,
            r#"{"error": {"message": "prompt too long"}}"#,
        )]);
        let adapter = PiapiUdioAdapter::new(
            settings(ProviderId::PiapiUdio, &server),
            MusicHttp::new(),
        );
        let err = adapter.submit(&GenerationRequest::new("x")).await.unwrap_err();
        assert_eq!(
            err,
            GenerationError::InvalidRequest("HTTP 422: prompt too long".into())
        );
    }

    #[tokio::test]
    async fn test_server_error_is_unavailable() {
        let server = StubServer::start(vec![StubResponse::new(503, "")]);
        let adapter = PiapiSunoAdapter::new(
            settings(ProviderId::PiapiSuno, &server),
            MusicHttp::new(),
        );
        let job = ProviderJob::new(ProviderId::PiapiSuno, "t");
        let err = adapter.fetch_status(&job).await.unwrap_err();
        assert!(matches!(err, GenerationError::ProviderUnavailable(_)));
    }
}
