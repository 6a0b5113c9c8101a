//! sunoapi.org adapter
//!
//! Bearer-token JSON API. Submission goes to `/api/v1/generate`, status to
//! `/api/v1/generate/record-info?taskId=...`. Both wrap results in a
//! `{"code", "msg", "data"}` envelope whose codes follow sunoapi.org's own
//! table rather than HTTP meanings.

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, info};

use super::{require_task_id, ProviderAdapter};
use crate::constants::providers as defaults;
use crate::music::client::{classify_status, MusicHttp};
use crate::music::config::ProviderSettings;
use crate::music::error::GenerationError;
use crate::music::providers::ProviderId;
use crate::music::types::{GenerationRequest, ProviderJob, RawStatusPayload};

const TASK_ID_POINTERS: &[&str] = &["/data/taskId", "/data/task_id"];

/// sunoapi.org envelope codes
pub(crate) fn classify_code(code: u16, message: String) -> GenerationError {
    let detail = if message.trim().is_empty() {
        format!("code {}", code)
    } else {
        format!("code {}: {}", code, message)
    };
    match code {
        // 429 is "insufficient credits" here, not throttling
        429 => GenerationError::PaymentRequired(detail),
        405 | 430 => GenerationError::RateLimited {
            message: detail,
            retry_after: None,
        },
        455 => GenerationError::ProviderUnavailable(detail),
        400 | 413 => GenerationError::InvalidRequest(detail),
        _ => classify_status(code, message, None),
    }
}

pub struct SunoApiAdapter {
    settings: ProviderSettings,
    http: MusicHttp,
}

impl SunoApiAdapter {
    pub fn new(settings: ProviderSettings, http: MusicHttp) -> Self {
        Self { settings, http }
    }

    fn generate_url(&self) -> String {
        format!("{}/api/v1/generate", self.settings.base())
    }

    fn record_info_url(&self, task_id: &str) -> Result<String, GenerationError> {
        let url = url::Url::parse_with_params(
            &format!("{}/api/v1/generate/record-info", self.settings.base()),
            &[("taskId", task_id)],
        )
        .map_err(|e| GenerationError::Config(format!("invalid status URL: {}", e)))?;
        Ok(url.to_string())
    }

    /// Request body for `/api/v1/generate`
    pub(crate) fn build_body(&self, request: &GenerationRequest) -> Value {
        let prompt = match request.custom_lyrics() {
            Some(lyrics) => format!("{}\n\nLyrics:\n{}", request.prompt, lyrics),
            None => request.prompt.clone(),
        };

        let mut style = request
            .style
            .clone()
            .unwrap_or_else(|| defaults::DEFAULT_STYLE.to_string());
        if let Some(params) = &request.music_parameters {
            for fragment in params.tag_fragments() {
                style.push_str(", ");
                style.push_str(&fragment);
            }
        }

        let mut body = json!({
            "prompt": prompt,
            "model": self.settings.model,
            "customMode": request.custom_mode,
            "instrumental": request.instrumental,
            "style": style,
            "title": request.title.as_deref().unwrap_or(defaults::DEFAULT_TITLE),
        });
        if let Some(callback) = &self.settings.callback_url {
            body["callBackUrl"] = json!(callback);
        }
        body
    }
}

#[async_trait]
impl ProviderAdapter for SunoApiAdapter {
    fn provider_id(&self) -> ProviderId {
        ProviderId::SunoApi
    }

    async fn submit(&self, request: &GenerationRequest) -> Result<ProviderJob, GenerationError> {
        request.validate()?;
        let body = self.build_body(request);
        debug!(request = %body, "sunoapi.org request");

        let response = self
            .http
            .send_json(
                self.http.post_json(&self.generate_url(), &self.settings, &body),
                classify_code,
            )
            .await?;
        let task_id = require_task_id(ProviderId::SunoApi, &response, TASK_ID_POINTERS)?;

        info!(task_id = %task_id, model = %self.settings.model, "sunoapi.org generation initiated");
        Ok(ProviderJob::new(ProviderId::SunoApi, task_id))
    }

    async fn fetch_status(&self, job: &ProviderJob) -> Result<RawStatusPayload, GenerationError> {
        let url = self.record_info_url(&job.external_task_id)?;
        let body = self
            .http
            .send_json(self.http.get(&url, &self.settings), classify_code)
            .await
            .map_err(|e| match e {
                GenerationError::NotFound(msg) => GenerationError::NotFound(format!(
                    "task {}: {}",
                    job.external_task_id, msg
                )),
                other => other,
            })?;
        Ok(RawStatusPayload::new(ProviderId::SunoApi, body))
    }
}
