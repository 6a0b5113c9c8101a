//! Status payload normalization
//!
//! Maps the provider-specific status bodies onto [`JobStatus`] plus an
//! optional [`NormalizedSong`]. Observed shapes:
//!
//! - sunoapi.org: `data.status`, songs in `data.response.sunoData[]`
//!   (older payloads use `data.response.data[]`, sometimes as a JSON string)
//! - PiAPI Udio: `data.status`, songs in `data.output.songs[]`
//! - PiAPI Suno: `data.status`, songs in `data.output.clips[]` with details
//!   under `metadata`
//! - flat bodies where the song fields sit next to `status`
//!
//! Missing fields are never an error; they just stay `None`.

use serde_json::Value;

use super::types::{FailureReason, JobStatus, NormalizedSong, RawStatusPayload};

const AUDIO_KEYS: &[&str] = &[
    "audio_url",
    "audioUrl",
    "song_path",
    "stream_audio_url",
    "streamAudioUrl",
];
const IMAGE_KEYS: &[&str] = &["image_url", "imageUrl", "image_path", "imagePath"];
const LYRICS_KEYS: &[&str] = &["lyrics", "lyric", "prompt"];
const ERROR_KEYS: &[&str] = &["/error/message", "/errorMessage", "/error_message", "/error"];
/// Generic message fields; on an envelope they only carry errors when `code` is not 2xx
const MESSAGE_KEYS: &[&str] = &["/msg", "/message"];

/// Result of normalizing one status payload
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    pub status: JobStatus,
    /// Present only when `status` is `Completed`
    pub song: Option<NormalizedSong>,
}

/// Normalize a raw payload. Pure; calling it twice yields the same output.
pub fn normalize(raw: &RawStatusPayload) -> Normalized {
    normalize_body(&raw.body)
}

/// Normalize a status body regardless of which provider produced it
pub fn normalize_body(body: &Value) -> Normalized {
    let data = task_data(body);
    let status = match status_string(data, body) {
        Some(s) => map_status(&s, || failure_message(data, body)),
        None => JobStatus::Pending,
    };

    let song = match status {
        JobStatus::Completed => Some(extract_song(data, body)),
        _ => None,
    };

    Normalized { status, song }
}

/// Map a provider status string onto the lifecycle.
///
/// Case-insensitive; unknown values are treated as still in flight.
pub fn map_status<F>(raw: &str, failure_message: F) -> JobStatus
where
    F: FnOnce() -> Option<String>,
{
    match raw.trim().to_lowercase().as_str() {
        "completed" | "complete" | "succeeded" | "success" | "finished" | "done" => {
            JobStatus::Completed
        }
        "failed" | "failure" | "error" | "create_task_failed" | "generate_audio_failed"
        | "callback_exception" | "sensitive_word_error" => {
            let reason = failure_message().unwrap_or_else(|| raw.trim().to_string());
            JobStatus::Failed(FailureReason::ProviderReported(reason))
        }
        "pending" | "queued" | "staged" | "submitted" | "created" | "waiting" | "" => {
            JobStatus::Pending
        }
        _ => JobStatus::Processing,
    }
}

/// The object carrying task state: `data` when it is an object, else the body
fn task_data(body: &Value) -> &Value {
    match body.get("data") {
        Some(data) if data.is_object() => match data.get("data") {
            // Some gateways double-wrap: {"data": {"data": {...}}}
            Some(inner) if inner.is_object() && inner.get("status").is_some() => inner,
            _ => data,
        },
        _ => body,
    }
}

fn status_string(data: &Value, body: &Value) -> Option<String> {
    data.get("status")
        .or_else(|| body.get("status"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn failure_message(data: &Value, body: &Value) -> Option<String> {
    let nested = !std::ptr::eq(data, body);
    let from_data = nested
        .then(|| text_at(data, ERROR_KEYS).or_else(|| text_at(data, MESSAGE_KEYS)))
        .flatten();
    from_data
        .or_else(|| text_at(body, ERROR_KEYS))
        .or_else(|| {
            envelope_reports_error(body)
                .then(|| text_at(body, MESSAGE_KEYS))
                .flatten()
        })
}

fn text_at(value: &Value, pointers: &[&str]) -> Option<String> {
    pointers
        .iter()
        .filter_map(|p| value.pointer(p))
        .find_map(Value::as_str)
        .filter(|m| !m.trim().is_empty())
        .map(str::to_string)
}

/// A body without `code` is not an envelope, so its message belongs to the job
fn envelope_reports_error(body: &Value) -> bool {
    match body.get("code").and_then(Value::as_u64) {
        Some(code) => !(200..300).contains(&code),
        None => true,
    }
}

/// Locate the first song-like object among the known nestings
fn song_candidate(data: &Value) -> Option<Value> {
    if let Some(response) = data.get("response") {
        // The response may arrive JSON-encoded as a string
        let response = match response {
            Value::String(s) => serde_json::from_str::<Value>(s).ok()?,
            other => other.clone(),
        };
        for key in ["sunoData", "data"] {
            if let Some(first) = response.get(key).and_then(Value::as_array).and_then(|a| a.first())
            {
                return Some(first.clone());
            }
        }
    }

    if let Some(output) = data.get("output").filter(|o| o.is_object()) {
        if let Some(songs) = output.get("songs").and_then(Value::as_array) {
            let finished = songs
                .iter()
                .find(|s| s.get("finished").and_then(Value::as_bool) == Some(true));
            if let Some(song) = finished.or_else(|| songs.first()) {
                return Some(song.clone());
            }
        }
        if let Some(first) = output.get("clips").and_then(first_clip) {
            return Some(first.clone());
        }
        if has_any(output, AUDIO_KEYS) {
            return Some(output.clone());
        }
    }

    None
}

/// PiAPI returns clips either as an array or as an id-keyed object
fn first_clip(clips: &Value) -> Option<&Value> {
    match clips {
        Value::Array(items) => items.first(),
        Value::Object(map) => map.values().next(),
        _ => None,
    }
}

fn extract_song(data: &Value, body: &Value) -> NormalizedSong {
    let song = song_candidate(data)
        .or_else(|| has_any(data, AUDIO_KEYS).then(|| data.clone()))
        .or_else(|| has_any(body, AUDIO_KEYS).then(|| body.clone()))
        .unwrap_or(Value::Null);
    let metadata = song.get("metadata").cloned().unwrap_or(Value::Null);
    let sources = [&song, &metadata];

    NormalizedSong {
        audio_url: first_string(&sources, AUDIO_KEYS),
        title: first_string(&sources, &["title"]),
        duration_seconds: sources.iter().find_map(|v| v.get("duration").and_then(duration)),
        lyrics: first_string(&sources, LYRICS_KEYS),
        image_url: first_string(&sources, IMAGE_KEYS),
        tags: sources.iter().find_map(|v| v.get("tags").and_then(tags)),
    }
}

fn has_any(value: &Value, keys: &[&str]) -> bool {
    keys.iter()
        .any(|k| value.get(k).and_then(Value::as_str).is_some_and(|s| !s.is_empty()))
}

fn first_string(sources: &[&Value], keys: &[&str]) -> Option<String> {
    sources.iter().find_map(|v| {
        keys.iter()
            .filter_map(|k| v.get(k))
            .find_map(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    })
}

/// Non-negative seconds from a number or numeric string
fn duration(value: &Value) -> Option<f64> {
    let secs = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    (secs.is_finite() && secs >= 0.0).then_some(secs)
}

fn tags(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Array(items) => {
            let joined = items
                .iter()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join(", ");
            (!joined.is_empty()).then_some(joined)
        }
        _ => None,
    }
}
