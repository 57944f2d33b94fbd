//! HTTP client for the diary server.
//!
//! Every call returns structured data or an [`ApiError`]; turning errors
//! into on-screen text is left to the caller.

use crate::diary_entry::{DiaryEntry, EmotionCandidate};
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

pub const GENERIC_SERVER_ERROR: &str = "서버 오류가 발생했습니다.";
const DELETE_FAILED: &str = "삭제에 실패했습니다.";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("server answered with status {0}")]
    Status(u16),

    #[error("{0}")]
    Server(String),

    #[error("malformed response: {0}")]
    Decode(String),
}

impl ApiError {
    /// Text shown to the user for this failure.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Server(message) => message.clone(),
            ApiError::Status(code) => format!("{GENERIC_SERVER_ERROR} ({code})"),
            ApiError::Network(_) | ApiError::Decode(_) => GENERIC_SERVER_ERROR.to_string(),
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Prediction {
    pub top_emotion: String,
    #[serde(default)]
    pub emoji: String,
    #[serde(default)]
    pub candidates: Vec<EmotionCandidate>,
    #[serde(default)]
    pub recommendation: String,
    #[serde(default)]
    pub top_score: f64,
}

#[derive(Debug, Deserialize)]
struct RecommendReply {
    #[serde(default)]
    recommendation: String,
}

#[derive(Debug, Deserialize)]
struct SaveReply {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    error: Option<String>,
}

/// Either a `{error}` body or the expected payload.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Reply<T> {
    Failure { error: String },
    Success(T),
}

#[derive(Serialize)]
struct DiaryBody<'a> {
    diary: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    emotion: Option<&'a str>,
}

#[async_trait]
pub trait DiaryApi: Send + Sync {
    async fn monthly_counts(&self, year: i32) -> ApiResult<HashMap<u32, u32>>;
    async fn month_diaries(&self, year: i32, month: u32) -> ApiResult<Vec<DiaryEntry>>;
    async fn delete_diary(&self, id: &str) -> ApiResult<()>;
    async fn predict(&self, diary: &str) -> ApiResult<Prediction>;
    async fn recommend(&self, diary: &str, emotion: &str) -> ApiResult<String>;
    async fn save_diary(&self, diary: &str, emotion: &str) -> ApiResult<()>;
    async fn update_nickname(&self, nickname: &str) -> ApiResult<()>;
}

pub struct HttpDiaryApi {
    base_url: String,
    client: Client,
}

impl HttpDiaryApi {
    pub fn new(base_url: &str, timeout: Duration) -> ApiResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .cookie_store(true)
            .build()?;
        Ok(HttpDiaryApi {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl DiaryApi for HttpDiaryApi {
    async fn monthly_counts(&self, year: i32) -> ApiResult<HashMap<u32, u32>> {
        let response = self
            .client
            .get(self.url("/api/diaries/counts"))
            .query(&[("year", year)])
            .send()
            .await?;
        let raw: HashMap<String, u32> = expect_json(response).await?;
        Ok(month_counts_from_labels(raw))
    }

    async fn month_diaries(&self, year: i32, month: u32) -> ApiResult<Vec<DiaryEntry>> {
        tracing::info!(year, month, "fetching diaries");
        let response = self
            .client
            .get(self.url("/api/diaries"))
            .query(&[("year", year.to_string()), ("month", month.to_string())])
            .send()
            .await?;
        let raw: Vec<serde_json::Value> = expect_json(response).await?;
        Ok(entries_from_values(raw))
    }

    async fn delete_diary(&self, id: &str) -> ApiResult<()> {
        let response = self
            .client
            .delete(self.url(&format!("/diary/delete/{id}")))
            .send()
            .await?;
        if response.status().is_success() {
            return Ok(());
        }
        let status = response.status();
        let message = response
            .json::<serde_json::Value>()
            .await
            .ok()
            .and_then(|body| body.get("error").and_then(|e| e.as_str()).map(str::to_owned))
            .unwrap_or_else(|| DELETE_FAILED.to_string());
        tracing::warn!(%status, id, %message, "delete rejected");
        Err(ApiError::Server(message))
    }

    async fn predict(&self, diary: &str) -> ApiResult<Prediction> {
        let response = self
            .client
            .post(self.url("/api/predict"))
            .json(&DiaryBody {
                diary,
                emotion: None,
            })
            .send()
            .await?;
        unwrap_reply(response).await
    }

    async fn recommend(&self, diary: &str, emotion: &str) -> ApiResult<String> {
        let response = self
            .client
            .post(self.url("/api/recommend"))
            .json(&DiaryBody {
                diary,
                emotion: Some(emotion),
            })
            .send()
            .await?;
        let reply: RecommendReply = unwrap_reply(response).await?;
        Ok(reply.recommendation)
    }

    async fn save_diary(&self, diary: &str, emotion: &str) -> ApiResult<()> {
        let response = self
            .client
            .post(self.url("/diary/save"))
            .form(&[("diary", diary), ("emotion", emotion)])
            .send()
            .await?;
        let reply: SaveReply = response
            .json()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))?;
        if reply.success {
            Ok(())
        } else {
            Err(ApiError::Server(
                reply.error.unwrap_or_else(|| GENERIC_SERVER_ERROR.to_string()),
            ))
        }
    }

    async fn update_nickname(&self, nickname: &str) -> ApiResult<()> {
        let response = self
            .client
            .post(self.url("/update_nickname"))
            .form(&[("nickname", nickname)])
            .send()
            .await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(ApiError::Status(response.status().as_u16()))
        }
    }
}

async fn expect_json<T: serde::de::DeserializeOwned>(response: Response) -> ApiResult<T> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        tracing::error!(%status, %body, "request rejected");
        return Err(status_error(status, &body));
    }
    response
        .json()
        .await
        .map_err(|e| ApiError::Decode(e.to_string()))
}

async fn unwrap_reply<T: serde::de::DeserializeOwned>(response: Response) -> ApiResult<T> {
    let status = response.status();
    let body = response.text().await?;
    match serde_json::from_str::<Reply<T>>(&body) {
        Ok(Reply::Failure { error }) => Err(ApiError::Server(error)),
        Ok(Reply::Success(value)) if status.is_success() => Ok(value),
        Ok(Reply::Success(_)) => Err(ApiError::Status(status.as_u16())),
        Err(e) if status.is_success() => Err(ApiError::Decode(e.to_string())),
        Err(_) => Err(ApiError::Status(status.as_u16())),
    }
}

fn status_error(status: StatusCode, body: &str) -> ApiError {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_owned))
        .map(ApiError::Server)
        .unwrap_or(ApiError::Status(status.as_u16()))
}

/// Counts arrive keyed by month label ("1".."12").
fn month_counts_from_labels(raw: HashMap<String, u32>) -> HashMap<u32, u32> {
    raw.into_iter()
        .filter_map(|(label, count)| match label.trim().parse::<u32>() {
            Ok(month) if (1..=12).contains(&month) => Some((month, count)),
            _ => {
                tracing::warn!(%label, "ignoring count with unexpected month label");
                None
            }
        })
        .collect()
}

/// Keeps every well-formed entry; malformed items are logged and skipped.
pub fn entries_from_values(raw: Vec<serde_json::Value>) -> Vec<DiaryEntry> {
    raw.into_iter()
        .filter_map(|value| match serde_json::from_value::<DiaryEntry>(value.clone()) {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!(error = %e, item = %value, "skipping malformed diary item");
                None
            }
        })
        .collect()
}
