use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone};
use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiaryEntry {
    #[serde(deserialize_with = "id_from_string_or_number")]
    pub id: String,
    pub date: NaiveDate,
    #[serde(rename = "createdAt", deserialize_with = "timestamp_from_server")]
    pub created_at: DateTime<Local>,
    pub content: String,
    /// Empty when the server sent none; drawn with the default glyph.
    #[serde(default, deserialize_with = "string_or_null")]
    pub emotion: String,
    #[serde(default)]
    pub recommendation: Option<String>,
}

impl DiaryEntry {
    pub fn time_label(&self) -> String {
        self.created_at.format("%H:%M").to_string()
    }

    pub fn first_line(&self) -> &str {
        self.content.lines().next().unwrap_or("")
    }

    pub fn has_recommendation(&self) -> bool {
        self.recommendation
            .as_deref()
            .is_some_and(|r| !r.trim().is_empty())
    }
}

/// One ranked emotion returned by the prediction endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionCandidate {
    pub emotion: String,
    #[serde(default)]
    pub emoji: String,
    pub score: f64,
}

impl EmotionCandidate {
    pub fn percent(&self) -> u32 {
        (self.score * 100.0).round().clamp(0.0, 100.0) as u32
    }
}

fn id_from_string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(i64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(s) => s,
        RawId::Number(n) => n.to_string(),
    })
}

fn string_or_null<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

fn timestamp_from_server<'de, D>(deserializer: D) -> Result<DateTime<Local>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("unrecognised timestamp `{raw}`")))
}

/// Accepts RFC 3339 or a naive ISO timestamp, the latter read as local time.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Local>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Local));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .and_then(|naive| Local.from_local_datetime(&naive).earliest())
}
