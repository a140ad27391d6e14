//! Client for the public alquran.cloud text API.

use std::time::Duration;

use axum::{Json, extract::State};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::ApiError;
use crate::extract::ApiPath;
use crate::state::AppState;

const JUZ_COUNT: i64 = 30;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const BISMILLAH: &str = "بِسْمِ اللَّهِ الرَّحْمَنِ الرَّحِيمِ";

/// One verse as returned upstream. Unknown fields pass through untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ayah {
    pub text: String,
    #[serde(rename = "numberInSurah")]
    pub number_in_surah: u32,
    pub surah: AyahSurah,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AyahSurah {
    pub name: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Serialize)]
pub struct JuzTextResponse {
    pub juz_number: u8,
    pub text: String,
    pub ayahs: Vec<Ayah>,
}

pub struct QuranClient {
    http: reqwest::Client,
    base_url: String,
}

impl QuranClient {
    pub fn new(base_url: impl Into<String>) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
        })
    }

    /// Ayahs of a juz in the Uthmani script.
    pub async fn fetch_juz(&self, juz: u8) -> Result<Vec<Ayah>, ApiError> {
        let url = format!("{}/juz/{}/quran-uthmani", self.base_url, juz);
        debug!("Fetching {}", url);

        let response = self
            .http
            .get(&url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| {
                warn!("Quran API unreachable: {}", e);
                ApiError::Upstream(format!("Network error when connecting to Quran API: {}", e))
            })?;

        let status = response.status();
        if status != StatusCode::OK {
            warn!("Quran API answered {} for juz {}", status, juz);
            return Err(ApiError::Upstream(format!(
                "Failed to fetch Juz text from Quran API: {}",
                status.as_u16()
            )));
        }

        let body = response.bytes().await.map_err(|e| {
            ApiError::Upstream(format!("Network error when connecting to Quran API: {}", e))
        })?;
        let payload: Value = serde_json::from_slice(&body)
            .map_err(|_| ApiError::Upstream("Invalid JSON response from Quran API".into()))?;

        parse_juz(payload).ok_or_else(|| {
            warn!("Unexpected Quran API payload for juz {}", juz);
            ApiError::Upstream("Invalid response format from Quran API".into())
        })
    }
}

/// Ayahs out of an `{"code": 200, "data": {"ayahs": [...]}}` envelope.
fn parse_juz(mut payload: Value) -> Option<Vec<Ayah>> {
    if payload.get("code").and_then(Value::as_i64) != Some(200) {
        return None;
    }
    let ayahs = payload.get_mut("data")?.get_mut("ayahs")?.take();
    serde_json::from_value(ayahs).ok()
}

/// Markdown-ish reading text: a bismillah header, then each surah's verses
/// under its own heading.
pub fn format_juz_text(juz: u8, ayahs: &[Ayah]) -> String {
    let mut text = format!("# {}\n\n# Juz {}\n\n", BISMILLAH, juz);
    let mut current_surah: Option<&str> = None;

    for ayah in ayahs {
        if current_surah != Some(ayah.surah.name.as_str()) {
            current_surah = Some(&ayah.surah.name);
            text.push_str(&format!("\n## {}\n\n", ayah.surah.name));
        }
        text.push_str(&format!("{} ({})\n\n", ayah.text, ayah.number_in_surah));
    }
    text
}

/// GET /juz/{n}/text/
pub async fn get_juz_text(
    State(state): State<AppState>,
    ApiPath(juz): ApiPath<i64>,
) -> Result<Json<JuzTextResponse>, ApiError> {
    let juz = u8::try_from(juz)
        .ok()
        .filter(|n| (1..=JUZ_COUNT).contains(&i64::from(*n)))
        .ok_or_else(|| ApiError::validation("Invalid Juz number. Must be between 1 and 30."))?;

    let ayahs = state.quran.fetch_juz(juz).await?;
    Ok(Json(JuzTextResponse {
        juz_number: juz,
        text: format_juz_text(juz, &ayahs),
        ayahs,
    }))
}
