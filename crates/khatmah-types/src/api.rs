use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::models::{CalendarData, KhatmahType, MoonSightingData};

fn default_true() -> bool {
    true
}

/// Distinguishes "field absent" (`None`) from "field set to null" (`Some(None)`).
fn nullable<'de, D, T>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(de).map(Some)
}

// -- Khatmahs --

#[derive(Debug, Clone, Deserialize)]
pub struct CreateKhatmahRequest {
    pub name: String,
    #[serde(default)]
    pub is_private: bool,
    #[serde(default = "default_true")]
    pub require_name: bool,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub khatmah_type: KhatmahType,
    /// Client-chosen token; one is generated when absent.
    #[serde(default)]
    pub creator_token: Option<Uuid>,
}

/// Body of PUT and PATCH. PUT additionally requires `name`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateKhatmahRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub is_private: Option<bool>,
    #[serde(default)]
    pub require_name: Option<bool>,
    #[serde(default, deserialize_with = "nullable")]
    pub end_date: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "nullable")]
    pub image_url: Option<Option<String>>,
    #[serde(flatten)]
    pub credentials: OwnerCredentials,
}

/// Proof of ownership presented with a mutating request: the creator token,
/// or the id of the participant recorded as creator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct OwnerCredentials {
    #[serde(default)]
    pub creator_token: Option<Uuid>,
    #[serde(default, alias = "requester_participant_id")]
    pub participant_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JoinKhatmahRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub creator_token: Option<Uuid>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RemoveParticipantRequest {
    pub participant_id: Uuid,
    #[serde(default)]
    pub creator_token: Option<Uuid>,
    #[serde(default)]
    pub requester_participant_id: Option<Uuid>,
}

impl RemoveParticipantRequest {
    pub fn credentials(&self) -> OwnerCredentials {
        OwnerCredentials {
            creator_token: self.creator_token,
            participant_id: self.requester_participant_id,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KhatmahResponse {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub is_private: bool,
    pub require_name: bool,
    pub end_date: Option<NaiveDate>,
    pub image_url: Option<String>,
    pub khatmah_type: KhatmahType,
    pub creator: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creator_token: Option<Uuid>,
    pub participants: Vec<ParticipantResponse>,
    pub assignments: Vec<AssignmentResponse>,
    pub surah_assignments: Vec<AssignmentResponse>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KhatmahSummary {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub is_private: bool,
    pub require_name: bool,
    pub end_date: Option<NaiveDate>,
    pub image_url: Option<String>,
    pub khatmah_type: KhatmahType,
    pub participant_count: u32,
    pub completed_count: u32,
    pub participants: Vec<ParticipantRef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticipantRef {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub count: u64,
    pub next: Option<u32>,
    pub previous: Option<u32>,
    pub results: Vec<T>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageQuery {
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub page_size: Option<u32>,
}

// -- Participants --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticipantResponse {
    pub id: Uuid,
    pub name: String,
    pub khatmah: Uuid,
    pub created_at: DateTime<Utc>,
    pub assignments: Vec<AssignmentResponse>,
    pub surah_assignments: Vec<AssignmentResponse>,
}

// -- Assignments --

/// The claimed item; serialized inline as `juz_number` or `surah_number`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssignedItem {
    #[serde(rename = "juz_number")]
    Juz(u8),
    #[serde(rename = "surah_number")]
    Surah(u8),
}

impl AssignedItem {
    pub fn new(kind: KhatmahType, number: u8) -> Self {
        match kind {
            KhatmahType::Juz => Self::Juz(number),
            KhatmahType::Surah => Self::Surah(number),
        }
    }

    pub fn number(self) -> u8 {
        match self {
            Self::Juz(n) | Self::Surah(n) => n,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignmentResponse {
    pub id: Uuid,
    #[serde(flatten)]
    pub item: AssignedItem,
    pub participant: Uuid,
    pub participant_name: String,
    pub khatmah: Uuid,
    pub created_at: DateTime<Utc>,
    pub completed: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateJuzAssignmentRequest {
    pub khatmah: Uuid,
    pub participant: Uuid,
    pub juz_number: i64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateSurahAssignmentRequest {
    pub khatmah: Uuid,
    pub participant: Uuid,
    pub surah_number: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct KhatmahFilter {
    #[serde(default)]
    pub khatmah: Option<Uuid>,
}

// -- Hijri calendar --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HijriMonthResponse {
    pub id: Uuid,
    pub name_ar: String,
    pub name_en: String,
    pub number: u8,
    pub year: i32,
    pub gregorian_start: NaiveDate,
    pub gregorian_end: NaiveDate,
    pub moon_sighting_data: Option<MoonSightingData>,
    pub calendar_data: Option<CalendarData>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HijriMonthDetail {
    #[serde(flatten)]
    pub month: HijriMonthResponse,
    pub events: Vec<HijriEventResponse>,
    pub astronomical_events: Vec<AstronomicalEventResponse>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HijriEventResponse {
    pub id: Uuid,
    pub month: Uuid,
    pub day: u8,
    pub title_ar: String,
    pub title_en: Option<String>,
    pub description_ar: Option<String>,
    pub description_en: Option<String>,
    pub year_of_event: Option<i32>,
    pub is_holiday: bool,
    pub event_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AstronomicalEventResponse {
    pub id: Uuid,
    pub month: Uuid,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub title_ar: String,
    pub title_en: Option<String>,
    pub description_ar: Option<String>,
    pub description_en: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CurrentMonthQuery {
    #[serde(default)]
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MonthNumberQuery {
    pub number: Option<i64>,
    pub year: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MonthNameQuery {
    pub name: Option<String>,
    #[serde(default)]
    pub year: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventsByMonthQuery {
    #[serde(default)]
    pub month_id: Option<Uuid>,
    #[serde(default)]
    pub month_number: Option<i64>,
    #[serde(default)]
    pub year: Option<i32>,
}

// -- Qibla --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QiblaResponse {
    pub latitude: f64,
    pub longitude: f64,
    /// Bearing rounded to two decimals.
    pub direction: f64,
    pub direction_raw: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assignment_item_is_inlined() {
        let resp = AssignmentResponse {
            id: Uuid::nil(),
            item: AssignedItem::Surah(36),
            participant: Uuid::nil(),
            participant_name: "Maryam".into(),
            khatmah: Uuid::nil(),
            created_at: DateTime::<Utc>::default(),
            completed: false,
        };
        let value = serde_json::to_value(&resp).unwrap();
        assert_eq!(value["surah_number"], 36);
        assert!(value.get("juz_number").is_none());
        assert!(value.get("item").is_none());
    }

    #[test]
    fn creator_token_omitted_when_hidden() {
        let resp = KhatmahResponse {
            id: Uuid::nil(),
            name: "Ramadan circle".into(),
            created_at: DateTime::<Utc>::default(),
            is_private: false,
            require_name: true,
            end_date: None,
            image_url: None,
            khatmah_type: KhatmahType::Juz,
            creator: None,
            creator_token: None,
            participants: vec![],
            assignments: vec![],
            surah_assignments: vec![],
        };
        let value = serde_json::to_value(&resp).unwrap();
        assert!(value.get("creator_token").is_none());
    }

    #[test]
    fn update_distinguishes_null_from_absent() {
        let req: UpdateKhatmahRequest =
            serde_json::from_str(r#"{"end_date": null, "creator_token": "7b0d4f5e-3a0c-4a51-9a1f-0e8b7f0c2d11"}"#)
                .unwrap();
        assert_eq!(req.end_date, Some(None));
        assert_eq!(req.image_url, None);
        assert!(req.credentials.creator_token.is_some());
    }

    #[test]
    fn create_defaults() {
        let req: CreateKhatmahRequest = serde_json::from_str(r#"{"name": "Family"}"#).unwrap();
        assert!(req.require_name);
        assert!(!req.is_private);
        assert_eq!(req.khatmah_type, KhatmahType::Juz);
        assert!(req.creator_token.is_none());
    }
}
