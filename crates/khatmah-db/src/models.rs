//! Database row types. These map directly to SQLite rows and are kept apart
//! from the khatmah-types API models so the storage layer stays independent.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rusqlite::Row;
use rusqlite::types::Type;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use khatmah_compute::hijri::GregorianSpan;
use khatmah_types::models::{CalendarData, KhatmahType, MoonSightingData};

#[derive(Debug, Clone, PartialEq)]
pub struct KhatmahRow {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub is_private: bool,
    pub require_name: bool,
    pub end_date: Option<NaiveDate>,
    pub image_url: Option<String>,
    pub khatmah_type: KhatmahType,
    pub creator_id: Option<Uuid>,
    pub creator_token: Uuid,
}

pub(crate) const KHATMAH_COLUMNS: &str = "k.id, k.name, k.created_at, k.is_private, k.require_name, \
     k.end_date, k.image_url, k.khatmah_type, k.creator_id, k.creator_token";

impl KhatmahRow {
    /// Reads the columns listed in `KHATMAH_COLUMNS`, in order.
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: uuid_at(row, 0)?,
            name: row.get(1)?,
            created_at: row.get(2)?,
            is_private: row.get(3)?,
            require_name: row.get(4)?,
            end_date: row.get(5)?,
            image_url: row.get(6)?,
            khatmah_type: parse_at(row, 7)?,
            creator_id: opt_uuid_at(row, 8)?,
            creator_token: uuid_at(row, 9)?,
        })
    }
}

/// A khatmah with the aggregate counts shown in listings.
#[derive(Debug, Clone, PartialEq)]
pub struct KhatmahSummaryRow {
    pub khatmah: KhatmahRow,
    pub participant_count: u32,
    pub completed_count: u32,
}

/// Fields a PUT/PATCH may change. `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct KhatmahChanges {
    pub name: Option<String>,
    pub is_private: Option<bool>,
    pub require_name: Option<bool>,
    pub end_date: Option<Option<NaiveDate>>,
    pub image_url: Option<Option<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipantRow {
    pub id: Uuid,
    pub khatmah_id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl ParticipantRow {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: uuid_at(row, 0)?,
            khatmah_id: uuid_at(row, 1)?,
            name: row.get(2)?,
            created_at: row.get(3)?,
        })
    }
}

/// Result of joining a khatmah.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Joined {
    pub participant: ParticipantRow,
    /// True when this join recorded the participant as the khatmah's creator.
    pub became_creator: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignmentRow {
    pub id: Uuid,
    pub kind: KhatmahType,
    pub number: u8,
    pub participant_id: Uuid,
    pub participant_name: String,
    pub khatmah_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub completed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAssignment {
    pub id: Uuid,
    pub khatmah_id: Uuid,
    pub participant_id: Uuid,
    pub number: u8,
    pub created_at: DateTime<Utc>,
}

/// Outcome of trying to claim a juz or surah.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Claim {
    Created(AssignmentRow),
    /// Someone in the same khatmah already holds this item.
    Taken,
    /// The participant was deleted before the insert landed.
    ParticipantGone,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HijriMonthRow {
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

impl HijriMonthRow {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: uuid_at(row, 0)?,
            name_ar: row.get(1)?,
            name_en: row.get(2)?,
            number: row.get(3)?,
            year: row.get(4)?,
            gregorian_start: row.get(5)?,
            gregorian_end: row.get(6)?,
            moon_sighting_data: json_at(row, 7)?,
            calendar_data: json_at(row, 8)?,
        })
    }
}

impl GregorianSpan for HijriMonthRow {
    fn gregorian_start(&self) -> NaiveDate {
        self.gregorian_start
    }

    fn gregorian_end(&self) -> NaiveDate {
        self.gregorian_end
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HijriEventRow {
    pub id: Uuid,
    pub month_id: Uuid,
    pub day: u8,
    pub title_ar: String,
    pub title_en: Option<String>,
    pub description_ar: Option<String>,
    pub description_en: Option<String>,
    pub year_of_event: Option<i32>,
    pub is_holiday: bool,
    pub event_type: Option<String>,
}

impl HijriEventRow {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: uuid_at(row, 0)?,
            month_id: uuid_at(row, 1)?,
            day: row.get(2)?,
            title_ar: row.get(3)?,
            title_en: row.get(4)?,
            description_ar: row.get(5)?,
            description_en: row.get(6)?,
            year_of_event: row.get(7)?,
            is_holiday: row.get(8)?,
            event_type: row.get(9)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AstronomicalEventRow {
    pub id: Uuid,
    pub month_id: Uuid,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub title_ar: String,
    pub title_en: Option<String>,
    pub description_ar: Option<String>,
    pub description_en: Option<String>,
}

impl AstronomicalEventRow {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: uuid_at(row, 0)?,
            month_id: uuid_at(row, 1)?,
            date: row.get(2)?,
            time: row.get(3)?,
            title_ar: row.get(4)?,
            title_en: row.get(5)?,
            description_ar: row.get(6)?,
            description_en: row.get(7)?,
        })
    }
}

// -- Column decoding --

fn conversion_error<E>(idx: usize, err: E) -> rusqlite::Error
where
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, err.into())
}

pub(crate) fn uuid_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Uuid> {
    let raw: String = row.get(idx)?;
    raw.parse::<Uuid>().map_err(|e| conversion_error(idx, e))
}

pub(crate) fn opt_uuid_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<Uuid>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| s.parse::<Uuid>().map_err(|e| conversion_error(idx, e)))
        .transpose()
}

fn parse_at<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: std::str::FromStr<Err = String>,
{
    let raw: String = row.get(idx)?;
    raw.parse().map_err(|e: String| conversion_error(idx, e))
}

fn json_at<T: DeserializeOwned>(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<T>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| serde_json::from_str::<T>(&s).map_err(|e| conversion_error(idx, e)))
        .transpose()
}
