use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// How a khatmah divides the Quran among its readers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KhatmahType {
    #[default]
    Juz,
    Surah,
}

impl KhatmahType {
    /// Highest assignable item number (items are numbered from 1).
    pub const fn max_item(self) -> u8 {
        match self {
            Self::Juz => 30,
            Self::Surah => 114,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Juz => "juz",
            Self::Surah => "surah",
        }
    }

    /// Human-facing item label used in error messages.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Juz => "Juz",
            Self::Surah => "Surah",
        }
    }

    pub fn contains(self, number: i64) -> bool {
        (1..=i64::from(self.max_item())).contains(&number)
    }
}

impl fmt::Display for KhatmahType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KhatmahType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "juz" => Ok(Self::Juz),
            "surah" => Ok(Self::Surah),
            other => Err(format!("unknown khatmah type '{}'", other)),
        }
    }
}

// -- Hijri calendar payloads --

/// Moon sighting report stored alongside a Hijri month.
/// Keys outside the known set are kept as-is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MoonSightingData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_sighting: Option<Sighting>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alternative_sighting: Option<Sighting>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Sighting {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub altitude: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stay_after_sunset: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub illumination_percentage: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Day-by-day mapping between a Hijri month and the Gregorian calendar.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CalendarData {
    #[serde(default)]
    pub gregorian_dates: Vec<DayMapping>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayMapping {
    pub hijri: u8,
    pub gregorian: NaiveDate,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn khatmah_type_domains() {
        assert!(KhatmahType::Juz.contains(1));
        assert!(KhatmahType::Juz.contains(30));
        assert!(!KhatmahType::Juz.contains(0));
        assert!(!KhatmahType::Juz.contains(31));
        assert!(KhatmahType::Surah.contains(114));
        assert!(!KhatmahType::Surah.contains(115));
    }

    #[test]
    fn khatmah_type_wire_format() {
        assert_eq!(serde_json::to_string(&KhatmahType::Surah).unwrap(), "\"surah\"");
        assert_eq!("juz".parse::<KhatmahType>().unwrap(), KhatmahType::Juz);
        assert!("hizb".parse::<KhatmahType>().is_err());
    }

    #[test]
    fn moon_sighting_keeps_unknown_keys() {
        let raw = serde_json::json!({
            "expected_sighting": {
                "date": "2025-03-01",
                "time": "18:00",
                "illumination_percentage": "2.49%"
            },
            "observatory": "Najaf"
        });

        let data: MoonSightingData = serde_json::from_value(raw.clone()).unwrap();
        let expected = data.expected_sighting.as_ref().unwrap();
        assert_eq!(expected.date.as_deref(), Some("2025-03-01"));
        assert!(data.alternative_sighting.is_none());
        assert_eq!(data.extra["observatory"], "Najaf");

        assert_eq!(serde_json::to_value(&data).unwrap(), raw);
    }
}
