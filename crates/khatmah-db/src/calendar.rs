use anyhow::Result;
use chrono::NaiveDate;
use rusqlite::{OptionalExtension, params};
use uuid::Uuid;

use khatmah_compute::hijri::resolve_month;

use crate::Database;
use crate::models::{AstronomicalEventRow, HijriEventRow, HijriMonthRow};

const MONTH_COLUMNS: &str = "m.id, m.name_ar, m.name_en, m.number, m.year, m.gregorian_start, \
     m.gregorian_end, m.moon_sighting_data, m.calendar_data";

impl Database {
    // -- Months --

    pub fn insert_hijri_month(&self, month: &HijriMonthRow) -> Result<()> {
        let moon_sighting = month
            .moon_sighting_data
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let calendar = month
            .calendar_data
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO hijri_months (id, name_ar, name_en, number, year, gregorian_start,
                                           gregorian_end, moon_sighting_data, calendar_data)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    month.id.to_string(),
                    month.name_ar,
                    month.name_en,
                    month.number,
                    month.year,
                    month.gregorian_start,
                    month.gregorian_end,
                    moon_sighting,
                    calendar,
                ],
            )?;
            Ok(())
        })
    }

    /// All months in calendar order.
    pub fn list_hijri_months(&self) -> Result<Vec<HijriMonthRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {MONTH_COLUMNS} FROM hijri_months m ORDER BY m.year, m.number"
            ))?;
            let rows = stmt
                .query_map([], HijriMonthRow::from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_hijri_month(&self, id: Uuid) -> Result<Option<HijriMonthRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    &format!("SELECT {MONTH_COLUMNS} FROM hijri_months m WHERE m.id = ?1"),
                    [id.to_string()],
                    HijriMonthRow::from_row,
                )
                .optional()?;
            Ok(row)
        })
    }

    pub fn hijri_month_by_number(&self, number: u8, year: i32) -> Result<Option<HijriMonthRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    &format!(
                        "SELECT {MONTH_COLUMNS} FROM hijri_months m WHERE m.number = ?1 AND m.year = ?2"
                    ),
                    params![number, year],
                    HijriMonthRow::from_row,
                )
                .optional()?;
            Ok(row)
        })
    }

    /// First month (in calendar order) whose Arabic name contains `name`,
    /// ignoring case; failing that, the first whose English name does.
    pub fn find_hijri_month_by_name(
        &self,
        name: &str,
        year: Option<i32>,
    ) -> Result<Option<HijriMonthRow>> {
        let needle = name.trim().to_lowercase();
        let months: Vec<HijriMonthRow> = self
            .list_hijri_months()?
            .into_iter()
            .filter(|m| year.is_none_or(|y| m.year == y))
            .collect();

        let by_arabic = months
            .iter()
            .find(|m| m.name_ar.to_lowercase().contains(&needle));
        let found = by_arabic.or_else(|| {
            months
                .iter()
                .find(|m| m.name_en.to_lowercase().contains(&needle))
        });
        Ok(found.cloned())
    }

    /// The month containing `date`, or the nearest one when the seeded range
    /// has a gap there.
    pub fn resolve_hijri_month(&self, date: NaiveDate) -> Result<Option<HijriMonthRow>> {
        let months = self.list_hijri_months()?;
        Ok(resolve_month(&months, date).cloned())
    }

    // -- Events --

    pub fn insert_hijri_event(&self, event: &HijriEventRow) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO hijri_events (id, month_id, day, title_ar, title_en, description_ar,
                                           description_en, year_of_event, is_holiday, event_type)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    event.id.to_string(),
                    event.month_id.to_string(),
                    event.day,
                    event.title_ar,
                    event.title_en,
                    event.description_ar,
                    event.description_en,
                    event.year_of_event,
                    event.is_holiday,
                    event.event_type,
                ],
            )?;
            Ok(())
        })
    }

    /// Events ordered by month number then day, optionally for one month.
    pub fn list_hijri_events(&self, month_id: Option<Uuid>) -> Result<Vec<HijriEventRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT e.id, e.month_id, e.day, e.title_ar, e.title_en, e.description_ar,
                        e.description_en, e.year_of_event, e.is_holiday, e.event_type
                 FROM hijri_events e
                 JOIN hijri_months m ON m.id = e.month_id
                 WHERE ?1 IS NULL OR e.month_id = ?1
                 ORDER BY m.number, e.day, e.rowid",
            )?;
            let rows = stmt
                .query_map([month_id.map(|id| id.to_string())], HijriEventRow::from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn insert_astronomical_event(&self, event: &AstronomicalEventRow) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO astronomical_events (id, month_id, date, time, title_ar, title_en,
                                                  description_ar, description_en)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    event.id.to_string(),
                    event.month_id.to_string(),
                    event.date,
                    event.time,
                    event.title_ar,
                    event.title_en,
                    event.description_ar,
                    event.description_en,
                ],
            )?;
            Ok(())
        })
    }

    /// Astronomical events in chronological order, optionally for one month.
    pub fn list_astronomical_events(
        &self,
        month_id: Option<Uuid>,
    ) -> Result<Vec<AstronomicalEventRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, month_id, date, time, title_ar, title_en, description_ar, description_en
                 FROM astronomical_events
                 WHERE ?1 IS NULL OR month_id = ?1
                 ORDER BY date, time",
            )?;
            let rows = stmt
                .query_map(
                    [month_id.map(|id| id.to_string())],
                    AstronomicalEventRow::from_row,
                )?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveTime;

    use khatmah_types::models::{CalendarData, DayMapping, MoonSightingData, Sighting};

    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn month(number: u8, name_ar: &str, name_en: &str, start: NaiveDate, end: NaiveDate) -> HijriMonthRow {
        HijriMonthRow {
            id: Uuid::new_v4(),
            name_ar: name_ar.into(),
            name_en: name_en.into(),
            number,
            year: 1446,
            gregorian_start: start,
            gregorian_end: end,
            moon_sighting_data: None,
            calendar_data: None,
        }
    }

    fn seeded() -> (Database, HijriMonthRow, HijriMonthRow) {
        let db = Database::open_in_memory().unwrap();
        let ramadan = HijriMonthRow {
            moon_sighting_data: Some(MoonSightingData {
                expected_sighting: Some(Sighting {
                    date: Some("2025-03-01".into()),
                    altitude: Some("19 degrees".into()),
                    ..Default::default()
                }),
                ..Default::default()
            }),
            calendar_data: Some(CalendarData {
                gregorian_dates: vec![DayMapping { hijri: 1, gregorian: d(2025, 3, 2) }],
                ..Default::default()
            }),
            ..month(9, "رمضان", "Ramadan", d(2025, 3, 2), d(2025, 3, 30))
        };
        let dhul_qadah = month(11, "ذو القعدة", "Dhul Qadah", d(2025, 4, 29), d(2025, 5, 28));
        db.insert_hijri_month(&dhul_qadah).unwrap();
        db.insert_hijri_month(&ramadan).unwrap();
        (db, ramadan, dhul_qadah)
    }

    #[test]
    fn month_payloads_roundtrip() {
        let (db, ramadan, _) = seeded();
        assert_eq!(db.get_hijri_month(ramadan.id).unwrap(), Some(ramadan));
    }

    #[test]
    fn months_in_calendar_order() {
        let (db, ramadan, dhul_qadah) = seeded();
        let ids: Vec<Uuid> = db.list_hijri_months().unwrap().into_iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![ramadan.id, dhul_qadah.id]);
    }

    #[test]
    fn lookup_by_number() {
        let (db, ramadan, _) = seeded();
        assert_eq!(db.hijri_month_by_number(9, 1446).unwrap().map(|m| m.id), Some(ramadan.id));
        assert_eq!(db.hijri_month_by_number(9, 1447).unwrap(), None);
    }

    #[test]
    fn lookup_by_name() {
        let (db, ramadan, dhul_qadah) = seeded();
        let id = |name: &str, year| db.find_hijri_month_by_name(name, year).unwrap().map(|m| m.id);

        assert_eq!(id("رمض", None), Some(ramadan.id));
        assert_eq!(id("ramadan", None), Some(ramadan.id));
        assert_eq!(id("QADAH", Some(1446)), Some(dhul_qadah.id));
        assert_eq!(id("Ramadan", Some(1447)), None);
        assert_eq!(id("Muharram", None), None);
    }

    #[test]
    fn resolve_uses_seeded_months() {
        let (db, ramadan, dhul_qadah) = seeded();
        assert_eq!(db.resolve_hijri_month(d(2025, 3, 15)).unwrap().map(|m| m.id), Some(ramadan.id));
        assert_eq!(db.resolve_hijri_month(d(2025, 4, 14)).unwrap().map(|m| m.id), Some(dhul_qadah.id));

        let empty = Database::open_in_memory().unwrap();
        assert_eq!(empty.resolve_hijri_month(d(2025, 3, 15)).unwrap(), None);
    }

    #[test]
    fn events_filtered_and_ordered() {
        let (db, ramadan, dhul_qadah) = seeded();
        let event = |month_id, day| HijriEventRow {
            id: Uuid::new_v4(),
            month_id,
            day,
            title_ar: format!("حدث {day}"),
            title_en: None,
            description_ar: None,
            description_en: None,
            year_of_event: Some(3),
            is_holiday: day == 15,
            event_type: Some("historical".into()),
        };
        db.insert_hijri_event(&event(ramadan.id, 15)).unwrap();
        db.insert_hijri_event(&event(ramadan.id, 1)).unwrap();
        db.insert_hijri_event(&event(dhul_qadah.id, 11)).unwrap();

        let in_ramadan = db.list_hijri_events(Some(ramadan.id)).unwrap();
        assert_eq!(in_ramadan.iter().map(|e| e.day).collect::<Vec<_>>(), vec![1, 15]);
        assert!(in_ramadan[1].is_holiday);

        let all = db.list_hijri_events(None).unwrap();
        assert_eq!(all.iter().map(|e| e.day).collect::<Vec<_>>(), vec![1, 15, 11]);
    }

    #[test]
    fn astronomical_events_for_month() {
        let (db, ramadan, dhul_qadah) = seeded();
        let event = AstronomicalEventRow {
            id: Uuid::new_v4(),
            month_id: ramadan.id,
            date: d(2025, 3, 14),
            time: NaiveTime::from_hms_opt(9, 55, 0).unwrap(),
            title_ar: "خسوف كلي للقمر".into(),
            title_en: Some("Total lunar eclipse".into()),
            description_ar: None,
            description_en: None,
        };
        db.insert_astronomical_event(&event).unwrap();

        assert_eq!(db.list_astronomical_events(Some(ramadan.id)).unwrap(), vec![event]);
        assert!(db.list_astronomical_events(Some(dhul_qadah.id)).unwrap().is_empty());
    }

    #[test]
    fn month_number_and_year_unique() {
        let (db, ramadan, _) = seeded();
        let duplicate = HijriMonthRow {
            id: Uuid::new_v4(),
            ..ramadan
        };
        assert!(db.insert_hijri_month(&duplicate).is_err());
    }
}
