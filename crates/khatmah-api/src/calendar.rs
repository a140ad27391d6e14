//! Read-only Hijri calendar endpoints.
//!
//! Months, events and astronomical events are loaded by seed commands; the
//! API only looks them up.

use axum::{Json, extract::State};
use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use khatmah_db::Database;
use khatmah_db::models::{AstronomicalEventRow, HijriEventRow, HijriMonthRow};
use khatmah_types::api::{
    AstronomicalEventResponse, CurrentMonthQuery, EventsByMonthQuery, HijriEventResponse,
    HijriMonthDetail, HijriMonthResponse, MonthNameQuery, MonthNumberQuery,
};

use crate::error::ApiError;
use crate::extract::{ApiPath, ApiQuery};
use crate::state::{AppState, with_db};

const MONTHS_IN_YEAR: i64 = 12;

fn month_response(row: HijriMonthRow) -> HijriMonthResponse {
    HijriMonthResponse {
        id: row.id,
        name_ar: row.name_ar,
        name_en: row.name_en,
        number: row.number,
        year: row.year,
        gregorian_start: row.gregorian_start,
        gregorian_end: row.gregorian_end,
        moon_sighting_data: row.moon_sighting_data,
        calendar_data: row.calendar_data,
    }
}

fn event_response(row: HijriEventRow) -> HijriEventResponse {
    HijriEventResponse {
        id: row.id,
        month: row.month_id,
        day: row.day,
        title_ar: row.title_ar,
        title_en: row.title_en,
        description_ar: row.description_ar,
        description_en: row.description_en,
        year_of_event: row.year_of_event,
        is_holiday: row.is_holiday,
        event_type: row.event_type,
    }
}

fn astronomical_response(row: AstronomicalEventRow) -> AstronomicalEventResponse {
    AstronomicalEventResponse {
        id: row.id,
        month: row.month_id,
        date: row.date,
        time: row.time,
        title_ar: row.title_ar,
        title_en: row.title_en,
        description_ar: row.description_ar,
        description_en: row.description_en,
    }
}

fn month_detail(db: &Database, row: HijriMonthRow) -> Result<HijriMonthDetail, ApiError> {
    let events = db.list_hijri_events(Some(row.id))?;
    let astronomical = db.list_astronomical_events(Some(row.id))?;
    Ok(HijriMonthDetail {
        month: month_response(row),
        events: events.into_iter().map(event_response).collect(),
        astronomical_events: astronomical.into_iter().map(astronomical_response).collect(),
    })
}

fn month_number(number: Option<i64>) -> Result<u8, ApiError> {
    let number = number.ok_or_else(|| ApiError::validation("number is required"))?;
    if !(1..=MONTHS_IN_YEAR).contains(&number) {
        return Err(ApiError::validation(
            "Invalid month number. Must be between 1 and 12.",
        ));
    }
    u8::try_from(number).map_err(|_| ApiError::validation("Invalid month number"))
}

fn current_month(db: &Database, date: NaiveDate) -> Result<HijriMonthRow, ApiError> {
    db.resolve_hijri_month(date)?
        .ok_or_else(|| ApiError::NotFound("No Hijri months are available".into()))
}

/// Month named by `month_id`, or by `month_number` plus `year`.
fn month_for_events(db: &Database, query: &EventsByMonthQuery) -> Result<Uuid, ApiError> {
    if let Some(id) = query.month_id {
        return db
            .get_hijri_month(id)?
            .map(|m| m.id)
            .ok_or_else(|| ApiError::not_found("Hijri month"));
    }

    let (Some(_), Some(year)) = (query.month_number, query.year) else {
        return Err(ApiError::validation(
            "Provide month_id, or month_number and year",
        ));
    };
    let number = month_number(query.month_number)?;
    db.hijri_month_by_number(number, year)?
        .map(|m| m.id)
        .ok_or_else(|| ApiError::not_found("Hijri month"))
}

// -- Months --

pub async fn list_months(
    State(state): State<AppState>,
) -> Result<Json<Vec<HijriMonthResponse>>, ApiError> {
    let months = with_db(&state, |db| Ok(db.list_hijri_months()?)).await?;
    Ok(Json(months.into_iter().map(month_response).collect()))
}

pub async fn get_month(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<HijriMonthDetail>, ApiError> {
    let detail = with_db(&state, move |db| {
        let month = db
            .get_hijri_month(id)?
            .ok_or_else(|| ApiError::not_found("Hijri month"))?;
        month_detail(db, month)
    })
    .await?;
    Ok(Json(detail))
}

/// GET /hijri-months/current/: month containing `date` (default: today, UTC),
/// or the nearest one.
pub async fn current_month_handler(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<CurrentMonthQuery>,
) -> Result<Json<HijriMonthResponse>, ApiError> {
    let date = query.date.unwrap_or_else(|| Utc::now().date_naive());
    let month = with_db(&state, move |db| current_month(db, date)).await?;
    Ok(Json(month_response(month)))
}

pub async fn month_by_number(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<MonthNumberQuery>,
) -> Result<Json<HijriMonthResponse>, ApiError> {
    let number = month_number(query.number)?;
    let year = query
        .year
        .ok_or_else(|| ApiError::validation("year is required"))?;

    let month = with_db(&state, move |db| {
        db.hijri_month_by_number(number, year)?.ok_or_else(|| {
            ApiError::NotFound(format!("No Hijri month {} in year {}", number, year))
        })
    })
    .await?;
    Ok(Json(month_response(month)))
}

pub async fn month_by_name(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<MonthNameQuery>,
) -> Result<Json<HijriMonthResponse>, ApiError> {
    let name = query
        .name
        .filter(|n| !n.trim().is_empty())
        .ok_or_else(|| ApiError::validation("name is required"))?;

    let month = with_db(&state, move |db| {
        db.find_hijri_month_by_name(&name, query.year)?
            .ok_or_else(|| ApiError::NotFound(format!("No Hijri month matching '{}'", name.trim())))
    })
    .await?;
    Ok(Json(month_response(month)))
}

/// GET /hijri-calendar/: today's month with its events.
pub async fn hijri_calendar(
    State(state): State<AppState>,
) -> Result<Json<HijriMonthDetail>, ApiError> {
    let today = Utc::now().date_naive();
    let detail = with_db(&state, move |db| {
        let month = current_month(db, today)?;
        month_detail(db, month)
    })
    .await?;
    Ok(Json(detail))
}

// -- Events --

pub async fn list_events(
    State(state): State<AppState>,
) -> Result<Json<Vec<HijriEventResponse>>, ApiError> {
    let events = with_db(&state, |db| Ok(db.list_hijri_events(None)?)).await?;
    Ok(Json(events.into_iter().map(event_response).collect()))
}

pub async fn events_by_month(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<EventsByMonthQuery>,
) -> Result<Json<Vec<HijriEventResponse>>, ApiError> {
    let events = with_db(&state, move |db| {
        let month_id = month_for_events(db, &query)?;
        Ok(db.list_hijri_events(Some(month_id))?)
    })
    .await?;
    Ok(Json(events.into_iter().map(event_response).collect()))
}

pub async fn list_astronomical_events(
    State(state): State<AppState>,
) -> Result<Json<Vec<AstronomicalEventResponse>>, ApiError> {
    let events = with_db(&state, |db| Ok(db.list_astronomical_events(None)?)).await?;
    Ok(Json(events.into_iter().map(astronomical_response).collect()))
}

pub async fn astronomical_events_by_month(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<EventsByMonthQuery>,
) -> Result<Json<Vec<AstronomicalEventResponse>>, ApiError> {
    let events = with_db(&state, move |db| {
        let month_id = month_for_events(db, &query)?;
        Ok(db.list_astronomical_events(Some(month_id))?)
    })
    .await?;
    Ok(Json(events.into_iter().map(astronomical_response).collect()))
}
