use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use khatmah_db::models::{AssignmentRow, Claim, NewAssignment};
use khatmah_types::api::{
    AssignedItem, AssignmentResponse, CreateJuzAssignmentRequest, CreateSurahAssignmentRequest,
    KhatmahFilter,
};
use khatmah_types::models::KhatmahType;

use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::state::{AppState, with_db};

pub(crate) fn assignment_response(row: AssignmentRow) -> AssignmentResponse {
    AssignmentResponse {
        id: row.id,
        item: AssignedItem::new(row.kind, row.number),
        participant: row.participant_id,
        participant_name: row.participant_name,
        khatmah: row.khatmah_id,
        created_at: row.created_at,
        completed: row.completed,
    }
}

/// Range check for a juz (1..=30) or surah (1..=114) number.
fn item_number(kind: KhatmahType, number: i64) -> Result<u8, ApiError> {
    if !kind.contains(number) {
        return Err(ApiError::validation(format!(
            "Invalid {} number. Must be between 1 and {}.",
            kind.label(),
            kind.max_item()
        )));
    }
    u8::try_from(number).map_err(|_| ApiError::validation("Item number out of range"))
}

async fn claim(
    state: AppState,
    kind: KhatmahType,
    khatmah_id: Uuid,
    participant_id: Uuid,
    number: i64,
) -> Result<(StatusCode, Json<AssignmentResponse>), ApiError> {
    let number = item_number(kind, number)?;

    let row = with_db(&state, move |db| {
        let khatmah = db
            .get_khatmah(khatmah_id)?
            .ok_or_else(|| ApiError::not_found("Khatmah"))?;
        if khatmah.khatmah_type != kind {
            return Err(ApiError::validation(format!(
                "This khatmah is divided by {}, not {}",
                khatmah.khatmah_type.as_str(),
                kind.as_str()
            )));
        }

        let participant = db
            .get_participant(participant_id)?
            .ok_or_else(|| ApiError::not_found("Participant"))?;
        if participant.khatmah_id != khatmah_id {
            return Err(ApiError::validation(
                "Participant does not belong to this khatmah",
            ));
        }

        let new = NewAssignment {
            id: Uuid::new_v4(),
            khatmah_id,
            participant_id,
            number,
            created_at: Utc::now(),
        };
        match db.claim_assignment(kind, &new)? {
            Claim::Created(row) => {
                info!(
                    "{} {} of khatmah {} assigned to {}",
                    kind.label(),
                    number,
                    khatmah_id,
                    row.participant_name
                );
                Ok(row)
            }
            Claim::Taken => {
                warn!("{} {} of khatmah {} already taken", kind.label(), number, khatmah_id);
                Err(ApiError::Conflict(format!(
                    "{} {} is already assigned in this khatmah",
                    kind.label(),
                    number
                )))
            }
            Claim::ParticipantGone => Err(ApiError::not_found("Participant")),
        }
    })
    .await?;

    Ok((StatusCode::CREATED, Json(assignment_response(row))))
}

async fn list(
    state: AppState,
    kind: KhatmahType,
    khatmah: Option<Uuid>,
) -> Result<Json<Vec<AssignmentResponse>>, ApiError> {
    let rows = with_db(&state, move |db| Ok(db.list_assignments(kind, khatmah)?)).await?;
    Ok(Json(rows.into_iter().map(assignment_response).collect()))
}

async fn retrieve(
    state: AppState,
    kind: KhatmahType,
    id: Uuid,
) -> Result<Json<AssignmentResponse>, ApiError> {
    let row = with_db(&state, move |db| {
        db.get_assignment(kind, id)?
            .ok_or_else(|| ApiError::not_found("Assignment"))
    })
    .await?;
    Ok(Json(assignment_response(row)))
}

async fn toggle(
    state: AppState,
    kind: KhatmahType,
    id: Uuid,
) -> Result<Json<AssignmentResponse>, ApiError> {
    let row = with_db(&state, move |db| {
        db.toggle_assignment(kind, id)?
            .ok_or_else(|| ApiError::not_found("Assignment"))
    })
    .await?;
    info!(
        "{} {} of khatmah {} marked {}",
        kind.label(),
        row.number,
        row.khatmah_id,
        if row.completed { "complete" } else { "incomplete" }
    );
    Ok(Json(assignment_response(row)))
}

// -- Juz --

pub async fn create_juz_assignment(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<CreateJuzAssignmentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    claim(state, KhatmahType::Juz, req.khatmah, req.participant, req.juz_number).await
}

pub async fn list_juz_assignments(
    State(state): State<AppState>,
    ApiQuery(filter): ApiQuery<KhatmahFilter>,
) -> Result<Json<Vec<AssignmentResponse>>, ApiError> {
    list(state, KhatmahType::Juz, filter.khatmah).await
}

pub async fn get_juz_assignment(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<AssignmentResponse>, ApiError> {
    retrieve(state, KhatmahType::Juz, id).await
}

pub async fn toggle_juz_assignment(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<AssignmentResponse>, ApiError> {
    toggle(state, KhatmahType::Juz, id).await
}

// -- Surah --

pub async fn create_surah_assignment(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<CreateSurahAssignmentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    claim(state, KhatmahType::Surah, req.khatmah, req.participant, req.surah_number).await
}

pub async fn list_surah_assignments(
    State(state): State<AppState>,
    ApiQuery(filter): ApiQuery<KhatmahFilter>,
) -> Result<Json<Vec<AssignmentResponse>>, ApiError> {
    list(state, KhatmahType::Surah, filter.khatmah).await
}

pub async fn get_surah_assignment(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<AssignmentResponse>, ApiError> {
    retrieve(state, KhatmahType::Surah, id).await
}

pub async fn toggle_surah_assignment(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<AssignmentResponse>, ApiError> {
    toggle(state, KhatmahType::Surah, id).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_ranges() {
        assert_eq!(item_number(KhatmahType::Juz, 1).unwrap(), 1);
        assert_eq!(item_number(KhatmahType::Juz, 30).unwrap(), 30);
        assert_eq!(item_number(KhatmahType::Surah, 114).unwrap(), 114);

        for (kind, n) in [
            (KhatmahType::Juz, 0),
            (KhatmahType::Juz, 31),
            (KhatmahType::Surah, 115),
            (KhatmahType::Surah, -1),
        ] {
            assert!(matches!(item_number(kind, n), Err(ApiError::Validation(_))));
        }
    }

    #[test]
    fn range_message_names_the_kind() {
        let Err(ApiError::Validation(msg)) = item_number(KhatmahType::Juz, 31) else {
            panic!("expected validation error");
        };
        assert_eq!(msg, "Invalid Juz number. Must be between 1 and 30.");
    }
}
