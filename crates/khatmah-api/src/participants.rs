use axum::{Json, extract::State};
use uuid::Uuid;

use khatmah_db::models::{AssignmentRow, ParticipantRow};
use khatmah_types::api::{AssignmentResponse, KhatmahFilter, ParticipantResponse};
use khatmah_types::models::KhatmahType;

use crate::assignments::assignment_response;
use crate::error::ApiError;
use crate::extract::{ApiPath, ApiQuery};
use crate::state::{AppState, with_db};

fn owned_by(participant: Uuid, rows: &[AssignmentRow]) -> Vec<AssignmentResponse> {
    rows.iter()
        .filter(|a| a.participant_id == participant)
        .cloned()
        .map(assignment_response)
        .collect()
}

/// Attach each participant's juz and surah assignments.
pub(crate) fn participant_responses(
    participants: Vec<ParticipantRow>,
    juz: &[AssignmentRow],
    surah: &[AssignmentRow],
) -> Vec<ParticipantResponse> {
    participants
        .into_iter()
        .map(|p| ParticipantResponse {
            assignments: owned_by(p.id, juz),
            surah_assignments: owned_by(p.id, surah),
            id: p.id,
            name: p.name,
            khatmah: p.khatmah_id,
            created_at: p.created_at,
        })
        .collect()
}

/// GET /participants/?khatmah=<id>
pub async fn list_participants(
    State(state): State<AppState>,
    ApiQuery(filter): ApiQuery<KhatmahFilter>,
) -> Result<Json<Vec<ParticipantResponse>>, ApiError> {
    let participants = with_db(&state, move |db| {
        let participants = db.list_participants(filter.khatmah)?;
        let juz = db.list_assignments(KhatmahType::Juz, filter.khatmah)?;
        let surah = db.list_assignments(KhatmahType::Surah, filter.khatmah)?;
        Ok(participant_responses(participants, &juz, &surah))
    })
    .await?;

    Ok(Json(participants))
}

/// GET /participants/{id}/
pub async fn get_participant(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<ParticipantResponse>, ApiError> {
    let participant = with_db(&state, move |db| {
        let participant = db
            .get_participant(id)?
            .ok_or_else(|| ApiError::not_found("Participant"))?;
        let khatmah = Some(participant.khatmah_id);
        let juz = db.list_assignments(KhatmahType::Juz, khatmah)?;
        let surah = db.list_assignments(KhatmahType::Surah, khatmah)?;
        participant_responses(vec![participant], &juz, &surah)
            .pop()
            .ok_or_else(|| ApiError::not_found("Participant"))
    })
    .await?;

    Ok(Json(participant))
}
