use std::collections::HashMap;

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use khatmah_db::Database;
use khatmah_db::models::{KhatmahChanges, KhatmahRow, KhatmahSummaryRow, ParticipantRow};
use khatmah_types::api::{
    JoinKhatmahRequest, KhatmahResponse, KhatmahSummary, OwnerCredentials, Page, PageQuery,
    ParticipantRef, RemoveParticipantRequest, UpdateKhatmahRequest,
};
use khatmah_types::models::KhatmahType;

use crate::assignments::assignment_response;
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath, ApiQuery, CreateKhatmahForm, OptionalJson};
use crate::images;
use crate::ownership::{self, TokenVisibility, authorize};
use crate::participants::participant_responses;
use crate::state::{AppState, with_db};

const DEFAULT_PAGE_SIZE: u32 = 9;
const MAX_PAGE_SIZE: u32 = 100;
const MAX_NAME_LEN: usize = 255;

fn validate_name(field: &str, raw: &str) -> Result<String, ApiError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(ApiError::validation(format!("{} may not be blank", field)));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(ApiError::validation(format!(
            "{} must be at most {} characters",
            field, MAX_NAME_LEN
        )));
    }
    Ok(name.to_owned())
}

fn load_khatmah(db: &Database, id: Uuid) -> Result<KhatmahRow, ApiError> {
    db.get_khatmah(id)?.ok_or_else(|| ApiError::not_found("Khatmah"))
}

/// Full representation with participants and assignments.
fn khatmah_detail(
    db: &Database,
    row: KhatmahRow,
    visibility: TokenVisibility,
) -> Result<KhatmahResponse, ApiError> {
    let participants = db.list_participants(Some(row.id))?;
    let juz = db.list_assignments(KhatmahType::Juz, Some(row.id))?;
    let surah = db.list_assignments(KhatmahType::Surah, Some(row.id))?;

    Ok(KhatmahResponse {
        id: row.id,
        name: row.name,
        created_at: row.created_at,
        is_private: row.is_private,
        require_name: row.require_name,
        end_date: row.end_date,
        image_url: row.image_url,
        khatmah_type: row.khatmah_type,
        creator: row.creator_id,
        creator_token: (visibility == TokenVisibility::Reveal).then_some(row.creator_token),
        participants: participant_responses(participants, &juz, &surah),
        assignments: juz.into_iter().map(assignment_response).collect(),
        surah_assignments: surah.into_iter().map(assignment_response).collect(),
    })
}

fn khatmah_summary(row: KhatmahSummaryRow, participants: Vec<ParticipantRef>) -> KhatmahSummary {
    let k = row.khatmah;
    KhatmahSummary {
        id: k.id,
        name: k.name,
        created_at: k.created_at,
        is_private: k.is_private,
        require_name: k.require_name,
        end_date: k.end_date,
        image_url: k.image_url,
        khatmah_type: k.khatmah_type,
        participant_count: row.participant_count,
        completed_count: row.completed_count,
        participants,
    }
}

/// POST /khatmahs/: the only response that always carries the creator token.
pub async fn create_khatmah(
    State(state): State<AppState>,
    form: CreateKhatmahForm,
) -> Result<impl IntoResponse, ApiError> {
    let CreateKhatmahForm { request, image } = form;
    let name = validate_name("name", &request.name)?;

    let uploaded = image.is_some();
    let image_url = match image {
        Some(image) => Some(image.save(&state.media_dir).await?),
        None => request.image_url,
    };

    let row = KhatmahRow {
        id: Uuid::new_v4(),
        name,
        created_at: Utc::now(),
        is_private: request.is_private,
        require_name: request.require_name,
        end_date: request.end_date,
        image_url,
        khatmah_type: request.khatmah_type,
        creator_id: None,
        creator_token: request.creator_token.unwrap_or_else(Uuid::new_v4),
    };

    let stored_image = uploaded.then(|| row.image_url.clone()).flatten();
    let response = with_db(&state, move |db| {
        db.insert_khatmah(&row)?;
        info!("Created {} khatmah {} ({})", row.khatmah_type, row.id, row.name);
        khatmah_detail(db, row, TokenVisibility::Reveal)
    })
    .await;

    match response {
        Ok(response) => Ok((StatusCode::CREATED, Json(response))),
        Err(e) => {
            if let Some(url) = stored_image {
                images::remove_stored(&state.media_dir, &url).await;
            }
            Err(e)
        }
    }
}

/// GET /khatmahs/: public khatmahs, newest first.
pub async fn list_khatmahs(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> Result<Json<Page<KhatmahSummary>>, ApiError> {
    let page = query.page.unwrap_or(1);
    if page == 0 {
        return Err(ApiError::NotFound("Invalid page.".into()));
    }
    let page_size = query
        .page_size
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);
    let offset = u64::from(page - 1) * u64::from(page_size);

    let listing = with_db(&state, move |db| {
        let (total, rows) = db.list_public_khatmahs(page_size, offset)?;
        if rows.is_empty() && page > 1 {
            return Err(ApiError::NotFound("Invalid page.".into()));
        }

        let ids: Vec<Uuid> = rows.iter().map(|r| r.khatmah.id).collect();
        let mut by_khatmah: HashMap<Uuid, Vec<ParticipantRef>> = HashMap::new();
        for p in db.participants_for_khatmahs(&ids)? {
            by_khatmah
                .entry(p.khatmah_id)
                .or_default()
                .push(ParticipantRef { id: p.id, name: p.name });
        }

        let results: Vec<KhatmahSummary> = rows
            .into_iter()
            .map(|row| {
                let participants = by_khatmah.remove(&row.khatmah.id).unwrap_or_default();
                khatmah_summary(row, participants)
            })
            .collect();

        Ok(Page {
            count: total,
            next: (offset + (results.len() as u64) < total).then_some(page + 1),
            previous: (page > 1).then(|| page - 1),
            results,
        })
    })
    .await?;

    Ok(Json(listing))
}

/// GET /khatmahs/{id}/: the token is included only for a caller who sent it.
pub async fn get_khatmah(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiQuery(credentials): ApiQuery<OwnerCredentials>,
) -> Result<Json<KhatmahResponse>, ApiError> {
    let response = with_db(&state, move |db| {
        let khatmah = load_khatmah(db, id)?;
        let visibility = TokenVisibility::for_presented(&khatmah, credentials.creator_token);
        khatmah_detail(db, khatmah, visibility)
    })
    .await?;

    Ok(Json(response))
}

/// PUT /khatmahs/{id}/
pub async fn replace_khatmah(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<UpdateKhatmahRequest>,
) -> Result<Json<KhatmahResponse>, ApiError> {
    if req.name.is_none() {
        return Err(ApiError::validation("name is required"));
    }
    update(state, id, req).await
}

/// PATCH /khatmahs/{id}/
pub async fn patch_khatmah(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<UpdateKhatmahRequest>,
) -> Result<Json<KhatmahResponse>, ApiError> {
    update(state, id, req).await
}

async fn update(
    state: AppState,
    id: Uuid,
    req: UpdateKhatmahRequest,
) -> Result<Json<KhatmahResponse>, ApiError> {
    let changes = KhatmahChanges {
        name: req
            .name
            .as_deref()
            .map(|n| validate_name("name", n))
            .transpose()?,
        is_private: req.is_private,
        require_name: req.require_name,
        end_date: req.end_date,
        image_url: req.image_url,
    };
    let credentials = req.credentials;

    let response = with_db(&state, move |db| {
        let khatmah = load_khatmah(db, id)?;
        authorize(&khatmah, &credentials)?;

        let updated = db
            .update_khatmah(id, &changes)?
            .ok_or_else(|| ApiError::not_found("Khatmah"))?;
        info!("Updated khatmah {}", id);

        let visibility = TokenVisibility::for_presented(&updated, credentials.creator_token);
        khatmah_detail(db, updated, visibility)
    })
    .await?;

    Ok(Json(response))
}

/// DELETE /khatmahs/{id}/?creator_token=… or ?participant_id=…
pub async fn delete_khatmah(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiQuery(credentials): ApiQuery<OwnerCredentials>,
) -> Result<StatusCode, ApiError> {
    let image_url = with_db(&state, move |db| {
        let khatmah = load_khatmah(db, id)?;
        authorize(&khatmah, &credentials)?;
        db.delete_khatmah(id)?;
        info!("Deleted khatmah {} ({})", id, khatmah.name);
        Ok(khatmah.image_url)
    })
    .await?;

    if let Some(url) = image_url {
        images::remove_stored(&state.media_dir, &url).await;
    }
    Ok(StatusCode::NO_CONTENT)
}

/// POST /khatmahs/{id}/join/
pub async fn join_khatmah(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    OptionalJson(req): OptionalJson<JoinKhatmahRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let response = with_db(&state, move |db| {
        let khatmah = load_khatmah(db, id)?;
        let name = ownership::participant_name(khatmah.require_name, req.name.as_deref())?;
        if name.chars().count() > MAX_NAME_LEN {
            return Err(ApiError::validation(format!(
                "name must be at most {} characters",
                MAX_NAME_LEN
            )));
        }
        let claims_creator = ownership::presents_creator_token(&khatmah, req.creator_token);

        let participant = ParticipantRow {
            id: Uuid::new_v4(),
            khatmah_id: id,
            name,
            created_at: Utc::now(),
        };
        let joined = db.join_khatmah(participant, claims_creator)?;
        if joined.became_creator {
            info!("Participant {} is now creator of khatmah {}", joined.participant.id, id);
        } else if claims_creator {
            info!(
                "Khatmah {} already has a creator; participant {} joined as reader",
                id, joined.participant.id
            );
        }

        let mut responses = participant_responses(vec![joined.participant], &[], &[]);
        responses
            .pop()
            .ok_or_else(|| ApiError::Internal(anyhow::anyhow!("participant response missing")))
    })
    .await?;

    Ok((StatusCode::CREATED, Json(response)))
}

/// POST /khatmahs/{id}/remove_participant/
pub async fn remove_participant(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<RemoveParticipantRequest>,
) -> Result<StatusCode, ApiError> {
    with_db(&state, move |db| {
        let khatmah = load_khatmah(db, id)?;
        let target = db
            .get_participant(req.participant_id)?
            .filter(|p| p.khatmah_id == id)
            .ok_or_else(|| ApiError::not_found("Participant"))?;

        if khatmah.creator_id == Some(target.id) {
            return Err(ApiError::validation("The creator of a khatmah cannot be removed"));
        }
        authorize(&khatmah, &req.credentials())?;

        db.delete_participant(target.id)?;
        info!("Removed participant {} ({}) from khatmah {}", target.id, target.name, id);
        Ok(())
    })
    .await?;

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_trimmed_and_bounded() {
        assert_eq!(validate_name("name", "  Family  ").unwrap(), "Family");
        assert!(validate_name("name", "   ").is_err());
        assert!(validate_name("name", &"ق".repeat(MAX_NAME_LEN)).is_ok());
        assert!(validate_name("name", &"ق".repeat(MAX_NAME_LEN + 1)).is_err());
    }
}
