use axum::Json;
use tracing::debug;

use khatmah_compute::qibla::{QiblaError, parse_coordinates, qibla_direction, round_bearing};
use khatmah_types::api::QiblaResponse;

use crate::error::ApiError;
use crate::extract::ApiPath;

impl From<QiblaError> for ApiError {
    fn from(err: QiblaError) -> Self {
        match err {
            QiblaError::InvalidArgument(msg) => Self::Validation(msg),
        }
    }
}

/// GET /qibla/{lat}/{lon}/
pub async fn qibla(
    ApiPath((latitude, longitude)): ApiPath<(String, String)>,
) -> Result<Json<QiblaResponse>, ApiError> {
    let (latitude, longitude) = parse_coordinates(&latitude, &longitude)?;
    let direction = qibla_direction(latitude, longitude)?;
    debug!("Qibla from ({}, {}) is {:.4}", latitude, longitude, direction);

    Ok(Json(QiblaResponse {
        latitude,
        longitude,
        direction: round_bearing(direction),
        direction_raw: direction,
    }))
}
