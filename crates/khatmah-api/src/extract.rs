use axum::extract::{FromRequest, FromRequestParts, Multipart, Request};
use axum::http::header::CONTENT_TYPE;
use bytes::Bytes;
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use khatmah_types::api::CreateKhatmahRequest;
use khatmah_types::models::KhatmahType;

use crate::error::ApiError;
use crate::images::UploadedImage;
use crate::state::AppState;

/// `axum::Json` with rejections reported as [`ApiError::Validation`].
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);

/// JSON body that may be left out entirely; a bodyless request yields
/// `T::default()`.
pub struct OptionalJson<T>(pub T);

impl<T, S> FromRequest<S> for OptionalJson<T>
where
    T: DeserializeOwned + Default,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        if req.headers().contains_key(CONTENT_TYPE) {
            let ApiJson(value) = ApiJson::<T>::from_request(req, state).await?;
            return Ok(Self(value));
        }

        let body = Bytes::from_request(req, state)
            .await
            .map_err(|e| ApiError::validation(e.body_text()))?;
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self(T::default()));
        }
        Err(ApiError::validation(
            "Expected request with `Content-Type: application/json`",
        ))
    }
}

/// Body of `POST /khatmahs/`: JSON, or multipart with an optional `image` part.
pub struct CreateKhatmahForm {
    pub request: CreateKhatmahRequest,
    pub image: Option<UploadedImage>,
}

impl FromRequest<AppState> for CreateKhatmahForm {
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &AppState) -> Result<Self, Self::Rejection> {
        let is_multipart = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("multipart/form-data"));

        if !is_multipart {
            let ApiJson(request) = ApiJson::<CreateKhatmahRequest>::from_request(req, state).await?;
            return Ok(Self {
                request,
                image: None,
            });
        }

        let mut multipart = Multipart::from_request(req, state).await?;
        let mut fields = FormFields::default();
        let mut image = None;

        while let Some(field) = multipart.next_field().await? {
            let Some(name) = field.name().map(str::to_owned) else {
                continue;
            };
            if name == "image" {
                let content_type = field.content_type().map(str::to_owned);
                let data: Bytes = field.bytes().await?;
                if !data.is_empty() {
                    image = Some(UploadedImage::new(content_type.as_deref(), data)?);
                }
                continue;
            }
            let value = field.text().await?;
            fields.set(&name, value);
        }

        Ok(Self {
            request: fields.into_request()?,
            image,
        })
    }
}

/// Text parts of a multipart khatmah form, before validation.
#[derive(Default)]
struct FormFields {
    name: Option<String>,
    is_private: Option<String>,
    require_name: Option<String>,
    end_date: Option<String>,
    image_url: Option<String>,
    khatmah_type: Option<String>,
    creator_token: Option<String>,
}

impl FormFields {
    fn set(&mut self, field: &str, value: String) {
        let slot = match field {
            "name" => &mut self.name,
            "is_private" => &mut self.is_private,
            "require_name" => &mut self.require_name,
            "end_date" => &mut self.end_date,
            "image_url" => &mut self.image_url,
            "khatmah_type" => &mut self.khatmah_type,
            "creator_token" => &mut self.creator_token,
            _ => return,
        };
        let value = value.trim();
        *slot = (!value.is_empty()).then(|| value.to_owned());
    }

    fn into_request(self) -> Result<CreateKhatmahRequest, ApiError> {
        Ok(CreateKhatmahRequest {
            name: self.name.unwrap_or_default(),
            is_private: parse_flag("is_private", self.is_private)?.unwrap_or(false),
            require_name: parse_flag("require_name", self.require_name)?.unwrap_or(true),
            end_date: self
                .end_date
                .map(|raw| {
                    raw.parse::<NaiveDate>().map_err(|_| {
                        ApiError::validation(format!("end_date '{}' is not a YYYY-MM-DD date", raw))
                    })
                })
                .transpose()?,
            image_url: self.image_url,
            khatmah_type: self
                .khatmah_type
                .map(|raw| raw.parse::<KhatmahType>().map_err(ApiError::Validation))
                .transpose()?
                .unwrap_or_default(),
            creator_token: self
                .creator_token
                .map(|raw| {
                    raw.parse::<Uuid>().map_err(|_| {
                        ApiError::validation("creator_token must be a valid UUID")
                    })
                })
                .transpose()?,
        })
    }
}

fn parse_flag(field: &str, raw: Option<String>) -> Result<Option<bool>, ApiError> {
    raw.map(|raw| match raw.to_ascii_lowercase().as_str() {
        "true" | "1" | "on" | "yes" => Ok(true),
        "false" | "0" | "off" | "no" => Ok(false),
        _ => Err(ApiError::validation(format!("{} must be a boolean, got '{}'", field, raw))),
    })
    .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn form_fields_into_request() {
        let mut fields = FormFields::default();
        fields.set("name", " Family khatmah ".into());
        fields.set("is_private", "on".into());
        fields.set("require_name", "false".into());
        fields.set("end_date", "2025-03-30".into());
        fields.set("khatmah_type", "surah".into());
        fields.set("creator_token", "".into());
        fields.set("colour", "green".into());

        let req = fields.into_request().unwrap();
        assert_eq!(req.name, "Family khatmah");
        assert!(req.is_private);
        assert!(!req.require_name);
        assert_eq!(req.end_date, NaiveDate::from_ymd_opt(2025, 3, 30));
        assert_eq!(req.khatmah_type, KhatmahType::Surah);
        assert_eq!(req.creator_token, None);
    }

    #[test]
    fn form_defaults_match_json_defaults() {
        let mut fields = FormFields::default();
        fields.set("name", "Family".into());
        let req = fields.into_request().unwrap();
        assert!(!req.is_private);
        assert!(req.require_name);
        assert_eq!(req.khatmah_type, KhatmahType::Juz);
    }

    #[test]
    fn malformed_form_values_are_rejected() {
        let mut fields = FormFields::default();
        fields.set("creator_token", "not-a-uuid".into());
        assert!(matches!(fields.into_request(), Err(ApiError::Validation(_))));

        let mut fields = FormFields::default();
        fields.set("is_private", "maybe".into());
        assert!(matches!(fields.into_request(), Err(ApiError::Validation(_))));

        let mut fields = FormFields::default();
        fields.set("khatmah_type", "hizb".into());
        assert!(matches!(fields.into_request(), Err(ApiError::Validation(_))));
    }
}
