//! Who may change a khatmah, and who gets to see its creator token.
//!
//! There are no accounts. Whoever holds the `creator_token` handed out at
//! creation owns the khatmah; so does the participant recorded as its
//! creator, which lets a creator act from a device that only remembers its
//! participant id.

use tracing::warn;
use uuid::Uuid;

use khatmah_db::models::KhatmahRow;
use khatmah_types::api::OwnerCredentials;

use crate::error::ApiError;

/// Name given to readers who join without one, where the khatmah allows it.
pub const ANONYMOUS_READER: &str = "Anonymous Reader";

/// Whether a khatmah representation may carry its creator token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenVisibility {
    Reveal,
    Hide,
}

impl TokenVisibility {
    /// Reveal only to a requester who already presented the exact token.
    pub fn for_presented(khatmah: &KhatmahRow, presented: Option<Uuid>) -> Self {
        if presented == Some(khatmah.creator_token) {
            Self::Reveal
        } else {
            Self::Hide
        }
    }
}

/// Checks that the caller owns `khatmah`.
///
/// A khatmah without a recorded creator is open to everyone.
pub fn authorize(khatmah: &KhatmahRow, credentials: &OwnerCredentials) -> Result<(), ApiError> {
    let Some(creator_id) = khatmah.creator_id else {
        return Ok(());
    };

    let token_matches = credentials.creator_token == Some(khatmah.creator_token);
    let is_creator = credentials.participant_id == Some(creator_id);
    if token_matches || is_creator {
        return Ok(());
    }

    warn!("Rejected ownership claim on khatmah {}", khatmah.id);
    Err(ApiError::Forbidden(
        "Only the creator of this khatmah can perform this action".into(),
    ))
}

/// True when a joining reader presents the token and should become creator.
pub fn presents_creator_token(khatmah: &KhatmahRow, token: Option<Uuid>) -> bool {
    token == Some(khatmah.creator_token)
}

/// Display name for a new participant.
pub fn participant_name(require_name: bool, name: Option<&str>) -> Result<String, ApiError> {
    match name.map(str::trim).filter(|n| !n.is_empty()) {
        Some(name) => Ok(name.to_owned()),
        None if require_name => Err(ApiError::validation("Name is required")),
        None => Ok(ANONYMOUS_READER.to_owned()),
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use khatmah_types::models::KhatmahType;

    use super::*;

    fn khatmah(creator_id: Option<Uuid>) -> KhatmahRow {
        KhatmahRow {
            id: Uuid::new_v4(),
            name: "Ramadan circle".into(),
            created_at: Utc::now(),
            is_private: false,
            require_name: true,
            end_date: None,
            image_url: None,
            khatmah_type: KhatmahType::Juz,
            creator_id,
            creator_token: Uuid::new_v4(),
        }
    }

    fn creds(token: Option<Uuid>, participant: Option<Uuid>) -> OwnerCredentials {
        OwnerCredentials {
            creator_token: token,
            participant_id: participant,
        }
    }

    #[test]
    fn open_until_creator_recorded() {
        let k = khatmah(None);
        assert!(authorize(&k, &creds(None, None)).is_ok());
        assert!(authorize(&k, &creds(Some(Uuid::new_v4()), None)).is_ok());
    }

    #[test]
    fn token_or_creator_id_grants_access() {
        let creator = Uuid::new_v4();
        let k = khatmah(Some(creator));

        assert!(authorize(&k, &creds(Some(k.creator_token), None)).is_ok());
        assert!(authorize(&k, &creds(None, Some(creator))).is_ok());
        // One good credential is enough.
        assert!(authorize(&k, &creds(Some(Uuid::new_v4()), Some(creator))).is_ok());
    }

    #[test]
    fn everyone_else_is_forbidden() {
        let k = khatmah(Some(Uuid::new_v4()));

        for c in [
            creds(None, None),
            creds(Some(Uuid::new_v4()), None),
            creds(None, Some(Uuid::new_v4())),
            creds(Some(Uuid::new_v4()), Some(Uuid::new_v4())),
        ] {
            assert!(matches!(authorize(&k, &c), Err(ApiError::Forbidden(_))));
        }
    }

    #[test]
    fn token_visibility() {
        let k = khatmah(None);
        assert_eq!(TokenVisibility::for_presented(&k, Some(k.creator_token)), TokenVisibility::Reveal);
        assert_eq!(TokenVisibility::for_presented(&k, Some(Uuid::new_v4())), TokenVisibility::Hide);
        assert_eq!(TokenVisibility::for_presented(&k, None), TokenVisibility::Hide);
    }

    #[test]
    fn names() {
        assert_eq!(participant_name(false, None).unwrap(), ANONYMOUS_READER);
        assert_eq!(participant_name(false, Some("   ")).unwrap(), ANONYMOUS_READER);
        assert_eq!(participant_name(true, Some(" Aisha ")).unwrap(), "Aisha");
        assert_eq!(participant_name(false, Some("Omar")).unwrap(), "Omar");
        assert!(matches!(participant_name(true, None), Err(ApiError::Validation(_))));
        assert!(matches!(participant_name(true, Some("\t")), Err(ApiError::Validation(_))));
    }
}
