use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::repo_types::User;
use crate::history::QueryHistory;

/// Partial profile update. Only keys present in the payload are applied;
/// an explicit empty string is a real value, distinct from an absent key.
#[derive(Debug, Default, Deserialize)]
pub struct ProfilePatch {
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub bio: Option<String>,
}

/// Profile view. Unset optional fields render as empty strings.
#[derive(Debug, Serialize)]
pub struct Profile {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub location: String,
    pub bio: String,
}

impl From<&User> for Profile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            username: user.username.clone(),
            first_name: user.first_name.clone().unwrap_or_default(),
            last_name: user.last_name.clone().unwrap_or_default(),
            phone: user.phone.clone().unwrap_or_default(),
            location: user.location.clone().unwrap_or_default(),
            bio: user.bio.clone().unwrap_or_default(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HistoryResponses {
    pub groq: Option<String>,
    pub gemini: Option<String>,
}

/// One history row as listed by GET /users/queries.
#[derive(Debug, Serialize)]
pub struct HistoryEntry {
    pub id: Uuid,
    pub prompt: String,
    pub mode: String,
    pub created_at: OffsetDateTime,
    pub responses: HistoryResponses,
}

impl From<QueryHistory> for HistoryEntry {
    fn from(row: QueryHistory) -> Self {
        Self {
            id: row.id,
            prompt: row.prompt,
            mode: row.mode,
            created_at: row.created_at,
            responses: HistoryResponses {
                groq: row.response_groq,
                gemini: row.response_gemini,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patch_distinguishes_absent_from_empty() {
        let patch: ProfilePatch = serde_json::from_str(r#"{"bio":""}"#).unwrap();
        assert_eq!(patch.bio.as_deref(), Some(""));
        assert!(patch.first_name.is_none());
        assert!(patch.username.is_none());
    }

    #[test]
    fn profile_renders_unset_fields_as_empty_strings() {
        let user = User {
            id: Uuid::new_v4(),
            email: "x@x.com".into(),
            username: "x".into(),
            password_hash: "hash".into(),
            first_name: None,
            last_name: Some("Doe".into()),
            phone: None,
            location: None,
            bio: None,
            created_at: OffsetDateTime::UNIX_EPOCH,
        };
        let profile = Profile::from(&user);
        assert_eq!(profile.first_name, "");
        assert_eq!(profile.last_name, "Doe");

        let json = serde_json::to_string(&profile).unwrap();
        assert!(json.contains("\"bio\":\"\""));
        assert!(!json.contains("password"));
    }
}
