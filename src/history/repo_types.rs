use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Which endpoint produced a history row. Stored as text in the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryMode {
    Groq,
    Gemini,
    Both,
    CompareWithRubric,
}

impl QueryMode {
    pub fn as_str(self) -> &'static str {
        match self {
            QueryMode::Groq => "groq",
            QueryMode::Gemini => "gemini",
            QueryMode::Both => "both",
            QueryMode::CompareWithRubric => "compare_with_rubric",
        }
    }
}

/// One completed AI query. Immutable after creation; removed only by the
/// owning user's cascading deletion.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct QueryHistory {
    pub id: Uuid,
    pub user_id: Uuid,
    pub prompt: String,
    pub response_groq: Option<String>,
    pub response_gemini: Option<String>,
    pub mode: String,
    pub created_at: OffsetDateTime,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_maps_to_stored_strings() {
        assert_eq!(QueryMode::Groq.as_str(), "groq");
        assert_eq!(QueryMode::Gemini.as_str(), "gemini");
        assert_eq!(QueryMode::Both.as_str(), "both");
        assert_eq!(QueryMode::CompareWithRubric.as_str(), "compare_with_rubric");
    }

    #[test]
    fn mode_serde_matches_stored_strings() {
        let json = serde_json::to_string(&QueryMode::CompareWithRubric).unwrap();
        assert_eq!(json, "\"compare_with_rubric\"");
    }
}
