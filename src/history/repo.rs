use sqlx::PgPool;
use tracing::warn;
use uuid::Uuid;

use crate::auth::repo_types::User;
use crate::history::repo_types::{QueryHistory, QueryMode};
use crate::state::AppState;

/// History reads are capped at the most recent entries.
pub const HISTORY_LIMIT: i64 = 5;

impl QueryHistory {
    pub async fn insert(
        db: &PgPool,
        user_id: Uuid,
        prompt: &str,
        response_groq: Option<&str>,
        response_gemini: Option<&str>,
        mode: QueryMode,
    ) -> anyhow::Result<QueryHistory> {
        let row = sqlx::query_as::<_, QueryHistory>(
            r#"
            INSERT INTO query_history (user_id, prompt, response_groq, response_gemini, mode)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, user_id, prompt, response_groq, response_gemini, mode, created_at
            "#,
        )
        .bind(user_id)
        .bind(prompt)
        .bind(response_groq)
        .bind(response_gemini)
        .bind(mode.as_str())
        .fetch_one(db)
        .await?;
        Ok(row)
    }

    /// Most recent queries for one user, newest first.
    pub async fn list_recent(db: &PgPool, user_id: Uuid) -> anyhow::Result<Vec<QueryHistory>> {
        let rows = sqlx::query_as::<_, QueryHistory>(
            r#"
            SELECT id, user_id, prompt, response_groq, response_gemini, mode, created_at
            FROM query_history
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(HISTORY_LIMIT)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }
}

/// Best-effort history write shared by all AI endpoints. Skips silently when
/// the caller is unauthenticated or the user row is gone; write failures are
/// logged and swallowed so they never affect the response.
pub async fn record(
    state: &AppState,
    user_id: Option<Uuid>,
    prompt: &str,
    response_groq: Option<&str>,
    response_gemini: Option<&str>,
    mode: QueryMode,
) {
    let Some(user_id) = user_id else {
        return;
    };

    match User::find_by_id(&state.db, user_id).await {
        Ok(Some(_)) => {}
        Ok(None) => return,
        Err(e) => {
            warn!(user_id = %user_id, error = %e, "history user lookup failed");
            return;
        }
    }

    if let Err(e) = QueryHistory::insert(
        &state.db,
        user_id,
        prompt,
        response_groq,
        response_gemini,
        mode,
    )
    .await
    {
        warn!(user_id = %user_id, mode = mode.as_str(), error = %e, "history write failed");
    }
}
