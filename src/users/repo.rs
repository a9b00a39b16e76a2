use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::repo_types::User;
use crate::users::dto::ProfilePatch;

impl User {
    /// Apply a partial profile update. COALESCE keeps the stored value for
    /// every key absent from the patch.
    pub async fn update_profile(
        db: &PgPool,
        id: Uuid,
        patch: &ProfilePatch,
    ) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users SET
                username   = COALESCE($2, username),
                first_name = COALESCE($3, first_name),
                last_name  = COALESCE($4, last_name),
                phone      = COALESCE($5, phone),
                location   = COALESCE($6, location),
                bio        = COALESCE($7, bio)
            WHERE id = $1
            RETURNING id, email, username, password_hash, first_name, last_name,
                      phone, location, bio, created_at
            "#,
        )
        .bind(id)
        .bind(patch.username.as_deref())
        .bind(patch.first_name.as_deref())
        .bind(patch.last_name.as_deref())
        .bind(patch.phone.as_deref())
        .bind(patch.location.as_deref())
        .bind(patch.bio.as_deref())
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Delete the user row; owned history rows cascade at the database level.
    pub async fn delete(db: &PgPool, id: Uuid) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
