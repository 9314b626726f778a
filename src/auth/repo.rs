use async_trait::async_trait;
use uuid::Uuid;

use crate::auth::repo_types::{IssuedToken, NewUser, User};
use crate::db::PgStore;
use crate::error::{AppError, AppResult};

const USER_COLUMNS: &str =
    "id, email, password_hash, first_name, last_name, is_email_verified, created_at, updated_at";

/// Credential store: user rows.
#[async_trait]
pub trait UserRepo: Send + Sync {
    /// Inserts the user and its verification token as one unit.
    /// A taken email surfaces as `AppError::Conflict`.
    async fn create_user(&self, user: NewUser, verification: IssuedToken) -> AppResult<User>;
    async fn find_user_by_id(&self, id: Uuid) -> AppResult<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<User>>;
    async fn mark_email_verified(&self, id: Uuid) -> AppResult<Option<User>>;
}

/// Credential store: verification and password-reset tokens.
#[async_trait]
pub trait TokenRepo: Send + Sync {
    async fn verification_token(&self, user_id: Uuid) -> AppResult<Option<IssuedToken>>;
    async fn replace_verification_token(&self, next: IssuedToken) -> AppResult<Option<IssuedToken>>;
    /// Inserts or overwrites the user's single reset token.
    async fn upsert_reset_token(&self, next: IssuedToken) -> AppResult<IssuedToken>;
    async fn find_reset_token(&self, token: &str) -> AppResult<Option<IssuedToken>>;
    /// Deletes the token and stores the new hash atomically.
    /// Returns `false` when the token was already gone.
    async fn consume_reset_token(&self, token: &str, password_hash: &str) -> AppResult<bool>;
}

#[async_trait]
impl UserRepo for PgStore {
    async fn create_user(&self, user: NewUser, verification: IssuedToken) -> AppResult<User> {
        let mut tx = self.db.begin().await?;

        let created = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (id, email, password_hash, first_name, last_name)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO verification_tokens (user_id, token, expires_at)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(created.id)
        .bind(&verification.token)
        .bind(verification.expires_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(created)
    }

    async fn find_user_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn mark_email_verified(&self, id: Uuid) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users SET is_email_verified = TRUE, updated_at = NOW()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }
}

#[async_trait]
impl TokenRepo for PgStore {
    async fn verification_token(&self, user_id: Uuid) -> AppResult<Option<IssuedToken>> {
        let token = sqlx::query_as::<_, IssuedToken>(
            "SELECT user_id, token, expires_at FROM verification_tokens WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;
        Ok(token)
    }

    async fn replace_verification_token(&self, next: IssuedToken) -> AppResult<Option<IssuedToken>> {
        let token = sqlx::query_as::<_, IssuedToken>(
            r#"
            UPDATE verification_tokens
               SET token = $2, expires_at = $3, updated_at = NOW()
             WHERE user_id = $1
            RETURNING user_id, token, expires_at
            "#,
        )
        .bind(next.user_id)
        .bind(&next.token)
        .bind(next.expires_at)
        .fetch_optional(&self.db)
        .await?;
        Ok(token)
    }

    async fn upsert_reset_token(&self, next: IssuedToken) -> AppResult<IssuedToken> {
        let token = sqlx::query_as::<_, IssuedToken>(
            r#"
            INSERT INTO password_reset_tokens (user_id, token, expires_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id)
            DO UPDATE SET token = EXCLUDED.token,
                          expires_at = EXCLUDED.expires_at,
                          updated_at = NOW()
            RETURNING user_id, token, expires_at
            "#,
        )
        .bind(next.user_id)
        .bind(&next.token)
        .bind(next.expires_at)
        .fetch_one(&self.db)
        .await?;
        Ok(token)
    }

    async fn find_reset_token(&self, token: &str) -> AppResult<Option<IssuedToken>> {
        let row = sqlx::query_as::<_, IssuedToken>(
            "SELECT user_id, token, expires_at FROM password_reset_tokens WHERE token = $1",
        )
        .bind(token)
        .fetch_optional(&self.db)
        .await?;
        Ok(row)
    }

    async fn consume_reset_token(&self, token: &str, password_hash: &str) -> AppResult<bool> {
        let mut tx = self.db.begin().await?;

        // The DELETE takes the row lock; a concurrent consumer finds nothing.
        let owner: Option<(Uuid,)> = sqlx::query_as(
            "DELETE FROM password_reset_tokens WHERE token = $1 RETURNING user_id",
        )
        .bind(token)
        .fetch_optional(&mut *tx)
        .await?;

        let Some((user_id,)) = owner else {
            tx.rollback().await?;
            return Ok(false);
        };

        let updated = sqlx::query(
            "UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(user_id)
        .bind(password_hash)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() != 1 {
            tx.rollback().await?;
            return Err(AppError::not_found("user not found"));
        }

        tx.commit().await?;
        Ok(true)
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::tokens::{issue, RESET_TTL, VERIFICATION_TTL};
    use crate::db::testing::seed_user;
    use sqlx::PgPool;
    use time::OffsetDateTime;

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs DATABASE_URL"]
    async fn duplicate_email_is_a_conflict(pool: PgPool) {
        let store = PgStore { db: pool };
        seed_user(&store, "ann@example.com").await;

        let id = Uuid::new_v4();
        let err = store
            .create_user(
                NewUser {
                    id,
                    email: "ann@example.com".into(),
                    password_hash: "hash".into(),
                    first_name: "Ann".into(),
                    last_name: "Other".into(),
                },
                issue(id, VERIFICATION_TTL, OffsetDateTime::now_utc()),
            )
            .await
            .unwrap_err();
        assert!(
            matches!(err, AppError::Conflict(ref m) if m == "user with provided email already exists")
        );
        // The failed insert left no token behind.
        assert!(store.verification_token(id).await.unwrap().is_none());
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs DATABASE_URL"]
    async fn reset_token_is_consumed_once(pool: PgPool) {
        let store = PgStore { db: pool };
        let user_id = seed_user(&store, "ann@example.com").await;

        let first = store
            .upsert_reset_token(issue(user_id, RESET_TTL, OffsetDateTime::now_utc()))
            .await
            .unwrap();
        let second = store
            .upsert_reset_token(issue(user_id, RESET_TTL, OffsetDateTime::now_utc()))
            .await
            .unwrap();
        assert!(store.find_reset_token(&first.token).await.unwrap().is_none());

        assert!(store.consume_reset_token(&second.token, "new-hash").await.unwrap());
        assert!(!store.consume_reset_token(&second.token, "other-hash").await.unwrap());
        let user = store.find_user_by_id(user_id).await.unwrap().unwrap();
        assert_eq!(user.password_hash, "new-hash");
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs DATABASE_URL"]
    async fn verification_flag_and_token_replacement(pool: PgPool) {
        let store = PgStore { db: pool };
        let user_id = seed_user(&store, "ann@example.com").await;
        let original = store.verification_token(user_id).await.unwrap().unwrap();

        let next = issue(user_id, VERIFICATION_TTL, OffsetDateTime::now_utc());
        let replaced = store.replace_verification_token(next.clone()).await.unwrap();
        assert_eq!(replaced.map(|t| t.token), Some(next.token));
        assert_ne!(original.token, store.verification_token(user_id).await.unwrap().unwrap().token);

        let user = store.mark_email_verified(user_id).await.unwrap().unwrap();
        assert!(user.is_email_verified);
        assert!(store.mark_email_verified(Uuid::new_v4()).await.unwrap().is_none());
    }
}
