use chrono::{DateTime, Utc};
use rand::RngCore;
use sha2::{Digest, Sha256};
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use rizqtutor_common::AppError;
use rizqtutor_database::{LessonStatus, TokenPurpose};

/// A link token row that passed every redemption predicate: unused,
/// unexpired, purpose- and lesson-matched, with the lesson in the status
/// the purpose requires.
#[derive(Debug, sqlx::FromRow)]
pub struct RedeemableToken {
    pub token_id: Uuid,
    pub tutor_id: Uuid,
    pub confirmed_start_at_utc: Option<DateTime<Utc>>,
}

/// Issues and verifies single-use, purpose-scoped link tokens. Only the
/// SHA-256 digest is persisted; the raw token travels once to the caller.
pub struct TokenService;

impl TokenService {
    /// 256-bit random token, hex-encoded, plus its persisted digest.
    pub fn generate() -> (String, String) {
        let mut bytes = [0u8; 32];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        let token = hex::encode(bytes);
        let hash = Self::hash(&token);
        (token, hash)
    }

    pub fn hash(token: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(token.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Persists a new token inside the caller's transaction and hands the
    /// raw token back exactly once for out-of-band delivery.
    pub async fn issue(
        tx: &mut Transaction<'_, Postgres>,
        lesson_id: Uuid,
        purpose: TokenPurpose,
        expires_at: DateTime<Utc>,
    ) -> Result<String, AppError> {
        let (token, hash) = Self::generate();

        sqlx::query(
            "INSERT INTO link_tokens (lesson_id, token_hash, purpose, expires_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(lesson_id)
        .bind(&hash)
        .bind(purpose)
        .bind(expires_at)
        .execute(&mut **tx)
        .await
        .map_err(AppError::Database)?;

        Ok(token)
    }

    /// Looks up a token eligible to authorize a transition. Every failure
    /// mode (hash miss, wrong purpose, expired, used, incompatible lesson
    /// status) collapses to `None` so callers cannot leak why.
    ///
    /// Does not mark the token used; the caller does that atomically with
    /// the transition it authorizes.
    pub async fn find_redeemable(
        tx: &mut Transaction<'_, Postgres>,
        token: &str,
        purpose: TokenPurpose,
        lesson_id: Uuid,
        required_status: LessonStatus,
    ) -> Result<Option<RedeemableToken>, AppError> {
        let token_hash = Self::hash(token);

        sqlx::query_as::<_, RedeemableToken>(
            r#"
            SELECT ltok.id AS token_id, l.tutor_id, l.confirmed_start_at_utc
            FROM link_tokens ltok
            JOIN lessons l ON ltok.lesson_id = l.id
            WHERE ltok.token_hash = $1
              AND ltok.purpose = $2
              AND l.id = $3
              AND ltok.expires_at > NOW()
              AND ltok.used_at IS NULL
              AND l.status = $4
            "#,
        )
        .bind(&token_hash)
        .bind(purpose)
        .bind(lesson_id)
        .bind(required_status)
        .fetch_optional(&mut **tx)
        .await
        .map_err(AppError::Database)
    }

    /// Invalidates a token. Zero affected rows means a concurrent
    /// redemption won the race; the caller must treat the token as invalid
    /// and roll back.
    pub async fn mark_used(
        tx: &mut Transaction<'_, Postgres>,
        token_id: Uuid,
    ) -> Result<u64, AppError> {
        let result =
            sqlx::query("UPDATE link_tokens SET used_at = NOW() WHERE id = $1 AND used_at IS NULL")
                .bind(token_id)
                .execute(&mut **tx)
                .await
                .map_err(AppError::Database)?;

        Ok(result.rows_affected())
    }
}
