use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::manager::{DatabaseError, DatabaseManager};
use crate::database::models::{Card, NewCard, NewRefreshToken, NewUser, RefreshToken, User};
use crate::database::store::Store;

const USER_COLUMNS: &str = "id, username, email, password_hash, created_at";
const CARD_COLUMNS: &str = "id, user_id, store_name, card_number, color, is_qr_code, created_at";

/// Postgres-backed store
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Translate unique violations into conflicts naming the offending field
fn map_unique_violation(err: sqlx::Error) -> DatabaseError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            let message = match db_err.constraint() {
                Some("users_username_key") => "Username is already taken",
                Some("users_email_key") => "Email is already registered",
                _ => "Record already exists",
            };
            return DatabaseError::Conflict(message.to_string());
        }
    }
    DatabaseError::Sqlx(err)
}

#[async_trait]
impl Store for PgStore {
    async fn health_check(&self) -> Result<(), DatabaseError> {
        DatabaseManager::health_check(&self.pool).await
    }

    async fn create_user(&self, user: NewUser) -> Result<User, DatabaseError> {
        let sql = format!(
            "INSERT INTO users (id, username, email, password_hash, created_at)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {USER_COLUMNS}"
        );

        sqlx::query_as::<_, User>(&sql)
            .bind(Uuid::new_v4())
            .bind(&user.username)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(Utc::now())
            .fetch_one(&self.pool)
            .await
            .map_err(map_unique_violation)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, DatabaseError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn list_cards(&self, user_id: Uuid) -> Result<Vec<Card>, DatabaseError> {
        let sql = format!("SELECT {CARD_COLUMNS} FROM cards WHERE user_id = $1 ORDER BY created_at, id");
        let cards = sqlx::query_as::<_, Card>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(cards)
    }

    async fn find_card(&self, user_id: Uuid, card_id: Uuid) -> Result<Option<Card>, DatabaseError> {
        let sql = format!("SELECT {CARD_COLUMNS} FROM cards WHERE id = $1 AND user_id = $2");
        let card = sqlx::query_as::<_, Card>(&sql)
            .bind(card_id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(card)
    }

    async fn create_card(&self, user_id: Uuid, card: NewCard) -> Result<Card, DatabaseError> {
        let sql = format!(
            "INSERT INTO cards (id, user_id, store_name, card_number, color, is_qr_code, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {CARD_COLUMNS}"
        );

        let card = sqlx::query_as::<_, Card>(&sql)
            .bind(Uuid::new_v4())
            .bind(user_id)
            .bind(&card.store_name)
            .bind(&card.card_number)
            .bind(&card.color)
            .bind(card.is_qr_code)
            .bind(Utc::now())
            .fetch_one(&self.pool)
            .await?;
        Ok(card)
    }

    async fn delete_card(&self, user_id: Uuid, card_id: Uuid) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM cards WHERE id = $1 AND user_id = $2")
            .bind(card_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_refresh_token(&self, token: NewRefreshToken) -> Result<(), DatabaseError> {
        sqlx::query("DELETE FROM refresh_tokens WHERE user_id = $1 AND expires_at <= $2")
            .bind(token.user_id)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        sqlx::query(
            "INSERT INTO refresh_tokens (id, user_id, token_hash, expires_at, created_at)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(Uuid::new_v4())
        .bind(token.user_id)
        .bind(&token.token_hash)
        .bind(token.expires_at)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(map_unique_violation)?;
        Ok(())
    }

    async fn take_refresh_token(&self, token_hash: &str) -> Result<Option<RefreshToken>, DatabaseError> {
        // DELETE ... RETURNING makes the consume atomic across concurrent refreshes
        let token = sqlx::query_as::<_, RefreshToken>(
            "DELETE FROM refresh_tokens WHERE token_hash = $1
             RETURNING id, user_id, token_hash, expires_at, created_at",
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await?;
        Ok(token)
    }

    async fn revoke_refresh_token(&self, token_hash: &str) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE token_hash = $1")
            .bind(token_hash)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn revoke_user_refresh_tokens(&self, user_id: Uuid) -> Result<u64, DatabaseError> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
