use async_trait::async_trait;
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::database::models::{Card, NewCard, NewRefreshToken, NewUser, RefreshToken, User};

/// Persistence boundary for users, cards and refresh tokens.
///
/// Every card operation takes the owning user id; implementations must never
/// return or remove a card belonging to a different user.
#[async_trait]
pub trait Store: Send + Sync + 'static {
    async fn health_check(&self) -> Result<(), DatabaseError>;

    /// Insert a user. Duplicate username or email yields `DatabaseError::Conflict`.
    async fn create_user(&self, user: NewUser) -> Result<User, DatabaseError>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError>;
    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, DatabaseError>;

    /// All cards for a user, oldest first.
    async fn list_cards(&self, user_id: Uuid) -> Result<Vec<Card>, DatabaseError>;
    async fn find_card(&self, user_id: Uuid, card_id: Uuid) -> Result<Option<Card>, DatabaseError>;
    async fn create_card(&self, user_id: Uuid, card: NewCard) -> Result<Card, DatabaseError>;
    /// Returns false when no card with that id is owned by the user.
    async fn delete_card(&self, user_id: Uuid, card_id: Uuid) -> Result<bool, DatabaseError>;

    /// Also drops the user's expired tokens.
    async fn insert_refresh_token(&self, token: NewRefreshToken) -> Result<(), DatabaseError>;
    /// Remove and return the token with this hash. A token can be taken once.
    async fn take_refresh_token(&self, token_hash: &str) -> Result<Option<RefreshToken>, DatabaseError>;
    async fn revoke_refresh_token(&self, token_hash: &str) -> Result<bool, DatabaseError>;
    async fn revoke_user_refresh_tokens(&self, user_id: Uuid) -> Result<u64, DatabaseError>;
}
