use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::database::models::{Card, NewCard, NewRefreshToken, NewUser, RefreshToken, User};
use crate::database::store::Store;

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    cards: Vec<Card>,
    refresh_tokens: HashMap<String, RefreshToken>,
}

/// In-process store for development and tests. Contents are lost on restart.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn health_check(&self) -> Result<(), DatabaseError> {
        Ok(())
    }

    async fn create_user(&self, user: NewUser) -> Result<User, DatabaseError> {
        let mut tables = self.tables.write().await;

        if tables.users.values().any(|u| u.username == user.username) {
            return Err(DatabaseError::Conflict("Username is already taken".to_string()));
        }
        if tables.users.values().any(|u| u.email == user.email) {
            return Err(DatabaseError::Conflict("Email is already registered".to_string()));
        }

        let record = User {
            id: Uuid::new_v4(),
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
            created_at: Utc::now(),
        };
        tables.users.insert(record.id, record.clone());
        Ok(record)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.email == email).cloned())
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, DatabaseError> {
        let tables = self.tables.read().await;
        Ok(tables.users.get(&id).cloned())
    }

    async fn list_cards(&self, user_id: Uuid) -> Result<Vec<Card>, DatabaseError> {
        let tables = self.tables.read().await;
        Ok(tables
            .cards
            .iter()
            .filter(|c| c.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn find_card(&self, user_id: Uuid, card_id: Uuid) -> Result<Option<Card>, DatabaseError> {
        let tables = self.tables.read().await;
        Ok(tables
            .cards
            .iter()
            .find(|c| c.id == card_id && c.user_id == user_id)
            .cloned())
    }

    async fn create_card(&self, user_id: Uuid, card: NewCard) -> Result<Card, DatabaseError> {
        let mut tables = self.tables.write().await;

        if !tables.users.contains_key(&user_id) {
            return Err(DatabaseError::NotFound(format!("user {} does not exist", user_id)));
        }

        let record = Card {
            id: Uuid::new_v4(),
            user_id,
            store_name: card.store_name,
            card_number: card.card_number,
            color: card.color,
            is_qr_code: card.is_qr_code,
            created_at: Utc::now(),
        };
        // Appending keeps insertion order, which is creation order
        tables.cards.push(record.clone());
        Ok(record)
    }

    async fn delete_card(&self, user_id: Uuid, card_id: Uuid) -> Result<bool, DatabaseError> {
        let mut tables = self.tables.write().await;
        let before = tables.cards.len();
        tables
            .cards
            .retain(|c| !(c.id == card_id && c.user_id == user_id));
        Ok(tables.cards.len() < before)
    }

    async fn insert_refresh_token(&self, token: NewRefreshToken) -> Result<(), DatabaseError> {
        let mut tables = self.tables.write().await;
        let now = Utc::now();
        tables
            .refresh_tokens
            .retain(|_, t| !(t.user_id == token.user_id && t.expires_at <= now));
        if tables.refresh_tokens.contains_key(&token.token_hash) {
            return Err(DatabaseError::Conflict("Record already exists".to_string()));
        }
        let record = RefreshToken {
            id: Uuid::new_v4(),
            user_id: token.user_id,
            token_hash: token.token_hash,
            expires_at: token.expires_at,
            created_at: Utc::now(),
        };
        tables.refresh_tokens.insert(record.token_hash.clone(), record);
        Ok(())
    }

    async fn take_refresh_token(&self, token_hash: &str) -> Result<Option<RefreshToken>, DatabaseError> {
        let mut tables = self.tables.write().await;
        Ok(tables.refresh_tokens.remove(token_hash))
    }

    async fn revoke_refresh_token(&self, token_hash: &str) -> Result<bool, DatabaseError> {
        let mut tables = self.tables.write().await;
        Ok(tables.refresh_tokens.remove(token_hash).is_some())
    }

    async fn revoke_user_refresh_tokens(&self, user_id: Uuid) -> Result<u64, DatabaseError> {
        let mut tables = self.tables.write().await;
        let before = tables.refresh_tokens.len();
        tables.refresh_tokens.retain(|_, t| t.user_id != user_id);
        Ok((before - tables.refresh_tokens.len()) as u64)
    }
}
