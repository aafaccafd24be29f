use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A store card owned by exactly one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Card {
    pub id: Uuid,
    pub user_id: Uuid,
    pub store_name: String,
    pub card_number: String,
    pub color: String,
    pub is_qr_code: bool,
    pub created_at: DateTime<Utc>,
}

/// A validated card ready for insertion. Built by `cards::CardInput::validate`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCard {
    pub store_name: String,
    pub card_number: String,
    pub color: String,
    pub is_qr_code: bool,
}
