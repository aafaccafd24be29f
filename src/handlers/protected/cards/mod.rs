// handlers/protected/cards/mod.rs - Store card endpoints scoped to the caller

pub mod code;
pub mod create;
pub mod delete;
pub mod get;
pub mod list;

pub use code::card_code_get;
pub use create::cards_post;
pub use delete::{card_delete, cards_delete};
pub use get::card_get;
pub use list::cards_get;

use uuid::Uuid;

use crate::error::ApiError;

/// Parse a card id from the path or body
pub(crate) fn parse_card_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw.trim()).map_err(|_| ApiError::bad_request("Invalid card id"))
}

pub(crate) fn card_not_found() -> ApiError {
    ApiError::not_found("Card not found")
}
