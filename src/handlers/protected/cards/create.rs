// handlers/protected/cards/create.rs - POST /api/cards handler

use axum::{
    extract::{rejection::JsonRejection, State},
    Extension, Json,
};

use crate::cards::CardInput;
use crate::database::models::Card;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::state::AppState;

/// POST /api/cards - Add a card to the caller's wallet
pub async fn cards_post(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    payload: Result<Json<CardInput>, JsonRejection>,
) -> ApiResult<Card> {
    let Json(input) = payload?;
    let new_card = input.validate()?;

    let card = state.store.create_card(user.id, new_card).await?;
    tracing::info!(user_id = %user.id, card_id = %card.id, "card created");

    Ok(ApiResponse::created(card))
}
