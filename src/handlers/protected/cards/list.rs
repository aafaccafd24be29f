// handlers/protected/cards/list.rs - GET /api/cards handler

use axum::{
    extract::{Query, State},
    Extension,
};
use serde::Deserialize;

use crate::cards::matches_search;
use crate::database::models::Card;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    /// Case-insensitive store name filter
    pub q: Option<String>,
}

/// GET /api/cards - The caller's cards, oldest first
pub async fn cards_get(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Vec<Card>> {
    let mut cards = state.store.list_cards(user.id).await?;

    if let Some(q) = query.q.as_deref() {
        cards.retain(|card| matches_search(&card.store_name, q));
    }

    Ok(ApiResponse::success(cards))
}
