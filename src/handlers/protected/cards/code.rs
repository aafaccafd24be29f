// handlers/protected/cards/code.rs - GET /api/cards/:id/code handler

use axum::{
    extract::{Path, State},
    http::{
        header::{CACHE_CONTROL, CONTENT_TYPE},
        HeaderName,
    },
    response::{IntoResponse, Response},
    Extension,
};

use crate::cards::{render_svg, Symbology};
use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::state::AppState;

use super::{card_not_found, parse_card_id};

pub const SYMBOLOGY_HEADER: HeaderName = HeaderName::from_static("x-card-symbology");

/// GET /api/cards/:id/code - SVG rendering of the card's barcode or QR code
///
/// The symbology follows the card's stored `is_qr_code` flag and is echoed in
/// the `X-Card-Symbology` header.
pub async fn card_code_get(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let card_id = parse_card_id(&id)?;
    let card = state
        .store
        .find_card(user.id, card_id)
        .await?
        .ok_or_else(card_not_found)?;

    let svg = render_svg(&card)?;
    let symbology = Symbology::for_card(&card);

    Ok((
        [
            (CONTENT_TYPE, "image/svg+xml"),
            (CACHE_CONTROL, "private, no-store"),
            (SYMBOLOGY_HEADER, symbology.as_str()),
        ],
        svg,
    )
        .into_response())
}
