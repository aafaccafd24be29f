//! Store card input rules and code rendering.

pub mod codes;

use serde::{Deserialize, Serialize};

use crate::database::models::NewCard;
use crate::validation::FieldErrors;

pub use codes::{render_svg, render_terminal, CodeError, Symbology};

/// Color given to cards created without one
pub const DEFAULT_COLOR: &str = "#6fffe9";

pub const MAX_STORE_NAME_LENGTH: usize = 100;
pub const MAX_CARD_NUMBER_LENGTH: usize = 512;
/// CODE128 payloads longer than this do not scan reliably from a phone screen
pub const MAX_BARCODE_LENGTH: usize = 80;

/// Card creation request body. Accepts the camelCase names older clients send.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CardInput {
    #[serde(alias = "storeName")]
    pub store_name: String,
    #[serde(alias = "cardNumber")]
    pub card_number: String,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default, alias = "isQRCode", alias = "isQrCode")]
    pub is_qr_code: bool,
}

impl CardInput {
    pub fn validate(self) -> Result<NewCard, FieldErrors> {
        let store_name = self.store_name.trim().to_string();
        let card_number = self.card_number.trim().to_string();

        let mut errors = FieldErrors::new();

        if store_name.is_empty() {
            errors.add("store_name", "Store name is required");
        } else if store_name.chars().count() > MAX_STORE_NAME_LENGTH {
            errors.add(
                "store_name",
                format!("Store name must be at most {} characters", MAX_STORE_NAME_LENGTH),
            );
        }

        if card_number.is_empty() {
            errors.add("card_number", "Card number is required");
        } else if card_number.chars().count() > MAX_CARD_NUMBER_LENGTH {
            errors.add(
                "card_number",
                format!("Card number must be at most {} characters", MAX_CARD_NUMBER_LENGTH),
            );
        } else if !self.is_qr_code {
            errors.check("card_number", validate_barcode_payload(&card_number));
        }

        let color = match self.color.as_deref().map(str::trim) {
            None | Some("") => DEFAULT_COLOR.to_string(),
            Some(raw) => match normalize_color(raw) {
                Some(color) => color,
                None => {
                    errors.add("color", "Color must be 6 hex digits, e.g. #6FFFE9");
                    String::new()
                }
            },
        };

        errors.into_result(NewCard {
            store_name,
            card_number,
            color,
            is_qr_code: self.is_qr_code,
        })
    }
}

/// Normalize `#RRGGBB` or `RRGGBB` to lowercase `#rrggbb`
pub fn normalize_color(raw: &str) -> Option<String> {
    let hex = raw.strip_prefix('#').unwrap_or(raw);
    if hex.len() == 6 && hex.chars().all(|c| c.is_ascii_hexdigit()) {
        Some(format!("#{}", hex.to_ascii_lowercase()))
    } else {
        None
    }
}

/// CODE128 (set B) covers printable ASCII only
pub fn validate_barcode_payload(payload: &str) -> Result<(), String> {
    if payload.chars().count() > MAX_BARCODE_LENGTH {
        return Err(format!(
            "Barcode numbers must be at most {} characters; use a QR code for longer payloads",
            MAX_BARCODE_LENGTH
        ));
    }
    if let Some(c) = payload.chars().find(|c| !(' '..='~').contains(c)) {
        return Err(format!("Character {:?} cannot be encoded in a barcode", c));
    }
    Ok(())
}

/// Keep only digits, as the add-card form does for barcode cards
pub fn sanitize_barcode_number(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_digit).collect()
}

/// Case-insensitive store-name match used by card search
pub fn matches_search(store_name: &str, query: &str) -> bool {
    let query = query.trim();
    query.is_empty() || store_name.to_lowercase().contains(&query.to_lowercase())
}
