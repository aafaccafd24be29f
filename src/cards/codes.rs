//! Barcode and QR rendering for store cards.
//!
//! The card's `is_qr_code` flag alone decides the symbology: QR when set,
//! CODE128 otherwise.

use barcoders::generators::svg::SVG;
use barcoders::sym::code128::Code128;
use qrcode::render::{svg, unicode};
use qrcode::QrCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::database::models::Card;

/// Code128 character set B selector understood by `barcoders`
const CODE128_SET_B: char = 'Ɓ';
const BARCODE_HEIGHT_PX: u32 = 60;
const BARCODE_TERMINAL_ROWS: usize = 4;
const QR_MIN_SIZE_PX: u32 = 200;
const INK: &str = "#1c1c1e";

#[derive(Debug, Error)]
pub enum CodeError {
    #[error("cannot encode barcode: {0}")]
    Barcode(String),

    #[error("cannot encode QR code: {0}")]
    Qr(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Symbology {
    Code128,
    Qr,
}

impl Symbology {
    pub fn from_flag(is_qr_code: bool) -> Self {
        if is_qr_code {
            Symbology::Qr
        } else {
            Symbology::Code128
        }
    }

    pub fn for_card(card: &Card) -> Self {
        Self::from_flag(card.is_qr_code)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Symbology::Code128 => "code128",
            Symbology::Qr => "qr",
        }
    }
}

/// CODE128 module pattern: one byte per module, 1 for a bar
pub fn encode_code128(payload: &str) -> Result<Vec<u8>, CodeError> {
    let barcode = Code128::new(format!("{}{}", CODE128_SET_B, payload))
        .map_err(|e| CodeError::Barcode(e.to_string()))?;
    Ok(barcode.encode())
}

fn encode_qr(payload: &str) -> Result<QrCode, CodeError> {
    QrCode::new(payload.as_bytes()).map_err(|e| CodeError::Qr(e.to_string()))
}

/// Render the card's code as an SVG document
pub fn render_svg(card: &Card) -> Result<String, CodeError> {
    render_payload_svg(&card.card_number, Symbology::for_card(card))
}

pub fn render_payload_svg(payload: &str, symbology: Symbology) -> Result<String, CodeError> {
    match symbology {
        Symbology::Qr => Ok(encode_qr(payload)?
            .render::<svg::Color>()
            .min_dimensions(QR_MIN_SIZE_PX, QR_MIN_SIZE_PX)
            .dark_color(svg::Color(INK))
            .light_color(svg::Color("#ffffff"))
            .build()),
        Symbology::Code128 => {
            let modules = encode_code128(payload)?;
            SVG::new(BARCODE_HEIGHT_PX)
                .generate(&modules[..])
                .map_err(|e| CodeError::Barcode(e.to_string()))
        }
    }
}

/// Render the card's code for a terminal using block characters
pub fn render_terminal(card: &Card) -> Result<String, CodeError> {
    render_payload_terminal(&card.card_number, Symbology::for_card(card))
}

pub fn render_payload_terminal(payload: &str, symbology: Symbology) -> Result<String, CodeError> {
    match symbology {
        // Inverted colors so the code reads on dark terminal backgrounds
        Symbology::Qr => Ok(encode_qr(payload)?
            .render::<unicode::Dense1x2>()
            .dark_color(unicode::Dense1x2::Light)
            .light_color(unicode::Dense1x2::Dark)
            .build()),
        Symbology::Code128 => {
            let modules = encode_code128(payload)?;
            let quiet = " ".repeat(4);
            let bars: String = modules
                .iter()
                .map(|&m| if m == 1 { '█' } else { ' ' })
                .collect();
            let row = format!("{quiet}{bars}{quiet}");

            let width = row.chars().count();
            let label = format!("{:^width$}", payload, width = width);

            let mut lines = vec![row; BARCODE_TERMINAL_ROWS];
            lines.push(label.trim_end().to_string());
            Ok(lines.join("\n"))
        }
    }
}
