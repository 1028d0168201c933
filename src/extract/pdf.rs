//! Layout-aware PDF text reconstruction.
//!
//! PDF content streams position each text run independently, so naive
//! extraction scatters line breaks through sentences. This walker keeps runs
//! that share a baseline on one line and starts a new line only when the
//! vertical text position moves: absolute matrix updates (`Tm`), relative
//! moves with a vertical component (`Td`/`TD`), and the next-line operators
//! (`T*`, `'`, `"`).

use lopdf::content::Content;
use lopdf::{Document, Object};

use super::{ExtractError, SourceKind};

/// Vertical movement below this size is treated as the same baseline.
const BASELINE_EPSILON: f32 = 0.5;

pub(super) fn extract_text(bytes: &[u8]) -> Result<String, ExtractError> {
    let document = Document::load_mem(bytes).map_err(malformed)?;
    let mut out = String::new();

    for (_number, page_id) in document.get_pages() {
        let fonts = document.get_page_fonts(page_id);
        let content_data = document.get_page_content(page_id).map_err(malformed)?;
        let content = Content::decode(&content_data).map_err(malformed)?;

        let mut encoding: Option<&str> = None;
        let mut last_y: Option<f32> = None;

        for operation in &content.operations {
            match operation.operator.as_str() {
                "Tf" => {
                    if let Some(Ok(name)) = operation.operands.first().map(Object::as_name) {
                        encoding = fonts.get(name).map(|font| font.get_font_encoding());
                    }
                }
                "Tm" => {
                    if let Some(y) = operand_float(&operation.operands, 5) {
                        if last_y.is_some_and(|prev| (prev - y).abs() > BASELINE_EPSILON) {
                            break_line(&mut out);
                        }
                        last_y = Some(y);
                    }
                }
                "Td" | "TD" => {
                    if let Some(ty) = operand_float(&operation.operands, 1) {
                        if ty.abs() > BASELINE_EPSILON {
                            break_line(&mut out);
                            last_y = last_y.map(|y| y + ty);
                        }
                    }
                }
                "T*" => break_line(&mut out),
                "Tj" => push_string(&mut out, operation.operands.first(), encoding),
                "'" | "\"" => {
                    break_line(&mut out);
                    push_string(&mut out, operation.operands.last(), encoding);
                }
                "TJ" => {
                    if let Some(Object::Array(items)) = operation.operands.first() {
                        for item in items {
                            push_string(&mut out, Some(item), encoding);
                        }
                    }
                }
                _ => {}
            }
        }

        break_line(&mut out);
    }

    Ok(out)
}

fn push_string(out: &mut String, operand: Option<&Object>, encoding: Option<&str>) {
    if let Some(Object::String(bytes, _)) = operand {
        out.push_str(&Document::decode_text(encoding, bytes));
    }
}

fn break_line(out: &mut String) {
    if !out.ends_with('\n') && !out.is_empty() {
        out.push('\n');
    }
}

fn operand_float(operands: &[Object], index: usize) -> Option<f32> {
    match operands.get(index)? {
        Object::Integer(value) => Some(*value as f32),
        Object::Real(value) => Some(*value as f32),
        _ => None,
    }
}

fn malformed(error: lopdf::Error) -> ExtractError {
    ExtractError::Malformed {
        kind: SourceKind::Pdf,
        message: error.to_string(),
    }
}
