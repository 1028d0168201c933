//! Optical character recognition for raster image uploads.

use leptess::LepTess;

use super::{ExtractError, SourceKind};

pub(super) fn extract_text(bytes: &[u8]) -> Result<String, ExtractError> {
    let mut engine = LepTess::new(None, "eng").map_err(malformed)?;
    engine.set_image_from_mem(bytes).map_err(malformed)?;
    engine.get_utf8_text().map_err(malformed)
}

fn malformed(error: impl std::fmt::Display) -> ExtractError {
    ExtractError::Malformed {
        kind: SourceKind::Image,
        message: error.to_string(),
    }
}
