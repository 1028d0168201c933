//! Raw text extraction for word-processor documents.
//!
//! A `.docx` file is a ZIP archive whose main body lives in
//! `word/document.xml`. Formatting is discarded: text inside `w:t` elements is
//! collected, explicit breaks become newlines, and each closed paragraph
//! contributes a blank line so the paragraph chunker sees natural boundaries.

use std::io::{Cursor, Read};

use quick_xml::Reader;
use quick_xml::events::Event;

use super::{ExtractError, SourceKind};

pub(super) fn extract_text(bytes: &[u8]) -> Result<String, ExtractError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).map_err(malformed)?;
    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(malformed)?
        .read_to_string(&mut xml)
        .map_err(malformed)?;

    let mut reader = Reader::from_str(&xml);
    let mut out = String::new();
    let mut in_text_run = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(element)) if element.name().as_ref() == b"w:t" => {
                in_text_run = true;
            }
            Ok(Event::End(element)) => match element.name().as_ref() {
                b"w:t" => in_text_run = false,
                b"w:p" => out.push_str("\n\n"),
                _ => {}
            },
            Ok(Event::Empty(element)) if element.name().as_ref() == b"w:br" => {
                out.push('\n');
            }
            Ok(Event::Text(text)) if in_text_run => {
                out.push_str(&text.unescape().map_err(malformed)?);
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(error) => return Err(malformed(error)),
        }
    }

    Ok(out)
}

fn malformed(error: impl std::fmt::Display) -> ExtractError {
    ExtractError::Malformed {
        kind: SourceKind::Docx,
        message: error.to_string(),
    }
}
