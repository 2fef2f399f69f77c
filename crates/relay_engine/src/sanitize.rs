use encoding_rs::{Encoding, UTF_8};
use relay_logging::relay_warn;
use serde_json::Value;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SanitizeError {
    #[error("body is empty after cleaning")]
    Empty,
    #[error("body could not be parsed as JSON: {message}")]
    InvalidJson { message: String },
}

/// Decode raw bytes into text: BOM-declared encoding, otherwise UTF-8.
///
/// Malformed sequences are replaced rather than rejected; the JSON parse
/// that follows decides whether the body is usable.
pub fn decode_body(bytes: &[u8]) -> String {
    let encoding = Encoding::for_bom(bytes)
        .map(|(encoding, _)| encoding)
        .unwrap_or(UTF_8);
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        relay_warn!(
            "Body contained malformed {} sequences; replaced them",
            encoding.name()
        );
    }
    text.into_owned()
}

/// Trim, drop a leading byte-order mark, and remove ASCII control characters.
pub fn clean_json_text(raw: &str) -> String {
    let trimmed = raw.trim();
    let without_bom = trimmed.strip_prefix('\u{feff}').unwrap_or(trimmed);
    without_bom
        .chars()
        .filter(|c| !is_stripped_control(*c))
        .collect()
}

/// Full pipeline for anything the workflow sends us: decode, clean, parse.
pub fn parse_workflow_body(bytes: &[u8]) -> Result<Value, SanitizeError> {
    let text = decode_body(bytes);
    let cleaned = clean_json_text(&text);
    if cleaned.is_empty() {
        return Err(SanitizeError::Empty);
    }
    serde_json::from_str(&cleaned).map_err(|err| SanitizeError::InvalidJson {
        message: err.to_string(),
    })
}

fn is_stripped_control(c: char) -> bool {
    matches!(c, '\u{0}'..='\u{1F}' | '\u{7F}')
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn strips_bom_and_control_characters() {
        let raw = "\u{feff}{\"outline\":\r\n\"Draft\u{7}\"}\u{0}";
        assert_eq!(clean_json_text(raw), "{\"outline\":\"Draft\"}");
    }

    #[test]
    fn keeps_escaped_newlines_inside_strings() {
        let raw = "{\"article\": \"line one\\nline two\"}";
        let value = parse_workflow_body(raw.as_bytes()).unwrap();
        assert_eq!(value, json!({"article": "line one\nline two"}));
    }

    #[test]
    fn decodes_utf16_with_bom() {
        let mut bytes = vec![0xFF, 0xFE];
        for unit in "{\"end\":\"ok\"}".encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        assert_eq!(parse_workflow_body(&bytes).unwrap(), json!({"end": "ok"}));
    }

    #[test]
    fn reports_empty_and_invalid_bodies() {
        assert_eq!(parse_workflow_body(b"  \n\t "), Err(SanitizeError::Empty));
        assert!(matches!(
            parse_workflow_body(b"<html>502 Bad Gateway</html>"),
            Err(SanitizeError::InvalidJson { .. })
        ));
    }
}
