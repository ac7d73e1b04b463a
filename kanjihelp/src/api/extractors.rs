use axum::extract::rejection::JsonRejection;
use axum::extract::FromRequest;

use crate::error::KanjiError;

/// `axum::Json` whose rejections render as the v1 `invalid_request` envelope
/// instead of axum's plain-text body.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(KanjiError))]
pub struct AppJson<T>(pub T);

impl From<JsonRejection> for KanjiError {
    fn from(rejection: JsonRejection) -> Self {
        map_json_rejection(rejection)
    }
}

fn map_json_rejection(rejection: JsonRejection) -> KanjiError {
    match rejection {
        JsonRejection::JsonDataError(err) => {
            let message = err.body_text();
            if let Some(field) = extract_missing_field(&message) {
                KanjiError::Validation(format!("Missing required field: {field}"))
            } else {
                KanjiError::Validation(format!("Invalid JSON: {message}"))
            }
        }
        JsonRejection::JsonSyntaxError(err) => {
            KanjiError::Validation(format!("JSON syntax error: {}", err.body_text()))
        }
        JsonRejection::MissingJsonContentType(_) => {
            KanjiError::Validation("Missing `Content-Type: application/json` header".to_string())
        }
        JsonRejection::BytesRejection(err) => {
            KanjiError::Validation(format!("Failed to read request body: {}", err.body_text()))
        }
        _ => KanjiError::Validation(rejection.body_text()),
    }
}

fn extract_missing_field(message: &str) -> Option<&str> {
    let prefix = "missing field `";
    let start = message.find(prefix)? + prefix.len();
    let remaining = message.get(start..)?;
    let end = remaining.find('`')?;
    remaining.get(..end)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_missing_field() {
        let message = "Failed to deserialize the JSON body into the target type: missing field `text` at line 1 column 2";
        assert_eq!(extract_missing_field(message), Some("text"));
        assert_eq!(extract_missing_field("expected value"), None);
    }
}
