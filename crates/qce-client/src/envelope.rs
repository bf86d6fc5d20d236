//! Response envelope decoding.
//!
//! The service wraps results as `{success, data}` and failures as
//! `{success: false, error: {type, message, context}}`. The wire error tag
//! is decoded once into [`WireErrorKind`] and then mapped onto [`QceError`].

use qce_core::QceError;
use serde_json::{Map, Value};

/// Closed set of error categories the client distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireErrorKind {
    Auth,
    Validation,
    TaskNotFound,
    ResourceNotFound,
    Other,
}

impl WireErrorKind {
    /// Decode from the envelope's `error.type` and effective code.
    ///
    /// The type tag takes precedence; the code only selects not-found variants.
    pub fn decode(error_type: &str, code: &str) -> Self {
        match (error_type, code) {
            ("AUTH_ERROR", _) => Self::Auth,
            ("VALIDATION_ERROR", _) => Self::Validation,
            (_, "TASK_NOT_FOUND") => Self::TaskNotFound,
            ("NOT_FOUND_ERROR", _) | (_, "RESOURCE_NOT_FOUND") => Self::ResourceNotFound,
            _ => Self::Other,
        }
    }
}

fn str_field<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value.get(key).and_then(Value::as_str)
}

/// Decode a raw response into the envelope's `data` payload.
///
/// 401 and 403 are rejected before the body is looked at. A body that is not
/// JSON is an error only for status codes of 400 and above; otherwise it
/// decodes to an empty object.
pub fn decode_response(status: u16, body: &[u8]) -> Result<Value, QceError> {
    match status {
        401 => {
            return Err(QceError::authentication(
                "authentication failed, check the access token",
            ));
        }
        403 => {
            return Err(QceError::authentication(
                "access denied, the token is invalid or expired",
            ));
        }
        _ => {}
    }

    let Ok(parsed) = serde_json::from_slice::<Value>(body) else {
        if status >= 400 {
            return Err(QceError::Api {
                message: format!("server returned error status {status}"),
                code: "API_ERROR".to_string(),
                status: Some(status),
                details: Value::Null,
            });
        }
        return Ok(Value::Object(Map::new()));
    };

    let success = parsed
        .get("success")
        .and_then(Value::as_bool)
        .unwrap_or(true);
    if !success {
        return Err(envelope_error(&parsed, status));
    }

    match parsed {
        Value::Object(mut map) if map.contains_key("data") => {
            Ok(map.remove("data").unwrap_or(Value::Null))
        }
        other => Ok(other),
    }
}

fn envelope_error(parsed: &Value, status: u16) -> QceError {
    let error = parsed
        .get("error")
        .cloned()
        .unwrap_or_else(|| Value::Object(Map::new()));
    let context = error.get("context").cloned().unwrap_or(Value::Null);

    let error_type = str_field(&error, "type").unwrap_or("UNKNOWN_ERROR");
    let message = str_field(&error, "message")
        .unwrap_or("unknown error")
        .to_string();
    let code = str_field(&context, "code").unwrap_or(error_type).to_string();

    match WireErrorKind::decode(error_type, &code) {
        WireErrorKind::Auth => QceError::Authentication { message, code },
        WireErrorKind::Validation => QceError::Validation { message, code },
        WireErrorKind::TaskNotFound => QceError::TaskNotFound {
            task_id: str_field(&context, "taskId")
                .unwrap_or("unknown")
                .to_string(),
        },
        WireErrorKind::ResourceNotFound => QceError::ResourceNotFound {
            resource_type: str_field(&context, "resourceType")
                .unwrap_or("resource")
                .to_string(),
            resource_id: str_field(&context, "resourceId")
                .unwrap_or("unknown")
                .to_string(),
        },
        WireErrorKind::Other => QceError::Api {
            message,
            code,
            status: Some(status),
            details: error,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn body(value: &Value) -> Vec<u8> {
        serde_json::to_vec(value).unwrap()
    }

    #[test]
    fn test_unwraps_data_envelope() {
        let data = decode_response(200, &body(&json!({"success": true, "data": {"groups": []}})))
            .unwrap();
        assert_eq!(data, json!({"groups": []}));
    }

    #[test]
    fn test_missing_success_flag_counts_as_success() {
        let data = decode_response(200, &body(&json!({"status": "ok"}))).unwrap();
        assert_eq!(data, json!({"status": "ok"}));
    }

    #[test]
    fn test_validation_error_on_http_200() {
        let err = decode_response(
            200,
            &body(&json!({"success": false, "error": {"type": "VALIDATION_ERROR", "message": "bad peer"}})),
        )
        .unwrap_err();
        match err {
            QceError::Validation { message, code } => {
                assert_eq!(message, "bad peer");
                assert_eq!(code, "VALIDATION_ERROR");
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_unauthorized_skips_body_parsing() {
        let err = decode_response(401, b"<html>definitely not json").unwrap_err();
        assert!(matches!(err, QceError::Authentication { .. }));

        let err = decode_response(403, &body(&json!({"success": true, "data": 1}))).unwrap_err();
        assert!(matches!(err, QceError::Authentication { .. }));
    }

    #[test]
    fn test_unparseable_body() {
        assert_eq!(decode_response(204, b"").unwrap(), json!({}));

        let err = decode_response(502, b"Bad Gateway").unwrap_err();
        assert!(matches!(err, QceError::Api { status: Some(502), .. }));
    }

    #[test]
    fn test_task_not_found_uses_context_code() {
        let err = decode_response(
            404,
            &body(&json!({
                "success": false,
                "error": {
                    "type": "API_ERROR",
                    "message": "missing",
                    "context": {"code": "TASK_NOT_FOUND", "taskId": "export_9"}
                }
            })),
        )
        .unwrap_err();
        assert!(matches!(err, QceError::TaskNotFound { ref task_id } if task_id == "export_9"));
    }

    #[test]
    fn test_unknown_type_becomes_api_error_with_details() {
        let err = decode_response(
            500,
            &body(&json!({"success": false, "error": {"type": "DATABASE_ERROR", "message": "locked"}})),
        )
        .unwrap_err();
        match err {
            QceError::Api {
                message,
                code,
                status,
                details,
            } => {
                assert_eq!(message, "locked");
                assert_eq!(code, "DATABASE_ERROR");
                assert_eq!(status, Some(500));
                assert_eq!(details["type"], "DATABASE_ERROR");
            }
            other => panic!("expected API error, got {other:?}"),
        }
    }

    #[test]
    fn test_wire_kind_decode() {
        assert_eq!(WireErrorKind::decode("AUTH_ERROR", "X"), WireErrorKind::Auth);
        assert_eq!(
            WireErrorKind::decode("NOT_FOUND_ERROR", "NOT_FOUND_ERROR"),
            WireErrorKind::ResourceNotFound
        );
        assert_eq!(WireErrorKind::decode("SYSTEM_ERROR", "SYSTEM_ERROR"), WireErrorKind::Other);
    }
}
