//! Line screening in front of the SDK codec.
//!
//! The SDK ends a session on the first line it cannot decode. Every inbound
//! line is checked here first: well-formed JSON-RPC envelopes are forwarded,
//! anything else is answered with a JSON-RPC error frame and dropped.

use rmcp::ErrorData;
use rmcp::model::ErrorCode;
use serde_json::{Value, json};

/// Maximum size of a single inbound message (1MB).
pub(crate) const MAX_MESSAGE_SIZE: usize = 1024 * 1024;

/// What to do with one inbound line.
#[derive(Debug, PartialEq)]
pub(crate) enum Screened<'a> {
    /// Blank line; ignore.
    Skip,
    /// A JSON-RPC envelope the SDK can decode.
    Forward(&'a str),
    /// An error frame to send back in place of a response.
    Reject(String),
}

pub(crate) fn screen(raw: &[u8]) -> Screened<'_> {
    let raw = raw.trim_ascii();
    if raw.is_empty() {
        return Screened::Skip;
    }
    if raw.len() > MAX_MESSAGE_SIZE {
        return reject(
            Value::Null,
            ErrorCode::INVALID_REQUEST,
            format!("message too large: {} bytes (max {MAX_MESSAGE_SIZE})", raw.len()),
        );
    }

    let line = match std::str::from_utf8(raw) {
        Ok(line) => line,
        Err(e) => {
            return reject(Value::Null, ErrorCode::PARSE_ERROR, format!("invalid UTF-8: {e}"));
        }
    };
    let message: Value = match serde_json::from_str(line) {
        Ok(message) => message,
        Err(e) => return reject(Value::Null, ErrorCode::PARSE_ERROR, e.to_string()),
    };
    let Value::Object(envelope) = message else {
        return reject(
            Value::Null,
            ErrorCode::INVALID_REQUEST,
            "message must be a JSON object".to_string(),
        );
    };

    let id = envelope.get("id");
    let reply_id = match id {
        None => Value::Null,
        Some(Value::String(id)) => Value::String(id.clone()),
        Some(Value::Number(id)) if id.is_i64() => Value::Number(id.clone()),
        Some(_) => {
            return reject(
                Value::Null,
                ErrorCode::INVALID_REQUEST,
                "id must be a string or an integer".to_string(),
            );
        }
    };

    if envelope.get("jsonrpc").and_then(Value::as_str) != Some("2.0") {
        return reject(
            reply_id,
            ErrorCode::INVALID_REQUEST,
            "jsonrpc must be \"2.0\"".to_string(),
        );
    }

    match envelope.get("method") {
        Some(Value::String(_)) => Screened::Forward(line),
        Some(_) => reject(
            reply_id,
            ErrorCode::INVALID_REQUEST,
            "method must be a string".to_string(),
        ),
        // Replies to server-initiated requests.
        None if id.is_some()
            && (envelope.contains_key("result") || envelope.contains_key("error")) =>
        {
            Screened::Forward(line)
        }
        None => reject(reply_id, ErrorCode::INVALID_REQUEST, "missing method".to_string()),
    }
}

fn reject(id: Value, code: ErrorCode, message: String) -> Screened<'static> {
    let error = ErrorData::new(code, message, None);
    Screened::Reject(json!({ "jsonrpc": "2.0", "id": id, "error": error }).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rejected(raw: &[u8]) -> Value {
        match screen(raw) {
            Screened::Reject(frame) => serde_json::from_str(&frame).unwrap(),
            other => panic!("expected a rejection, got {other:?}"),
        }
    }

    #[test]
    fn requests_and_notifications_pass_through() {
        let request = br#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#;
        assert_eq!(
            screen(request),
            Screened::Forward(r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#)
        );

        let notification = b"  {\"jsonrpc\":\"2.0\",\"method\":\"notifications/initialized\"}\r\n";
        assert!(matches!(screen(notification), Screened::Forward(_)));

        let reply = br#"{"jsonrpc":"2.0","id":"s-1","result":{}}"#;
        assert!(matches!(screen(reply), Screened::Forward(_)));
    }

    #[test]
    fn blank_lines_are_skipped() {
        assert_eq!(screen(b"   \r\n"), Screened::Skip);
    }

    #[test]
    fn invalid_utf8_is_a_parse_error() {
        let frame = rejected(b"\xff\xfe\n");
        assert_eq!(frame["id"], Value::Null);
        assert_eq!(frame["error"]["code"], -32700);
    }

    #[test]
    fn invalid_json_is_a_parse_error() {
        let frame = rejected(b"{not json");
        assert_eq!(frame["jsonrpc"], "2.0");
        assert_eq!(frame["error"]["code"], -32700);
    }

    #[test]
    fn missing_method_keeps_the_request_id() {
        let frame = rejected(br#"{"jsonrpc":"2.0","id":7}"#);
        assert_eq!(frame["id"], 7);
        assert_eq!(frame["error"]["code"], -32600);
        assert_eq!(frame["error"]["message"], "missing method");
    }

    #[test]
    fn null_id_is_an_invalid_request() {
        let frame = rejected(br#"{"jsonrpc":"2.0","id":null,"method":"ping"}"#);
        assert_eq!(frame["id"], Value::Null);
        assert_eq!(frame["error"]["code"], -32600);
    }

    #[test]
    fn wrong_version_and_non_objects_are_invalid_requests() {
        let frame = rejected(br#"{"jsonrpc":"1.0","id":"a","method":"ping"}"#);
        assert_eq!(frame["id"], "a");
        assert_eq!(frame["error"]["code"], -32600);

        let frame = rejected(br#"[{"jsonrpc":"2.0","id":1,"method":"ping"}]"#);
        assert_eq!(frame["error"]["code"], -32600);
    }

    #[test]
    fn oversized_lines_are_rejected() {
        let mut line = br#"{"jsonrpc":"2.0","id":1,"method":"ping","pad":""#.to_vec();
        line.extend(std::iter::repeat_n(b'x', MAX_MESSAGE_SIZE));
        line.extend(br#""}"#);
        let frame = rejected(&line);
        assert_eq!(frame["error"]["code"], -32600);
    }
}
