//! JSON-RPC 2.0 envelope
//!
//! Decodes one inbound message into id/method/params and encodes replies,
//! notifications, and errors. The id is carried through verbatim, integer
//! or string.

use serde_json::{json, Value};

/// JSON-RPC error codes used by the server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    ParseError,
    InvalidRequest,
    MethodNotFound,
    InvalidParams,
    InternalError,
    ServerNotInitialized,
}

impl ErrorCode {
    pub fn code(self) -> i64 {
        match self {
            ErrorCode::ParseError => -32700,
            ErrorCode::InvalidRequest => -32600,
            ErrorCode::MethodNotFound => -32601,
            ErrorCode::InvalidParams => -32602,
            ErrorCode::InternalError => -32603,
            ErrorCode::ServerNotInitialized => -32002,
        }
    }
}

/// A decoded inbound message; `id` is absent for notifications
#[derive(Debug, Clone)]
pub struct Message {
    pub id: Option<Value>,
    pub method: String,
    pub params: Value,
}

/// Decode an envelope. Messages without a string `method` (including
/// responses) yield `None` and are dropped by the caller.
pub fn decode(value: Value) -> Option<Message> {
    let method = value.get("method")?.as_str()?.to_string();
    let id = match value.get("id") {
        None | Some(Value::Null) => None,
        Some(id) => Some(id.clone()),
    };
    let params = value.get("params").cloned().unwrap_or(Value::Null);
    Some(Message { id, method, params })
}

pub fn response(id: &Value, result: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "result": result,
    })
}

pub fn error(id: Option<&Value>, code: ErrorCode, message: &str) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id.cloned().unwrap_or(Value::Null),
        "error": {
            "code": code.code(),
            "message": message,
        },
    })
}

pub fn notification(method: &str, params: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "method": method,
        "params": params,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_request() {
        let msg = decode(json!({
            "jsonrpc": "2.0",
            "id": 7,
            "method": "textDocument/hover",
            "params": {"x": 1}
        }))
        .unwrap();
        assert_eq!(msg.id, Some(json!(7)));
        assert_eq!(msg.method, "textDocument/hover");
        assert_eq!(msg.params, json!({"x": 1}));
    }

    #[test]
    fn test_decode_notification_and_string_id() {
        let msg = decode(json!({"jsonrpc": "2.0", "method": "exit"})).unwrap();
        assert!(msg.id.is_none());

        let msg = decode(json!({"jsonrpc": "2.0", "id": "abc", "method": "shutdown"})).unwrap();
        assert_eq!(msg.id, Some(json!("abc")));
    }

    #[test]
    fn test_decode_rejects_methodless() {
        assert!(decode(json!({"jsonrpc": "2.0", "id": 1, "result": null})).is_none());
    }

    #[test]
    fn test_id_echoed_verbatim() {
        let reply = response(&json!("req-9"), Value::Null);
        assert_eq!(reply["id"], json!("req-9"));

        let reply = error(Some(&json!(3)), ErrorCode::MethodNotFound, "nope");
        assert_eq!(reply["id"], json!(3));
        assert_eq!(reply["error"]["code"], json!(-32601));

        let reply = error(None, ErrorCode::InvalidRequest, "nope");
        assert_eq!(reply["id"], Value::Null);
    }
}
