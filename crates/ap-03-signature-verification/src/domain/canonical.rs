//! Canonical signing input.
//!
//! `payload|nonce|timestamp|userId`, where `payload` is the compact JSON of
//! `{"actionData": .., "actionType": ..}` with every object's keys sorted.
//! Clients and server must produce byte-identical input, so the encoder here
//! does not depend on `serde_json`'s map ordering.

use serde_json::Value;
use shared_types::{sign_hex, ActionRequest, ActionType, SigningKey, Timestamp, UserId};

/// Compact JSON with object keys sorted at every depth.
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical(&map[key.as_str()], out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

/// The signed payload part.
pub fn canonical_payload(action_type: ActionType, action_data: &Value) -> String {
    let mut envelope = serde_json::Map::new();
    envelope.insert("actionData".into(), action_data.clone());
    envelope.insert("actionType".into(), Value::String(action_type.as_str().into()));
    canonical_json(&Value::Object(envelope))
}

/// Full signing input.
pub fn canonical_message(request: &ActionRequest, user: &UserId) -> String {
    canonical_message_parts(
        request.action_type,
        &request.action_data,
        &request.nonce,
        request.timestamp,
        user,
    )
}

fn canonical_message_parts(
    action_type: ActionType,
    action_data: &Value,
    nonce: &str,
    timestamp: Timestamp,
    user: &UserId,
) -> String {
    format!(
        "{}|{}|{}|{}",
        canonical_payload(action_type, action_data),
        nonce,
        timestamp,
        user
    )
}

/// The signature a client computes with its session key. The request's own
/// `signature` field is ignored.
pub fn sign_request(key: &SigningKey, request: &ActionRequest, user: &UserId) -> String {
    sign_hex(key, canonical_message(request, user).as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(data: Value) -> ActionRequest {
        ActionRequest {
            action_type: ActionType::CompleteTask,
            action_data: data,
            timestamp: 1_700_000_000_000,
            nonce: "nonce-0001".into(),
            signature: String::new(),
        }
    }

    #[test]
    fn test_keys_sorted_at_every_depth() {
        let value = json!({"b": 1, "a": {"z": [3, {"y": true, "x": null}], "c": "s"}});
        assert_eq!(
            canonical_json(&value),
            r#"{"a":{"c":"s","z":[3,{"x":null,"y":true}]},"b":1}"#
        );
    }

    #[test]
    fn test_strings_are_escaped() {
        assert_eq!(canonical_json(&json!({"k": "a\"|b"})), r#"{"k":"a\"|b"}"#);
    }

    #[test]
    fn test_message_layout() {
        let message = canonical_message(&request(json!({"taskId": "t-1"})), &UserId::new("alice"));
        assert_eq!(
            message,
            r#"{"actionData":{"taskId":"t-1"},"actionType":"COMPLETE_TASK"}|nonce-0001|1700000000000|alice"#
        );
    }

    #[test]
    fn test_signature_binds_user() {
        let key = SigningKey::new(b"session-key".to_vec());
        let req = request(json!({"taskId": "t-1"}));
        assert_ne!(
            sign_request(&key, &req, &UserId::new("alice")),
            sign_request(&key, &req, &UserId::new("mallory"))
        );
    }
}
