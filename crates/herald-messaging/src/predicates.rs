//! Ready-made predicates for [`crate::Consumer::consume_until`]

use crate::event::ConsumedEvent;
use herald_core::json_path;
use serde_json::Value;

/// Body value at `path` equals `expected`
///
/// ```rust
/// use herald_messaging::predicates::field_equals;
/// use serde_json::json;
///
/// let is_user_7 = field_equals("data.id", json!(7));
/// ```
pub fn field_equals(path: impl Into<String>, expected: Value) -> impl Fn(&ConsumedEvent) -> bool {
    let path = path.into();
    move |event| {
        event
            .body
            .as_ref()
            .and_then(|body| json_path::resolve(body, &path).ok())
            .is_some_and(|value| *value == expected)
    }
}

/// Whole body equals `expected`
pub fn body_equals(expected: Value) -> impl Fn(&ConsumedEvent) -> bool {
    move |event| event.body.as_ref() == Some(&expected)
}

pub fn key_equals(key: impl Into<String>) -> impl Fn(&ConsumedEvent) -> bool {
    let key = key.into();
    move |event| event.key.as_deref() == Some(key.as_str())
}

pub fn header_equals(
    name: impl Into<String>,
    value: impl Into<String>,
) -> impl Fn(&ConsumedEvent) -> bool {
    let name = name.into();
    let value = value.into();
    move |event| event.header(&name) == Some(value.as_str())
}

/// Both predicates hold
pub fn all_of<A, B>(a: A, b: B) -> impl Fn(&ConsumedEvent) -> bool
where
    A: Fn(&ConsumedEvent) -> bool,
    B: Fn(&ConsumedEvent) -> bool,
{
    move |event| a(event) && b(event)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::RawMessage;
    use serde_json::json;

    fn event(body: Value) -> ConsumedEvent {
        ConsumedEvent::from_raw(
            RawMessage::new("users", body.to_string())
                .with_key("user-7")
                .with_header("type", "UserCreated"),
        )
    }

    #[test]
    fn test_field_equals() {
        let matches = field_equals("$.data.id", json!(7));
        assert!(matches(&event(json!({"data": {"id": 7}}))));
        assert!(!matches(&event(json!({"data": {"id": 8}}))));
        assert!(!matches(&event(json!({"other": true}))));
    }

    #[test]
    fn test_combined_predicates() {
        let matches = all_of(key_equals("user-7"), header_equals("type", "UserCreated"));
        assert!(matches(&event(json!({}))));

        let body = body_equals(json!({"b": 1}));
        assert!(body(&event(json!({"b": 1}))));
        assert!(!body(&event(json!({"b": 2}))));
    }
}
