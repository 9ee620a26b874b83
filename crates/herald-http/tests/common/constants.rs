//! Shared constants for test infrastructure

use std::time::Duration;

pub const USERS_ENDPOINT: &str = "/users";
pub const USER_7_ENDPOINT: &str = "/users/7";
pub const V1_USERS_PATH: &str = "/api/v1/users";
pub const V1_USER_7_PATH: &str = "/api/v1/users/7";

pub const BEARER_TOKEN: &str = "test-token";
pub const BEARER_HEADER_VALUE: &str = "Bearer test-token";

pub const TEST_TIMEOUT: Duration = Duration::from_secs(5);

pub fn user_json() -> serde_json::Value {
    serde_json::json!({"id": 7, "name": "Ada", "email": "ada@example.com"})
}

pub fn user_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "required": ["id", "name"],
        "properties": {
            "id": {"type": "integer"},
            "name": {"type": "string"}
        }
    })
}
