//! Shared topics, groups and payloads

use serde_json::{json, Value};
use std::time::Duration;

pub const USER_TOPIC: &str = "user-events";
pub const AUDIT_TOPIC: &str = "audit-events";
pub const TEST_GROUP: &str = "herald-tests";
pub const USER_KEY: &str = "user-7";
pub const BEARER_TOKEN: &str = "test-token";
pub const TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Short slice so timeout tests stay fast
pub const FAST_SLICE: Duration = Duration::from_millis(20);

pub fn user_created(id: u64) -> Value {
    json!({"type": "UserCreated", "data": {"id": id, "name": "Ada"}})
}
