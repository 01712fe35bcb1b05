use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// A message on the bus. The service stamps `topic` and `timestamp` at
/// publish time; `reply_to` and `correlation_id` are set for request/response
/// traffic only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub topic: String,
    pub timestamp: DateTime<Utc>,
    pub payload: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<Uuid>,
}

impl Message {
    /// Build a freshly stamped message for `topic`.
    pub(crate) fn stamp(topic: &str, payload: Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            topic: topic.to_string(),
            timestamp: Utc::now(),
            payload,
            reply_to: None,
            correlation_id: None,
        }
    }
}
