//! Request DTOs for the HTTP API

use serde::Deserialize;

use crate::cache::PutOptions;

const MAX_KEY_LENGTH: usize = 256;

/// Request body for PUT /set
#[derive(Debug, Clone, Deserialize)]
pub struct SetRequest {
    pub key: String,
    pub value: String,
    /// TTL in seconds, default TTL when absent, 0 = never expires
    #[serde(default)]
    pub ttl: Option<u64>,
    /// Append to the key's queue when queue mode is enabled
    #[serde(default)]
    pub queue: bool,
}

impl SetRequest {
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.key.is_empty() {
            return Some("Key cannot be empty".to_string());
        }
        if self.key.len() > MAX_KEY_LENGTH {
            return Some(format!(
                "Key exceeds maximum length of {} characters",
                MAX_KEY_LENGTH
            ));
        }
        None
    }

    pub fn put_options(&self) -> PutOptions {
        PutOptions {
            ttl: self.ttl,
            queueable: self.queue,
        }
    }
}
