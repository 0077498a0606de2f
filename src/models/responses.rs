//! Response DTOs for the HTTP API

use serde::Serialize;

use crate::cache::CacheStats;
use crate::constraints::Decision;

/// Response body for GET /get/:key and POST /pull/:key
#[derive(Debug, Clone, Serialize)]
pub struct GetResponse {
    pub key: String,
    pub value: String,
}

impl GetResponse {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Response body for PUT /set
#[derive(Debug, Clone, Serialize)]
pub struct SetResponse {
    pub message: String,
    pub key: String,
}

impl SetResponse {
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            message: format!("Key '{}' set successfully", key),
            key,
        }
    }
}

/// Response body for DELETE /del/:key
#[derive(Debug, Clone, Serialize)]
pub struct DeleteResponse {
    pub message: String,
    pub key: String,
}

impl DeleteResponse {
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            message: format!("Key '{}' deleted successfully", key),
            key,
        }
    }
}

/// Response body for GET /stats
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub expirations: u64,
    pub reclaimed: u64,
    /// Current number of keys in cache
    pub total_entries: usize,
    /// hits / (hits + misses)
    pub hit_rate: f64,
}

impl From<CacheStats> for StatsResponse {
    fn from(stats: CacheStats) -> Self {
        Self {
            hit_rate: stats.hit_rate(),
            hits: stats.hits,
            misses: stats.misses,
            evictions: stats.evictions,
            expirations: stats.expirations,
            reclaimed: stats.reclaimed,
            total_entries: stats.total_entries,
        }
    }
}

/// Response body for GET /health
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,
    /// Current timestamp in RFC 3339 format
    pub timestamp: String,
}

impl HealthResponse {
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Response body for POST /constraints/check
#[derive(Debug, Clone, Serialize)]
pub struct CheckResponse {
    pub permitted: bool,
    /// Denial message, present only when not permitted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl From<Decision> for CheckResponse {
    fn from(decision: Decision) -> Self {
        match decision {
            Decision::Permitted => Self {
                permitted: true,
                reason: None,
            },
            Decision::Denied(denial) => Self {
                permitted: false,
                reason: Some(denial.to_string()),
            },
        }
    }
}

/// Response body for GET /constraints/disabled
#[derive(Debug, Clone, Serialize)]
pub struct DisabledResponse {
    pub algorithms: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::AlgorithmConstrained;

    #[test]
    fn test_set_response_serialize() {
        let resp = SetResponse::new("my_key");
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("my_key"));
        assert!(json.contains("successfully"));
    }

    #[test]
    fn test_stats_response_from_stats() {
        let stats = CacheStats {
            hits: 80,
            misses: 20,
            evictions: 5,
            expirations: 2,
            reclaimed: 1,
            total_entries: 10,
        };
        let resp = StatsResponse::from(stats);
        assert!((resp.hit_rate - 0.8).abs() < 0.001);
        assert_eq!(resp.reclaimed, 1);
    }

    #[test]
    fn test_health_response_serialize() {
        let json = serde_json::to_string(&HealthResponse::healthy()).unwrap();
        assert!(json.contains("healthy"));
        assert!(json.contains("timestamp"));
    }

    #[test]
    fn test_check_response_from_decision() {
        let json = serde_json::to_string(&CheckResponse::from(Decision::Permitted)).unwrap();
        assert_eq!(json, r#"{"permitted":true}"#);

        let denied = Decision::Denied(AlgorithmConstrained::disabled("MD5"));
        let resp = CheckResponse::from(denied);
        assert!(!resp.permitted);
        assert_eq!(
            resp.reason.as_deref(),
            Some("Algorithm constraints check failed on disabled algorithm: MD5.")
        );
    }
}
