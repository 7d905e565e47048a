//! Response DTOs for the post API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::{Deserialize, Serialize};

/// Response body for `GET /aft`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AfToken {
    /// The anti-forgery request token to echo back in the configured header
    pub token: String,
}

/// One entry of a health report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthCheckEntry {
    pub name: String,
    pub status: String,
    pub description: String,
}

/// Response body for `GET /healthCheck` and `GET /health`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    /// Aggregate status (`Healthy`, `Degraded` or `Unhealthy`)
    pub api_status: String,
    /// Per-check results
    #[serde(default)]
    pub checks: Vec<HealthCheckEntry>,
    /// RFC 3339 time the checks ran
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checked_at: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_report_serialize() {
        let report = HealthReport {
            api_status: "Healthy".to_string(),
            checks: vec![HealthCheckEntry {
                name: "Database".to_string(),
                status: "Healthy".to_string(),
                description: "10 Record found!".to_string(),
            }],
            checked_at: None,
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["apiStatus"], "Healthy");
        assert_eq!(json["checks"][0]["name"], "Database");
        assert!(json.get("checkedAt").is_none());
    }

    #[test]
    fn test_health_report_deserialize_without_checks() {
        let report: HealthReport = serde_json::from_str(r#"{"apiStatus":"Unhealthy"}"#).unwrap();
        assert_eq!(report.api_status, "Unhealthy");
        assert!(report.checks.is_empty());
    }

    #[test]
    fn test_af_token_serialize() {
        let json = serde_json::to_string(&AfToken { token: "abc".to_string() }).unwrap();
        assert_eq!(json, r#"{"token":"abc"}"#);
    }
}
