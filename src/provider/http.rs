//! Shared HTTP client and status mapping.

use std::sync::OnceLock;

use crate::error::PilotError;

static SHARED_CLIENT: OnceLock<reqwest::Client> = OnceLock::new();

/// Get (or create) the shared reqwest client.
///
/// No client-level timeout is set; the completion requester enforces its own
/// deadline around each request.
pub fn shared_client() -> &'static reqwest::Client {
    SHARED_CLIENT.get_or_init(|| {
        reqwest::Client::builder()
            .pool_max_idle_per_host(4)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new())
    })
}

/// Map a non-success HTTP status and body to an error.
pub fn status_to_error(status: u16, body: &str) -> PilotError {
    match status {
        401 | 403 => PilotError::Authentication(extract_message(body)),
        429 => PilotError::RateLimited {
            retry_after_ms: extract_retry_after(body),
        },
        _ => PilotError::api(status, extract_message(body)),
    }
}

/// Pull `error.message` out of a Google-style JSON error body.
fn extract_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.to_string())
}

fn extract_retry_after(body: &str) -> Option<u64> {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("retry_after"))
                .and_then(|r| r.as_f64())
                .map(|s| (s * 1000.0) as u64)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_statuses_map_to_authentication() {
        let err = status_to_error(403, r#"{"error":{"message":"API key not valid"}}"#);
        assert!(matches!(err, PilotError::Authentication(msg) if msg == "API key not valid"));
    }

    #[test]
    fn rate_limit_reads_retry_after() {
        let err = status_to_error(429, r#"{"error":{"retry_after":1.5}}"#);
        assert!(matches!(
            err,
            PilotError::RateLimited {
                retry_after_ms: Some(1500)
            }
        ));
    }

    #[test]
    fn other_statuses_keep_raw_body() {
        let err = status_to_error(500, "upstream exploded");
        assert!(matches!(
            err,
            PilotError::Api { status: 500, message } if message == "upstream exploded"
        ));
    }
}
