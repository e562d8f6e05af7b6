//! Shared HTTP response helpers for the sink client.
//!
//! Centralizes status-code checks (429 rate limiting with `Retry-After`
//! parsing, non-success → [`SinkError::Api`]) so request code stays focused
//! on building requests and decoding bodies.

use crate::error::SinkError;

/// Check an HTTP response for common error conditions.
///
/// Returns the response unchanged on success. Handles:
/// - **429 Too Many Requests** → [`SinkError::RateLimited`] with
///   `Retry-After` header parsing (falls back to 1 s if absent or
///   unparseable).
/// - **Non-success status** → [`SinkError::Api`] with status code and the
///   PostgREST error message when the body carries one.
pub async fn check_response(resp: reqwest::Response) -> Result<reqwest::Response, SinkError> {
    if resp.status() == 429 {
        let retry_after = parse_retry_after(&resp);
        return Err(SinkError::RateLimited {
            retry_after_secs: retry_after,
        });
    }
    if !resp.status().is_success() {
        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        return Err(SinkError::Api {
            status,
            message: error_message(&body),
        });
    }
    Ok(resp)
}

/// Map a request-level failure (no response) into a transport error.
pub fn transport(err: &reqwest::Error) -> SinkError {
    if err.is_timeout() {
        SinkError::Transport(format!("request timed out: {err}"))
    } else if err.is_connect() {
        SinkError::Transport(format!("connection failed: {err}"))
    } else {
        SinkError::Transport(err.to_string())
    }
}

/// Parse the `Retry-After` header as seconds, falling back to 1 s.
fn parse_retry_after(resp: &reqwest::Response) -> u64 {
    resp.headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(1)
}

/// PostgREST error bodies are `{"code", "message", "details", "hint"}`.
fn error_message(body: &str) -> String {
    #[derive(serde::Deserialize)]
    struct PostgrestError {
        code: Option<String>,
        message: Option<String>,
        details: Option<String>,
    }

    match serde_json::from_str::<PostgrestError>(body) {
        Ok(PostgrestError {
            code,
            message: Some(message),
            details,
        }) => {
            let mut out = code.map_or(message.clone(), |c| format!("{c}: {message}"));
            if let Some(details) = details.filter(|d| !d.is_empty()) {
                out.push_str(&format!(" ({details})"));
            }
            out
        }
        _ => body.to_string(),
    }
}
