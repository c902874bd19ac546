//! Response status handling shared by every endpoint.

use reqwest::{Response, StatusCode};

use super::AccessError;

/// Pass through a successful response; turn anything else into
/// [`AccessError::Http`] carrying the server's message.
pub(crate) async fn check_status(response: Response) -> Result<Response, AccessError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let url = response.url().to_string();
    let message = response.text().await.unwrap_or_default();
    Err(AccessError::Http {
        status,
        url,
        message: summarize_body(&message),
    })
}

/// Error bodies can be whole HTML pages; keep the first line, bounded.
fn summarize_body(body: &str) -> String {
    const MAX_LEN: usize = 300;
    let line = body.trim().lines().next().unwrap_or("");
    if line.chars().count() > MAX_LEN {
        let cut: String = line.chars().take(MAX_LEN).collect();
        format!("{cut}...")
    } else {
        line.to_string()
    }
}

/// Whether the status means the caller lacks valid credentials.
pub fn is_auth_failure(status: StatusCode) -> bool {
    matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summarize_body() {
        assert_eq!(summarize_body("  not found\nmore\n"), "not found");
        assert_eq!(summarize_body(""), "");
        let long = "x".repeat(400);
        let summary = summarize_body(&long);
        assert!(summary.ends_with("..."));
        assert_eq!(summary.len(), 303);
    }

    #[test]
    fn test_auth_failure_statuses() {
        assert!(is_auth_failure(StatusCode::FORBIDDEN));
        assert!(is_auth_failure(StatusCode::UNAUTHORIZED));
        assert!(!is_auth_failure(StatusCode::NOT_FOUND));
    }
}
