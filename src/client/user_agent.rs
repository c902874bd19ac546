//! User agent handling for HTTP requests.

pub const USER_AGENT: &str = concat!("imap-data-access/", env!("CARGO_PKG_VERSION"));

/// Resolve the user agent from a configured value.
/// - None or blank => default imap-data-access user agent
/// - other => custom user agent string
pub fn resolve_user_agent(config: Option<&str>) -> String {
    match config.map(str::trim) {
        None | Some("") => USER_AGENT.to_string(),
        Some(custom) => custom.to_string(),
    }
}
