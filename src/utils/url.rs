//! URL helpers for joining the service base address with endpoint paths.

/// Default address of the hosted chat service.
pub const DEFAULT_BASE_URL: &str = "https://worldgpt.up.railway.app";

/// Strip trailing slashes so endpoint joins never produce `//`.
///
/// ```
/// use worldchat::utils::url::normalize_base_url;
///
/// assert_eq!(normalize_base_url("https://chat.example.com/"), "https://chat.example.com");
/// assert_eq!(normalize_base_url("  https://chat.example.com/api// "), "https://chat.example.com/api");
/// ```
pub fn normalize_base_url(base_url: &str) -> String {
    base_url.trim().trim_end_matches('/').to_string()
}

/// Join a base address and an endpoint path with exactly one slash.
///
/// ```
/// use worldchat::utils::url::construct_api_url;
///
/// assert_eq!(
///     construct_api_url("https://chat.example.com/", "/admin/stats"),
///     "https://chat.example.com/admin/stats"
/// );
/// ```
pub fn construct_api_url(base_url: &str, endpoint: &str) -> String {
    let endpoint = endpoint.trim_start_matches('/');
    format!("{}/{}", normalize_base_url(base_url), endpoint)
}

/// Whether a configured base address is usable as an HTTP endpoint.
pub fn is_http_url(base_url: &str) -> bool {
    match reqwest::Url::parse(base_url.trim()) {
        Ok(url) => {
            matches!(url.scheme(), "http" | "https")
                && url.host_str().is_some_and(|host| !host.is_empty())
        }
        Err(_) => false,
    }
}
