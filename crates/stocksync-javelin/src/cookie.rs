//! Helpers for the browser cookie pasted in by operators.

const SESSION_PREFIX: &str = "sess=";

/// Reduces a pasted cookie header to the part the vendor needs.
///
/// Operators often copy the whole `Cookie` header. When the value holds
/// several `;`-separated pairs, the `sess=` pair is kept, falling back to the
/// first pair. A single value is only trimmed.
#[must_use]
pub fn clean_cookie(cookie: &str) -> String {
    if !cookie.contains(';') {
        return cookie.trim().to_string();
    }

    let mut parts = cookie.split(';').map(str::trim);
    let first = parts.clone().next().unwrap_or_default();
    parts
        .find(|part| part.starts_with(SESSION_PREFIX))
        .unwrap_or(first)
        .to_string()
}

/// Whether the cookie carries a `sess=` pair anywhere.
#[must_use]
pub fn has_session_part(cookie: &str) -> bool {
    cookie.contains(SESSION_PREFIX)
}
