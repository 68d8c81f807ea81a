use axum::http::HeaderMap;

/// Header carrying the caller's function key when no `code` query parameter is given.
pub const FUNCTION_KEY_HEADER: &str = "x-functions-key";

/// Owner used when a request carries no identity at all.
pub const DEFAULT_OWNER_ID: &str = "Development";

/// Opaque identity of the caller, attached to GraphQL requests by the shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity(pub Option<String>);

impl CallerIdentity {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        Self(
            headers
                .get(FUNCTION_KEY_HEADER)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string),
        )
    }
}

/// Picks the owner id: explicit code first, then the header, then the fallback.
///
/// A code that is present but empty still wins over the header, and an empty
/// result falls back.
pub fn resolve_owner_id(code: Option<&str>, header: Option<&str>, fallback: &str) -> String {
    let owner = match code {
        Some(code) => code,
        None => header.unwrap_or_default(),
    };
    let owner = if owner.is_empty() { fallback } else { owner };
    owner.to_string()
}
