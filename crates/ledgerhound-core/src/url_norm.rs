//! Canonical URL normalization.
//!
//! The normalized string is the sole identity used for frontier
//! membership and storage dedup, so it must be applied at every boundary
//! that compares URLs.

use url::Url;

use crate::error::AppError;

/// Normalize a raw URL into its canonical crawl-target form.
///
/// Lower-cases scheme and host, prefixes the host with `www.` unless
/// already present, keeps path and query, drops the fragment. Fails with
/// [`AppError::InvalidUrl`] when the scheme or host is absent or the
/// input does not parse.
///
/// Idempotent: normalizing an already-normalized URL is a no-op.
pub fn normalize_url(raw: &str) -> Result<String, AppError> {
    let parsed = Url::parse(raw).map_err(|e| AppError::InvalidUrl(format!("{raw}: {e}")))?;

    let host = parsed
        .host_str()
        .ok_or_else(|| AppError::InvalidUrl(format!("{raw}: missing host")))?;

    // The url crate already lower-cases registered domain names, but not
    // e.g. percent-encoded hosts; lower-case defensively.
    let host = host.to_ascii_lowercase();
    let host = if host.starts_with("www.") {
        host
    } else {
        format!("www.{host}")
    };

    let port = parsed.port().map(|p| format!(":{p}")).unwrap_or_default();

    let mut normalized = format!("{}://{}{}{}", parsed.scheme(), host, port, parsed.path());
    if let Some(query) = parsed.query() {
        normalized.push('?');
        normalized.push_str(query);
    }

    Ok(normalized)
}
