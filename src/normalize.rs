use url::Url;

/// Query parameters that never change what a page is, only how the visit
/// was attributed. Stripped before a URL is used as a dedup key.
const TRACKING_PARAMS: &[&str] = &[
    "utm_source",
    "utm_medium",
    "utm_campaign",
    "utm_term",
    "utm_content",
    "ref",
    "source",
    "fbclid",
    "gclid",
];

/// Canonicalize a URL for deduplication: drop tracking parameters and the
/// fragment, strip a leading `www.` from the host and a single trailing
/// slash from the result. Never fails: input that does not parse as a URL
/// is returned with one trailing slash stripped.
///
/// Idempotent: `normalize_url(normalize_url(u)) == normalize_url(u)`.
pub fn normalize_url(raw: &str) -> String {
    let mut parsed = match Url::parse(raw) {
        Ok(url) => url,
        Err(_) => return strip_trailing_slash(raw).to_string(),
    };

    let kept: Vec<(String, String)> = parsed
        .query_pairs()
        .filter(|(key, _)| !TRACKING_PARAMS.contains(&key.as_ref()))
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    if kept.is_empty() {
        parsed.set_query(None);
    } else {
        parsed
            .query_pairs_mut()
            .clear()
            .extend_pairs(kept.iter().map(|(k, v)| (k.as_str(), v.as_str())));
    }

    parsed.set_fragment(None);

    if let Some(host) = parsed.host_str() {
        if let Some(stripped) = host.strip_prefix("www.") {
            let stripped = stripped.to_string();
            // set_host only fails for schemes that cannot carry a host,
            // and those never had a www. prefix to begin with.
            let _ = parsed.set_host(Some(&stripped));
        }
    }

    let serialized = parsed.to_string();
    strip_trailing_slash(&serialized).to_string()
}

fn strip_trailing_slash(s: &str) -> &str {
    s.strip_suffix('/').unwrap_or(s)
}
