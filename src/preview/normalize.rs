//! URL normalization for the preview input.

use url::Url;

/// Why a submitted URL was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UrlError {
    /// Nothing but whitespace was submitted.
    #[error("Enter a valid URL to inspect.")]
    Empty,

    /// The input did not parse, or parsed to something other than http(s).
    #[error("Please provide a valid URL starting with http://, https://, or a /path for local pages.")]
    Invalid {
        /// The trimmed input.
        input: String,
    },
}

/// Turn user input into an absolute http(s) URL.
///
/// - `http://` and `https://` prefixes (any case) are parsed as-is.
/// - Input starting with `/` is appended to `origin`.
/// - Input with any other `scheme://` prefix is parsed as-is, so `ftp://x`
///   is rejected instead of becoming `https://ftp://x`.
/// - Anything else gets `https://` prepended.
///
/// # Example
///
/// ```rust
/// use url::Url;
/// use web_tester::preview::normalize_url;
///
/// let origin = Url::parse("http://127.0.0.1:3000").unwrap();
/// assert_eq!(normalize_url("example.com", &origin).unwrap().as_str(), "https://example.com/");
/// assert_eq!(normalize_url("/demo", &origin).unwrap().as_str(), "http://127.0.0.1:3000/demo");
/// assert!(normalize_url("ftp://x", &origin).is_err());
/// ```
pub fn normalize_url(raw: &str, origin: &Url) -> Result<Url, UrlError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let candidate = if has_http_scheme(trimmed) || explicit_scheme(trimmed).is_some() {
        trimmed.to_string()
    } else if trimmed.starts_with('/') {
        format!("{}{trimmed}", origin.origin().ascii_serialization())
    } else {
        format!("https://{trimmed}")
    };

    let invalid = || UrlError::Invalid {
        input: trimmed.to_string(),
    };
    let parsed = Url::parse(&candidate).map_err(|_| invalid())?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        _ => Err(invalid()),
    }
}

/// Hostname shown to the user: the URL's host without a leading `www.`.
///
/// Relative input is resolved against `base` when given, so empty input names
/// the base host. Input that does not parse to something with a host is
/// returned unchanged.
pub fn display_hostname(raw: &str, base: Option<&Url>) -> String {
    if raw.is_empty() && base.is_none() {
        return String::new();
    }
    let parsed = match base {
        Some(base) => base.join(raw),
        None => Url::parse(raw),
    };
    match parsed.ok().as_ref().and_then(Url::host_str) {
        Some(host) => host.strip_prefix("www.").unwrap_or(host).to_string(),
        None => raw.to_string(),
    }
}

fn has_http_scheme(input: &str) -> bool {
    ["http://", "https://"].iter().any(|prefix| {
        input
            .get(..prefix.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
    })
}

/// The `scheme` of a `scheme://rest` input, if it has one.
fn explicit_scheme(input: &str) -> Option<&str> {
    let (scheme, _) = input.split_once("://")?;
    let mut chars = scheme.chars();
    let first = chars.next()?;
    let valid = first.is_ascii_alphabetic()
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    valid.then_some(scheme)
}
