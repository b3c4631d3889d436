use once_cell::sync::Lazy;
use regex::Regex;

static FILENAME_PARAM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)filename\*?=(?:UTF-8'')?["']?([^;"']+)"#)
        .expect("valid content-disposition regex")
});

/// Recovers the file name a server suggested in a `Content-Disposition` header.
///
/// The first `filename` or `filename*` parameter wins. Percent-encoded values
/// are decoded; a value that does not decode cleanly is returned as-is.
pub fn filename_from_disposition(header: &str) -> Option<String> {
    let raw = FILENAME_PARAM.captures(header)?.get(1)?.as_str();
    if raw.is_empty() {
        return None;
    }
    Some(match urlencoding::decode(raw) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => raw.to_string(),
    })
}
