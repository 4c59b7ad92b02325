//! Thin wrappers over `fluent-uri` with normalized, owned results.

use fluent_uri::{Uri, UriRef};

use crate::error::Error;

/// Parses an absolute URI, dropping a bare trailing `#`.
pub fn from_str(input: &str) -> Result<Uri<String>, Error> {
    let trimmed = input.trim_end_matches('#');
    let uri = Uri::parse(trimmed).map_err(|err| Error::invalid_uri(input, err))?;
    Ok(uri.to_owned().normalize())
}

/// Resolves a (possibly relative) reference against `base`.
///
/// Resolution wants an absolute, fragmentless base, so any fragment the
/// base carries (from a fragment-only `id`) is dropped first.
pub fn resolve_against(base: &Uri<String>, reference: &str) -> Result<Uri<String>, Error> {
    let reference = UriRef::parse(reference).map_err(|err| Error::invalid_uri(reference, err))?;
    let (document, _) = split_fragment(base);
    let base = Uri::parse(document.as_str()).map_err(|err| Error::invalid_uri(&document, err))?;
    let resolved = reference
        .resolve_against(&base)
        .map_err(|err| Error::invalid_uri(reference.as_str(), err))?;
    Ok(resolved.normalize())
}

/// Splits an absolute URI into its document part and `#`-prefixed fragment.
///
/// The fragment is `"#"` when absent or empty, matching how validators are
/// registered for whole documents.
pub fn split_fragment(uri: &Uri<String>) -> (String, String) {
    let text = uri.as_str();
    match text.split_once('#') {
        Some((document, fragment)) => (document.to_string(), format!("#{fragment}")),
        None => (text.to_string(), "#".to_string()),
    }
}
