//! Route template substitution and URL assembly.
//!
//! Templates use the `:name` segment syntax (`/verify/:version/:id`).
//! Substitution percent-encodes every value, so a parameter can never
//! smuggle extra path segments into the signed URL.

use std::collections::{HashMap, HashSet};

use crate::error::SignedUrlError;
use crate::services::query_string::encode_component;

/// Placeholder name to value. Every key must have a matching `:key`
/// segment in the template it is used with.
pub type ParamMap = HashMap<String, String>;

/// Fill `:name` placeholders in a route template.
///
/// Returns the template unchanged for an empty param map. Fails with
/// `ParamMismatch` before producing any output when a param has no
/// matching placeholder. A placeholder repeated in one template has all
/// of its occurrences substituted.
pub fn replace_params(route: &str, params: &ParamMap) -> Result<String, SignedUrlError> {
    if params.is_empty() {
        return Ok(route.to_string());
    }

    let placeholders: HashSet<&str> = route
        .split('/')
        .filter_map(|segment| segment.strip_prefix(':'))
        .collect();

    for key in params.keys() {
        if !placeholders.contains(key.as_str()) {
            return Err(SignedUrlError::ParamMismatch(key.clone()));
        }
    }

    let substituted = route
        .split('/')
        .map(|segment| match segment.strip_prefix(':') {
            Some(name) => match params.get(name) {
                Some(value) => encode_component(value),
                // A placeholder the caller did not supply stays literal.
                None => segment.to_string(),
            },
            None => segment.to_string(),
        })
        .collect::<Vec<_>>()
        .join("/");

    Ok(substituted)
}

/// Join URL segments with a single `/`. Empty and `/`-only segments are
/// treated as absent, so no double slash or dangling separator appears.
pub fn join_routes(routes: &[&str]) -> String {
    routes
        .iter()
        .map(|route| route.trim_matches('/'))
        .filter(|route| !route.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

/// Append a canonical query string, omitting the `?` when it is empty.
pub fn append_query(url: &str, query: &str) -> String {
    if query.is_empty() {
        url.to_string()
    } else {
        format!("{url}?{query}")
    }
}
