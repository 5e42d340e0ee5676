//! Query construction: turns a [`SearchQuery`] into a SearXNG wire payload.
//!
//! SearXNG has no native domain-filter API, so include/exclude domains are
//! appended to the query text as `site:` / `-site:` terms. Engine
//! allow/deny lists travel in the `Cookie` header, never in the form body.

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::types::{SearchQuery, Topic};

/// Form-encoded body plus transport headers for one SearXNG search call.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SearxngPayload {
    /// Form fields in emission order.
    pub form: Vec<(String, String)>,
    /// Value of the `Cookie` header carrying engine preferences.
    pub cookie: String,
}

impl SearxngPayload {
    /// Returns the value of a form field, if present.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.form
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Returns the final query text (`q` field).
    pub fn query_text(&self) -> &str {
        self.field("q").unwrap_or_default()
    }
}

/// Build the SearXNG payload for `query`.
///
/// # Rules
///
/// - `news`: sets `category_news=1` and, for a positive day count, a
///   `days=<d>` window. Any generic `time_range` is ignored.
/// - otherwise: sets `category_general=1` and passes `time_range` through.
/// - include domains become `site:<d>` terms, then exclude domains become
///   `-site:<d>` terms, appended to the query text in input order.
///
/// Domains are not validated; the backend is authoritative.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidRequest`] if the query text is blank.
pub fn build_payload(
    query: &SearchQuery,
    config: &PipelineConfig,
) -> Result<SearxngPayload, PipelineError> {
    if query.text.trim().is_empty() {
        return Err(PipelineError::InvalidRequest(
            "query must not be empty".into(),
        ));
    }

    let mut form = vec![
        ("q".to_owned(), query_with_domain_terms(query)),
        ("format".to_owned(), "json".to_owned()),
        ("language".to_owned(), config.language.clone()),
        ("safesearch".to_owned(), config.safesearch.to_string()),
        ("pageno".to_owned(), config.pageno.to_string()),
    ];

    match query.topic {
        Topic::News => {
            form.push(("category_news".to_owned(), "1".to_owned()));
            if let Some(days) = query.days.filter(|d| *d > 0) {
                form.push(("days".to_owned(), days.to_string()));
            }
        }
        Topic::General => {
            form.push(("category_general".to_owned(), "1".to_owned()));
            if let Some(range) = query.time_range.as_deref().filter(|r| !r.is_empty()) {
                form.push(("time_range".to_owned(), range.to_owned()));
            }
        }
    }

    Ok(SearxngPayload {
        form,
        cookie: engine_cookie(&query.disabled_engines, &query.enabled_engines),
    })
}

/// Append `site:` and `-site:` terms to the query text.
fn query_with_domain_terms(query: &SearchQuery) -> String {
    let terms = query
        .include_domains
        .iter()
        .map(|d| format!("site:{d}"))
        .chain(query.exclude_domains.iter().map(|d| format!("-site:{d}")));

    let mut text = query.text.clone();
    for term in terms {
        text.push(' ');
        text.push_str(&term);
    }
    text
}

/// Serialise engine preferences the way SearXNG reads them from cookies.
pub fn engine_cookie(disabled: &[String], enabled: &[String]) -> String {
    format!(
        "disabled_engines={};enabled_engines={};method=POST",
        disabled.join(","),
        enabled.join(",")
    )
}
