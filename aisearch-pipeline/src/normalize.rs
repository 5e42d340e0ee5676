//! Markdown to plain-text normalisation.
//!
//! All successful pages of a request are concatenated and converted in two
//! stages. Stage 1 renders the markdown to HTML and keeps only the text
//! nodes. Stage 2 is a regex pass that strips markdown the renderer left
//! behind (escaped or malformed syntax coming from upstream extraction).
//! Stage 2 is best effort: nested or malformed markup may survive.

use std::sync::LazyLock;

use pulldown_cmark::{Options, Parser};
use regex::Regex;
use scraper::Html;

use crate::types::{FetchReport, NormalizedDocument};

/// Separator line placed between documents in the combined text.
pub const DOCUMENT_SEPARATOR: &str = "==========";

/// Residual-markdown rules applied before the emphasis pass.
static LEADING_RULES: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    compile_rules(&[(r"#+\s*", ""), (r"!?\[([^\]]+)\]\([^)]+\)", "${1}")])
});

/// Residual-markdown rules applied after the emphasis pass.
static TRAILING_RULES: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    compile_rules(&[
        (r"(?m)^[*\-+]\s*", ""),
        (r"(?s)```.*?```", ""),
        (r"`(.*?)`", "${1}"),
        (r"(?m)^>\s*", ""),
    ])
});

/// Strong emphasis delimiters, then single ones. Within a group the first
/// delimiter found opens a span that only the same delimiter can close.
const STRONG_DELIMITERS: &[&str] = &["**", "__"];
const EMPHASIS_DELIMITERS: &[&str] = &["*", "_"];

fn compile_rules(rules: &[(&str, &'static str)]) -> Vec<(Regex, &'static str)> {
    rules
        .iter()
        .filter_map(|&(pattern, replacement)| match Regex::new(pattern) {
            Ok(re) => Some((re, replacement)),
            Err(e) => {
                tracing::error!(pattern, error = %e, "invalid cleanup pattern");
                None
            }
        })
        .collect()
}

/// Normalise every successful page of `report` into one document.
pub fn normalize(report: &FetchReport) -> NormalizedDocument {
    let combined = combine(report.successes.iter().map(|page| page.raw_markdown.as_str()));
    let content = normalize_text(&combined);
    tracing::debug!(
        pages = report.successes.len(),
        chars = content.len(),
        "normalised content"
    );
    NormalizedDocument {
        content,
        success_count: report.successes.len(),
        failed_count: report.failed_urls.len(),
    }
}

/// Concatenate documents: each suffixed with a blank line, joined by a
/// separator line.
pub fn combine<'a>(documents: impl IntoIterator<Item = &'a str>) -> String {
    documents
        .into_iter()
        .map(|doc| format!("{doc}\n\n"))
        .collect::<Vec<_>>()
        .join(&format!("\n\n{DOCUMENT_SEPARATOR}\n\n"))
}

/// Run both normalisation stages over `markdown`.
pub fn normalize_text(markdown: &str) -> String {
    strip_residual_markdown(&markdown_to_text(markdown))
}

/// Stage 1: render to HTML and keep trimmed, non-blank text lines.
pub fn markdown_to_text(markdown: &str) -> String {
    // CommonMark only: tables, strikethrough and task lists stay literal.
    let mut html = String::with_capacity(markdown.len() * 3 / 2);
    pulldown_cmark::html::push_html(&mut html, Parser::new_ext(markdown, Options::empty()));

    let fragment = Html::parse_fragment(&html);
    let joined = fragment.root_element().text().collect::<Vec<_>>().join("\n");

    joined
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Stage 2: strip residual markdown syntax and trim the result.
pub fn strip_residual_markdown(text: &str) -> String {
    let mut out = apply_rules(text.to_owned(), &LEADING_RULES);
    out = strip_paired(&out, STRONG_DELIMITERS);
    out = strip_paired(&out, EMPHASIS_DELIMITERS);
    out = apply_rules(out, &TRAILING_RULES);
    out.trim().to_owned()
}

fn apply_rules(mut text: String, rules: &[(Regex, &'static str)]) -> String {
    for (re, replacement) in rules {
        if re.is_match(&text) {
            text = re.replace_all(&text, *replacement).into_owned();
        }
    }
    text
}

/// Unwrap spans enclosed by a matching pair of delimiters, scanning left to
/// right. A span closes at the nearest identical delimiter on the same line;
/// an opener without one is kept as literal text.
fn strip_paired(text: &str, delimiters: &[&str]) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    'scan: while let Some(ch) = rest.chars().next() {
        for delimiter in delimiters {
            let Some(after) = rest.strip_prefix(delimiter) else {
                continue;
            };
            let line = after.split('\n').next().unwrap_or_default();
            if let Some(close) = line.find(delimiter) {
                out.push_str(&after[..close]);
                rest = &after[close + delimiter.len()..];
                continue 'scan;
            }
        }
        out.push(ch);
        rest = &rest[ch.len_utf8()..];
    }
    out
}
