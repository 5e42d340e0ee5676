//! HTML content extraction: strips boilerplate and renders the main content
//! area as light markdown.
//!
//! This is the plain-HTTP stand-in for a rendering collaborator's "fit
//! markdown". It removes excluded tags, picks the main content root, turns
//! block elements into markdown lines and prunes blocks that are too short
//! or mostly link text.

use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::config::FetchConfig;

/// Default maximum characters of markdown produced per page.
pub const DEFAULT_MAX_CHARS: usize = 100_000;

/// Tags that never carry readable content and are always stripped.
const ALWAYS_STRIPPED: &[&str] = &["script", "style", "noscript", "svg"];

/// Block-level elements rendered as markdown.
const BLOCK_SELECTOR: &str = "h1, h2, h3, h4, h5, h6, p, li, pre, blockquote";

/// Render the main content of `html` as markdown.
///
/// Returns `None` if nothing readable is left after pruning.
pub fn html_to_markdown(html: &str, page_url: &str, config: &FetchConfig) -> Option<String> {
    html_to_markdown_with_limit(html, page_url, config, DEFAULT_MAX_CHARS)
}

/// Same as [`html_to_markdown`] with a custom character limit.
pub fn html_to_markdown_with_limit(
    html: &str,
    page_url: &str,
    config: &FetchConfig,
    max_chars: usize,
) -> Option<String> {
    let cleaned_html = strip_boilerplate_tags(html, &config.excluded_tags);
    let document = Html::parse_document(&cleaned_html);
    let root = main_content_root(&document)?;

    let page_host = Url::parse(page_url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_owned));

    let mut blocks = render_blocks(root, page_host.as_deref(), config);
    if blocks.is_empty() {
        let text = normalise_whitespace(&root.text().collect::<Vec<_>>().join(" "));
        if !text.is_empty() {
            blocks.push(text);
        }
    }
    if blocks.is_empty() {
        return None;
    }

    Some(truncate_to_limit(&blocks.join("\n\n"), max_chars))
}

/// Find the main content element, falling back to `<body>`.
fn main_content_root(document: &Html) -> Option<ElementRef<'_>> {
    let content_selectors = ["article", "main", "[role=\"main\"]", "body"];

    for selector_str in &content_selectors {
        let Ok(selector) = Selector::parse(selector_str) else {
            continue;
        };
        if let Some(element) = document.select(&selector).next() {
            if element.text().any(|t| !t.trim().is_empty()) {
                return Some(element);
            }
        }
    }

    None
}

fn is_block(name: &str) -> bool {
    matches!(
        name,
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "p" | "li" | "pre" | "blockquote"
    )
}

/// Render outermost block elements under `root` as markdown strings.
fn render_blocks(root: ElementRef<'_>, page_host: Option<&str>, config: &FetchConfig) -> Vec<String> {
    let Ok(selector) = Selector::parse(BLOCK_SELECTOR) else {
        return Vec::new();
    };

    let mut blocks = Vec::new();
    for element in root.select(&selector) {
        // Nested blocks are rendered as part of their outermost block.
        let nested = element
            .ancestors()
            .filter_map(ElementRef::wrap)
            .take_while(|a| a.id() != root.id())
            .any(|a| is_block(a.value().name()));
        if nested {
            continue;
        }

        let name = element.value().name();
        if name == "pre" {
            let code = element.text().collect::<String>();
            let code = code.trim_matches('\n');
            if !code.trim().is_empty() {
                blocks.push(format!("```\n{code}\n```"));
            }
            continue;
        }

        let (raw_text, link_chars) = block_text(element, page_host, config.exclude_external_links);
        let text = normalise_whitespace(&raw_text).replace('\n', " ");
        if text.is_empty() {
            continue;
        }

        if let Some(level) = heading_level(name) {
            blocks.push(format!("{} {text}", "#".repeat(level)));
            continue;
        }

        if text.split_whitespace().count() < config.word_count_threshold {
            continue;
        }
        if text_density(&text, link_chars) < config.content_filter_threshold {
            continue;
        }

        match name {
            "li" => blocks.push(format!("- {text}")),
            "blockquote" => blocks.push(format!("> {text}")),
            _ => blocks.push(text),
        }
    }
    blocks
}

fn heading_level(name: &str) -> Option<usize> {
    match name {
        "h1" => Some(1),
        "h2" => Some(2),
        "h3" => Some(3),
        "h4" => Some(4),
        "h5" => Some(5),
        "h6" => Some(6),
        _ => None,
    }
}

/// Collect a block's text and the number of characters inside links.
///
/// Text of links pointing to another host is dropped when
/// `exclude_external` is set.
fn block_text(block: ElementRef<'_>, page_host: Option<&str>, exclude_external: bool) -> (String, usize) {
    let mut text = String::new();
    let mut link_chars = 0;

    for node in block.descendants() {
        let Some(fragment) = node.value().as_text() else {
            continue;
        };
        let anchor = node
            .ancestors()
            .filter_map(ElementRef::wrap)
            .take_while(|a| a.id() != block.id())
            .find(|a| a.value().name() == "a");

        if let Some(anchor) = anchor {
            if exclude_external && is_external(anchor.value().attr("href"), page_host) {
                continue;
            }
            link_chars += fragment.trim().chars().count();
        }
        text.push_str(fragment);
    }

    (text, link_chars)
}

fn is_external(href: Option<&str>, page_host: Option<&str>) -> bool {
    let (Some(href), Some(page_host)) = (href, page_host) else {
        return false;
    };
    match Url::parse(href) {
        Ok(url) => url.host_str().is_some_and(|h| h != page_host),
        // Relative links resolve against the page itself.
        Err(_) => false,
    }
}

/// Share of non-link characters in a block, in `[0, 1]`.
fn text_density(text: &str, link_chars: usize) -> f64 {
    let total = text.chars().filter(|c| !c.is_whitespace()).count();
    if total == 0 {
        return 0.0;
    }
    let plain = total.saturating_sub(link_chars);
    plain as f64 / total as f64
}

/// Remove boilerplate HTML tags and their content before parsing.
fn strip_boilerplate_tags(html: &str, excluded: &[String]) -> String {
    let mut result = html.to_owned();
    for tag in ALWAYS_STRIPPED
        .iter()
        .copied()
        .chain(excluded.iter().map(String::as_str))
    {
        result = strip_tag(&result, tag);
    }
    result
}

/// Remove all instances of a specific HTML tag and its content.
fn strip_tag(html: &str, tag: &str) -> String {
    let mut result = String::with_capacity(html.len());
    let lower = html.to_lowercase();
    // Lowercasing can change byte lengths for some non-ASCII text; fall back
    // to leaving the document untouched rather than slicing mid-character.
    if lower.len() != html.len() {
        return html.to_owned();
    }
    let open_tag = format!("<{tag}");
    let close_tag = format!("</{tag}>");

    let mut pos = 0;
    loop {
        let start = match lower[pos..].find(&open_tag) {
            Some(offset) => pos + offset,
            None => {
                result.push_str(&html[pos..]);
                break;
            }
        };

        // Verify this is actually the target tag (not e.g. <navigate> for <nav>).
        let after_tag = start + open_tag.len();
        if after_tag < lower.len() {
            let next_byte = lower.as_bytes()[after_tag];
            if !matches!(next_byte, b' ' | b'>' | b'/' | b'\n' | b'\r' | b'\t') {
                result.push_str(&html[pos..after_tag]);
                pos = after_tag;
                continue;
            }
        }

        result.push_str(&html[pos..start]);

        let end = match lower[start..].find(&close_tag) {
            Some(offset) => start + offset + close_tag.len(),
            None => match lower[start..].find('>') {
                Some(offset) => start + offset + 1,
                None => html.len(),
            },
        };

        pos = end;
    }

    result
}

/// Collapse excess whitespace: multiple spaces become one, 3+ newlines become 2.
fn normalise_whitespace(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut prev_was_space = false;
    let mut newline_count: u32 = 0;

    for ch in text.chars() {
        if ch == '\n' || ch == '\r' {
            newline_count += 1;
            prev_was_space = false;
            if newline_count <= 2 {
                result.push('\n');
            }
        } else if ch.is_whitespace() {
            newline_count = 0;
            if !prev_was_space {
                result.push(' ');
                prev_was_space = true;
            }
        } else {
            newline_count = 0;
            prev_was_space = false;
            result.push(ch);
        }
    }

    result
        .lines()
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_owned()
}

/// Truncate text to the given byte limit, breaking at a char boundary.
pub(crate) fn truncate_to_limit(text: &str, max_chars: usize) -> String {
    if text.len() <= max_chars {
        return text.to_owned();
    }

    let mut end = max_chars;
    while !text.is_char_boundary(end) && end > 0 {
        end -= 1;
    }

    text[..end].to_owned()
}
