//! CSS extraction primitives over an already-fetched document.
//!
//! `scraper::Html` is not `Send`, so everything here is synchronous: parse,
//! extract into owned values, drop the document. Strategies call these
//! between awaits to keep their futures `Send`.

use reqwest::Url;
use scraper::{Html, Selector};

use crate::engine::error::ScrapeError;
use crate::model::relative_id;

/// Parse a CSS selector or return a parse error (avoids panics from
/// Selector::parse).
pub fn parse_selector(sel: &str, url: &Url) -> Result<Selector, ScrapeError> {
    Selector::parse(sel).map_err(|e| ScrapeError::ParseFailure {
        url: url.to_string(),
        reason: format!("invalid selector {:?}: {}", sel, e),
    })
}

/// One extracted anchor: site-relative identifier plus display text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anchor {
    pub id: String,
    pub title: String,
}

/// Extract anchors matching `selector` in document order. Each href is
/// resolved against `base` and reduced to a site-relative identifier; the
/// title is the anchor's `title` attribute or its text content.
///
/// With `required`, zero matches is a `ParseFailure` (the extraction rule
/// expected at least one element); otherwise an empty vec is a valid result
/// (e.g. an empty pagination page).
pub fn select_anchors(
    html: &str,
    selector: &str,
    base: &Url,
    page_url: &Url,
    required: bool,
) -> Result<Vec<Anchor>, ScrapeError> {
    let sel = parse_selector(selector, page_url)?;
    let doc = Html::parse_document(html);
    let mut anchors = Vec::new();
    for el in doc.select(&sel) {
        let href = match el.value().attr("href") {
            Some(h) if !h.is_empty() && h != "#" => h,
            _ => continue,
        };
        let resolved = match page_url.join(href) {
            Ok(u) => u,
            Err(_) => continue,
        };
        let title = el
            .value()
            .attr("title")
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| el.text().collect::<String>().trim().to_string());
        if title.is_empty() {
            continue;
        }
        anchors.push(Anchor {
            id: relative_id(base, &resolved),
            title,
        });
    }
    if required && anchors.is_empty() {
        return Err(ScrapeError::ParseFailure {
            url: page_url.to_string(),
            reason: format!("selector {:?} matched no anchors", selector),
        });
    }
    Ok(anchors)
}

/// Extract an attribute from every element matching `selector`, trying each
/// attribute name in order (lazy-loading sites put the real source in
/// `data-src` and a placeholder in `src`). Values are resolved against
/// `page_url` into absolute URLs.
pub fn select_attr_urls(
    html: &str,
    selector: &str,
    attrs: &[&str],
    page_url: &Url,
    required: bool,
) -> Result<Vec<String>, ScrapeError> {
    let sel = parse_selector(selector, page_url)?;
    let doc = Html::parse_document(html);
    let mut urls = Vec::new();
    for el in doc.select(&sel) {
        let raw = attrs
            .iter()
            .find_map(|a| el.value().attr(a))
            .map(str::trim)
            .filter(|v| !v.is_empty());
        let raw = match raw {
            Some(v) => v,
            None => continue,
        };
        if let Ok(resolved) = page_url.join(raw) {
            urls.push(resolved.to_string());
        }
    }
    if required && urls.is_empty() {
        return Err(ScrapeError::ParseFailure {
            url: page_url.to_string(),
            reason: format!("selector {:?} matched no usable elements", selector),
        });
    }
    Ok(urls)
}

/// Text content of the first element matching `selector`, trimmed. None if
/// nothing matches or the text is empty.
pub fn first_text(html: &str, selector: &str, page_url: &Url) -> Option<String> {
    let sel = parse_selector(selector, page_url).ok()?;
    let doc = Html::parse_document(html);
    doc.select(&sel)
        .next()
        .map(|e| e.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}
