//! Link extraction: turns fetched HTML into candidate links with the
//! surrounding text that the classifier will score them by.

use ledgerhound_core::models::CandidateLink;
use ledgerhound_core::traits::LinkSource;
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Ancestors considered "surrounding context" for an anchor.
const BLOCK_ELEMENTS: &[&str] = &[
    "p",
    "div",
    "section",
    "article",
    "li",
    "td",
    "th",
    "blockquote",
    "pre",
    "ul",
    "ol",
    "header",
    "footer",
    "nav",
];

const MAX_CONTEXT_CHARS: usize = 500;

/// DOM-based link source backed by the `scraper` crate.
///
/// Yields anchors in document order with relative hrefs resolved against
/// the page URL. Context extraction is best effort: a malformed anchor
/// still produces a minimal record, never an error.
#[derive(Clone)]
pub struct DomLinkSource {
    anchors: Selector,
    title: Selector,
}

impl DomLinkSource {
    pub fn new() -> Self {
        // Static selectors, parse cannot fail.
        Self {
            anchors: Selector::parse("a[href]").unwrap(),
            title: Selector::parse("title").unwrap(),
        }
    }
}

impl Default for DomLinkSource {
    fn default() -> Self {
        Self::new()
    }
}

impl LinkSource for DomLinkSource {
    fn extract_links(&self, html: &str, base_url: &str) -> Vec<CandidateLink> {
        let doc = Html::parse_document(html);

        let base = match Url::parse(base_url) {
            Ok(base) => Some(base),
            Err(err) => {
                tracing::error!(base_url, %err, "Unparseable base URL, keeping hrefs as-is");
                None
            }
        };

        let page_title = doc
            .select(&self.title)
            .next()
            .map(|t| collapse_whitespace(&t.text().collect::<Vec<_>>().join(" ")))
            .unwrap_or_default();

        let mut links = Vec::new();
        for anchor in doc.select(&self.anchors) {
            let href = anchor.value().attr("href").unwrap_or_default();
            let absolute = match &base {
                Some(base) => base
                    .join(href)
                    .map(|u| u.to_string())
                    .unwrap_or_else(|_| href.to_string()),
                None => href.to_string(),
            };

            let link_text = collapse_whitespace(&anchor.text().collect::<Vec<_>>().join(" "));
            let title = anchor.value().attr("title").unwrap_or_default().to_string();

            let mut context = block_ancestor_text(anchor);
            if context.is_empty() {
                context = if page_title.is_empty() {
                    format!("From page: {absolute}")
                } else {
                    format!("From page: {page_title}")
                };
            }

            links.push(CandidateLink {
                url: absolute,
                title,
                link_text,
                context: truncate_context(&context),
            });
        }

        tracing::debug!(base_url, count = links.len(), "Extracted candidate links");
        links
    }
}

/// Collapsed text of the nearest block-level ancestor, or empty.
fn block_ancestor_text(anchor: ElementRef<'_>) -> String {
    anchor
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|el| BLOCK_ELEMENTS.contains(&el.value().name()))
        .map(|el| collapse_whitespace(&el.text().collect::<Vec<_>>().join(" ")))
        .unwrap_or_default()
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn truncate_context(context: &str) -> String {
    if context.chars().count() <= MAX_CONTEXT_CHARS {
        return context.to_string();
    }
    let kept: String = context.chars().take(MAX_CONTEXT_CHARS - 3).collect();
    format!("{kept}...")
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://www.example.gov/finance";

    fn extract(html: &str) -> Vec<CandidateLink> {
        DomLinkSource::new().extract_links(html, BASE)
    }

    #[test]
    fn resolves_relative_hrefs_in_document_order() {
        let html = r#"
            <p><a href="/budget/2024">Budget</a></p>
            <p><a href="acfr.pdf">ACFR</a></p>
            <p><a href="https://other.gov/report">Report</a></p>
        "#;
        let links = extract(html);
        assert_eq!(links.len(), 3);
        assert_eq!(links[0].url, "https://www.example.gov/budget/2024");
        assert_eq!(links[1].url, "https://www.example.gov/acfr.pdf");
        assert_eq!(links[2].url, "https://other.gov/report");
    }

    #[test]
    fn context_comes_from_block_parent() {
        let html = r#"
            <li>Fiscal year 2024 <a href="/acfr">annual report</a> now available</li>
        "#;
        let links = extract(html);
        assert_eq!(
            links[0].context,
            "Fiscal year 2024 annual report now available"
        );
        assert_eq!(links[0].link_text, "annual report");
    }

    #[test]
    fn nested_anchor_uses_nearest_block() {
        let html = r#"
            <div>Outer text
              <p>Inner <a href="/x">link</a> text</p>
            </div>
        "#;
        let links = extract(html);
        assert_eq!(links[0].context, "Inner link text");
    }

    #[test]
    fn whitespace_is_collapsed() {
        let html = "<p>  spaced \n\t  <a href=\"/x\">out   link</a>\n</p>";
        let links = extract(html);
        assert_eq!(links[0].context, "spaced out link");
        assert_eq!(links[0].link_text, "out link");
    }

    #[test]
    fn long_context_is_truncated() {
        let long = "word ".repeat(200);
        let html = format!("<p>{long}<a href=\"/x\">link</a></p>");
        let links = extract(&html);
        assert_eq!(links[0].context.chars().count(), 500);
        assert!(links[0].context.ends_with("..."));
    }

    #[test]
    fn title_attribute_is_captured() {
        let html = r#"<p><a href="/x" title="Annual Comprehensive Financial Report">ACFR</a></p>"#;
        let links = extract(html);
        assert_eq!(links[0].title, "Annual Comprehensive Financial Report");
    }

    #[test]
    fn falls_back_to_page_title_without_block_parent() {
        let html = r#"
            <html><head><title>City Finance Portal</title></head>
            <body><a href="/x">bare link</a></body></html>
        "#;
        let links = extract(html);
        assert_eq!(links[0].context, "From page: City Finance Portal");
    }

    #[test]
    fn anchors_without_href_are_ignored() {
        let html = r#"<p><a name="top">anchor</a><a href="/real">real</a></p>"#;
        let links = extract(html);
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].url, "https://www.example.gov/real");
    }
}
