//! Light HTML text and metadata extraction
//!
//! Pattern-based, not a DOM parser: good enough for article pages where the
//! body lives in `<p>` elements and the metadata in `<meta>` tags.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;

use crate::fetch::PageContent;

lazy_static! {
    static ref SCRIPT_OR_STYLE: Regex =
        Regex::new(r"(?is)<script\b.*?</script\s*>|<style\b.*?</style\s*>|<!--.*?-->").unwrap();
    static ref PARAGRAPH_OPEN: Regex = Regex::new(r"(?is)<p\b[^>]*>").unwrap();
    // `</p>` is optional in HTML: a paragraph also ends at the next `<p>` or
    // at the close of its enclosing block.
    static ref PARAGRAPH_END: Regex = Regex::new(
        r"(?is)</p\s*>|<p\b|</(?:div|article|section|main|body|td|li|blockquote|header|footer|aside|form|table)\s*>"
    )
    .unwrap();
    static ref ARTICLE: Regex = Regex::new(r"(?is)<article\b[^>]*>(.*?)</article\s*>").unwrap();
    static ref TITLE: Regex = Regex::new(r"(?is)<title\b[^>]*>(.*?)</title\s*>").unwrap();
    static ref META: Regex = Regex::new(r"(?is)<meta\b([^>]*)>").unwrap();
    static ref TIME: Regex = Regex::new(r"(?is)<time\b([^>]*)>(.*?)</time\s*>").unwrap();
    static ref ANCHOR: Regex = Regex::new(r"(?is)<a\b([^>]*)>(.*?)</a\s*>").unwrap();
    static ref ATTRIBUTE: Regex =
        Regex::new(r#"(?is)([a-z_:.\-]+)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#).unwrap();
    static ref TAG: Regex = Regex::new(r"(?s)<[^>]*>").unwrap();
    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
    static ref ISO_DATE: Regex = Regex::new(r"(\d{4}-\d{2}-\d{2})").unwrap();
}

/// Meta tags checked for a publication date, in priority order
const DATE_META: &[(&str, &str)] = &[
    ("property", "article:published_time"),
    ("name", "pubdate"),
    ("name", "publication_date"),
    ("name", "date"),
    ("property", "og:updated_time"),
];

/// Meta tags checked for an author, in priority order
const AUTHOR_META: &[(&str, &str)] = &[
    ("name", "author"),
    ("property", "article:author"),
    ("name", "byl"),
    ("name", "dc.creator"),
];

/// Extract body text and metadata from an HTML document
///
/// Body text is the non-empty paragraphs joined by blank lines, or the
/// `<article>` text when the page has no paragraphs.
pub fn extract(html: &str) -> PageContent {
    let html = SCRIPT_OR_STYLE.replace_all(html, " ");
    let metas: Vec<HashMap<String, String>> = META
        .captures_iter(&html)
        .map(|c| attributes(&c[1]))
        .collect();

    let mut text = paragraphs(&html).join("\n\n");
    if text.is_empty() {
        if let Some(article) = ARTICLE.captures(&html) {
            text = inner_text(&article[1]);
        }
    }

    PageContent {
        text,
        title: TITLE
            .captures(&html)
            .map(|c| inner_text(&c[1]))
            .filter(|t| !t.is_empty()),
        publication_date: raw_date(&html, &metas).and_then(|d| normalize_date(&d)),
        author: author(&html, &metas),
    }
}

fn paragraphs(html: &str) -> Vec<String> {
    PARAGRAPH_OPEN
        .find_iter(html)
        .map(|open| {
            let end = PARAGRAPH_END
                .find_at(html, open.end())
                .map_or(html.len(), |m| m.start());
            inner_text(&html[open.end()..end])
        })
        .filter(|t| !t.is_empty())
        .collect()
}

fn raw_date(html: &str, metas: &[HashMap<String, String>]) -> Option<String> {
    for (key, value) in DATE_META {
        if let Some(meta) = find_meta(metas, key, value) {
            let found = meta
                .get("content")
                .or_else(|| meta.get("datetime"))
                .filter(|v| !v.trim().is_empty());
            if let Some(date) = found {
                return Some(date.trim().to_string());
            }
        }
    }

    let time = TIME.captures(html)?;
    let attrs = attributes(&time[1]);
    attrs
        .get("datetime")
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
        .or_else(|| Some(inner_text(&time[2])).filter(|t| !t.is_empty()))
}

fn author(html: &str, metas: &[HashMap<String, String>]) -> Option<String> {
    for (key, value) in AUTHOR_META {
        let content = find_meta(metas, key, value)
            .and_then(|m| m.get("content"))
            .map(|c| html_escape::decode_html_entities(c.trim()).into_owned())
            .filter(|c| !c.is_empty());
        if content.is_some() {
            return content;
        }
    }

    ANCHOR
        .captures_iter(html)
        .find(|c| {
            attributes(&c[1])
                .get("rel")
                .is_some_and(|rel| rel.split_whitespace().any(|r| r.eq_ignore_ascii_case("author")))
        })
        .map(|c| inner_text(&c[2]))
        .filter(|t| !t.is_empty())
}

fn find_meta<'a>(
    metas: &'a [HashMap<String, String>],
    key: &str,
    value: &str,
) -> Option<&'a HashMap<String, String>> {
    metas
        .iter()
        .find(|m| m.get(key).is_some_and(|v| v.trim().eq_ignore_ascii_case(value)))
}

/// Attribute names lowercased; the first occurrence of a name wins.
fn attributes(raw: &str) -> HashMap<String, String> {
    let mut attrs = HashMap::new();
    for c in ATTRIBUTE.captures_iter(raw) {
        let value = c
            .get(2)
            .or_else(|| c.get(3))
            .or_else(|| c.get(4))
            .map(|m| m.as_str().to_string())
            .unwrap_or_default();
        attrs.entry(c[1].to_lowercase()).or_insert(value);
    }
    attrs
}

/// Tags dropped, entities decoded, whitespace collapsed
fn inner_text(fragment: &str) -> String {
    let stripped = TAG.replace_all(fragment, " ");
    let decoded = html_escape::decode_html_entities(&stripped);
    WHITESPACE.replace_all(decoded.trim(), " ").into_owned()
}

/// Normalize a date string to `YYYY-MM-DD`, or `None` when unrecognized
pub fn normalize_date(raw: &str) -> Option<String> {
    let raw = raw.trim();
    let date = DateTime::parse_from_rfc3339(raw)
        .map(|d| d.date_naive())
        .or_else(|_| DateTime::parse_from_rfc2822(raw).map(|d| d.date_naive()))
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S").map(|d| d.date()))
        .or_else(|_| NaiveDate::parse_from_str(raw, "%Y-%m-%d"))
        .or_else(|_| NaiveDate::parse_from_str(raw, "%B %d, %Y"))
        .or_else(|_| NaiveDate::parse_from_str(raw, "%b %d, %Y"));

    match date {
        Ok(date) => Some(date.format("%Y-%m-%d").to_string()),
        Err(_) => ISO_DATE.captures(raw).map(|c| c[1].to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const ARTICLE_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head>
  <title> City Bans Plastic Bags &amp; Straws </title>
  <meta name="author" content="Maria Santos">
  <meta property="article:published_time" content="2024-03-05T10:00:00+08:00">
  <script>var p = "<p>not text</p>";</script>
  <style>p { color: red; }</style>
</head>
<body>
  <p>The city council <b>approved</b> the ordinance.</p>
  <p>   </p>
  <p>It takes effect
     next month.</p>
</body>
</html>"#;

    #[test]
    fn test_article_extraction() {
        let page = extract(ARTICLE_PAGE);
        assert_eq!(
            page,
            PageContent {
                text: "The city council approved the ordinance.\n\nIt takes effect next month."
                    .to_string(),
                title: Some("City Bans Plastic Bags & Straws".to_string()),
                publication_date: Some("2024-03-05".to_string()),
                author: Some("Maria Santos".to_string()),
            }
        );
    }

    #[test]
    fn test_article_fallback_and_time_tag() {
        let html = r#"<html><body>
            <article><h1>Headline</h1><div>Body without paragraphs.</div></article>
            <time datetime="2023-11-20">Nov 20</time>
            <a href="/staff/jd" rel="author">J. Dela Cruz</a>
        </body></html>"#;

        let page = extract(html);
        assert_eq!(page.text, "Headline Body without paragraphs.");
        assert_eq!(page.title, None);
        assert_eq!(page.publication_date.as_deref(), Some("2023-11-20"));
        assert_eq!(page.author.as_deref(), Some("J. Dela Cruz"));
    }

    #[test]
    fn test_meta_priority() {
        let html = r#"<meta property="og:updated_time" content="2020-01-02">
            <meta name="date" content="2019-07-08">
            <meta name="dc.creator" content="Wire Desk"><p>x</p>"#;

        let page = extract(html);
        assert_eq!(page.publication_date.as_deref(), Some("2019-07-08"));
        assert_eq!(page.author.as_deref(), Some("Wire Desk"));
    }

    #[test]
    fn test_normalize_date() {
        assert_eq!(normalize_date("2024-03-05").as_deref(), Some("2024-03-05"));
        assert_eq!(normalize_date("2024-03-05T23:10:00Z").as_deref(), Some("2024-03-05"));
        assert_eq!(normalize_date("2024-03-05T23:10:00").as_deref(), Some("2024-03-05"));
        assert_eq!(
            normalize_date("Tue, 5 Mar 2024 10:00:00 +0000").as_deref(),
            Some("2024-03-05")
        );
        assert_eq!(normalize_date("March 5, 2024").as_deref(), Some("2024-03-05"));
        assert_eq!(normalize_date("updated 2021-06-30 by staff").as_deref(), Some("2021-06-30"));
        assert_eq!(normalize_date("last week"), None);
    }

    #[test]
    fn test_entities_are_decoded() {
        let html = "<p>You won&#8217;t believe it&rsquo;s &#x201C;real&#x201D; &mdash; shocking</p>\
                    <meta name=\"author\" content=\"Jos&eacute; Rizal\">";

        let page = extract(html);
        assert_eq!(
            page.text,
            "You won\u{2019}t believe it\u{2019}s \u{201C}real\u{201D} \u{2014} shocking"
        );
        assert_eq!(page.author.as_deref(), Some("Jos\u{e9} Rizal"));

        let vote = extract("<p>You won&#8217;t believe the vote</p>");
        assert!(crate::style::analyze(&vote.text).sensational_language);

        let nbsp = extract("<p>That is not&nbsp;true</p>");
        assert_eq!(nbsp.text, "That is not true");
    }

    #[test]
    fn test_unclosed_paragraphs() {
        let html = r#"<div><p>First paragraph
            <p class="lead">Second <em>one</em>
            </div>
            <section><p>Third</section>
            <p>Trailing"#;

        let page = extract(html);
        assert_eq!(page.text, "First paragraph\n\nSecond one\n\nThird\n\nTrailing");
    }

    #[test]
    fn test_empty_document() {
        assert_eq!(extract(""), PageContent::default());
    }
}
