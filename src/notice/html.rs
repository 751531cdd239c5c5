//! Minimal HTML reading for notification bodies.
//!
//! Only what the extractor needs: the visible text nodes in document order
//! and the anchors with their visible text. A plain-text body reads as a
//! single text node with no anchors.

use regex::Regex;
use std::sync::OnceLock;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anchor {
    /// Entity-decoded `href`, `None` when the attribute is absent
    pub href: Option<String>,
    /// Inner text with tags removed and entities decoded
    pub text: String,
}

#[derive(Debug, Clone, Default)]
pub struct HtmlDocument {
    pub text_nodes: Vec<String>,
    pub anchors: Vec<Anchor>,
}

fn invisible_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?is)<!--.*?-->|<script\b[^>]*>.*?</script\s*>|<style\b[^>]*>.*?</style\s*>")
            .expect("valid regex")
    })
}

fn tag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[^>]*>").expect("valid regex"))
}

fn anchor_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<a\b([^>]*)>(.*?)</a\s*>").expect("valid regex"))
}

fn href_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?is)\bhref\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#).expect("valid regex")
    })
}

impl HtmlDocument {
    pub fn parse(body: &str) -> Self {
        let visible = invisible_regex().replace_all(body, "");

        let text_nodes = tag_regex()
            .split(&visible)
            .filter(|segment| !segment.is_empty())
            .map(|segment| html_escape::decode_html_entities(segment).into_owned())
            .collect();

        let anchors = anchor_regex()
            .captures_iter(&visible)
            .map(|caps| {
                let attributes = caps.get(1).map_or("", |m| m.as_str());
                let inner = caps.get(2).map_or("", |m| m.as_str());
                Anchor {
                    href: parse_href(attributes),
                    text: visible_text(inner),
                }
            })
            .collect();

        HtmlDocument { text_nodes, anchors }
    }
}

fn parse_href(attributes: &str) -> Option<String> {
    let caps = href_regex().captures(attributes)?;
    let raw = caps.get(1).or_else(|| caps.get(2)).or_else(|| caps.get(3))?;
    Some(html_escape::decode_html_entities(raw.as_str()).into_owned())
}

fn visible_text(markup: &str) -> String {
    let stripped = tag_regex().replace_all(markup, "");
    html_escape::decode_html_entities(&stripped).into_owned()
}
