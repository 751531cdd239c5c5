use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::html::HtmlDocument;
use crate::config::{ExtractionConfig, DEFAULT_PROFILE_TRIGGERS};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EmailType {
    #[serde(rename = "Temporary Access")]
    TemporaryAccess,
    #[serde(rename = "Household Update")]
    HouseholdUpdate,
}

impl EmailType {
    pub fn label(self) -> &'static str {
        match self {
            EmailType::TemporaryAccess => "Temporary Access",
            EmailType::HouseholdUpdate => "Household Update",
        }
    }
}

impl fmt::Display for EmailType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One recognised anchor text and the kind of message it identifies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkText {
    pub text: String,
    pub kind: EmailType,
}

impl LinkText {
    pub fn new(text: impl Into<String>, kind: EmailType) -> Self {
        LinkText {
            text: text.into(),
            kind,
        }
    }
}

/// Phrases and anchor texts the extractor recognises.
#[derive(Debug, Clone)]
pub struct ExtractionRules {
    pub profile_triggers: Vec<String>,
    pub link_texts: Vec<LinkText>,
}

impl ExtractionRules {
    pub fn from_config(config: &ExtractionConfig) -> Self {
        ExtractionRules {
            profile_triggers: DEFAULT_PROFILE_TRIGGERS.iter().map(|s| s.to_string()).collect(),
            link_texts: config.link_texts(),
        }
    }

    fn kind_for(&self, anchor_text: &str) -> Option<EmailType> {
        self.link_texts
            .iter()
            .find(|entry| entry.text == anchor_text)
            .map(|entry| entry.kind)
    }
}

impl Default for ExtractionRules {
    fn default() -> Self {
        Self::from_config(&ExtractionConfig::default())
    }
}

/// Fields extracted from one notification body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSet {
    pub profile_name: Option<String>,
    pub link: String,
    pub kind: EmailType,
}

/// Extracts profile name, action link and kind from a resolved body.
///
/// Returns `None` when no anchor carries a recognised text, or when the
/// first one that does has no usable `href`.
pub fn extract(body: &str, rules: &ExtractionRules) -> Option<FieldSet> {
    let document = HtmlDocument::parse(body);

    let (anchor, kind) = document
        .anchors
        .iter()
        .find_map(|anchor| rules.kind_for(&anchor.text).map(|kind| (anchor, kind)))?;

    let link = match anchor.href.as_deref() {
        Some(href) if !href.trim().is_empty() => href.trim().to_string(),
        _ => {
            debug!("Anchor '{}' matched but has no href", anchor.text);
            return None;
        }
    };

    let profile_name = extract_profile_name(&document, rules);
    debug!("Extracted fields: profile={:?}, kind={}, link={}", profile_name, kind, link);

    Some(FieldSet {
        profile_name,
        link,
        kind,
    })
}

/// Name following the first trigger phrase, searched node by node.
///
/// The name starts one character after the phrase and stops at the next
/// whitespace or at the end of the node. A phrase split across inline
/// markup is not found.
pub fn extract_profile_name(document: &HtmlDocument, rules: &ExtractionRules) -> Option<String> {
    let (node, end_of_phrase) = document.text_nodes.iter().find_map(|node| {
        rules
            .profile_triggers
            .iter()
            .filter_map(|trigger| node.find(trigger.as_str()).map(|pos| pos + trigger.len()))
            .min()
            .map(|end| (node, end))
    })?;

    let mut rest = node[end_of_phrase..].chars();
    rest.next(); // separator after the connective word
    let name: String = rest.take_while(|c| !c.is_whitespace()).collect();
    let name = name.trim();

    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}
