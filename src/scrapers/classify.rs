//! Mirror link classification.
//!
//! Anchors pass through a noise filter and then an ordered rule table; the
//! first matching rule decides the category. Anchors no rule matches are
//! dropped.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::browser::ElementSnapshot;
use crate::models::DownloadLink;

/// Which part of an anchor a rule inspects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchField {
    #[default]
    Text,
    Href,
}

/// One row of the classification table.
///
/// Matches when the lower-cased field contains any of `keywords`. A rule
/// without a `category` passes the raw button text through as the server
/// name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRule {
    pub keywords: Vec<String>,
    #[serde(default)]
    pub field: MatchField,
    #[serde(default)]
    pub category: Option<String>,
}

impl CategoryRule {
    pub fn named(keywords: &[&str], category: &str) -> Self {
        Self {
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            field: MatchField::Text,
            category: Some(category.to_string()),
        }
    }

    pub fn on_href(keywords: &[&str], category: &str) -> Self {
        Self {
            field: MatchField::Href,
            ..Self::named(keywords, category)
        }
    }

    pub fn passthrough(keywords: &[&str]) -> Self {
        Self {
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            field: MatchField::Text,
            category: None,
        }
    }

    fn matches(&self, text_lower: &str, href_lower: &str) -> bool {
        let haystack = match self.field {
            MatchField::Text => text_lower,
            MatchField::Href => href_lower,
        };
        self.keywords
            .iter()
            .any(|k| haystack.contains(k.to_lowercase().as_str()))
    }
}

pub fn default_rules() -> Vec<CategoryRule> {
    vec![
        CategoryRule::named(&["instant"], "Instant Download [10GBPS]"),
        CategoryRule::named(&["pixeldrain"], "PixelDrain [20MB/S]"),
        CategoryRule::on_href(&["t.me/"], "Telegram Bot"),
        CategoryRule::named(&["cloud", "zipdisk"], "Fast Cloud / ZipDisk"),
        CategoryRule::named(&["gofile", "mirror"], "GoFile Mirror"),
        CategoryRule::passthrough(&["download"]),
    ]
}

pub fn default_noise_keywords() -> Vec<String> {
    ["login", "home", "copy all", "g-drive link", "logout", "g-drive"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Maps anchor snapshots to categorized download links.
#[derive(Debug, Clone)]
pub struct LinkClassifier {
    noise_keywords: Vec<String>,
    rules: Vec<CategoryRule>,
}

impl Default for LinkClassifier {
    fn default() -> Self {
        Self::new(default_noise_keywords(), default_rules())
    }
}

impl LinkClassifier {
    pub fn new(noise_keywords: Vec<String>, rules: Vec<CategoryRule>) -> Self {
        Self {
            noise_keywords: noise_keywords
                .into_iter()
                .map(|k| k.trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
            rules,
        }
    }

    /// Classify anchors, preserving document order of the survivors.
    pub fn classify(&self, anchors: &[ElementSnapshot]) -> Vec<DownloadLink> {
        anchors.iter().filter_map(|a| self.classify_one(a)).collect()
    }

    fn classify_one(&self, anchor: &ElementSnapshot) -> Option<DownloadLink> {
        let text = anchor.text.trim();
        let href = anchor.href.as_deref().map(str::trim).unwrap_or_default();
        if text.is_empty() || href.is_empty() {
            return None;
        }

        let text_lower = text.to_lowercase();
        if let Some(noise) = self
            .noise_keywords
            .iter()
            .find(|k| text_lower.contains(k.as_str()))
        {
            debug!("Skipping '{}' (noise: {})", text, noise);
            return None;
        }

        let href_lower = href.to_lowercase();
        let rule = self
            .rules
            .iter()
            .find(|r| r.matches(&text_lower, &href_lower))?;

        Some(DownloadLink {
            server: rule.category.clone().unwrap_or_else(|| text.to_string()),
            url: href.to_string(),
            button_text: text.to_string(),
        })
    }
}
