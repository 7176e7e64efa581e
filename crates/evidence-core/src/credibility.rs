//! Source credibility from a fixed domain-tier policy
//!
//! Tiers, first match wins:
//! - empty domain: 0.60
//! - curated trusted outlet (global and Philippine news, government): 0.98
//! - `.gov` / `.edu`: 0.95
//! - `.org`: 0.85
//! - anything else: 0.60
//!
//! Unknown domains get baseline trust, never zero.

use reqwest::Url;
use std::collections::HashSet;

pub const TRUSTED_SCORE: f32 = 0.98;
pub const INSTITUTIONAL_SCORE: f32 = 0.95;
pub const ORG_SCORE: f32 = 0.85;
pub const BASELINE_SCORE: f32 = 0.60;

/// Curated outlets that receive the top tier
pub const TRUSTED_DOMAINS: &[&str] = &[
    "nytimes.com",
    "bbc.co.uk",
    "bbc.com",
    "theguardian.com",
    "reuters.com",
    "apnews.com",
    "washingtonpost.com",
    "wsj.com",
    "cnn.com",
    "aljazeera.com",
    "sciencedaily.com",
    "nature.com",
    "who.int",
    "cdc.gov",
    "gov.uk",
    "un.org",
    "nih.gov",
    "statista.com",
    "inquirer.net",
    "philstar.com",
    "manilatimes.net",
    "mb.com.ph",
    "manilastandard.net",
    "businessmirror.com.ph",
    "gmanetwork.com",
    "abs-cbn.com",
    "news.abs-cbn.com",
    "cnnphilippines.com",
    "rappler.com",
    "sunstar.com.ph",
    "pna.gov.ph",
    "doh.gov.ph",
    "psa.gov.ph",
    "gov.ph",
];

/// Lowercased URL host with userinfo, port and a leading `www.` removed.
///
/// Returns an empty string when the URL has no host (relative paths,
/// missing scheme, unparseable input).
pub fn normalize_domain(url: &str) -> String {
    let Ok(parsed) = Url::parse(url.trim()) else {
        return String::new();
    };
    let host = parsed.host_str().unwrap_or_default().to_lowercase();
    host.strip_prefix("www.").unwrap_or(&host).to_string()
}

/// Tiered domain trust policy
#[derive(Debug, Clone)]
pub struct CredibilityPolicy {
    trusted: HashSet<String>,
}

impl Default for CredibilityPolicy {
    fn default() -> Self {
        Self::with_trusted(TRUSTED_DOMAINS.iter().copied())
    }
}

impl CredibilityPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_trusted<'a>(domains: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            trusted: domains.into_iter().map(str::to_lowercase).collect(),
        }
    }

    pub fn is_trusted(&self, domain: &str) -> bool {
        self.trusted.contains(&domain.to_lowercase())
    }

    /// Score a normalized domain. Total: never fails, never returns zero.
    pub fn score(&self, domain: Option<&str>) -> f32 {
        let domain = match domain.map(str::trim) {
            Some(d) if !d.is_empty() => d.to_lowercase(),
            _ => return BASELINE_SCORE,
        };

        if self.trusted.contains(&domain) {
            TRUSTED_SCORE
        } else if domain.ends_with(".gov") || domain.ends_with(".edu") {
            INSTITUTIONAL_SCORE
        } else if domain.ends_with(".org") {
            ORG_SCORE
        } else {
            BASELINE_SCORE
        }
    }

    /// Score straight from a URL.
    pub fn score_url(&self, url: &str) -> f32 {
        self.score(Some(&normalize_domain(url)))
    }
}
