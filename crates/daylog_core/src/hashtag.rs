//! Hashtag extraction from description text.
//!
//! # Responsibility
//! - Define the extraction seam consumed by the event service.
//! - Provide the default regex-based extractor.
//!
//! # Invariants
//! - Extracted names are lowercase, deduplicated and sorted.
//! - Extraction is pure text work; per-user entity resolution happens at
//!   the association step in the repository.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;

static HASH_TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:^|[^\w#])#(\w+)").expect("valid hashtag regex"));

/// Extraction seam: given raw description text, returns the normalized
/// hashtag names to associate with the record.
pub trait HashTagExtractor {
    fn extract(&self, description: &str) -> Vec<String>;
}

/// Default extractor matching `#word` tokens.
#[derive(Debug, Clone, Copy, Default)]
pub struct RegexHashTagExtractor;

impl HashTagExtractor for RegexHashTagExtractor {
    fn extract(&self, description: &str) -> Vec<String> {
        let mut unique = BTreeSet::new();
        for caps in HASH_TAG_RE.captures_iter(description) {
            if let Some(name) = caps.get(1) {
                unique.insert(name.as_str().to_lowercase());
            }
        }
        unique.into_iter().collect()
    }
}
