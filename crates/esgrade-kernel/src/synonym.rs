//! Policy synonym normalization.
//!
//! A fixed, ordered alias table maps report phrasing ("Speak-Up Policy",
//! "anti-bribery", "labour rights") onto canonical policy keys. Matching is
//! case-insensitive and word-aligned substring matching over a normalized
//! form where punctuation collapses to spaces. When several aliases match
//! one phrase, the earliest entry in declaration order wins.

use crate::record::{PolicyInfo, PolicyKey};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Whether an alias is the policy's own name or a genuine synonym.
///
/// Only synonyms count as robustness cases when scanning source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AliasKind {
    Canonical,
    Synonym,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasEntry {
    pub pattern: &'static str,
    pub key: PolicyKey,
    pub kind: AliasKind,
}

const fn alias(pattern: &'static str, key: PolicyKey, kind: AliasKind) -> AliasEntry {
    AliasEntry { pattern, key, kind }
}

const DEFAULT_ALIASES: &[AliasEntry] = &[
    alias("whistleblowing", PolicyKey::Whistleblowing, AliasKind::Canonical),
    alias("whistle blowing", PolicyKey::Whistleblowing, AliasKind::Canonical),
    alias("whistleblower", PolicyKey::Whistleblowing, AliasKind::Canonical),
    alias("speak up", PolicyKey::Whistleblowing, AliasKind::Synonym),
    alias("speakup", PolicyKey::Whistleblowing, AliasKind::Synonym),
    alias("ethics hotline", PolicyKey::Whistleblowing, AliasKind::Synonym),
    alias("reporting concerns", PolicyKey::Whistleblowing, AliasKind::Synonym),
    alias("anti corruption", PolicyKey::AntiCorruption, AliasKind::Canonical),
    alias("anticorruption", PolicyKey::AntiCorruption, AliasKind::Canonical),
    alias("anti bribery", PolicyKey::AntiCorruption, AliasKind::Synonym),
    alias("antibribery", PolicyKey::AntiCorruption, AliasKind::Synonym),
    alias("bribery", PolicyKey::AntiCorruption, AliasKind::Synonym),
    alias("ethical conduct", PolicyKey::AntiCorruption, AliasKind::Synonym),
    alias("integrity", PolicyKey::AntiCorruption, AliasKind::Synonym),
    alias("human rights", PolicyKey::HumanRights, AliasKind::Canonical),
    alias("labour rights", PolicyKey::HumanRights, AliasKind::Synonym),
    alias("labor rights", PolicyKey::HumanRights, AliasKind::Synonym),
    alias("worker rights", PolicyKey::HumanRights, AliasKind::Synonym),
    alias("workers rights", PolicyKey::HumanRights, AliasKind::Synonym),
    alias("social responsibility", PolicyKey::HumanRights, AliasKind::Synonym),
    alias("climate", PolicyKey::ClimatePolicy, AliasKind::Canonical),
    alias("net zero", PolicyKey::ClimatePolicy, AliasKind::Synonym),
    alias("decarbonisation", PolicyKey::ClimatePolicy, AliasKind::Synonym),
    alias("decarbonization", PolicyKey::ClimatePolicy, AliasKind::Synonym),
    alias("dei", PolicyKey::DeiPolicy, AliasKind::Canonical),
    alias("diversity and inclusion", PolicyKey::DeiPolicy, AliasKind::Synonym),
    alias("diversity", PolicyKey::DeiPolicy, AliasKind::Synonym),
    alias("inclusion", PolicyKey::DeiPolicy, AliasKind::Synonym),
    alias("equality", PolicyKey::DeiPolicy, AliasKind::Synonym),
    alias("diverse workforce", PolicyKey::DeiPolicy, AliasKind::Synonym),
    alias("d&i", PolicyKey::DeiPolicy, AliasKind::Synonym),
];

/// A raw policy phrase with the flag value the extractor attached to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyTag {
    pub phrase: String,
    pub value: bool,
}

impl PolicyTag {
    pub fn new(phrase: impl Into<String>, value: bool) -> Self {
        Self {
            phrase: phrase.into(),
            value,
        }
    }

    /// Parse a `"Phrase: value"` text tag. A bare phrase means `true`.
    ///
    /// Returns `None` when the value part is not a recognizable boolean.
    pub fn parse(text: &str) -> Option<Self> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return None;
        }
        match tag_re().captures(trimmed) {
            Some(caps) => {
                let phrase = caps.name("phrase")?.as_str().trim();
                let value = parse_flag(caps.name("value")?.as_str())?;
                Some(Self::new(phrase, value))
            }
            None => Some(Self::new(trimmed, true)),
        }
    }
}

fn tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?P<phrase>[^:=]+?)\s*[:=]\s*(?P<value>\S.*?)\s*$")
            .expect("policy tag regex must compile")
    })
}

/// Lenient boolean parse shared with the schema validator.
pub fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "y" => Some(true),
        "false" | "no" | "n" => Some(false),
        _ => None,
    }
}

/// One tag resolved onto a canonical key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SynonymHit {
    pub phrase: String,
    pub alias: String,
    pub key: PolicyKey,
    pub value: bool,
    /// False when an earlier canonical value or tag already set the key.
    pub applied: bool,
}

/// A synonym-bearing policy the candidate was expected to resolve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SynonymCase {
    pub key: PolicyKey,
    /// Alias found in the source text, if the case came from a text scan.
    pub alias: Option<String>,
    pub resolved: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyNormalization {
    pub policies: PolicyInfo,
    pub hits: Vec<SynonymHit>,
    pub unresolved: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct SynonymTable {
    entries: Vec<AliasEntry>,
}

impl SynonymTable {
    pub fn new(entries: Vec<AliasEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[AliasEntry] {
        &self.entries
    }

    /// First alias (declaration order) contained in `phrase`.
    pub fn resolve(&self, phrase: &str) -> Option<&AliasEntry> {
        let haystack = padded(&normalize_phrase(phrase));
        self.entries
            .iter()
            .find(|entry| haystack.contains(&padded(&normalize_phrase(entry.pattern))))
    }

    /// Merge phrase tags into canonical policy flags.
    ///
    /// Values already present in `canonical` pass through untouched; a tag
    /// only fills a key that is still unset, and the first tag for a key
    /// wins.
    pub fn normalize(&self, canonical: &PolicyInfo, tags: &[PolicyTag]) -> PolicyNormalization {
        let mut policies = canonical.clone();
        let mut hits = Vec::new();
        let mut unresolved = Vec::new();

        for tag in tags {
            let Some(entry) = self.resolve(&tag.phrase) else {
                unresolved.push(tag.phrase.clone());
                continue;
            };
            let slot = policies.slot_mut(entry.key);
            let applied = slot.is_none();
            if applied {
                *slot = Some(tag.value);
            }
            tracing::debug!(
                phrase = %tag.phrase,
                alias = entry.pattern,
                key = %entry.key,
                applied,
                "resolved policy synonym"
            );
            hits.push(SynonymHit {
                phrase: tag.phrase.clone(),
                alias: entry.pattern.to_string(),
                key: entry.key,
                value: tag.value,
                applied,
            });
        }

        PolicyNormalization {
            policies,
            hits,
            unresolved,
        }
    }

    /// Policy keys whose synonym phrasing (not the canonical name) occurs in
    /// `text`, each with the first alias found, in policy key order.
    pub fn scan_text(&self, text: &str) -> Vec<(PolicyKey, &'static str)> {
        let haystack = padded(&normalize_phrase(text));
        let mut found: Vec<(PolicyKey, &'static str)> = Vec::new();
        for key in PolicyKey::ALL {
            let alias = self
                .entries
                .iter()
                .filter(|entry| entry.key == key && entry.kind == AliasKind::Synonym)
                .find(|entry| haystack.contains(&padded(&normalize_phrase(entry.pattern))));
            if let Some(entry) = alias {
                found.push((key, entry.pattern));
            }
        }
        found
    }
}

impl Default for SynonymTable {
    fn default() -> Self {
        Self::new(DEFAULT_ALIASES.to_vec())
    }
}

/// Process-wide read-only alias table.
pub fn default_table() -> &'static SynonymTable {
    static TABLE: OnceLock<SynonymTable> = OnceLock::new();
    TABLE.get_or_init(SynonymTable::default)
}

/// Normalize tags against the default table.
pub fn normalize_policies(canonical: &PolicyInfo, tags: &[PolicyTag]) -> PolicyNormalization {
    default_table().normalize(canonical, tags)
}

fn normalize_phrase(text: &str) -> String {
    let mapped: String = text
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '&' {
                c
            } else if c == '\'' || c == '\u{2019}' {
                '\0'
            } else {
                ' '
            }
        })
        .filter(|c| *c != '\0')
        .collect();
    mapped
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn padded(text: &str) -> String {
    format!(" {text} ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anti_bribery_tag_sets_anti_corruption() {
        let tag = PolicyTag::parse("Anti-bribery: true").expect("tag should parse");
        let normalized = normalize_policies(&PolicyInfo::default(), &[tag]);
        assert_eq!(normalized.policies.anti_corruption, Some(true));
        assert_eq!(normalized.hits.len(), 1);
        assert_eq!(normalized.hits[0].key, PolicyKey::AntiCorruption);
    }

    #[test]
    fn speak_up_tag_sets_whistleblowing_false() {
        let tag = PolicyTag::parse("Speak-Up Policy: false").expect("tag should parse");
        let normalized = normalize_policies(&PolicyInfo::default(), &[tag]);
        assert_eq!(normalized.policies.whistleblowing, Some(false));
    }

    #[test]
    fn aliases_are_case_insensitive_and_substring_tolerant() {
        let table = default_table();
        for (phrase, key) in [
            ("SPEAK UP HOTLINE", PolicyKey::Whistleblowing),
            ("Labour Rights Statement", PolicyKey::HumanRights),
            ("labor rights", PolicyKey::HumanRights),
            ("Diversity and Inclusion charter", PolicyKey::DeiPolicy),
            ("Net-Zero roadmap", PolicyKey::ClimatePolicy),
            ("Workers' rights", PolicyKey::HumanRights),
        ] {
            let entry = table
                .resolve(phrase)
                .unwrap_or_else(|| panic!("{phrase} should resolve"));
            assert_eq!(entry.key, key, "phrase {phrase}");
        }
    }

    #[test]
    fn short_aliases_need_word_boundaries() {
        assert!(default_table().resolve("deidentified data").is_none());
    }

    #[test]
    fn declaration_order_breaks_ties() {
        let entry = default_table()
            .resolve("Speak-up and anti-bribery policy")
            .expect("phrase should resolve");
        assert_eq!(entry.key, PolicyKey::Whistleblowing);
    }

    #[test]
    fn canonical_values_pass_through() {
        let canonical = PolicyInfo {
            whistleblowing: Some(true),
            ..PolicyInfo::default()
        };
        let normalized = normalize_policies(&canonical, &[PolicyTag::new("speak-up", false)]);
        assert_eq!(normalized.policies.whistleblowing, Some(true));
        assert!(!normalized.hits[0].applied);

        let passthrough = normalize_policies(&canonical, &[]);
        assert_eq!(passthrough.policies, canonical);
        assert!(passthrough.hits.is_empty());
    }

    #[test]
    fn unknown_phrases_are_reported() {
        let normalized = normalize_policies(
            &PolicyInfo::default(),
            &[PolicyTag::new("Tax transparency", true)],
        );
        assert_eq!(normalized.unresolved, vec!["Tax transparency".to_string()]);
        assert_eq!(normalized.policies, PolicyInfo::default());
    }

    #[test]
    fn tag_parse_handles_bare_phrases_and_bad_values() {
        assert_eq!(
            PolicyTag::parse("Human rights policy"),
            Some(PolicyTag::new("Human rights policy", true))
        );
        assert_eq!(
            PolicyTag::parse("Integrity = no"),
            Some(PolicyTag::new("Integrity", false))
        );
        assert_eq!(PolicyTag::parse("Climate: maybe"), None);
        assert_eq!(PolicyTag::parse("   "), None);
    }

    #[test]
    fn text_scan_only_reports_synonyms() {
        let text = "Our Speak-Up channel is open to all. We publish a climate policy.";
        let found = default_table().scan_text(text);
        assert_eq!(found, vec![(PolicyKey::Whistleblowing, "speak up")]);
    }
}
