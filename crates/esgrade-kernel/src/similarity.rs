//! String similarity capability.
//!
//! Every implementation returns a value in `[0, 1]`, is symmetric, and
//! returns `1.0` for strings that normalize identically.

/// Titles and suffixes that carry no identity in a person's name.
const NAME_NOISE_TOKENS: &[&str] = &[
    "mr", "mrs", "ms", "miss", "mx", "dr", "prof", "professor", "sir", "dame", "lord", "lady",
    "jr", "sr", "ii", "iii", "phd",
];

/// Similarity assigned to names with the same surname and compatible given
/// names ("J. Smith" / "John Smith").
pub const NAME_MATCH_FLOOR: f64 = 0.95;

pub trait Similarity: Send + Sync {
    fn similarity(&self, a: &str, b: &str) -> f64;
}

/// Case-insensitive, whitespace-collapsed Indel similarity:
/// `2 * LCS(a, b) / (|a| + |b|)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextSimilarity;

impl Similarity for TextSimilarity {
    fn similarity(&self, a: &str, b: &str) -> f64 {
        indel_ratio(&normalize_text(a), &normalize_text(b))
    }
}

/// Person-name similarity used for chair/member names and board alignment.
///
/// Honorifics are dropped and punctuation is ignored. Two names with the
/// same surname whose first given names are equal, or where one is the
/// initial of the other, score at least [`NAME_MATCH_FLOOR`].
#[derive(Debug, Clone, Copy, Default)]
pub struct PersonNameSimilarity;

impl Similarity for PersonNameSimilarity {
    fn similarity(&self, a: &str, b: &str) -> f64 {
        let left = name_tokens(a);
        let right = name_tokens(b);
        let base = indel_ratio(&left.join(" "), &right.join(" "));
        if same_person_shape(&left, &right) {
            base.max(NAME_MATCH_FLOOR)
        } else {
            base
        }
    }
}

pub fn normalize_text(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Normalized Indel similarity over Unicode scalar values.
pub fn indel_ratio(a: &str, b: &str) -> f64 {
    let left: Vec<char> = a.chars().collect();
    let right: Vec<char> = b.chars().collect();
    let total = left.len() + right.len();
    if total == 0 {
        return 1.0;
    }
    let lcs = lcs_len(&left, &right);
    (2 * lcs) as f64 / total as f64
}

fn lcs_len(a: &[char], b: &[char]) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];
    for ca in a {
        for (j, cb) in b.iter().enumerate() {
            curr[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                curr[j].max(prev[j + 1])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

fn name_tokens(name: &str) -> Vec<String> {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '\'' {
                c
            } else {
                ' '
            }
        })
        .collect::<String>()
        .to_lowercase();
    cleaned
        .split_whitespace()
        .filter(|token| !NAME_NOISE_TOKENS.contains(token))
        .map(str::to_string)
        .collect()
}

fn same_person_shape(left: &[String], right: &[String]) -> bool {
    let (Some((left_surname, left_given)), Some((right_surname, right_given))) =
        (left.split_last(), right.split_last())
    else {
        return false;
    };
    if left_surname != right_surname {
        return false;
    }
    match (left_given.first(), right_given.first()) {
        (Some(a), Some(b)) => given_names_compatible(a, b),
        _ => false,
    }
}

fn given_names_compatible(a: &str, b: &str) -> bool {
    if a == b {
        return true;
    }
    let is_initial = |token: &str| token.chars().count() == 1;
    (is_initial(a) && b.starts_with(a)) || (is_initial(b) && a.starts_with(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_after_normalization_is_one() {
        assert_eq!(TextSimilarity.similarity("Acme  Corp", "acme corp"), 1.0);
        assert_eq!(TextSimilarity.similarity("", ""), 1.0);
    }

    #[test]
    fn trailing_punctuation_stays_above_threshold() {
        let score = TextSimilarity.similarity("Acme Corp.", "Acme Corp");
        assert!(score >= 0.9, "score was {score}");
    }

    #[test]
    fn different_strings_fall_below_threshold() {
        let score = TextSimilarity.similarity("Limited", "Reasonable");
        assert!(score < 0.9, "score was {score}");
    }

    #[test]
    fn similarity_is_symmetric() {
        let pairs = [
            ("Acme Corp", "ACME Corporation"),
            ("J. Smith", "John Smith"),
            ("Jane Doe", "John Smith"),
            ("", "x"),
            ("Nordlicht Energie AG", "Nordlicht Energy"),
        ];
        for (a, b) in pairs {
            assert_eq!(
                TextSimilarity.similarity(a, b),
                TextSimilarity.similarity(b, a)
            );
            assert_eq!(
                PersonNameSimilarity.similarity(a, b),
                PersonNameSimilarity.similarity(b, a)
            );
        }
    }

    #[test]
    fn indel_ratio_matches_hand_computed_value() {
        // LCS("kitten", "sitting") = 4 -> 8 / 13
        let ratio = indel_ratio("kitten", "sitting");
        assert!((ratio - 8.0 / 13.0).abs() < 1e-12);
    }

    #[test]
    fn initial_matches_given_name_with_same_surname() {
        assert!(PersonNameSimilarity.similarity("J. Smith", "John Smith") >= NAME_MATCH_FLOOR);
        assert!(PersonNameSimilarity.similarity("Dr. John A. Smith", "John Smith") >= 0.9);
        assert!(PersonNameSimilarity.similarity("J. Smith", "Jane Doe") < 0.9);
    }

    #[test]
    fn conflicting_given_names_do_not_get_the_floor() {
        let score = PersonNameSimilarity.similarity("Mark Smith", "John Smith");
        assert!(score < NAME_MATCH_FLOOR, "score was {score}");
    }
}
