//! Board-member alignment.
//!
//! Extractors do not guarantee member order and names vary in formatting
//! ("J. Smith", "Dr John Smith"), so members are paired by name similarity
//! rather than by index or exact name. Pairing is greedy-global: the most
//! similar unmatched pair at or above the threshold is taken first, until
//! no qualifying pair remains.
//!
//! Ties resolve by lowest expected index, then lowest candidate index. A tie
//! that actually competes for the same member is recorded as an
//! [`AlignmentAmbiguity`]; it is a diagnostic, not an error.

use crate::record::BoardMember;
use crate::similarity::Similarity;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

const TIE_EPSILON: f64 = 1e-12;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlignedPair {
    pub candidate_index: usize,
    pub expected_index: usize,
    pub similarity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlignmentAmbiguity {
    pub candidate_index: usize,
    pub expected_index: usize,
    /// The pair that lost the tie-break, as (candidate, expected) indices.
    pub competing_candidate_index: usize,
    pub competing_expected_index: usize,
    pub similarity: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alignment {
    /// Sorted by expected index.
    pub pairs: Vec<AlignedPair>,
    pub unmatched_expected: Vec<usize>,
    pub unmatched_candidate: Vec<usize>,
    pub ambiguities: Vec<AlignmentAmbiguity>,
}

impl Alignment {
    /// Candidate index paired with `expected_index`, if any.
    pub fn candidate_for(&self, expected_index: usize) -> Option<&AlignedPair> {
        self.pairs
            .iter()
            .find(|pair| pair.expected_index == expected_index)
    }
}

pub fn align_members(
    candidate: &[BoardMember],
    expected: &[BoardMember],
    measure: &dyn Similarity,
    threshold: f64,
) -> Alignment {
    let mut scored: Vec<AlignedPair> = Vec::new();
    for (expected_index, expected_member) in expected.iter().enumerate() {
        for (candidate_index, candidate_member) in candidate.iter().enumerate() {
            let similarity = measure.similarity(&candidate_member.name, &expected_member.name);
            if similarity >= threshold {
                scored.push(AlignedPair {
                    candidate_index,
                    expected_index,
                    similarity,
                });
            }
        }
    }
    scored.sort_by(|a, b| {
        b.similarity
            .total_cmp(&a.similarity)
            .then_with(|| a.expected_index.cmp(&b.expected_index))
            .then_with(|| a.candidate_index.cmp(&b.candidate_index))
    });

    let mut candidate_used = vec![false; candidate.len()];
    let mut expected_used = vec![false; expected.len()];
    let mut pairs = Vec::new();
    let mut ambiguities = Vec::new();

    for (position, pair) in scored.iter().enumerate() {
        if candidate_used[pair.candidate_index] || expected_used[pair.expected_index] {
            continue;
        }
        let rival = scored[position + 1..]
            .iter()
            .take_while(|other| (pair.similarity - other.similarity).abs() < TIE_EPSILON)
            .find(|other| {
                let shares_member = other.candidate_index == pair.candidate_index
                    || other.expected_index == pair.expected_index;
                shares_member
                    && !candidate_used[other.candidate_index]
                    && !expected_used[other.expected_index]
            });
        if let Some(rival) = rival {
            tracing::warn!(
                candidate = %candidate[pair.candidate_index].name,
                expected = %expected[pair.expected_index].name,
                similarity = pair.similarity,
                "board member alignment tie resolved by index order"
            );
            ambiguities.push(AlignmentAmbiguity {
                candidate_index: pair.candidate_index,
                expected_index: pair.expected_index,
                competing_candidate_index: rival.candidate_index,
                competing_expected_index: rival.expected_index,
                similarity: pair.similarity,
            });
        }
        candidate_used[pair.candidate_index] = true;
        expected_used[pair.expected_index] = true;
        tracing::debug!(
            candidate = %candidate[pair.candidate_index].name,
            expected = %expected[pair.expected_index].name,
            similarity = pair.similarity,
            "aligned board member"
        );
        pairs.push(pair.clone());
    }

    pairs.sort_by(|a, b| match a.expected_index.cmp(&b.expected_index) {
        Ordering::Equal => a.candidate_index.cmp(&b.candidate_index),
        other => other,
    });

    Alignment {
        pairs,
        unmatched_expected: unused_indices(&expected_used),
        unmatched_candidate: unused_indices(&candidate_used),
        ambiguities,
    }
}

fn unused_indices(used: &[bool]) -> Vec<usize> {
    used.iter()
        .enumerate()
        .filter_map(|(idx, taken)| (!taken).then_some(idx))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::similarity::PersonNameSimilarity;

    fn members(names: &[&str]) -> Vec<BoardMember> {
        names.iter().map(|name| BoardMember::named(*name)).collect()
    }

    #[test]
    fn initials_align_and_missing_member_stays_unmatched() {
        let candidate = members(&["J. Smith"]);
        let expected = members(&["John Smith", "Jane Doe"]);
        let alignment = align_members(&candidate, &expected, &PersonNameSimilarity, 0.9);

        assert_eq!(alignment.pairs.len(), 1);
        assert_eq!(alignment.pairs[0].candidate_index, 0);
        assert_eq!(alignment.pairs[0].expected_index, 0);
        assert_eq!(alignment.unmatched_expected, vec![1]);
        assert!(alignment.unmatched_candidate.is_empty());
    }

    #[test]
    fn order_does_not_matter() {
        let candidate = members(&["Jane Doe", "Pierre Martin", "John Smith"]);
        let expected = members(&["John Smith", "Jane Doe"]);
        let alignment = align_members(&candidate, &expected, &PersonNameSimilarity, 0.9);

        let pairs: Vec<(usize, usize)> = alignment
            .pairs
            .iter()
            .map(|p| (p.expected_index, p.candidate_index))
            .collect();
        assert_eq!(pairs, vec![(0, 2), (1, 0)]);
        assert_eq!(alignment.unmatched_candidate, vec![1]);
        assert!(alignment.ambiguities.is_empty());
    }

    #[test]
    fn greedy_prefers_the_globally_best_pair() {
        // "J. Smith" could pair with either expected member; the exact name
        // must claim "John Smith" first.
        let candidate = members(&["J. Smith", "John Smith"]);
        let expected = members(&["John Smith", "Jane Smith"]);
        let alignment = align_members(&candidate, &expected, &PersonNameSimilarity, 0.9);

        let pairs: Vec<(usize, usize)> = alignment
            .pairs
            .iter()
            .map(|p| (p.expected_index, p.candidate_index))
            .collect();
        assert_eq!(pairs, vec![(0, 1), (1, 0)]);
    }

    #[test]
    fn ties_resolve_deterministically_and_are_reported() {
        let candidate = members(&["J. Smith"]);
        let expected = members(&["John Smith", "Jane Smith"]);
        let alignment = align_members(&candidate, &expected, &PersonNameSimilarity, 0.9);

        assert_eq!(alignment.pairs[0].expected_index, 0);
        assert_eq!(alignment.unmatched_expected, vec![1]);
        assert_eq!(alignment.ambiguities.len(), 1);
        assert_eq!(alignment.ambiguities[0].competing_expected_index, 1);
    }

    #[test]
    fn empty_sides_are_fine() {
        let alignment = align_members(&[], &members(&["Jane Doe"]), &PersonNameSimilarity, 0.9);
        assert_eq!(alignment.unmatched_expected, vec![0]);
        let alignment = align_members(&members(&["Jane Doe"]), &[], &PersonNameSimilarity, 0.9);
        assert_eq!(alignment.unmatched_candidate, vec![0]);
        assert!(alignment.pairs.is_empty());
    }
}
