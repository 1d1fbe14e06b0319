//! Classification of similarity scores into actionable tiers.
//!
//! Every candidate is classified on its own: the first threshold it meets in
//! the order Exact > High > Moderate decides its tier, anything below the
//! lowest threshold is [`ClassificationTier::NoMatch`].
//!
//! Which candidates get pre-marked for deletion is a separate decision made
//! by [`auto_select`] under a [`SelectionPolicy`]. Nothing in this module
//! deletes anything.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use super::detector::CandidateResult;
use super::scorer::SimilarityScore;

/// Minimum score for [`ClassificationTier::High`].
pub const HIGH_THRESHOLD: f64 = 90.0;

/// Minimum score for [`ClassificationTier::Moderate`].
pub const MODERATE_THRESHOLD: f64 = 80.0;

/// Discrete confidence tier of a candidate.
///
/// Tiers order from most to least similar, so iterating a sorted collection
/// of tiers visits [`Exact`](Self::Exact) first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClassificationTier {
    /// Score of exactly 100
    Exact,
    /// Score of at least 90
    High,
    /// Score of at least 80
    Moderate,
    /// Anything lower
    NoMatch,
}

impl ClassificationTier {
    /// All tiers in priority order.
    pub const ALL: [ClassificationTier; 4] = [
        ClassificationTier::Exact,
        ClassificationTier::High,
        ClassificationTier::Moderate,
        ClassificationTier::NoMatch,
    ];

    /// Tier for a single score.
    ///
    /// # Example
    ///
    /// ```
    /// use neardupe::similarity::{ClassificationTier, SimilarityScore};
    ///
    /// assert_eq!(ClassificationTier::of(SimilarityScore::new(100.0)), ClassificationTier::Exact);
    /// assert_eq!(ClassificationTier::of(SimilarityScore::new(85.0)), ClassificationTier::Moderate);
    /// assert_eq!(ClassificationTier::of(SimilarityScore::new(60.0)), ClassificationTier::NoMatch);
    /// ```
    #[must_use]
    pub fn of(score: SimilarityScore) -> Self {
        let value = score.value();
        if value >= SimilarityScore::IDENTICAL.value() {
            Self::Exact
        } else if value >= HIGH_THRESHOLD {
            Self::High
        } else if value >= MODERATE_THRESHOLD {
            Self::Moderate
        } else {
            Self::NoMatch
        }
    }

    /// Whether the tier counts as a match.
    #[must_use]
    pub fn is_match(self) -> bool {
        self != Self::NoMatch
    }

    /// Short lowercase label.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::High => "high",
            Self::Moderate => "moderate",
            Self::NoMatch => "no-match",
        }
    }
}

impl fmt::Display for ClassificationTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Mapping from tier to the names of the candidates in it.
///
/// Every tier is present, possibly with an empty set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Classification {
    tiers: BTreeMap<ClassificationTier, BTreeSet<String>>,
}

impl Default for Classification {
    fn default() -> Self {
        Self {
            tiers: ClassificationTier::ALL
                .iter()
                .map(|tier| (*tier, BTreeSet::new()))
                .collect(),
        }
    }
}

impl Classification {
    /// Names in the given tier.
    #[must_use]
    pub fn get(&self, tier: ClassificationTier) -> &BTreeSet<String> {
        // Default populates every tier
        &self.tiers[&tier]
    }

    /// Tier of a candidate, if it was classified.
    #[must_use]
    pub fn tier_of(&self, name: &str) -> Option<ClassificationTier> {
        self.tiers
            .iter()
            .find(|(_, names)| names.contains(name))
            .map(|(tier, _)| *tier)
    }

    /// Highest tier that holds at least one match.
    #[must_use]
    pub fn best_tier(&self) -> Option<ClassificationTier> {
        self.tiers
            .iter()
            .find(|(tier, names)| tier.is_match() && !names.is_empty())
            .map(|(tier, _)| *tier)
    }

    /// Number of candidates in matching tiers.
    #[must_use]
    pub fn match_count(&self) -> usize {
        self.tiers
            .iter()
            .filter(|(tier, _)| tier.is_match())
            .map(|(_, names)| names.len())
            .sum()
    }

    /// Total number of classified candidates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tiers.values().map(BTreeSet::len).sum()
    }

    /// Whether no candidate was classified.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate tiers in priority order.
    pub fn iter(&self) -> impl Iterator<Item = (ClassificationTier, &BTreeSet<String>)> {
        self.tiers.iter().map(|(tier, names)| (*tier, names))
    }
}

/// Classify every result into exactly one tier.
#[must_use]
pub fn classify(results: &[CandidateResult]) -> Classification {
    let mut classification = Classification::default();
    for result in results {
        let tier = ClassificationTier::of(result.score);
        log::trace!("{} -> {} ({})", result.name, tier, result.score);
        classification
            .tiers
            .entry(tier)
            .or_default()
            .insert(result.name.clone());
    }
    classification
}

/// Which classified candidates are pre-marked for deletion.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum SelectionPolicy {
    /// Every candidate in a matching tier
    #[default]
    #[value(name = "all")]
    #[serde(rename = "all")]
    AllMatches,
    /// Only candidates in the highest non-empty matching tier
    #[value(name = "best")]
    #[serde(rename = "best")]
    BestTierOnly,
    /// Nothing is pre-marked
    Off,
}

impl fmt::Display for SelectionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AllMatches => write!(f, "all"),
            Self::BestTierOnly => write!(f, "best"),
            Self::Off => write!(f, "off"),
        }
    }
}

/// Candidate identifiers recommended for deletion under `policy`.
#[must_use]
pub fn auto_select(classification: &Classification, policy: SelectionPolicy) -> BTreeSet<String> {
    match policy {
        SelectionPolicy::Off => BTreeSet::new(),
        SelectionPolicy::AllMatches => classification
            .iter()
            .filter(|(tier, _)| tier.is_match())
            .flat_map(|(_, names)| names.iter().cloned())
            .collect(),
        SelectionPolicy::BestTierOnly => classification
            .best_tier()
            .map(|tier| classification.get(tier).clone())
            .unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn result(name: &str, score: f64) -> CandidateResult {
        CandidateResult {
            name: name.to_string(),
            path: PathBuf::from("/docs").join(name),
            size: 10,
            modified: None,
            score: SimilarityScore::new(score),
        }
    }

    #[test]
    fn test_tier_thresholds() {
        let of = |v| ClassificationTier::of(SimilarityScore::new(v));
        assert_eq!(of(100.0), ClassificationTier::Exact);
        assert_eq!(of(99.99), ClassificationTier::High);
        assert_eq!(of(90.0), ClassificationTier::High);
        assert_eq!(of(89.99), ClassificationTier::Moderate);
        assert_eq!(of(85.0), ClassificationTier::Moderate);
        assert_eq!(of(80.0), ClassificationTier::Moderate);
        assert_eq!(of(79.99), ClassificationTier::NoMatch);
        assert_eq!(of(60.0), ClassificationTier::NoMatch);
        assert_eq!(of(0.0), ClassificationTier::NoMatch);
    }

    #[test]
    fn test_classify_each_candidate_independently() {
        let results = vec![
            result("same.txt", 100.0),
            result("close.txt", 95.0),
            result("edit.txt", 85.0),
            result("other.txt", 60.0),
            result("twin.txt", 100.0),
        ];

        let classification = classify(&results);

        assert_eq!(classification.len(), 5);
        assert_eq!(classification.get(ClassificationTier::Exact).len(), 2);
        assert_eq!(classification.tier_of("close.txt"), Some(ClassificationTier::High));
        assert_eq!(classification.tier_of("edit.txt"), Some(ClassificationTier::Moderate));
        assert_eq!(classification.tier_of("other.txt"), Some(ClassificationTier::NoMatch));
        assert_eq!(classification.tier_of("missing.txt"), None);
        assert_eq!(classification.match_count(), 4);
    }

    #[test]
    fn test_empty_classification_has_all_tiers() {
        let classification = classify(&[]);

        assert!(classification.is_empty());
        assert_eq!(classification.iter().count(), 4);
        assert_eq!(classification.best_tier(), None);
    }

    #[test]
    fn test_auto_select_policies() {
        let classification = classify(&[
            result("a.txt", 92.0),
            result("b.txt", 81.0),
            result("c.txt", 10.0),
        ]);

        let all = auto_select(&classification, SelectionPolicy::AllMatches);
        assert_eq!(all.into_iter().collect::<Vec<_>>(), vec!["a.txt", "b.txt"]);

        let best = auto_select(&classification, SelectionPolicy::BestTierOnly);
        assert_eq!(best.into_iter().collect::<Vec<_>>(), vec!["a.txt"]);

        assert!(auto_select(&classification, SelectionPolicy::Off).is_empty());
    }

    #[test]
    fn test_auto_select_without_matches() {
        let classification = classify(&[result("c.txt", 10.0)]);

        assert!(auto_select(&classification, SelectionPolicy::AllMatches).is_empty());
        assert!(auto_select(&classification, SelectionPolicy::BestTierOnly).is_empty());
    }

    #[test]
    fn test_tier_labels() {
        assert_eq!(ClassificationTier::NoMatch.to_string(), "no-match");
        assert_eq!(SelectionPolicy::BestTierOnly.to_string(), "best");
        let json = serde_json::to_string(&ClassificationTier::NoMatch).unwrap();
        assert_eq!(json, "\"no-match\"");
    }
}
