//! Rank engine combining title and author signals into a [`MatchRank`].

use serde::{Deserialize, Serialize};

use super::author::resolve_author_status;
use super::normalize::normalize;
use super::title::classify_title_with_fragment;
use super::BookMatcher;
use crate::models::{AuthorStatus, BookCandidate, MatchRank, MatchResult, MatchType, SearchIntent};

/// Tunable parts of the decision table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchPolicy {
    /// Rank "title matched, requested author did not" as
    /// [`MatchRank::TitleOnlyFallback`]. When off, such candidates are dropped.
    #[serde(default = "default_true")]
    pub title_only_fallback: bool,
}

fn default_true() -> bool {
    true
}

impl Default for MatchPolicy {
    fn default() -> Self {
        Self {
            title_only_fallback: true,
        }
    }
}

/// Deterministic matcher implementing the priority table
///
/// | rule | condition                                         | rank                       |
/// |------|---------------------------------------------------|----------------------------|
/// | a    | exact title, primary author or none requested     | `StrongMatch`              |
/// | b    | exact title, contributor                          | `TitleAndContributorMatch` |
/// | c    | near title, author matched or none requested      | `NearMatch`                |
/// | d    | author matched, no title requested                | `AuthorOnlyFallback`       |
/// | e    | some title match, requested author not matched    | `TitleOnlyFallback`        |
///
/// The first matching rule wins; anything else ranks `None`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RankEngine {
    policy: MatchPolicy,
}

impl RankEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: MatchPolicy) -> Self {
        Self { policy }
    }

    /// Compute the match of one candidate
    pub fn calculate_match(
        &self,
        raw_query: &str,
        intent: &SearchIntent,
        candidate: &BookCandidate,
    ) -> MatchResult {
        let intent_title = intent.title.as_deref().unwrap_or_default();
        let title = classify_title_with_fragment(
            intent_title,
            intent.extracted_title_fragment.as_deref(),
            &candidate.title,
            raw_query,
        );
        let title_requested = !normalize(intent_title).is_empty();

        let author = intent.author.as_deref().unwrap_or_default();
        let author_fragment = intent.extracted_author_fragment.as_deref().unwrap_or_default();
        let author_requested =
            !normalize(author).is_empty() || !normalize(author_fragment).is_empty();

        let (mut author_matched, mut status) = resolve_author_status(author, candidate);
        if !author_matched {
            (author_matched, status) = resolve_author_status(author_fragment, candidate);
        }

        if title.exact && (status == AuthorStatus::Primary || !author_requested) {
            return MatchResult::new(MatchRank::StrongMatch, MatchType::ExactTitle, status);
        }

        if title.exact && status == AuthorStatus::Contributor {
            return MatchResult::new(
                MatchRank::TitleAndContributorMatch,
                MatchType::ExactTitle,
                AuthorStatus::Contributor,
            );
        }

        if title.near && (author_matched || !author_requested) {
            return MatchResult::new(MatchRank::NearMatch, MatchType::NearMatchTitle, status);
        }

        if author_matched && !title_requested {
            return MatchResult::new(MatchRank::AuthorOnlyFallback, MatchType::AuthorOnly, status);
        }

        if title.any() && author_requested && !author_matched && self.policy.title_only_fallback {
            let match_type = if title.exact {
                MatchType::ExactTitle
            } else {
                MatchType::NearMatchTitle
            };
            return MatchResult::new(
                MatchRank::TitleOnlyFallback,
                match_type,
                AuthorStatus::Unknown,
            );
        }

        MatchResult::none()
    }
}

impl BookMatcher for RankEngine {
    fn calculate_match(
        &self,
        raw_query: &str,
        intent: &SearchIntent,
        candidate: &BookCandidate,
    ) -> MatchResult {
        RankEngine::calculate_match(self, raw_query, intent, candidate)
    }
}
