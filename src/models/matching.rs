//! Match classification enums and the per-candidate match result.

use serde::{Deserialize, Serialize};

/// Ranking levels for matched candidates, ordered by ascending relevance
///
/// The derived ordering follows declaration order, so `max()` over a set of
/// ranks yields the best one.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub enum MatchRank {
    /// No match
    #[default]
    None,
    /// Title matched but the requested author did not
    TitleOnlyFallback,
    /// Author matched and no title was requested
    AuthorOnlyFallback,
    /// Title is a near match
    NearMatch,
    /// Exact title, but the author is only a contributor
    TitleAndContributorMatch,
    /// Exact title with a primary author (or no author requested)
    StrongMatch,
}

impl MatchRank {
    /// Returns the display name of the rank
    pub fn name(self) -> &'static str {
        match self {
            MatchRank::None => "None",
            MatchRank::TitleOnlyFallback => "Title only",
            MatchRank::AuthorOnlyFallback => "Author only",
            MatchRank::NearMatch => "Near match",
            MatchRank::TitleAndContributorMatch => "Title + contributor",
            MatchRank::StrongMatch => "Strong match",
        }
    }
}

impl std::fmt::Display for MatchRank {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Which signal produced the match
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MatchType {
    #[default]
    None,
    ExactTitle,
    NearMatchTitle,
    AuthorOnly,
    /// Accepted when deserializing; the rank engine reports title-only
    /// fallbacks as `ExactTitle` or `NearMatchTitle`
    TitleOnly,
}

impl std::fmt::Display for MatchType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            MatchType::None => "None",
            MatchType::ExactTitle => "ExactTitle",
            MatchType::NearMatchTitle => "NearMatchTitle",
            MatchType::AuthorOnly => "AuthorOnly",
            MatchType::TitleOnly => "TitleOnly",
        };
        f.write_str(name)
    }
}

/// Role of the requested author in a candidate work
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AuthorStatus {
    /// Unknown, not requested, or not matched
    #[default]
    Unknown,
    /// A principal creator of the work
    Primary,
    /// An illustrator, editor, adapter or unresolved name
    Contributor,
}

impl std::fmt::Display for AuthorStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            AuthorStatus::Unknown => "Unknown",
            AuthorStatus::Primary => "Primary",
            AuthorStatus::Contributor => "Contributor",
        };
        f.write_str(name)
    }
}

/// Outcome of matching one candidate against an intent
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MatchResult {
    pub rank: MatchRank,
    pub match_type: MatchType,
    pub author_status: AuthorStatus,
}

impl MatchResult {
    pub fn new(rank: MatchRank, match_type: MatchType, author_status: AuthorStatus) -> Self {
        Self {
            rank,
            match_type,
            author_status,
        }
    }

    /// The "no match" result
    pub fn none() -> Self {
        Self::default()
    }
}
