//! Deterministic matching and ranking of book candidates.
//!
//! - [`normalize`] / [`strip_function_words`]: text canonicalization
//! - [`classify_title`]: exact / near title classification with raw-query re-verification
//! - [`resolve_author_status`]: primary / contributor / general author tiers
//! - [`RankEngine`]: the priority table turning both signals into a [`MatchRank`]
//!
//! Matching is substring and equality based on normalized text; there is no
//! edit-distance scoring.
//!
//! ```rust
//! use find_that_book::matching::RankEngine;
//! use find_that_book::models::{BookCandidateBuilder, MatchRank, SearchIntent};
//!
//! let intent = SearchIntent::with_title("The Hobbit").author("Tolkien");
//! let book = BookCandidateBuilder::new("/works/OL27482W", "The Hobbit")
//!     .primary_authors(["J.R.R. Tolkien"])
//!     .build();
//!
//! let result = RankEngine::new().calculate_match("the hobbit tolkien", &intent, &book);
//! assert_eq!(result.rank, MatchRank::StrongMatch);
//! ```
//!
//! [`MatchRank`]: crate::models::MatchRank

mod author;
mod normalize;
mod rank;
mod title;

pub use author::resolve_author_status;
pub use normalize::{normalize, strip_function_words};
pub use rank::{MatchPolicy, RankEngine};
pub use title::{classify_title, classify_title_with_fragment, TitleMatch};

use crate::models::{BookCandidate, MatchResult, SearchIntent};

/// Scores a single candidate against an intent
///
/// The search service depends on this trait rather than on [`RankEngine`]
/// directly so that alternative tier sets can be plugged in.
pub trait BookMatcher: Send + Sync + std::fmt::Debug {
    fn calculate_match(
        &self,
        raw_query: &str,
        intent: &SearchIntent,
        candidate: &BookCandidate,
    ) -> MatchResult;
}
