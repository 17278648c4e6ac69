//! Core data models for search intents, book candidates and match results.

mod book;
mod intent;
mod matching;

pub use book::{BookCandidate, BookCandidateBuilder};
pub use intent::{IntentExplanation, SearchIntent};
pub use matching::{AuthorStatus, MatchRank, MatchResult, MatchType};
