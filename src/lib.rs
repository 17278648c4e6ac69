//! # Find That Book
//!
//! Turns a messy or partial phrase about a book ("tolkien hobbit illustrated",
//! "mark huckleberry") into a short, ranked and explained list of matching works.
//!
//! ## Architecture
//!
//! - [`models`]: Core data structures (BookCandidate, SearchIntent, MatchRank, etc.)
//! - [`matching`]: Text normalization and the deterministic rank engine
//! - [`search`]: The [`BookSearchService`] orchestrating one request
//! - [`sources`]: Collaborator traits with Open Library, Gemini and mock implementations
//! - [`utils`]: HTTP client and cancellation helpers
//! - [`config`]: Configuration management

pub mod config;
pub mod matching;
pub mod models;
pub mod search;
pub mod sources;
pub mod utils;

// Re-export commonly used types
pub use matching::{BookMatcher, RankEngine};
pub use models::{BookCandidate, MatchRank, SearchIntent};
pub use search::{BookSearchService, SearchError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
