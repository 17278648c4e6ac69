//! Search orchestration.
//!
//! [`BookSearchService`] drives one request through the pipeline:
//!
//! 1. intent extraction (an invalid intent ends the request with no results)
//! 2. candidate search
//! 3. concurrent per-candidate author enrichment and matching
//! 4. filtering to the best rank, capped at `max_results`
//! 5. explanation
//!
//! Collaborator failures degrade the result instead of failing the request.
//! The only error surfaced to callers is [`SearchError::Aborted`], returned
//! when the cancellation token fires.

mod service;

pub use service::BookSearchService;

/// Default cap on returned candidates
pub const DEFAULT_MAX_RESULTS: usize = 5;

/// Errors surfaced by [`BookSearchService::search`]
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// The caller cancelled the request; no partial results are returned
    #[error("Search request aborted")]
    Aborted,

    /// A collaborator could not be constructed
    #[error("Failed to initialize search service: {0}")]
    Init(#[from] crate::sources::SourceError),
}
