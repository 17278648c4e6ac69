//! External collaborators of the search pipeline.
//!
//! The search service never talks to a network directly. It depends on four
//! traits, each a narrow seam around one external call:
//!
//! - [`IntentExtractor`]: raw query → [`SearchIntent`]
//! - [`CandidateSource`]: intent → raw [`BookCandidate`]s
//! - [`AuthorDetailSource`]: work key → primary authors and contributors
//! - [`Explainer`]: ranked candidates → explained candidates
//!
//! Concrete implementations:
//!
//! - [`OpenLibraryClient`]: [`CandidateSource`] and [`AuthorDetailSource`] over the Open Library API
//! - [`GeminiClient`]: [`IntentExtractor`] and [`Explainer`] over the Gemini `generateContent` API
//! - [`MockCollaborators`]: in-memory implementation of all four, for tests
//!
//! Every call receives the caller's [`CancellationToken`]; implementations
//! return [`SourceError::Cancelled`] when it fires mid-request.

mod gemini;
pub mod mock;
mod openlibrary;

pub use gemini::GeminiClient;
pub use mock::{MockCollaborators, ScriptedMatcher};
pub use openlibrary::OpenLibraryClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::models::{BookCandidate, SearchIntent};

/// Author roles for a single work
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorDetails {
    pub primary_authors: Vec<String>,
    pub contributors: Vec<String>,
}

impl AuthorDetails {
    pub fn new(primary_authors: Vec<String>, contributors: Vec<String>) -> Self {
        Self {
            primary_authors,
            contributors,
        }
    }
}

/// Interprets a raw user phrase
#[async_trait]
pub trait IntentExtractor: Send + Sync + std::fmt::Debug {
    async fn extract_intent(
        &self,
        raw_query: &str,
        cancel: &CancellationToken,
    ) -> Result<SearchIntent, SourceError>;
}

/// Produces raw candidates for an intent
///
/// Returned candidates have `authors` populated and empty role lists.
#[async_trait]
pub trait CandidateSource: Send + Sync + std::fmt::Debug {
    async fn search_candidates(
        &self,
        intent: &SearchIntent,
        cancel: &CancellationToken,
    ) -> Result<Vec<BookCandidate>, SourceError>;
}

/// Resolves which authors of a work are primary and which are contributors
#[async_trait]
pub trait AuthorDetailSource: Send + Sync + std::fmt::Debug {
    /// `title_hint` is the interpreted title, used to disambiguate roles
    async fn get_author_details(
        &self,
        external_id: &str,
        title_hint: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<AuthorDetails, SourceError>;
}

/// Attaches a justification to each ranked candidate
///
/// May re-order or drop candidates but should not add any.
#[async_trait]
pub trait Explainer: Send + Sync + std::fmt::Debug {
    async fn explain_and_finalize(
        &self,
        raw_query: &str,
        intent: &SearchIntent,
        candidates: &[BookCandidate],
        cancel: &CancellationToken,
    ) -> Result<Vec<BookCandidate>, SourceError>;
}

/// Errors that can occur when calling a collaborator
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// Network or HTTP error
    #[error("Network error: {0}")]
    Network(String),

    /// Parsing error (JSON, model output)
    #[error("Parse error: {0}")]
    Parse(String),

    /// Invalid request parameters or missing credentials
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    RateLimit,

    /// Record not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// API error from the remote service
    #[error("API error: {0}")]
    Api(String),

    /// The caller's cancellation token fired
    #[error("Request cancelled")]
    Cancelled,

    /// Other error
    #[error("Error: {0}")]
    Other(String),
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        SourceError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for SourceError {
    fn from(err: serde_json::Error) -> Self {
        SourceError::Parse(format!("JSON: {}", err))
    }
}

/// Map a non-success HTTP status to a [`SourceError`]
pub(crate) fn status_error(service: &str, status: reqwest::StatusCode) -> SourceError {
    match status {
        reqwest::StatusCode::TOO_MANY_REQUESTS => SourceError::RateLimit,
        reqwest::StatusCode::NOT_FOUND => {
            SourceError::NotFound(format!("{} returned 404", service))
        }
        _ => SourceError::Api(format!("{} API returned status: {}", service, status)),
    }
}
