//! In-memory collaborators for testing purposes.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio_util::sync::CancellationToken;

use crate::matching::BookMatcher;
use crate::models::{BookCandidate, BookCandidateBuilder, MatchResult, SearchIntent};
use crate::sources::{
    AuthorDetailSource, AuthorDetails, CandidateSource, Explainer, IntentExtractor, SourceError,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Scripted implementation of every collaborator trait.
///
/// Unscripted calls succeed with empty results. Each trait method bumps a
/// call counter so tests can assert what the service skipped.
#[derive(Debug, Default)]
pub struct MockCollaborators {
    intent: Mutex<Option<SearchIntent>>,
    candidates: Mutex<Vec<BookCandidate>>,
    author_details: Mutex<HashMap<String, AuthorDetails>>,
    failing_authors: Mutex<HashSet<String>>,
    explanation: Mutex<Option<String>>,
    fail_intent: AtomicBool,
    fail_search: AtomicBool,
    fail_explain: AtomicBool,
    block_author_lookups: AtomicBool,
    intent_calls: AtomicUsize,
    search_calls: AtomicUsize,
    author_calls: AtomicUsize,
    explain_calls: AtomicUsize,
}

impl MockCollaborators {
    /// Create a new mock with nothing scripted.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the intent returned by the extractor.
    pub fn set_intent(&self, intent: SearchIntent) {
        *lock(&self.intent) = Some(intent);
    }

    /// Set the candidates returned by the catalog.
    pub fn set_candidates(&self, candidates: Vec<BookCandidate>) {
        *lock(&self.candidates) = candidates;
    }

    /// Set the author roles returned for one work.
    pub fn set_author_details(&self, external_id: &str, details: AuthorDetails) {
        lock(&self.author_details).insert(external_id.to_string(), details);
    }

    /// Make the author lookup for one work fail.
    pub fn fail_author_lookup(&self, external_id: &str) {
        lock(&self.failing_authors).insert(external_id.to_string());
    }

    /// Prefix the explainer writes before each candidate title.
    pub fn set_explanation(&self, text: &str) {
        *lock(&self.explanation) = Some(text.to_string());
    }

    pub fn fail_intent(&self, fail: bool) {
        self.fail_intent.store(fail, Ordering::SeqCst);
    }

    pub fn fail_search(&self, fail: bool) {
        self.fail_search.store(fail, Ordering::SeqCst);
    }

    pub fn fail_explain(&self, fail: bool) {
        self.fail_explain.store(fail, Ordering::SeqCst);
    }

    /// Make author lookups hang until the caller cancels.
    pub fn block_author_lookups(&self, block: bool) {
        self.block_author_lookups.store(block, Ordering::SeqCst);
    }

    pub fn intent_calls(&self) -> usize {
        self.intent_calls.load(Ordering::SeqCst)
    }

    pub fn search_calls(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }

    pub fn author_calls(&self) -> usize {
        self.author_calls.load(Ordering::SeqCst)
    }

    pub fn explain_calls(&self) -> usize {
        self.explain_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IntentExtractor for MockCollaborators {
    async fn extract_intent(
        &self,
        raw_query: &str,
        _cancel: &CancellationToken,
    ) -> Result<SearchIntent, SourceError> {
        self.intent_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_intent.load(Ordering::SeqCst) {
            return Err(SourceError::Api("mock intent failure".to_string()));
        }

        Ok(lock(&self.intent).clone().unwrap_or_else(|| SearchIntent {
            keywords: vec![raw_query.to_string()],
            ..Default::default()
        }))
    }
}

#[async_trait]
impl CandidateSource for MockCollaborators {
    async fn search_candidates(
        &self,
        _intent: &SearchIntent,
        _cancel: &CancellationToken,
    ) -> Result<Vec<BookCandidate>, SourceError> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_search.load(Ordering::SeqCst) {
            return Err(SourceError::Network("mock search failure".to_string()));
        }

        Ok(lock(&self.candidates).clone())
    }
}

#[async_trait]
impl AuthorDetailSource for MockCollaborators {
    async fn get_author_details(
        &self,
        external_id: &str,
        _title_hint: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<AuthorDetails, SourceError> {
        self.author_calls.fetch_add(1, Ordering::SeqCst);

        if self.block_author_lookups.load(Ordering::SeqCst) {
            cancel.cancelled().await;
            return Err(SourceError::Cancelled);
        }
        if lock(&self.failing_authors).contains(external_id) {
            return Err(SourceError::NotFound(external_id.to_string()));
        }

        Ok(lock(&self.author_details)
            .get(external_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[async_trait]
impl Explainer for MockCollaborators {
    async fn explain_and_finalize(
        &self,
        _raw_query: &str,
        _intent: &SearchIntent,
        candidates: &[BookCandidate],
        _cancel: &CancellationToken,
    ) -> Result<Vec<BookCandidate>, SourceError> {
        self.explain_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_explain.load(Ordering::SeqCst) {
            return Err(SourceError::Api("mock explain failure".to_string()));
        }

        let prefix = lock(&self.explanation).clone();
        Ok(candidates
            .iter()
            .cloned()
            .map(|mut book| {
                if let Some(prefix) = &prefix {
                    book.explanation = format!("{}: {}", prefix, book.title);
                }
                book
            })
            .collect())
    }
}

/// Matcher that returns preset results keyed by external id.
#[derive(Debug, Default)]
pub struct ScriptedMatcher {
    results: HashMap<String, MatchResult>,
}

impl ScriptedMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the result for one candidate; unscripted candidates get `None`.
    pub fn with_result(mut self, external_id: &str, result: MatchResult) -> Self {
        self.results.insert(external_id.to_string(), result);
        self
    }
}

impl BookMatcher for ScriptedMatcher {
    fn calculate_match(
        &self,
        _raw_query: &str,
        _intent: &SearchIntent,
        candidate: &BookCandidate,
    ) -> MatchResult {
        self.results
            .get(&candidate.external_id)
            .copied()
            .unwrap_or_else(MatchResult::none)
    }
}

/// Helper function to create a candidate for testing.
pub fn make_candidate(external_id: &str, title: &str, authors: &[&str]) -> BookCandidate {
    BookCandidateBuilder::new(external_id, title)
        .authors(authors.iter().copied())
        .build()
}
