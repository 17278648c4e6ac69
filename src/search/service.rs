//! Book search service coordinating the collaborators and the matcher.

use futures_util::future::join_all;
use std::collections::HashSet;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::{SearchError, DEFAULT_MAX_RESULTS};
use crate::config::Config;
use crate::matching::{BookMatcher, MatchPolicy, RankEngine};
use crate::models::{BookCandidate, SearchIntent};
use crate::sources::{
    AuthorDetailSource, CandidateSource, Explainer, GeminiClient, IntentExtractor,
    OpenLibraryClient, SourceError,
};
use crate::utils::run_cancellable;

/// Orchestrates intent extraction, catalog search, enrichment, ranking and explanation
#[derive(Debug, Clone)]
pub struct BookSearchService {
    intent_extractor: Arc<dyn IntentExtractor>,
    candidate_source: Arc<dyn CandidateSource>,
    author_source: Arc<dyn AuthorDetailSource>,
    explainer: Arc<dyn Explainer>,
    matcher: Arc<dyn BookMatcher>,
    max_results: usize,
}

impl BookSearchService {
    /// Create a service using the default [`RankEngine`]
    pub fn new(
        intent_extractor: Arc<dyn IntentExtractor>,
        candidate_source: Arc<dyn CandidateSource>,
        author_source: Arc<dyn AuthorDetailSource>,
        explainer: Arc<dyn Explainer>,
    ) -> Self {
        Self {
            intent_extractor,
            candidate_source,
            author_source,
            explainer,
            matcher: Arc::new(RankEngine::new()),
            max_results: DEFAULT_MAX_RESULTS,
        }
    }

    /// Build the Open Library + Gemini pipeline described by `config`
    pub fn from_config(config: &Config) -> Result<Self, SearchError> {
        let open_library = Arc::new(OpenLibraryClient::new(&config.open_library)?);
        let gemini = Arc::new(GeminiClient::new(config.gemini.clone())?);
        let policy = MatchPolicy {
            title_only_fallback: config.search.title_only_fallback,
        };

        Ok(Self::new(gemini.clone(), open_library.clone(), open_library, gemini)
            .with_matcher(Arc::new(RankEngine::with_policy(policy)))
            .with_max_results(config.search.max_results))
    }

    /// Replace the matcher
    pub fn with_matcher(mut self, matcher: Arc<dyn BookMatcher>) -> Self {
        self.matcher = matcher;
        self
    }

    /// Set the cap on returned candidates
    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    pub fn max_results(&self) -> usize {
        self.max_results
    }

    /// Run one search request
    ///
    /// Returns at most `max_results` candidates, all sharing the best rank
    /// found, in catalog order. Collaborator failures yield fewer or
    /// unexplained results; cancellation yields [`SearchError::Aborted`].
    pub async fn search(
        &self,
        raw_query: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<BookCandidate>, SearchError> {
        if cancel.is_cancelled() {
            return Err(SearchError::Aborted);
        }

        let results = run_cancellable(cancel, self.run(raw_query, cancel))
            .await
            .ok_or(SearchError::Aborted)?;

        // A collaborator may have absorbed the cancellation as a failure
        if cancel.is_cancelled() {
            return Err(SearchError::Aborted);
        }

        Ok(results)
    }

    async fn run(&self, raw_query: &str, cancel: &CancellationToken) -> Vec<BookCandidate> {
        let intent = match self.intent_extractor.extract_intent(raw_query, cancel).await {
            Ok(intent) => intent,
            Err(e) => {
                log_failure("Intent extraction", &e);
                return Vec::new();
            }
        };

        if !intent.is_valid() {
            tracing::debug!(query = raw_query, "Intent carries no criteria");
            return Vec::new();
        }
        tracing::debug!(?intent, "Extracted intent");

        let candidates = match self.candidate_source.search_candidates(&intent, cancel).await {
            Ok(candidates) => candidates,
            Err(e) => {
                log_failure("Candidate search", &e);
                return Vec::new();
            }
        };
        tracing::debug!(count = candidates.len(), "Fetched candidates");

        let enriched = join_all(
            candidates
                .into_iter()
                .map(|candidate| self.enrich(candidate, raw_query, &intent, cancel)),
        )
        .await;

        let ranked = best_ranked(enriched, self.max_results());
        if ranked.is_empty() {
            tracing::debug!("No candidate matched the intent");
            return ranked;
        }
        tracing::debug!(count = ranked.len(), rank = %ranked[0].rank, "Selected best-ranked candidates");

        match self
            .explainer
            .explain_and_finalize(raw_query, &intent, &ranked, cancel)
            .await
        {
            Ok(mut explained) => {
                explained.truncate(self.max_results());
                explained
            }
            Err(e) => {
                log_failure("Explanation", &e);
                ranked
            }
        }
    }

    /// Resolve author roles for one candidate and score it
    async fn enrich(
        &self,
        mut candidate: BookCandidate,
        raw_query: &str,
        intent: &SearchIntent,
        cancel: &CancellationToken,
    ) -> BookCandidate {
        match self
            .author_source
            .get_author_details(&candidate.external_id, intent.title_str(), cancel)
            .await
        {
            Ok(details) => {
                candidate.contributors = merge_contributors(
                    details.contributors,
                    &details.primary_authors,
                    &candidate.authors,
                );
                candidate.primary_authors = details.primary_authors;
            }
            Err(e) => {
                tracing::warn!(
                    work = %candidate.external_id,
                    error = %e,
                    "Author lookup failed; matching on general authors"
                );
            }
        }

        let result = self.matcher.calculate_match(raw_query, intent, &candidate);
        candidate.apply_match(result);
        candidate
    }
}

fn log_failure(stage: &str, error: &SourceError) {
    match error {
        SourceError::Cancelled => tracing::debug!("{} cancelled", stage),
        _ => tracing::warn!(error = %error, "{} failed", stage),
    }
}

/// Known contributors plus every general author that is not primary,
/// deduplicated case-insensitively in first-seen order
fn merge_contributors(
    contributors: Vec<String>,
    primary: &[String],
    authors: &[String],
) -> Vec<String> {
    let primary: HashSet<String> = primary.iter().map(|a| a.to_lowercase()).collect();
    let mut seen = HashSet::new();

    contributors
        .into_iter()
        .chain(
            authors
                .iter()
                .filter(|a| !primary.contains(&a.to_lowercase()))
                .cloned(),
        )
        .filter(|name| seen.insert(name.to_lowercase()))
        .collect()
}

/// Keep only matched candidates holding the best rank, in order, capped at `limit`
fn best_ranked(candidates: Vec<BookCandidate>, limit: usize) -> Vec<BookCandidate> {
    let Some(best) = candidates
        .iter()
        .filter(|c| c.is_ranked())
        .map(|c| c.rank)
        .max()
    else {
        return Vec::new();
    };

    candidates
        .into_iter()
        .filter(|c| c.rank == best)
        .take(limit)
        .collect()
}
