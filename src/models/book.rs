//! Book candidate model representing a single work returned by a catalog.

use serde::{Deserialize, Serialize};

use super::{AuthorStatus, MatchRank, MatchResult, MatchType};

/// A single work returned by a catalog search
///
/// Candidates are created by a [`CandidateSource`](crate::sources::CandidateSource)
/// with `authors` populated and the role lists empty. The search service fills
/// `primary_authors`, `contributors` and the match fields exactly once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookCandidate {
    /// Work title as reported by the catalog
    pub title: String,

    /// Every author name the catalog attached to the work
    #[serde(default)]
    pub authors: Vec<String>,

    /// Authors confirmed as principal creators
    #[serde(default)]
    pub primary_authors: Vec<String>,

    /// Illustrators, editors, translators and unresolved names
    #[serde(default)]
    pub contributors: Vec<String>,

    /// Year of first publication
    pub first_publish_year: Option<i32>,

    /// Catalog key used for enrichment lookups (e.g. `/works/OL27482W`)
    pub external_id: String,

    /// Cover image URL
    pub cover_url: Option<String>,

    /// Human-readable justification of the match
    #[serde(default)]
    pub explanation: String,

    #[serde(default)]
    pub rank: MatchRank,

    #[serde(default)]
    pub match_type: MatchType,

    #[serde(default)]
    pub author_status: AuthorStatus,
}

impl BookCandidate {
    /// Create a new candidate with required fields
    pub fn new(external_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            authors: Vec::new(),
            primary_authors: Vec::new(),
            contributors: Vec::new(),
            first_publish_year: None,
            external_id: external_id.into(),
            cover_url: None,
            explanation: String::new(),
            rank: MatchRank::None,
            match_type: MatchType::None,
            author_status: AuthorStatus::Unknown,
        }
    }

    /// Store the three match fields computed by a matcher
    pub fn apply_match(&mut self, result: MatchResult) {
        self.rank = result.rank;
        self.match_type = result.match_type;
        self.author_status = result.author_status;
    }

    /// Whether the candidate matched the intent at all
    pub fn is_ranked(&self) -> bool {
        self.rank != MatchRank::None
    }

    /// Authors joined for display
    pub fn author_line(&self) -> String {
        self.authors.join(", ")
    }
}

/// Builder for constructing BookCandidate objects
#[derive(Debug, Clone)]
pub struct BookCandidateBuilder {
    candidate: BookCandidate,
}

impl BookCandidateBuilder {
    /// Create a new builder with required fields
    pub fn new(external_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            candidate: BookCandidate::new(external_id, title),
        }
    }

    /// Set the general author list
    pub fn authors<I, S>(mut self, authors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.candidate.authors = authors.into_iter().map(Into::into).collect();
        self
    }

    /// Set the primary author list
    pub fn primary_authors<I, S>(mut self, authors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.candidate.primary_authors = authors.into_iter().map(Into::into).collect();
        self
    }

    /// Set the contributor list
    pub fn contributors<I, S>(mut self, contributors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.candidate.contributors = contributors.into_iter().map(Into::into).collect();
        self
    }

    /// Set first publication year
    pub fn first_publish_year(mut self, year: i32) -> Self {
        self.candidate.first_publish_year = Some(year);
        self
    }

    /// Set cover URL
    pub fn cover_url(mut self, url: impl Into<String>) -> Self {
        self.candidate.cover_url = Some(url.into());
        self
    }

    /// Build the BookCandidate
    pub fn build(self) -> BookCandidate {
        self.candidate
    }
}
