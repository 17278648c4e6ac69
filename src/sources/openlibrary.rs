//! Open Library catalog implementation.

use async_trait::async_trait;
use futures_util::future::join_all;
use serde::Deserialize;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::config::OpenLibraryConfig;
use crate::matching::normalize;
use crate::models::{BookCandidate, BookCandidateBuilder, SearchIntent};
use crate::sources::{
    status_error, AuthorDetailSource, AuthorDetails, CandidateSource, SourceError,
};
use crate::utils::{run_cancellable, HttpClient};

/// Open Library catalog client
///
/// Uses `search.json` for candidates and the work/author records for role
/// resolution.
#[derive(Debug, Clone)]
pub struct OpenLibraryClient {
    http: HttpClient,
    base_url: String,
    covers_url: String,
    search_limit: usize,
}

impl OpenLibraryClient {
    /// Create a client from configuration
    pub fn new(config: &OpenLibraryConfig) -> Result<Self, SourceError> {
        Ok(Self {
            http: HttpClient::with_timeout(Duration::from_secs(config.timeout_secs))?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            covers_url: config.covers_url.trim_end_matches('/').to_string(),
            search_limit: config.search_limit,
        })
    }

    /// Create a client against a custom base URL (covers are served from the same host)
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, SourceError> {
        let base_url = base_url.into();
        let config = OpenLibraryConfig {
            covers_url: base_url.clone(),
            base_url,
            ..OpenLibraryConfig::default()
        };
        Self::new(&config)
    }

    /// Build the search URL, or `None` when the intent carries no criteria
    fn build_search_url(&self, intent: &SearchIntent) -> Option<String> {
        let mut params = Vec::new();

        if let Some(title) = intent.title_str() {
            params.push(format!("title={}", urlencoding::encode(title.trim())));
        }
        if let Some(author) = intent.author_str() {
            params.push(format!("author={}", urlencoding::encode(author.trim())));
        }
        if !intent.keywords.is_empty() {
            params.push(format!(
                "q={}",
                urlencoding::encode(&intent.keywords.join(" "))
            ));
        }

        if params.is_empty() {
            return None;
        }

        Some(format!(
            "{}/search.json?{}&limit={}",
            self.base_url,
            params.join("&"),
            self.search_limit
        ))
    }

    /// URL of a work or author record; bare work ids get the `/works/` prefix
    fn record_url(&self, key: &str) -> String {
        if key.starts_with('/') {
            format!("{}{}.json", self.base_url, key)
        } else {
            format!("{}/works/{}.json", self.base_url, key)
        }
    }

    fn parse_doc(&self, doc: OlDoc) -> BookCandidate {
        let mut builder = BookCandidateBuilder::new(doc.key, doc.title).authors(doc.author_name);

        if let Some(year) = doc.first_publish_year {
            builder = builder.first_publish_year(year);
        }
        if let Some(cover_id) = doc.cover_i {
            builder = builder.cover_url(format!("{}/b/id/{}-M.jpg", self.covers_url, cover_id));
        }

        builder.build()
    }

    async fn get_json<T>(&self, url: &str, cancel: &CancellationToken) -> Result<T, SourceError>
    where
        T: serde::de::DeserializeOwned,
    {
        let request = async {
            let response = self
                .http
                .client()
                .get(url)
                .send()
                .await
                .map_err(|e| SourceError::Network(format!("Failed to query Open Library: {}", e)))?;

            if !response.status().is_success() {
                return Err(status_error("Open Library", response.status()));
            }

            response
                .json::<T>()
                .await
                .map_err(|e| SourceError::Parse(format!("Failed to parse JSON: {}", e)))
        };

        run_cancellable(cancel, request)
            .await
            .unwrap_or(Err(SourceError::Cancelled))
    }

    async fn fetch_author(
        &self,
        entry: OlWorkAuthor,
        cancel: &CancellationToken,
    ) -> Option<ResolvedAuthor> {
        let key = entry.author_key()?;
        match self.get_json::<OlAuthor>(&self.record_url(&key), cancel).await {
            Ok(author) => {
                let name = author.name.or(author.personal_name)?;
                Some(ResolvedAuthor {
                    name,
                    role: entry.role,
                    bio: author.bio.map(OlText::into_string),
                })
            }
            Err(e) => {
                tracing::debug!(author = %key, error = %e, "Skipping unresolved author");
                None
            }
        }
    }
}

#[async_trait]
impl CandidateSource for OpenLibraryClient {
    async fn search_candidates(
        &self,
        intent: &SearchIntent,
        cancel: &CancellationToken,
    ) -> Result<Vec<BookCandidate>, SourceError> {
        let Some(url) = self.build_search_url(intent) else {
            return Ok(Vec::new());
        };

        tracing::debug!(url = %url, "Searching Open Library");
        let data: OlSearchResponse = self.get_json(&url, cancel).await?;

        Ok(data.docs.into_iter().map(|doc| self.parse_doc(doc)).collect())
    }
}

#[async_trait]
impl AuthorDetailSource for OpenLibraryClient {
    async fn get_author_details(
        &self,
        external_id: &str,
        title_hint: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<AuthorDetails, SourceError> {
        let work: OlWork = self.get_json(&self.record_url(external_id), cancel).await?;

        let resolved = join_all(
            work.authors
                .into_iter()
                .map(|entry| self.fetch_author(entry, cancel)),
        )
        .await;

        if cancel.is_cancelled() {
            return Err(SourceError::Cancelled);
        }

        Ok(classify_authors(resolved.into_iter().flatten().collect(), title_hint))
    }
}

#[derive(Debug, Clone)]
struct ResolvedAuthor {
    name: String,
    role: Option<String>,
    bio: Option<String>,
}

impl ResolvedAuthor {
    /// An explicit role other than "author" marks an illustrator, editor, translator...
    fn is_contributor(&self) -> bool {
        self.role
            .as_deref()
            .map(str::trim)
            .is_some_and(|role| !role.is_empty() && !role.eq_ignore_ascii_case("author"))
    }

    fn bio_mentions(&self, normalized_title: &str) -> bool {
        self.bio
            .as_deref()
            .is_some_and(|bio| normalize(bio).contains(normalized_title))
    }
}

/// Split resolved authors into primary authors and contributors
///
/// Authors without a contributor role are primary. When a title hint is given
/// and some of them mention it in their biography, only those stay primary.
fn classify_authors(authors: Vec<ResolvedAuthor>, title_hint: Option<&str>) -> AuthorDetails {
    let (roled, roleless): (Vec<_>, Vec<_>) =
        authors.into_iter().partition(ResolvedAuthor::is_contributor);

    let mut contributors: Vec<String> = roled.into_iter().map(|a| a.name).collect();

    let hint = title_hint.map(normalize).filter(|h| !h.is_empty());
    let primary = match hint {
        Some(hint) if roleless.iter().any(|a| a.bio_mentions(&hint)) => {
            let (mentioning, others): (Vec<_>, Vec<_>) =
                roleless.into_iter().partition(|a| a.bio_mentions(&hint));
            contributors.extend(others.into_iter().map(|a| a.name));
            mentioning
        }
        _ => roleless,
    };

    AuthorDetails::new(primary.into_iter().map(|a| a.name).collect(), contributors)
}

// Open Library API response types

#[derive(Debug, Deserialize)]
struct OlSearchResponse {
    #[serde(default)]
    docs: Vec<OlDoc>,
}

#[derive(Debug, Deserialize)]
struct OlDoc {
    key: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    author_name: Vec<String>,
    first_publish_year: Option<i32>,
    cover_i: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct OlWork {
    #[serde(default)]
    authors: Vec<OlWorkAuthor>,
}

#[derive(Debug, Deserialize)]
struct OlWorkAuthor {
    author: Option<OlAuthorRef>,
    key: Option<String>,
    role: Option<String>,
}

impl OlWorkAuthor {
    fn author_key(&self) -> Option<String> {
        match &self.author {
            Some(OlAuthorRef::Keyed { key }) => Some(key.clone()),
            Some(OlAuthorRef::Plain(key)) => Some(key.clone()),
            None => self.key.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OlAuthorRef {
    Keyed { key: String },
    Plain(String),
}

#[derive(Debug, Deserialize)]
struct OlAuthor {
    name: Option<String>,
    personal_name: Option<String>,
    bio: Option<OlText>,
}

/// Open Library text fields are either plain strings or `{ "type": ..., "value": ... }`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OlText {
    Plain(String),
    Typed { value: String },
}

impl OlText {
    fn into_string(self) -> String {
        match self {
            OlText::Plain(s) => s,
            OlText::Typed { value } => value,
        }
    }
}
