//! Structured interpretation of a raw user query.

use serde::{Deserialize, Serialize};

/// Structured search intent derived from a raw query
///
/// Field aliases accept the PascalCase keys produced by the language model
/// (`Title`, `ExtractedTitleFragment`, ...) as well as snake_case.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchIntent {
    /// Interpreted book title
    #[serde(default, alias = "Title")]
    pub title: Option<String>,

    /// Interpreted author name
    #[serde(default, alias = "Author")]
    pub author: Option<String>,

    /// Extra descriptive terms that matched neither title nor author
    #[serde(default, alias = "Keywords", deserialize_with = "null_as_empty")]
    pub keywords: Vec<String>,

    /// Literal substring of the raw query that justified `title`
    #[serde(default, alias = "ExtractedTitleFragment")]
    pub extracted_title_fragment: Option<String>,

    /// Literal substring of the raw query that justified `author`
    #[serde(default, alias = "ExtractedAuthorFragment")]
    pub extracted_author_fragment: Option<String>,

    /// Why each field was filled
    #[serde(default, alias = "Explanation")]
    pub explanation: Option<IntentExplanation>,
}

/// Per-field reasoning attached to a [`SearchIntent`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IntentExplanation {
    #[serde(default, alias = "TitleReason")]
    pub title_reason: Option<String>,

    #[serde(default, alias = "AuthorReason")]
    pub author_reason: Option<String>,

    #[serde(default, alias = "KeywordsReason")]
    pub keywords_reason: Option<String>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

impl SearchIntent {
    /// Create an intent carrying only a title
    pub fn with_title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Default::default()
        }
    }

    /// Set the author
    pub fn author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    /// Set the title
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Add a keyword
    pub fn keyword(mut self, keyword: impl Into<String>) -> Self {
        self.keywords.push(keyword.into());
        self
    }

    /// Set the literal title fragment
    pub fn title_fragment(mut self, fragment: impl Into<String>) -> Self {
        self.extracted_title_fragment = Some(fragment.into());
        self
    }

    /// Set the literal author fragment
    pub fn author_fragment(mut self, fragment: impl Into<String>) -> Self {
        self.extracted_author_fragment = Some(fragment.into());
        self
    }

    /// Whether the intent carries at least one usable criterion
    pub fn is_valid(&self) -> bool {
        !is_blank(self.title.as_deref())
            || !is_blank(self.author.as_deref())
            || !self.keywords.is_empty()
    }

    /// Title with blank values treated as absent
    pub fn title_str(&self) -> Option<&str> {
        self.title.as_deref().filter(|t| !t.trim().is_empty())
    }

    /// Author with blank values treated as absent
    pub fn author_str(&self) -> Option<&str> {
        self.author.as_deref().filter(|a| !a.trim().is_empty())
    }
}

fn is_blank(value: Option<&str>) -> bool {
    value.map_or(true, |v| v.trim().is_empty())
}
