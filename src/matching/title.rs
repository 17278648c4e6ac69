//! Title classification with raw-query re-verification.
//!
//! An interpreted title can be "exact" against a catalog title only when the
//! catalog title text also appears in what the user actually typed. Titles an
//! upstream step inferred from a short or misspelled phrase are downgraded to
//! near matches.

use super::normalize::{normalize, strip_function_words};

/// Title match outcome for one candidate
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TitleMatch {
    pub exact: bool,
    pub near: bool,
}

impl TitleMatch {
    /// Either exact or near
    pub fn any(&self) -> bool {
        self.exact || self.near
    }
}

/// Classify a candidate title against the interpreted title
///
/// `exact` requires equal normalized forms, `near` requires the candidate to
/// contain the interpreted title. An exact match whose candidate title is not
/// contained in the normalized raw query is downgraded to near.
pub fn classify_title(intent_title: &str, candidate_title: &str, raw_query: &str) -> TitleMatch {
    classify(intent_title, candidate_title, raw_query, false)
}

/// Like [`classify_title`], for intents that carry a literal title fragment
///
/// With a non-blank fragment the re-verification also accepts the
/// function-word-stripped core title inside the stripped raw query.
pub fn classify_title_with_fragment(
    intent_title: &str,
    fragment: Option<&str>,
    candidate_title: &str,
    raw_query: &str,
) -> TitleMatch {
    let grounded = fragment.is_some_and(|f| !normalize(f).is_empty());
    classify(intent_title, candidate_title, raw_query, grounded)
}

fn classify(
    intent_title: &str,
    candidate_title: &str,
    raw_query: &str,
    fragment_grounded: bool,
) -> TitleMatch {
    let nq = normalize(intent_title);
    let nb = normalize(candidate_title);

    if nq.is_empty() {
        return TitleMatch::default();
    }

    let mut exact = nb == nq;
    let mut near = !exact && nb.contains(&nq);

    if exact && !raw_query_contains(raw_query, candidate_title, &nb, fragment_grounded) {
        exact = false;
        near = true;
    }

    TitleMatch { exact, near }
}

fn raw_query_contains(
    raw_query: &str,
    candidate_title: &str,
    normalized_title: &str,
    fragment_grounded: bool,
) -> bool {
    if normalize(raw_query).contains(normalized_title) {
        return true;
    }
    if !fragment_grounded {
        return false;
    }

    let core = strip_function_words(candidate_title);
    !core.is_empty() && strip_function_words(raw_query).contains(&core)
}
