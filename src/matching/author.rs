//! Author role resolution against a candidate's author hierarchy.

use super::normalize::normalize;
use crate::models::{AuthorStatus, BookCandidate};

/// Resolve the role of the requested author in a candidate
///
/// Tiers are checked in order: primary authors, contributors, then the
/// undifferentiated author list. A hit in the last tier is reported as
/// [`AuthorStatus::Contributor`] because the role was never resolved.
/// Returns `(false, Unknown)` when no author was requested or nothing matched.
pub fn resolve_author_status(intent_author: &str, candidate: &BookCandidate) -> (bool, AuthorStatus) {
    let nqa = normalize(intent_author);
    if nqa.is_empty() {
        return (false, AuthorStatus::Unknown);
    }

    if any_contains(&candidate.primary_authors, &nqa) {
        (true, AuthorStatus::Primary)
    } else if any_contains(&candidate.contributors, &nqa) || any_contains(&candidate.authors, &nqa)
    {
        (true, AuthorStatus::Contributor)
    } else {
        (false, AuthorStatus::Unknown)
    }
}

fn any_contains(names: &[String], needle: &str) -> bool {
    names.iter().any(|name| normalize(name).contains(needle))
}
