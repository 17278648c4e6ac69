//! Integration tests for Find That Book
//!
//! These tests drive the search service end to end through mock collaborators
//! and exercise the Open Library and Gemini clients against a local mock HTTP server.

use find_that_book::config::GeminiConfig;
use find_that_book::matching::{MatchPolicy, RankEngine};
use find_that_book::models::{AuthorStatus, MatchRank, MatchType, SearchIntent};
use find_that_book::search::{BookSearchService, SearchError};
use find_that_book::sources::mock::make_candidate;
use find_that_book::sources::{
    AuthorDetailSource, AuthorDetails, CandidateSource, Explainer, GeminiClient, IntentExtractor,
    MockCollaborators, OpenLibraryClient, SourceError,
};
use mockito::Matcher;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn mock_service(mock: &Arc<MockCollaborators>) -> BookSearchService {
    BookSearchService::new(mock.clone(), mock.clone(), mock.clone(), mock.clone())
}

fn hobbit_editions(count: usize) -> Vec<find_that_book::BookCandidate> {
    (0..count)
        .map(|i| make_candidate(&format!("/works/OL{}W", i), "The Hobbit", &["J.R.R. Tolkien"]))
        .collect()
}

#[tokio::test]
async fn test_search_caps_results_and_explains() {
    let mock = Arc::new(MockCollaborators::new());
    mock.set_intent(SearchIntent::with_title("The Hobbit").author("Tolkien"));
    mock.set_candidates(hobbit_editions(8));
    for i in 0..8 {
        mock.set_author_details(
            &format!("/works/OL{}W", i),
            AuthorDetails::new(vec!["J.R.R. Tolkien".to_string()], Vec::new()),
        );
    }
    mock.set_explanation("Exact title by the primary author");

    let results = mock_service(&mock)
        .search("the hobbit tolkien", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(results.len(), 5);
    assert_eq!(mock.author_calls(), 8);
    for (i, book) in results.iter().enumerate() {
        assert_eq!(book.external_id, format!("/works/OL{}W", i));
        assert_eq!(book.rank, MatchRank::StrongMatch);
        assert_eq!(book.match_type, MatchType::ExactTitle);
        assert_eq!(book.author_status, AuthorStatus::Primary);
        assert_eq!(book.explanation, "Exact title by the primary author: The Hobbit");
    }
}

#[tokio::test]
async fn test_search_returns_only_best_rank() {
    let mock = Arc::new(MockCollaborators::new());
    mock.set_intent(SearchIntent::with_title("The Hobbit").author("Tolkien"));
    mock.set_candidates(vec![
        make_candidate("/works/A", "The Hobbit", &["J.R.R. Tolkien"]),
        make_candidate("/works/B", "The Hobbit", &["J.R.R. Tolkien", "Alan Lee"]),
        make_candidate("/works/C", "The Silmarillion", &["J.R.R. Tolkien"]),
    ]);
    mock.set_author_details(
        "/works/A",
        AuthorDetails::new(Vec::new(), vec!["J.R.R. Tolkien".to_string()]),
    );
    mock.set_author_details(
        "/works/B",
        AuthorDetails::new(vec!["J.R.R. Tolkien".to_string()], Vec::new()),
    );

    let results = mock_service(&mock)
        .search("the hobbit tolkien", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].external_id, "/works/B");
    assert_eq!(results[0].rank, MatchRank::StrongMatch);
    assert_eq!(results[0].contributors, vec!["Alan Lee"]);
}

#[tokio::test]
async fn test_invalid_intent_calls_nothing_else() {
    let mock = Arc::new(MockCollaborators::new());
    mock.set_intent(SearchIntent::with_title("   "));
    mock.set_candidates(hobbit_editions(2));

    let results = mock_service(&mock)
        .search("   ", &CancellationToken::new())
        .await
        .unwrap();

    assert!(results.is_empty());
    assert_eq!(mock.search_calls(), 0);
    assert_eq!(mock.author_calls(), 0);
    assert_eq!(mock.explain_calls(), 0);
}

#[tokio::test]
async fn test_no_ranked_candidates_skips_explainer() {
    let mock = Arc::new(MockCollaborators::new());
    mock.set_intent(SearchIntent::with_title("Dune"));
    mock.set_candidates(hobbit_editions(3));

    let results = mock_service(&mock)
        .search("dune", &CancellationToken::new())
        .await
        .unwrap();

    assert!(results.is_empty());
    assert_eq!(mock.author_calls(), 3);
    assert_eq!(mock.explain_calls(), 0);
}

#[tokio::test]
async fn test_explainer_failure_returns_ranked_candidates() {
    let mock = Arc::new(MockCollaborators::new());
    mock.set_intent(SearchIntent::with_title("The Hobbit"));
    mock.set_candidates(hobbit_editions(2));
    mock.fail_explain(true);

    let results = mock_service(&mock)
        .search("the hobbit", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|b| b.explanation.is_empty()));
    assert!(results.iter().all(|b| b.rank == MatchRank::StrongMatch));
}

#[tokio::test]
async fn test_author_lookup_failure_falls_back_to_general_authors() {
    let mock = Arc::new(MockCollaborators::new());
    mock.set_intent(SearchIntent::with_title("The Hobbit").author("Tolkien"));
    mock.set_candidates(vec![make_candidate(
        "/works/OL27482W",
        "The Hobbit",
        &["J.R.R. Tolkien"],
    )]);
    mock.fail_author_lookup("/works/OL27482W");

    let results = mock_service(&mock)
        .search("the hobbit tolkien", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(results.len(), 1);
    let book = &results[0];
    assert!(book.primary_authors.is_empty());
    assert!(book.contributors.is_empty());
    assert_eq!(book.rank, MatchRank::TitleAndContributorMatch);
    assert_eq!(book.author_status, AuthorStatus::Contributor);
}

#[tokio::test]
async fn test_title_only_fallback_policy() {
    let mock = Arc::new(MockCollaborators::new());
    mock.set_intent(SearchIntent::with_title("The Hobbit").author("Pratchett"));
    mock.set_candidates(hobbit_editions(1));

    let results = mock_service(&mock)
        .search("the hobbit pratchett", &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].rank, MatchRank::TitleOnlyFallback);
    assert_eq!(results[0].author_status, AuthorStatus::Unknown);

    let strict = RankEngine::with_policy(MatchPolicy {
        title_only_fallback: false,
    });
    let results = mock_service(&mock)
        .with_matcher(Arc::new(strict))
        .search("the hobbit pratchett", &CancellationToken::new())
        .await
        .unwrap();
    assert!(results.is_empty());
}

#[tokio::test]
async fn test_cancel_during_enrichment_aborts() {
    let mock = Arc::new(MockCollaborators::new());
    mock.set_intent(SearchIntent::with_title("The Hobbit"));
    mock.set_candidates(hobbit_editions(3));
    mock.block_author_lookups(true);

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        trigger.cancel();
    });

    let result = mock_service(&mock).search("the hobbit", &cancel).await;

    assert!(matches!(result, Err(SearchError::Aborted)));
    assert_eq!(mock.explain_calls(), 0);
}

// Open Library client against a mock server

const SEARCH_BODY: &str = r#"{
    "numFound": 2,
    "docs": [
        {
            "key": "/works/OL27482W",
            "title": "The Hobbit",
            "author_name": ["J.R.R. Tolkien"],
            "first_publish_year": 1937,
            "cover_i": 14627509
        },
        {
            "key": "/works/OL262758W",
            "title": "The Hobbit: Graphic Novel",
            "author_name": ["J.R.R. Tolkien", "David Wenzel"]
        }
    ]
}"#;

#[tokio::test]
async fn test_openlibrary_search() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/search.json")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("title".into(), "The Hobbit".into()),
            Matcher::UrlEncoded("author".into(), "Tolkien".into()),
            Matcher::UrlEncoded("limit".into(), "10".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(SEARCH_BODY)
        .create_async()
        .await;

    let client = OpenLibraryClient::with_base_url(server.url()).unwrap();
    let intent = SearchIntent::with_title("The Hobbit").author("Tolkien");
    let books = client
        .search_candidates(&intent, &CancellationToken::new())
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(books.len(), 2);
    assert_eq!(books[0].external_id, "/works/OL27482W");
    assert_eq!(books[0].first_publish_year, Some(1937));
    assert_eq!(
        books[0].cover_url,
        Some(format!("{}/b/id/14627509-M.jpg", server.url()))
    );
    assert_eq!(books[1].authors, vec!["J.R.R. Tolkien", "David Wenzel"]);
    assert!(books[1].cover_url.is_none());
}

#[tokio::test]
async fn test_openlibrary_empty_intent_makes_no_request() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let client = OpenLibraryClient::with_base_url(server.url()).unwrap();
    let books = client
        .search_candidates(&SearchIntent::default(), &CancellationToken::new())
        .await
        .unwrap();

    assert!(books.is_empty());
    mock.assert_async().await;
}

#[tokio::test]
async fn test_openlibrary_error_status() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/search.json")
        .match_query(Matcher::Any)
        .with_status(500)
        .create_async()
        .await;

    let client = OpenLibraryClient::with_base_url(server.url()).unwrap();
    let result = client
        .search_candidates(&SearchIntent::with_title("x"), &CancellationToken::new())
        .await;

    assert!(matches!(result, Err(SourceError::Api(_))));
}

#[tokio::test]
async fn test_openlibrary_malformed_json() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/search.json")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body("{ not json")
        .create_async()
        .await;

    let client = OpenLibraryClient::with_base_url(server.url()).unwrap();
    let result = client
        .search_candidates(&SearchIntent::with_title("x"), &CancellationToken::new())
        .await;

    assert!(matches!(result, Err(SourceError::Parse(_))));
}

#[tokio::test]
async fn test_openlibrary_author_details() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/works/OL27482W.json")
        .with_status(200)
        .with_body(
            r#"{"title": "The Hobbit", "authors": [
                {"author": {"key": "/authors/OL26320A"}, "type": {"key": "/type/author_role"}},
                {"author": {"key": "/authors/OL2A"}},
                {"author": {"key": "/authors/OL3A"}, "role": "Illustrator"},
                {"author": {"key": "/authors/OL404A"}}
            ]}"#,
        )
        .create_async()
        .await;
    server
        .mock("GET", "/authors/OL26320A.json")
        .with_status(200)
        .with_body(r#"{"name": "J.R.R. Tolkien", "bio": {"type": "/type/text", "value": "Author of The Hobbit."}}"#)
        .create_async()
        .await;
    server
        .mock("GET", "/authors/OL2A.json")
        .with_status(200)
        .with_body(r#"{"name": "Douglas A. Anderson", "bio": "Editor of annotated editions."}"#)
        .create_async()
        .await;
    server
        .mock("GET", "/authors/OL3A.json")
        .with_status(200)
        .with_body(r#"{"name": "Alan Lee"}"#)
        .create_async()
        .await;
    server
        .mock("GET", "/authors/OL404A.json")
        .with_status(404)
        .create_async()
        .await;

    let client = OpenLibraryClient::with_base_url(server.url()).unwrap();
    let details = client
        .get_author_details("/works/OL27482W", Some("The Hobbit"), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(details.primary_authors, vec!["J.R.R. Tolkien"]);
    assert_eq!(details.contributors, vec!["Alan Lee", "Douglas A. Anderson"]);
}

#[tokio::test]
async fn test_pipeline_with_openlibrary() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/search.json")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(SEARCH_BODY)
        .create_async()
        .await;
    server
        .mock("GET", "/works/OL27482W.json")
        .with_status(200)
        .with_body(r#"{"authors": [{"author": {"key": "/authors/OL26320A"}}]}"#)
        .create_async()
        .await;
    server
        .mock("GET", "/works/OL262758W.json")
        .with_status(200)
        .with_body(
            r#"{"authors": [
                {"author": {"key": "/authors/OL26320A"}},
                {"author": {"key": "/authors/OL5A"}, "role": "Adapter"}
            ]}"#,
        )
        .create_async()
        .await;
    server
        .mock("GET", "/authors/OL26320A.json")
        .with_status(200)
        .with_body(r#"{"name": "J.R.R. Tolkien"}"#)
        .create_async()
        .await;
    server
        .mock("GET", "/authors/OL5A.json")
        .with_status(200)
        .with_body(r#"{"name": "David Wenzel"}"#)
        .create_async()
        .await;

    let open_library = Arc::new(OpenLibraryClient::with_base_url(server.url()).unwrap());
    let mock = Arc::new(MockCollaborators::new());
    mock.set_intent(SearchIntent::with_title("The Hobbit").author("Tolkien"));

    let service =
        BookSearchService::new(mock.clone(), open_library.clone(), open_library, mock.clone());
    let results = service
        .search("the hobbit by tolkien", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].external_id, "/works/OL27482W");
    assert_eq!(results[0].primary_authors, vec!["J.R.R. Tolkien"]);
    assert_eq!(results[0].rank, MatchRank::StrongMatch);
}

// Gemini client against a mock server

const GEMINI_PATH: &str = "/v1beta/models/gemini-2.5-flash:generateContent";

fn gemini_client(base_url: String) -> GeminiClient {
    GeminiClient::new(GeminiConfig {
        api_key: Some("test-key".to_string()),
        base_url,
        ..GeminiConfig::default()
    })
    .unwrap()
}

/// Wrap model text the way `generateContent` returns it
fn gemini_reply(text: &str) -> String {
    json!({
        "candidates": [{
            "content": { "role": "model", "parts": [{ "text": text }] },
            "finishReason": "STOP"
        }]
    })
    .to_string()
}

#[tokio::test]
async fn test_gemini_extract_intent() {
    let mut server = mockito::Server::new_async().await;
    let reply = "```json\n{\"Title\": \"The Hobbit\", \"Author\": null, \
        \"ExtractedTitleFragment\": \"hobbit\", \"ExtractedAuthorFragment\": null, \
        \"Keywords\": [\"illustrated\"]}\n```";
    let mock = server
        .mock("POST", GEMINI_PATH)
        .match_header("x-goog-api-key", "test-key")
        .match_body(Matcher::PartialJson(json!({
            "generationConfig": { "responseMimeType": "application/json" }
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(gemini_reply(reply))
        .create_async()
        .await;

    let intent = gemini_client(server.url())
        .extract_intent("illustrated hobbit", &CancellationToken::new())
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(intent.title_str(), Some("The Hobbit"));
    assert_eq!(intent.author, None);
    assert_eq!(intent.extracted_title_fragment.as_deref(), Some("hobbit"));
    assert_eq!(intent.keywords, vec!["illustrated"]);
}

#[tokio::test]
async fn test_gemini_error_status() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", GEMINI_PATH)
        .with_status(500)
        .create_async()
        .await;

    let result = gemini_client(server.url())
        .extract_intent("the hobbit", &CancellationToken::new())
        .await;
    assert!(matches!(result, Err(SourceError::Api(_))));

    let mut limited = mockito::Server::new_async().await;
    limited
        .mock("POST", GEMINI_PATH)
        .with_status(429)
        .create_async()
        .await;

    let result = gemini_client(limited.url())
        .extract_intent("the hobbit", &CancellationToken::new())
        .await;
    assert!(matches!(result, Err(SourceError::RateLimit)));
}

#[tokio::test]
async fn test_gemini_explanations_merged_by_index() {
    let mut server = mockito::Server::new_async().await;
    let reply = json!([
        { "Title": "The Hobbit", "Explanation": "Exact title; Tolkien is the primary author." },
        { "Title": "The Hobbit: Graphic Novel", "Explanation": "Near title; David Wenzel is a contributor." }
    ])
    .to_string();
    let mock = server
        .mock("POST", GEMINI_PATH)
        .match_header("x-goog-api-key", "test-key")
        .match_body(Matcher::Regex("Contributor".to_string()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(gemini_reply(&reply))
        .create_async()
        .await;

    let mut first = make_candidate("/works/OL27482W", "The Hobbit", &["J.R.R. Tolkien"]);
    first.author_status = AuthorStatus::Primary;
    let mut second = make_candidate(
        "/works/OL262758W",
        "The Hobbit: Graphic Novel",
        &["J.R.R. Tolkien", "David Wenzel"],
    );
    second.author_status = AuthorStatus::Contributor;

    let intent = SearchIntent::with_title("The Hobbit");
    let explained = gemini_client(server.url())
        .explain_and_finalize("hobbit", &intent, &[first, second], &CancellationToken::new())
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(explained.len(), 2);
    assert_eq!(explained[0].external_id, "/works/OL27482W");
    assert_eq!(
        explained[0].explanation,
        "Exact title; Tolkien is the primary author."
    );
    assert_eq!(
        explained[1].explanation,
        "Near title; David Wenzel is a contributor."
    );
}
