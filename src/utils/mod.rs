//! Utility modules supporting the search pipeline.
//!
//! - [`HttpClient`]: shared reqwest client with timeouts and a crate user agent
//! - [`run_cancellable`]: race a future against a [`CancellationToken`]
//!
//! # Cancellation
//!
//! ```rust
//! use find_that_book::utils::run_cancellable;
//! use tokio_util::sync::CancellationToken;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let cancel = CancellationToken::new();
//! cancel.cancel();
//! assert!(run_cancellable(&cancel, async { 1 }).await.is_none());
//! # }
//! ```
//!
//! [`CancellationToken`]: tokio_util::sync::CancellationToken

mod cancel;
mod http;

pub use cancel::run_cancellable;
pub use http::HttpClient;
