/*!
 * API Client
 * Optimistic like/unlike against the public blog API
 */
pub mod like;

use thiserror::Error;

pub use like::{LikeClient, LikeOutcome, LikePhase, LikeToggle, LikedPosts};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server answered {status}: {message}")]
    Status { status: u16, message: String },

    #[error("a like request for this post is already in flight")]
    InFlight,

    #[error("liked posts file: {0}")]
    Io(#[from] std::io::Error),

    #[error("liked posts file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}
