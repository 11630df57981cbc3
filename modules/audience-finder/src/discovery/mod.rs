//! The three discovery strategies.
//!
//! Each consumes one query and the API handle, is capped by its own depth,
//! and absorbs its own per-call failures. Only two things stop a strategy
//! early: the user's cancel flag and an auth failure on the handle.

pub mod comments;
pub mod direct;
pub mod posts;

use std::sync::atomic::{AtomicBool, Ordering};

use reddit_client::RedditError;
use serde::{Deserialize, Serialize};

/// Per-strategy result caps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SearchDepths {
    /// Subreddits per name/description search.
    pub direct: u32,
    /// Posts per platform-wide post search.
    pub post: u32,
    /// Top-level comments scanned per matching post. 0 disables comment matching.
    pub comment: u32,
}

/// Why a strategy stopped before finishing its sweep.
#[derive(Debug)]
pub enum Interrupt {
    Cancelled,
    Auth(RedditError),
}

pub(crate) fn check_cancelled_flag(cancelled: &AtomicBool) -> Result<(), Interrupt> {
    if cancelled.load(Ordering::Relaxed) {
        return Err(Interrupt::Cancelled);
    }
    Ok(())
}

/// Auth failures escalate; anything else is handed back to be logged and skipped.
pub(crate) fn absorb(err: RedditError) -> Result<RedditError, Interrupt> {
    if err.is_auth() {
        return Err(Interrupt::Auth(err));
    }
    Ok(err)
}
