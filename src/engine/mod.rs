//! Sweet-spot funnel engine: pure functions over entries and assumptions.
//!
//! Nothing in here touches the database or holds state between calls.

pub mod formatter;
pub mod funnel;

use thiserror::Error;

pub use formatter::{rank_sweet_spots, summarize, summarize_by_niche};
pub use funnel::{compute_batch, compute_funnel};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("no assumption registered for niche {0:?}")]
    UnknownNiche(String),

    #[error("invalid {field}: {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("results ({results}) and entries ({entries}) are misaligned: {detail}")]
    MismatchedInput {
        results: usize,
        entries: usize,
        detail: String,
    },
}

impl EngineError {
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        EngineError::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }
}
