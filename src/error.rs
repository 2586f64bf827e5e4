use std::time::Duration;
use thiserror::Error;

/// Failure reported by an external collaborator (activity store or catalog).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Reasons a training run can fail. All of these degrade to the fallback list.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TrainingError {
    #[error("no training triples")]
    EmptyTripleSet,

    #[error("loss became non-finite in epoch {epoch}")]
    NonFiniteLoss { epoch: usize },

    #[error("training exceeded its time budget after {0:?}")]
    BudgetExceeded(Duration),

    #[error("invalid training configuration: {0}")]
    InvalidConfig(String),
}

#[derive(Error, Debug)]
pub enum RecommendationError {
    #[error(transparent)]
    StoreUnavailable(#[from] StoreError),

    #[error("invalid user id: {0}")]
    InvalidUser(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl RecommendationError {
    /// Whether the caller may retry the whole request.
    pub fn is_retryable(&self) -> bool {
        matches!(self, RecommendationError::StoreUnavailable(_))
    }
}
