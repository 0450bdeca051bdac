use thiserror::Error;
use uuid::Uuid;

use crate::types::{LoanStatus, MembershipStatus};

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("validation failed on {field}: {message}")]
    Validation { field: &'static str, message: String },

    #[error("loan {loan} cannot {attempted} from status {current:?}")]
    InvalidLoanTransition {
        loan: Uuid,
        current: LoanStatus,
        attempted: &'static str,
    },

    #[error("member {member} cannot {attempted} from status {current:?}")]
    InvalidMemberTransition {
        member: Uuid,
        current: MembershipStatus,
        attempted: &'static str,
    },

    #[error(
        "disbursement of loan {loan} partially applied ({completed}); manual reconciliation required: {message}"
    )]
    PartialCommit {
        loan: Uuid,
        completed: &'static str,
        message: String,
    },

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: Uuid },

    #[error("store operation failed: {message}")]
    Store { message: String },

    #[error("invalid date: {message}")]
    InvalidDate { message: String },
}

impl EngineError {
    /// validation error shorthand
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        EngineError::Validation {
            field,
            message: message.into(),
        }
    }

    /// errors that are safe to retry after correcting input
    pub fn is_retry_safe(&self) -> bool {
        matches!(self, EngineError::Validation { .. } | EngineError::NotFound { .. })
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
