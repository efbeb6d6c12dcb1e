use thiserror::Error;

use crate::schema::FieldErrors;
use crate::statement::AccountKind;
use crate::workflow::Subtype;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("unknown transaction type code {0}")]
pub struct UnknownTransactionType(pub i64);

/// Why the bank refused a mutation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RejectionReason {
    #[error("insufficient balance")]
    InsufficientFunds,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("{0}")]
    Other(String),
}

impl RejectionReason {
    pub fn user_message(&self) -> String {
        match self {
            RejectionReason::InsufficientFunds => "Saldo insuficiente!".to_string(),
            RejectionReason::InvalidCredentials => "Senha incorreta.".to_string(),
            RejectionReason::Other(detail) if detail.trim().is_empty() => {
                "Não foi possível concluir a operação.".to_string()
            }
            RejectionReason::Other(detail) => {
                format!("Não foi possível concluir a operação: {}", detail.trim())
            }
        }
    }
}

/// Failure at the network boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("request rejected: {0}")]
    Rejected(RejectionReason),
    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed response: {0}")]
    Decode(String),
    #[error(transparent)]
    UnknownTransactionType(#[from] UnknownTransactionType),
}

/// The remote side refused (or could not complete) a submission.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("submission rejected: {reason}")]
pub struct SubmissionRejected {
    pub reason: RejectionReason,
}

impl SubmissionRejected {
    pub fn new(reason: RejectionReason) -> Self {
        Self { reason }
    }

    pub fn message(&self) -> String {
        self.reason.user_message()
    }
}

impl From<ApiError> for SubmissionRejected {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Rejected(reason) => SubmissionRejected::new(reason),
            other => SubmissionRejected::new(RejectionReason::Other(other.to_string())),
        }
    }
}

/// A pre-submission inquiry could not be answered. Distinct from a negative answer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    #[error("lookup failed: {0}")]
    Api(#[from] ApiError),
    #[error("no authenticated account")]
    NoSession,
}

impl LookupError {
    pub fn user_message(&self) -> String {
        match self {
            LookupError::Api(_) => "Não foi possível consultar os dados. Tente novamente.".to_string(),
            LookupError::NoSession => "Sessão expirada. Entre novamente.".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    #[error("no authenticated account")]
    NoSession,
    /// The holder signed out or changed before the fresh account arrived.
    #[error("session changed during refresh; cached account not replaced")]
    InactiveSession,
    #[error("account refresh failed: {0}")]
    Api(#[from] ApiError),
}

/// Everything the form workflow reports back to its caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkflowError {
    #[error("validation failed on {} field(s)", .0.len())]
    Validation(FieldErrors),
    #[error(transparent)]
    Lookup(#[from] LookupError),
    #[error(transparent)]
    SubmissionRejected(#[from] SubmissionRejected),
    #[error("unsupported sub-type {subtype:?}: {message}")]
    UnsupportedSubtype {
        subtype: Subtype,
        message: &'static str,
    },
    #[error("no authenticated account")]
    NoSession,
}

impl WorkflowError {
    /// Text for a terminal alert, if this error is shown as one.
    pub fn alert(&self) -> Option<String> {
        match self {
            WorkflowError::Validation(_) => None,
            WorkflowError::Lookup(e) => Some(e.user_message()),
            WorkflowError::SubmissionRejected(r) => Some(r.message()),
            WorkflowError::UnsupportedSubtype { message, .. } => Some((*message).to_string()),
            WorkflowError::NoSession => Some(LookupError::NoSession.user_message()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StatementError {
    #[error("statements for {0:?} are under construction")]
    UnderConstruction(AccountKind),
}

impl StatementError {
    pub fn user_message(&self) -> &'static str {
        match self {
            StatementError::UnderConstruction(_) => "Em construção...",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_messages_distinguish_reasons() {
        assert_eq!(
            SubmissionRejected::new(RejectionReason::InsufficientFunds).message(),
            "Saldo insuficiente!"
        );
        assert_eq!(
            SubmissionRejected::new(RejectionReason::Other(String::new())).message(),
            "Não foi possível concluir a operação."
        );
    }

    #[test]
    fn test_transport_failure_becomes_rejection() {
        let rej = SubmissionRejected::from(ApiError::Transport("connection reset".into()));
        match rej.reason {
            RejectionReason::Other(detail) => assert!(detail.contains("connection reset")),
            other => panic!("unexpected reason {other:?}"),
        }
    }
}
