//! conta-core: transaction workflow engine for the Conta banking client

pub mod account;
pub mod api;
pub mod error;
pub mod lookup;
pub mod runner;
pub mod schema;
pub mod session;
pub mod statement;
pub mod submission;
pub mod sync;
pub mod transaction;
pub mod workflow;

pub use account::{Account, AccountContext, Holder, HolderId};
pub use api::{BankApi, Navigator};
pub use error::{
    ApiError, LookupError, RejectionReason, StatementError, SubmissionRejected, SyncError,
    UnknownTransactionType, WorkflowError,
};
pub use lookup::{BoletoDetails, Inquiry, LookupGate, LookupResult};
pub use runner::{FlowRunner, LookupOutcome, Submitted};
pub use schema::{Field, FieldErrors, FieldSchema, FormValues};
pub use session::Session;
pub use statement::{
    AccountKind, StatementFilter, StatementOpened, StatementRow, StatementView, format_brl,
};
pub use submission::{BoletoPayment, FormSubmission, LocalTransfer, MutationRequest, Secret};
pub use sync::AccountStateSync;
pub use transaction::{Sign, Transaction, TransactionType};
pub use workflow::{FlowKind, FormView, Phase, Subtype, WorkflowController};
