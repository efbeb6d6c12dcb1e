//! Async driver for one open payment or transfer form.
//!
//! `FlowRunner` owns a `WorkflowController` and sequences the I/O around it:
//! lookups through the `LookupGate`, the single mutation through `BankApi`, and
//! the follow-up refresh through `AccountStateSync`. The controller lock is
//! never held across an await.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, warn};

use crate::api::{BankApi, Navigator};
use crate::error::{LookupError, SubmissionRejected, SyncError, WorkflowError};
use crate::lookup::LookupGate;
use crate::schema::{Field, FieldSchema};
use crate::session::Session;
use crate::submission::MutationRequest;
use crate::sync::AccountStateSync;
use crate::workflow::{
    FlowKind, FormView, LookupResolution, SubmitResolution, SubmitStart, Subtype, WorkflowController,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupOutcome {
    /// Not the identifying field, or nothing new to look up.
    Skipped,
    Applied(FieldSchema),
    /// The answer arrived for an identifier that is no longer current.
    Discarded,
}

#[derive(Debug)]
pub enum Submitted {
    Completed {
        message: &'static str,
        /// The mutation went through but the account could not be reloaded.
        refresh_error: Option<SyncError>,
    },
    /// Submit pressed while inert (already submitting, or not offered).
    Ignored,
    /// The form was disposed or reset before the bank answered.
    Abandoned,
}

pub struct FlowRunner<N: Navigator> {
    controller: Mutex<WorkflowController>,
    gate: LookupGate,
    sync: AccountStateSync,
    api: Arc<dyn BankApi>,
    session: Arc<Session>,
    navigator: N,
}

impl<N: Navigator> FlowRunner<N> {
    pub fn new(kind: FlowKind, api: Arc<dyn BankApi>, session: Arc<Session>, navigator: N) -> Self {
        Self {
            controller: Mutex::new(WorkflowController::new(kind)),
            gate: LookupGate::new(api.clone()),
            sync: AccountStateSync::new(api.clone(), session.clone()),
            api,
            session,
            navigator,
        }
    }

    fn controller(&self) -> MutexGuard<'_, WorkflowController> {
        self.controller.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn navigator(&self) -> &N {
        &self.navigator
    }

    pub fn snapshot(&self) -> FormView {
        self.controller().view()
    }

    pub fn select_subtype(&self, subtype: Subtype) -> Result<(), WorkflowError> {
        let title = self.controller().select_subtype(subtype)?;
        if let Some(title) = title {
            self.navigator.set_title(&title);
        }
        Ok(())
    }

    pub fn edit(&self, field: Field, value: impl Into<String>) {
        self.controller().edit(field, value);
    }

    /// A field lost focus. Runs the lookup when `field` identifies the form.
    pub async fn commit_field(&self, field: Field) -> Result<LookupOutcome, WorkflowError> {
        if self.controller().identifying_field() != Some(field) {
            return Ok(LookupOutcome::Skipped);
        }
        let ctx = self
            .session
            .current_account_context()
            .ok_or(WorkflowError::Lookup(LookupError::NoSession))?;

        let ticket = self.controller().begin_lookup();
        let Some(ticket) = ticket else {
            return Ok(LookupOutcome::Skipped);
        };

        let answer = self.gate.inquire(ticket.inquiry(), &ctx).await;
        let resolution = self.controller().complete_lookup(ticket, answer);
        match resolution {
            LookupResolution::Applied(schema) => {
                debug!(?schema, "lookup applied");
                Ok(LookupOutcome::Applied(schema))
            }
            LookupResolution::Failed(e) => Err(WorkflowError::Lookup(e)),
            LookupResolution::Discarded => {
                debug!("stale lookup discarded");
                Ok(LookupOutcome::Discarded)
            }
        }
    }

    /// Validate, send the mutation once, then reconcile the account.
    pub async fn submit(&self) -> Result<Submitted, WorkflowError> {
        let ctx = self.session.current_account_context().ok_or(WorkflowError::NoSession)?;

        let start = self.controller().begin_submit()?;
        let (ticket, submission) = match start {
            SubmitStart::Ready(ticket, submission) => (ticket, submission),
            SubmitStart::Busy => {
                debug!("submit ignored: mutation already outstanding");
                return Ok(Submitted::Ignored);
            }
            SubmitStart::NotOffered => return Ok(Submitted::Ignored),
        };

        info!(holder = %ctx.holder_id, mutation = submission.request.name(), "submitting");
        let outcome = match &submission.request {
            MutationRequest::PayBoleto(payment) => self.api.pay_boleto(&ctx, payment).await,
            MutationRequest::LocalTransfer(transfer) => self.api.transfer_local(&ctx, transfer).await,
        };
        drop(submission);

        let accepted = outcome.is_ok();
        if let Err(e) = &outcome {
            warn!(holder = %ctx.holder_id, error = %e, "mutation rejected");
        }
        let resolution = self
            .controller()
            .complete_submit(ticket, outcome.map_err(SubmissionRejected::from));

        // Money moved even if the form is gone; the session copy must follow.
        let refresh_error = if accepted {
            match self.sync.refresh(&ctx).await {
                Ok(_) => None,
                Err(e) => {
                    warn!(holder = %ctx.holder_id, error = %e, "refresh after mutation failed");
                    Some(e)
                }
            }
        } else {
            None
        };

        match resolution {
            SubmitResolution::Succeeded { message } => {
                self.navigator.go_back();
                Ok(Submitted::Completed { message, refresh_error })
            }
            SubmitResolution::Rejected(rejection) => Err(WorkflowError::SubmissionRejected(rejection)),
            SubmitResolution::Discarded => {
                info!(holder = %ctx.holder_id, "mutation settled after the form moved on");
                Ok(Submitted::Abandoned)
            }
        }
    }

    pub fn dispose(&self) {
        self.controller().dispose();
    }
}
