//! Form state machine shared by the payment and transfer flows.
//!
//! The controller performs no I/O. Each remote step is split in two: a
//! `begin_*` call that records what is outstanding and hands out a ticket, and
//! a `complete_*` call that applies the answer only if that ticket is still
//! current. Replacing the sub-type, editing the identifying field or disposing
//! the controller makes older tickets stale.
//!
//! Phases:
//!
//! ```text
//! SelectingSubtype -> AwaitingLookup -> FieldsVisible(schema) -> Submitting -> Succeeded
//!                          ^   |              ^                      |
//!                          +---+ (lookup       +---- rejected --------+
//!                                 failed)
//! ```
//!
//! Local validation (the authorizing step) happens inside `begin_submit`; a
//! failure leaves the form in `FieldsVisible` with inline errors.

use tracing::debug;

use crate::error::{LookupError, SubmissionRejected, WorkflowError};
use crate::lookup::{BoletoDetails, Inquiry, LookupResult};
use crate::schema::{self, Field, FieldErrors, FieldSchema, FormValues};
use crate::submission::{BoletoPayment, FormSubmission, LocalTransfer, MutationRequest, Secret};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlowKind {
    Payment,
    Transfer,
}

impl FlowKind {
    /// Sub-types offered on the selection screen.
    pub fn subtypes(self) -> &'static [Subtype] {
        match self {
            FlowKind::Payment => &[Subtype::Boleto, Subtype::Tax, Subtype::PhoneRecharge],
            FlowKind::Transfer => &[Subtype::LocalTransfer],
        }
    }

    /// Transfer forms open with their only sub-type already chosen.
    pub fn initial_subtype(self) -> Option<Subtype> {
        match self {
            FlowKind::Payment => None,
            FlowKind::Transfer => Some(Subtype::LocalTransfer),
        }
    }

    pub fn unsupported_message(self) -> &'static str {
        match self {
            FlowKind::Payment => "Por enquanto só pagamento de boleto.",
            FlowKind::Transfer => "Por enquanto só transferência local.",
        }
    }

    pub fn success_message(self) -> &'static str {
        match self {
            FlowKind::Payment => "Pagamento realizado com sucesso!",
            FlowKind::Transfer => "Transferência realizada com sucesso!",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Subtype {
    Boleto,
    Tax,
    PhoneRecharge,
    LocalTransfer,
}

impl Subtype {
    pub fn label(self) -> &'static str {
        match self {
            Subtype::Boleto => "Boleto",
            Subtype::Tax => "Imposto",
            Subtype::PhoneRecharge => "Recarga de celular",
            Subtype::LocalTransfer => "Transferência local",
        }
    }

    pub fn flow(self) -> FlowKind {
        match self {
            Subtype::Boleto | Subtype::Tax | Subtype::PhoneRecharge => FlowKind::Payment,
            Subtype::LocalTransfer => FlowKind::Transfer,
        }
    }

    pub fn is_supported(self) -> bool {
        matches!(self, Subtype::Boleto | Subtype::LocalTransfer)
    }

    pub fn requires_lookup(self) -> bool {
        matches!(self, Subtype::Boleto | Subtype::LocalTransfer)
    }

    /// Field whose committed value keys the lookup.
    pub fn identifying_field(self) -> Option<Field> {
        match self {
            Subtype::Boleto => Some(Field::BoletoCode),
            Subtype::LocalTransfer => Some(Field::PayeeDocument),
            Subtype::Tax | Subtype::PhoneRecharge => None,
        }
    }

    fn inquiry(self, identifier: &str) -> Option<Inquiry> {
        match self {
            Subtype::Boleto => Some(Inquiry::Boleto {
                code: identifier.to_string(),
            }),
            Subtype::LocalTransfer => Some(Inquiry::Payee {
                document: identifier.to_string(),
            }),
            Subtype::Tax | Subtype::PhoneRecharge => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    SelectingSubtype,
    AwaitingLookup,
    FieldsVisible(FieldSchema),
    Submitting,
    Succeeded,
    Disposed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum LookupSlot {
    Idle,
    Pending { seq: u64, inquiry: Inquiry },
    Failed { identifier: String },
    Resolved { identifier: String, result: LookupResult },
}

impl LookupSlot {
    fn identifier(&self) -> Option<&str> {
        match self {
            LookupSlot::Idle => None,
            LookupSlot::Pending { inquiry, .. } => Some(inquiry.identifier()),
            LookupSlot::Failed { identifier } | LookupSlot::Resolved { identifier, .. } => Some(identifier),
        }
    }
}

/// Handle for an outstanding lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupTicket {
    epoch: u64,
    seq: u64,
    inquiry: Inquiry,
}

impl LookupTicket {
    pub fn inquiry(&self) -> &Inquiry {
        &self.inquiry
    }
}

/// Handle for the outstanding mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitTicket {
    epoch: u64,
    seq: u64,
}

#[derive(Debug, Clone)]
pub enum SubmitStart {
    /// A mutation is already outstanding; the submit control is inert.
    Busy,
    /// The submit control is not rendered in the current phase.
    NotOffered,
    Ready(SubmitTicket, FormSubmission),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupResolution {
    Applied(FieldSchema),
    Failed(LookupError),
    /// Stale ticket; nothing changed.
    Discarded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitResolution {
    Succeeded { message: &'static str },
    Rejected(SubmissionRejected),
    Discarded,
}

/// Read-only picture of the form for rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormView {
    pub phase: Phase,
    pub subtype: Option<Subtype>,
    pub fields: &'static [Field],
    /// Entered values, secrets excluded.
    pub values: FormValues,
    pub errors: FieldErrors,
    pub alert: Option<String>,
    pub boleto: Option<BoletoDetails>,
    pub submit_enabled: bool,
}

#[derive(Debug, Clone)]
pub struct WorkflowController {
    kind: FlowKind,
    subtype: Option<Subtype>,
    lookup: LookupSlot,
    values: FormValues,
    errors: FieldErrors,
    alert: Option<String>,
    /// Bumped on every sub-type (re)selection.
    epoch: u64,
    next_seq: u64,
    in_flight: Option<SubmitTicket>,
    succeeded: bool,
    disposed: bool,
}

impl WorkflowController {
    pub fn new(kind: FlowKind) -> Self {
        Self {
            kind,
            subtype: kind.initial_subtype(),
            lookup: LookupSlot::Idle,
            values: FormValues::new(),
            errors: FieldErrors::default(),
            alert: None,
            epoch: 0,
            next_seq: 0,
            in_flight: None,
            succeeded: false,
            disposed: false,
        }
    }

    pub fn kind(&self) -> FlowKind {
        self.kind
    }

    pub fn subtype(&self) -> Option<Subtype> {
        self.subtype
    }

    pub fn values(&self) -> &FormValues {
        &self.values
    }

    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    pub fn alert(&self) -> Option<&str> {
        self.alert.as_deref()
    }

    pub fn lookup_result(&self) -> Option<&LookupResult> {
        match &self.lookup {
            LookupSlot::Resolved { result, .. } => Some(result),
            _ => None,
        }
    }

    pub fn boleto_details(&self) -> Option<&BoletoDetails> {
        self.lookup_result().and_then(LookupResult::boleto)
    }

    pub fn identifying_field(&self) -> Option<Field> {
        self.subtype.and_then(Subtype::identifying_field)
    }

    pub fn schema(&self) -> Option<FieldSchema> {
        self.subtype
            .and_then(|subtype| FieldSchema::select(subtype, self.lookup_result()))
    }

    pub fn is_submitting(&self) -> bool {
        self.in_flight
            .as_ref()
            .is_some_and(|t| t.epoch == self.epoch)
    }

    pub fn phase(&self) -> Phase {
        if self.disposed {
            return Phase::Disposed;
        }
        if self.succeeded {
            return Phase::Succeeded;
        }
        let Some(subtype) = self.subtype else {
            return Phase::SelectingSubtype;
        };
        if self.is_submitting() {
            return Phase::Submitting;
        }
        match (self.schema(), &self.lookup) {
            (Some(schema), LookupSlot::Resolved { .. }) => Phase::FieldsVisible(schema),
            (Some(schema), _) if !subtype.requires_lookup() => Phase::FieldsVisible(schema),
            _ => Phase::AwaitingLookup,
        }
    }

    pub fn visible_fields(&self) -> &'static [Field] {
        if self.disposed || self.succeeded {
            return &[];
        }
        self.schema().map(FieldSchema::fields).unwrap_or(&[])
    }

    pub fn view(&self) -> FormView {
        let fields = self.visible_fields();
        FormView {
            phase: self.phase(),
            subtype: self.subtype,
            fields,
            values: self.values.without_secrets(),
            errors: self.errors.clone(),
            alert: self.alert.clone(),
            boleto: self.boleto_details().cloned(),
            submit_enabled: fields.contains(&Field::Password) && self.in_flight.is_none(),
        }
    }

    /// Choose (or replace) the sub-type. Everything downstream is reset.
    /// Returns the navigator title for the new sub-type, if any.
    pub fn select_subtype(&mut self, subtype: Subtype) -> Result<Option<String>, WorkflowError> {
        if self.disposed {
            return Ok(None);
        }
        if subtype.flow() != self.kind || !subtype.is_supported() {
            return Err(WorkflowError::UnsupportedSubtype {
                subtype,
                message: self.kind.unsupported_message(),
            });
        }
        self.subtype = Some(subtype);
        self.lookup = LookupSlot::Idle;
        self.values.clear();
        self.errors.clear();
        self.alert = None;
        self.succeeded = false;
        self.epoch += 1;
        debug!(?subtype, epoch = self.epoch, "sub-type selected");

        Ok(match self.kind {
            FlowKind::Payment => Some(format!("Pagar {}", subtype.label())),
            FlowKind::Transfer => None,
        })
    }

    /// Record typed text. Only rendered fields accept input, and none while the
    /// form's mutation is outstanding. Changing the identifying field drops any
    /// lookup made for its previous value.
    pub fn edit(&mut self, field: Field, value: impl Into<String>) {
        if self.disposed
            || self.succeeded
            || self.is_submitting()
            || !self.visible_fields().contains(&field)
        {
            return;
        }
        let value = value.into();
        if Some(field) == self.identifying_field() {
            let changed = self
                .lookup
                .identifier()
                .is_some_and(|current| current != value.trim());
            if changed {
                debug!(?field, "identifying field changed; dropping lookup");
                self.lookup = LookupSlot::Idle;
            }
        }
        self.errors.remove(field);
        self.values.set(field, value);
    }

    /// The identifying field lost focus. Returns a ticket when a lookup
    /// should be sent for its value.
    pub fn begin_lookup(&mut self) -> Option<LookupTicket> {
        if self.disposed || self.succeeded || self.is_submitting() {
            return None;
        }
        let subtype = self.subtype.filter(|s| s.requires_lookup())?;
        let field = subtype.identifying_field()?;
        let identifier = self.values.value(field).to_string();
        if identifier.is_empty() {
            return None;
        }
        match &self.lookup {
            LookupSlot::Pending { inquiry, .. } if inquiry.identifier() == identifier => return None,
            LookupSlot::Resolved { identifier: done, .. } if *done == identifier => return None,
            _ => {}
        }
        let inquiry = subtype.inquiry(&identifier)?;
        self.next_seq += 1;
        let seq = self.next_seq;
        self.lookup = LookupSlot::Pending {
            seq,
            inquiry: inquiry.clone(),
        };
        self.alert = None;
        Some(LookupTicket {
            epoch: self.epoch,
            seq,
            inquiry,
        })
    }

    /// Apply a lookup answer if its ticket is still the current one.
    pub fn complete_lookup(
        &mut self,
        ticket: LookupTicket,
        outcome: Result<LookupResult, LookupError>,
    ) -> LookupResolution {
        if self.disposed || ticket.epoch != self.epoch {
            return LookupResolution::Discarded;
        }
        let current = matches!(&self.lookup, LookupSlot::Pending { seq, .. } if *seq == ticket.seq);
        let identifier = ticket.inquiry.identifier().to_string();
        let still_typed = self
            .identifying_field()
            .is_some_and(|f| self.values.value(f) == identifier);
        if !current || !still_typed {
            return LookupResolution::Discarded;
        }

        match outcome {
            Ok(result) => {
                if matches!(result, LookupResult::Boleto(None)) {
                    self.alert = Some("Boleto não encontrado.".to_string());
                }
                self.lookup = LookupSlot::Resolved { identifier, result };
                match self.schema() {
                    Some(schema) => LookupResolution::Applied(schema),
                    None => LookupResolution::Discarded,
                }
            }
            Err(e) => {
                self.alert = Some(e.user_message());
                self.lookup = LookupSlot::Failed { identifier };
                LookupResolution::Failed(e)
            }
        }
    }

    /// Validate and build the submission. At most one is outstanding.
    pub fn begin_submit(&mut self) -> Result<SubmitStart, WorkflowError> {
        if self.disposed || self.succeeded {
            return Ok(SubmitStart::NotOffered);
        }
        if self.in_flight.is_some() {
            return Ok(SubmitStart::Busy);
        }
        let (Some(subtype), Some(schema)) = (self.subtype, self.schema()) else {
            return Ok(SubmitStart::NotOffered);
        };
        if !schema.accepts_authorization() {
            return Ok(SubmitStart::NotOffered);
        }

        self.errors.clear();
        self.alert = None;

        if schema == FieldSchema::TransferUnregistered {
            let message = self.kind.unsupported_message();
            self.alert = Some(message.to_string());
            return Err(WorkflowError::UnsupportedSubtype { subtype, message });
        }

        let submission = match build_submission(schema, &self.values) {
            Ok(submission) => submission,
            Err(errors) => {
                self.errors = errors.clone();
                return Err(WorkflowError::Validation(errors));
            }
        };

        self.next_seq += 1;
        let ticket = SubmitTicket {
            epoch: self.epoch,
            seq: self.next_seq,
        };
        self.in_flight = Some(ticket.clone());
        Ok(SubmitStart::Ready(ticket, submission))
    }

    /// Settle the outstanding submission. The single-flight guard is released
    /// even when the form has moved on; form state only changes if it has not.
    pub fn complete_submit(
        &mut self,
        ticket: SubmitTicket,
        outcome: Result<(), SubmissionRejected>,
    ) -> SubmitResolution {
        if self.in_flight.as_ref() == Some(&ticket) {
            self.in_flight = None;
        }
        if self.disposed || ticket.epoch != self.epoch {
            return SubmitResolution::Discarded;
        }
        match outcome {
            Ok(()) => {
                let message = self.kind.success_message();
                self.succeeded = true;
                self.values.clear();
                self.errors.clear();
                self.lookup = LookupSlot::Idle;
                self.alert = Some(message.to_string());
                SubmitResolution::Succeeded { message }
            }
            Err(rejection) => {
                self.values.forget_secrets();
                self.alert = Some(rejection.message());
                SubmitResolution::Rejected(rejection)
            }
        }
    }

    /// The screen went away. Late answers are ignored from now on.
    pub fn dispose(&mut self) {
        self.disposed = true;
        self.values.forget_secrets();
    }
}

fn build_submission(schema: FieldSchema, values: &FormValues) -> Result<FormSubmission, FieldErrors> {
    schema::validate(schema, values)?;
    let secret = Secret::new(values.value(Field::Password));
    let request = match schema {
        FieldSchema::BoletoConfirm => MutationRequest::PayBoleto(BoletoPayment {
            code: values.value(Field::BoletoCode).to_string(),
            secret,
        }),
        FieldSchema::TransferRegistered => {
            let Some(amount) = schema::parse_amount(values.value(Field::Amount)) else {
                let mut errors = FieldErrors::default();
                errors.insert(Field::Amount, "Valor inválido.");
                return Err(errors);
            };
            MutationRequest::LocalTransfer(LocalTransfer {
                document: values.value(Field::PayeeDocument).to_string(),
                amount,
                secret,
            })
        }
        other => {
            let mut errors = FieldErrors::default();
            errors.insert(other.identifying_field(), "Campo obrigatório.");
            return Err(errors);
        }
    };
    Ok(FormSubmission {
        fields: values.without_secrets(),
        request,
    })
}
