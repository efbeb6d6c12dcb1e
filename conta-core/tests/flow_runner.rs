use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{NaiveDate, TimeZone, Utc};
use conta_core::{
    Account, AccountContext, ApiError, BankApi, BoletoDetails, BoletoPayment, Field, FieldSchema,
    FlowKind, FlowRunner, Holder, HolderId, LocalTransfer, LookupOutcome, Navigator, Phase,
    RejectionReason, Session, Submitted, Subtype, SyncError, Transaction, TransactionType, WorkflowError,
};
use rust_decimal::Decimal;

#[derive(Default)]
struct FakeBank {
    calls: Mutex<Vec<String>>,
    boletos: HashMap<String, BoletoDetails>,
    payees: HashMap<String, bool>,
    failing_lookups: AtomicUsize,
    rejection: Mutex<Option<ApiError>>,
    balance: Mutex<Decimal>,
}

impl FakeBank {
    fn new() -> Self {
        let mut bank = FakeBank::default();
        bank.boletos.insert(
            "12345".to_string(),
            BoletoDetails {
                beneficiary: "ACME".to_string(),
                amount: Decimal::new(10000, 2),
                due_date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            },
        );
        bank.payees.insert("000.000.000-00".to_string(), false);
        bank.payees.insert("111.444.777-35".to_string(), true);
        *bank.balance.lock().unwrap() = Decimal::new(100000, 2);
        bank
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn count(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(prefix)).count()
    }

    fn lookup_should_fail(&self) -> bool {
        self.failing_lookups
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    fn settle(&self, amount: Decimal) -> Result<(), ApiError> {
        if let Some(err) = self.rejection.lock().unwrap().clone() {
            return Err(err);
        }
        *self.balance.lock().unwrap() -= amount;
        Ok(())
    }
}

#[async_trait]
impl BankApi for FakeBank {
    async fn lookup_boleto(&self, _ctx: &AccountContext, code: &str) -> Result<Option<BoletoDetails>, ApiError> {
        self.record(format!("lookup_boleto:{code}"));
        tokio::task::yield_now().await;
        if self.lookup_should_fail() {
            return Err(ApiError::Transport("connection reset".into()));
        }
        Ok(self.boletos.get(code).cloned())
    }

    async fn pay_boleto(&self, _ctx: &AccountContext, payment: &BoletoPayment) -> Result<(), ApiError> {
        self.record(format!("pay_boleto:{}", payment.code));
        tokio::task::yield_now().await;
        let amount = self.boletos.get(&payment.code).map(|b| b.amount).unwrap_or_default();
        self.settle(amount)
    }

    async fn check_payee_registered(&self, _ctx: &AccountContext, document: &str) -> Result<bool, ApiError> {
        self.record(format!("check_payee:{document}"));
        tokio::task::yield_now().await;
        if self.lookup_should_fail() {
            return Err(ApiError::Transport("connection reset".into()));
        }
        Ok(self.payees.get(document).copied().unwrap_or(false))
    }

    async fn transfer_local(&self, _ctx: &AccountContext, transfer: &LocalTransfer) -> Result<(), ApiError> {
        self.record(format!("transfer_local:{}:{}", transfer.document, transfer.amount));
        tokio::task::yield_now().await;
        self.settle(transfer.amount)
    }

    async fn refresh_account(&self, ctx: &AccountContext) -> Result<Account, ApiError> {
        self.record("refresh".to_string());
        Ok(Account {
            balance: *self.balance.lock().unwrap(),
            holder: Holder {
                id: ctx.holder_id,
                name: "Ana Souza".to_string(),
            },
            transactions: vec![Transaction::new(
                1,
                TransactionType::Deposit,
                Utc.with_ymd_and_hms(2024, 4, 30, 12, 0, 0).unwrap(),
                Decimal::new(100000, 2),
            )],
        })
    }
}

#[derive(Default)]
struct RecordingNavigator {
    events: RefCell<Vec<String>>,
}

impl RecordingNavigator {
    fn events(&self) -> Vec<String> {
        self.events.borrow().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn go_back(&self) {
        self.events.borrow_mut().push("back".to_string());
    }

    fn set_title(&self, title: &str) {
        self.events.borrow_mut().push(format!("title:{title}"));
    }
}

fn signed_in() -> Arc<Session> {
    let session = Arc::new(Session::new());
    session.sign_in(AccountContext::new(7));
    session
}

fn runner(kind: FlowKind, bank: &Arc<FakeBank>, session: &Arc<Session>) -> FlowRunner<RecordingNavigator> {
    FlowRunner::new(kind, bank.clone(), session.clone(), RecordingNavigator::default())
}

async fn boleto_ready(runner: &FlowRunner<RecordingNavigator>) {
    runner.select_subtype(Subtype::Boleto).unwrap();
    runner.edit(Field::BoletoCode, "12345");
    assert_eq!(
        runner.commit_field(Field::BoletoCode).await.unwrap(),
        LookupOutcome::Applied(FieldSchema::BoletoConfirm)
    );
    runner.edit(Field::Password, "1234");
}

#[tokio::test]
async fn test_boleto_payment_end_to_end() {
    let bank = Arc::new(FakeBank::new());
    let session = signed_in();
    let runner = runner(FlowKind::Payment, &bank, &session);

    runner.select_subtype(Subtype::Boleto).unwrap();
    runner.edit(Field::BoletoCode, "12345");
    let outcome = runner.commit_field(Field::BoletoCode).await.unwrap();
    assert_eq!(outcome, LookupOutcome::Applied(FieldSchema::BoletoConfirm));

    let view = runner.snapshot();
    let boleto = view.boleto.unwrap();
    assert_eq!(boleto.beneficiary, "ACME");
    assert_eq!(boleto.amount, Decimal::new(10000, 2));
    assert_eq!(boleto.due_date, NaiveDate::from_ymd_opt(2024, 5, 1).unwrap());
    assert!(view.submit_enabled);

    runner.edit(Field::Password, "1234");
    match runner.submit().await.unwrap() {
        Submitted::Completed { message, refresh_error } => {
            assert_eq!(message, "Pagamento realizado com sucesso!");
            assert!(refresh_error.is_none());
        }
        other => panic!("unexpected {other:?}"),
    }

    assert_eq!(bank.calls(), vec!["lookup_boleto:12345", "pay_boleto:12345", "refresh"]);
    assert_eq!(runner.navigator().events(), vec!["title:Pagar Boleto", "back"]);
    assert_eq!(session.account().unwrap().balance, Decimal::new(90000, 2));

    let view = runner.snapshot();
    assert_eq!(view.phase, Phase::Succeeded);
    assert!(view.values.is_empty());
}

#[tokio::test]
async fn test_unregistered_payee_shows_routing_fields() {
    let bank = Arc::new(FakeBank::new());
    let session = signed_in();
    let runner = runner(FlowKind::Transfer, &bank, &session);

    assert_eq!(runner.snapshot().fields, &[Field::PayeeDocument]);
    runner.edit(Field::PayeeDocument, "000.000.000-00");
    assert_eq!(
        runner.commit_field(Field::PayeeDocument).await.unwrap(),
        LookupOutcome::Applied(FieldSchema::TransferUnregistered)
    );

    let fields = runner.snapshot().fields;
    let password_at = fields.iter().position(|f| *f == Field::Password).unwrap();
    for routing in [Field::Bank, Field::Agency, Field::AccountNumber, Field::TransferKind] {
        let at = fields.iter().position(|f| *f == routing).unwrap();
        assert!(at < password_at);
    }

    for (field, value) in [
        (Field::Amount, "50"),
        (Field::Bank, "001"),
        (Field::Agency, "1234"),
        (Field::AccountNumber, "56789-0"),
        (Field::TransferKind, "TED"),
        (Field::Password, "1234"),
    ] {
        runner.edit(field, value);
    }
    let err = runner.submit().await.unwrap_err();
    assert_eq!(err.alert().as_deref(), Some("Por enquanto só transferência local."));
    assert_eq!(bank.calls(), vec!["check_payee:000.000.000-00"]);
}

#[tokio::test]
async fn test_registered_transfer_sends_amount() {
    let bank = Arc::new(FakeBank::new());
    let session = signed_in();
    let runner = runner(FlowKind::Transfer, &bank, &session);

    runner.edit(Field::PayeeDocument, "111.444.777-35");
    assert_eq!(
        runner.commit_field(Field::PayeeDocument).await.unwrap(),
        LookupOutcome::Applied(FieldSchema::TransferRegistered)
    );
    assert!(!runner.snapshot().fields.contains(&Field::Bank));

    runner.edit(Field::Amount, "50,00");
    runner.edit(Field::Password, "1234");
    let submitted = runner.submit().await.unwrap();
    assert!(matches!(
        submitted,
        Submitted::Completed {
            message: "Transferência realizada com sucesso!",
            ..
        }
    ));
    assert_eq!(bank.count("transfer_local:111.444.777-35:50.00"), 1);
    assert_eq!(bank.count("refresh"), 1);
    // transfer forms keep their fixed title
    assert_eq!(runner.navigator().events(), vec!["back"]);
}

#[tokio::test]
async fn test_double_submit_sends_one_mutation() {
    let bank = Arc::new(FakeBank::new());
    let session = signed_in();
    let runner = runner(FlowKind::Payment, &bank, &session);
    boleto_ready(&runner).await;

    let (first, second) = tokio::join!(runner.submit(), runner.submit());
    assert!(matches!(first.unwrap(), Submitted::Completed { .. }));
    assert!(matches!(second.unwrap(), Submitted::Ignored));

    assert_eq!(bank.count("pay_boleto"), 1);
    assert_eq!(bank.count("refresh"), 1);
}

#[tokio::test]
async fn test_rejection_keeps_form_and_skips_refresh() {
    let bank = Arc::new(FakeBank::new());
    *bank.rejection.lock().unwrap() = Some(ApiError::Rejected(RejectionReason::InsufficientFunds));
    let session = signed_in();
    let runner = runner(FlowKind::Payment, &bank, &session);
    boleto_ready(&runner).await;

    match runner.submit().await {
        Err(WorkflowError::SubmissionRejected(rejection)) => {
            assert_eq!(rejection.message(), "Saldo insuficiente!")
        }
        other => panic!("unexpected {other:?}"),
    }

    assert_eq!(bank.count("refresh"), 0);
    assert_eq!(session.account(), None);
    let view = runner.snapshot();
    assert_eq!(view.phase, Phase::FieldsVisible(FieldSchema::BoletoConfirm));
    assert_eq!(view.values.get(Field::BoletoCode), Some("12345"));
    assert_eq!(view.alert.as_deref(), Some("Saldo insuficiente!"));
    assert_eq!(runner.navigator().events(), vec!["title:Pagar Boleto"]);

    // the password was cleared, so a second press fails locally
    match runner.submit().await {
        Err(WorkflowError::Validation(errors)) => assert!(errors.contains(Field::Password)),
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(bank.count("pay_boleto"), 1);
}

#[tokio::test]
async fn test_lookup_failure_is_recoverable() {
    let bank = Arc::new(FakeBank::new());
    bank.failing_lookups.store(1, Ordering::SeqCst);
    let session = signed_in();
    let runner = runner(FlowKind::Payment, &bank, &session);
    runner.select_subtype(Subtype::Boleto).unwrap();
    runner.edit(Field::BoletoCode, "12345");

    let err = runner.commit_field(Field::BoletoCode).await.unwrap_err();
    assert!(matches!(err, WorkflowError::Lookup(_)));
    assert_eq!(runner.snapshot().phase, Phase::AwaitingLookup);

    assert_eq!(
        runner.commit_field(Field::BoletoCode).await.unwrap(),
        LookupOutcome::Applied(FieldSchema::BoletoConfirm)
    );
    assert_eq!(bank.count("lookup_boleto"), 2);
}

#[tokio::test]
async fn test_reselecting_subtype_clears_boleto_details() {
    let bank = Arc::new(FakeBank::new());
    let session = signed_in();
    let runner = runner(FlowKind::Payment, &bank, &session);
    boleto_ready(&runner).await;
    assert!(runner.snapshot().boleto.is_some());

    runner.select_subtype(Subtype::Boleto).unwrap();
    let view = runner.snapshot();
    assert!(view.boleto.is_none());
    assert_eq!(view.fields, &[Field::BoletoCode]);
    assert!(!view.submit_enabled);
}

#[tokio::test]
async fn test_stale_lookup_is_discarded() {
    let bank = Arc::new(FakeBank::new());
    let session = signed_in();
    let runner = runner(FlowKind::Payment, &bank, &session);
    runner.select_subtype(Subtype::Boleto).unwrap();
    runner.edit(Field::BoletoCode, "12345");

    let (outcome, _) = tokio::join!(runner.commit_field(Field::BoletoCode), async {
        runner.select_subtype(Subtype::Boleto).unwrap();
    });
    assert_eq!(outcome.unwrap(), LookupOutcome::Discarded);
    assert!(runner.snapshot().boleto.is_none());
}

#[tokio::test]
async fn test_unsupported_subtype_makes_no_calls() {
    let bank = Arc::new(FakeBank::new());
    let session = signed_in();
    let runner = runner(FlowKind::Payment, &bank, &session);

    for subtype in [Subtype::Tax, Subtype::PhoneRecharge] {
        let err = runner.select_subtype(subtype).unwrap_err();
        assert_eq!(err.alert().as_deref(), Some("Por enquanto só pagamento de boleto."));
    }
    assert_eq!(runner.snapshot().phase, Phase::SelectingSubtype);
    assert!(matches!(runner.submit().await.unwrap(), Submitted::Ignored));
    assert!(bank.calls().is_empty());
    assert!(runner.navigator().events().is_empty());
}

#[tokio::test]
async fn test_disposed_form_still_refreshes_session() {
    let bank = Arc::new(FakeBank::new());
    let session = signed_in();
    let runner = runner(FlowKind::Payment, &bank, &session);
    boleto_ready(&runner).await;

    let (submitted, _) = tokio::join!(runner.submit(), async { runner.dispose() });
    assert!(matches!(submitted.unwrap(), Submitted::Abandoned));
    assert_eq!(bank.count("refresh"), 1);
    assert_eq!(session.account().unwrap().holder.id, HolderId(7));
    assert_eq!(runner.navigator().events(), vec!["title:Pagar Boleto"]);
    assert_eq!(runner.snapshot().phase, Phase::Disposed);
}

#[tokio::test]
async fn test_sign_out_during_submit_reports_stale_cache() {
    let bank = Arc::new(FakeBank::new());
    let session = signed_in();
    let runner = runner(FlowKind::Payment, &bank, &session);
    boleto_ready(&runner).await;

    let (submitted, _) = tokio::join!(runner.submit(), async { session.sign_out() });
    match submitted.unwrap() {
        Submitted::Completed { refresh_error, .. } => {
            assert_eq!(refresh_error, Some(SyncError::InactiveSession))
        }
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(bank.count("refresh"), 1);
    assert_eq!(session.account(), None);
}

#[tokio::test]
async fn test_submit_requires_session() {
    let bank = Arc::new(FakeBank::new());
    let session = Arc::new(Session::new());
    let runner = runner(FlowKind::Payment, &bank, &session);
    runner.select_subtype(Subtype::Boleto).unwrap();
    runner.edit(Field::BoletoCode, "12345");

    assert!(matches!(
        runner.commit_field(Field::BoletoCode).await,
        Err(WorkflowError::Lookup(_))
    ));
    assert!(matches!(runner.submit().await, Err(WorkflowError::NoSession)));
    assert!(bank.calls().is_empty());
}

#[tokio::test]
async fn test_non_identifying_field_commit_is_skipped() {
    let bank = Arc::new(FakeBank::new());
    let session = signed_in();
    let runner = runner(FlowKind::Payment, &bank, &session);
    boleto_ready(&runner).await;

    assert_eq!(runner.commit_field(Field::Password).await.unwrap(), LookupOutcome::Skipped);
    // same code committed again
    assert_eq!(runner.commit_field(Field::BoletoCode).await.unwrap(), LookupOutcome::Skipped);
    assert_eq!(bank.count("lookup_boleto"), 1);
}
