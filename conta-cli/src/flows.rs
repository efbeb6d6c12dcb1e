//! Terminal front-end for the account screens and the payment/transfer forms.

use anyhow::{Context, Result, bail};
use chrono::Utc;
use conta_client::HttpBankApi;
use conta_core::{
    Account, AccountContext, AccountKind, AccountStateSync, BankApi, Field, FieldSchema, FlowKind, FlowRunner,
    LookupOutcome, Session, Sign, StatementFilter, StatementView, Submitted, Subtype, WorkflowError, format_brl,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::warn;

use crate::config::Config;
use crate::state::{SessionFile, clear_session, read_session, write_session};
use crate::terminal::{TerminalNavigator, prompt, prompt_secret};

/// Bank client plus the process-wide session for the stored holder.
pub struct Client {
    pub api: Arc<dyn BankApi>,
    pub session: Arc<Session>,
    pub sync: AccountStateSync,
}

impl Client {
    pub fn new(cfg: &Config) -> Result<Self> {
        let http = HttpBankApi::new(cfg.api.base_url.clone(), cfg.timeout())
            .context("build bank client")?;
        let api: Arc<dyn BankApi> = Arc::new(http);
        let session = Arc::new(Session::new());
        let sync = AccountStateSync::new(api.clone(), session.clone());
        Ok(Self { api, session, sync })
    }

    /// Sign in with the holder stored by `conta login`.
    pub fn resume(cfg: &Config) -> Result<Self> {
        let Some(stored) = read_session()? else {
            bail!("not signed in; run: conta login --holder-id <id>");
        };
        let client = Self::new(cfg)?;
        client.session.sign_in(stored.context());
        Ok(client)
    }

    async fn account(&self) -> Result<Account> {
        self.sync.refresh_session().await.context("load account")
    }
}

pub async fn login(cfg: &Config, holder_id: u64) -> Result<()> {
    let client = Client::new(cfg)?;
    client.session.sign_in(AccountContext::new(holder_id));
    let account = client.account().await?;
    write_session(&SessionFile {
        holder_id,
        signed_in_at_utc: Some(Utc::now().to_rfc3339()),
    })?;
    print_home(&account);
    Ok(())
}

pub fn logout() -> Result<()> {
    if clear_session()? {
        println!("Sessão encerrada.");
    } else {
        println!("Nenhuma sessão ativa.");
    }
    Ok(())
}

pub async fn home(cfg: &Config) -> Result<()> {
    let client = Client::resume(cfg)?;
    let account = client.account().await?;
    print_home(&account);
    Ok(())
}

fn print_home(account: &Account) {
    println!("Olá, {}", account.holder.name);
    println!("Saldo em conta: {}", account.balance_label());
}

pub async fn statement(cfg: &Config, kind: AccountKind, mode: StatementFilter) -> Result<()> {
    let tz = cfg.timezone()?;
    let client = Client::resume(cfg)?;
    let account = client.account().await?;

    let mut view = StatementView::new();
    let opened = match view.select_account(kind, &account) {
        Ok(opened) => opened,
        Err(e) => {
            println!("{}", e.user_message());
            return Ok(());
        }
    };
    println!("== {} ==", opened.title);
    if let Some(notice) = opened.notice {
        println!("{}", notice);
        return Ok(());
    }

    view.set_filter(mode);
    println!("Filtro: {}\n", mode.label());
    for row in view.rows(&account, tz) {
        let marker = match row.sign {
            Sign::Credit => "+",
            Sign::Debit => "-",
        };
        println!("{} {} - {}  {}", marker, row.date, row.label, row.amount);
    }
    Ok(())
}

/// Values given on the command line, used instead of prompting.
pub type Presets = BTreeMap<Field, String>;

pub async fn pay(cfg: &Config, subtype: Subtype, code: Option<String>) -> Result<()> {
    let client = Client::resume(cfg)?;
    let runner = FlowRunner::new(FlowKind::Payment, client.api.clone(), client.session.clone(), TerminalNavigator);
    if let Err(e) = runner.select_subtype(subtype) {
        print_alert(&e);
        return Ok(());
    }
    let mut presets = Presets::new();
    if let Some(code) = code {
        presets.insert(Field::BoletoCode, code);
    }
    let result = run_form(&runner, &client.session, presets).await;
    runner.dispose();
    result
}

pub async fn transfer(cfg: &Config, presets: Presets) -> Result<()> {
    let client = Client::resume(cfg)?;
    println!("\n== Transferir valores ==");
    let runner = FlowRunner::new(FlowKind::Transfer, client.api.clone(), client.session.clone(), TerminalNavigator);
    let result = run_form(&runner, &client.session, presets).await;
    runner.dispose();
    result
}

async fn run_form(runner: &FlowRunner<TerminalNavigator>, session: &Session, mut presets: Presets) -> Result<()> {
    let Some(mut schema) = resolve_identifier(runner, &mut presets).await? else {
        return Ok(());
    };
    print_boleto(runner);

    let identifying = schema.identifying_field();
    let details: Vec<Field> = schema.fields().iter().copied().filter(|f| *f != identifying).collect();
    if !ask_fields(runner, &details, &mut presets)? {
        return Ok(());
    }

    loop {
        match runner.submit().await {
            Ok(Submitted::Completed { message, refresh_error }) => {
                println!("{}", message);
                match (refresh_error, session.account()) {
                    (Some(e), _) => {
                        warn!(error = %e, "balance not refreshed");
                        println!("Não foi possível atualizar o saldo.");
                    }
                    (None, Some(account)) => println!("Saldo em conta: {}", format_brl(account.balance)),
                    (None, None) => {}
                }
                return Ok(());
            }
            Ok(Submitted::Ignored | Submitted::Abandoned) => {
                println!("Nenhuma operação enviada.");
                return Ok(());
            }
            Err(WorkflowError::Validation(errors)) => {
                let mut flagged = Vec::new();
                for (field, message) in errors.iter() {
                    println!("{}: {}", field.placeholder(), message);
                    flagged.push(field);
                }
                // A new identifier needs a fresh lookup, which may show other fields.
                let mut next = schema;
                if flagged.contains(&identifying) {
                    let Some(resolved) = resolve_identifier(runner, &mut presets).await? else {
                        return Ok(());
                    };
                    print_boleto(runner);
                    next = resolved;
                }
                let pending = fields_to_reask(&flagged, schema, next);
                schema = next;
                if !ask_fields(runner, &pending, &mut presets)? {
                    return Ok(());
                }
            }
            Err(e) => {
                print_alert(&e);
                return Ok(());
            }
        }
    }
}

/// Fields to ask again after a rejected submit: the flagged ones plus any the
/// fresh lookup revealed, never the identifying field.
fn fields_to_reask(flagged: &[Field], before: FieldSchema, after: FieldSchema) -> Vec<Field> {
    let identifying = after.identifying_field();
    after
        .fields()
        .iter()
        .copied()
        .filter(|f| *f != identifying && (flagged.contains(f) || !before.shows(*f)))
        .collect()
}

/// Ask each field in order; `false` when the user gives up with an empty answer.
fn ask_fields(runner: &FlowRunner<TerminalNavigator>, fields: &[Field], presets: &mut Presets) -> Result<bool> {
    for &field in fields {
        let Some(value) = ask(field, presets)? else {
            return Ok(false);
        };
        runner.edit(field, value);
    }
    Ok(true)
}

fn print_boleto(runner: &FlowRunner<TerminalNavigator>) {
    if let Some(boleto) = &runner.snapshot().boleto {
        for line in boleto.summary() {
            println!("{}", line);
        }
    }
}

/// Prompt for the identifying field until its lookup opens the authorization step.
/// `None` when the user gives up with an empty answer.
async fn resolve_identifier(
    runner: &FlowRunner<TerminalNavigator>,
    presets: &mut Presets,
) -> Result<Option<FieldSchema>> {
    let Some(field) = runner.snapshot().fields.first().copied() else {
        return Ok(None);
    };
    loop {
        let Some(value) = ask(field, presets)? else {
            return Ok(None);
        };
        runner.edit(field, value);
        match runner.commit_field(field).await {
            Ok(LookupOutcome::Applied(schema)) if schema.accepts_authorization() => return Ok(Some(schema)),
            Ok(_) => {
                if let Some(alert) = runner.snapshot().alert {
                    println!("{}", alert);
                }
            }
            Err(e) => print_alert(&e),
        }
    }
}

fn ask(field: Field, presets: &mut Presets) -> Result<Option<String>> {
    if let Some(value) = presets.remove(&field) {
        return Ok(Some(value));
    }
    let value = if field.is_secret() {
        prompt_secret(field.placeholder())?
    } else {
        prompt(field.placeholder())?
    };
    Ok((!value.trim().is_empty()).then_some(value))
}

fn print_alert(e: &WorkflowError) {
    if let Some(alert) = e.alert() {
        println!("{}", alert);
    }
}
