//! Statement display: filtering by direction and most-recent-first ordering.
//!
//! The account's transaction list is never reordered in place. Every view is
//! built from borrowed references, filtered first and reversed second.

use chrono_tz::Tz;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::account::Account;
use crate::error::StatementError;
use crate::transaction::{Sign, Transaction};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StatementFilter {
    #[default]
    All,
    Credits,
    Debits,
}

impl StatementFilter {
    pub fn admits(self, sign: Sign) -> bool {
        match self {
            StatementFilter::All => true,
            StatementFilter::Credits => sign == Sign::Credit,
            StatementFilter::Debits => sign == Sign::Debit,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            StatementFilter::All => "Todos",
            StatementFilter::Credits => "Entradas",
            StatementFilter::Debits => "Saídas",
        }
    }
}

/// Transactions admitted by `mode`, in source order.
pub fn filter(transactions: &[Transaction], mode: StatementFilter) -> Vec<&Transaction> {
    transactions
        .iter()
        .filter(|t| mode.admits(t.sign()))
        .collect()
}

/// Transactions admitted by `mode`, most recent first.
pub fn display_order(transactions: &[Transaction], mode: StatementFilter) -> Vec<&Transaction> {
    let mut view = filter(transactions, mode);
    view.reverse();
    view
}

/// `R$ 1234.50`
pub fn format_brl(amount: Decimal) -> String {
    let cents = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    format!("R$ {:.2}", cents)
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AccountKind {
    Checking,
    Savings,
    Investment,
}

impl AccountKind {
    pub fn label(self) -> &'static str {
        match self {
            AccountKind::Checking => "Conta Corrente",
            AccountKind::Savings => "Poupança",
            AccountKind::Investment => "Investimento",
        }
    }

    pub fn is_available(self) -> bool {
        matches!(self, AccountKind::Checking)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementOpened {
    pub title: String,
    /// Shown once when the chosen account has nothing to list.
    pub notice: Option<&'static str>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementRow {
    pub id: u64,
    /// Day/month in the display time zone.
    pub date: String,
    pub label: &'static str,
    pub amount: String,
    pub sign: Sign,
}

/// Selection state of the statement screen.
#[derive(Debug, Clone, Default)]
pub struct StatementView {
    account: Option<AccountKind>,
    filter: StatementFilter,
}

impl StatementView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn account_kind(&self) -> Option<AccountKind> {
        self.account
    }

    pub fn filter_mode(&self) -> StatementFilter {
        self.filter
    }

    pub fn select_account(
        &mut self,
        kind: AccountKind,
        account: &Account,
    ) -> Result<StatementOpened, StatementError> {
        if !kind.is_available() {
            return Err(StatementError::UnderConstruction(kind));
        }
        self.account = Some(kind);
        let notice = (!account.has_transactions()).then_some("Não há transações realizadas.");
        Ok(StatementOpened {
            title: format!("Extrato {}", kind.label()),
            notice,
        })
    }

    pub fn set_filter(&mut self, mode: StatementFilter) {
        self.filter = mode;
    }

    /// Rows for the selected account; empty until an account is chosen.
    pub fn rows(&self, account: &Account, tz: Tz) -> Vec<StatementRow> {
        if self.account.is_none() {
            return Vec::new();
        }
        display_order(&account.transactions, self.filter)
            .into_iter()
            .map(|t| StatementRow {
                id: t.id,
                date: t.timestamp.with_timezone(&tz).format("%-d/%-m").to_string(),
                label: t.label(),
                amount: format_brl(t.amount),
                sign: t.sign(),
            })
            .collect()
    }
}
