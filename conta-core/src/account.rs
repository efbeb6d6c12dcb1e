//! Checking account snapshot as held by the client.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::statement::format_brl;
use crate::transaction::Transaction;

/// Identity of the account holder ("correntista") on the bank side.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct HolderId(pub u64);

impl fmt::Display for HolderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity passed with every lookup, submission and refresh.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccountContext {
    pub holder_id: HolderId,
}

impl AccountContext {
    pub fn new(holder_id: u64) -> Self {
        Self {
            holder_id: HolderId(holder_id),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Holder {
    pub id: HolderId,
    pub name: String,
}

/// Cached copy of the server-side account. Replaced wholesale on refresh.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Account {
    pub balance: Decimal,
    pub holder: Holder,
    /// Chronological ascending, as received.
    pub transactions: Vec<Transaction>,
}

impl Account {
    pub fn context(&self) -> AccountContext {
        AccountContext {
            holder_id: self.holder.id,
        }
    }

    pub fn balance_label(&self) -> String {
        format_brl(self.balance)
    }

    pub fn has_transactions(&self) -> bool {
        !self.transactions.is_empty()
    }
}
