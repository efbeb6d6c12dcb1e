//! Pre-submission inquiries that decide which fields a form needs.

use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::account::AccountContext;
use crate::api::BankApi;
use crate::error::LookupError;
use crate::statement::format_brl;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BoletoDetails {
    pub beneficiary: String,
    pub amount: Decimal,
    pub due_date: NaiveDate,
}

impl BoletoDetails {
    /// Lines shown above the authorization field.
    pub fn summary(&self) -> Vec<String> {
        use chrono::Datelike;
        vec![
            format!("Nome do beneficiário: {}", self.beneficiary),
            format!("Valor do pagamento: {}", format_brl(self.amount)),
            format!(
                "Data de vencimento: {}/{}/{}",
                self.due_date.day(),
                self.due_date.month(),
                self.due_date.year()
            ),
        ]
    }
}

/// What is being looked up, keyed by the identifying field's committed value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inquiry {
    Boleto { code: String },
    Payee { document: String },
}

impl Inquiry {
    pub fn identifier(&self) -> &str {
        match self {
            Inquiry::Boleto { code } => code,
            Inquiry::Payee { document } => document,
        }
    }
}

/// Answer to an inquiry. Negative answers are valid results, not errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupResult {
    /// `None` when the bank does not know the boleto.
    Boleto(Option<BoletoDetails>),
    Payee { registered: bool },
}

impl LookupResult {
    pub fn boleto(&self) -> Option<&BoletoDetails> {
        match self {
            LookupResult::Boleto(details) => details.as_ref(),
            LookupResult::Payee { .. } => None,
        }
    }
}

/// Runs inquiries against the bank on behalf of a form.
#[derive(Clone)]
pub struct LookupGate {
    api: Arc<dyn BankApi>,
}

impl LookupGate {
    pub fn new(api: Arc<dyn BankApi>) -> Self {
        Self { api }
    }

    pub async fn inquire(&self, inquiry: &Inquiry, ctx: &AccountContext) -> Result<LookupResult, LookupError> {
        debug!(holder = %ctx.holder_id, ?inquiry, "lookup started");
        let result = match inquiry {
            Inquiry::Boleto { code } => self.api.lookup_boleto(ctx, code).await.map(LookupResult::Boleto),
            Inquiry::Payee { document } => self
                .api
                .check_payee_registered(ctx, document)
                .await
                .map(|registered| LookupResult::Payee { registered }),
        };
        match result {
            Ok(found) => {
                debug!(holder = %ctx.holder_id, ?found, "lookup answered");
                Ok(found)
            }
            Err(e) => {
                warn!(holder = %ctx.holder_id, error = %e, "lookup failed");
                Err(LookupError::Api(e))
            }
        }
    }
}
