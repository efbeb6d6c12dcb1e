//! Payloads for a single submit attempt.

use std::fmt;

use rust_decimal::Decimal;

use crate::schema::FormValues;

/// Authorization secret typed by the user. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoletoPayment {
    pub code: String,
    pub secret: Secret,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalTransfer {
    pub document: String,
    pub amount: Decimal,
    pub secret: Secret,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationRequest {
    PayBoleto(BoletoPayment),
    LocalTransfer(LocalTransfer),
}

impl MutationRequest {
    pub fn name(&self) -> &'static str {
        match self {
            MutationRequest::PayBoleto(_) => "pay_boleto",
            MutationRequest::LocalTransfer(_) => "transfer_local",
        }
    }
}

/// One submit attempt: the collected values (secrets removed) and the
/// authorized request built from them. Dropped once the attempt settles.
#[derive(Debug, Clone)]
pub struct FormSubmission {
    pub fields: FormValues,
    pub request: MutationRequest,
}
