//! Collaborator seams: the bank's request/response boundary and the navigator.

use async_trait::async_trait;

use crate::account::{Account, AccountContext};
use crate::error::ApiError;
use crate::lookup::BoletoDetails;
use crate::submission::{BoletoPayment, LocalTransfer};

/// Remote bank operations. Every call is keyed by the holder in `ctx`, which
/// implementations send as request metadata rather than in the body.
#[async_trait]
pub trait BankApi: Send + Sync {
    /// `Ok(None)` when the bank has no such boleto.
    async fn lookup_boleto(&self, ctx: &AccountContext, code: &str) -> Result<Option<BoletoDetails>, ApiError>;

    async fn pay_boleto(&self, ctx: &AccountContext, payment: &BoletoPayment) -> Result<(), ApiError>;

    async fn check_payee_registered(&self, ctx: &AccountContext, document: &str) -> Result<bool, ApiError>;

    async fn transfer_local(&self, ctx: &AccountContext, transfer: &LocalTransfer) -> Result<(), ApiError>;

    async fn refresh_account(&self, ctx: &AccountContext) -> Result<Account, ApiError>;
}

/// Screen-stack collaborator. Only called on transitions.
pub trait Navigator {
    fn go_back(&self);
    fn set_title(&self, title: &str);
}
