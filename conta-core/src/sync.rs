//! Reconciles the cached account with the bank after a confirmed mutation.

use std::sync::Arc;

use tracing::info;

use crate::account::{Account, AccountContext};
use crate::api::BankApi;
use crate::error::SyncError;
use crate::session::Session;

#[derive(Clone)]
pub struct AccountStateSync {
    api: Arc<dyn BankApi>,
    session: Arc<Session>,
}

impl AccountStateSync {
    pub fn new(api: Arc<dyn BankApi>, session: Arc<Session>) -> Self {
        Self { api, session }
    }

    /// Fetch balance and transactions and replace the cached copy wholesale.
    /// Fails with `InactiveSession` when `ctx` is no longer the signed-in holder.
    pub async fn refresh(&self, ctx: &AccountContext) -> Result<Account, SyncError> {
        let account = self.api.refresh_account(ctx).await?;
        if !self.session.store_account(ctx, account.clone()) {
            return Err(SyncError::InactiveSession);
        }
        info!(
            holder = %ctx.holder_id,
            transactions = account.transactions.len(),
            "account refreshed"
        );
        Ok(account)
    }

    /// Refresh whoever is currently signed in.
    pub async fn refresh_session(&self) -> Result<Account, SyncError> {
        let ctx = self.session.current_account_context().ok_or(SyncError::NoSession)?;
        self.refresh(&ctx).await
    }
}
