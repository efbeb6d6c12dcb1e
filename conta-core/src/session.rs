//! Process-wide authenticated session: who is signed in and the cached account.

use std::sync::{PoisonError, RwLock};

use tracing::{info, warn};

use crate::account::{Account, AccountContext};

#[derive(Debug, Default)]
struct SessionState {
    context: Option<AccountContext>,
    account: Option<Account>,
}

/// Owns the account store. Forms read the context from here and only ever
/// ask `AccountStateSync` to replace the cached account.
#[derive(Debug, Default)]
pub struct Session {
    state: RwLock<SessionState>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a session for `ctx`. Any previously cached account is dropped.
    pub fn sign_in(&self, ctx: AccountContext) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        info!(holder = %ctx.holder_id, "signed in");
        state.context = Some(ctx);
        state.account = None;
    }

    pub fn sign_out(&self) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(ctx) = state.context.take() {
            info!(holder = %ctx.holder_id, "signed out");
        }
        state.account = None;
    }

    pub fn current_account_context(&self) -> Option<AccountContext> {
        self.state.read().unwrap_or_else(PoisonError::into_inner).context
    }

    /// Snapshot of the cached account.
    pub fn account(&self) -> Option<Account> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .account
            .clone()
    }

    /// Replace the cached account wholesale. Ignored when the session moved on
    /// to another holder (or signed out) while the refresh was in flight.
    pub(crate) fn store_account(&self, ctx: &AccountContext, account: Account) -> bool {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if state.context.as_ref() != Some(ctx) {
            warn!(holder = %ctx.holder_id, "dropping account refresh for an inactive session");
            return false;
        }
        state.account = Some(account);
        true
    }
}
