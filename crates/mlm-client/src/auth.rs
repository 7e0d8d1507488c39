//! authentication flow
//!
//! ```text
//! Idle -> NetworkChecking -> AccountRequesting -> Confirming -> Verifying
//!                                                                 |-> Authenticated
//!                                                                 `-> Rejected
//! ```
//!
//! any state returns to `Idle` on logout.

use crate::context::ClientContext;
use crate::contract::UserRecord;
use crate::error::{ClientError, Result};
use crate::provider::{self, WalletProvider};
use crate::types::Address;
use crate::ui::{Notice, Page, Prompt};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RejectReason {
    NoProvider,
    WrongNetwork,
    NoAccount,
    Denied,
    NotRegistered,
    VerificationError,
    SessionInvalidated,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RejectReason::NoProvider => "no wallet",
            RejectReason::WrongNetwork => "wrong network",
            RejectReason::NoAccount => "no account",
            RejectReason::Denied => "denied",
            RejectReason::NotRegistered => "not registered",
            RejectReason::VerificationError => "verification error",
            RejectReason::SessionInvalidated => "session invalidated",
        };
        f.write_str(s)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum AuthState {
    #[default]
    Idle,
    NetworkChecking,
    AccountRequesting,
    Confirming,
    Verifying,
    Authenticated { account: Address },
    Rejected { reason: RejectReason },
}

type Step<T> = std::result::Result<T, (RejectReason, ClientError)>;

impl ClientContext {
    pub fn is_authenticated(&self) -> bool {
        matches!(self.auth_state(), AuthState::Authenticated { .. })
    }

    /// log in with the selected wallet
    ///
    /// the account is persisted before the redirect to the dashboard.
    pub async fn login(&self) -> Result<Address> {
        let generation = self.generation();
        self.presenter.set_busy(true);

        let result = self.try_login(generation).await;
        self.set_committing(None);
        match result {
            Ok(account) => {
                info!("logged in as {}", account);
                self.notify(Notice::success(format!("Logged in using address: {account}")));
                tokio::time::sleep(self.config.redirect_delay()).await;
                if self.generation() == generation {
                    self.presenter.redirect(Page::Dashboard);
                }
                Ok(account)
            }
            Err((reason, err)) => {
                self.reject(reason, &err);
                Err(err)
            }
        }
    }

    async fn try_login(&self, generation: u64) -> Step<Address> {
        self.set_auth_state(AuthState::NetworkChecking);
        let wallet = self
            .require_wallet()
            .map_err(|e| (RejectReason::NoProvider, e))?;
        self.guard
            .ensure_compliant(wallet.as_ref())
            .await
            .map_err(|e| (RejectReason::WrongNetwork, e))?;

        self.set_auth_state(AuthState::AccountRequesting);
        let accounts = provider::request_accounts(wallet.as_ref())
            .await
            .map_err(|e| match e {
                ClientError::UserRejected => (RejectReason::Denied, e),
                other => (RejectReason::NoAccount, other),
            })?;
        let account = *accounts
            .first()
            .ok_or((RejectReason::NoAccount, ClientError::NoAccounts))?;
        self.set_committing(Some(account));

        self.set_auth_state(AuthState::Confirming);
        let prompt = Prompt::new(
            "Confirmation",
            format!("Do you want to login with {account}?"),
        );
        if !self.presenter.confirm(&prompt).await {
            return Err((RejectReason::Denied, ClientError::Denied));
        }
        if self.generation() != generation {
            return Err((RejectReason::SessionInvalidated, ClientError::SessionInvalidated));
        }

        self.set_auth_state(AuthState::Verifying);
        let record = self
            .lookup_user(wallet, &account)
            .await
            .map_err(|e| (RejectReason::VerificationError, e))?;
        if !record.is_exist {
            return Err((RejectReason::NotRegistered, ClientError::NotRegistered));
        }

        if self.generation() != generation {
            return Err((RejectReason::SessionInvalidated, ClientError::SessionInvalidated));
        }
        self.session
            .set_current_account(&account)
            .map_err(|e| (RejectReason::VerificationError, e))?;
        *self.account.write() = Some(account);
        self.set_auth_state(AuthState::Authenticated { account });
        Ok(account)
    }

    fn reject(&self, reason: RejectReason, err: &ClientError) {
        warn!("login rejected ({}): {}", reason, err);
        self.set_auth_state(AuthState::Rejected { reason });
        self.presenter.set_busy(false);
        self.notify(Notice::error(err.user_message()));
    }

    /// clear all persisted session data and return to wallet selection
    ///
    /// safe to call in any state, including when already logged out.
    pub fn logout(&self) {
        self.invalidate();
        if let Err(e) = self.session.clear() {
            warn!("failed to clear session store: {}", e);
        }
        *self.account.write() = None;
        *self.selected.write() = None;
        *self.pending_referrer.write() = None;
        self.set_auth_state(AuthState::Idle);
        info!("logged out");
        self.notify(Notice::error("Logged Out. Redirecting to Log in Page..."));
        self.presenter.redirect(Page::WalletSelect);
    }

    /// session-page "register" action: only unregistered wallets proceed
    pub async fn open_registration(&self) -> Result<bool> {
        match self.wallet_registered().await {
            Ok(true) => {
                self.notify(Notice::info("Already a registered user"));
                Ok(false)
            }
            Ok(false) => {
                tokio::time::sleep(self.config.redirect_delay()).await;
                self.presenter.redirect(Page::Register);
                Ok(true)
            }
            Err(e) => {
                self.report("open registration", &e);
                Err(e)
            }
        }
    }

    async fn lookup_user(&self, wallet: Arc<dyn WalletProvider>, account: &Address) -> Result<UserRecord> {
        let handle = self.gateway.signed(Some(wallet)).await?;
        handle.with_from(*account).users(account).await
    }

    async fn wallet_registered(&self) -> Result<bool> {
        let wallet = self.require_wallet()?;
        let accounts = provider::request_accounts(wallet.as_ref()).await?;
        match accounts.first() {
            Some(account) => Ok(self.lookup_user(wallet, account).await?.is_exist),
            None => Ok(false),
        }
    }

    /// adopt the account persisted by an earlier login
    pub fn restore_login(&self) -> Result<Option<Address>> {
        let account = self.session.current_account()?;
        if let Some(account) = account {
            debug!("restored session for {}", account);
            *self.account.write() = Some(account);
            self.set_auth_state(AuthState::Authenticated { account });
        }
        Ok(account)
    }
}
