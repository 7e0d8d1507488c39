//! page entry points
//!
//! the host application calls exactly one initialiser per page load.

use crate::aggregator::{Dashboard, ReferralAggregator};
use crate::context::ClientContext;
use crate::error::{ClientError, Result};
use crate::registry::ProviderRecord;
use crate::types::Address;
use crate::ui::{Notice, Page};
use std::sync::Arc;
use tracing::{info, warn};

impl ClientContext {
    /// wallet selection page: list wallets as they announce
    pub fn init_wallet_select(&self) {
        self.install_wallet_listener();
    }

    /// session page: re-acquire the selected wallet
    pub async fn init_session_page(self: &Arc<Self>) -> Option<ProviderRecord> {
        self.restore_page().await
    }

    /// register page: re-acquire the selected wallet
    pub async fn init_register_page(self: &Arc<Self>) -> Option<ProviderRecord> {
        self.restore_page().await
    }

    /// dashboard page: restore the login and aggregate the referral data
    pub async fn init_dashboard_page(self: &Arc<Self>) -> Result<Dashboard> {
        self.restore_page().await;

        let account = match self.restore_login() {
            Ok(Some(account)) => account,
            Ok(None) => {
                self.notify(Notice::error("User is not logged in."));
                self.presenter.redirect(Page::WalletSelect);
                return Err(ClientError::SessionInvalidated);
            }
            Err(e) => {
                self.report("restore login", &e);
                return Err(e);
            }
        };

        match self.load_dashboard(&account).await {
            Ok(dashboard) => {
                self.presenter.show_dashboard(&dashboard);
                if let Some(partial) = dashboard.partial() {
                    warn!("{}", partial);
                    self.notify(Notice::warning(partial.user_message()));
                }
                Ok(dashboard)
            }
            Err(e) => {
                self.report("dashboard", &e);
                Err(e)
            }
        }
    }

    /// aggregate the dashboard of `account`
    pub async fn load_dashboard(&self, account: &Address) -> Result<Dashboard> {
        let handle = self.reader().await?.with_from(*account);
        let aggregator = ReferralAggregator::new(
            handle,
            self.config.max_concurrent_lookups,
            self.config.referral_base_url.clone(),
        );
        Ok(aggregator.load(account).await)
    }

    async fn restore_page(self: &Arc<Self>) -> Option<ProviderRecord> {
        let record = match self.restore_wallet().await {
            Ok(record) => record,
            Err(e) => {
                warn!("wallet restore failed: {}", e);
                None
            }
        };
        match self.session.take_reconnected() {
            Ok(true) => info!("wallet reconnected successfully"),
            Ok(false) => {}
            Err(e) => warn!("reading reconnect flag: {}", e),
        }
        record
    }
}
