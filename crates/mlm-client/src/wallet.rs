//! wallet selection, connect and restore

use crate::context::ClientContext;
use crate::error::{ClientError, Result};
use crate::provider;
use crate::registry::{wallet_logo, ProviderRecord};
use crate::types::Address;
use crate::ui::{Notice, Page};
use std::sync::Arc;
use tracing::{info, warn};

impl ClientContext {
    /// list announced wallets on the presenter as they arrive
    pub fn install_wallet_listener(&self) {
        let presenter = self.presenter.clone();
        self.registry.register_handler(move |record: &ProviderRecord| {
            presenter.show_wallet(&record.info, wallet_logo(&record.info.name));
        });
        self.registry.request_announcements();
    }

    /// remember the wallet the user picked
    pub fn select_wallet(&self, uuid: &str) -> Result<ProviderRecord> {
        let record = self.registry.find_by_uuid(uuid).ok_or(ClientError::NoProvider)?;
        self.session.set_selected_wallet(&record.info.rdns)?;
        *self.selected.write() = Some(record.clone());
        info!("selected wallet {} ({})", record.info.name, record.info.rdns);
        self.notify(Notice::info(format!("Selected: {}", record.info.name)));
        Ok(record)
    }

    /// request accounts from the selected wallet and move on to the session page
    pub async fn connect_wallet(self: &Arc<Self>) -> Result<Vec<Address>> {
        let result = self.try_connect().await;
        match &result {
            Ok(accounts) => {
                let name = self
                    .selected_provider()
                    .map(|r| r.info.name)
                    .unwrap_or_default();
                info!("connected to {} with {} accounts", name, accounts.len());
                self.notify(Notice::success(format!("Connected to {name}")));
                tokio::time::sleep(self.config.redirect_delay()).await;
                self.presenter.redirect(Page::Session);
            }
            Err(e) => self.report("wallet connect", e),
        }
        result
    }

    async fn try_connect(self: &Arc<Self>) -> Result<Vec<Address>> {
        let wallet = self.require_wallet()?;
        let accounts = provider::request_accounts(wallet.as_ref()).await?;
        if accounts.is_empty() {
            return Err(ClientError::NoAccounts);
        }
        self.watch_provider(wallet);
        Ok(accounts)
    }

    /// re-acquire the wallet stored at selection time
    ///
    /// returns `None` when nothing was stored.
    pub async fn restore_wallet(self: &Arc<Self>) -> Result<Option<ProviderRecord>> {
        let Some(rdns) = self.session.selected_wallet()? else {
            return Ok(None);
        };
        let record = self
            .registry
            .wait_for(Some(&rdns), self.config.wallet_timeout())
            .await
            .inspect_err(|e| warn!("stored wallet {} not found: {}", rdns, e))?;

        *self.selected.write() = Some(record.clone());
        self.session.mark_reconnected()?;
        self.watch_provider(record.handle.clone());
        info!("reconnected to {}", record.info.name);
        Ok(Some(record))
    }

    /// forget the selected wallet
    pub fn reset_selection(&self) {
        *self.selected.write() = None;
        if let Err(e) = self.session.clear_selection() {
            warn!("failed to clear wallet selection: {}", e);
        }
    }
}
