//! wallet event handling
//!
//! account and chain changes reported by the wallet can invalidate the
//! session at any point; they are handled here, outside the flows.

use crate::context::ClientContext;
use crate::provider::{ProviderEvent, WalletProvider};
use crate::types::Address;
use crate::ui::{Notice, Prompt};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

impl ClientContext {
    /// forward events of `provider` to [`ClientContext::handle_provider_event`]
    ///
    /// replaces any previous watcher.
    pub fn watch_provider(self: &Arc<Self>, provider: Arc<dyn WalletProvider>) {
        let mut events = provider.subscribe();
        let ctx = Arc::downgrade(self);
        let task = tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => {
                        let Some(ctx) = ctx.upgrade() else { break };
                        ctx.handle_provider_event(event).await;
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("wallet event stream lagged, {} events dropped", skipped);
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            debug!("wallet event watcher stopped");
        });
        if let Some(previous) = self.watcher.lock().replace(task) {
            previous.abort();
        }
    }

    pub async fn handle_provider_event(&self, event: ProviderEvent) {
        match event {
            ProviderEvent::AccountsChanged(accounts) => self.on_accounts_changed(&accounts),
            ProviderEvent::ChainChanged(chain_id) => self.on_chain_changed(chain_id).await,
            ProviderEvent::Disconnect(reason) => {
                info!("wallet disconnected: {:?}", reason);
                self.reset_selection();
            }
        }
    }

    fn on_accounts_changed(&self, accounts: &[Address]) {
        let Some(current) = self.current_account() else {
            self.abort_commit(accounts);
            return;
        };
        match accounts.first() {
            None => {
                warn!("wallet reports no accounts");
                self.notify(Notice::warning("No accounts detected!"));
                self.logout();
            }
            Some(first) if *first != current => {
                warn!("account changed from {} to {}", current, first);
                self.notify(Notice::warning("Logged in account has been changed!"));
                self.logout();
            }
            Some(_) => {}
        }
    }

    /// a running login or registration must not commit an account the
    /// wallet has already left
    fn abort_commit(&self, accounts: &[Address]) {
        let Some(pending) = self.committing_account() else {
            debug!("accounts changed while logged out: {:?}", accounts);
            return;
        };
        if accounts.first() == Some(&pending) {
            return;
        }
        warn!("account changed from {} while a login was in progress", pending);
        self.invalidate();
        self.notify(Notice::warning("Logged in account has been changed!"));
    }

    async fn on_chain_changed(&self, chain_id: u64) {
        if self.guard.policy().is_permitted(chain_id) {
            debug!("wallet moved to permitted chain {}", chain_id);
            return;
        }
        warn!("wallet moved to foreign chain {}", chain_id);

        let prompt = Prompt::new(
            "Inappropriate Network",
            "Switch back to opBNB to stay logged in?",
        );
        if !self.presenter.confirm(&prompt).await {
            self.logout();
            return;
        }

        let Some(wallet) = self.wallet() else {
            self.logout();
            return;
        };
        match self.guard.request_network_switch(wallet.as_ref()).await {
            Ok(()) => self.notify(Notice::success("Switched to opBNB successfully!")),
            Err(e) => {
                warn!("unable to switch back: {}", e);
                self.logout();
            }
        }
    }
}
