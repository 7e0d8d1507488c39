//! shared client context
//!
//! one [`ClientContext`] per page load holds the selected wallet, the
//! authenticated account and the collaborators every flow needs. only the
//! auth flow, wallet selection and provider events mutate it.

use crate::auth::AuthState;
use crate::config::ClientConfig;
use crate::contract::{ContractGateway, ContractHandle, ContractInterface, ExecutionMode};
use crate::error::{ClientError, Result};
use crate::network::NetworkGuard;
use crate::provider::WalletProvider;
use crate::referral::ReferralCode;
use crate::registry::{ProviderRecord, ProviderRegistry};
use crate::session::{Session, SessionStore};
use crate::types::Address;
use crate::ui::{Notice, Presenter};
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::error;

pub struct ClientContext {
    pub(crate) config: ClientConfig,
    pub(crate) registry: ProviderRegistry,
    pub(crate) session: Session,
    pub(crate) gateway: ContractGateway,
    pub(crate) guard: NetworkGuard,
    pub(crate) presenter: Arc<dyn Presenter>,
    pub(crate) selected: RwLock<Option<ProviderRecord>>,
    pub(crate) account: RwLock<Option<Address>>,
    pub(crate) auth_state: RwLock<AuthState>,
    pub(crate) pending_referrer: RwLock<Option<ReferralCode>>,
    /// account a running login or registration is about to commit
    pub(crate) committing: RwLock<Option<Address>>,
    /// bumped on logout; in-flight flows compare before committing
    generation: AtomicU64,
    pub(crate) watcher: Mutex<Option<JoinHandle<()>>>,
}

impl ClientContext {
    pub fn new(
        config: ClientConfig,
        store: Arc<dyn SessionStore>,
        presenter: Arc<dyn Presenter>,
    ) -> Result<Arc<Self>> {
        Self::with_registry(config, store, presenter, ProviderRegistry::new())
    }

    /// context over an existing registry, so announcements can start early
    pub fn with_registry(
        config: ClientConfig,
        store: Arc<dyn SessionStore>,
        presenter: Arc<dyn Presenter>,
        registry: ProviderRegistry,
    ) -> Result<Arc<Self>> {
        config.validate()?;
        let interface = ContractInterface::from_config(&config)?;
        let gateway = ContractGateway::new(&config, interface)?;
        let guard = NetworkGuard::new(config.chain.clone());
        Ok(Arc::new(Self {
            config,
            registry,
            session: Session::new(store),
            gateway,
            guard,
            presenter,
            selected: RwLock::new(None),
            account: RwLock::new(None),
            auth_state: RwLock::new(AuthState::Idle),
            pending_referrer: RwLock::new(None),
            committing: RwLock::new(None),
            generation: AtomicU64::new(0),
            watcher: Mutex::new(None),
        }))
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn guard(&self) -> &NetworkGuard {
        &self.guard
    }

    pub fn gateway(&self) -> &ContractGateway {
        &self.gateway
    }

    pub fn selected_provider(&self) -> Option<ProviderRecord> {
        self.selected.read().clone()
    }

    pub fn wallet(&self) -> Option<Arc<dyn WalletProvider>> {
        self.selected.read().as_ref().map(|r| r.handle.clone())
    }

    pub fn current_account(&self) -> Option<Address> {
        *self.account.read()
    }

    pub fn auth_state(&self) -> AuthState {
        self.auth_state.read().clone()
    }

    pub(crate) fn set_auth_state(&self, state: AuthState) {
        *self.auth_state.write() = state;
    }

    pub fn pending_referrer(&self) -> Option<ReferralCode> {
        self.pending_referrer.read().clone()
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    pub(crate) fn invalidate(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    /// account the running flow will commit, if it got that far
    pub fn committing_account(&self) -> Option<Address> {
        *self.committing.read()
    }

    pub(crate) fn set_committing(&self, account: Option<Address>) {
        *self.committing.write() = account;
    }

    pub(crate) fn require_wallet(&self) -> Result<Arc<dyn WalletProvider>> {
        self.wallet().ok_or(ClientError::NoProvider)
    }

    pub async fn contract_handle(&self, mode: ExecutionMode) -> Result<ContractHandle> {
        self.gateway.contract_handle(mode, self.wallet()).await
    }

    /// signed handle when a wallet is selected, the public endpoint otherwise
    pub async fn reader(&self) -> Result<ContractHandle> {
        match self.wallet() {
            Some(wallet) => self.gateway.signed(Some(wallet)).await,
            None => Ok(self.gateway.read_only()),
        }
    }

    pub(crate) fn notify(&self, notice: Notice) {
        self.presenter.notify(notice);
    }

    /// log a flow failure and surface it in plain language
    pub(crate) fn report(&self, context: &str, err: &ClientError) {
        error!("{}: {}", context, err);
        self.presenter.notify(Notice::error(err.user_message()));
    }
}

impl Drop for ClientContext {
    fn drop(&mut self) {
        if let Some(watcher) = self.watcher.get_mut().take() {
            watcher.abort();
        }
    }
}
