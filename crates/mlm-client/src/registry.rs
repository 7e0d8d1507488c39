//! wallet provider discovery (EIP-6963)
//!
//! wallets announce themselves in any order and at any time. announcements
//! that arrive before a consumer is installed are queued and drained in
//! arrival order once it registers.

use crate::error::{ClientError, Result};
use crate::provider::WalletProvider;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, oneshot};
use tracing::{debug, info};

/// logo shown for wallets missing from the table
pub const FALLBACK_LOGO: &str = "./notfound.svg";

const LOGOS: &[(&str, &str)] = &[
    ("MetaMask", "https://upload.wikimedia.org/wikipedia/commons/3/36/MetaMask_Fox.svg"),
    ("Coinbase Wallet", "https://upload.wikimedia.org/wikipedia/commons/2/29/Coinbase_logo.svg"),
    ("Trust Wallet", "https://trustwallet.com/assets/images/media/assets/TWT.png"),
    ("Rabby Wallet", "https://www.rabby.io/img/logo.svg"),
    ("Zerion", "https://assets.coingecko.com/coins/images/8929/small/zerion.png?1678448795"),
    ("Enkrypt", "https://enkrypt.com/_nuxt/img/Enkrypt-logo-header.c41428b.png"),
    ("XDEFI Wallet", "https://www.xdefi.io/images/XDEFI-logo.svg"),
    ("Bitget Wallet", "https://www.bitget.com/favicon.ico"),
    ("Atomic Wallet", "https://atomicwallet.io/static/img/atomicwallet_logo_gradient.svg"),
    ("Brave Wallet", "https://brave.com/static-assets/images/brave-wallet/brave-wallet-icon.svg"),
    ("Opera Wallet", "https://www-static-dev.opera.com/static/images/favicons/favicon-32x32.512994d24a74.png"),
    ("MathWallet", "https://www.mathwallet.org/favicon.png"),
    ("Rainbow Wallet", "https://rainbow.me/assets/logo.svg"),
    ("Phantom Wallet", "https://phantom.app/img/phantom-logo.svg"),
];

/// logo url for a wallet display name
pub fn wallet_logo(name: &str) -> &'static str {
    LOGOS
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, url)| *url)
        .unwrap_or(FALLBACK_LOGO)
}

/// announced wallet metadata
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderInfo {
    pub uuid: String,
    pub name: String,
    pub icon: String,
    /// reverse-dns id, the persisted selection key
    pub rdns: String,
}

/// announced wallet with its live handle
#[derive(Clone)]
pub struct ProviderRecord {
    pub info: ProviderInfo,
    pub handle: Arc<dyn WalletProvider>,
}

impl ProviderRecord {
    pub fn new(info: ProviderInfo, handle: Arc<dyn WalletProvider>) -> Self {
        Self { info, handle }
    }
}

impl fmt::Debug for ProviderRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderRecord").field("info", &self.info).finish_non_exhaustive()
    }
}

type Listener = Box<dyn FnMut(&ProviderRecord) + Send>;

#[derive(Default)]
struct Inner {
    seen: HashSet<String>,
    records: Vec<ProviderRecord>,
    pending: VecDeque<ProviderRecord>,
    listener: Option<Listener>,
    waiters: Vec<(Option<String>, oneshot::Sender<ProviderRecord>)>,
}

/// deduplicating provider registry
#[derive(Clone)]
pub struct ProviderRegistry {
    inner: Arc<Mutex<Inner>>,
    requests: broadcast::Sender<()>,
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ProviderRegistry {
    pub fn new() -> Self {
        let (requests, _) = broadcast::channel(16);
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
            requests,
        }
    }

    /// record an announcement; false when the uuid was already seen
    pub fn announce(&self, record: ProviderRecord) -> bool {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        if !inner.seen.insert(record.info.uuid.clone()) {
            debug!("duplicate announcement from {}", record.info.uuid);
            return false;
        }
        info!("wallet announced: {} ({})", record.info.name, record.info.rdns);
        inner.records.push(record.clone());

        for (want, tx) in std::mem::take(&mut inner.waiters) {
            let matches = want.as_deref().map_or(true, |rdns| rdns == record.info.rdns);
            if matches {
                let _ = tx.send(record.clone());
            } else if !tx.is_closed() {
                inner.waiters.push((want, tx));
            }
        }

        match inner.listener.as_mut() {
            Some(listener) => listener(&record),
            None => inner.pending.push_back(record),
        }
        true
    }

    /// install the consumer and drain queued announcements in order
    ///
    /// the listener runs under the registry lock and must not call back into
    /// the registry.
    pub fn register_handler<F>(&self, listener: F)
    where
        F: FnMut(&ProviderRecord) + Send + 'static,
    {
        let mut listener: Listener = Box::new(listener);
        let mut inner = self.inner.lock();
        while let Some(record) = inner.pending.pop_front() {
            listener(&record);
        }
        inner.listener = Some(listener);
    }

    /// broadcast a discovery request; returns the number of wallets listening
    pub fn request_announcements(&self) -> usize {
        let listening = self.requests.send(()).unwrap_or(0);
        debug!("discovery request sent to {} wallets", listening);
        listening
    }

    /// discovery requests, for wallets to answer with `announce`
    pub fn discovery_requests(&self) -> broadcast::Receiver<()> {
        self.requests.subscribe()
    }

    /// resolve once a wallet with `rdns` (any wallet when `None`) is announced
    pub async fn wait_for(&self, rdns: Option<&str>, timeout: Duration) -> Result<ProviderRecord> {
        let rx = {
            let mut inner = self.inner.lock();
            if let Some(found) = inner
                .records
                .iter()
                .find(|r| rdns.map_or(true, |want| r.info.rdns == want))
            {
                return Ok(found.clone());
            }
            let (tx, rx) = oneshot::channel();
            inner.waiters.retain(|(_, waiter)| !waiter.is_closed());
            inner.waiters.push((rdns.map(str::to_string), tx));
            rx
        };
        self.request_announcements();

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(record)) => Ok(record),
            _ => Err(ClientError::WalletTimeout),
        }
    }

    /// request announcements, wait the bound, return everything seen
    pub async fn discover(&self, timeout: Duration) -> Result<Vec<ProviderRecord>> {
        self.request_announcements();
        tokio::time::sleep(timeout).await;
        let records = self.records();
        if records.is_empty() {
            return Err(ClientError::NoProvider);
        }
        Ok(records)
    }

    pub fn records(&self) -> Vec<ProviderRecord> {
        self.inner.lock().records.clone()
    }

    pub fn find_by_uuid(&self, uuid: &str) -> Option<ProviderRecord> {
        self.inner.lock().records.iter().find(|r| r.info.uuid == uuid).cloned()
    }

    pub fn find_by_rdns(&self, rdns: &str) -> Option<ProviderRecord> {
        self.inner.lock().records.iter().find(|r| r.info.rdns == rdns).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_timed_out_waiters_are_dropped() {
        let registry = ProviderRegistry::new();
        for _ in 0..5 {
            let err = registry
                .wait_for(Some("io.metamask"), Duration::from_millis(100))
                .await
                .unwrap_err();
            assert_eq!(err, ClientError::WalletTimeout);
        }
        assert_eq!(registry.inner.lock().waiters.len(), 1);
    }

    #[test]
    fn test_wallet_logo() {
        assert_eq!(wallet_logo("Rabby Wallet"), "https://www.rabby.io/img/logo.svg");
        assert_eq!(wallet_logo("Unknown Wallet"), FALLBACK_LOGO);
    }
}
