//! wallet capability (EIP-1193)
//!
//! the vendor transport is opaque: a provider answers `request` calls and
//! pushes account/chain/disconnect events to subscribers.

use crate::error::{ClientError, ProviderError, Result};
use crate::types::{narrow, parse_address, parse_quantity, Address};
use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::broadcast;

/// events pushed by a wallet
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProviderEvent {
    AccountsChanged(Vec<Address>),
    ChainChanged(u64),
    Disconnect(Option<String>),
}

/// injected wallet handle
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// raw json-rpc request
    async fn request(&self, method: &str, params: Value) -> std::result::Result<Value, ProviderError>;

    /// subscribe to wallet events
    fn subscribe(&self) -> broadcast::Receiver<ProviderEvent>;
}

/// request an rpc method and translate the failure
pub async fn call(provider: &dyn WalletProvider, method: &str, params: Value) -> Result<Value> {
    provider
        .request(method, params)
        .await
        .map_err(ClientError::from_provider)
}

/// `eth_chainId`
pub async fn chain_id(provider: &dyn WalletProvider) -> Result<u64> {
    let value = call(provider, "eth_chainId", json!([])).await?;
    narrow(parse_quantity(&value)?, "chain id")
}

/// `eth_requestAccounts`
pub async fn request_accounts(provider: &dyn WalletProvider) -> Result<Vec<Address>> {
    let value = call(provider, "eth_requestAccounts", json!([])).await?;
    parse_accounts(&value)
}

pub fn parse_accounts(value: &Value) -> Result<Vec<Address>> {
    let list = value
        .as_array()
        .ok_or_else(|| ClientError::Decode(format!("expected account list, got {value}")))?;
    list.iter()
        .map(|entry| {
            let s = entry
                .as_str()
                .ok_or_else(|| ClientError::Decode(format!("expected address, got {entry}")))?;
            parse_address(s)
        })
        .collect()
}
