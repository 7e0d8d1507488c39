//! network guard: chain id policy and switch requests

use crate::config::ChainPolicy;
use crate::error::{ClientError, Result, UNRECOGNIZED_CHAIN, USER_REJECTED};
use crate::provider::{self, WalletProvider};
use serde_json::json;
use tracing::{info, warn};

#[derive(Clone, Debug, Default)]
pub struct NetworkGuard {
    policy: ChainPolicy,
}

impl NetworkGuard {
    pub fn new(policy: ChainPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &ChainPolicy {
        &self.policy
    }

    /// raw chain id query
    pub async fn chain_status(&self, provider: &dyn WalletProvider) -> Result<u64> {
        provider::chain_id(provider).await
    }

    /// true iff the wallet sits on a permitted chain; query failures count as foreign
    pub async fn check_chain_id(&self, provider: &dyn WalletProvider) -> bool {
        match self.chain_status(provider).await {
            Ok(id) => {
                let ok = self.policy.is_permitted(id);
                if !ok {
                    warn!("wallet on chain {}, permitted {:?}", id, self.policy.permitted);
                }
                ok
            }
            Err(e) => {
                warn!("chain id query failed: {}", e);
                false
            }
        }
    }

    pub async fn ensure_compliant(&self, provider: &dyn WalletProvider) -> Result<u64> {
        let id = self.chain_status(provider).await?;
        if self.policy.is_permitted(id) {
            Ok(id)
        } else {
            Err(ClientError::WrongNetwork(id))
        }
    }

    /// ask the wallet to move to the target chain
    pub async fn request_network_switch(&self, provider: &dyn WalletProvider) -> Result<()> {
        let target = self.policy.target;
        let params = json!([{ "chainId": format!("0x{target:x}") }]);
        match provider.request("wallet_switchEthereumChain", params).await {
            Ok(_) => {
                info!("switched wallet to chain {}", target);
                Ok(())
            }
            Err(e) => {
                warn!("network switch to {} failed: {:?}", target, e);
                Err(match e.code {
                    Some(UNRECOGNIZED_CHAIN) => ClientError::SwitchUnknownChain,
                    Some(USER_REJECTED) => ClientError::SwitchRejected,
                    _ => ClientError::SwitchOtherFailure(e.message),
                })
            }
        }
    }
}
