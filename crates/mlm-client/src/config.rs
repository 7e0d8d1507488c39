//! chain policy and client configuration

use crate::error::{ClientError, Result};
use crate::types::{Address, U256};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// opBNB mainnet chain id
pub const OPBNB_MAINNET: u64 = 204;
/// opBNB testnet chain id
pub const OPBNB_TESTNET: u64 = 5611;

/// permitted chain ids and the switch target
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainPolicy {
    /// chains a wallet may be attached to
    pub permitted: Vec<u64>,
    /// chain requested by `wallet_switchEthereumChain`
    pub target: u64,
}

impl ChainPolicy {
    /// production only
    pub fn mainnet() -> Self {
        Self {
            permitted: vec![OPBNB_MAINNET],
            target: OPBNB_MAINNET,
        }
    }

    /// production plus testnet
    pub fn testnet() -> Self {
        Self {
            permitted: vec![OPBNB_MAINNET, OPBNB_TESTNET],
            target: OPBNB_TESTNET,
        }
    }

    pub fn is_permitted(&self, chain_id: u64) -> bool {
        self.permitted.contains(&chain_id)
    }
}

impl Default for ChainPolicy {
    fn default() -> Self {
        Self::testnet()
    }
}

/// client configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// public json-rpc endpoint for read-only access
    pub rpc_endpoint: String,
    /// deployed mlm contract
    pub contract_address: Address,
    /// json abi override, bundled descriptor when unset
    pub abi_path: Option<PathBuf>,
    pub chain: ChainPolicy,
    /// bound on waiting for a stored wallet to re-announce
    pub wallet_timeout_ms: u64,
    /// pause between a state change and the redirect
    pub redirect_delay_ms: u64,
    /// registration value in wei (decimal string)
    pub registration_fee_wei: String,
    /// gas limit multiplier, percent of the estimate
    pub gas_limit_percent: u32,
    /// gas price multiplier, percent of `eth_gasPrice`
    pub gas_price_percent: u32,
    pub receipt_poll_ms: u64,
    pub receipt_timeout_secs: u64,
    /// in-flight contract reads during aggregation
    pub max_concurrent_lookups: usize,
    /// base of the shareable referral link
    pub referral_base_url: String,
    /// http request timeout for the public endpoint
    pub request_timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::opbnb_testnet()
    }
}

impl ClientConfig {
    /// opBNB mainnet, 50 BNB registration
    pub fn opbnb_mainnet() -> Self {
        Self {
            rpc_endpoint: "https://opbnb-mainnet-rpc.bnbchain.org".into(),
            chain: ChainPolicy::mainnet(),
            registration_fee_wei: "50000000000000000000".into(),
            ..Self::opbnb_testnet()
        }
    }

    /// opBNB testnet
    pub fn opbnb_testnet() -> Self {
        Self {
            rpc_endpoint: "https://opbnb-testnet-rpc.bnbchain.org".into(),
            contract_address: Address::ZERO,
            abi_path: None,
            chain: ChainPolicy::testnet(),
            wallet_timeout_ms: 3000,
            redirect_delay_ms: 500,
            registration_fee_wei: "5000000000000".into(),
            gas_limit_percent: 120,
            gas_price_percent: 120,
            receipt_poll_ms: 2000,
            receipt_timeout_secs: 180,
            max_concurrent_lookups: 8,
            referral_base_url: "https://yourwebsite.com/register".into(),
            request_timeout_secs: 30,
        }
    }

    /// load from a toml file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ClientError::Config(format!("read {}: {}", path.display(), e)))?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| ClientError::Config(e.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.contract_address.is_zero() {
            return Err(ClientError::Config("contract_address is not set".into()));
        }
        if self.chain.permitted.is_empty() {
            return Err(ClientError::Config("no permitted chains".into()));
        }
        if !self.chain.is_permitted(self.chain.target) {
            return Err(ClientError::Config(format!(
                "switch target {} is not a permitted chain",
                self.chain.target
            )));
        }
        if self.gas_limit_percent < 100 || self.gas_price_percent < 100 {
            return Err(ClientError::Config("gas multipliers must be at least 100%".into()));
        }
        if self.max_concurrent_lookups == 0 {
            return Err(ClientError::Config("max_concurrent_lookups must be positive".into()));
        }
        self.fee_wei()?;
        Ok(())
    }

    pub fn fee_wei(&self) -> Result<U256> {
        self.registration_fee_wei
            .trim()
            .parse::<U256>()
            .map_err(|e| ClientError::Config(format!("registration_fee_wei: {e}")))
    }

    pub fn wallet_timeout(&self) -> Duration {
        Duration::from_millis(self.wallet_timeout_ms)
    }

    pub fn redirect_delay(&self) -> Duration {
        Duration::from_millis(self.redirect_delay_ms)
    }

    pub fn receipt_poll(&self) -> Duration {
        Duration::from_millis(self.receipt_poll_ms)
    }

    pub fn receipt_timeout(&self) -> Duration {
        Duration::from_secs(self.receipt_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_testnet_policy() {
        let policy = ChainPolicy::testnet();
        assert!(policy.is_permitted(204));
        assert!(policy.is_permitted(5611));
        assert!(!policy.is_permitted(1));
        assert!(!ChainPolicy::mainnet().is_permitted(5611));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = ClientConfig::from_toml_str(
            r#"
            contract_address = "0x52908400098527886e0f7030069857d2e4169ee7"
            gas_limit_percent = 150

            [chain]
            permitted = [204]
            target = 204
            "#,
        )
        .unwrap();
        assert_eq!(config.gas_limit_percent, 150);
        assert_eq!(config.redirect_delay_ms, 500);
        assert_eq!(config.chain, ChainPolicy::mainnet());
        config.validate().unwrap();
    }

    #[test]
    fn test_validate_rejects() {
        assert!(ClientConfig::default().validate().is_err());

        let mut config = ClientConfig::opbnb_mainnet();
        config.contract_address = "0x52908400098527886e0f7030069857d2e4169ee7".parse().unwrap();
        config.validate().unwrap();
        assert_eq!(config.fee_wei().unwrap(), U256::from(50) * crate::types::WEI_PER_ETHER);

        config.gas_price_percent = 90;
        assert!(config.validate().is_err());

        config.gas_price_percent = 120;
        config.chain.target = 5611;
        assert!(config.validate().is_err());
    }
}
