//! contract gateway: typed handle over the mlm contract
//!
//! a handle talks either to the public endpoint (read-only) or to the
//! selected wallet (signed). the interface descriptor is a json abi loaded
//! once per process.

use crate::abi::{self, IMlm, REGISTRATION_EVENT};
use crate::aggregator::ReferralSource;
use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::network::NetworkGuard;
use crate::provider::{self, WalletProvider};
use crate::rpc::HttpRpc;
use crate::types::{narrow, parse_bytes, parse_quantity, to_quantity, Address, Bytes, B256, U256};
use alloy_sol_types::{SolCall, SolEvent};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::path::Path;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tracing::{debug, info};

const BUNDLED_ABI: &str = include_str!("../abi/mlm.json");

#[derive(Clone, Debug, Deserialize)]
pub struct AbiParam {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub indexed: bool,
}

#[derive(Clone, Debug, Deserialize)]
pub struct AbiEntry {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub inputs: Vec<AbiParam>,
    #[serde(default)]
    pub outputs: Vec<AbiParam>,
}

impl AbiEntry {
    /// canonical signature, e.g. `getUserIncomeCount(address,uint256)`
    pub fn signature(&self) -> String {
        let types: Vec<&str> = self.inputs.iter().map(|p| p.kind.as_str()).collect();
        format!("{}({})", self.name, types.join(","))
    }
}

/// parsed contract interface descriptor
#[derive(Debug)]
pub struct ContractInterface {
    entries: Vec<AbiEntry>,
}

impl ContractInterface {
    /// parse a json abi and check it declares what the client calls
    pub fn from_json(json: &str) -> Result<Self> {
        let entries: Vec<AbiEntry> = serde_json::from_str(json)
            .map_err(|e| ClientError::Config(format!("invalid abi: {e}")))?;
        let interface = Self { entries };
        for (name, expected) in abi::required_functions() {
            interface.expect_signature(interface.function(name)?, expected)?;
        }
        interface.expect_signature(
            interface.event(REGISTRATION_EVENT)?,
            abi::registration_event_signature(),
        )?;
        Ok(interface)
    }

    fn expect_signature(&self, entry: &AbiEntry, expected: &str) -> Result<()> {
        let found = entry.signature();
        if found != expected {
            return Err(ClientError::Config(format!(
                "abi declares {found}, client expects {expected}"
            )));
        }
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| ClientError::Config(format!("read abi {}: {}", path.display(), e)))?;
        Self::from_json(&json)
    }

    /// descriptor shipped with the crate
    pub fn bundled() -> Result<Arc<Self>> {
        static BUNDLED: OnceLock<Result<Arc<ContractInterface>>> = OnceLock::new();
        BUNDLED
            .get_or_init(|| ContractInterface::from_json(BUNDLED_ABI).map(Arc::new))
            .clone()
    }

    /// configured override, else the bundled descriptor
    pub fn from_config(config: &ClientConfig) -> Result<Arc<Self>> {
        match &config.abi_path {
            Some(path) => Self::load(path).map(Arc::new),
            None => Self::bundled(),
        }
    }

    fn entry(&self, kind: &str, name: &str) -> Result<&AbiEntry> {
        self.entries
            .iter()
            .find(|e| e.kind == kind && e.name == name)
            .ok_or_else(|| ClientError::Config(format!("abi is missing {kind} {name}")))
    }

    pub fn function(&self, name: &str) -> Result<&AbiEntry> {
        self.entry("function", name)
    }

    pub fn event(&self, name: &str) -> Result<&AbiEntry> {
        self.entry("event", name)
    }
}

/// how a handle reaches the chain
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExecutionMode {
    /// public endpoint, no wallet
    ReadOnly,
    /// selected wallet, network-compliant
    Signed,
}

/// `users(address)` record
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UserRecord {
    pub is_exist: bool,
    pub id: u64,
    pub referrer_id: u64,
    /// unix seconds
    pub joined: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct Log {
    pub address: Address,
    #[serde(default)]
    pub topics: Vec<B256>,
    #[serde(default)]
    pub data: Bytes,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Receipt {
    pub transaction_hash: String,
    pub status: bool,
    pub logs: Vec<Log>,
}

/// decoded `regLevelEvent`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RegistrationEvent {
    pub user: Address,
    pub referrer: Address,
    pub time: u64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawReceipt {
    transaction_hash: String,
    #[serde(default)]
    status: Option<Value>,
    #[serde(default)]
    logs: Vec<Log>,
}

impl TryFrom<RawReceipt> for Receipt {
    type Error = ClientError;

    fn try_from(raw: RawReceipt) -> Result<Self> {
        let status = match raw.status {
            Some(v) => parse_quantity(&v)? == U256::from(1),
            None => false,
        };
        Ok(Receipt {
            transaction_hash: raw.transaction_hash,
            status,
            logs: raw.logs,
        })
    }
}

#[derive(Clone)]
enum Backend {
    Http(Arc<HttpRpc>),
    Wallet(Arc<dyn WalletProvider>),
}

impl Backend {
    async fn request(&self, method: &str, params: Value) -> Result<Value> {
        match self {
            Backend::Http(rpc) => rpc.call(method, params).await,
            Backend::Wallet(wallet) => provider::call(wallet.as_ref(), method, params).await,
        }
    }
}

/// typed contract handle
#[derive(Clone)]
pub struct ContractHandle {
    backend: Backend,
    address: Address,
    interface: Arc<ContractInterface>,
    mode: ExecutionMode,
    from: Option<Address>,
}

impl ContractHandle {
    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn interface(&self) -> &Arc<ContractInterface> {
        &self.interface
    }

    /// sender used for `eth_call`
    pub fn with_from(mut self, from: Address) -> Self {
        self.from = Some(from);
        self
    }

    pub async fn chain_id(&self) -> Result<u64> {
        let value = self.backend.request("eth_chainId", json!([])).await?;
        narrow(parse_quantity(&value)?, "chain id")
    }

    fn tx_object(&self, data: &[u8]) -> Map<String, Value> {
        let mut tx = Map::new();
        tx.insert("to".into(), json!(self.address.to_string()));
        tx.insert("data".into(), json!(format!("0x{}", hex::encode(data))));
        if let Some(from) = self.from {
            tx.insert("from".into(), json!(from.to_string()));
        }
        tx
    }

    async fn eth_call<C: SolCall>(&self, call: C) -> Result<C::Return> {
        let tx = self.tx_object(&call.abi_encode());
        debug!("eth_call {} on {}", C::SIGNATURE, self.address);
        let value = self.backend.request("eth_call", json!([tx, "latest"])).await?;
        let out = parse_bytes(&value)?;
        C::abi_decode_returns(&out, true)
            .map_err(|e| ClientError::Decode(format!("{}: {}", C::SIGNATURE, e)))
    }

    pub async fn users(&self, user: &Address) -> Result<UserRecord> {
        let record = self.eth_call(IMlm::usersCall { user: *user }).await?;
        Ok(UserRecord {
            is_exist: record.isExist,
            id: narrow(record.id, "user id")?,
            referrer_id: narrow(record.referrerID, "referrer id")?,
            joined: narrow(record.joined, "join time")?,
        })
    }

    /// wallet of a registered id
    pub async fn user_list(&self, id: u64) -> Result<Address> {
        let out = self.eth_call(IMlm::userListCall { id: U256::from(id) }).await?;
        Ok(out.user)
    }

    pub async fn get_user_referrals(&self, user: &Address) -> Result<Vec<Address>> {
        let out = self.eth_call(IMlm::getUserReferralsCall { user: *user }).await?;
        Ok(out.referrals)
    }

    pub async fn get_user_income_count(&self, user: &Address, level: u8) -> Result<u64> {
        let out = self
            .eth_call(IMlm::getUserIncomeCountCall {
                user: *user,
                level: U256::from(level),
            })
            .await?;
        narrow(out.count, "income count")
    }

    pub async fn get_user_level_eligibility(&self, user: &Address) -> Result<Vec<u64>> {
        let out = self
            .eth_call(IMlm::getUserLevelEligibilityCall { user: *user })
            .await?;
        out.levels
            .into_iter()
            .map(|level| narrow(level, "level"))
            .collect()
    }

    /// lifetime earnings in wei
    pub async fn total_earnings(&self, user: &Address) -> Result<U256> {
        let out = self.eth_call(IMlm::totalEarningsCall { user: *user }).await?;
        Ok(out.earnings)
    }

    fn reg_user_tx(&self, from: &Address, referrer_id: u64, value: U256) -> Map<String, Value> {
        let call = IMlm::regUserCall {
            referrerID: U256::from(referrer_id),
        };
        let mut tx = self.tx_object(&call.abi_encode());
        tx.insert("from".into(), json!(from.to_string()));
        tx.insert("value".into(), json!(to_quantity(value)));
        tx
    }

    /// gas estimate for `regUser` with the real value attached
    pub async fn estimate_reg_user(&self, from: &Address, referrer_id: u64, value: U256) -> Result<U256> {
        let tx = self.reg_user_tx(from, referrer_id, value);
        let gas = self.backend.request("eth_estimateGas", json!([tx])).await?;
        parse_quantity(&gas)
    }

    pub async fn gas_price(&self) -> Result<U256> {
        let price = self.backend.request("eth_gasPrice", json!([])).await?;
        parse_quantity(&price)
    }

    /// submit `regUser`; returns the transaction hash
    pub async fn send_reg_user(
        &self,
        from: &Address,
        referrer_id: u64,
        value: U256,
        gas: U256,
        gas_price: U256,
    ) -> Result<String> {
        if self.mode != ExecutionMode::Signed {
            return Err(ClientError::NoProvider);
        }
        let mut tx = self.reg_user_tx(from, referrer_id, value);
        tx.insert("gas".into(), json!(to_quantity(gas)));
        tx.insert("gasPrice".into(), json!(to_quantity(gas_price)));
        let hash = self.backend.request("eth_sendTransaction", json!([tx])).await?;
        let hash = hash
            .as_str()
            .ok_or_else(|| ClientError::Decode(format!("expected tx hash, got {hash}")))?;
        info!("regUser submitted: {}", hash);
        Ok(hash.to_string())
    }

    pub async fn receipt(&self, tx_hash: &str) -> Result<Option<Receipt>> {
        let value = self
            .backend
            .request("eth_getTransactionReceipt", json!([tx_hash]))
            .await?;
        if value.is_null() {
            return Ok(None);
        }
        let raw: RawReceipt = serde_json::from_value(value)?;
        Receipt::try_from(raw).map(Some)
    }

    /// poll until mined or the bound elapses
    pub async fn wait_for_receipt(&self, tx_hash: &str, poll: Duration, bound: Duration) -> Result<Receipt> {
        let wait = async {
            loop {
                if let Some(receipt) = self.receipt(tx_hash).await? {
                    return Ok::<_, ClientError>(receipt);
                }
                tokio::time::sleep(poll).await;
            }
        };
        tokio::time::timeout(bound, wait)
            .await
            .map_err(|_| ClientError::ReceiptTimeout(tx_hash.to_string()))?
    }

    /// first `regLevelEvent` emitted by this contract in the receipt
    pub fn registration_event(&self, receipt: &Receipt) -> Result<Option<RegistrationEvent>> {
        let Some(log) = receipt.logs.iter().find(|l| {
            l.address == self.address && l.topics.first() == Some(&IMlm::regLevelEvent::SIGNATURE_HASH)
        }) else {
            return Ok(None);
        };

        let event = IMlm::regLevelEvent::decode_raw_log(log.topics.iter().copied(), &log.data, true)
            .map_err(|e| ClientError::Decode(format!("{REGISTRATION_EVENT}: {e}")))?;
        Ok(Some(RegistrationEvent {
            user: event.user,
            referrer: event.referrer,
            time: narrow(event.time, "event time")?,
        }))
    }
}

#[async_trait]
impl ReferralSource for ContractHandle {
    async fn user(&self, address: &Address) -> Result<UserRecord> {
        self.users(address).await
    }

    async fn referrals(&self, address: &Address) -> Result<Vec<Address>> {
        self.get_user_referrals(address).await
    }

    async fn income_count(&self, address: &Address, level: u8) -> Result<u64> {
        self.get_user_income_count(address, level).await
    }

    async fn level_eligibility(&self, address: &Address) -> Result<Vec<u64>> {
        self.get_user_level_eligibility(address).await
    }

    async fn total_earnings(&self, address: &Address) -> Result<U256> {
        ContractHandle::total_earnings(self, address).await
    }
}

/// builds contract handles bound to the configured contract
pub struct ContractGateway {
    rpc: Arc<HttpRpc>,
    address: Address,
    interface: Arc<ContractInterface>,
    guard: NetworkGuard,
}

impl ContractGateway {
    pub fn new(config: &ClientConfig, interface: Arc<ContractInterface>) -> Result<Self> {
        let rpc = HttpRpc::new(&config.rpc_endpoint, config.request_timeout())?;
        Ok(Self {
            rpc: Arc::new(rpc),
            address: config.contract_address,
            interface,
            guard: NetworkGuard::new(config.chain.clone()),
        })
    }

    pub fn interface(&self) -> &Arc<ContractInterface> {
        &self.interface
    }

    /// public endpoint handle
    pub fn read_only(&self) -> ContractHandle {
        ContractHandle {
            backend: Backend::Http(self.rpc.clone()),
            address: self.address,
            interface: self.interface.clone(),
            mode: ExecutionMode::ReadOnly,
            from: None,
        }
    }

    /// wallet handle; never falls back to read-only
    pub async fn signed(&self, wallet: Option<Arc<dyn WalletProvider>>) -> Result<ContractHandle> {
        let wallet = wallet.ok_or(ClientError::NoProvider)?;
        self.guard.ensure_compliant(wallet.as_ref()).await?;
        Ok(ContractHandle {
            backend: Backend::Wallet(wallet),
            address: self.address,
            interface: self.interface.clone(),
            mode: ExecutionMode::Signed,
            from: None,
        })
    }

    pub async fn contract_handle(
        &self,
        mode: ExecutionMode,
        wallet: Option<Arc<dyn WalletProvider>>,
    ) -> Result<ContractHandle> {
        match mode {
            ExecutionMode::ReadOnly => Ok(self.read_only()),
            ExecutionMode::Signed => self.signed(wallet).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle() -> ContractHandle {
        let mut config = ClientConfig::default();
        config.contract_address = Address::with_last_byte(0xaa);
        let gateway = ContractGateway::new(&config, ContractInterface::bundled().unwrap()).unwrap();
        gateway.read_only()
    }

    #[test]
    fn test_bundled_interface() {
        let interface = ContractInterface::bundled().unwrap();
        assert_eq!(interface.function("regUser").unwrap().signature(), "regUser(uint256)");
        assert_eq!(
            interface.event(REGISTRATION_EVENT).unwrap().signature(),
            "regLevelEvent(address,address,uint256)"
        );
        assert_eq!(interface.function("users").unwrap().outputs[2].name, "referrerID");
    }

    #[test]
    fn test_missing_entry_rejected() {
        let err = ContractInterface::from_json(r#"[{"type":"function","name":"users","inputs":[]}]"#)
            .unwrap_err();
        assert!(matches!(err, ClientError::Config(_)));
    }

    #[test]
    fn test_mismatched_signature_rejected() {
        let json = BUNDLED_ABI.replace(
            r#""name": "_referrerID", "type": "uint256""#,
            r#""name": "_referrerID", "type": "address""#,
        );
        let err = ContractInterface::from_json(&json).unwrap_err();
        assert_eq!(
            err,
            ClientError::Config("abi declares regUser(address), client expects regUser(uint256)".into())
        );
    }

    #[test]
    fn test_receipt_parse_and_event() {
        let handle = handle();
        let user = Address::repeat_byte(0x11);
        let referrer = Address::repeat_byte(0x22);
        let log = IMlm::regLevelEvent {
            user,
            referrer,
            time: U256::from(1_700_000_000u64),
        }
        .encode_log_data();

        let topics: Vec<String> = log.topics().iter().map(|t| format!("0x{}", hex::encode(t))).collect();
        let raw = json!({
            "transactionHash": "0xabc",
            "status": "0x1",
            "logs": [{
                "address": handle.address().to_string(),
                "topics": topics,
                "data": format!("0x{}", hex::encode(&log.data)),
            }]
        });
        let receipt = Receipt::try_from(serde_json::from_value::<RawReceipt>(raw).unwrap()).unwrap();
        assert!(receipt.status);

        let event = handle.registration_event(&receipt).unwrap().unwrap();
        assert_eq!(event.user, user);
        assert_eq!(event.referrer, referrer);
        assert_eq!(event.time, 1_700_000_000);
    }

    #[test]
    fn test_event_from_other_contract_ignored() {
        let handle = handle();
        let receipt = Receipt {
            transaction_hash: "0xabc".into(),
            status: true,
            logs: vec![Log {
                address: Address::ZERO,
                topics: vec![IMlm::regLevelEvent::SIGNATURE_HASH],
                data: Bytes::new(),
            }],
        };
        assert_eq!(handle.registration_event(&receipt).unwrap(), None);
    }

    #[test]
    fn test_truncated_event_is_decode_error() {
        let handle = handle();
        let receipt = Receipt {
            transaction_hash: "0xabc".into(),
            status: true,
            logs: vec![Log {
                address: handle.address(),
                topics: vec![IMlm::regLevelEvent::SIGNATURE_HASH],
                data: Bytes::new(),
            }],
        };
        assert!(matches!(handle.registration_event(&receipt), Err(ClientError::Decode(_))));
    }
}
