//! shared fakes for the flow tests

#![allow(dead_code)]

use alloy_sol_types::{SolCall, SolEvent, SolInterface};
use async_trait::async_trait;
use mlm_client::abi::IMlm::{self, IMlmCalls};
use mlm_client::{
    Address, ClientConfig, ClientContext, MemoryStore, Notice, Page, Presenter, Prompt,
    ProviderError, ProviderEvent, ProviderInfo, ProviderRecord, UserRecord, WalletProvider, U256,
};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::broadcast;

pub fn addr(n: u8) -> Address {
    let mut bytes = [0u8; 20];
    bytes[0] = 0x10;
    bytes[19] = n;
    Address::from(bytes)
}

pub fn contract_address() -> Address {
    Address::with_last_byte(0xaa)
}

pub fn test_config() -> ClientConfig {
    let mut config = ClientConfig::opbnb_testnet();
    config.contract_address = contract_address();
    config.rpc_endpoint = "http://127.0.0.1:9".into();
    config
}

pub fn registered(id: u64) -> UserRecord {
    UserRecord {
        is_exist: true,
        id,
        referrer_id: 1,
        joined: 1_700_000_000,
    }
}

/// contract state answered through `eth_call`
#[derive(Default)]
pub struct FakeContract {
    pub users: HashMap<Address, UserRecord>,
    pub user_list: HashMap<u64, Address>,
    pub referrals: HashMap<Address, Vec<Address>>,
    pub eligibility: HashMap<Address, Vec<u64>>,
    pub earnings: HashMap<Address, U256>,
    pub fail_earnings: bool,
}

impl FakeContract {
    fn call(&self, data: &[u8]) -> Result<Vec<u8>, ProviderError> {
        let call = IMlmCalls::abi_decode(data, true)
            .map_err(|_| ProviderError::new(3, "execution reverted"))?;
        let out = match call {
            IMlmCalls::users(c) => {
                let u = self.users.get(&c.user).copied().unwrap_or_default();
                IMlm::usersCall::abi_encode_returns(&(
                    u.is_exist,
                    U256::from(u.id),
                    U256::from(u.referrer_id),
                    U256::from(u.joined),
                ))
            }
            IMlmCalls::userList(c) => {
                let id = u64::try_from(c.id).unwrap();
                let user = self.user_list.get(&id).copied().unwrap_or_default();
                IMlm::userListCall::abi_encode_returns(&(user,))
            }
            IMlmCalls::getUserReferrals(c) => {
                let list = self.referrals.get(&c.user).cloned().unwrap_or_default();
                IMlm::getUserReferralsCall::abi_encode_returns(&(list,))
            }
            IMlmCalls::getUserIncomeCount(c) => IMlm::getUserIncomeCountCall::abi_encode_returns(&(c.level,)),
            IMlmCalls::getUserLevelEligibility(c) => {
                let levels: Vec<U256> = self
                    .eligibility
                    .get(&c.user)
                    .into_iter()
                    .flatten()
                    .map(|level| U256::from(*level))
                    .collect();
                IMlm::getUserLevelEligibilityCall::abi_encode_returns(&(levels,))
            }
            IMlmCalls::totalEarnings(c) => {
                if self.fail_earnings {
                    return Err(ProviderError::new(-32000, "header not found"));
                }
                let wei = self.earnings.get(&c.user).copied().unwrap_or_default();
                IMlm::totalEarningsCall::abi_encode_returns(&(wei,))
            }
            IMlmCalls::regUser(_) => return Err(ProviderError::new(3, "execution reverted")),
        };
        Ok(out)
    }
}

/// scripted EIP-1193 wallet
pub struct MockWallet {
    pub chain_id: Mutex<u64>,
    pub accounts: Mutex<Vec<Address>>,
    pub accounts_error: Mutex<Option<ProviderError>>,
    pub chain_error: Mutex<Option<ProviderError>>,
    pub switch_error: Mutex<Option<ProviderError>>,
    pub estimate_error: Mutex<Option<ProviderError>>,
    pub receipt: Mutex<Option<Value>>,
    pub contract: Mutex<FakeContract>,
    /// methods in call order
    pub log: Mutex<Vec<String>>,
    pub sent: Mutex<Vec<Value>>,
    events: broadcast::Sender<ProviderEvent>,
}

impl MockWallet {
    pub fn new(chain_id: u64, accounts: Vec<Address>) -> Arc<Self> {
        let (events, _) = broadcast::channel(16);
        Arc::new(Self {
            chain_id: Mutex::new(chain_id),
            accounts: Mutex::new(accounts),
            accounts_error: Mutex::new(None),
            chain_error: Mutex::new(None),
            switch_error: Mutex::new(None),
            estimate_error: Mutex::new(None),
            receipt: Mutex::new(None),
            contract: Mutex::new(FakeContract::default()),
            log: Mutex::new(Vec::new()),
            sent: Mutex::new(Vec::new()),
            events,
        })
    }

    pub fn emit(&self, event: ProviderEvent) {
        let _ = self.events.send(event);
    }

    pub fn called(&self, method: &str) -> bool {
        self.log.lock().iter().any(|m| m == method)
    }
}

#[async_trait]
impl WalletProvider for MockWallet {
    async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderError> {
        self.log.lock().push(method.to_string());
        match method {
            "eth_chainId" => match self.chain_error.lock().clone() {
                Some(err) => Err(err),
                None => Ok(json!(format!("0x{:x}", *self.chain_id.lock()))),
            },
            "eth_requestAccounts" => match self.accounts_error.lock().clone() {
                Some(err) => Err(err),
                None => {
                    let accounts: Vec<String> =
                        self.accounts.lock().iter().map(|a| a.to_string()).collect();
                    Ok(json!(accounts))
                }
            },
            "wallet_switchEthereumChain" => {
                if let Some(err) = self.switch_error.lock().clone() {
                    return Err(err);
                }
                let hex_id = params[0]["chainId"].as_str().unwrap().trim_start_matches("0x");
                *self.chain_id.lock() = u64::from_str_radix(hex_id, 16).unwrap();
                Ok(Value::Null)
            }
            "eth_call" => {
                let data = params[0]["data"].as_str().unwrap().trim_start_matches("0x");
                let out = self.contract.lock().call(&hex::decode(data).unwrap())?;
                Ok(json!(format!("0x{}", hex::encode(out))))
            }
            "eth_estimateGas" => match self.estimate_error.lock().clone() {
                Some(err) => Err(err),
                None => Ok(json!("0x30d40")),
            },
            "eth_gasPrice" => Ok(json!("0x3b9aca00")),
            "eth_sendTransaction" => {
                self.sent.lock().push(params[0].clone());
                Ok(json!("0xfeed"))
            }
            "eth_getTransactionReceipt" => Ok(self.receipt.lock().clone().unwrap_or(Value::Null)),
            _ => Err(ProviderError::new(4200, format!("unsupported method {method}"))),
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<ProviderEvent> {
        self.events.subscribe()
    }
}

/// receipt json; `event_user` adds a `regLevelEvent` log
pub fn receipt_json(status: bool, event_user: Option<Address>, referrer: Address) -> Value {
    let mut logs = Vec::new();
    if let Some(user) = event_user {
        let log = IMlm::regLevelEvent {
            user,
            referrer,
            time: U256::from(1_700_000_000u64),
        }
        .encode_log_data();
        let topics: Vec<String> = log.topics().iter().map(|t| format!("0x{}", hex::encode(t))).collect();
        logs.push(json!({
            "address": contract_address().to_string(),
            "topics": topics,
            "data": format!("0x{}", hex::encode(&log.data)),
        }));
    }
    let status = if status { "0x1" } else { "0x0" };
    json!({
        "transactionHash": "0xfeed",
        "status": status,
        "logs": logs,
    })
}

/// wallet switch performed while a confirmation prompt is open
pub struct SwitchOnConfirm {
    pub ctx: Weak<ClientContext>,
    pub wallet: Arc<MockWallet>,
    pub accounts: Vec<Address>,
}

/// presenter that records everything and answers prompts with `answer`
pub struct RecordingPresenter {
    pub answer: AtomicBool,
    pub switch_on_confirm: Mutex<Option<SwitchOnConfirm>>,
    pub prompts: Mutex<Vec<Prompt>>,
    pub notices: Mutex<Vec<Notice>>,
    pub busy: Mutex<Vec<bool>>,
    pub redirects: Mutex<Vec<Page>>,
    pub wallets: Mutex<Vec<(ProviderInfo, String)>>,
}

impl RecordingPresenter {
    pub fn new(answer: bool) -> Arc<Self> {
        Arc::new(Self {
            answer: AtomicBool::new(answer),
            switch_on_confirm: Mutex::new(None),
            prompts: Mutex::new(Vec::new()),
            notices: Mutex::new(Vec::new()),
            busy: Mutex::new(Vec::new()),
            redirects: Mutex::new(Vec::new()),
            wallets: Mutex::new(Vec::new()),
        })
    }

    pub fn last_redirect(&self) -> Option<Page> {
        self.redirects.lock().last().copied()
    }

    /// on the next prompt, move the wallet to `accounts` and deliver the event
    pub fn switch_accounts_on_confirm(&self, ctx: &Arc<ClientContext>, wallet: &Arc<MockWallet>, accounts: Vec<Address>) {
        *self.switch_on_confirm.lock() = Some(SwitchOnConfirm {
            ctx: Arc::downgrade(ctx),
            wallet: wallet.clone(),
            accounts,
        });
    }

    pub fn messages(&self) -> Vec<String> {
        self.notices.lock().iter().map(|n| n.message.clone()).collect()
    }
}

#[async_trait]
impl Presenter for RecordingPresenter {
    async fn confirm(&self, prompt: &Prompt) -> bool {
        self.prompts.lock().push(prompt.clone());
        let switch = self.switch_on_confirm.lock().take();
        if let Some(switch) = switch {
            *switch.wallet.accounts.lock() = switch.accounts.clone();
            if let Some(ctx) = switch.ctx.upgrade() {
                ctx.handle_provider_event(ProviderEvent::AccountsChanged(switch.accounts))
                    .await;
            }
        }
        self.answer.load(Ordering::SeqCst)
    }

    fn notify(&self, notice: Notice) {
        self.notices.lock().push(notice);
    }

    fn set_busy(&self, busy: bool) {
        self.busy.lock().push(busy);
    }

    fn redirect(&self, page: Page) {
        self.redirects.lock().push(page);
    }

    fn show_wallet(&self, info: &ProviderInfo, logo: &str) {
        self.wallets.lock().push((info.clone(), logo.to_string()));
    }
}

pub fn wallet_info(uuid: &str, name: &str, rdns: &str) -> ProviderInfo {
    ProviderInfo {
        uuid: uuid.into(),
        name: name.into(),
        icon: "data:image/svg+xml;base64,".into(),
        rdns: rdns.into(),
    }
}

/// context with `wallet` announced and selected
pub fn setup(wallet: &Arc<MockWallet>, presenter: &Arc<RecordingPresenter>) -> Arc<ClientContext> {
    let ctx = ClientContext::new(test_config(), Arc::new(MemoryStore::new()), presenter.clone()).unwrap();
    ctx.registry()
        .announce(ProviderRecord::new(wallet_info("uuid-mm", "MetaMask", "io.metamask"), wallet.clone()));
    ctx.select_wallet("uuid-mm").unwrap();
    ctx
}
