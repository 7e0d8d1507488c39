//! mlm-client: wallet session and referral dashboard for the opBNB MLM contract
//!
//! discovers injected wallets, keeps the session consistent with the wallet's
//! account and chain, registers users on-chain and rebuilds the two-level
//! referral tree from contract reads.
//!
//! ## permitted chains
//!
//! - opBNB mainnet: `204`
//! - opBNB testnet: `5611` (configuration, drop it for production)
//!
//! ## usage
//!
//! ```rust,ignore
//! let ctx = ClientContext::new(ClientConfig::load(path)?, store, presenter)?;
//!
//! // wallet select page
//! ctx.init_wallet_select();
//! ctx.select_wallet(&uuid)?;
//! ctx.connect_wallet().await?;
//!
//! // session page
//! ctx.init_session_page().await;
//! ctx.login().await?;
//!
//! // dashboard page
//! let dashboard = ctx.init_dashboard_page().await?;
//! println!("{}", dashboard.tree.render());
//! ```

pub mod abi;
pub mod aggregator;
pub mod auth;
pub mod config;
pub mod context;
pub mod contract;
pub mod entry;
pub mod error;
pub mod events;
pub mod network;
pub mod provider;
pub mod referral;
pub mod registration;
pub mod registry;
pub mod rpc;
pub mod session;
pub mod types;
pub mod ui;
pub mod wallet;

pub use aggregator::{
    generate_level_status, Dashboard, IndirectGroup, LevelIncome, LevelStatus, Member,
    ReferralAggregator, ReferralSource, ReferralTree, Slice, TreeBranch, MAX_LEVEL,
};
pub use auth::{AuthState, RejectReason};
pub use config::*;
pub use context::ClientContext;
pub use contract::{
    ContractGateway, ContractHandle, ContractInterface, ExecutionMode, Receipt, RegistrationEvent,
    UserRecord,
};
pub use error::*;
pub use network::NetworkGuard;
pub use provider::{ProviderEvent, WalletProvider};
pub use referral::{extract_referral_code, ReferralCode};
pub use registration::{ReferralPreview, Registration};
pub use registry::{wallet_logo, ProviderInfo, ProviderRecord, ProviderRegistry};
pub use rpc::HttpRpc;
pub use session::{FileStore, MemoryStore, Session, SessionState, SessionStore};
pub use types::{format_ether, Address, U256};
pub use ui::{Notice, NoticeLevel, Page, Presenter, Prompt};
