//! error types for the mlm client
//!
//! every wallet, contract and transport failure is translated into a
//! [`ClientError`] by [`ClientError::from_provider`] before it leaves a flow.

use crate::aggregator::Slice;
use serde_json::Value;
use thiserror::Error;

/// EIP-1193: user rejected the request
pub const USER_REJECTED: i64 = 4001;
/// EIP-1193: unrecognized chain id
pub const UNRECOGNIZED_CHAIN: i64 = 4902;
/// EIP-1474: execution reverted
pub const EXECUTION_REVERTED: i64 = 3;
/// JSON-RPC: internal error
pub const INTERNAL_ERROR: i64 = -32603;

/// reason used when a revert carries no message
pub const GENERIC_REVERT: &str = "Contract reverted transaction";

/// raw error as returned by a wallet or json-rpc endpoint
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message}")]
pub struct ProviderError {
    /// structured error code, absent for legacy untyped errors
    pub code: Option<i64>,
    pub message: String,
    /// revert payload or nested error object
    pub data: Option<Value>,
}

impl ProviderError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            message: message.into(),
            data: None,
        }
    }

    /// legacy error without a code
    pub fn untyped(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClientError {
    #[error("no wallet detected")]
    NoProvider,

    #[error("timeout waiting for wallet provider")]
    WalletTimeout,

    #[error("wrong network: chain {0} is not permitted")]
    WrongNetwork(u64),

    #[error("target network not found in the wallet")]
    SwitchUnknownChain,

    #[error("network switch request was rejected")]
    SwitchRejected,

    #[error("network switch failed: {0}")]
    SwitchOtherFailure(String),

    #[error("no accounts available")]
    NoAccounts,

    #[error("confirmation declined")]
    Denied,

    #[error("user rejected the request")]
    UserRejected,

    #[error("internal json-rpc error: {0}")]
    RpcInternalError(String),

    #[error("contract reverted: {0}")]
    ContractRevert(String),

    #[error("not a registered user")]
    NotRegistered,

    #[error("invalid referrer id")]
    InvalidReferrer,

    #[error("no registration event emitted")]
    NoRegistrationEvent,

    #[error("dashboard incomplete, defaulted slices: {0:?}")]
    AggregationPartial(Vec<Slice>),

    #[error("session was invalidated during the request")]
    SessionInvalidated,

    #[error("timeout waiting for receipt of {0}")]
    ReceiptTimeout(String),

    #[error("provider error: {message}")]
    Provider { code: Option<i64>, message: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("decoding error: {0}")]
    Decode(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, ClientError>;

impl ClientError {
    /// translate a provider error into a client error kind
    ///
    /// the structured code decides; the message is only inspected for
    /// legacy errors that carry no code, or to pull out a revert reason.
    pub fn from_provider(err: ProviderError) -> Self {
        match err.code {
            Some(USER_REJECTED) => ClientError::UserRejected,
            Some(EXECUTION_REVERTED) => ClientError::ContractRevert(
                revert_reason(&err).unwrap_or_else(|| GENERIC_REVERT.into()),
            ),
            Some(INTERNAL_ERROR) => match revert_reason(&err) {
                Some(reason) => ClientError::ContractRevert(reason),
                None => ClientError::RpcInternalError(err.message),
            },
            Some(code) => match revert_reason(&err) {
                Some(reason) => ClientError::ContractRevert(reason),
                None => ClientError::Provider {
                    code: Some(code),
                    message: err.message,
                },
            },
            None => classify_untyped(err),
        }
    }

    /// plain-language text for the presentation layer
    pub fn user_message(&self) -> String {
        match self {
            ClientError::NoProvider => "No wallet detected!".into(),
            ClientError::WalletTimeout => "Wallet did not respond in time. Reload and try again.".into(),
            ClientError::WrongNetwork(_) => {
                "Inappropriate network! Please switch to opBNB network.".into()
            }
            ClientError::SwitchUnknownChain => "Expected network not found in the wallet".into(),
            ClientError::SwitchRejected => "Network switch request was rejected".into(),
            ClientError::SwitchOtherFailure(msg) => format!("Network switch error: {msg}"),
            ClientError::NoAccounts => "No accounts available".into(),
            ClientError::Denied => "Request cancelled".into(),
            ClientError::UserRejected => "User denied transaction signature.".into(),
            ClientError::RpcInternalError(_) => {
                "Please increase gas fee! Also check gas, network settings!".into()
            }
            ClientError::ContractRevert(reason) => format!("Transaction reverted: {reason}"),
            ClientError::NotRegistered => "Not a registered user".into(),
            ClientError::InvalidReferrer => "Invalid Referrer ID".into(),
            ClientError::NoRegistrationEvent => "No registration event emitted".into(),
            ClientError::AggregationPartial(_) => {
                "Some dashboard data could not be loaded".into()
            }
            ClientError::SessionInvalidated => "Session ended. Please log in again.".into(),
            ClientError::ReceiptTimeout(_) => {
                "Transaction not confirmed yet. Check your wallet activity.".into()
            }
            ClientError::Provider { message, .. } => message.clone(),
            ClientError::Transport(_) | ClientError::Decode(_) => {
                "Network request failed. Try again later.".into()
            }
            ClientError::Storage(_) | ClientError::Config(_) => {
                "Client is misconfigured. Check console for details.".into()
            }
        }
    }
}

impl From<ProviderError> for ClientError {
    fn from(e: ProviderError) -> Self {
        ClientError::from_provider(e)
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        ClientError::Transport(e.to_string())
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(e: serde_json::Error) -> Self {
        ClientError::Decode(e.to_string())
    }
}

impl From<std::io::Error> for ClientError {
    fn from(e: std::io::Error) -> Self {
        ClientError::Storage(e.to_string())
    }
}

/// best-effort classifier for errors without a code
fn classify_untyped(err: ProviderError) -> ClientError {
    let message = err.message.as_str();
    if message.contains("User denied") || message.contains("User rejected") {
        return ClientError::UserRejected;
    }
    if let Some(reason) = revert_reason(&err) {
        return ClientError::ContractRevert(reason);
    }
    if message.contains("Internal JSON-RPC error") {
        return ClientError::RpcInternalError(err.message);
    }
    ClientError::Provider {
        code: None,
        message: err.message,
    }
}

/// pull a revert reason out of the error payload, if the error is a revert
fn revert_reason(err: &ProviderError) -> Option<String> {
    if let Some(data) = &err.data {
        if let Some(reason) = reason_from_data(data) {
            return Some(reason);
        }
    }

    if let Some(reason) = quoted_reason(&err.message) {
        return Some(reason);
    }
    if let Some(reason) = after_marker(&err.message, "reverted: ") {
        return Some(reason);
    }

    let data_mentions_revert = err
        .data
        .as_ref()
        .map(|d| d.to_string().contains("revert"))
        .unwrap_or(false);
    if err.message.contains("revert") || data_mentions_revert {
        return Some(GENERIC_REVERT.into());
    }
    None
}

fn reason_from_data(data: &Value) -> Option<String> {
    match data {
        Value::String(hex_data) => crate::abi::decode_revert_hex(hex_data),
        Value::Object(map) => {
            if let Some(inner) = map.get("data") {
                if let Some(reason) = reason_from_data(inner) {
                    return Some(reason);
                }
            }
            map.get("message")
                .and_then(Value::as_str)
                .and_then(|m| quoted_reason(m).or_else(|| after_marker(m, "reverted: ")))
        }
        _ => None,
    }
}

/// `... reason string: 'Already registered'`
fn quoted_reason(message: &str) -> Option<String> {
    let start = message.find("reason string: '")? + "reason string: '".len();
    let rest = &message[start..];
    let end = rest.find('\'')?;
    let reason = &rest[..end];
    (!reason.is_empty()).then(|| reason.to_string())
}

fn after_marker(message: &str, marker: &str) -> Option<String> {
    let start = message.find(marker)? + marker.len();
    let reason = message[start..].trim();
    (!reason.is_empty()).then(|| reason.to_string())
}
