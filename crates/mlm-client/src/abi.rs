//! solidity bindings of the mlm contract
//!
//! call encoding, return decoding and the `regLevelEvent` log layout come
//! from the interface below. a json descriptor loaded at runtime must
//! declare the same signatures.

use alloy_sol_types::{sol, Revert, SolCall, SolError, SolEvent};

sol! {
    /// mlm registration contract
    interface IMlm {
        function users(address user) external view returns (bool isExist, uint256 id, uint256 referrerID, uint256 joined);
        function userList(uint256 id) external view returns (address user);
        function getUserReferrals(address user) external view returns (address[] referrals);
        function getUserIncomeCount(address user, uint256 level) external view returns (uint256 count);
        function getUserLevelEligibility(address user) external view returns (uint256[] levels);
        function totalEarnings(address user) external view returns (uint256 earnings);
        function regUser(uint256 referrerID) external payable;

        event regLevelEvent(address indexed user, address indexed referrer, uint256 time);
    }
}

/// name of the registration event
pub const REGISTRATION_EVENT: &str = "regLevelEvent";

/// (name, canonical signature) of every function the client calls
pub fn required_functions() -> [(&'static str, &'static str); 7] {
    [
        ("users", IMlm::usersCall::SIGNATURE),
        ("userList", IMlm::userListCall::SIGNATURE),
        ("getUserReferrals", IMlm::getUserReferralsCall::SIGNATURE),
        ("getUserIncomeCount", IMlm::getUserIncomeCountCall::SIGNATURE),
        ("getUserLevelEligibility", IMlm::getUserLevelEligibilityCall::SIGNATURE),
        ("totalEarnings", IMlm::totalEarningsCall::SIGNATURE),
        ("regUser", IMlm::regUserCall::SIGNATURE),
    ]
}

/// canonical signature of the registration event
pub fn registration_event_signature() -> &'static str {
    IMlm::regLevelEvent::SIGNATURE
}

/// decode an `Error(string)` revert payload
pub fn decode_revert(data: &[u8]) -> Option<String> {
    Revert::abi_decode(data, true).ok().map(|revert| revert.reason)
}

/// decode an `Error(string)` revert payload given as hex
pub fn decode_revert_hex(data: &str) -> Option<String> {
    let body = data.strip_prefix("0x").unwrap_or(data);
    let bytes = hex::decode(body).ok()?;
    decode_revert(&bytes)
}
