//! primitive chain types: addresses, hex quantities, wei formatting

use crate::error::{ClientError, Result};
use serde_json::Value;

pub use alloy_primitives::{Address, Bytes, B256, U256};

/// wei per ether
pub const WEI_PER_ETHER: U256 = U256::from_limbs([1_000_000_000_000_000_000, 0, 0, 0]);

/// parse an address in any letter case
pub fn parse_address(s: &str) -> Result<Address> {
    let s = s.trim();
    s.parse()
        .map_err(|e| ClientError::Decode(format!("invalid address {s}: {e}")))
}

/// encode an integer as a json-rpc hex quantity (`0x0`, `0x1a`)
pub fn to_quantity(value: U256) -> String {
    format!("0x{value:x}")
}

/// parse a json-rpc quantity; wallets are inconsistent so decimal strings
/// and plain numbers are accepted too
pub fn parse_quantity(value: &Value) -> Result<U256> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
                Some("") => return Ok(U256::ZERO),
                Some(hex_digits) => U256::from_str_radix(hex_digits, 16),
                None => U256::from_str_radix(s, 10),
            };
            parsed.map_err(|e| ClientError::Decode(format!("invalid quantity {s}: {e}")))
        }
        Value::Number(n) => n
            .as_u64()
            .map(U256::from)
            .ok_or_else(|| ClientError::Decode(format!("invalid quantity {n}"))),
        other => Err(ClientError::Decode(format!("expected quantity, got {other}"))),
    }
}

/// narrow a uint256 that is known to be small (ids, levels, timestamps)
pub fn narrow(value: U256, what: &str) -> Result<u64> {
    u64::try_from(value).map_err(|_| ClientError::Decode(format!("{what} out of range: {value}")))
}

/// decode `0x`-prefixed hex data
pub fn parse_bytes(value: &Value) -> Result<Bytes> {
    let s = value
        .as_str()
        .ok_or_else(|| ClientError::Decode(format!("expected hex data, got {value}")))?;
    let body = s.strip_prefix("0x").unwrap_or(s);
    hex::decode(body)
        .map(Bytes::from)
        .map_err(|e| ClientError::Decode(format!("invalid hex data: {e}")))
}

/// format wei as ether, trimming trailing zeros (`1500000000000000000` -> `1.5`)
pub fn format_ether(wei: U256) -> String {
    let whole = wei / WEI_PER_ETHER;
    let frac = wei % WEI_PER_ETHER;
    if frac.is_zero() {
        return whole.to_string();
    }
    let frac = format!("{:0>18}", frac.to_string());
    format!("{}.{}", whole, frac.trim_end_matches('0'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_address_case_insensitive() {
        let a = parse_address("0x52908400098527886E0F7030069857D2E4169EE7").unwrap();
        let b = parse_address(" 0x52908400098527886e0f7030069857d2e4169ee7").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_address_rejects_bad_length() {
        assert!(parse_address("0x1234").is_err());
        assert!(parse_address("0xzz08400098527886e0f7030069857d2e4169ee7").is_err());
    }

    #[test]
    fn test_parse_quantity() {
        assert_eq!(parse_quantity(&json!("0xcc")).unwrap(), U256::from(204));
        assert_eq!(parse_quantity(&json!("5611")).unwrap(), U256::from(5611));
        assert_eq!(parse_quantity(&json!(204)).unwrap(), U256::from(204));
        assert_eq!(parse_quantity(&json!("0x")).unwrap(), U256::ZERO);
        assert!(parse_quantity(&json!(null)).is_err());
    }

    #[test]
    fn test_full_width_quantity() {
        let max = format!("0x{}", "f".repeat(64));
        assert_eq!(parse_quantity(&json!(max)).unwrap(), U256::MAX);
        assert!(narrow(U256::MAX, "id").is_err());
        assert_eq!(narrow(U256::from(42), "id").unwrap(), 42);
    }

    #[test]
    fn test_to_quantity() {
        assert_eq!(to_quantity(U256::ZERO), "0x0");
        assert_eq!(to_quantity(U256::from(200_000)), "0x30d40");
    }

    #[test]
    fn test_format_ether() {
        assert_eq!(format_ether(U256::ZERO), "0");
        assert_eq!(format_ether(WEI_PER_ETHER), "1");
        assert_eq!(format_ether(U256::from(1_500_000_000_000_000_000u128)), "1.5");
        assert_eq!(format_ether(U256::from(5_000_000_000_000u64)), "0.000005");
    }
}
