//! referral code extraction

use crate::error::{ClientError, Result};
use std::fmt;
use url::Url;

/// path segments that introduce a referral code, e.g. `/referral/42`
const REF_SEGMENTS: &[&str] = &["ref", "referral", "r"];

/// sanitized referral code (`[A-Za-z0-9_-]+`)
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ReferralCode(String);

impl ReferralCode {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// referrer id for `regUser`; must be a positive integer
    pub fn referrer_id(&self) -> Result<u64> {
        match self.0.parse::<u64>() {
            Ok(id) if id > 0 => Ok(id),
            _ => Err(ClientError::InvalidReferrer),
        }
    }
}

impl fmt::Display for ReferralCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn sanitize(raw: &str) -> Option<ReferralCode> {
    let clean: String = raw
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect();
    (!clean.is_empty()).then_some(ReferralCode(clean))
}

/// pull the referral code out of a url
///
/// the `ref` query parameter wins; otherwise the segment following `ref`,
/// `referral` or `r` in the path. urls without a scheme are read as https.
pub fn extract_referral_code(input: &str) -> Option<ReferralCode> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }
    let absolute = if input.starts_with("http") {
        input.to_string()
    } else {
        format!("https://{input}")
    };
    let url = Url::parse(&absolute).ok()?;

    if let Some((_, value)) = url.query_pairs().find(|(k, v)| k == "ref" && !v.is_empty()) {
        return sanitize(&value);
    }

    let segments: Vec<&str> = url.path_segments()?.collect();
    let index = segments.iter().position(|s| REF_SEGMENTS.contains(s))?;
    match segments.get(index + 1) {
        Some(next) if !next.is_empty() => sanitize(next),
        _ => None,
    }
}
