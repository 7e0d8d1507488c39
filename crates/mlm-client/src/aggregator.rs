//! referral aggregator
//!
//! rebuilds the two-level genealogy of a user from independent contract
//! reads. every slice degrades on its own: a failed read is logged, replaced
//! by a default and recorded in [`Dashboard::degraded`].

use crate::contract::UserRecord;
use crate::error::{ClientError, Result};
use crate::types::{format_ether, Address, U256};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::collections::{HashMap, HashSet};
use std::fmt::Write;
use tracing::{debug, warn};

/// highest income/eligibility level
pub const MAX_LEVEL: u8 = 12;

/// read access to the referral data of the contract
#[async_trait]
pub trait ReferralSource: Send + Sync {
    async fn user(&self, address: &Address) -> Result<UserRecord>;
    async fn referrals(&self, address: &Address) -> Result<Vec<Address>>;
    async fn income_count(&self, address: &Address, level: u8) -> Result<u64>;
    async fn level_eligibility(&self, address: &Address) -> Result<Vec<u64>>;
    /// wei
    async fn total_earnings(&self, address: &Address) -> Result<U256>;
}

/// part of the dashboard that fell back to its default
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Slice {
    TotalEarnings,
    LevelEligibility,
    LevelIncome(u8),
    UserRecord(Address),
    DirectReferrals,
    IndirectReferrals(Address),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LevelStatus {
    pub level: u8,
    pub active: bool,
}

/// dense 1..=12 table, active iff the level is in `eligible`
pub fn generate_level_status(eligible: &[u64]) -> Vec<LevelStatus> {
    (1..=MAX_LEVEL)
        .map(|level| LevelStatus {
            level,
            active: eligible.contains(&u64::from(level)),
        })
        .collect()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LevelIncome {
    pub level: u8,
    pub count: u64,
}

/// resolved referral
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Member {
    pub id: u64,
    pub address: Address,
    /// unix seconds
    pub joined: u64,
}

impl Member {
    /// `YYYY-MM-DD`, empty for unknown dates
    pub fn joined_date(&self) -> String {
        i64::try_from(self.joined)
            .ok()
            .and_then(|secs| chrono::DateTime::from_timestamp(secs, 0))
            .map(|dt| dt.format("%Y-%m-%d").to_string())
            .unwrap_or_default()
    }
}

/// referrals of one direct referral
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndirectGroup {
    pub referred_by: Address,
    pub members: Vec<Member>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TreeBranch {
    pub member: Member,
    pub children: Vec<Member>,
}

/// two-level genealogy rooted at the user
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReferralTree {
    pub root_id: u64,
    pub branches: Vec<TreeBranch>,
}

impl ReferralTree {
    /// box-drawing text rendering
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "YOU ({})", self.root_id);
        if self.branches.is_empty() {
            out.push_str("└── No direct referrals\n");
            return out;
        }

        for (i, branch) in self.branches.iter().enumerate() {
            let last = i + 1 == self.branches.len();
            let prefix = if last { "└── " } else { "├── " };
            let indent = if last { "    " } else { "│   " };
            let _ = writeln!(out, "{}{}", prefix, branch.member.id);

            if branch.children.is_empty() {
                let _ = writeln!(out, "{indent}└── No indirect referrals");
                continue;
            }
            for (j, child) in branch.children.iter().enumerate() {
                let sub = if j + 1 == branch.children.len() { "└── " } else { "├── " };
                let _ = writeln!(out, "{}{}{}", indent, sub, child.id);
            }
        }
        out
    }
}

/// everything the dashboard page shows
#[derive(Clone, Debug)]
pub struct Dashboard {
    pub address: Address,
    pub user: UserRecord,
    pub referral_link: String,
    pub total_earnings_wei: U256,
    /// earnings in ether
    pub total_earnings: String,
    pub level_eligibility: Vec<u64>,
    pub level_status: Vec<LevelStatus>,
    pub level_incomes: Vec<LevelIncome>,
    pub direct: Vec<Member>,
    pub indirect: Vec<IndirectGroup>,
    pub tree: ReferralTree,
    pub degraded: Vec<Slice>,
}

impl Dashboard {
    /// `AggregationPartial` when any slice was defaulted
    pub fn partial(&self) -> Option<ClientError> {
        (!self.degraded.is_empty()).then(|| ClientError::AggregationPartial(self.degraded.clone()))
    }

    pub fn indirect_count(&self) -> usize {
        self.indirect.iter().map(|g| g.members.len()).sum()
    }
}

fn settle<T>(result: Result<T>, slice: Slice, degraded: &mut Vec<Slice>, default: T) -> T {
    match result {
        Ok(value) => value,
        Err(e) => {
            warn!("dashboard slice {:?} failed: {}", slice, e);
            degraded.push(slice);
            default
        }
    }
}

/// builds a [`Dashboard`] from a [`ReferralSource`]
pub struct ReferralAggregator<S> {
    source: S,
    max_in_flight: usize,
    referral_base: String,
}

impl<S: ReferralSource> ReferralAggregator<S> {
    pub fn new(source: S, max_in_flight: usize, referral_base: impl Into<String>) -> Self {
        Self {
            source,
            max_in_flight: max_in_flight.max(1),
            referral_base: referral_base.into(),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub async fn load(&self, user: &Address) -> Dashboard {
        let user = *user;
        let source = &self.source;
        let mut degraded = Vec::new();

        let (earnings, eligibility, direct, record) = futures::join!(
            source.total_earnings(&user),
            source.level_eligibility(&user),
            source.referrals(&user),
            source.user(&user),
        );
        let earnings = settle(earnings, Slice::TotalEarnings, &mut degraded, U256::ZERO);
        let eligibility = settle(eligibility, Slice::LevelEligibility, &mut degraded, Vec::new());
        let direct = settle(direct, Slice::DirectReferrals, &mut degraded, Vec::new());
        let record = settle(record, Slice::UserRecord(user), &mut degraded, UserRecord::default());

        let incomes: Vec<(u8, Result<u64>)> = stream::iter(1..=MAX_LEVEL)
            .map(|level| async move { (level, source.income_count(&user, level).await) })
            .buffered(self.max_in_flight)
            .collect()
            .await;
        let level_incomes = incomes
            .into_iter()
            .map(|(level, count)| LevelIncome {
                level,
                count: settle(count, Slice::LevelIncome(level), &mut degraded, 0),
            })
            .collect();

        // depth is fixed at two: children of direct referrals are never expanded
        let second: Vec<(Address, Result<Vec<Address>>)> = stream::iter(direct.iter().copied())
            .map(|addr| async move { (addr, source.referrals(&addr).await) })
            .buffered(self.max_in_flight)
            .collect()
            .await;
        let second: Vec<(Address, Vec<Address>)> = second
            .into_iter()
            .map(|(addr, children)| {
                let children = settle(children, Slice::IndirectReferrals(addr), &mut degraded, Vec::new());
                (addr, children)
            })
            .collect();

        let mut seen = HashSet::new();
        let pending: Vec<Address> = direct
            .iter()
            .chain(second.iter().flat_map(|(_, c)| c.iter()))
            .copied()
            .filter(|a| seen.insert(*a))
            .collect();
        debug!("resolving {} referral records for {}", pending.len(), user);

        let resolved: Vec<(Address, Result<UserRecord>)> = stream::iter(pending)
            .map(|addr| async move { (addr, source.user(&addr).await) })
            .buffered(self.max_in_flight)
            .collect()
            .await;
        let mut records = HashMap::new();
        for (addr, result) in resolved {
            let rec = settle(result, Slice::UserRecord(addr), &mut degraded, UserRecord::default());
            records.insert(addr, rec);
        }
        let member = |address: &Address| {
            let rec = records.get(address).copied().unwrap_or_default();
            Member {
                id: rec.id,
                address: *address,
                joined: rec.joined,
            }
        };

        let direct_members: Vec<Member> = direct.iter().map(member).collect();
        let indirect: Vec<IndirectGroup> = second
            .iter()
            .map(|(by, children)| IndirectGroup {
                referred_by: *by,
                members: children.iter().map(member).collect(),
            })
            .collect();
        let tree = ReferralTree {
            root_id: record.id,
            branches: direct_members
                .iter()
                .zip(indirect.iter())
                .map(|(m, g)| TreeBranch {
                    member: *m,
                    children: g.members.clone(),
                })
                .collect(),
        };

        Dashboard {
            address: user,
            user: record,
            referral_link: format!("{}?ref={}", self.referral_base, record.id),
            total_earnings_wei: earnings,
            total_earnings: format_ether(earnings),
            level_status: generate_level_status(&eligibility),
            level_eligibility: eligibility,
            level_incomes,
            direct: direct_members,
            indirect,
            tree,
            degraded,
        }
    }
}
