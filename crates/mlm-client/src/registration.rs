//! on-chain registration flow

use crate::context::ClientContext;
use crate::contract::{ContractHandle, RegistrationEvent};
use crate::error::{ClientError, Result, GENERIC_REVERT};
use crate::provider;
use crate::referral::{extract_referral_code, ReferralCode};
use crate::types::{format_ether, Address, U256};
use crate::ui::{Notice, Page, Prompt};
use tracing::{debug, info, warn};

/// referral shown on the register page before submitting
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReferralPreview {
    pub code: ReferralCode,
    /// wallet registered under the code, if any
    pub referrer: Option<Address>,
}

/// confirmed registration
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Registration {
    pub account: Address,
    pub transaction_hash: String,
    pub event: RegistrationEvent,
}

/// apply a percent multiplier, rounding down
fn scale(value: U256, percent: u32) -> U256 {
    value.saturating_mul(U256::from(percent)) / U256::from(100)
}

impl ClientContext {
    /// extract the referral code from `url` and resolve the referrer wallet
    pub async fn check_referral(&self, url: &str) -> Result<Option<ReferralPreview>> {
        let code = extract_referral_code(url);
        *self.pending_referrer.write() = code.clone();
        let Some(code) = code else {
            debug!("no referral code in {}", url);
            return Ok(None);
        };

        let referrer = match code.referrer_id() {
            Ok(id) => {
                let wallet = self.reader().await?.user_list(id).await?;
                (!wallet.is_zero()).then_some(wallet)
            }
            Err(_) => None,
        };
        info!("referral code {} resolves to {:?}", code, referrer);
        Ok(Some(ReferralPreview { code, referrer }))
    }

    /// set the referral code directly
    pub fn set_referrer(&self, code: Option<ReferralCode>) {
        *self.pending_referrer.write() = code;
    }

    /// register the wallet account under the pending referrer
    pub async fn register(&self) -> Result<Registration> {
        let generation = self.generation();
        self.presenter.set_busy(true);

        let result = self.try_register(generation).await;
        self.set_committing(None);
        match result {
            Ok(registration) => {
                self.notify(Notice::success("Registration successful!"));
                tokio::time::sleep(self.config.redirect_delay()).await;
                if self.generation() == generation {
                    self.presenter.redirect(Page::Dashboard);
                }
                Ok(registration)
            }
            Err(e) => {
                warn!("registration failed: {}", e);
                self.presenter.set_busy(false);
                if e == ClientError::Denied {
                    self.notify(Notice::info("Registration cancelled"));
                } else {
                    self.notify(Notice::error(format!("Registration failed: {}", e.user_message())));
                }
                Err(e)
            }
        }
    }

    async fn try_register(&self, generation: u64) -> Result<Registration> {
        let wallet = self.require_wallet()?;
        self.guard.ensure_compliant(wallet.as_ref()).await?;

        let accounts = provider::request_accounts(wallet.as_ref()).await?;
        let account = *accounts.first().ok_or(ClientError::NoAccounts)?;
        self.set_committing(Some(account));

        let prompt = Prompt::new("Confirm Registration", format!("Register with address: {account}"));
        if !self.presenter.confirm(&prompt).await {
            return Err(ClientError::Denied);
        }
        if self.generation() != generation {
            return Err(ClientError::SessionInvalidated);
        }

        let referrer_id = self
            .pending_referrer()
            .ok_or(ClientError::InvalidReferrer)?
            .referrer_id()?;

        let handle = self.gateway.signed(Some(wallet)).await?;
        let registration = self.submit(&handle, account, referrer_id).await?;

        if self.generation() != generation {
            return Err(ClientError::SessionInvalidated);
        }
        self.session.set_current_account(&account)?;
        *self.account.write() = Some(account);
        self.set_auth_state(crate::auth::AuthState::Authenticated { account });
        Ok(registration)
    }

    async fn submit(&self, handle: &ContractHandle, account: Address, referrer_id: u64) -> Result<Registration> {
        let fee = self.config.fee_wei()?;
        let estimate = handle.estimate_reg_user(&account, referrer_id, fee).await?;
        let gas = scale(estimate, self.config.gas_limit_percent);
        let gas_price = scale(handle.gas_price().await?, self.config.gas_price_percent);
        info!(
            "registering {} under {} (value {} BNB, gas {}, gas price {})",
            account,
            referrer_id,
            format_ether(fee),
            gas,
            gas_price
        );

        let hash = handle
            .send_reg_user(&account, referrer_id, fee, gas, gas_price)
            .await?;
        self.notify(Notice::info("Transaction submitted. Don't refresh the page."));

        let receipt = handle
            .wait_for_receipt(&hash, self.config.receipt_poll(), self.config.receipt_timeout())
            .await?;
        if !receipt.status {
            return Err(ClientError::ContractRevert(GENERIC_REVERT.into()));
        }

        match handle.registration_event(&receipt)? {
            Some(event) if event.user == account => Ok(Registration {
                account,
                transaction_hash: hash,
                event,
            }),
            Some(event) => {
                warn!("registration event for {} while registering {}", event.user, account);
                Err(ClientError::NoRegistrationEvent)
            }
            None => Err(ClientError::NoRegistrationEvent),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale() {
        assert_eq!(scale(U256::from(21_000), 120), U256::from(25_200));
        assert_eq!(scale(U256::from(1_000_000_001u64), 100), U256::from(1_000_000_001u64));
        assert_eq!(scale(U256::from(7), 150), U256::from(10));
        assert_eq!(scale(U256::MAX, 120), U256::MAX / U256::from(100));
    }
}
