//! dashboard page against the scripted contract

mod common;

use common::{addr, registered, setup, MockWallet, RecordingPresenter};
use mlm_client::{ClientError, Page, Slice, MAX_LEVEL, U256};
use std::sync::Arc;

fn populated(account: mlm_client::Address) -> Arc<MockWallet> {
    let wallet = MockWallet::new(204, vec![account]);
    {
        let mut contract = wallet.contract.lock();
        contract.users.insert(account, registered(7));
        for n in 2..=4 {
            contract.users.insert(addr(n), registered(u64::from(n) * 10));
        }
        contract.referrals.insert(account, vec![addr(2), addr(3)]);
        contract.referrals.insert(addr(2), vec![addr(4)]);
        contract.referrals.insert(addr(4), vec![addr(5)]);
        contract.eligibility.insert(account, vec![1, 2, 5]);
        contract.earnings.insert(account, U256::from(1_500_000_000_000_000_000u128));
    }
    wallet
}

#[tokio::test(start_paused = true)]
async fn test_dashboard_for_logged_in_account() {
    let account = addr(1);
    let wallet = populated(account);
    let presenter = RecordingPresenter::new(true);
    let ctx = setup(&wallet, &presenter);
    ctx.session().set_current_account(&account).unwrap();

    let dashboard = ctx.init_dashboard_page().await.unwrap();

    assert_eq!(dashboard.user.id, 7);
    assert_eq!(dashboard.referral_link, "https://yourwebsite.com/register?ref=7");
    assert_eq!(dashboard.total_earnings, "1.5");
    assert_eq!(dashboard.level_status.len(), usize::from(MAX_LEVEL));
    assert!(dashboard.level_status[4].active);
    assert!(!dashboard.level_status[3].active);
    assert_eq!(dashboard.level_incomes[11].count, 12);

    let direct: Vec<u64> = dashboard.direct.iter().map(|m| m.id).collect();
    assert_eq!(direct, vec![20, 30]);
    assert_eq!(dashboard.indirect_count(), 1);
    assert_eq!(dashboard.indirect[0].members[0].address, addr(4));
    assert!(dashboard.indirect[1].members.is_empty());
    assert!(dashboard.degraded.is_empty());
    // grandchildren of direct referrals are not walked
    assert!(dashboard.indirect.iter().all(|g| g.members.iter().all(|m| m.address != addr(5))));

    let tree = dashboard.tree.render();
    assert_eq!(
        tree,
        "YOU (7)\n├── 20\n│   └── 40\n└── 30\n    └── No indirect referrals\n"
    );
    assert_eq!(ctx.selected_provider().unwrap().info.rdns, "io.metamask");
}

#[tokio::test(start_paused = true)]
async fn test_dashboard_degrades_failed_slice() {
    let account = addr(1);
    let wallet = populated(account);
    wallet.contract.lock().fail_earnings = true;
    let presenter = RecordingPresenter::new(true);
    let ctx = setup(&wallet, &presenter);
    ctx.session().set_current_account(&account).unwrap();

    let dashboard = ctx.init_dashboard_page().await.unwrap();

    assert_eq!(dashboard.total_earnings, "0");
    assert_eq!(dashboard.degraded, vec![Slice::TotalEarnings]);
    assert!(matches!(dashboard.partial(), Some(ClientError::AggregationPartial(_))));
    // the rest still loads
    assert_eq!(dashboard.direct.len(), 2);
    assert!(presenter
        .messages()
        .contains(&"Some dashboard data could not be loaded".to_string()));
}

#[tokio::test(start_paused = true)]
async fn test_dashboard_requires_login() {
    let wallet = populated(addr(1));
    let presenter = RecordingPresenter::new(true);
    let ctx = setup(&wallet, &presenter);

    assert_eq!(
        ctx.init_dashboard_page().await.unwrap_err(),
        ClientError::SessionInvalidated
    );
    assert!(presenter.messages().contains(&"User is not logged in.".to_string()));
    assert_eq!(presenter.last_redirect(), Some(Page::WalletSelect));
}

#[tokio::test(start_paused = true)]
async fn test_dashboard_without_referrals() {
    let account = addr(1);
    let wallet = MockWallet::new(204, vec![account]);
    wallet.contract.lock().users.insert(account, registered(3));
    let presenter = RecordingPresenter::new(true);
    let ctx = setup(&wallet, &presenter);

    let dashboard = ctx.load_dashboard(&account).await.unwrap();
    assert!(dashboard.direct.is_empty());
    assert!(dashboard.level_status.iter().all(|s| !s.active));
    assert_eq!(dashboard.tree.render(), "YOU (3)\n└── No direct referrals\n");
}
