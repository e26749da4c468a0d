//! Accounts running their course: reminder cadence, the terminal
//! sweep, and what the user can do afterwards.

use crate::integration::world;
use chrono::Duration as ChronoDuration;
use shared_bus::{CoreEvent, EventFilter, EventTopic};
use shared_types::{AccountStatus, UserId};
use tb_expiry::SweepReport;
use tb_store::StateStore;

#[tokio::test]
async fn test_provisioned_account_runs_its_course() {
    let w = world();
    let mut events = w.bus.subscribe(EventFilter::topics(vec![EventTopic::Expiry]));
    let account = w.provisioned_account(1, "premium-30").await;

    // Day 0: nothing near expiry.
    assert_eq!(w.monitor.sweep().await.unwrap(), SweepReport::default());

    // Day 23: seven days left.
    w.clock.advance(ChronoDuration::days(23));
    assert_eq!(w.monitor.sweep().await.unwrap().reminders, 1);
    assert_eq!(w.monitor.sweep().await.unwrap().reminders, 0);

    // Day 27 and day 29: the 3- and 1-day crossings.
    w.clock.advance(ChronoDuration::days(4));
    assert_eq!(w.monitor.sweep().await.unwrap().reminders, 1);
    w.clock.advance(ChronoDuration::days(2));
    assert_eq!(w.monitor.sweep().await.unwrap().reminders, 1);

    // Day 31: the window has lapsed.
    w.clock.advance(ChronoDuration::days(2));
    let report = w.monitor.sweep().await.unwrap();
    assert_eq!(report.expired, 1);
    assert_eq!(w.monitor.sweep().await.unwrap(), SweepReport::default());

    let swept = w.store.get_account(&account.account_id).await.unwrap().unwrap();
    assert_eq!(swept.status, AccountStatus::Expired);
    assert!(w.registry.get_active_account(UserId(1)).await.unwrap().is_none());

    let mut thresholds = Vec::new();
    loop {
        match events.try_recv().unwrap() {
            Some(CoreEvent::ExpiryReminderDue { threshold, .. }) => thresholds.push(threshold.0),
            Some(CoreEvent::AccountExpired { account_id, .. }) => {
                assert_eq!(account_id, account.account_id);
                break;
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }
    assert_eq!(thresholds, vec![7, 3, 1]);
}

#[tokio::test]
async fn test_expired_user_renews_into_a_fresh_account() {
    let w = world();
    let first = w.provisioned_account(1, "premium-30").await;

    w.clock.advance(ChronoDuration::days(31));
    assert_eq!(w.monitor.sweep().await.unwrap().expired, 1);

    // The renewal is a new order, a new identity, a new account row.
    let second = w.provisioned_account(1, "premium-30").await;
    assert_ne!(first.account_id, second.account_id);
    assert_ne!(first.username, second.username);

    let active = w.registry.get_active_account(UserId(1)).await.unwrap().unwrap();
    assert_eq!(active.account_id, second.account_id);
    assert_eq!(w.transport.remote_users().len(), 2);
}

#[tokio::test]
async fn test_mixed_fleet_sweep_touches_only_what_lapsed() {
    let w = world();
    let trial = w.provisioned_account(2, "trial-3").await;
    let premium = w.provisioned_account(1, "premium-30").await;

    // The trial is born already inside the 3-day band.
    assert_eq!(w.monitor.sweep().await.unwrap().reminders, 1);

    // Day 2: the trial crosses 1; the premium stays quiet.
    w.clock.advance(ChronoDuration::days(2));
    let report = w.monitor.sweep().await.unwrap();
    assert_eq!(report, SweepReport { expired: 0, reminders: 1 });

    // Day 4: the trial lapses, the premium is untouched.
    w.clock.advance(ChronoDuration::days(2));
    assert_eq!(w.monitor.sweep().await.unwrap().expired, 1);

    let trial = w.store.get_account(&trial.account_id).await.unwrap().unwrap();
    assert_eq!(trial.status, AccountStatus::Expired);
    let premium = w.store.get_account(&premium.account_id).await.unwrap().unwrap();
    assert_eq!(premium.status, AccountStatus::Active);
}
