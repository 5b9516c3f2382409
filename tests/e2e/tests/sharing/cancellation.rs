use anyhow::Result;
use custodia_e2e_tests::Fixture;
use custodia_sharing::{
    DeliveryState, NotificationKind, Operation, VersionState,
};
use custodia_test_utils::Behavior;
use pretty_assertions::assert_eq;
use std::time::Duration;

/// Tests a second update supersedes a version that has
/// not resolved.
#[tokio::test]
async fn cancellation_superseded_update() -> Result<()> {
    //crate::test_utils::init_tracing();
    let fixture = Fixture::new(5)?;
    let secret = fixture.paired_secret("superseded", 3).await?;

    for helper in &fixture.helpers {
        fixture.network.set_operation_behavior(
            helper,
            Operation::Store,
            Behavior::Delay(Duration::from_millis(100)),
        );
    }

    let first = secret.start_update(b"first".to_vec(), None)?;
    let second = secret.start_update(b"second".to_vec(), None)?;

    let outcome = first.resolved().await;
    assert_eq!(VersionState::Canceled, outcome.state);
    assert_eq!(0, outcome.success);
    for share in first.shares() {
        assert_eq!(DeliveryState::Canceled, share.completed().await);
    }

    let outcome = second.resolved().await;
    assert_eq!(VersionState::Protected, outcome.state);

    let latest = secret.latest_version().unwrap();
    assert_eq!(2, latest.number());
    assert!(latest.is_protected());
    assert_eq!(VersionState::Canceled, secret.version(1).unwrap().state());

    let canceled = fixture
        .listener
        .wait_for_kind(NotificationKind::UpdateCanceled)
        .await?;
    assert_eq!(Some(1), canceled.version());
    Ok(())
}

/// Tests late replies for a canceled version are discarded.
#[tokio::test]
async fn cancellation_discards_late_replies() -> Result<()> {
    let fixture = Fixture::new(3)?;
    let secret = fixture.paired_secret("late", 2).await?;

    for helper in &fixture.helpers {
        fixture.network.set_operation_behavior(
            helper,
            Operation::Store,
            Behavior::Delay(Duration::from_millis(150)),
        );
    }
    let first = secret.start_update(b"first".to_vec(), None)?;

    // Second update goes straight through
    for helper in &fixture.helpers {
        fixture.network.set_behavior(helper, Behavior::Respond);
    }
    let outcome = secret.update(b"second".to_vec(), None).await?;
    assert!(outcome.is_protected());

    tokio::time::sleep(Duration::from_millis(300)).await;
    let outcome = first.outcome();
    assert_eq!(VersionState::Canceled, outcome.state);
    assert_eq!(0, outcome.success);
    assert_eq!(0, outcome.failure);
    assert!(fixture
        .listener
        .of_kind(NotificationKind::UpdateProgress)
        .iter()
        .all(|n| n.version() == Some(2)));
    Ok(())
}

/// Tests closing a secret cancels its pending version and
/// rejects further updates.
#[tokio::test]
async fn cancellation_close_cancels_pending_version() -> Result<()> {
    let fixture = Fixture::new(3)?;
    let secret = fixture.paired_secret("closing", 2).await?;

    for helper in &fixture.helpers {
        fixture.network.set_operation_behavior(
            helper,
            Operation::Store,
            Behavior::Delay(Duration::from_millis(200)),
        );
    }
    let version = secret.start_update(b"value".to_vec(), None)?;
    secret.close().await?;

    assert_eq!(VersionState::Canceled, version.resolved().await.state);
    assert!(matches!(
        secret.update(b"again".to_vec(), None).await,
        Err(custodia_sharing::Error::SecretClosed(_))
    ));
    Ok(())
}
