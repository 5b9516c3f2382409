use anyhow::Result;
use custodia_e2e_tests::Fixture;
use custodia_sharing::{NotificationKind, Operation, PairingStatus};
use custodia_test_utils::Behavior;
use pretty_assertions::assert_eq;

/// Tests availability follows the number of paired helpers.
#[tokio::test]
async fn availability_transitions() -> Result<()> {
    //crate::test_utils::init_tracing();
    let fixture = Fixture::new(3)?;
    let secret = fixture.paired_secret("availability", 2).await?;
    assert!(secret.is_available());

    let listener = &fixture.listener;
    listener.wait_for_kind(NotificationKind::SecretAvailable).await?;

    // Still above the threshold
    secret.helper_gone(&fixture.helpers[0]);
    assert_eq!(
        Some(PairingStatus::Gone),
        secret.helper_statuses().get(&fixture.helpers[0]).copied()
    );
    assert!(secret.is_available());

    secret.helper_gone(&fixture.helpers[1]);
    assert!(!secret.is_available());
    let unavailable = listener
        .wait_for_kind(NotificationKind::SecretUnavailable)
        .await?;
    assert_eq!(secret.id(), unavailable.secret_id());

    listener.wait_for_count(NotificationKind::HelperGone, 2).await?;
    assert_eq!(1, listener.of_kind(NotificationKind::SecretAvailable).len());
    assert_eq!(1, listener.of_kind(NotificationKind::SecretUnavailable).len());
    Ok(())
}

/// Tests a helper answering gone is marked gone.
#[tokio::test]
async fn availability_helper_gone_reply() -> Result<()> {
    let fixture = Fixture::new(2)?;
    let secret = fixture.paired_secret("gone-reply", 1).await?;

    let gone = fixture.helpers[1].clone();
    fixture
        .network
        .set_operation_behavior(&gone, Operation::Store, Behavior::Gone);

    let outcome = secret.update(b"value".to_vec(), None).await?;
    assert!(outcome.is_protected());

    let notification = fixture
        .listener
        .wait_for_kind(NotificationKind::HelperGone)
        .await?;
    assert_eq!(Some(&gone), notification.helper());
    assert_eq!(
        Some(PairingStatus::Gone),
        secret.helper_statuses().get(&gone).copied()
    );
    assert!(secret.is_available());

    // Gone helpers receive no further versions
    let version = secret.start_update(b"next".to_vec(), None)?;
    assert_eq!(1, version.shares().len());
    assert!(version.resolved().await.is_protected());
    Ok(())
}

/// Tests availability changes are announced after the helper
/// events that caused them.
#[tokio::test]
async fn availability_follows_helper_events() -> Result<()> {
    let fixture = Fixture::new(2)?;
    let secret = fixture.paired_secret("ordering", 2).await?;
    secret.helper_gone(&fixture.helpers[0]);

    let listener = &fixture.listener;
    listener
        .wait_for_kind(NotificationKind::SecretUnavailable)
        .await?;

    let kinds = listener.kinds();
    let position = |kind: NotificationKind| {
        kinds.iter().position(|k| *k == kind).unwrap()
    };
    let paired: Vec<_> = kinds
        .iter()
        .enumerate()
        .filter(|(_, kind)| **kind == NotificationKind::HelperPaired)
        .map(|(index, _)| index)
        .collect();
    assert_eq!(2, paired.len());
    assert!(paired[1] < position(NotificationKind::SecretAvailable));
    assert!(
        position(NotificationKind::HelperGone)
            < position(NotificationKind::SecretUnavailable)
    );
    Ok(())
}
