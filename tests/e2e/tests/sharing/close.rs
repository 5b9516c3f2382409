use anyhow::Result;
use custodia_e2e_tests::Fixture;
use custodia_sharing::{
    CloseOutcome, Error, NotificationKind, Operation, PairingStatus,
    SecretId, SecretOptions, Severity,
};
use custodia_test_utils::Behavior;
use pretty_assertions::assert_eq;

/// Tests closing a secret removes every paired helper.
#[tokio::test]
async fn close_removes_helpers() -> Result<()> {
    //crate::test_utils::init_tracing();
    let fixture = Fixture::new(3)?;
    let secret = fixture.paired_secret("close", 2).await?;
    secret.update(b"value".to_vec(), None).await?;

    let outcome = secret.close().await?;
    assert_eq!(
        CloseOutcome {
            removed: 3,
            failed: 0,
            deleted: true,
        },
        outcome
    );
    assert!(secret.is_closed());
    assert!(!secret.is_available());

    for (helper, status) in secret.helper_statuses() {
        assert_eq!(PairingStatus::Removed, status);
        let service = fixture.network.service(&helper).unwrap();
        assert!(service.store().is_empty());
    }

    let closed = fixture
        .listener
        .wait_for_kind(NotificationKind::SecretClosed)
        .await?;
    assert_eq!(Severity::Info, closed.severity());
    fixture
        .listener
        .wait_for_count(NotificationKind::HelperUnpaired, 3)
        .await?;

    assert!(matches!(secret.close().await, Err(Error::SecretClosed(_))));
    assert!(matches!(
        secret.recover(None).await,
        Err(Error::SecretClosed(_))
    ));
    assert!(matches!(
        secret.add_helpers(fixture.helpers.clone()).await,
        Err(Error::SecretClosed(_))
    ));
    Ok(())
}

/// Tests unpair requests are retried before the helper is
/// marked as failed.
#[tokio::test]
async fn close_unpair_retries_exhausted() -> Result<()> {
    let fixture = Fixture::new(3)?;
    let secret = fixture.paired_secret("retries", 2).await?;

    let stubborn = fixture.helpers[2].clone();
    fixture.network.set_operation_behavior(
        &stubborn,
        Operation::Unpair,
        Behavior::Fail("connection refused".to_owned()),
    );

    let outcome = secret.close().await?;
    assert_eq!(2, outcome.removed);
    assert_eq!(1, outcome.failed);
    assert!(outcome.deleted);

    assert_eq!(3, fixture.network.count(&stubborn, Operation::Unpair));
    assert_eq!(
        Some(PairingStatus::Failed),
        secret.helper_statuses().get(&stubborn).copied()
    );
    let failed = fixture
        .listener
        .wait_for_kind(NotificationKind::UnpairFailed)
        .await?;
    assert_eq!(Some(&stubborn), failed.helper());
    assert_eq!(Severity::Error, failed.severity());
    Ok(())
}

/// Tests the deletion threshold decides whether the secret
/// counts as deleted.
#[tokio::test]
async fn close_below_deletion_threshold() -> Result<()> {
    let fixture = Fixture::new(3)?;
    let secret = fixture.sharer.new_secret(
        SecretOptions::new(SecretId::from_name("deletion")?, 1)
            .with_deletion_threshold(3),
    )?;
    secret.add_helpers(fixture.helpers.clone()).await?;

    fixture.network.set_operation_behavior(
        &fixture.helpers[0],
        Operation::Unpair,
        Behavior::Fail("connection refused".to_owned()),
    );

    let outcome = secret.close().await?;
    assert_eq!(2, outcome.removed);
    assert!(!outcome.deleted);

    let closed = fixture
        .listener
        .wait_for_kind(NotificationKind::SecretClosed)
        .await?;
    assert_eq!(Severity::Warning, closed.severity());
    Ok(())
}

/// Tests helpers that never paired are dropped without
/// contacting them.
#[tokio::test]
async fn close_drops_unpaired_helpers() -> Result<()> {
    let fixture = Fixture::new(2)?;
    let offline = fixture.helpers[1].clone();
    fixture
        .network
        .set_operation_behavior(
            &offline,
            Operation::Pair,
            Behavior::Fail("unreachable".to_owned()),
        );

    let secret = fixture
        .sharer
        .new_secret(SecretOptions::new(SecretId::from_name("drop")?, 1))?;
    secret.add_helpers(fixture.helpers.clone()).await?;

    let outcome = secret.close().await?;
    assert_eq!(1, outcome.removed);
    assert_eq!(0, outcome.failed);
    assert_eq!(0, fixture.network.count(&offline, Operation::Unpair));
    assert_eq!(
        Some(PairingStatus::Removed),
        secret.helper_statuses().get(&offline).copied()
    );
    Ok(())
}
