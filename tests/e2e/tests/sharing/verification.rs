use anyhow::Result;
use custodia_e2e_tests::{fast_settings, Fixture};
use custodia_sharing::{
    NotificationKind, Operation, PairingStatus, Severity,
};
use custodia_test_utils::Behavior;
use custodia_wire::{
    ProtobufCodec, Response, ResultEnvelope, ResultStatus, VerifyResponse,
    WireCodec,
};
use http::StatusCode;
use pretty_assertions::assert_eq;
use std::time::Duration;

/// Tests every helper holding the latest protected version
/// proves it still holds its fragment.
#[tokio::test]
async fn verification_healthy() -> Result<()> {
    //crate::test_utils::init_tracing();
    let fixture = Fixture::new(3)?;
    let secret = fixture.paired_secret("healthy", 2).await?;

    assert!(secret.verify_now().await?.is_none());

    secret.update(b"value".to_vec(), None).await?;
    fixture
        .listener
        .wait_for_kind(NotificationKind::UpdateComplete)
        .await?;

    let report = secret.verify_now().await?.unwrap();
    assert_eq!(1, report.version);
    assert_eq!(3, report.entries.len());
    assert!(report.is_healthy());

    for helper in &fixture.helpers {
        assert_eq!(1, fixture.network.count(helper, Operation::Verify));
        let share = secret.helper(helper).unwrap().share(1).unwrap();
        assert!(share.last_verification().unwrap().is_success());
    }
    fixture
        .listener
        .wait_for_count(NotificationKind::VerifyProgress, 3)
        .await?;
    Ok(())
}

/// Tests failed verifications are reported as unhealthy.
#[tokio::test]
async fn verification_unhealthy() -> Result<()> {
    let fixture = Fixture::new(3)?;
    let secret = fixture.paired_secret("unhealthy", 2).await?;
    secret.update(b"value".to_vec(), None).await?;
    fixture
        .listener
        .wait_for_kind(NotificationKind::UpdateComplete)
        .await?;

    let forgetful = fixture.helpers[0].clone();
    let broken = fixture.helpers[1].clone();

    // Reachable helper that lost its fragment
    let missing = ProtobufCodec.encode_response(Response::Verify(
        VerifyResponse {
            result: ResultEnvelope::new(ResultStatus::NotFound, "lost"),
            version: 1,
            nonce: Vec::new(),
        },
    ))?;
    fixture.network.set_operation_behavior(
        &forgetful,
        Operation::Verify,
        Behavior::Body(missing),
    );
    fixture.network.set_operation_behavior(
        &broken,
        Operation::Verify,
        Behavior::Status(StatusCode::INTERNAL_SERVER_ERROR),
    );

    let report = secret.verify_now().await?.unwrap();
    assert!(!report.is_healthy());
    let unhealthy: Vec<_> =
        report.unhealthy().map(|entry| entry.helper.clone()).collect();
    assert_eq!(vec![forgetful.clone(), broken.clone()], unhealthy);

    // Transport failures fail the link, negative replies do not
    let statuses = secret.helper_statuses();
    assert_eq!(Some(&PairingStatus::Paired), statuses.get(&forgetful));
    assert_eq!(Some(&PairingStatus::Failed), statuses.get(&broken));

    let warning = fixture
        .listener
        .wait_for(|n| {
            n.kind() == NotificationKind::HelperUnhealthy
                && n.helper() == Some(&forgetful)
        })
        .await?;
    assert_eq!(Severity::Warning, warning.severity());
    assert_eq!(Some(1), warning.version());
    fixture
        .listener
        .wait_for_count(NotificationKind::HelperUnhealthy, 2)
        .await?;
    Ok(())
}

/// Tests verification runs periodically when an interval is set.
#[tokio::test]
async fn verification_periodic() -> Result<()> {
    let mut settings = fast_settings();
    settings.verify_interval = Some(Duration::from_millis(50));
    let fixture = Fixture::with_settings(2, settings)?;
    let secret = fixture.paired_secret("periodic", 1).await?;
    secret.update(b"value".to_vec(), None).await?;

    fixture
        .listener
        .wait_for_count(NotificationKind::VerifyProgress, 4)
        .await?;
    for helper in &fixture.helpers {
        assert!(fixture.network.count(helper, Operation::Verify) >= 2);
    }

    secret.close().await?;
    Ok(())
}

/// Tests a verification superseded by a newer one is left out
/// of the report instead of counting against the helper.
#[tokio::test]
async fn verification_superseded() -> Result<()> {
    let fixture = Fixture::new(3)?;
    let secret = fixture.paired_secret("superseded", 2).await?;
    secret.update(b"value".to_vec(), None).await?;
    fixture
        .listener
        .wait_for_kind(NotificationKind::UpdateComplete)
        .await?;

    for helper in &fixture.helpers {
        fixture.network.set_operation_behavior(
            helper,
            Operation::Verify,
            Behavior::Delay(Duration::from_millis(100)),
        );
    }

    let (first, second) =
        tokio::join!(secret.verify_now(), secret.verify_now());
    let first = first?.unwrap();
    let second = second?.unwrap();
    assert!(first.entries.is_empty());
    assert!(first.is_healthy());
    assert_eq!(3, second.entries.len());
    assert!(second.is_healthy());

    assert!(fixture
        .listener
        .of_kind(NotificationKind::HelperUnhealthy)
        .is_empty());
    for helper in &fixture.helpers {
        assert_eq!(
            Some(PairingStatus::Paired),
            secret.helper_statuses().get(helper).copied()
        );
    }
    Ok(())
}
