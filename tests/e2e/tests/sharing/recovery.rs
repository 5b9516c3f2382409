use anyhow::Result;
use custodia_e2e_tests::Fixture;
use custodia_sharing::{Error, Operation, PairingStatus, VersionState};
use custodia_test_utils::Behavior;
use custodia_wire::{
    ProtobufCodec, Response, ResultEnvelope, RetrieveResponse, WireCodec,
};
use pretty_assertions::assert_eq;
use secrecy::ExposeSecret;

/// Tests the latest protected version is recovered from the
/// helpers holding it.
#[tokio::test]
async fn recovery_latest_version() -> Result<()> {
    //crate::test_utils::init_tracing();
    let fixture = Fixture::new(5)?;
    let secret = fixture.paired_secret("recovery", 3).await?;

    secret.update(b"first".to_vec(), None).await?;
    secret
        .update(b"second".to_vec(), Some("rotated".to_owned()))
        .await?;

    let value = secret.recover(None).await?;
    assert_eq!(b"second", value.expose_secret());

    let value = secret.recover(Some(1)).await?;
    assert_eq!(b"first", value.expose_secret());

    let version = secret.version(2).unwrap();
    assert_eq!(Some("rotated"), version.description());
    assert_eq!(b"second", version.value().expose_secret());
    Ok(())
}

/// Tests recovery tolerates helpers that fail up to the
/// recovery threshold.
#[tokio::test]
async fn recovery_with_failing_helpers() -> Result<()> {
    let fixture = Fixture::new(5)?;
    let secret = fixture.paired_secret("tolerant", 3).await?;
    secret.update(b"tolerant".to_vec(), None).await?;

    for helper in &fixture.helpers[..2] {
        fixture.network.set_operation_behavior(
            helper,
            Operation::Retrieve,
            Behavior::Fail("connection reset".to_owned()),
        );
    }

    let value = secret.recover(None).await?;
    assert_eq!(b"tolerant", value.expose_secret());
    Ok(())
}

/// Tests recovery fails when too few fragments can be retrieved.
#[tokio::test]
async fn recovery_below_threshold() -> Result<()> {
    let fixture = Fixture::new(3)?;
    let secret = fixture.paired_secret("unrecoverable", 2).await?;
    secret.update(b"value".to_vec(), None).await?;

    for helper in &fixture.helpers[..2] {
        fixture.network.set_operation_behavior(
            helper,
            Operation::Retrieve,
            Behavior::Status(http::StatusCode::SERVICE_UNAVAILABLE),
        );
    }

    let result = secret.recover(None).await;
    assert!(matches!(
        result,
        Err(Error::RecoveryFailed {
            version: 1,
            have: 1,
            need: 2,
        })
    ));

    // Transport failures fail the links
    for helper in &fixture.helpers[..2] {
        assert_eq!(
            Some(PairingStatus::Failed),
            secret.helper_statuses().get(helper).copied()
        );
    }
    Ok(())
}

/// Tests a forged fragment from a helper fails the recovery
/// as an error.
#[tokio::test]
async fn recovery_forged_fragment() -> Result<()> {
    let fixture = Fixture::new(1)?;
    let secret = fixture.paired_secret("forged", 1).await?;
    secret.update(b"value".to_vec(), None).await?;

    // Header claiming far more chunks than the body holds
    let forged = vec![1, 0, 1, 1, 0, 0, 0, 0, 0xff, 0xff, 0xff, 0xff];
    let body =
        ProtobufCodec.encode_response(Response::Retrieve(RetrieveResponse {
            result: ResultEnvelope::ok(),
            version: 1,
            fragment: forged,
        }))?;
    fixture.network.set_operation_behavior(
        &fixture.helpers[0],
        Operation::Retrieve,
        Behavior::Body(body),
    );

    let result = secret.recover(None).await;
    assert!(matches!(result, Err(Error::Fragments(_))));
    assert_eq!(
        Some(PairingStatus::Paired),
        secret.helper_statuses().get(&fixture.helpers[0]).copied()
    );
    Ok(())
}

/// Tests only protected versions can be recovered.
#[tokio::test]
async fn recovery_version_not_found() -> Result<()> {
    let fixture = Fixture::new(3)?;
    let secret = fixture.paired_secret("missing", 3).await?;

    assert!(matches!(
        secret.recover(None).await,
        Err(Error::VersionNotFound(0))
    ));

    fixture.network.set_operation_behavior(
        &fixture.helpers[0],
        Operation::Store,
        Behavior::Fail("connection reset".to_owned()),
    );
    let outcome = secret.update(b"value".to_vec(), None).await?;
    assert_eq!(VersionState::Failed, outcome.state);

    assert!(matches!(
        secret.recover(Some(1)).await,
        Err(Error::VersionNotFound(1))
    ));
    assert!(matches!(
        secret.recover(Some(7)).await,
        Err(Error::VersionNotFound(7))
    ));
    Ok(())
}
