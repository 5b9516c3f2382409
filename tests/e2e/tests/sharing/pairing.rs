use anyhow::Result;
use custodia_e2e_tests::Fixture;
use custodia_helper::PairingPolicy;
use custodia_sharing::{
    Error, NotificationKind, Operation, PairingStatus, SecretId,
    SecretOptions,
};
use custodia_test_utils::Behavior;
use custodia_wire::{
    PairResponse, ProtobufCodec, Response, ResultEnvelope, WireCodec,
};
use http::StatusCode;
use pretty_assertions::assert_eq;

/// Tests every pairing outcome maps to its pairing status.
#[tokio::test]
async fn pairing_outcomes() -> Result<()> {
    //crate::test_utils::init_tracing();
    let fixture = Fixture::new(1)?;
    let accepting = fixture.helpers[0].clone();
    let refusing =
        fixture.network.add_helper("refusing", PairingPolicy::Refuse)?;
    let gone = fixture.network.add_helper("gone", PairingPolicy::Accept)?;
    let offline = fixture.network.add_helper("offline", PairingPolicy::Accept)?;
    let broken = fixture.network.add_helper("broken", PairingPolicy::Accept)?;
    fixture.network.set_behavior(&gone, Behavior::Gone);
    fixture
        .network
        .set_behavior(&offline, Behavior::Fail("unreachable".to_owned()));
    fixture.network.set_behavior(
        &broken,
        Behavior::Status(StatusCode::INTERNAL_SERVER_ERROR),
    );

    let secret = fixture
        .sharer
        .new_secret(SecretOptions::new(SecretId::from_name("outcomes")?, 1))?;
    let statuses = secret
        .add_helpers(vec![
            accepting.clone(),
            refusing.clone(),
            gone.clone(),
            offline.clone(),
            broken.clone(),
        ])
        .await?;

    assert_eq!(
        vec![
            (accepting.clone(), PairingStatus::Paired),
            (refusing.clone(), PairingStatus::Refused),
            (gone.clone(), PairingStatus::Gone),
            (offline.clone(), PairingStatus::Failed),
            (broken.clone(), PairingStatus::Failed),
        ],
        statuses
    );

    // Roster keeps insertion order
    let roster: Vec<_> = secret.helper_statuses().into_iter().collect();
    assert_eq!(statuses, roster);

    let listener = &fixture.listener;
    listener.wait_for_count(NotificationKind::HelperFailed, 2).await?;
    assert_eq!(1, listener.of_kind(NotificationKind::HelperPaired).len());
    assert_eq!(1, listener.of_kind(NotificationKind::HelperRefused).len());
    assert_eq!(1, listener.of_kind(NotificationKind::HelperGone).len());

    let refused = listener
        .wait_for_kind(NotificationKind::HelperRefused)
        .await?;
    assert_eq!(Some(&refusing), refused.helper());
    assert_eq!("pairing refused", refused.message());
    Ok(())
}

/// Tests asynchronous pairing returns one handle per helper.
#[tokio::test]
async fn pairing_handles() -> Result<()> {
    let fixture = Fixture::new(3)?;
    let secret = fixture
        .sharer
        .new_secret(SecretOptions::new(SecretId::from_name("handles")?, 2))?;

    let handles = secret.start_add_helpers(fixture.helpers.clone())?;
    assert_eq!(3, handles.len());
    for (handle, helper) in handles.into_iter().zip(&fixture.helpers) {
        assert_eq!(helper, handle.identity());
        assert_eq!(PairingStatus::Paired, handle.resolved().await);
    }
    for helper in &fixture.helpers {
        assert_eq!(1, fixture.network.count(helper, Operation::Pair));
        let service = fixture.network.service(helper).unwrap();
        assert_eq!(1, service.store().len());
    }
    Ok(())
}

/// Tests helpers already on the roster are rejected without
/// adding any of the requested helpers.
#[tokio::test]
async fn pairing_duplicate_helper() -> Result<()> {
    let fixture = Fixture::new(2)?;
    let secret = fixture
        .sharer
        .new_secret(SecretOptions::new(SecretId::from_name("duplicate")?, 1))?;

    let first = fixture.helpers[0].clone();
    let second = fixture.helpers[1].clone();

    let result = secret
        .add_helpers(vec![first.clone(), second.clone(), first.clone()])
        .await;
    assert!(matches!(result, Err(Error::DuplicateHelper(_))));
    assert!(secret.helper_statuses().is_empty());

    secret.add_helpers(vec![first.clone()]).await?;
    let result = secret.add_helpers(vec![second.clone(), first.clone()]).await;
    assert!(matches!(
        result,
        Err(Error::DuplicateHelper(name)) if name == "helper-1"
    ));
    assert_eq!(1, secret.helper_statuses().len());
    Ok(())
}

/// Tests a failed pairing may be attempted again.
#[tokio::test]
async fn pairing_retry_after_failure() -> Result<()> {
    let fixture = Fixture::new(2)?;
    let helper = fixture.helpers[0].clone();
    fixture
        .network
        .set_behavior(&helper, Behavior::Fail("unreachable".to_owned()));

    let secret = fixture
        .sharer
        .new_secret(SecretOptions::new(SecretId::from_name("retry")?, 2))?;
    let statuses = secret.add_helpers(fixture.helpers.clone()).await?;
    assert_eq!(PairingStatus::Failed, statuses[0].1);
    assert!(!secret.is_available());

    fixture.network.set_behavior(&helper, Behavior::Respond);
    let handles = secret.retry_pairing(vec![helper.clone()])?;
    assert_eq!(1, handles.len());
    for handle in handles {
        assert_eq!(PairingStatus::Paired, handle.resolved().await);
    }
    assert!(secret.is_available());
    Ok(())
}

/// Tests an acceptance that cannot be opened fails the pairing.
#[tokio::test]
async fn pairing_rejects_forged_acceptance() -> Result<()> {
    let fixture = Fixture::new(1)?;
    let helper = fixture.helpers[0].clone();
    let forged = ProtobufCodec.encode_response(Response::Pair(PairResponse {
        result: ResultEnvelope::ok(),
        sealed_acceptance: vec![0u8; 64],
    }))?;
    fixture
        .network
        .set_operation_behavior(
            &helper,
            Operation::Pair,
            Behavior::Body(forged),
        );

    let secret = fixture
        .sharer
        .new_secret(SecretOptions::new(SecretId::from_name("forged")?, 1))?;
    let statuses = secret.add_helpers(vec![helper.clone()]).await?;
    assert_eq!(PairingStatus::Failed, statuses[0].1);

    let client = secret.helper(&helper).unwrap();
    let result = client.last_result().unwrap();
    assert_eq!(Operation::Pair, result.operation());
    assert!(!result.is_success());
    Ok(())
}

/// Tests operations that are not valid for the pairing status.
#[tokio::test]
async fn pairing_invalid_transitions() -> Result<()> {
    let fixture = Fixture::new(2)?;
    let secret = fixture.paired_secret("transitions", 1).await?;
    secret.update(b"value".to_vec(), None).await?;

    let paired = secret.helper(&fixture.helpers[0]).unwrap();
    assert!(matches!(
        paired.pair(),
        Err(Error::InvalidStateTransition {
            operation: Operation::Pair,
            status: PairingStatus::Paired,
            ..
        })
    ));

    // Drive the second helper to failed
    let failing = fixture.helpers[1].clone();
    fixture
        .network
        .set_behavior(&failing, Behavior::Fail("unreachable".to_owned()));
    let report = secret.verify_now().await?.unwrap();
    assert!(!report.is_healthy());

    let client = secret.helper(&failing).unwrap();
    assert_eq!(PairingStatus::Failed, client.status());
    let share = client.share(1).unwrap();
    assert!(matches!(
        client.send(share.clone()),
        Err(Error::InvalidStateTransition {
            operation: Operation::Store,
            ..
        })
    ));
    assert!(matches!(
        client.verify(share),
        Err(Error::InvalidStateTransition {
            operation: Operation::Verify,
            ..
        })
    ));
    assert!(matches!(
        client.retrieve(1).await,
        Err(Error::InvalidStateTransition {
            operation: Operation::Retrieve,
            ..
        })
    ));
    assert!(matches!(
        client.unpair(),
        Err(Error::InvalidStateTransition { .. })
    ));
    Ok(())
}
