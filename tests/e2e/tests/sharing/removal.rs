use anyhow::Result;
use custodia_e2e_tests::Fixture;
use custodia_sharing::{NotificationKind, Operation, PairingStatus};
use custodia_test_utils::helper_identity;
use pretty_assertions::assert_eq;

/// Tests removing helpers deletes their pairing.
#[tokio::test]
async fn removal_unpairs_helpers() -> Result<()> {
    //crate::test_utils::init_tracing();
    let fixture = Fixture::new(3)?;
    let secret = fixture.paired_secret("removal", 2).await?;
    secret.update(b"value".to_vec(), None).await?;

    let removed = fixture.helpers[0].clone();
    let unknown =
        helper_identity("unknown", "mock://unknown/".parse()?)?;
    let statuses = secret
        .remove_helpers(vec![removed.clone(), unknown])
        .await?;
    assert_eq!(vec![(removed.clone(), PairingStatus::Removed)], statuses);

    let service = fixture.network.service(&removed).unwrap();
    assert!(service.store().is_empty());
    assert_eq!(1, fixture.network.count(&removed, Operation::Unpair));

    let unpaired = fixture
        .listener
        .wait_for_kind(NotificationKind::HelperUnpaired)
        .await?;
    assert_eq!(Some(&removed), unpaired.helper());

    // Removed helpers receive no further versions
    let version = secret.start_update(b"next".to_vec(), None)?;
    assert_eq!(2, version.shares().len());
    assert!(version.share(&removed).is_none());
    assert!(version.resolved().await.is_protected());

    // Removing again is a no-op
    let statuses = secret.remove_helpers(vec![removed.clone()]).await?;
    assert!(statuses.is_empty());
    Ok(())
}

/// Tests a helper whose removal was confirmed may pair again.
#[tokio::test]
async fn removal_then_add_again() -> Result<()> {
    let fixture = Fixture::new(2)?;
    let secret = fixture.paired_secret("readd", 2).await?;

    let helper = fixture.helpers[1].clone();
    secret.remove_helpers(vec![helper.clone()]).await?;
    assert!(!secret.is_available());

    let statuses = secret.add_helpers(vec![helper.clone()]).await?;
    assert_eq!(vec![(helper.clone(), PairingStatus::Paired)], statuses);
    assert_eq!(2, fixture.network.count(&helper, Operation::Pair));
    assert!(secret.is_available());

    let outcome = secret.update(b"again".to_vec(), None).await?;
    assert!(outcome.is_protected());
    assert_eq!(2, outcome.success);
    Ok(())
}
