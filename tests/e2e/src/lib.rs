//! Fixtures shared by the end-to-end tests.
#![deny(missing_docs)]
#![forbid(unsafe_code)]

use anyhow::Result;
use custodia_sharing::{
    Secret, SecretOptions, Services, Sharer, SharingSettings,
};
use custodia_test_utils::{MockNetwork, RecordingListener};
use custodia_types::{HelperIdentity, PairingStatus, SecretId};
use custodia_wire::NetworkRetry;
use std::{sync::Arc, time::Duration};

/// Settings with short timeouts so failures resolve quickly.
pub fn fast_settings() -> SharingSettings {
    SharingSettings {
        request_timeout: Duration::from_millis(250),
        verify_interval: None,
        unpair_retry: NetworkRetry::new(2, 10),
    }
}

/// Sharer talking to in-process helpers.
pub struct Fixture {
    /// Network routing requests to the helpers.
    pub network: Arc<MockNetwork>,
    /// Listener recording every notification.
    pub listener: Arc<RecordingListener>,
    /// Sharer under test.
    pub sharer: Sharer,
    /// Helpers available on the network.
    pub helpers: Vec<HelperIdentity>,
}

impl Fixture {
    /// Create a fixture with accepting helpers.
    pub fn new(helpers: usize) -> Result<Self> {
        Self::with_settings(helpers, fast_settings())
    }

    /// Create a fixture with accepting helpers and settings.
    pub fn with_settings(
        helpers: usize,
        settings: SharingSettings,
    ) -> Result<Self> {
        let network = MockNetwork::new();
        let helpers = network.add_helpers(helpers)?;
        let listener = RecordingListener::new();
        let sharer = Sharer::new(
            "alice",
            settings,
            Services::new(network.clone()),
            listener.clone(),
        )?;
        Ok(Self {
            network,
            listener,
            sharer,
            helpers,
        })
    }

    /// Create a secret and pair it with every helper.
    pub async fn paired_secret(
        &self,
        id: &str,
        recovery_threshold: usize,
    ) -> Result<Arc<Secret>> {
        let secret = self.sharer.new_secret(
            SecretOptions::new(SecretId::from_name(id)?, recovery_threshold)
                .with_description(format!("{} secret", id)),
        )?;
        let statuses = secret.add_helpers(self.helpers.clone()).await?;
        anyhow::ensure!(
            statuses
                .iter()
                .all(|(_, status)| *status == PairingStatus::Paired),
            "all helpers must pair, got {:?}",
            statuses
        );
        Ok(secret)
    }
}
