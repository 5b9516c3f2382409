//! Registry of the secrets owned by one sharer.
use crate::{
    availability::AvailabilityTracker,
    context::{SecretContext, Services},
    notification::{NotificationBus, NotificationListener},
    secret::{CloseOutcome, Secret},
    Error, Result, SecretOptions, SharerConfig, SharingSettings,
};
use custodia_types::SecretId;
use futures::future::join_all;
use parking_lot::RwLock;
use std::{collections::HashMap, sync::Arc};

#[derive(Default)]
struct Registry {
    secrets: HashMap<SecretId, Arc<Secret>>,
    closed: bool,
}

/// Owner of a set of secrets.
///
/// Must be created from within a tokio runtime.
pub struct Sharer {
    name: String,
    settings: SharingSettings,
    services: Services,
    bus: NotificationBus,
    registry: RwLock<Registry>,
}

impl Sharer {
    /// Create a sharer delivering notifications to a listener.
    pub fn new(
        name: impl Into<String>,
        settings: SharingSettings,
        services: Services,
        listener: Arc<dyn NotificationListener>,
    ) -> Result<Self> {
        Ok(Self {
            name: name.into(),
            settings,
            services,
            bus: NotificationBus::spawn(listener)?,
            registry: RwLock::new(Default::default()),
        })
    }

    /// Create a sharer from a config.
    pub fn from_config(
        config: &SharerConfig,
        services: Services,
        listener: Arc<dyn NotificationListener>,
    ) -> Result<Self> {
        Self::new(config.name.clone(), config.settings(), services, listener)
    }

    /// Name presented to helpers.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Runtime settings.
    pub fn settings(&self) -> &SharingSettings {
        &self.settings
    }

    /// Create a secret.
    pub fn new_secret(&self, options: SecretOptions) -> Result<Arc<Secret>> {
        options.validate()?;

        let mut registry = self.registry.write();
        if registry.closed {
            return Err(Error::SharerClosed(self.name.clone()));
        }
        if registry.secrets.contains_key(&options.id) {
            return Err(Error::DuplicateSecret(options.id));
        }

        tracing::debug!(
            sharer = %self.name,
            secret_id = %options.id,
            recovery_threshold = %options.recovery_threshold,
            deletion_threshold = %options.deletion_threshold,
            "sharer::new_secret",
        );

        let context = SecretContext {
            id: options.id.clone(),
            sharer: self.name.clone(),
            description: options.description,
            recovery_threshold: options.recovery_threshold,
            deletion_threshold: options.deletion_threshold,
            settings: self.settings.clone(),
            services: self.services.clone(),
            bus: self.bus.clone(),
            availability: AvailabilityTracker::new(
                options.id.clone(),
                options.recovery_threshold,
                self.bus.clone(),
            ),
        };
        let secret = Secret::new(context);
        registry.secrets.insert(options.id, Arc::clone(&secret));
        Ok(secret)
    }

    /// Secret by identifier.
    pub fn secret(&self, id: &SecretId) -> Option<Arc<Secret>> {
        self.registry.read().secrets.get(id).cloned()
    }

    /// All secrets.
    pub fn secrets(&self) -> Vec<Arc<Secret>> {
        self.registry.read().secrets.values().cloned().collect()
    }

    /// Whether the sharer has been closed.
    pub fn is_closed(&self) -> bool {
        self.registry.read().closed
    }

    /// Close the sharer and every secret that is still open.
    pub async fn close(&self) -> Result<Vec<(SecretId, CloseOutcome)>> {
        let secrets = {
            let mut registry = self.registry.write();
            if registry.closed {
                return Err(Error::SharerClosed(self.name.clone()));
            }
            registry.closed = true;
            registry.secrets.values().cloned().collect::<Vec<_>>()
        };

        tracing::debug!(
            sharer = %self.name,
            secrets = %secrets.len(),
            "sharer::close",
        );

        let mut handles = Vec::new();
        for secret in secrets {
            match secret.start_close() {
                Ok(handle) => handles.push((secret.id().clone(), handle)),
                // Closed by the application earlier
                Err(Error::SecretClosed(_)) => {}
                Err(e) => return Err(e),
            }
        }

        let ids: Vec<_> = handles.iter().map(|(id, _)| id.clone()).collect();
        let outcomes =
            join_all(handles.into_iter().map(|(_, handle)| handle.resolved()))
                .await;
        ids.into_iter()
            .zip(outcomes)
            .map(|(id, outcome)| Ok((id, outcome?)))
            .collect()
    }
}

impl std::fmt::Debug for Sharer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sharer")
            .field("name", &self.name)
            .field("secrets", &self.registry.read().secrets.len())
            .finish_non_exhaustive()
    }
}
