//! Collaborators shared by the components of a secret.
use crate::{
    availability::AvailabilityTracker, notification::NotificationBus,
    SharingSettings,
};
use custodia_fragments::{FragmentProvider, ShamirProvider};
use custodia_types::SecretId;
use custodia_wire::{
    PairingCipher, ProtobufCodec, Transport, WireCodec, X25519Cipher,
};
use std::sync::Arc;

/// External collaborators of the sharing core.
#[derive(Debug, Clone)]
pub struct Services {
    /// Transport used to reach helpers.
    pub transport: Arc<dyn Transport>,
    /// Codec for wire messages.
    pub codec: Arc<dyn WireCodec>,
    /// Splits versions into fragments.
    pub provider: Arc<dyn FragmentProvider>,
    /// Opens pairing acceptances sealed by helpers.
    pub cipher: Arc<dyn PairingCipher>,
}

impl Services {
    /// Services using the protobuf codec, Shamir fragments and
    /// a random pairing key.
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            codec: Arc::new(ProtobufCodec),
            provider: Arc::new(ShamirProvider),
            cipher: Arc::new(X25519Cipher::new_random()),
        }
    }

    /// Replace the pairing cipher.
    pub fn with_cipher(mut self, cipher: Arc<dyn PairingCipher>) -> Self {
        self.cipher = cipher;
        self
    }

    /// Replace the fragment provider.
    pub fn with_provider(
        mut self,
        provider: Arc<dyn FragmentProvider>,
    ) -> Self {
        self.provider = provider;
        self
    }
}

/// State shared between a secret and its helper clients.
#[derive(Debug)]
pub(crate) struct SecretContext {
    pub id: SecretId,
    pub sharer: String,
    pub description: String,
    pub recovery_threshold: usize,
    pub deletion_threshold: usize,
    pub settings: SharingSettings,
    pub services: Services,
    pub bus: NotificationBus,
    pub availability: AvailabilityTracker,
}

impl SecretContext {
    /// Public key helpers seal their acceptance to.
    pub fn sharer_key(&self) -> Vec<u8> {
        self.services.cipher.public_key()
    }
}
