//! In-memory storage of pairings and fragments.
use custodia_types::{SecretId, UtcDateTime};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use zeroize::Zeroizing;

/// Key for a pairing, the public key of the sharer
/// and the secret identifier.
pub type PairingKey = (Vec<u8>, SecretId);

/// Pairing with one secret of one sharer.
#[derive(Debug, Clone)]
pub struct PairingRecord {
    /// Name of the sharer.
    pub sharer: String,
    /// Description of the secret.
    pub description: String,
    /// When the pairing was accepted.
    pub paired_at: UtcDateTime,
    fragments: BTreeMap<u64, Zeroizing<Vec<u8>>>,
}

impl PairingRecord {
    fn new(sharer: String, description: String) -> Self {
        Self {
            sharer,
            description,
            paired_at: UtcDateTime::now(),
            fragments: Default::default(),
        }
    }

    /// Versions held for the secret in ascending order.
    pub fn versions(&self) -> Vec<u64> {
        self.fragments.keys().copied().collect()
    }
}

/// Pairings and fragments held by a helper.
#[derive(Debug, Default)]
pub struct HelperStore {
    records: RwLock<HashMap<PairingKey, PairingRecord>>,
}

impl HelperStore {
    /// Record a pairing.
    ///
    /// Pairing again keeps the fragments already held and
    /// returns `false`.
    pub fn pair(
        &self,
        sharer_key: &[u8],
        secret_id: &SecretId,
        sharer: &str,
        description: &str,
    ) -> bool {
        let mut records = self.records.write();
        let key = (sharer_key.to_vec(), secret_id.clone());
        if let Some(record) = records.get_mut(&key) {
            record.sharer = sharer.to_owned();
            record.description = description.to_owned();
            return false;
        }
        records.insert(
            key,
            PairingRecord::new(sharer.to_owned(), description.to_owned()),
        );
        true
    }

    /// Remove a pairing and every fragment held for it.
    pub fn unpair(&self, sharer_key: &[u8], secret_id: &SecretId) -> bool {
        self.records
            .write()
            .remove(&(sharer_key.to_vec(), secret_id.clone()))
            .is_some()
    }

    /// Store the fragment of a version.
    ///
    /// Returns `false` when there is no pairing.
    pub fn store(
        &self,
        sharer_key: &[u8],
        secret_id: &SecretId,
        version: u64,
        fragment: Vec<u8>,
    ) -> bool {
        let mut records = self.records.write();
        match records.get_mut(&(sharer_key.to_vec(), secret_id.clone())) {
            Some(record) => {
                record.fragments.insert(version, Zeroizing::new(fragment));
                true
            }
            None => false,
        }
    }

    /// Fragment of a version.
    ///
    /// The outer option is `None` when there is no pairing.
    pub fn fragment(
        &self,
        sharer_key: &[u8],
        secret_id: &SecretId,
        version: u64,
    ) -> Option<Option<Vec<u8>>> {
        self.records
            .read()
            .get(&(sharer_key.to_vec(), secret_id.clone()))
            .map(|record| {
                record.fragments.get(&version).map(|f| f.to_vec())
            })
    }

    /// Snapshot of a pairing.
    pub fn record(
        &self,
        sharer_key: &[u8],
        secret_id: &SecretId,
    ) -> Option<PairingRecord> {
        self.records
            .read()
            .get(&(sharer_key.to_vec(), secret_id.clone()))
            .cloned()
    }

    /// Number of pairings.
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Whether there are no pairings.
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}
