//! Sealing of pairing acceptances.
//!
//! A helper proves it accepted a pairing by sealing an acceptance
//! token to the public key the sharer sent in the pair request.
//! Sealed payloads are laid out as:
//!
//! ```text
//! ephemeral public key (32) || nonce (12) || ciphertext
//! ```
use crate::{Error, Result};
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Key, Nonce,
};
use custodia_types::{csprng, SecretId};
use rand::RngCore;
use sha2::{Digest, Sha256};
use std::fmt;
use x25519_dalek::{EphemeralSecret, PublicKey, StaticSecret};
use zeroize::Zeroizing;

/// Length of an X25519 public key.
pub const X25519_KEY_LEN: usize = 32;

const NONCE_LEN: usize = 12;
const CONTEXT: &[u8] = b"custodia-pairing-seal-v1";

/// Token a helper seals to the sharer to accept a pairing.
pub fn acceptance_token(secret_id: &SecretId, helper: &str) -> Vec<u8> {
    let mut token = secret_id.as_bytes().to_vec();
    token.extend_from_slice(helper.as_bytes());
    token
}

/// Key agreement and authenticated encryption used during
/// the pairing handshake.
pub trait PairingCipher: fmt::Debug + Send + Sync {
    /// Public key others seal payloads to.
    fn public_key(&self) -> Vec<u8>;

    /// Seal a plaintext so only the holder of the secret key
    /// for `recipient` can open it.
    fn seal(&self, recipient: &[u8], plaintext: &[u8]) -> Result<Vec<u8>>;

    /// Open a payload sealed to this cipher's public key.
    fn open(&self, sealed: &[u8]) -> Result<Vec<u8>>;
}

/// Pairing cipher using X25519 and ChaCha20-Poly1305.
pub struct X25519Cipher {
    secret: StaticSecret,
    public: PublicKey,
}

impl X25519Cipher {
    /// Generate a new random key pair.
    pub fn new_random() -> Self {
        let secret = StaticSecret::random_from_rng(csprng());
        let public = PublicKey::from(&secret);
        Self { secret, public }
    }

    /// Create from secret key bytes.
    pub fn from_secret(bytes: [u8; X25519_KEY_LEN]) -> Self {
        let secret = StaticSecret::from(bytes);
        let public = PublicKey::from(&secret);
        Self { secret, public }
    }
}

impl fmt::Debug for X25519Cipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("X25519Cipher")
            .field("public", &hex::encode(self.public.as_bytes()))
            .finish_non_exhaustive()
    }
}

fn parse_public_key(bytes: &[u8]) -> Result<PublicKey> {
    let key: [u8; X25519_KEY_LEN] = bytes
        .try_into()
        .map_err(|_| Error::InvalidKeyLength(bytes.len(), X25519_KEY_LEN))?;
    Ok(PublicKey::from(key))
}

fn derive_key(
    shared: &[u8],
    ephemeral: &PublicKey,
    recipient: &PublicKey,
) -> Zeroizing<[u8; 32]> {
    let mut hasher = Sha256::new();
    hasher.update(CONTEXT);
    hasher.update(shared);
    hasher.update(ephemeral.as_bytes());
    hasher.update(recipient.as_bytes());
    let mut key = Zeroizing::new([0u8; 32]);
    key.copy_from_slice(&hasher.finalize());
    key
}

impl PairingCipher for X25519Cipher {
    fn public_key(&self) -> Vec<u8> {
        self.public.as_bytes().to_vec()
    }

    fn seal(&self, recipient: &[u8], plaintext: &[u8]) -> Result<Vec<u8>> {
        let recipient = parse_public_key(recipient)?;
        let ephemeral = EphemeralSecret::random_from_rng(csprng());
        let ephemeral_public = PublicKey::from(&ephemeral);
        let shared = ephemeral.diffie_hellman(&recipient);
        let key = derive_key(shared.as_bytes(), &ephemeral_public, &recipient);

        let mut nonce = [0u8; NONCE_LEN];
        csprng().fill_bytes(&mut nonce);

        let cipher = ChaCha20Poly1305::new(Key::from_slice(&key[..]));
        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce), plaintext)
            .map_err(|_| Error::Seal)?;

        let mut sealed = Vec::with_capacity(
            X25519_KEY_LEN + NONCE_LEN + ciphertext.len(),
        );
        sealed.extend_from_slice(ephemeral_public.as_bytes());
        sealed.extend_from_slice(&nonce);
        sealed.extend_from_slice(&ciphertext);
        Ok(sealed)
    }

    fn open(&self, sealed: &[u8]) -> Result<Vec<u8>> {
        if sealed.len() < X25519_KEY_LEN + NONCE_LEN {
            return Err(Error::SealTruncated);
        }
        let (ephemeral, rest) = sealed.split_at(X25519_KEY_LEN);
        let (nonce, ciphertext) = rest.split_at(NONCE_LEN);

        let ephemeral = parse_public_key(ephemeral)?;
        let shared = self.secret.diffie_hellman(&ephemeral);
        let key = derive_key(shared.as_bytes(), &ephemeral, &self.public);

        let cipher = ChaCha20Poly1305::new(Key::from_slice(&key[..]));
        cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| Error::SealOpen)
    }
}
