use std::fmt;
use zeroize::Zeroize;

/// Opaque piece of a secret payload held by one helper.
///
/// Bytes are zeroized on drop and never printed.
#[derive(Clone, Eq, PartialEq)]
pub struct Fragment(Vec<u8>);

impl Fragment {
    /// Bytes of the fragment.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Length of the fragment in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the fragment is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Fragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fragment({} bytes)", self.0.len())
    }
}

impl From<Vec<u8>> for Fragment {
    fn from(value: Vec<u8>) -> Self {
        Self(value)
    }
}

impl From<&[u8]> for Fragment {
    fn from(value: &[u8]) -> Self {
        Self(value.to_vec())
    }
}

impl AsRef<[u8]> for Fragment {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Drop for Fragment {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}
