#![deny(missing_docs)]
#![forbid(unsafe_code)]
//! Wire protocol spoken between a sharer and its helpers.
//!
//! Provides the protobuf bindings, the [WireCodec] used to
//! encode requests and decode responses, the [Transport]
//! contract implemented by network clients, the retry policy
//! and the [PairingCipher] used to seal pairing acceptances.

// There are two layers to the types in this crate; the wire
// types which are defined in the protobuf file are prefixed
// with `Wire` and then there are the binding types.
//
// Each binding type converts infallibly to the inner wire type
// and fallibly from the inner wire type so that the optionality
// of protobuf messages is enforced when decoding.

mod bindings;
mod codec;
mod error;
mod retry;
mod seal;
mod transport;

pub use bindings::*;
pub use codec::{ProtobufCodec, WireCodec};
pub use error::Error;
pub use retry::NetworkRetry;
pub use seal::{
    acceptance_token, PairingCipher, X25519Cipher, X25519_KEY_LEN,
};
pub use transport::{Transport, TransportResponse};

use prost::{bytes::Buf, Message};

/// Result type for the wire protocol.
pub type Result<T> = std::result::Result<T, Error>;

/// Path of the helper endpoint relative to a helper address.
pub const HELPER_ENDPOINT: &str = "api/v1/helper";

/// Mime type for protobuf payloads.
pub const MIME_TYPE_PROTOBUF: &str = "application/x-protobuf";

/// Information about a cancellation.
#[derive(Default, Debug, Clone, Copy, Hash, Eq, PartialEq)]
pub enum CancelReason {
    /// Unknown reason.
    #[default]
    Unknown,
    /// Owner is shutting down.
    Shutdown,
    /// Superseded by a newer request for the same purpose.
    Superseded,
    /// The owning secret was closed.
    Closed,
}

/// Marker trait to indicate a binding type that
/// converts to a protobuf type.
trait ProtoBinding {
    type Inner: Message + Default;
}

/// Trait for wire protocol encoding and decoding.
#[doc(hidden)]
pub trait WireEncodeDecode {
    /// Encode this value.
    fn encode(self) -> Result<Vec<u8>>;

    /// Decode a value.
    fn decode<B>(buffer: B) -> Result<Self>
    where
        B: Buf,
        Self: Sized;
}

impl<T> WireEncodeDecode for T
where
    T: ProtoBinding,
    <T as ProtoBinding>::Inner: From<T>,
    T: TryFrom<<T as ProtoBinding>::Inner, Error = Error>,
{
    fn encode(self) -> Result<Vec<u8>> {
        let value: <Self as ProtoBinding>::Inner = self.into();
        let mut buf = Vec::new();
        buf.reserve(value.encoded_len());
        value.encode(&mut buf)?;
        Ok(buf)
    }

    fn decode<B>(buffer: B) -> Result<Self>
    where
        B: Buf,
        Self: Sized,
    {
        let result = <<Self as ProtoBinding>::Inner>::decode(buffer)?;
        result.try_into()
    }
}
