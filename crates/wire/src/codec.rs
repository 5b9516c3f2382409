//! Encoding of requests and decoding of responses.
use crate::{Error, Request, Response, Result, WireEncodeDecode};
use custodia_types::Operation;
use std::fmt;

/// Serializer for the messages exchanged with helpers.
///
/// The sharing core only builds requests and parses responses
/// for an expected operation; helpers do the reverse.
pub trait WireCodec: fmt::Debug + Send + Sync {
    /// Encode a request.
    fn encode_request(&self, request: Request) -> Result<Vec<u8>>;

    /// Decode a request.
    fn decode_request(&self, bytes: &[u8]) -> Result<Request>;

    /// Encode a response.
    fn encode_response(&self, response: Response) -> Result<Vec<u8>>;

    /// Decode a response which must answer the `expected` operation.
    ///
    /// Fails with [Error::MalformedResponse] when the operation
    /// is absent, duplicated or different to the expected one,
    /// or when the result envelope cannot be parsed.
    fn decode_response(
        &self,
        bytes: &[u8],
        expected: Operation,
    ) -> Result<Response>;
}

/// Protobuf implementation of the wire codec.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProtobufCodec;

impl WireCodec for ProtobufCodec {
    fn encode_request(&self, request: Request) -> Result<Vec<u8>> {
        request.encode()
    }

    fn decode_request(&self, bytes: &[u8]) -> Result<Request> {
        Request::decode(bytes).map_err(|e| match e {
            Error::Decode(e) => Error::MalformedRequest(e.to_string()),
            e => e,
        })
    }

    fn encode_response(&self, response: Response) -> Result<Vec<u8>> {
        response.encode()
    }

    fn decode_response(
        &self,
        bytes: &[u8],
        expected: Operation,
    ) -> Result<Response> {
        let response = Response::decode(bytes).map_err(|e| match e {
            Error::MalformedResponse(_) => e,
            e => Error::MalformedResponse(e.to_string()),
        })?;
        if response.operation() != expected {
            return Err(Error::MalformedResponse(format!(
                "expected {} response, got {}",
                expected,
                response.operation()
            )));
        }
        Ok(response)
    }
}
