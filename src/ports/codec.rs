use prost_reflect::{DynamicMessage, MessageDescriptor};
use thiserror::Error;

/// Error raised by a [`WireCodec`] implementation
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum CodecError {
    /// The text encoding did not match the message shape
    #[error("invalid JSON message: {0}")]
    Text(#[from] serde_json::Error),

    /// The binary payload did not decode against the descriptor
    #[error("invalid protobuf message: {0}")]
    Binary(#[from] prost::DecodeError),
}

/// WireCodec defines the port for converting messages between the text
/// encoding exchanged with clients and the binary encoding spoken upstream.
///
/// Descriptors and decoded values are treated as opaque handles by callers.
pub trait WireCodec: Send + Sync + 'static {
    /// Parse a text-encoded payload as an instance of `descriptor`
    fn decode_text(
        &self,
        descriptor: &MessageDescriptor,
        payload: &[u8],
    ) -> Result<DynamicMessage, CodecError>;

    /// Serialize a message to its binary wire form
    fn encode_binary(&self, message: &DynamicMessage) -> Vec<u8>;

    /// Parse a binary payload as an instance of `descriptor`
    fn decode_binary(
        &self,
        descriptor: &MessageDescriptor,
        payload: &[u8],
    ) -> Result<DynamicMessage, CodecError>;

    /// Serialize a message to the text encoding.
    ///
    /// With `emit_defaults` set, fields holding their default value are written
    /// out instead of being omitted.
    fn encode_text(&self, message: &DynamicMessage, emit_defaults: bool)
    -> Result<Vec<u8>, CodecError>;
}
