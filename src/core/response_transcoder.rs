//! Protobuf to JSON conversion of upstream response bodies.
//!
//! The binary wire format is not self-describing, so a payload may decode
//! cleanly against more than one candidate. Candidates are tried strictly in
//! the order the client listed them and the first that decodes wins. Clients
//! should list the most specific types first.
use bytes::Bytes;
use prost_reflect::MessageDescriptor;

use crate::{
    core::error::{TranscodeError, TranscodeResult},
    ports::codec::{CodecError, WireCodec},
};

/// JSON body produced from an upstream response
#[derive(Debug, Clone)]
pub struct TranscodedResponse {
    pub body: Bytes,
    /// Position of the winning candidate in the resolved list
    pub candidate_index: usize,
    pub type_name: String,
}

/// Decode `body` as the first candidate that accepts it and render it as JSON
/// with default-valued fields included.
///
/// Fails with [`TranscodeError::NoResponseCandidates`] when `candidates` is empty.
pub fn transcode_response(
    codec: &dyn WireCodec,
    candidates: &[MessageDescriptor],
    body: &[u8],
) -> TranscodeResult<TranscodedResponse> {
    let mut last_error: Option<CodecError> = None;

    for (index, descriptor) in candidates.iter().enumerate() {
        let message = match codec.decode_binary(descriptor, body) {
            Ok(message) => message,
            Err(e) => {
                tracing::debug!(
                    candidate = %descriptor.full_name(),
                    error = %e,
                    "Response candidate rejected"
                );
                last_error = Some(e);
                continue;
            }
        };

        let json = codec
            .encode_text(&message, true)
            .map_err(|source| TranscodeError::ResponseEncode {
                type_name: descriptor.full_name().to_string(),
                source,
            })?;

        return Ok(TranscodedResponse {
            body: Bytes::from(json),
            candidate_index: index,
            type_name: descriptor.full_name().to_string(),
        });
    }

    let Some(source) = last_error else {
        return Err(TranscodeError::NoResponseCandidates);
    };
    let candidates = candidates
        .iter()
        .map(|d| d.full_name().to_string())
        .collect();
    Err(TranscodeError::ResponseBodyUndecodable { candidates, source })
}
