//! JSON to protobuf conversion of request bodies.
use base64::{Engine as _, engine::general_purpose::URL_SAFE};
use bytes::Bytes;
use http::Uri;
use prost_reflect::MessageDescriptor;

use crate::{
    core::error::{TranscodeError, TranscodeResult},
    ports::codec::WireCodec,
};

/// Where the binary request payload travels to the upstream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placement {
    /// Replaces the request body
    Body(Bytes),
    /// Base64url-encoded under the named query parameter; the body is emptied
    Query { param: String, encoded: String },
}

impl Placement {
    /// Length of the body that will be sent upstream
    pub fn body_len(&self) -> usize {
        match self {
            Placement::Body(bytes) => bytes.len(),
            Placement::Query { .. } => 0,
        }
    }
}

/// Convert a JSON request body into its binary encoding.
pub fn transcode_request(
    codec: &dyn WireCodec,
    descriptor: &MessageDescriptor,
    body: &[u8],
    query_param: Option<&str>,
) -> TranscodeResult<Placement> {
    let message = codec
        .decode_text(descriptor, body)
        .map_err(|source| TranscodeError::RequestBodyInvalid {
            type_name: descriptor.full_name().to_string(),
            source,
        })?;
    let payload = codec.encode_binary(&message);

    Ok(match query_param {
        Some(param) => Placement::Query {
            param: param.to_string(),
            encoded: URL_SAFE.encode(&payload),
        },
        None => Placement::Body(Bytes::from(payload)),
    })
}

/// Append `param=value` to the query of `uri`, keeping any existing pairs.
pub fn append_query_param(uri: &Uri, param: &str, value: &str) -> TranscodeResult<Uri> {
    let embed_error = |reason: String| TranscodeError::QueryEmbed {
        param: param.to_string(),
        reason,
    };

    let pair = url::form_urlencoded::Serializer::new(String::new())
        .append_pair(param, value)
        .finish();
    let path_and_query = match uri.query() {
        Some(query) if !query.is_empty() => format!("{}?{query}&{pair}", uri.path()),
        _ => format!("{}?{pair}", uri.path()),
    };

    let mut parts = uri.clone().into_parts();
    parts.path_and_query = Some(
        path_and_query
            .parse()
            .map_err(|e: http::uri::InvalidUri| embed_error(e.to_string()))?,
    );
    Uri::from_parts(parts).map_err(|e| embed_error(e.to_string()))
}
