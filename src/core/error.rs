use std::fmt;

use thiserror::Error;

use crate::ports::{codec::CodecError, http_client::HttpClientError};

/// Stage of the per-request pipeline, used to label failures in logs and metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Negotiate,
    Resolve,
    RequestTranscode,
    Upstream,
    ResponseTranscode,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Negotiate => "negotiate",
            Stage::Resolve => "resolve",
            Stage::RequestTranscode => "request_transcode",
            Stage::Upstream => "upstream",
            Stage::ResponseTranscode => "response_transcode",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which side of the exchange a body belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    Request,
    Response,
}

impl fmt::Display for BodyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BodyKind::Request => f.write_str("request"),
            BodyKind::Response => f.write_str("response"),
        }
    }
}

/// Failures of the negotiation and transcoding pipeline.
///
/// Every variant is terminal for the request it was raised on.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum TranscodeError {
    #[error("malformed content type {value:?}: {reason}")]
    MalformedMetadata { value: String, reason: String },

    #[error("content type names no message types")]
    EmptyDirective,

    #[error("failed to find message descriptor for '{0}'")]
    UnresolvedRequestType(String),

    #[error("failed to find any message descriptors for {0:?}")]
    UnresolvedResponseTypes(Vec<String>),

    #[error("request body is not a valid '{type_name}': {source}")]
    RequestBodyInvalid {
        type_name: String,
        #[source]
        source: CodecError,
    },

    #[error("response body did not decode as any of {candidates:?}: {source}")]
    ResponseBodyUndecodable {
        candidates: Vec<String>,
        #[source]
        source: CodecError,
    },

    #[error("no response candidates to decode with")]
    NoResponseCandidates,

    #[error("failed to encode '{type_name}' response as JSON: {source}")]
    ResponseEncode {
        type_name: String,
        #[source]
        source: CodecError,
    },

    #[error("failed to read {kind} body: {reason}")]
    BodyRead { kind: BodyKind, reason: String },

    #[error("{kind} body exceeds the limit of {limit} bytes")]
    BodyTooLarge { kind: BodyKind, limit: usize },

    #[error("failed to embed payload in query parameter '{param}': {reason}")]
    QueryEmbed { param: String, reason: String },
}

impl TranscodeError {
    /// Pipeline stage this error aborted
    pub fn stage(&self) -> Stage {
        match self {
            TranscodeError::MalformedMetadata { .. } | TranscodeError::EmptyDirective => {
                Stage::Negotiate
            }
            TranscodeError::UnresolvedRequestType(_)
            | TranscodeError::UnresolvedResponseTypes(_) => Stage::Resolve,
            TranscodeError::RequestBodyInvalid { .. } | TranscodeError::QueryEmbed { .. } => {
                Stage::RequestTranscode
            }
            TranscodeError::ResponseBodyUndecodable { .. }
            | TranscodeError::NoResponseCandidates
            | TranscodeError::ResponseEncode { .. } => Stage::ResponseTranscode,
            TranscodeError::BodyRead { kind, .. } | TranscodeError::BodyTooLarge { kind, .. } => {
                match kind {
                    BodyKind::Request => Stage::RequestTranscode,
                    BodyKind::Response => Stage::ResponseTranscode,
                }
            }
        }
    }
}

/// Any failure while proxying one request. The client never sees the detail.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ProxyError {
    #[error(transparent)]
    Transcode(#[from] TranscodeError),

    #[error("upstream request failed: {0}")]
    Upstream(#[from] HttpClientError),

    #[error("failed to build upstream request: {0}")]
    UpstreamRequest(String),
}

impl ProxyError {
    pub fn stage(&self) -> Stage {
        match self {
            ProxyError::Transcode(e) => e.stage(),
            ProxyError::Upstream(_) | ProxyError::UpstreamRequest(_) => Stage::Upstream,
        }
    }
}

pub type TranscodeResult<T> = Result<T, TranscodeError>;
