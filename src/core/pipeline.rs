//! The negotiation-and-transcoding pipeline.
//!
//! `TranscodePipeline` holds the read-only collaborators shared by every
//! request (schema registry and codec) and exposes the per-request steps as
//! pure functions over a [`Negotiated`] context. It performs no I/O; the HTTP
//! adapter drives it around the upstream call.
use std::sync::Arc;

use crate::{
    config::EmptyDirectivePolicy,
    core::{
        error::{TranscodeError, TranscodeResult},
        negotiation::{MediaType, NegotiationDirective},
        request_transcoder::{self, Placement},
        resolver::{self, ResolvedTypes},
        response_transcoder::{self, TranscodedResponse},
    },
    ports::{codec::WireCodec, schema_registry::SchemaRegistry},
};

/// Media type of bodies forwarded upstream once transcoded
pub const PROTOBUF_CONTENT_TYPE: &str = "application/x-protobuf";
/// Media type of transcoded upstream responses
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Per-request context produced by [`TranscodePipeline::negotiate`].
#[derive(Debug, Clone)]
pub struct Negotiated {
    pub media_type: MediaType,
    pub directive: NegotiationDirective,
    pub resolved: ResolvedTypes,
}

impl Negotiated {
    /// Whether the request body must be read and transcoded
    pub fn transcodes_request(&self) -> bool {
        self.resolved.request.is_some()
    }

    /// Whether the upstream response must be read and transcoded
    pub fn transcodes_response(&self) -> bool {
        !self.resolved.response_candidates.is_empty()
    }

    /// `Content-Type` to send upstream. Negotiation parameters never leave the proxy.
    ///
    /// Any named message type means the upstream speaks protobuf. Only a request
    /// passed through under an empty directive keeps its own media type.
    pub fn forwarded_content_type(&self) -> String {
        if self.directive.is_empty() {
            self.media_type.without_negotiation_params().to_header_value()
        } else {
            PROTOBUF_CONTENT_TYPE.to_string()
        }
    }
}

pub struct TranscodePipeline {
    registry: Arc<dyn SchemaRegistry>,
    codec: Arc<dyn WireCodec>,
    empty_directive: EmptyDirectivePolicy,
}

impl TranscodePipeline {
    pub fn new(
        registry: Arc<dyn SchemaRegistry>,
        codec: Arc<dyn WireCodec>,
        empty_directive: EmptyDirectivePolicy,
    ) -> Self {
        Self {
            registry,
            codec,
            empty_directive,
        }
    }

    /// Parse the `Content-Type` header and resolve the named types.
    pub fn negotiate(&self, content_type: Option<&str>) -> TranscodeResult<Negotiated> {
        let (media_type, directive) = NegotiationDirective::parse(content_type)?;

        if directive.is_empty() && self.empty_directive == EmptyDirectivePolicy::Reject {
            return Err(TranscodeError::EmptyDirective);
        }

        let resolved = resolver::resolve_types(&directive, self.registry.as_ref())?;
        Ok(Negotiated {
            media_type,
            directive,
            resolved,
        })
    }

    /// Transcode the request body, or `None` when the request passes through.
    pub fn transcode_request(
        &self,
        negotiated: &Negotiated,
        body: &[u8],
    ) -> TranscodeResult<Option<Placement>> {
        let Some(descriptor) = &negotiated.resolved.request else {
            return Ok(None);
        };
        request_transcoder::transcode_request(
            self.codec.as_ref(),
            descriptor,
            body,
            negotiated.directive.query_param.as_deref(),
        )
        .map(Some)
    }

    /// Transcode the upstream body, or `None` when the response passes through.
    pub fn transcode_response(
        &self,
        negotiated: &Negotiated,
        body: &[u8],
    ) -> TranscodeResult<Option<TranscodedResponse>> {
        if !negotiated.transcodes_response() {
            return Ok(None);
        }
        response_transcoder::transcode_response(
            self.codec.as_ref(),
            &negotiated.resolved.response_candidates,
            body,
        )
        .map(Some)
    }
}
