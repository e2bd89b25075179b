use prost_reflect::MessageDescriptor;

use crate::{
    core::{
        error::{TranscodeError, TranscodeResult},
        negotiation::NegotiationDirective,
    },
    ports::schema_registry::SchemaRegistry,
};

/// Message descriptors resolved for a single request.
#[derive(Debug, Clone, Default)]
pub struct ResolvedTypes {
    pub request: Option<MessageDescriptor>,
    /// Response candidates that exist in the registry, in directive order
    pub response_candidates: Vec<MessageDescriptor>,
}

impl ResolvedTypes {
    pub fn candidate_names(&self) -> Vec<String> {
        self.response_candidates
            .iter()
            .map(|d| d.full_name().to_string())
            .collect()
    }
}

/// Resolve the names in `directive` against `registry`.
///
/// A named request type must exist. Response candidates that do not exist are
/// skipped, but at least one must resolve when any were requested.
pub fn resolve_types(
    directive: &NegotiationDirective,
    registry: &dyn SchemaRegistry,
) -> TranscodeResult<ResolvedTypes> {
    let request = match &directive.request_type {
        Some(name) => Some(
            registry
                .find_message_type(name)
                .ok_or_else(|| TranscodeError::UnresolvedRequestType(name.clone()))?,
        ),
        None => None,
    };

    let mut response_candidates = Vec::with_capacity(directive.response_candidates.len());
    for name in &directive.response_candidates {
        match registry.find_message_type(name) {
            Some(descriptor) => response_candidates.push(descriptor),
            None => tracing::debug!(type_name = %name, "Skipping unknown response candidate"),
        }
    }

    if !directive.response_candidates.is_empty() && response_candidates.is_empty() {
        return Err(TranscodeError::UnresolvedResponseTypes(
            directive.response_candidates.clone(),
        ));
    }

    Ok(ResolvedTypes {
        request,
        response_candidates,
    })
}
