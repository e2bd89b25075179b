use std::sync::Arc;

use axum::{
    body::Body as AxumBody,
    http::{HeaderValue, StatusCode, Uri, header},
};
use bytes::Bytes;
use eyre::{Result, WrapErr};
use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::{Request, Response};
use tracing::Instrument;
use uuid::Uuid;

use crate::{
    core::{
        Negotiated, ProxyError, TranscodeError, TranscodePipeline,
        error::BodyKind,
        pipeline::JSON_CONTENT_TYPE,
        request_transcoder::{Placement, append_query_param},
    },
    metrics,
    ports::http_client::HttpClient,
};

/// Body returned to clients for every failure, whatever its cause
pub const FAILURE_BODY: &str = "request could not be proxied - see logs";

/// Proxies requests to the single upstream, transcoding bodies on the way
/// through.
///
/// Every failure, local or remote, is answered with `400 Bad Request` and the
/// opaque [`FAILURE_BODY`]. The cause is only logged.
pub struct ProxyHandler {
    pipeline: Arc<TranscodePipeline>,
    http_client: Arc<dyn HttpClient>,
    upstream: String,
    max_body_bytes: usize,
}

impl ProxyHandler {
    pub fn new(
        pipeline: Arc<TranscodePipeline>,
        http_client: Arc<dyn HttpClient>,
        upstream: &str,
        max_body_bytes: usize,
    ) -> Result<Self> {
        let upstream = upstream.trim_end_matches('/').to_string();
        let parsed: Uri = upstream
            .parse()
            .wrap_err_with(|| format!("Invalid upstream URL '{upstream}'"))?;
        if parsed.scheme().is_none() || parsed.authority().is_none() {
            return Err(eyre::eyre!("Upstream URL '{upstream}' must be absolute"));
        }

        Ok(Self {
            pipeline,
            http_client,
            upstream,
            max_body_bytes,
        })
    }

    /// Handle one inbound request. Never fails; errors become the generic response.
    pub async fn handle_request(&self, req: Request<AxumBody>) -> Response<AxumBody> {
        let span = tracing::info_span!(
            "transcode",
            request.id = %Uuid::new_v4(),
            http.method = %req.method(),
            http.path = %req.uri().path(),
            http.status_code = tracing::field::Empty,
        );

        async move {
            let response = match self.proxy(req).await {
                Ok(response) => {
                    metrics::record_success();
                    response
                }
                Err(e) => {
                    let stage = e.stage();
                    metrics::record_failure(stage);
                    tracing::error!(stage = %stage, error = %e, "Request could not be proxied");
                    failure_response()
                }
            };
            tracing::Span::current().record("http.status_code", response.status().as_u16());
            response
        }
        .instrument(span)
        .await
    }

    async fn proxy(&self, req: Request<AxumBody>) -> Result<Response<AxumBody>, ProxyError> {
        let (mut parts, body) = req.into_parts();

        let content_type = match parts.headers.get(header::CONTENT_TYPE) {
            Some(value) => Some(value.to_str().map_err(|_| TranscodeError::MalformedMetadata {
                value: String::from_utf8_lossy(value.as_bytes()).into_owned(),
                reason: "header is not valid ASCII".to_string(),
            })?),
            None => None,
        };
        let negotiated = self.pipeline.negotiate(content_type)?;
        tracing::debug!(
            request_type = ?negotiated.directive.request_type,
            response_candidates = ?negotiated.directive.response_candidates,
            query_param = ?negotiated.directive.query_param,
            "Negotiated message types"
        );

        let body = if negotiated.transcodes_request() {
            let raw = read_body(body, self.max_body_bytes, BodyKind::Request).await?;
            let placement = self
                .pipeline
                .transcode_request(&negotiated, &raw)?
                .unwrap_or(Placement::Body(raw));
            parts.headers.remove(header::TRANSFER_ENCODING);
            parts.headers.insert(
                header::CONTENT_LENGTH,
                HeaderValue::from(placement.body_len()),
            );
            match placement {
                Placement::Body(payload) => AxumBody::from(payload),
                Placement::Query { param, encoded } => {
                    parts.uri = append_query_param(&parts.uri, &param, &encoded)?;
                    AxumBody::empty()
                }
            }
        } else {
            body
        };

        let forwarded_type = HeaderValue::from_str(&negotiated.forwarded_content_type())
            .map_err(|e| ProxyError::UpstreamRequest(e.to_string()))?;
        parts.headers.insert(header::CONTENT_TYPE, forwarded_type);
        parts.uri = self.upstream_uri(&parts.uri)?;

        let response = {
            let _timer = metrics::UpstreamTimer::new();
            self.http_client
                .send_request(Request::from_parts(parts, body))
                .await?
        };

        self.transcode_response(&negotiated, response).await
    }

    async fn transcode_response(
        &self,
        negotiated: &Negotiated,
        response: Response<AxumBody>,
    ) -> Result<Response<AxumBody>, ProxyError> {
        if !negotiated.transcodes_response() {
            return Ok(response);
        }

        let (mut parts, body) = response.into_parts();
        let raw = read_body(body, self.max_body_bytes, BodyKind::Response).await?;
        let Some(transcoded) = self.pipeline.transcode_response(negotiated, &raw)? else {
            return Ok(Response::from_parts(parts, AxumBody::from(raw)));
        };

        metrics::record_response_candidate(transcoded.candidate_index);
        tracing::debug!(
            response_type = %transcoded.type_name,
            candidate_index = transcoded.candidate_index,
            "Decoded upstream response"
        );

        parts.headers.remove(header::TRANSFER_ENCODING);
        parts.headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static(JSON_CONTENT_TYPE),
        );
        parts.headers.insert(
            header::CONTENT_LENGTH,
            HeaderValue::from(transcoded.body.len()),
        );
        Ok(Response::from_parts(parts, AxumBody::from(transcoded.body)))
    }

    /// Point an inbound origin-form URI at the upstream
    fn upstream_uri(&self, original: &Uri) -> Result<Uri, ProxyError> {
        let path_and_query = original.path_and_query().map_or("/", |pq| pq.as_str());
        format!("{}{}", self.upstream, path_and_query)
            .parse()
            .map_err(|e: http::uri::InvalidUri| ProxyError::UpstreamRequest(e.to_string()))
    }
}

fn failure_response() -> Response<AxumBody> {
    let mut response = Response::new(AxumBody::from(FAILURE_BODY));
    *response.status_mut() = StatusCode::BAD_REQUEST;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
}

/// Buffer a body fully, failing once it grows past `limit` bytes
async fn read_body(body: AxumBody, limit: usize, kind: BodyKind) -> Result<Bytes, TranscodeError> {
    match Limited::new(body, limit).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => {
            Err(TranscodeError::BodyTooLarge { kind, limit })
        }
        Err(e) => Err(TranscodeError::BodyRead {
            kind,
            reason: e.to_string(),
        }),
    }
}
