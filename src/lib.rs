//! protobridge - a reverse proxy transcoding JSON bodies to and from Protocol Buffers.
//!
//! Clients talk JSON. The upstream speaks binary protobuf. The client names the message
//! types on every request through `Content-Type` parameters:
//!
//! ```text
//! Content-Type: application/x-protobuf; reqmsg=pkg.Req; respmsg="pkg.Resp,pkg.Err"
//! ```
//!
//! The proxy decodes the JSON request body as `reqmsg`, forwards the binary encoding
//! upstream, and decodes the upstream reply against each `respmsg` candidate in order,
//! returning the first one that fits as JSON. An optional `qs=<param>` parameter moves the
//! encoded request into a base64url query parameter instead of the body.
//!
//! # Architecture
//! The crate separates **ports** (traits) from **adapters** (implementations) while keeping
//! the transcoding logic inside `core`:
//! - [`core`] negotiation, type resolution and the request / response transcoders
//! - [`adapters`] protox schema loading, the prost-reflect codec, the axum handler and
//!   the hyper upstream client
//! - [`config`] file + environment configuration and its validation
//!
//! # Quick Example
//! ```no_run
//! use std::{sync::Arc, time::Duration};
//!
//! use protobridge::{
//!     HttpClientAdapter, ProtoRegistry, ProtobufJsonCodec, ProxyHandler, TranscodePipeline,
//!     adapters::build_router, config::EmptyDirectivePolicy,
//! };
//!
//! # fn main() -> eyre::Result<()> {
//! let registry = ProtoRegistry::load(&["api.proto".into()], &["protos".into()])?;
//! let pipeline = TranscodePipeline::new(
//!     Arc::new(registry),
//!     Arc::new(ProtobufJsonCodec::new()),
//!     EmptyDirectivePolicy::Reject,
//! );
//! let client = HttpClientAdapter::new(Duration::from_secs(30))?;
//! let handler = ProxyHandler::new(
//!     Arc::new(pipeline),
//!     Arc::new(client),
//!     "http://localhost:8080",
//!     4 * 1024 * 1024,
//! )?;
//! let _router = build_router(Arc::new(handler));
//! # Ok(()) }
//! ```
//!
//! # Error Handling
//! Startup paths return `eyre::Result<T>`. Per-request failures are typed
//! ([`core::TranscodeError`], [`core::ProxyError`]) and logged with the failing stage, while
//! the client only ever sees an opaque `400 Bad Request`.
pub mod config;
pub mod metrics;
pub mod ports;
pub mod tracing_setup;
pub mod utils;

pub mod adapters;
pub mod core;

pub use crate::{
    adapters::{HttpClientAdapter, ProtoRegistry, ProtobufJsonCodec, ProxyHandler, ProxyServer},
    core::{ProxyError, TranscodeError, TranscodePipeline},
    ports::{http_client::HttpClient, schema_registry::SchemaRegistry},
    utils::GracefulShutdown,
};
