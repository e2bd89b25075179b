pub mod http_client;
pub mod http_handler;
pub mod http_server;
pub mod protobuf_codec;
pub mod schema_loader;

/// Re-export commonly used types from adapters
pub use http_client::HttpClientAdapter;
pub use http_handler::{FAILURE_BODY, ProxyHandler};
pub use http_server::{ProxyServer, build_router};
pub use protobuf_codec::ProtobufJsonCodec;
pub use schema_loader::{ProtoRegistry, SchemaFile};
