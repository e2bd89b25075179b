pub mod codec;
pub mod http_client;
pub mod http_server;
pub mod schema_registry;

pub use codec::{CodecError, WireCodec};
pub use http_client::{HttpClient, HttpClientError, HttpClientResult};
pub use schema_registry::SchemaRegistry;
