//! Shared fixtures: proto files on disk, a mock protobuf upstream and a proxy
//! router wired to it.
#![allow(dead_code)]

use std::{
    net::SocketAddr,
    path::PathBuf,
    sync::{Arc, Mutex},
    time::Duration,
};

use axum::{
    Router,
    body::{Body, to_bytes},
    extract::Request,
    http::{StatusCode, header},
    response::Response,
};
use bytes::Bytes;
use prost::Message;
use prost_reflect::{DynamicMessage, MessageDescriptor};
use protobridge::{
    HttpClientAdapter, ProtoRegistry, ProtobufJsonCodec, ProxyHandler, SchemaRegistry,
    TranscodePipeline, adapters::build_router, config::EmptyDirectivePolicy,
};
use tempfile::TempDir;

pub const HELLO_PROTO: &str = r#"
syntax = "proto3";
package testprotos;

message Req {
    string text = 1;
    int32 number = 2;
    repeated string list = 3;
}

message Resp {
    string text = 1;
}

message Resp2 {
    int32 number = 1;
}
"#;

pub const MORE_PROTO: &str = r#"
syntax = "proto3";
package moreprotos;

import "hello.proto";

message Req {
    testprotos.Req sub_req = 1;
    int32 num = 2;
}
"#;

/// Proto sources laid out in two directories, the second importing the first
pub struct Schemas {
    pub dir: TempDir,
    pub registry: Arc<ProtoRegistry>,
}

impl Schemas {
    /// Only `testprotos/hello.proto`
    pub fn hello() -> Self {
        Self::load(false)
    }

    /// `testprotos/hello.proto` then `moreprotos/moreprotos.proto`
    pub fn hello_and_more() -> Self {
        Self::load(true)
    }

    fn load(with_more: bool) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let hello_dir = dir.path().join("testprotos");
        let more_dir = dir.path().join("moreprotos");
        std::fs::create_dir_all(&hello_dir).unwrap();
        std::fs::create_dir_all(&more_dir).unwrap();
        std::fs::write(hello_dir.join("hello.proto"), HELLO_PROTO).unwrap();
        std::fs::write(more_dir.join("moreprotos.proto"), MORE_PROTO).unwrap();

        let mut files: Vec<PathBuf> = vec![hello_dir.join("hello.proto")];
        if with_more {
            files.push(more_dir.join("moreprotos.proto"));
        }
        let registry = ProtoRegistry::load(&files, &[hello_dir, more_dir]).unwrap();
        Self {
            dir,
            registry: Arc::new(registry),
        }
    }

    pub fn descriptor(&self, name: &str) -> MessageDescriptor {
        self.registry
            .find_message_type(name)
            .unwrap_or_else(|| panic!("{name} not loaded"))
    }

    /// Binary encoding of the JSON form of `name`
    pub fn encode(&self, name: &str, json: &str) -> Vec<u8> {
        let mut deserializer = serde_json::Deserializer::from_str(json);
        let message = DynamicMessage::deserialize(self.descriptor(name), &mut deserializer).unwrap();
        deserializer.end().unwrap();
        message.encode_to_vec()
    }

    /// JSON view of a binary payload decoded as `name`
    pub fn decode(&self, name: &str, payload: &[u8]) -> serde_json::Value {
        let message = DynamicMessage::decode(self.descriptor(name), payload).unwrap();
        serde_json::to_value(&message).unwrap()
    }
}

/// What the mock upstream saw for one request
#[derive(Debug, Clone)]
pub struct Captured {
    pub content_type: Option<String>,
    pub path: String,
    pub query: Option<String>,
    pub body: Bytes,
}

impl Captured {
    /// Value of one query parameter, form-decoded
    pub fn query_param(&self, name: &str) -> Option<String> {
        let query = self.query.as_deref()?;
        url::form_urlencoded::parse(query.as_bytes())
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.into_owned())
    }
}

type Reply = dyn Fn(&Captured) -> (StatusCode, Vec<u8>) + Send + Sync;

/// In-process upstream recording every request it receives
pub struct MockUpstream {
    pub addr: SocketAddr,
    captured: Arc<Mutex<Vec<Captured>>>,
}

impl MockUpstream {
    pub async fn spawn(
        reply: impl Fn(&Captured) -> (StatusCode, Vec<u8>) + Send + Sync + 'static,
    ) -> Self {
        let captured = Arc::new(Mutex::new(Vec::new()));
        let reply: Arc<Reply> = Arc::new(reply);

        let app = {
            let captured = captured.clone();
            Router::new().fallback(move |req: Request| {
                let captured = captured.clone();
                let reply = reply.clone();
                async move {
                    let (parts, body) = req.into_parts();
                    let seen = Captured {
                        content_type: parts
                            .headers
                            .get(header::CONTENT_TYPE)
                            .map(|v| v.to_str().unwrap().to_string()),
                        path: parts.uri.path().to_string(),
                        query: parts.uri.query().map(str::to_string),
                        body: to_bytes(body, usize::MAX).await.unwrap(),
                    };
                    let (status, payload) = reply(&seen);
                    captured.lock().unwrap().push(seen);
                    Response::builder()
                        .status(status)
                        .header(header::CONTENT_TYPE, "application/x-protobuf")
                        .body(Body::from(payload))
                        .unwrap()
                }
            })
        };

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, captured }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn requests(&self) -> Vec<Captured> {
        self.captured.lock().unwrap().clone()
    }
}

/// Proxy router forwarding to `upstream`
pub fn proxy(schemas: &Schemas, upstream: &str, policy: EmptyDirectivePolicy) -> Router {
    let pipeline = Arc::new(TranscodePipeline::new(
        schemas.registry.clone(),
        Arc::new(ProtobufJsonCodec::new()),
        policy,
    ));
    let client = HttpClientAdapter::new(Duration::from_secs(5)).unwrap();
    let handler =
        ProxyHandler::new(pipeline, Arc::new(client), upstream, 1024 * 1024).unwrap();
    build_router(Arc::new(handler))
}

pub fn post(path: &str, content_type: &str, body: impl Into<Body>) -> Request {
    Request::builder()
        .method("POST")
        .uri(path)
        .header(header::CONTENT_TYPE, content_type)
        .body(body.into())
        .unwrap()
}

pub async fn body_bytes(response: Response) -> Bytes {
    to_bytes(response.into_body(), usize::MAX).await.unwrap()
}

/// Asserts no negotiation parameter leaked into the forwarded `Content-Type`
pub fn assert_params_stripped(captured: &Captured) {
    let content_type = captured.content_type.as_deref().unwrap_or_default();
    for param in ["reqmsg", "respmsg", "qs="] {
        assert!(
            !content_type.contains(param),
            "{param} leaked upstream: {content_type}"
        );
    }
}
