// End-to-end tests: client -> proxy router -> mock protobuf upstream over real TCP
mod common;

use axum::http::{StatusCode, header};
use base64::{Engine, engine::general_purpose::URL_SAFE};
use common::{MockUpstream, Schemas, assert_params_stripped, body_bytes, post, proxy};
use protobridge::{adapters::FAILURE_BODY, config::EmptyDirectivePolicy};
use serde_json::json;
use tower::ServiceExt;

const REQ_JSON: &str = r#"{"text":"some text","number":123,"list":["this","is","a","list"]}"#;
const RESP_JSON: &str = r#"{"text":"This is a response"}"#;

/// Upstream answering every request with `testprotos.Resp`
async fn resp_upstream(schemas: &Schemas) -> MockUpstream {
    let reply = schemas.encode("testprotos.Resp", RESP_JSON);
    MockUpstream::spawn(move |_| (StatusCode::OK, reply.clone())).await
}

#[tokio::test]
async fn test_request_and_response_are_transcoded() {
    let schemas = Schemas::hello();
    let upstream = resp_upstream(&schemas).await;
    let app = proxy(&schemas, &upstream.url(), EmptyDirectivePolicy::Reject);

    let response = app
        .oneshot(post(
            "/api/hello?lang=en",
            "application/x-protobuf; reqmsg=testprotos.Req; respmsg=testprotos.Resp;",
            REQ_JSON,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/json"
    );
    assert_eq!(body_bytes(response).await, RESP_JSON);

    let requests = upstream.requests();
    assert_eq!(requests.len(), 1);
    let seen = &requests[0];
    assert_params_stripped(seen);
    assert_eq!(seen.content_type.as_deref(), Some("application/x-protobuf"));
    assert_eq!(seen.path, "/api/hello");
    assert_eq!(seen.query.as_deref(), Some("lang=en"));
    assert_eq!(
        schemas.decode("testprotos.Req", &seen.body),
        json!({"text": "some text", "number": 123, "list": ["this", "is", "a", "list"]})
    );
}

#[tokio::test]
async fn test_first_decodable_candidate_is_selected() {
    let schemas = Schemas::hello();
    let resp = schemas.encode("testprotos.Resp", RESP_JSON);
    let resp2 = schemas.encode("testprotos.Resp2", r#"{"number":44}"#);
    let req_descriptor = schemas.descriptor("testprotos.Req");

    // Answers Resp2 only when asked for it
    let upstream = MockUpstream::spawn(move |seen| {
        let req = prost_reflect::DynamicMessage::decode(req_descriptor.clone(), seen.body.as_ref())
            .unwrap();
        let wants_resp2 = req
            .get_field_by_name("text")
            .is_some_and(|text| text.as_str() == Some("want resp2"));
        let reply = if wants_resp2 { resp2.clone() } else { resp.clone() };
        (StatusCode::OK, reply)
    })
    .await;

    let content_type = r#"application/x-protobuf; reqmsg=testprotos.Req; respmsg="testprotos.Resp,testprotos.Resp2";"#;
    let cases = [
        (r#"{"text":"want resp1","number":123}"#, RESP_JSON),
        (r#"{"text":"want resp2","number":123}"#, r#"{"number":44}"#),
    ];

    for (request, expected) in cases {
        let app = proxy(&schemas, &upstream.url(), EmptyDirectivePolicy::Reject);
        let response = app
            .oneshot(post("/multi", content_type, request))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_bytes(response).await, expected);
    }

    for seen in upstream.requests() {
        assert_params_stripped(&seen);
    }
}

#[tokio::test]
async fn test_query_string_placement() {
    let schemas = Schemas::hello();
    let upstream = resp_upstream(&schemas).await;
    let app = proxy(&schemas, &upstream.url(), EmptyDirectivePolicy::Reject);

    let response = app
        .oneshot(post(
            "/search?page=2",
            "application/x-protobuf; reqmsg=testprotos.Req; respmsg=testprotos.Resp; qs=proto_body",
            REQ_JSON,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response).await, RESP_JSON);

    let seen = &upstream.requests()[0];
    assert_params_stripped(seen);
    assert!(seen.body.is_empty());
    assert_eq!(seen.query_param("page").as_deref(), Some("2"));

    let encoded = seen.query_param("proto_body").unwrap();
    let payload = URL_SAFE.decode(encoded).unwrap();
    assert_eq!(
        schemas.decode("testprotos.Req", &payload),
        json!({"text": "some text", "number": 123, "list": ["this", "is", "a", "list"]})
    );
}

#[tokio::test]
async fn test_types_from_imported_file() {
    let schemas = Schemas::hello_and_more();
    let upstream = resp_upstream(&schemas).await;
    let app = proxy(&schemas, &upstream.url(), EmptyDirectivePolicy::Reject);

    let body = r#"{"subReq": {"text":"some text","number":123,"list":["this","is","a","list"]}, "num": 22}"#;
    let response = app
        .oneshot(post(
            "/",
            "application/x-protobuf; reqmsg=moreprotos.Req; respmsg=testprotos.Resp;",
            body,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response).await, RESP_JSON);

    let seen = &upstream.requests()[0];
    assert_eq!(
        schemas.decode("moreprotos.Req", &seen.body),
        json!({
            "subReq": {"text": "some text", "number": 123, "list": ["this", "is", "a", "list"]},
            "num": 22
        })
    );
}

#[tokio::test]
async fn test_default_fields_are_emitted() {
    let schemas = Schemas::hello();
    let upstream = MockUpstream::spawn(|_| (StatusCode::OK, Vec::new())).await;
    let app = proxy(&schemas, &upstream.url(), EmptyDirectivePolicy::Reject);

    let response = app
        .oneshot(post(
            "/",
            "application/x-protobuf; reqmsg=testprotos.Req; respmsg=testprotos.Resp2",
            "{}",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response).await, r#"{"number":0}"#);
}

#[tokio::test]
async fn test_upstream_status_is_preserved() {
    let schemas = Schemas::hello();
    let reply = schemas.encode("testprotos.Resp", r#"{"text":"missing"}"#);
    let upstream = MockUpstream::spawn(move |_| (StatusCode::NOT_FOUND, reply.clone())).await;
    let app = proxy(&schemas, &upstream.url(), EmptyDirectivePolicy::Reject);

    let response = app
        .oneshot(post(
            "/",
            "application/x-protobuf; reqmsg=testprotos.Req; respmsg=testprotos.Resp",
            REQ_JSON,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_bytes(response).await, r#"{"text":"missing"}"#);
}

#[tokio::test]
async fn test_failures_are_opaque_and_stop_before_upstream() {
    let schemas = Schemas::hello();
    let upstream = resp_upstream(&schemas).await;

    let cases = [
        // Unknown request type
        (
            "application/x-protobuf; reqmsg=testprotos.DoesntExist; respmsg=testprotos.Resp;",
            REQ_JSON,
        ),
        // Unknown response type
        (
            "application/x-protobuf; reqmsg=testprotos.Req; respmsg=testprotos.DoesntExist;",
            REQ_JSON,
        ),
        // Not a media type
        ("invalid", REQ_JSON),
        // No message types named
        ("application/x-protobuf", ""),
        // Body does not match the request type
        (
            "application/x-protobuf; reqmsg=testprotos.Req; respmsg=testprotos.Resp;",
            r#"{"bad key":"bad value"}"#,
        ),
    ];

    for (content_type, body) in cases {
        let app = proxy(&schemas, &upstream.url(), EmptyDirectivePolicy::Reject);
        let response = app.oneshot(post("/", content_type, body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{content_type}");
        assert_eq!(body_bytes(response).await, FAILURE_BODY);
    }

    assert!(upstream.requests().is_empty());
}

#[tokio::test]
async fn test_undecodable_response_is_opaque_failure() {
    let schemas = Schemas::hello();
    // Truncated length-delimited field
    let upstream = MockUpstream::spawn(|_| (StatusCode::OK, vec![0x0a, 0x10, b'x'])).await;
    let app = proxy(&schemas, &upstream.url(), EmptyDirectivePolicy::Reject);

    let response = app
        .oneshot(post(
            "/",
            "application/x-protobuf; reqmsg=testprotos.Req; respmsg=testprotos.Resp",
            REQ_JSON,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_bytes(response).await, FAILURE_BODY);
    assert_eq!(upstream.requests().len(), 1);
}

#[tokio::test]
async fn test_unreachable_upstream_is_opaque_failure() {
    let schemas = Schemas::hello();
    let addr = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    };
    let app = proxy(&schemas, &format!("http://{addr}"), EmptyDirectivePolicy::Reject);

    let response = app
        .oneshot(post(
            "/",
            "application/x-protobuf; reqmsg=testprotos.Req; respmsg=testprotos.Resp",
            REQ_JSON,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_bytes(response).await, FAILURE_BODY);
}

#[tokio::test]
async fn test_response_only_directive_forwards_body_untouched() {
    let schemas = Schemas::hello();
    let upstream = resp_upstream(&schemas).await;
    let app = proxy(&schemas, &upstream.url(), EmptyDirectivePolicy::Reject);
    let raw = schemas.encode("testprotos.Req", REQ_JSON);

    let response = app
        .oneshot(post(
            "/raw",
            "application/x-protobuf; respmsg=testprotos.Resp",
            raw.clone(),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response).await, RESP_JSON);

    let seen = &upstream.requests()[0];
    assert_params_stripped(seen);
    assert_eq!(seen.content_type.as_deref(), Some("application/x-protobuf"));
    assert_eq!(seen.body.as_ref(), raw.as_slice());
}

#[tokio::test]
async fn test_empty_directive_passes_through_when_configured() {
    let schemas = Schemas::hello();
    let upstream = MockUpstream::spawn(|seen| (StatusCode::OK, seen.body.to_vec())).await;
    let app = proxy(&schemas, &upstream.url(), EmptyDirectivePolicy::PassThrough);

    let response = app
        .oneshot(post("/echo", "text/plain; charset=utf-8", "hello"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/x-protobuf"
    );
    assert_eq!(body_bytes(response).await, "hello");

    let seen = &upstream.requests()[0];
    assert_eq!(seen.content_type.as_deref(), Some("text/plain; charset=utf-8"));
}
