use std::{net::SocketAddr, sync::Arc};

use axum::{Router, extract::Request, routing::any};
use eyre::{Result, WrapErr};
use tower_http::trace::TraceLayer;

use crate::{
    adapters::ProxyHandler,
    ports::http_server::HttpServer,
    utils::GracefulShutdown,
};

/// Build the router sending every path and method through `handler`
pub fn build_router(handler: Arc<ProxyHandler>) -> Router {
    let route = |handler: Arc<ProxyHandler>| {
        any(move |req: Request| {
            let handler = handler.clone();
            async move { handler.handle_request(req).await }
        })
    };

    Router::new()
        .route("/", route(handler.clone()))
        .route("/{*path}", route(handler))
        .layer(TraceLayer::new_for_http())
}

/// Plain HTTP listener serving the proxy until a shutdown signal arrives
pub struct ProxyServer {
    listen_addr: SocketAddr,
    handler: Arc<ProxyHandler>,
    shutdown: Arc<GracefulShutdown>,
}

impl ProxyServer {
    pub fn new(
        listen_addr: SocketAddr,
        handler: Arc<ProxyHandler>,
        shutdown: Arc<GracefulShutdown>,
    ) -> Self {
        Self {
            listen_addr,
            handler,
            shutdown,
        }
    }
}

impl HttpServer for ProxyServer {
    fn run(&self) -> impl std::future::Future<Output = Result<()>> + Send {
        let listen_addr = self.listen_addr;
        let app = build_router(self.handler.clone());
        let shutdown = self.shutdown.clone();

        async move {
            let listener = tokio::net::TcpListener::bind(listen_addr)
                .await
                .wrap_err_with(|| format!("Failed to bind to {listen_addr}"))?;
            tracing::info!("protobridge listening on {}", listen_addr);

            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let reason = shutdown.wait_for_shutdown_signal().await;
                    tracing::info!("Shutting down: {:?}", reason);
                })
                .await
                .wrap_err("Server error")
        }
    }
}
