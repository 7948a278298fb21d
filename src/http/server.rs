//! HTTP server setup and request dispatch.
//!
//! # Responsibilities
//! - Create Axum Router with the catch-all handler
//! - Wire up middleware (tracing, timeout, request ID)
//! - Resolve each request to a location and its origin
//! - Run the response filter chain over the origin response
//! - Swap in recompiled routes when the configuration changes

use arc_swap::ArcSwap;
use axum::{
    body::Body,
    extract::State,
    http::{header, Method, Request, StatusCode},
    response::Response,
    routing::any,
    Router,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::ProxyConfig;
use crate::filter::{self, FilterChain, FilteredBody, RequestContext};
use crate::http::request::{self, UuidRequestId, X_REQUEST_ID};
use crate::http::response::{build_response, error_response, into_body, FILE_READ_BUFFER};
use crate::observability::metrics;
use crate::origin::Origins;
use crate::routing::Router as LocationRouter;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub routes: Arc<ArcSwap<LocationRouter>>,
    pub origins: Origins,
    pub chain: Arc<FilterChain>,
}

/// The pseudo-streaming HTTP server.
pub struct HttpServer {
    router: Router,
    routes: Arc<ArcSwap<LocationRouter>>,
    config: ProxyConfig,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: ProxyConfig) -> Self {
        let routes = Arc::new(ArcSwap::from_pointee(LocationRouter::from_config(&config)));
        let chain = Arc::new(filter::default_chain());

        tracing::info!(
            servers = ?routes.load().server_names(),
            locations = routes.load().location_count(),
            filters = ?chain.stage_names(),
            "Routes compiled"
        );

        let state = AppState {
            routes: routes.clone(),
            origins: Origins::new(&config),
            chain,
        };

        let router = Self::build_router(&config, state);
        Self {
            router,
            routes,
            config,
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ProxyConfig, state: AppState) -> Router {
        let trace = TraceLayer::new_for_http().make_span_with(|req: &Request<Body>| {
            tracing::info_span!(
                "request",
                method = %req.method(),
                uri = %req.uri(),
                request_id = %request::request_id(req.headers()),
            )
        });

        Router::new()
            .route("/{*path}", any(serve_handler))
            .route("/", any(serve_handler))
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(PropagateRequestIdLayer::new(X_REQUEST_ID.clone()))
            .layer(trace)
            .layer(SetRequestIdLayer::new(X_REQUEST_ID.clone(), UuidRequestId))
    }

    /// Shared handle to the live routing table.
    pub fn routes(&self) -> Arc<ArcSwap<LocationRouter>> {
        self.routes.clone()
    }

    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    /// Serve until `shutdown` fires. Every config received on
    /// `config_updates` replaces the routing table for new requests.
    pub async fn run(
        self,
        listener: TcpListener,
        config_updates: Option<mpsc::UnboundedReceiver<ProxyConfig>>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        if let Some(mut updates) = config_updates {
            let routes = self.routes.clone();
            tokio::spawn(async move {
                while let Some(config) = updates.recv().await {
                    let compiled = LocationRouter::from_config(&config);
                    tracing::info!(
                        locations = compiled.location_count(),
                        "Routing table swapped"
                    );
                    routes.store(Arc::new(compiled));
                }
            });
        }

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Resolves the location, fetches from its origin and filters the result.
async fn serve_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start_time = Instant::now();
    let request_id = request::request_id(request.headers());
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let host = request
        .headers()
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .or_else(|| request.uri().host())
        .map(str::to_owned);

    let routes = state.routes.load_full();
    let Some(location) = routes.match_request(host.as_deref(), &path) else {
        tracing::warn!(request_id = %request_id, host = ?host, path = %path, "No location matched");
        metrics::record_request(method.as_str(), 404, "none", start_time);
        return error_response(StatusCode::NOT_FOUND, "No matching location");
    };

    let mut ctx = RequestContext::new(request_id.clone(), method.clone(), request.version())
        .with_query(request.uri().query())
        .with_filter_mode(location.filter_mode);

    tracing::debug!(
        request_id = %request_id,
        path = %path,
        location = %location.path_prefix(),
        origin = location.origin.kind(),
        mode = %location.filter_mode,
        "Dispatching request"
    );

    let origin = match state.origins.fetch(&location.origin, request).await {
        Ok(origin) => origin,
        Err(e) => {
            let status = e.status();
            tracing::warn!(request_id = %request_id, path = %path, error = %e, "Origin failed");
            metrics::record_request(method.as_str(), status.as_u16(), location.origin.kind(), start_time);
            return error_response(status, e.to_string());
        }
    };

    ctx = ctx.with_cache_status(origin.cache_status);
    let mut head = origin.head;

    if let Err(e) = state.chain.filter_head(&mut ctx, &mut head) {
        tracing::error!(request_id = %request_id, error = %e, "Header filter failed");
        metrics::record_request(method.as_str(), 500, location.origin.kind(), start_time);
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error");
    }

    if let Some(seek) = &ctx.flv_seek {
        tracing::debug!(
            request_id = %request_id,
            start = seek.start(),
            content_length = ?head.content_length,
            "Seek accepted"
        );
    }

    metrics::record_request(method.as_str(), head.status.as_u16(), location.origin.kind(), start_time);

    let body = if method == Method::HEAD {
        Body::empty()
    } else {
        into_body(
            FilteredBody::new(origin.body, state.chain.clone(), ctx),
            FILE_READ_BUFFER,
        )
    };

    build_response(head, body)
}
