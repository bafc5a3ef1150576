//! HTTP server configuration and request routing.
//!
//! Axum server setup with the middleware stack for duty-schedule
//! submission. Requests flow through middleware in order:
//! 1. Request ID generation
//! 2. Panic recovery (generic 500, never an empty response)
//! 3. Request/response logging
//! 4. Timeout enforcement (30s)
//! 5. Client principal gate
//! 6. Handler execution
//!
//! # Graceful Shutdown
//!
//! The server handles SIGINT/SIGTERM gracefully: it stops accepting new
//! connections and lets in-flight requests complete.

use std::{any::Any, net::SocketAddr, sync::Arc, time::Duration};

use axum::{
    body::Body,
    extract::Request,
    http::{Response as HttpResponse, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use rota_core::{Clock, ScheduleStore};
use tower_http::{catch_panic::CatchPanicLayer, timeout::TimeoutLayer, trace::TraceLayer};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    handlers::{self, ErrorResponse},
    middleware::auth::principal_gate,
};

/// Shared state injected into the gate and handlers.
///
/// Built once at startup; read-only afterwards. Each request is an
/// independent, stateless execution over this state.
#[derive(Clone)]
pub struct AppState {
    /// Configured schedule store. `None` until `DATABASE_URL` is set, in
    /// which case submissions are rejected with the configuration error.
    pub store: Option<Arc<dyn ScheduleStore>>,
    /// Optional email-domain allowlist suffix. Unset disables the domain
    /// check entirely.
    pub allowed_email_domain: Option<String>,
    /// Clock used to derive `saved_at` and the entry id.
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    /// Creates the application state.
    pub fn new(
        store: Option<Arc<dyn ScheduleStore>>,
        allowed_email_domain: Option<String>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { store, allowed_email_domain, clock }
    }
}

/// Creates the Axum router with all routes and middleware.
///
/// The principal gate wraps the submission route only; the outer layers
/// (timeout, tracing, panic recovery, request ids) wrap everything.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/duties", post(handlers::save_duties))
        .layer(middleware::from_fn_with_state(state.clone(), principal_gate))
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(middleware::from_fn(inject_request_id))
        .with_state(state)
}

/// Middleware to inject request ID into all responses.
///
/// Adds an `X-Request-Id` header for tracing requests across services.
async fn inject_request_id(req: Request, next: Next) -> Response {
    let request_id = Uuid::new_v4().to_string();

    let mut req = req;
    req.extensions_mut().insert(request_id.clone());

    let mut response = next.run(req).await;

    if let Ok(header_value) = request_id.parse() {
        response.headers_mut().insert("X-Request-Id", header_value);
    }

    response
}

/// Converts a handler panic into the generic internal-error response.
///
/// The pipeline must never terminate without emitting a well-formed JSON
/// body, whatever faulted inside it.
fn handle_panic(err: Box<dyn Any + Send + 'static>) -> HttpResponse<Body> {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.as_str()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s
    } else {
        "unknown panic"
    };

    error!(panic = %detail, "unexpected fault while handling request");

    (StatusCode::INTERNAL_SERVER_ERROR, Json(ErrorResponse::new("Internal server error")))
        .into_response()
}

/// Starts the HTTP server with graceful shutdown support.
///
/// Binds to the specified address and serves requests until a shutdown
/// signal is received.
///
/// # Errors
///
/// Returns `std::io::Error` if the port is already in use or the network
/// interface is unavailable.
pub async fn start_server(state: AppState, addr: SocketAddr) -> Result<(), std::io::Error> {
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let actual_addr = listener.local_addr()?;

    info!("HTTP server listening on {}", actual_addr);

    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    info!("HTTP server stopped gracefully");
    Ok(())
}

/// Waits for shutdown signal (CTRL+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received CTRL+C, starting graceful shutdown");
        },
        () = terminate => {
            info!("Received SIGTERM, starting graceful shutdown");
        },
    }

    warn!("Waiting for in-flight requests to complete");
}
