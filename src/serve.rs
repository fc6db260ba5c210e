//! Purpose: Provide the HTTP/JSON server for rpnstack.
//! Exports: `ServeConfig`, `serve`, `router`, `ErrorEnvelope`.
//! Role: Axum glue translating requests into `StackRegistry` calls.
//! Invariants: Stack contents serialize as top-first JSON arrays.
//! Invariants: Failures use a stable `{"error": {...}}` envelope; kinds map to fixed statuses.
//! Invariants: Loopback-only unless explicitly allowed.

use axum::extract::rejection::PathRejection;
use axum::extract::{Path as AxumPath, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use serde_json::json;
use std::future::IntoFuture;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tokio::time::Duration;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use rpnstack::api::{Error, ErrorKind, Operator, StackRegistry};

#[derive(Clone, Debug)]
pub struct ServeConfig {
    pub bind: SocketAddr,
    pub allow_non_loopback: bool,
}

#[derive(Clone)]
struct AppState {
    registry: Arc<StackRegistry>,
}

pub async fn serve(config: ServeConfig) -> Result<(), Error> {
    validate_config(&config)?;

    init_tracing();

    // Lives exactly as long as the server; dropped after shutdown drains.
    let registry = Arc::new(StackRegistry::new());
    let app = router(Arc::clone(&registry));

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message(format!("failed to bind {}", config.bind))
                .with_hint("Is another process already listening there? Pick one with --bind.")
                .with_source(err)
        })?;
    let local_addr = listener.local_addr().map_err(|err| {
        Error::new(ErrorKind::Io)
            .with_message("failed to read bound address")
            .with_source(err)
    })?;
    info!(%local_addr, "rpnstack listening");

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    let server = axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = shutdown_rx.await;
        })
        .into_future();
    tokio::pin!(server);

    tokio::select! {
        result = &mut server => {
            result.map_err(|err| {
                Error::new(ErrorKind::Io)
                    .with_message("server failed")
                    .with_source(err)
            })?;
        }
        _ = shutdown_signal() => {
            info!("shutdown requested");
            let _ = shutdown_tx.send(());
            match tokio::time::timeout(Duration::from_secs(10), &mut server).await {
                Ok(result) => result.map_err(|err| {
                    Error::new(ErrorKind::Io)
                        .with_message("server failed")
                        .with_source(err)
                })?,
                Err(_) => {
                    return Err(Error::new(ErrorKind::Io).with_message("server shutdown timed out"));
                }
            }
        }
    };
    if !registry.is_empty() {
        info!(stacks = registry.len(), "discarding live stacks");
    }
    info!("rpnstack stopped");
    Ok(())
}

pub fn router(registry: Arc<StackRegistry>) -> Router {
    let state = Arc::new(AppState { registry });
    Router::new()
        .route("/healthz", get(healthz).fallback(method_not_allowed))
        .route("/op", get(list_operators).fallback(method_not_allowed))
        .route(
            "/op/:op/stack/:stack",
            post(apply_operator).fallback(method_not_allowed),
        )
        .route(
            "/stack",
            get(list_stacks)
                .post(create_stack)
                .fallback(method_not_allowed),
        )
        .route(
            "/stack/:stack",
            get(get_stack)
                .post(push_value)
                .delete(delete_stack)
                .fallback(method_not_allowed),
        )
        .route(
            "/stack/:stack/clear",
            post(clear_stack).fallback(method_not_allowed),
        )
        .fallback(unknown_route)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn is_loopback(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(addr) => addr.is_loopback(),
        IpAddr::V6(addr) => addr.is_loopback(),
    }
}

fn validate_config(config: &ServeConfig) -> Result<(), Error> {
    if !is_loopback(config.bind.ip()) && !config.allow_non_loopback {
        return Err(Error::new(ErrorKind::Usage)
            .with_message("non-loopback bind requires explicit opt-in")
            .with_hint("Re-run with --allow-non-loopback or use a loopback address."));
    }
    Ok(())
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };
    #[cfg(unix)]
    let terminate = async {
        let mut signal = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("install SIGTERM handler");
        signal.recv().await;
    };
    #[cfg(unix)]
    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    #[cfg(not(unix))]
    ctrl_c.await;
}

async fn healthz() -> Response {
    Json(json!({ "ok": true })).into_response()
}

async fn list_operators() -> Response {
    let symbols: Vec<&str> = Operator::ALL.iter().map(|op| op.symbol()).collect();
    Json(symbols).into_response()
}

async fn list_stacks(State(state): State<Arc<AppState>>) -> Response {
    Json(state.registry.list()).into_response()
}

async fn get_stack(
    State(state): State<Arc<AppState>>,
    path: Result<AxumPath<String>, PathRejection>,
) -> Response {
    contents_response(path_params(path).and_then(|stack| state.registry.get(&stack)))
}

async fn create_stack(State(state): State<Arc<AppState>>) -> Response {
    match state.registry.create() {
        // A fresh stack is always empty.
        Ok(key) => (
            StatusCode::CREATED,
            [(header::LOCATION, format!("/stack/{key}"))],
            Json(Vec::<i64>::new()),
        )
            .into_response(),
        Err(err) => error_response(err),
    }
}

async fn delete_stack(
    State(state): State<Arc<AppState>>,
    path: Result<AxumPath<String>, PathRejection>,
) -> Response {
    match path_params(path).and_then(|stack| state.registry.delete(&stack)) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => error_response(err),
    }
}

async fn push_value(
    State(state): State<Arc<AppState>>,
    path: Result<AxumPath<String>, PathRejection>,
) -> Response {
    contents_response(path_params(path).and_then(|stack| state.registry.push(&stack)))
}

async fn clear_stack(
    State(state): State<Arc<AppState>>,
    path: Result<AxumPath<String>, PathRejection>,
) -> Response {
    contents_response(path_params(path).and_then(|stack| state.registry.clear(&stack)))
}

async fn apply_operator(
    State(state): State<Arc<AppState>>,
    path: Result<AxumPath<(String, String)>, PathRejection>,
) -> Response {
    contents_response(path_params(path).and_then(|(op, stack)| state.registry.apply(&stack, &op)))
}

// Segments that do not decode to UTF-8 cannot name a live stack.
fn path_params<T>(path: Result<AxumPath<T>, PathRejection>) -> Result<T, Error> {
    match path {
        Ok(AxumPath(params)) => Ok(params),
        Err(rejection) => Err(Error::new(ErrorKind::NotFound)
            .with_message("stack not found")
            .with_hint("Stack ids are the UUIDs returned by POST /stack.")
            .with_source(rejection)),
    }
}

async fn method_not_allowed() -> Response {
    error_response_with_status(
        Error::new(ErrorKind::Usage)
            .with_message("method not allowed")
            .with_hint("Reads use GET; changes use POST or DELETE."),
        StatusCode::METHOD_NOT_ALLOWED,
    )
}

async fn unknown_route() -> Response {
    error_response_with_status(
        Error::new(ErrorKind::NotFound)
            .with_message("no such route")
            .with_hint("Routes live under /op and /stack."),
        StatusCode::NOT_FOUND,
    )
}

/// `{"error": {...}}` body shared by HTTP responses and CLI stderr.
#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    kind: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    hint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stack: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    op: Option<String>,
}

impl ErrorEnvelope {
    pub fn new(err: &Error) -> Self {
        Self {
            error: ErrorBody {
                kind: format!("{:?}", err.kind()),
                message: err.message().unwrap_or("error").to_string(),
                hint: err.hint().map(str::to_string),
                stack: err.stack().map(str::to_string),
                op: err.op().map(str::to_string),
            },
        }
    }
}

fn contents_response(result: Result<Vec<i64>, Error>) -> Response {
    match result {
        Ok(values) => Json(values).into_response(),
        Err(err) => error_response(err),
    }
}

fn error_response(err: Error) -> Response {
    let status = match err.kind() {
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Usage
        | ErrorKind::UnknownOperator
        | ErrorKind::InsufficientOperands
        | ErrorKind::DivisionByZero
        | ErrorKind::Overflow => StatusCode::BAD_REQUEST,
        ErrorKind::Io | ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error_response_with_status(err, status)
}

fn error_response_with_status(err: Error, status: StatusCode) -> Response {
    (status, Json(ErrorEnvelope::new(&err))).into_response()
}
