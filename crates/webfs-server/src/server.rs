// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! HTTP surface wiring and serve lifecycle.
//!
//! `/fs/<op>` wraps the [`FileNode`] dispatch in the uniform call/reply
//! envelopes; POSIX failures stay inside the envelope with HTTP 200, and
//! non-2xx statuses are reserved for transport or parsing trouble.

use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, Path as UrlPath, State};
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Json, Redirect, Response};
use axum::routing::{any, get};
use axum::Router;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::Notify;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;
use url::Url;

use webfs_proto::CallArgs;

use crate::blob;
use crate::node::FileNode;
use crate::procs::{self, ProcStore};
use crate::respond::{internal_server_error, not_supported};

/// Serve-side configuration: where to listen, what to export and the
/// public URL blob hrefs are minted under.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub root: PathBuf,
    pub url: Url,
}

#[derive(Clone)]
pub struct AppState {
    pub(crate) node: Arc<FileNode>,
    pub(crate) procs: Arc<ProcStore>,
    pub(crate) root: PathBuf,
    pub(crate) shutdown: Arc<Notify>,
}

/// The webfs HTTP server.
pub struct Server {
    config: ServerConfig,
    state: AppState,
}

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("filesystem root rejected: {0}")]
    Root(webfs_proto::Errno),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Server {
    pub fn new(config: ServerConfig) -> Result<Self, ServerError> {
        let node =
            FileNode::new(&config.root, config.url.clone()).map_err(ServerError::Root)?;
        let state = AppState {
            node: Arc::new(node),
            procs: Arc::new(ProcStore::new(config.root.clone(), config.url.clone())),
            root: config.root.clone(),
            shutdown: Arc::new(Notify::new()),
        };
        Ok(Server { config, state })
    }

    /// Build the full route table. Exposed so tests can serve it on an
    /// ephemeral listener.
    pub fn app(&self) -> Router {
        let browse_url = self
            .config
            .url
            .join("root/")
            .map(|u| u.to_string())
            .unwrap_or_else(|_| "/root/".to_string());

        Router::new()
            .route("/health", get(health))
            .route("/shutdown", get(request_shutdown).post(request_shutdown))
            .route("/fs/:op", any(fs_call))
            .route(
                "/blob/*token",
                get(blob::download)
                    .post(blob::upload)
                    .layer(DefaultBodyLimit::max(blob::MAX_UPLOAD_SIZE)),
            )
            .route("/volumes/*path", get(blob::volume_download))
            .route("/procs", get(procs::list_procs).post(procs::create_proc))
            .route("/procs/", get(procs::list_procs).post(procs::create_proc))
            .route(
                "/procs/:id",
                get(procs::get_proc).delete(procs::remove_proc),
            )
            .nest_service("/root", ServeDir::new(&self.config.root))
            .route("/", get(move || async move { Redirect::to(&browse_url) }))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Bind and serve until a termination signal or a `/shutdown` request.
    pub async fn run(self) -> Result<(), ServerError> {
        let addr = format!("0.0.0.0:{}", self.config.port);
        let listener = tokio::net::TcpListener::bind(&addr).await?;
        info!(
            root = %self.config.root.display(),
            url = %self.config.url,
            "server listening at {}",
            addr
        );

        let shutdown = self.state.shutdown.clone();
        let app = self.app();
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal(shutdown))
            .await?;
        info!("server shut down");
        Ok(())
    }
}

async fn shutdown_signal(notify: Arc<Notify>) {
    let mut sigint = match signal(SignalKind::interrupt()) {
        Ok(s) => s,
        Err(_) => return notify.notified().await,
    };
    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(_) => return notify.notified().await,
    };
    tokio::select! {
        _ = sigint.recv() => info!("caught SIGINT, shutting down"),
        _ = sigterm.recv() => info!("caught SIGTERM, shutting down"),
        _ = notify.notified() => info!("shutdown requested over http"),
    }
}

async fn health() -> &'static str {
    "OK\n"
}

async fn request_shutdown(State(state): State<AppState>) -> &'static str {
    state.shutdown.notify_one();
    "OK\n"
}

/// The `/fs/<op>` dispatcher. Any method that carries a body is accepted;
/// OPTIONS advertises the surface.
async fn fs_call(
    State(state): State<AppState>,
    UrlPath(op): UrlPath<String>,
    method: Method,
    body: Bytes,
) -> Response {
    if method == Method::OPTIONS {
        return (
            [
                (
                    header::ALLOW,
                    HeaderValue::from_static("OPTIONS, GET, HEAD, POST, DELETE, PATCH, PUT"),
                ),
                (
                    header::HeaderName::from_static("x-web-fs"),
                    HeaderValue::from_static("1.0.0"),
                ),
            ],
            StatusCode::OK,
        )
            .into_response();
    }

    let args: CallArgs = match serde_json::from_slice(&body) {
        Ok(args) => args,
        Err(err) => return internal_server_error(err),
    };

    let node = state.node.clone();
    let op_name = op.clone();
    let joined = tokio::task::spawn_blocking(move || node.dispatch(&op, &args)).await;
    match joined {
        Ok(Some(result)) => Json(result).into_response(),
        Ok(None) => not_supported(&method, format!("/fs/{}", op_name)),
        Err(err) => internal_server_error(err),
    }
}
