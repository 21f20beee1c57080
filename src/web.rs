use crate::{
    app::{AppError, AppService, ArtifactInput},
    artifacts::{Artifact, SearchResult},
    auth::{require_write_token, WriteToken},
};
use axum::{
    extract::{rejection::PathRejection, Path, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tokio::signal;

#[derive(Clone)]
struct SharedState {
    app: Arc<AppService>,
}

/// HTTP surface: search plus the bookmark CRUD passthrough.
///
/// Writes (create, update, delete) go through the bearer-token gate.
pub fn router(app: Arc<AppService>, token: WriteToken) -> Router {
    let shared_state = Arc::new(SharedState { app });
    let gate = || middleware::from_fn_with_state(token.clone(), require_write_token);

    Router::new()
        .route(
            "/api/bookmarks",
            get(list).merge(post(create).route_layer(gate())),
        )
        .route(
            "/api/bookmarks/:id",
            get(show).merge(
                axum::routing::put(update)
                    .delete(delete)
                    .route_layer(gate()),
            ),
        )
        .route("/api/search", post(search))
        .layer(
            tower_http::trace::TraceLayer::new_for_http()
                .make_span_with(
                    tower_http::trace::DefaultMakeSpan::new().level(tracing::Level::INFO),
                )
                .on_response(
                    tower_http::trace::DefaultOnResponse::new().level(tracing::Level::INFO),
                ),
        )
        .with_state(shared_state)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            log::error!("failed to install Ctrl+C handler: {err}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                log::error!("failed to install signal handler: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    log::warn!("shutting down");
}

async fn start_app(app: Arc<AppService>, listen: &str, token: WriteToken) -> anyhow::Result<()> {
    if !token.is_enabled() {
        log::warn!("SEMMARK_AUTH_TOKEN is not set, write endpoints are open");
    }

    log::info!("search settings: {:?}", app.search_config());

    let router = router(app, token);

    let listener = tokio::net::TcpListener::bind(listen).await?;
    log::info!("listening on {listen}");
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

pub fn start_daemon(app: AppService, listen: &str, token: WriteToken) -> anyhow::Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    // the blocking http client inside the embedder must be dropped outside the runtime
    let app = Arc::new(app);
    runtime.block_on(start_app(app.clone(), listen, token))
}

#[derive(Debug)]
struct HttpError(AppError);

impl IntoResponse for HttpError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self.0 {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            err if err.is_retryable() => {
                log::warn!("{self:?}");
                StatusCode::SERVICE_UNAVAILABLE
            }
            _ => {
                log::error!("{self:?}");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (status, Json(json!({"error": self.0.to_string()}))).into_response()
    }
}

impl<E> From<E> for HttpError
where
    E: Into<AppError>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

/// Numeric id from the path; anything else is a validation error.
fn bookmark_id(id: Result<Path<u64>, PathRejection>) -> Result<u64, HttpError> {
    match id {
        Ok(Path(id)) => Ok(id),
        Err(rejection) => {
            log::debug!("bad bookmark id: {rejection}");
            Err(HttpError(AppError::Validation(
                "Invalid bookmark ID.".to_string(),
            )))
        }
    }
}

async fn list(
    State(state): State<Arc<SharedState>>,
) -> Result<Json<Vec<Artifact>>, HttpError> {
    let app = state.app.clone();

    tokio::task::block_in_place(move || Ok(Json(app.list()?)))
}

async fn show(
    State(state): State<Arc<SharedState>>,
    id: Result<Path<u64>, PathRejection>,
) -> Result<Json<Artifact>, HttpError> {
    let id = bookmark_id(id)?;
    let app = state.app.clone();

    tokio::task::block_in_place(move || Ok(Json(app.get(id)?)))
}

async fn create(
    State(state): State<Arc<SharedState>>,
    Json(payload): Json<ArtifactInput>,
) -> Result<(StatusCode, Json<Artifact>), HttpError> {
    log::debug!("payload: {payload:?}");

    let app = state.app.clone();

    tokio::task::block_in_place(move || {
        let artifact = app.create(payload)?;
        Ok((StatusCode::CREATED, Json(artifact)))
    })
}

async fn update(
    State(state): State<Arc<SharedState>>,
    id: Result<Path<u64>, PathRejection>,
    Json(payload): Json<ArtifactInput>,
) -> Result<Json<Artifact>, HttpError> {
    log::debug!("payload: {payload:?}");

    let id = bookmark_id(id)?;
    let app = state.app.clone();

    tokio::task::block_in_place(move || Ok(Json(app.update(id, payload)?)))
}

async fn delete(
    State(state): State<Arc<SharedState>>,
    id: Result<Path<u64>, PathRejection>,
) -> Result<Json<serde_json::Value>, HttpError> {
    let id = bookmark_id(id)?;
    let app = state.app.clone();

    tokio::task::block_in_place(move || {
        app.delete(id)?;
        Ok(Json(json!({"message": "Bookmark deleted successfully."})))
    })
}

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    #[serde(default)]
    pub query: String,
}

async fn search(
    State(state): State<Arc<SharedState>>,
    Json(payload): Json<SearchRequest>,
) -> Result<Json<Vec<SearchResult>>, HttpError> {
    log::debug!("payload: {payload:?}");

    let app = state.app.clone();

    tokio::task::block_in_place(move || Ok(Json(app.search(&payload.query)?)))
}
