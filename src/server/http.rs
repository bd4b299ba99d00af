//! HTTP server for the single-page UI
//!
//! Hosts exactly one session. Every handler locks it for the whole action,
//! so a submit waiting on the model blocks other actions until it finishes.

use anyhow::Result;
use axum::{
    body::Body,
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use rust_embed::RustEmbed;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::Config;
use crate::controller::{Action, ActionResult, Controller};
use crate::image::UploadedImage;
use crate::session::{Message, Session, SessionState};

#[derive(RustEmbed)]
#[folder = "ui/"]
struct Assets;

pub struct Server {
    config: Config,
    controller: Controller,
}

struct AppState {
    config: Config,
    controller: Controller,
    session: Mutex<Session>,
}

impl Server {
    pub fn new(config: &Config) -> Result<Self> {
        let controller = Controller::from_config(config)?;
        Ok(Self::with_controller(config, controller))
    }

    pub fn with_controller(config: &Config, controller: Controller) -> Self {
        Self {
            config: config.clone(),
            controller,
        }
    }

    pub fn router(&self) -> Router {
        let state = Arc::new(AppState {
            config: self.config.clone(),
            controller: self.controller.clone(),
            session: Mutex::new(Session::new()),
        });

        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        Router::new()
            .route("/", get(index))
            .route("/assets/{*path}", get(static_asset))
            .route("/health", get(health_check))
            .route("/api/session", get(get_session))
            .route(
                "/api/image",
                get(get_image).post(upload_image).delete(remove_image),
            )
            .route("/api/submit", post(submit))
            .route("/api/clear", post(clear))
            .layer(DefaultBodyLimit::max(self.config.server.max_upload_bytes))
            .layer(TraceLayer::new_for_http())
            .layer(cors)
            .with_state(state)
    }

    pub async fn run(&self) -> Result<()> {
        let app = self.router();

        let addr: SocketAddr =
            format!("{}:{}", self.config.server.bind, self.config.server.port).parse()?;

        info!(
            "Starting Gemini Vision chat on http://{} (model: {})",
            addr,
            self.controller.model_id()
        );

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }
}

// Error response type
struct AppError(StatusCode, String);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.0, Json(ErrorBody { error: self.1 })).into_response()
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

#[derive(Serialize)]
struct ImageView {
    name: String,
    media_type: String,
    width: u32,
    height: u32,
    size: usize,
}

#[derive(Serialize)]
struct SessionView {
    session_id: String,
    state: SessionState,
    model: String,
    thumbnail_width: u32,
    image: Option<ImageView>,
    messages: Vec<Message>,
}

impl SessionView {
    fn new(state: &AppState, session: &Session) -> Self {
        Self {
            session_id: session.id().to_string(),
            state: session.state(),
            model: state.controller.model_id().to_string(),
            thumbnail_width: state.config.ui.thumbnail_width,
            image: session.current_image().map(|img| ImageView {
                name: img.name.clone(),
                media_type: img.media_type().to_string(),
                width: img.width,
                height: img.height,
                size: img.size(),
            }),
            messages: session.conversation().to_vec(),
        }
    }
}

#[derive(Serialize)]
struct ActionResponse {
    #[serde(flatten)]
    result: ActionResult,
    session: SessionView,
}

async fn health_check() -> &'static str {
    "OK"
}

async fn index() -> Response {
    serve_asset("index.html")
}

async fn static_asset(Path(path): Path<String>) -> Response {
    serve_asset(&path)
}

fn serve_asset(path: &str) -> Response {
    match Assets::get(path) {
        Some(file) => {
            let mime = mime_guess::from_path(path).first_or_octet_stream();
            (
                [(header::CONTENT_TYPE, mime.as_ref().to_string())],
                Body::from(file.data.into_owned()),
            )
                .into_response()
        }
        None => AppError(StatusCode::NOT_FOUND, format!("No such asset: {}", path)).into_response(),
    }
}

async fn get_session(State(state): State<Arc<AppState>>) -> Json<SessionView> {
    let session = state.session.lock().await;
    Json(SessionView::new(&state, &session))
}

async fn get_image(State(state): State<Arc<AppState>>) -> Response {
    let session = state.session.lock().await;
    match session.current_image() {
        Some(image) => (
            [(header::CONTENT_TYPE, image.media_type())],
            Body::from(image.bytes.clone()),
        )
            .into_response(),
        None => AppError(StatusCode::NOT_FOUND, "No image uploaded".to_string()).into_response(),
    }
}

/// Reads the `file` field. A request without a file (or with an empty one)
/// clears the current image, mirroring an upload control with nothing
/// selected.
async fn upload_image(State(state): State<Arc<AppState>>, mut multipart: Multipart) -> Response {
    let mut upload = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return AppError(StatusCode::BAD_REQUEST, e.to_string()).into_response(),
        };
        if field.name() != Some("file") {
            continue;
        }
        let name = field.file_name().unwrap_or("upload").to_string();
        let bytes = match field.bytes().await {
            Ok(b) => b,
            Err(e) => return AppError(StatusCode::BAD_REQUEST, e.to_string()).into_response(),
        };
        if !bytes.is_empty() {
            upload = Some((name, bytes.to_vec()));
        }
    }

    let image = match upload {
        Some((name, bytes)) => {
            // Decoding is CPU-bound
            let decoded = tokio::task::spawn_blocking({
                let name = name.clone();
                move || UploadedImage::from_bytes(&name, bytes)
            })
            .await;
            match decoded {
                Ok(Ok(image)) => Some(image),
                Ok(Err(e)) => {
                    warn!("Rejected upload {}: {}", name, e);
                    return AppError(StatusCode::BAD_REQUEST, e.to_string()).into_response();
                }
                Err(e) => {
                    return AppError(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
                        .into_response()
                }
            }
        }
        None => None,
    };

    apply(&state, Action::Upload(image)).await
}

async fn remove_image(State(state): State<Arc<AppState>>) -> Response {
    apply(&state, Action::Upload(None)).await
}

#[derive(Deserialize)]
struct SubmitRequest {
    prompt: String,
}

async fn submit(State(state): State<Arc<AppState>>, Json(request): Json<SubmitRequest>) -> Response {
    apply(&state, Action::Submit(request.prompt)).await
}

async fn clear(State(state): State<Arc<AppState>>) -> Response {
    apply(&state, Action::Clear).await
}

async fn apply(state: &Arc<AppState>, action: Action) -> Response {
    let mut session = state.session.lock().await;
    match state.controller.dispatch(&mut session, action).await {
        Ok(result) => Json(ActionResponse {
            result,
            session: SessionView::new(state, &session),
        })
        .into_response(),
        Err(e) => AppError(StatusCode::BAD_GATEWAY, e.to_string()).into_response(),
    }
}
