//! HTTP Server for the reshaper API.
//!
//! # API Endpoints
//!
//! | Method | Path                                | Description                              |
//! |--------|-------------------------------------|------------------------------------------|
//! | GET    | `/health`                           | Health check                             |
//! | POST   | `/api/columns`                      | Columns available across three uploads   |
//! | POST   | `/api/reshape`                      | Merge + pivot three uploads → XLSX       |
//! | GET    | `/api/questions`                    | List the question bank                   |
//! | POST   | `/api/questions`                    | Generate a question and store it         |
//! | POST   | `/api/questions/{reference}/check`  | Compare a candidate's output             |
//! | GET    | `/api/logs`                         | SSE stream for real-time logs            |

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path as UrlPath, State},
    http::{header, Method, StatusCode},
    response::{sse::Event, IntoResponse, Json, Response, Sse},
    routing::{get, post},
    Router,
};
use futures::stream::Stream;
use serde_json::{json, Value};
use std::{convert::Infallible, net::SocketAddr, path::PathBuf, sync::Arc, time::Duration};
use tokio::sync::Mutex;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;
use tower_http::cors::CorsLayer;

use super::logs::{log_error, log_warning, LOG_BROADCASTER};
use super::types::{
    error_response, CheckRequest, ColumnsResponse, FileMetadata, GenerateRequest,
    QuestionsResponse, ReshapeResponse,
};
use crate::ai::QuestionClient;
use crate::config::{MAX_UPLOAD_SIZE, OUTPUT_FILE_NAME, OUTPUT_SHEET_NAME};
use crate::error::{AiError, ExportError, PipelineError, ServerError, StoreError};
use crate::export::write_xlsx;
use crate::models::Grade;
use crate::store::QuestionBank;
use crate::transform::pipeline::{list_columns, load_uploads, reshape_uploads, NamedBytes};
use crate::transform::ReshapeOptions;

const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Error half of every handler result
type ApiError = (StatusCode, Json<Value>);

/// Shared state passed to every handler
#[derive(Clone)]
pub struct AppState {
    pub bank: Arc<Mutex<QuestionBank>>,
    pub questions: Option<QuestionClient>,
}

impl AppState {
    pub fn new(bank: QuestionBank, questions: Option<QuestionClient>) -> Self {
        Self {
            bank: Arc::new(Mutex::new(bank)),
            questions,
        }
    }
}

/// Build the router (without binding a port)
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::CONTENT_TYPE, header::CONTENT_DISPOSITION]);

    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/api/columns", post(columns))
        .route("/api/reshape", post(reshape))
        .route("/api/questions", get(list_questions).post(generate_question))
        .route("/api/questions/{reference}/check", post(check_question))
        .route("/api/logs", get(sse_logs))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_SIZE))
        .layer(cors)
        .with_state(state)
}

/// Start the HTTP server
pub async fn start_server(port: u16, bank_path: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let bank = QuestionBank::open(&bank_path)?;
    let questions = match QuestionClient::from_env() {
        Ok(client) => Some(client),
        Err(e) => {
            log_warning(format!("Question generation disabled: {}", e));
            None
        }
    };

    let app = router(AppState::new(bank, questions));

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    println!("🚀 Reshaper server running on http://localhost:{}", port);
    println!("   POST /api/columns   - List columns of three uploads");
    println!("   POST /api/reshape   - Merge + pivot three uploads");
    println!("   GET  /api/questions - Question bank ({})", bank_path.display());
    println!("   GET  /api/logs      - SSE log stream");
    println!("   GET  /health        - Health check");
    println!();

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Health check endpoint
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "reshaper",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "columns": "POST /api/columns",
            "reshape": "POST /api/reshape",
            "questions": "GET|POST /api/questions",
            "logs": "GET /api/logs (SSE)"
        }
    }))
}

/// SSE endpoint for real-time log streaming
async fn sse_logs() -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = LOG_BROADCASTER.subscribe();

    let stream = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(entry) => {
            let json = serde_json::to_string(&entry).ok()?;
            Some(Ok(Event::default().data(json)))
        }
        Err(_) => None,
    });

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

/// Multipart form shared by `/api/columns` and `/api/reshape`
#[derive(Default)]
struct ReshapeForm {
    base: Option<NamedBytes>,
    aux1: Option<NamedBytes>,
    aux2: Option<NamedBytes>,
    fields: Vec<String>,
    identifier: Option<String>,
    dedup_key: Option<String>,
    format: Option<String>,
}

impl ReshapeForm {
    async fn read(mut multipart: Multipart) -> Result<Self, ServerError> {
        let mut form = ReshapeForm::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ServerError::BadRequest(format!("Multipart error: {}", e)))?
        {
            let name = field.name().unwrap_or("").to_string();
            match name.as_str() {
                "base" | "aux1" | "aux2" => {
                    let file_name = field.file_name().unwrap_or(&name).to_string();
                    let bytes = field
                        .bytes()
                        .await
                        .map_err(|e| ServerError::BadRequest(format!("Read error: {}", e)))?;
                    let upload = Some(NamedBytes { name: file_name, bytes: bytes.to_vec() });
                    match name.as_str() {
                        "base" => form.base = upload,
                        "aux1" => form.aux1 = upload,
                        _ => form.aux2 = upload,
                    }
                }
                "fields" | "identifier" | "dedupKey" | "format" => {
                    let text = field
                        .text()
                        .await
                        .map_err(|e| ServerError::BadRequest(format!("Read error: {}", e)))?;
                    match name.as_str() {
                        "fields" => form.fields.extend(
                            text.split(',').map(str::trim).filter(|s| !s.is_empty()).map(String::from),
                        ),
                        "identifier" => form.identifier = non_empty(text),
                        "dedupKey" => form.dedup_key = Some(text.trim().to_string()),
                        _ => form.format = non_empty(text),
                    }
                }
                _ => {}
            }
        }

        Ok(form)
    }

    fn uploads(&mut self) -> Result<[NamedBytes; 3], ServerError> {
        let missing = |slot: &str| ServerError::BadRequest(format!("Missing file field '{}'", slot));
        Ok([
            self.base.take().ok_or_else(|| missing("base"))?,
            self.aux1.take().ok_or_else(|| missing("aux1"))?,
            self.aux2.take().ok_or_else(|| missing("aux2"))?,
        ])
    }

    fn options(&self) -> ReshapeOptions {
        let defaults = ReshapeOptions::default();
        ReshapeOptions {
            identifier: self.identifier.clone().unwrap_or(defaults.identifier),
            // An explicitly empty dedupKey disables deduplication
            dedup_key: match &self.dedup_key {
                Some(key) if key.is_empty() => None,
                Some(key) => Some(key.clone()),
                None => defaults.dedup_key,
            },
        }
    }
}

fn non_empty(text: String) -> Option<String> {
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

/// Column listing endpoint
async fn columns(multipart: Multipart) -> Result<Json<ColumnsResponse>, ApiError> {
    let mut form = ReshapeForm::read(multipart).await.map_err(api_error)?;
    let uploads = form.uploads().map_err(api_error)?;

    let sets = run_blocking(move || load_uploads(&uploads)).await?;

    Ok(Json(ColumnsResponse {
        columns: list_columns(&sets),
        files: sets.iter().map(FileMetadata::from).collect(),
    }))
}

/// Merge + pivot endpoint
async fn reshape(multipart: Multipart) -> Result<Response, ApiError> {
    let mut form = ReshapeForm::read(multipart).await.map_err(api_error)?;
    let uploads = form.uploads().map_err(api_error)?;
    let options = form.options();
    let fields = std::mem::take(&mut form.fields);
    let as_json = form.format.as_deref() == Some("json");

    println!("\n{}", "=".repeat(70));
    println!(
        "📄 NEW RESHAPE: {} / {} / {}",
        uploads[0].name, uploads[1].name, uploads[2].name
    );
    println!("{}\n", "=".repeat(70));

    let output = run_blocking(move || reshape_uploads(&uploads, &fields, &options)).await?;

    if as_json {
        return Ok(Json(ReshapeResponse::from(output)).into_response());
    }

    let bytes = write_xlsx(&output.table, OUTPUT_SHEET_NAME)
        .map_err(|e| api_error(ServerError::Pipeline(PipelineError::Export(e))))?;

    let disposition = format!("attachment; filename=\"{}\"", OUTPUT_FILE_NAME);
    Ok((
        [
            (header::CONTENT_TYPE, XLSX_MIME.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response())
}

/// Question bank listing
async fn list_questions(State(state): State<AppState>) -> Json<QuestionsResponse> {
    let bank = state.bank.lock().await;
    Json(QuestionsResponse::from(bank.list()))
}

/// Generate, store, and return a new question
async fn generate_question(
    State(state): State<AppState>,
    Json(request): Json<GenerateRequest>,
) -> Result<Json<Value>, ApiError> {
    if request.topic.trim().is_empty() {
        return Err(api_error(ServerError::BadRequest("Topic is empty".to_string())));
    }
    let client = state.questions.as_ref().ok_or_else(|| {
        api_error(PipelineError::Ai(AiError::MissingApiKey("GEMINI_API_KEY not set".to_string())).into())
    })?;

    let question = client
        .generate_question(&request.topic)
        .await
        .map_err(|e| api_error(PipelineError::Ai(e).into()))?;

    let mut bank = state.bank.lock().await;
    let stored = bank
        .add(question)
        .map_err(|e| api_error(PipelineError::Store(e).into()))?;

    Ok(Json(json!({ "status": "ready", "question": stored, "count": bank.len() })))
}

/// Grade a candidate's output
async fn check_question(
    State(state): State<AppState>,
    UrlPath(reference): UrlPath<String>,
    Json(request): Json<CheckRequest>,
) -> Result<Json<Grade>, ApiError> {
    let bank = state.bank.lock().await;
    let grade = bank
        .check(&reference, &request.output)
        .map_err(|e| api_error(PipelineError::Store(e).into()))?;
    Ok(Json(grade))
}

/// Run a synchronous pipeline step off the async workers
async fn run_blocking<T, F>(job: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, PipelineError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(job)
        .await
        .map_err(|e| api_error(ServerError::Internal(e.to_string())))?
        .map_err(|e| api_error(e.into()))
}

fn status_for(error: &ServerError) -> StatusCode {
    match error {
        ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
        ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        ServerError::Pipeline(e) => match e {
            PipelineError::Input(_) => StatusCode::BAD_REQUEST,
            PipelineError::Reshape(_) => StatusCode::UNPROCESSABLE_ENTITY,
            PipelineError::Export(ExportError::TooLarge(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            PipelineError::Export(_) => StatusCode::INTERNAL_SERVER_ERROR,
            PipelineError::Ai(AiError::MissingApiKey(_)) => StatusCode::SERVICE_UNAVAILABLE,
            PipelineError::Ai(AiError::Timeout) => StatusCode::GATEWAY_TIMEOUT,
            PipelineError::Ai(_) => StatusCode::BAD_GATEWAY,
            PipelineError::Store(StoreError::NotFound(_)) => StatusCode::NOT_FOUND,
            PipelineError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        },
    }
}

fn api_error(error: ServerError) -> ApiError {
    let status = status_for(&error);
    log_error(error.to_string());
    (status, Json(error_response(&error.to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReshapeError;

    #[test]
    fn test_status_mapping() {
        let schema: ServerError = PipelineError::Reshape(ReshapeError::Schema("x".into())).into();
        assert_eq!(status_for(&schema), StatusCode::UNPROCESSABLE_ENTITY);

        let missing: ServerError = PipelineError::Store(StoreError::NotFound("9".into())).into();
        assert_eq!(status_for(&missing), StatusCode::NOT_FOUND);

        let ai: ServerError = PipelineError::Ai(AiError::Api("quota".into())).into();
        assert_eq!(status_for(&ai), StatusCode::BAD_GATEWAY);

        assert_eq!(status_for(&ServerError::BadRequest("x".into())), StatusCode::BAD_REQUEST);

        let wide: ServerError = PipelineError::Export(ExportError::TooLarge("x".into())).into();
        assert_eq!(status_for(&wide), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn test_form_options() {
        let mut form = ReshapeForm::default();
        assert_eq!(form.options(), ReshapeOptions::default());

        form.identifier = Some("Staff No".into());
        form.dedup_key = Some(String::new());
        let options = form.options();
        assert_eq!(options.identifier, "Staff No");
        assert_eq!(options.dedup_key, None);
    }

    #[test]
    fn test_form_requires_three_files() {
        let mut form = ReshapeForm {
            base: Some(NamedBytes { name: "base.csv".into(), bytes: vec![] }),
            ..ReshapeForm::default()
        };
        let err = form.uploads().unwrap_err();
        assert!(err.to_string().contains("aux1"));
    }
}
