use anyhow::{Context, Result};
use axum::extract::{Query, State};
use axum::http::{StatusCode, header};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::Settings;
use crate::generate::{GenerateError, Severity, generate};
use crate::input::{BackendChoice, GenerationInput};
use crate::model::{OpenAiProvider, TextProvider};
use crate::present::{DOWNLOAD_FILE_NAME, DOWNLOAD_MIME, Presentation};

pub mod page;

use self::page::{FormEcho, Notice, render_page};

pub const DEFAULT_BIND: &str = "127.0.0.1:8501";

#[derive(Clone)]
struct AppState<P> {
    model: String,
    provider: P,
}

#[derive(Debug, Deserialize)]
struct GenerateForm {
    #[serde(default)]
    backend: BackendChoice,
    #[serde(default)]
    api_key: String,
    #[serde(default)]
    description: String,
    show_reasoning: Option<String>,
}

impl GenerateForm {
    fn into_parts(self) -> (GenerationInput, FormEcho) {
        let show_reasoning = self.show_reasoning.is_some();
        let echo = FormEcho {
            backend: self.backend,
            description: self.description.clone(),
            show_reasoning,
        };
        let input =
            GenerationInput::collect(self.backend, &self.api_key, self.description, show_reasoning);
        (input, echo)
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct GenerateJsonRequest {
    description: String,
    #[serde(default)]
    backend: BackendChoice,
    #[serde(default)]
    api_key: Option<String>,
    #[serde(default)]
    show_reasoning: bool,
}

#[derive(Debug, Serialize)]
struct GenerateJsonResponse {
    reasoning: Option<String>,
    diagram_markup: String,
    link: String,
}

#[derive(Debug, Deserialize)]
struct DownloadQuery {
    diagram_markup: String,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    severity: Severity,
}

#[derive(Debug, Serialize)]
struct HealthBody {
    status: &'static str,
}

pub async fn run_http_server(settings: &Settings, bind: &str) -> Result<()> {
    let app = router(settings.model.clone(), OpenAiProvider::new(settings));

    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("failed to bind HTTP server to `{bind}`"))?;
    let local_addr = listener.local_addr().ok();

    info!(
        model = %settings.model,
        requested_bind = %bind,
        bound_addr = local_addr.map(|addr| addr.to_string()),
        "starting HTTP server"
    );

    axum::serve(listener, app)
        .await
        .context("HTTP server exited with an error")
}

pub fn router<P>(model: String, provider: P) -> Router
where
    P: TextProvider + Clone + Send + Sync + 'static,
{
    Router::new()
        .route("/", get(handle_index))
        .route("/health", get(handle_health))
        .route("/generate", post(handle_generate_form::<P>))
        .route("/download", get(handle_download))
        .route("/api/generate", post(handle_generate_json::<P>))
        .with_state(AppState { model, provider })
}

async fn handle_index() -> Html<String> {
    Html(render_page(&FormEcho::default(), None, None))
}

async fn handle_health() -> Json<HealthBody> {
    Json(HealthBody { status: "ok" })
}

async fn handle_generate_form<P>(
    State(state): State<AppState<P>>,
    Form(form): Form<GenerateForm>,
) -> Response
where
    P: TextProvider + Clone + Send + Sync + 'static,
{
    let (input, echo) = form.into_parts();

    match generate(&input, &state.provider, &state.model).await {
        Ok(result) => {
            let presentation = Presentation::new(&result, input.show_reasoning);
            Html(render_page(&echo, None, Some(&presentation))).into_response()
        }
        Err(error) => {
            let status = status_code_for_error(&error);
            warn!(status = status.as_u16(), error = %error, "form generation failed");
            let notice = Notice {
                severity: error.severity(),
                message: notice_message(&error),
            };
            (status, Html(render_page(&echo, Some(&notice), None))).into_response()
        }
    }
}

async fn handle_generate_json<P>(
    State(state): State<AppState<P>>,
    Json(req): Json<GenerateJsonRequest>,
) -> Response
where
    P: TextProvider + Clone + Send + Sync + 'static,
{
    let input = GenerationInput::collect(
        req.backend,
        req.api_key.as_deref().unwrap_or_default(),
        req.description,
        req.show_reasoning,
    );

    match generate(&input, &state.provider, &state.model).await {
        Ok(result) => {
            let body = GenerateJsonResponse {
                reasoning: Presentation::new(&result, input.show_reasoning)
                    .reasoning
                    .map(str::to_owned),
                diagram_markup: result.diagram_markup().to_owned(),
                link: result.outbound_link(),
            };
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(error) => {
            let status = status_code_for_error(&error);
            warn!(status = status.as_u16(), error = %error, "HTTP generation failed");
            let body = ErrorBody {
                error: error.to_string(),
                severity: error.severity(),
            };
            (status, Json(body)).into_response()
        }
    }
}

async fn handle_download(Query(query): Query<DownloadQuery>) -> Response {
    let headers = [
        (header::CONTENT_TYPE, format!("{DOWNLOAD_MIME}; charset=utf-8")),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{DOWNLOAD_FILE_NAME}\""),
        ),
    ];
    (headers, query.diagram_markup).into_response()
}

fn status_code_for_error(error: &GenerateError) -> StatusCode {
    if error.is_input_error() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::BAD_GATEWAY
    }
}

fn notice_message(error: &GenerateError) -> String {
    if error.is_input_error() {
        error.to_string()
    } else {
        format!("Diagram generation failed: {error}")
    }
}
