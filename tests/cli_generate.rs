use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Output, Stdio};
use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use seqdiagram_architect::test_support::{apply_provider_test_env, remove_dir_if_exists, temp_path};
use serde_json::{Value, json};

const UNREACHABLE_PROVIDER: &str = "http://127.0.0.1:9/v1";

#[derive(Debug, Clone, PartialEq)]
struct RecordedCall {
    authorization: Option<String>,
    body: Value,
}

#[derive(Clone, Default)]
struct StubProvider {
    calls: Arc<Mutex<Vec<RecordedCall>>>,
    fail_with: Option<StatusCode>,
}

impl StubProvider {
    fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().expect("calls lock").clone()
    }
}

async fn handle_completion(
    State(stub): State<StubProvider>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let prompt = body["messages"][0]["content"]
        .as_str()
        .unwrap_or_default()
        .to_owned();
    stub.calls.lock().expect("calls lock").push(RecordedCall {
        authorization: headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned),
        body,
    });

    if let Some(status) = stub.fail_with {
        return (status, "quota exhausted").into_response();
    }

    let content = if prompt.contains("reasoning outline") {
        "R"
    } else {
        "  D  \n"
    };
    Json(json!({
        "choices": [{"message": {"role": "assistant", "content": content}}]
    }))
    .into_response()
}

async fn start_stub(stub: StubProvider) -> Option<String> {
    let listener = match tokio::net::TcpListener::bind("127.0.0.1:0").await {
        Ok(listener) => listener,
        Err(error) if error.kind() == std::io::ErrorKind::PermissionDenied => return None,
        Err(error) => panic!("ephemeral port should be available for bind: {error}"),
    };
    let addr = listener
        .local_addr()
        .expect("stub listener should have local address");
    let app = Router::new()
        .route("/v1/chat/completions", post(handle_completion))
        .with_state(stub);
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Some(format!("http://{addr}/v1"))
}

fn run_cli(args: Vec<String>, stdin_text: Option<String>, base_url: &str) -> Output {
    let log_dir = temp_path("cli-logs");
    fs::create_dir_all(&log_dir).expect("log dir should be creatable");

    let mut command = Command::new(bin_path());
    command
        .args(&args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    apply_provider_test_env(&mut command, base_url, &log_dir);

    let mut child = command.spawn().expect("CLI command should start");
    {
        let mut stdin = child.stdin.take().expect("stdin should be piped");
        if let Some(text) = stdin_text {
            stdin
                .write_all(text.as_bytes())
                .expect("stdin should accept input");
        }
    }
    let output = child.wait_with_output().expect("CLI command should finish");

    remove_dir_if_exists(&log_dir);
    output
}

async fn run_cli_async(args: &[&str], stdin_text: Option<&str>, base_url: &str) -> Output {
    let args = args.iter().map(|arg| (*arg).to_owned()).collect::<Vec<_>>();
    let stdin_text = stdin_text.map(str::to_owned);
    let base_url = base_url.to_owned();
    tokio::task::spawn_blocking(move || run_cli(args, stdin_text, &base_url))
        .await
        .expect("CLI task should not panic")
}

fn stdout_json(output: &Output) -> Value {
    assert!(
        output.status.success(),
        "CLI should succeed, stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("stdout should be JSON")
}

#[tokio::test(flavor = "multi_thread")]
async fn fallback_scenario_prints_fixed_stub() {
    let output = run_cli_async(
        &[
            "generate",
            "Create a user login flow with email + password + OTP verification",
            "--backend",
            "fallback",
            "--show-reasoning",
            "--json",
        ],
        None,
        UNREACHABLE_PROVIDER,
    )
    .await;

    let body = stdout_json(&output);
    assert_eq!(
        body["diagram_markup"],
        "Caller->System: TODO\nSystem->Caller: Not implemented"
    );
    assert_eq!(body["reasoning"], "(Heuristic fallback selected; no LLM used.)");
    assert_eq!(
        body["link"],
        "https://sequencediagram.org/index.html?initialData=Caller-%3ESystem%3A+TODO%0ASystem-%3ECaller%3A+Not+implemented"
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn blank_description_aborts_without_provider_call() {
    let stub = StubProvider::default();
    let Some(base_url) = start_stub(stub.clone()).await else {
        eprintln!("skipping: local TCP bind is not permitted in this environment");
        return;
    };

    for backend in ["llm", "fallback"] {
        let output = run_cli_async(
            &["generate", "   ", "--backend", backend, "--api-key-stdin"],
            Some("sk-integration\n"),
            &base_url,
        )
        .await;

        assert!(!output.status.success());
        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(
            stderr.contains("Please enter a system description."),
            "unexpected stderr: {stderr}"
        );
    }
    assert!(stub.calls().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn missing_key_aborts_without_provider_call() {
    let stub = StubProvider::default();
    let Some(base_url) = start_stub(stub.clone()).await else {
        eprintln!("skipping: local TCP bind is not permitted in this environment");
        return;
    };

    let output = run_cli_async(
        &["generate", "checkout flow", "--backend", "llm", "--api-key-stdin"],
        Some("\n"),
        &base_url,
    )
    .await;

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("OpenAI API key"), "unexpected stderr: {stderr}");
    assert!(stub.calls().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn reasoning_and_diagram_requests_run_in_order() {
    let stub = StubProvider::default();
    let Some(base_url) = start_stub(stub.clone()).await else {
        eprintln!("skipping: local TCP bind is not permitted in this environment");
        return;
    };
    let out_dir = temp_path("cli-output");
    fs::create_dir_all(&out_dir).expect("output dir should be creatable");
    let out_file: PathBuf = out_dir.join("sequence_diagram.txt");
    let out_file_arg = out_file.to_string_lossy().into_owned();

    let output = run_cli_async(
        &[
            "generate",
            "checkout flow",
            "--backend",
            "llm",
            "--api-key-stdin",
            "--show-reasoning",
            "--json",
            "--output",
            &out_file_arg,
        ],
        Some("sk-integration\n"),
        &base_url,
    )
    .await;

    let body = stdout_json(&output);
    assert_eq!(body["reasoning"], "R");
    assert_eq!(body["diagram_markup"], "D");
    assert_eq!(
        fs::read_to_string(&out_file).expect("output file should exist"),
        "D"
    );

    let calls = stub.calls();
    assert_eq!(calls.len(), 2);
    let first_prompt = calls[0].body["messages"][0]["content"]
        .as_str()
        .expect("prompt string");
    let second_prompt = calls[1].body["messages"][0]["content"]
        .as_str()
        .expect("prompt string");
    assert!(first_prompt.contains("reasoning outline"));
    assert!(second_prompt.contains("ONLY the final sequence diagram code"));
    for call in &calls {
        assert_eq!(call.authorization.as_deref(), Some("Bearer sk-integration"));
        assert_eq!(call.body["model"], "test-model");
        assert_eq!(call.body["messages"][0]["role"], "user");
        let temperature = call.body["temperature"].as_f64().expect("temperature");
        assert!((temperature - 0.3).abs() < 1e-6);
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(!stderr.contains("sk-integration"));
    remove_dir_if_exists(&out_dir);
}

#[tokio::test(flavor = "multi_thread")]
async fn provider_failure_exits_without_partial_output() {
    let stub = StubProvider {
        fail_with: Some(StatusCode::TOO_MANY_REQUESTS),
        ..StubProvider::default()
    };
    let Some(base_url) = start_stub(stub.clone()).await else {
        eprintln!("skipping: local TCP bind is not permitted in this environment");
        return;
    };

    let output = run_cli_async(
        &[
            "generate",
            "checkout flow",
            "--api-key-stdin",
            "--show-reasoning",
        ],
        Some("sk-integration\n"),
        &base_url,
    )
    .await;

    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("429"), "unexpected stderr: {stderr}");
    assert_eq!(stub.calls().len(), 1, "no retry after a failed call");
}

fn bin_path() -> &'static str {
    env!("CARGO_BIN_EXE_seqdiagram_architect")
}
