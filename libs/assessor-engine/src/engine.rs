/// Execution Client - Remote Code Execution
///
/// **Core Responsibility:**
/// Submit prepared source plus stdin to the remote execution service and
/// normalize what comes back.
///
/// **Critical Architectural Boundary:**
/// - Client knows HOW to execute (HTTP, runtime names, versions)
/// - Client does NOT know test cases or grading
/// - Client never fails: infrastructure faults become transport errors
///
/// **Normalization Rules:**
/// - Missing stdout/stderr → empty string
/// - Missing exit code (killed by signal) → -1
/// - Failed compile stage → its output is reported, run stage ignored
/// - Empty stdout with non-zero exit → stderr is reported as stdout
use crate::config::LanguageConfigManager;
use anyhow::{Context, Result};
use assessor_common::config::EngineConfig;
use assessor_common::types::{ExecutionRequest, ExecutionResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, warn};

/// Upper bound on error text carried into a transport reason
const MAX_REASON_CHARS: usize = 500;

/// Anything that can run a prepared program once
#[async_trait]
pub trait ExecutionBackend: Send + Sync {
    async fn execute(&self, request: &ExecutionRequest, timeout: Duration) -> ExecutionResult;
}

/// Why a call produced no program output
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("execution service unreachable: {0}")]
    Connect(String),
    #[error("execution timed out after {0}ms")]
    Timeout(u128),
    #[error("execution service returned HTTP {status}: {message}")]
    Status { status: u16, message: String },
    #[error("malformed response from execution service: {0}")]
    Malformed(String),
    #[error("execution request failed: {0}")]
    Request(String),
}

impl TransportError {
    fn from_reqwest(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            TransportError::Timeout(timeout.as_millis())
        } else if err.is_connect() {
            TransportError::Connect(err.to_string())
        } else if err.is_decode() {
            TransportError::Malformed(err.to_string())
        } else {
            TransportError::Request(err.to_string())
        }
    }
}

#[derive(Debug, Serialize)]
struct SubmittedFile<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct SubmitRequest<'a> {
    language: &'a str,
    version: &'a str,
    files: Vec<SubmittedFile<'a>>,
    stdin: &'a str,
}

#[derive(Debug, Default, Deserialize)]
struct StageOutput {
    #[serde(default)]
    stdout: Option<String>,
    #[serde(default)]
    stderr: Option<String>,
    #[serde(default)]
    output: Option<String>,
    #[serde(default)]
    code: Option<i64>,
}

impl StageOutput {
    fn exit_code(&self) -> i32 {
        self.code
            .and_then(|code| i32::try_from(code).ok())
            .unwrap_or(-1)
    }

    fn failed(&self) -> bool {
        self.code.is_some_and(|code| code != 0)
    }
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    #[serde(default)]
    run: Option<StageOutput>,
    #[serde(default)]
    compile: Option<StageOutput>,
    #[serde(default)]
    message: Option<String>,
}

/// HTTP client for a Piston-compatible execution service
pub struct PistonClient {
    http: reqwest::Client,
    base_url: String,
    languages: LanguageConfigManager,
}

impl PistonClient {
    pub fn new(base_url: impl Into<String>, languages: LanguageConfigManager) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("assessor-engine/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            languages,
        })
    }

    pub fn from_config(config: &EngineConfig, languages: LanguageConfigManager) -> Result<Self> {
        Self::new(config.execution_api_url.clone(), languages)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn submit(&self, request: &ExecutionRequest, timeout: Duration) -> Result<ExecutionResult, TransportError> {
        let runtime = self.languages.get_config(request.language);
        let body = SubmitRequest {
            language: &runtime.runtime,
            version: &runtime.version,
            files: vec![SubmittedFile {
                name: runtime.file_name.as_deref(),
                content: &request.prepared_source,
            }],
            stdin: &request.stdin,
        };

        let response = self
            .http
            .post(format!("{}/execute", self.base_url))
            .timeout(timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| TransportError::from_reqwest(e, timeout))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| TransportError::from_reqwest(e, timeout))?;
        debug!(status = status.as_u16(), bytes = text.len(), "Execution service answered");

        let parsed = serde_json::from_str::<SubmitResponse>(&text);
        match parsed {
            Ok(SubmitResponse { run: Some(run), compile, .. }) => Ok(normalize(run, compile).with_raw_response(text)),
            Ok(SubmitResponse { message, .. }) if !status.is_success() => Err(TransportError::Status {
                status: status.as_u16(),
                message: truncate(message.as_deref().unwrap_or(&text)),
            }),
            Ok(_) => Err(TransportError::Malformed("response has no run stage".to_string())),
            Err(_) if !status.is_success() => Err(TransportError::Status {
                status: status.as_u16(),
                message: truncate(&text),
            }),
            Err(e) => Err(TransportError::Malformed(e.to_string())),
        }
    }
}

#[async_trait]
impl ExecutionBackend for PistonClient {
    #[tracing::instrument(skip(self, request), fields(language = %request.language, timeout_ms = timeout.as_millis() as u64))]
    async fn execute(&self, request: &ExecutionRequest, timeout: Duration) -> ExecutionResult {
        let started = Instant::now();

        // Hard bound on the whole exchange, body included
        let outcome = match tokio::time::timeout(timeout, self.submit(request, timeout)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(TransportError::Timeout(timeout.as_millis())),
        };

        let elapsed_ms = started.elapsed().as_millis() as u64;
        match outcome {
            Ok(result) => {
                debug!(exit_code = result.exit_code, elapsed_ms, "Execution completed");
                result
            }
            Err(err) => {
                warn!(error = %err, elapsed_ms, "Execution transport failure");
                ExecutionResult::transport(err.to_string())
            }
        }
    }
}

fn normalize(run: StageOutput, compile: Option<StageOutput>) -> ExecutionResult {
    let stage = match compile {
        Some(compile) if compile.failed() => compile,
        _ => run,
    };

    let exit_code = stage.exit_code();
    let stdout = stage.stdout.unwrap_or_default();
    let stderr = match stage.stderr {
        Some(stderr) => stderr,
        None if exit_code != 0 => stage.output.unwrap_or_default(),
        None => String::new(),
    };

    if stdout.trim().is_empty() && exit_code != 0 {
        return ExecutionResult::completed(stderr.clone(), stderr, exit_code);
    }
    ExecutionResult::completed(stdout, stderr, exit_code)
}

fn truncate(text: &str) -> String {
    let trimmed = text.trim();
    match trimmed.char_indices().nth(MAX_REASON_CHARS) {
        Some((cut, _)) => format!("{}…", &trimmed[..cut]),
        None => trimmed.to_string(),
    }
}
