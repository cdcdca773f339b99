use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Strongly-typed language enum
/// Every language here has a harness template and an execution runtime mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python,
    JavaScript,
    Java,
}

impl Language {
    /// Returns all language variants
    pub fn all_variants() -> &'static [Language] {
        &[Language::Python, Language::JavaScript, Language::Java]
    }

    /// Parse a language from string (case-insensitive, common aliases accepted)
    pub fn from_str(s: &str) -> Option<Language> {
        match s.trim().to_lowercase().as_str() {
            "python" | "python3" | "py" => Some(Language::Python),
            "javascript" | "js" | "node" => Some(Language::JavaScript),
            "java" => Some(Language::Java),
            _ => None,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Language::Python => write!(f, "python"),
            Language::JavaScript => write!(f, "javascript"),
            Language::Java => write!(f, "java"),
        }
    }
}

/// Decoded Value
/// Either a structured value in the canonical grammar, or the trimmed text
/// that failed to decode. There is no error state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum DecodedValue {
    Structured(serde_json::Value),
    Unparsed(String),
}

impl DecodedValue {
    pub fn is_structured(&self) -> bool {
        matches!(self, DecodedValue::Structured(_))
    }

    pub fn as_structured(&self) -> Option<&serde_json::Value> {
        match self {
            DecodedValue::Structured(value) => Some(value),
            DecodedValue::Unparsed(_) => None,
        }
    }
}

/// Test Case (Immutable)
/// Built from one "Example N:" block; `index` is the number stated in the text.
/// Ordering matters - cases are evaluated in statement order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCase {
    pub index: u32,
    pub raw_input: String,
    pub raw_output: String,
    pub input: DecodedValue,
    pub expected_output: DecodedValue,
    /// Positional argument values recovered from the input line.
    /// Empty when the input could not be decoded.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub arguments: Vec<serde_json::Value>,
}

/// Challenge Definition
/// Supplied by the challenge store; read-only to the engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Challenge {
    #[serde(default)]
    pub id: Option<String>,
    pub statement: String,
    #[serde(default)]
    pub challenge_type: ChallengeType,
    #[serde(default)]
    pub difficulty: Difficulty,
}

impl Challenge {
    pub fn from_statement(statement: impl Into<String>) -> Self {
        Self {
            id: None,
            statement: statement.into(),
            challenge_type: ChallengeType::default(),
            difficulty: Difficulty::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChallengeType {
    #[default]
    Coding,
    SystemDesign,
    CaseStudy,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

/// Execution Request
/// Built once per test case and consumed by a single execution call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionRequest {
    pub language: Language,
    pub prepared_source: String,
    pub stdin: String,
}

/// Execution Result
/// Either the normalized program output, or a transport error when the
/// remote service could not be reached, timed out, or answered garbage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transport_error: Option<String>,
    /// Response body exactly as the execution service sent it
    #[serde(skip)]
    pub raw_response: Option<String>,
}

impl ExecutionResult {
    pub fn completed(stdout: impl Into<String>, stderr: impl Into<String>, exit_code: i32) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: stderr.into(),
            exit_code,
            transport_error: None,
            raw_response: None,
        }
    }

    pub fn transport(reason: impl Into<String>) -> Self {
        Self {
            stdout: String::new(),
            stderr: String::new(),
            exit_code: -1,
            transport_error: Some(reason.into()),
            raw_response: None,
        }
    }

    pub fn with_raw_response(mut self, body: impl Into<String>) -> Self {
        self.raw_response = Some(body.into());
        self
    }

    pub fn is_transport_error(&self) -> bool {
        self.transport_error.is_some()
    }
}

/// Per-Case Verdict
/// `passed=false, error=None` is an ordinary mismatch;
/// `error=Some(..)` marks an infrastructure or harness failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseVerdict {
    pub index: u32,
    pub raw_input: String,
    pub raw_expected: String,
    pub raw_actual: String,
    pub passed: bool,
    pub error: Option<String>,
}

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    /// Every extracted case was executed
    Evaluated,
    /// The statement has no automated checks
    NoTestCases,
    /// The caller went away; remaining cases were skipped
    Cancelled,
}

/// Run Summary
/// Return value of one orchestration call. Verdicts follow statement order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub language: Language,
    pub outcome: RunOutcome,
    pub verdicts: Vec<CaseVerdict>,
    pub passed_count: usize,
    pub total_count: usize,
}

impl RunSummary {
    pub fn all_passed(&self) -> bool {
        self.outcome == RunOutcome::Evaluated && self.total_count > 0 && self.passed_count == self.total_count
    }
}

/// Attempt Record
/// Owned by the attempt store. `performance_score` comes from the feedback
/// service, not from a RunSummary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptRecord {
    pub user_id: String,
    pub challenge_id: String,
    pub completed_at: DateTime<Utc>,
    #[serde(default)]
    pub performance_score: Option<f64>,
    #[serde(default)]
    pub time_taken_seconds: Option<u32>,
    pub challenge_type: ChallengeType,
    pub difficulty_level: Difficulty,
}
