/// Run Orchestrator - High-Level Coordination
///
/// **Responsibility:**
/// Turn (challenge, candidate source, language) into a RunSummary.
///
/// **Architecture:**
/// 1. Extract test cases from the statement (extractor.rs)
/// 2. Prepare the candidate source once (harness.rs)
/// 3. Execute each case in statement order (engine.rs)
/// 4. Judge each result and aggregate (evaluator.rs)
///
/// This module is the glue layer - it knows nothing about:
/// - How code executes (engine's job)
/// - How outputs are compared (evaluator's job)
///
/// Cancellation is cooperative: checked before every case and raced against
/// the in-flight execution.
use crate::cancel::CancelSignal;
use crate::codec;
use crate::engine::ExecutionBackend;
use crate::evaluator;
use crate::extractor;
use crate::harness::{self, HarnessKind};
use assessor_common::types::{Challenge, ExecutionRequest, Language, RunOutcome, RunSummary, TestCase};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Clone)]
pub struct Orchestrator {
    backend: Arc<dyn ExecutionBackend>,
    timeout: Duration,
}

impl Orchestrator {
    pub fn new(backend: Arc<dyn ExecutionBackend>, timeout: Duration) -> Self {
        Self { backend, timeout }
    }

    #[tracing::instrument(
        skip(self, challenge, candidate_source, cancel),
        fields(
            run_id = tracing::field::Empty,
            language = %language,
            challenge_id = challenge.id.as_deref().unwrap_or("-")
        )
    )]
    pub async fn run(
        &self,
        challenge: &Challenge,
        candidate_source: &str,
        language: Language,
        cancel: &CancelSignal,
    ) -> RunSummary {
        let run_id = Uuid::new_v4();
        tracing::Span::current().record("run_id", tracing::field::display(run_id));

        let cases = extractor::extract(&challenge.statement);
        if cases.is_empty() {
            info!("Statement has no examples; nothing to evaluate");
            return evaluator::summarize(run_id, language, RunOutcome::NoTestCases, Vec::new(), 0);
        }

        let harness = harness::wrap(language, candidate_source);
        info!(cases = cases.len(), harness = ?harness.kind, "Starting run");

        let mut verdicts = Vec::with_capacity(cases.len());
        let mut outcome = RunOutcome::Evaluated;

        for case in &cases {
            if cancel.is_cancelled() {
                info!(completed = verdicts.len(), total = cases.len(), "Run cancelled; skipping remaining cases");
                outcome = RunOutcome::Cancelled;
                break;
            }

            let request = ExecutionRequest {
                language,
                prepared_source: harness.source.clone(),
                stdin: case_stdin(case, &harness.kind),
            };

            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                result = self.backend.execute(&request, self.timeout) => Some(result),
            };

            let Some(result) = result else {
                info!(case = case.index, "Run cancelled during execution");
                verdicts.push(evaluator::cancelled_case(case));
                outcome = RunOutcome::Cancelled;
                break;
            };

            debug!(
                case = case.index,
                raw_response = result.raw_response.as_deref().unwrap_or("-"),
                "Execution service response"
            );
            let verdict = evaluator::evaluate_case(case, &result, &harness.kind);
            if let Some(error) = &verdict.error {
                warn!(case = case.index, error = %error, "Case could not be judged");
            } else {
                debug!(
                    case = case.index,
                    passed = verdict.passed,
                    exit_code = result.exit_code,
                    expected = %verdict.raw_expected,
                    actual = %verdict.raw_actual,
                    "Case evaluated"
                );
            }
            verdicts.push(verdict);
        }

        let summary = evaluator::summarize(run_id, language, outcome, verdicts, cases.len());
        info!(
            passed = summary.passed_count,
            total = summary.total_count,
            outcome = ?summary.outcome,
            "Run finished"
        );
        summary
    }
}

/// Standard input for one case.
///
/// Wrapped harnesses read one JSON document: the argument array, or the
/// normalized input when no arguments were recovered. Programs doing their
/// own I/O get one argument per line, strings unquoted.
pub fn case_stdin(case: &TestCase, kind: &HarnessKind) -> String {
    match kind {
        HarnessKind::Wrapped { .. } if case.arguments.is_empty() => codec::encode(&case.input),
        HarnessKind::Wrapped { .. } => codec::encode_value(&Value::Array(case.arguments.clone())),
        HarnessKind::Passthrough | HarnessKind::NoEntryPoint => {
            if case.arguments.is_empty() {
                return format!("{}\n", codec::encode(&case.input));
            }
            let mut stdin = String::new();
            for argument in &case.arguments {
                match argument {
                    Value::String(text) => stdin.push_str(text),
                    other => stdin.push_str(&codec::encode_value(other)),
                }
                stdin.push('\n');
            }
            stdin
        }
    }
}
