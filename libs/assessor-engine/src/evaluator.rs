/// Case Evaluator - Verdicts from Raw Execution Results
///
/// **Core Responsibility:**
/// Compare one execution result against one test case's expected value and
/// fold verdicts into a run summary.
///
/// **Critical Properties:**
/// - Knows nothing about HTTP or the execution service
/// - Knows nothing about language runtimes beyond the harness contract
/// - Pure function: (test case, execution result) → verdict
///
/// **Verdict Rules:**
/// - Transport error → failed, error carries the reason
/// - Only the no-output sentinel printed → failed, error explains why
/// - Otherwise the output is decoded and compared; a runtime error is an
///   ordinary mismatch (its stderr is already in the output)
/// - Wrapped harnesses print the result last, so earlier lines (candidate
///   debug prints) are not part of the compared value
use crate::codec;
use crate::harness::{self, HarnessKind};
use assessor_common::types::{CaseVerdict, ExecutionResult, Language, RunOutcome, RunSummary, TestCase};
use uuid::Uuid;

pub const NO_RECOGNIZED_OUTPUT: &str =
    "no recognized output: the program ran but no entry point was found to produce a result";
pub const CANCELLED: &str = "cancelled";

/// The part of stdout that counts as the program's answer
fn answer_text(stdout: &str, kind: &HarnessKind, exit_code: i32) -> String {
    let trimmed = stdout.trim();
    if matches!(kind, HarnessKind::Wrapped { .. }) && exit_code == 0 {
        if let Some(last) = trimmed.lines().rev().find(|line| !line.trim().is_empty()) {
            return last.trim().to_string();
        }
    }
    trimmed.to_string()
}

fn verdict(case: &TestCase, raw_actual: String, passed: bool, error: Option<String>) -> CaseVerdict {
    CaseVerdict {
        index: case.index,
        raw_input: case.raw_input.clone(),
        raw_expected: case.raw_output.clone(),
        raw_actual,
        passed,
        error,
    }
}

/// Evaluate a single test case execution result
pub fn evaluate_case(case: &TestCase, result: &ExecutionResult, kind: &HarnessKind) -> CaseVerdict {
    if let Some(reason) = &result.transport_error {
        return verdict(case, String::new(), false, Some(reason.clone()));
    }

    let (stdout, saw_sentinel) = harness::split_sentinel(&result.stdout);
    if saw_sentinel && stdout.trim().is_empty() {
        return verdict(case, String::new(), false, Some(NO_RECOGNIZED_OUTPUT.to_string()));
    }

    let actual = codec::decode(&answer_text(&stdout, kind, result.exit_code));
    let passed = codec::compare(&actual, &case.expected_output);
    verdict(case, stdout.trim().to_string(), passed, None)
}

/// Verdict for the case that was in flight when the run was cancelled
pub fn cancelled_case(case: &TestCase) -> CaseVerdict {
    verdict(case, String::new(), false, Some(CANCELLED.to_string()))
}

/// Aggregate verdicts into the run summary.
/// `total_count` is the number of extracted cases, not the number executed.
pub fn summarize(
    run_id: Uuid,
    language: Language,
    outcome: RunOutcome,
    verdicts: Vec<CaseVerdict>,
    total_count: usize,
) -> RunSummary {
    let passed_count = verdicts.iter().filter(|v| v.passed).count();
    RunSummary {
        run_id,
        language,
        outcome,
        verdicts,
        passed_count,
        total_count,
    }
}
