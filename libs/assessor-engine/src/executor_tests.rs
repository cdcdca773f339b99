/// Orchestration tests with scripted execution backends
///
/// These tests verify that a run:
/// 1. Executes every extracted case in statement order
/// 2. Keeps going after a transport failure on one case
/// 3. Reports statements without examples as NoTestCases
/// 4. Stops promptly on cancellation, before or during a case
/// 5. Flags the no-entry-point sentinel instead of grading it

#[cfg(test)]
mod orchestrator_tests {
    use crate::cancel::{cancel_pair, CancelHandle, CancelSignal};
    use crate::engine::ExecutionBackend;
    use crate::evaluator::{CANCELLED, NO_RECOGNIZED_OUTPUT};
    use crate::executor::Orchestrator;
    use crate::harness::NO_OUTPUT_SENTINEL;
    use assessor_common::types::{Challenge, ExecutionRequest, ExecutionResult, Language, RunOutcome};
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    const TWO_SUM: &str = r#"Given an array of integers nums and an integer target, return indices of the two numbers such that they add up to target.

Example 1:
Input: nums = [2,7,11,15], target = 9
Output: [0,1]

Example 2:
Input: nums = [3,2,4], target = 6
Output: [1,2]

Example 3:
Input: nums = [3,3], target = 6
Output: [0,1]
"#;

    const PY_TWO_SUM: &str = r#"class Solution:
    def twoSum(self, nums, target):
        seen = {}
        for i, n in enumerate(nums):
            if target - n in seen:
                return [seen[target - n], i]
            seen[n] = i
"#;

    /// Replays canned results in order and records every request
    struct ScriptedBackend {
        results: Mutex<VecDeque<ExecutionResult>>,
        requests: Mutex<Vec<(ExecutionRequest, Duration)>>,
        cancel_on_call: Mutex<Option<CancelHandle>>,
    }

    impl ScriptedBackend {
        fn new(results: Vec<ExecutionResult>) -> Arc<Self> {
            Arc::new(Self {
                results: Mutex::new(results.into()),
                requests: Mutex::new(Vec::new()),
                cancel_on_call: Mutex::new(None),
            })
        }

        fn cancelling(results: Vec<ExecutionResult>, handle: CancelHandle) -> Arc<Self> {
            let backend = Self::new(results);
            *backend.cancel_on_call.lock().unwrap() = Some(handle);
            backend
        }

        fn stdins(&self) -> Vec<String> {
            self.requests.lock().unwrap().iter().map(|(r, _)| r.stdin.clone()).collect()
        }

        fn calls(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl ExecutionBackend for ScriptedBackend {
        async fn execute(&self, request: &ExecutionRequest, timeout: Duration) -> ExecutionResult {
            self.requests.lock().unwrap().push((request.clone(), timeout));
            if let Some(handle) = self.cancel_on_call.lock().unwrap().take() {
                handle.cancel();
            }
            self.results
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| ExecutionResult::transport("script exhausted"))
        }
    }

    /// Never answers
    struct HangingBackend;

    #[async_trait]
    impl ExecutionBackend for HangingBackend {
        async fn execute(&self, _request: &ExecutionRequest, _timeout: Duration) -> ExecutionResult {
            std::future::pending::<ExecutionResult>().await
        }
    }

    fn ok(stdout: &str) -> ExecutionResult {
        ExecutionResult::completed(stdout, "", 0)
    }

    fn orchestrator(backend: Arc<dyn ExecutionBackend>) -> Orchestrator {
        Orchestrator::new(backend, Duration::from_millis(1500))
    }

    #[tokio::test]
    async fn test_two_sum_all_pass() {
        let backend = ScriptedBackend::new(vec![ok("[0, 1]\n"), ok("[1,2]\n"), ok("[0,1]")]);
        let challenge = Challenge::from_statement(TWO_SUM);

        let summary = orchestrator(backend.clone())
            .run(&challenge, PY_TWO_SUM, Language::Python, &CancelSignal::never())
            .await;

        assert_eq!(summary.outcome, RunOutcome::Evaluated);
        assert_eq!(summary.passed_count, 3);
        assert_eq!(summary.total_count, 3);
        assert!(summary.all_passed());
        assert_eq!(
            summary.verdicts.iter().map(|v| v.index).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        assert_eq!(
            backend.stdins(),
            vec!["[[2,7,11,15],9]", "[[3,2,4],6]", "[[3,3],6]"]
        );

        let requests = backend.requests.lock().unwrap();
        let (first, timeout) = &requests[0];
        assert_eq!(*timeout, Duration::from_millis(1500));
        assert_eq!(first.language, Language::Python);
        assert!(first.prepared_source.contains("Solution().twoSum(*args)"));
        assert!(requests.iter().all(|(r, _)| r.prepared_source == first.prepared_source));
    }

    #[tokio::test]
    async fn test_transport_error_on_one_case_does_not_stop_run() {
        let backend = ScriptedBackend::new(vec![
            ok("[0,1]"),
            ExecutionResult::transport("execution service unreachable: connection refused"),
            ok("[0,1]"),
        ]);

        let summary = orchestrator(backend.clone())
            .run(&Challenge::from_statement(TWO_SUM), PY_TWO_SUM, Language::Python, &CancelSignal::never())
            .await;

        assert_eq!(backend.calls(), 3);
        assert_eq!(summary.outcome, RunOutcome::Evaluated);
        assert_eq!(summary.passed_count, 2);
        assert_eq!(summary.total_count, 3);
        assert!(!summary.verdicts[1].passed);
        assert!(summary.verdicts[1].error.as_deref().unwrap().contains("connection refused"));
        assert_eq!(summary.verdicts[2].error, None);
    }

    #[tokio::test]
    async fn test_wrong_answer_is_a_plain_failure() {
        let backend = ScriptedBackend::new(vec![ok("[1,0]"), ok("[1,2]"), ok("[0,1]")]);

        let summary = orchestrator(backend)
            .run(&Challenge::from_statement(TWO_SUM), PY_TWO_SUM, Language::Python, &CancelSignal::never())
            .await;

        assert_eq!(summary.passed_count, 2);
        assert!(!summary.verdicts[0].passed);
        assert_eq!(summary.verdicts[0].error, None);
        assert_eq!(summary.verdicts[0].raw_actual, "[1,0]");
        assert_eq!(summary.verdicts[0].raw_expected, "[0,1]");
    }

    #[tokio::test]
    async fn test_statement_without_examples() {
        let backend = ScriptedBackend::new(vec![]);
        let challenge = Challenge::from_statement("Design a URL shortener. Discuss storage and caching.");

        let summary = orchestrator(backend.clone())
            .run(&challenge, "def f():\n    pass\n", Language::Python, &CancelSignal::never())
            .await;

        assert_eq!(summary.outcome, RunOutcome::NoTestCases);
        assert_eq!(summary.total_count, 0);
        assert_eq!(summary.passed_count, 0);
        assert!(summary.verdicts.is_empty());
        assert_eq!(backend.calls(), 0);
    }

    #[tokio::test]
    async fn test_cancelled_before_start_executes_nothing() {
        let backend = ScriptedBackend::new(vec![ok("[0,1]")]);
        let (handle, signal) = cancel_pair();
        handle.cancel();

        let summary = orchestrator(backend.clone())
            .run(&Challenge::from_statement(TWO_SUM), PY_TWO_SUM, Language::Python, &signal)
            .await;

        assert_eq!(summary.outcome, RunOutcome::Cancelled);
        assert!(summary.verdicts.is_empty());
        assert_eq!(summary.total_count, 3);
        assert_eq!(backend.calls(), 0);
    }

    #[tokio::test]
    async fn test_cancel_between_cases_skips_the_rest() {
        let (handle, signal) = cancel_pair();
        let backend = ScriptedBackend::cancelling(vec![ok("[0,1]"), ok("[1,2]"), ok("[0,1]")], handle);

        let summary = orchestrator(backend.clone())
            .run(&Challenge::from_statement(TWO_SUM), PY_TWO_SUM, Language::Python, &signal)
            .await;

        assert_eq!(backend.calls(), 1);
        assert_eq!(summary.outcome, RunOutcome::Cancelled);
        assert_eq!(summary.verdicts.len(), 1);
        assert!(summary.verdicts[0].passed);
        assert_eq!(summary.passed_count, 1);
        assert_eq!(summary.total_count, 3);
    }

    #[tokio::test]
    async fn test_cancel_interrupts_in_flight_case() {
        let (handle, signal) = cancel_pair();
        let orchestrator = orchestrator(Arc::new(HangingBackend));
        let challenge = Challenge::from_statement(TWO_SUM);

        let canceller = async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            handle.cancel();
        };
        let run = orchestrator.run(&challenge, PY_TWO_SUM, Language::Python, &signal);

        let (summary, _) = tokio::time::timeout(Duration::from_secs(2), async { tokio::join!(run, canceller) })
            .await
            .expect("run did not stop after cancellation");

        assert_eq!(summary.outcome, RunOutcome::Cancelled);
        assert_eq!(summary.verdicts.len(), 1);
        assert_eq!(summary.verdicts[0].error.as_deref(), Some(CANCELLED));
        assert_eq!(summary.passed_count, 0);
    }

    #[tokio::test]
    async fn test_dropped_guard_cancels_run() {
        let (handle, signal) = cancel_pair();
        let guard = handle.guard();
        let orchestrator = orchestrator(Arc::new(HangingBackend));
        let challenge = Challenge::from_statement(TWO_SUM);

        let dropper = async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            drop(guard);
        };
        let run = orchestrator.run(&challenge, PY_TWO_SUM, Language::Python, &signal);

        let (summary, _) = tokio::time::timeout(Duration::from_secs(2), async { tokio::join!(run, dropper) })
            .await
            .expect("run did not stop after guard drop");

        assert_eq!(summary.outcome, RunOutcome::Cancelled);
    }

    #[tokio::test]
    async fn test_no_entry_point_sentinel_is_flagged() {
        let statement = "Example 1:\nInput: n = 3\nOutput: 6\n";
        let sentinel = format!("{}\n", NO_OUTPUT_SENTINEL);
        let backend = ScriptedBackend::new(vec![ok(&sentinel)]);

        let summary = orchestrator(backend.clone())
            .run(&Challenge::from_statement(statement), "x = 1 + 1\n", Language::Python, &CancelSignal::never())
            .await;

        assert_eq!(summary.outcome, RunOutcome::Evaluated);
        assert!(!summary.verdicts[0].passed);
        assert_eq!(summary.verdicts[0].error.as_deref(), Some(NO_RECOGNIZED_OUTPUT));
        assert_eq!(backend.stdins(), vec!["3\n"]);
    }

    #[tokio::test]
    async fn test_self_io_program_gets_line_oriented_stdin() {
        let statement = "Example 1:\nInput: word = \"ab\", times = 4\nOutput: 8\n";
        let source = "w = input()\nt = int(input())\nprint(len(w) * t)\n";
        let backend = ScriptedBackend::new(vec![ok("8\n")]);

        let summary = orchestrator(backend.clone())
            .run(&Challenge::from_statement(statement), source, Language::Python, &CancelSignal::never())
            .await;

        assert_eq!(backend.stdins(), vec!["ab\n4\n"]);
        assert_eq!(backend.requests.lock().unwrap()[0].0.prepared_source, source);
        assert!(summary.verdicts[0].passed);
        assert_eq!(summary.verdicts[0].raw_actual, "8");
    }

    #[tokio::test]
    async fn test_runtime_error_output_is_compared() {
        let statement = "Example 1:\nInput: n = 0\nOutput: 1\n";
        let backend = ScriptedBackend::new(vec![ExecutionResult::completed(
            "ZeroDivisionError: division by zero",
            "ZeroDivisionError: division by zero",
            1,
        )]);

        let summary = orchestrator(backend)
            .run(
                &Challenge::from_statement(statement),
                "def inverse(n):\n    return 1 / n\n",
                Language::Python,
                &CancelSignal::never(),
            )
            .await;

        assert!(!summary.verdicts[0].passed);
        assert_eq!(summary.verdicts[0].error, None);
        assert!(summary.verdicts[0].raw_actual.contains("ZeroDivisionError"));
    }
}
