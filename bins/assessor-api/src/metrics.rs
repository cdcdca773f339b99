// Prometheus counters for runs and cases
use anyhow::{Context, Result};
use assessor_common::types::RunSummary;
use assessor_engine::evaluator::{CANCELLED, NO_RECOGNIZED_OUTPUT};
use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use std::time::Duration;

pub struct Metrics {
    registry: Registry,
    runs: IntCounterVec,
    cases: IntCounterVec,
    transport_errors: IntCounter,
    run_duration: HistogramVec,
}

impl Metrics {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let runs = IntCounterVec::new(
            Opts::new("assessor_runs_total", "Orchestration runs by language and outcome"),
            &["language", "outcome"],
        )?;
        let cases = IntCounterVec::new(
            Opts::new("assessor_cases_total", "Evaluated test cases by language and result"),
            &["language", "result"],
        )?;
        let transport_errors = IntCounter::new(
            "assessor_transport_errors_total",
            "Cases that failed to reach or get a usable answer from the execution service",
        )?;
        let run_duration = HistogramVec::new(
            HistogramOpts::new("assessor_run_duration_seconds", "Wall time of a full run")
                .buckets(vec![0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0]),
            &["language"],
        )?;

        registry.register(Box::new(runs.clone())).context("register runs")?;
        registry.register(Box::new(cases.clone())).context("register cases")?;
        registry
            .register(Box::new(transport_errors.clone()))
            .context("register transport errors")?;
        registry
            .register(Box::new(run_duration.clone()))
            .context("register run duration")?;

        Ok(Self {
            registry,
            runs,
            cases,
            transport_errors,
            run_duration,
        })
    }

    pub fn observe(&self, summary: &RunSummary, elapsed: Duration) {
        let language = summary.language.to_string();
        let outcome = serde_json::to_value(summary.outcome)
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default();

        self.runs.with_label_values(&[&language, &outcome]).inc();
        self.run_duration
            .with_label_values(&[&language])
            .observe(elapsed.as_secs_f64());

        for verdict in &summary.verdicts {
            let result = match verdict.error.as_deref() {
                None if verdict.passed => "passed",
                None => "failed",
                Some(CANCELLED) => "cancelled",
                Some(NO_RECOGNIZED_OUTPUT) => "no_output",
                Some(_) => {
                    self.transport_errors.inc();
                    "error"
                }
            };
            self.cases.with_label_values(&[&language, result]).inc();
        }
    }

    /// Prometheus text exposition
    pub fn render(&self) -> Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&self.registry.gather(), &mut buffer)
            .context("encode metrics")?;
        String::from_utf8(buffer).context("metrics are not UTF-8")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assessor_common::types::{CaseVerdict, Language, RunOutcome};
    use uuid::Uuid;

    fn verdict(passed: bool, error: Option<&str>) -> CaseVerdict {
        CaseVerdict {
            index: 1,
            raw_input: String::new(),
            raw_expected: String::new(),
            raw_actual: String::new(),
            passed,
            error: error.map(str::to_string),
        }
    }

    #[test]
    fn test_observe_and_render() {
        let metrics = Metrics::new().unwrap();
        let summary = RunSummary {
            run_id: Uuid::new_v4(),
            language: Language::Java,
            outcome: RunOutcome::Evaluated,
            verdicts: vec![
                verdict(true, None),
                verdict(false, None),
                verdict(false, Some("execution timed out after 15000ms")),
            ],
            passed_count: 1,
            total_count: 3,
        };

        metrics.observe(&summary, Duration::from_millis(1200));
        let text = metrics.render().unwrap();

        assert!(text.contains(r#"assessor_runs_total{language="java",outcome="evaluated"} 1"#));
        assert!(text.contains(r#"assessor_cases_total{language="java",result="passed"} 1"#));
        assert!(text.contains(r#"assessor_cases_total{language="java",result="error"} 1"#));
        assert!(text.contains("assessor_transport_errors_total 1"));
        assert!(text.contains("assessor_run_duration_seconds_count{language=\"java\"} 1"));
    }
}
