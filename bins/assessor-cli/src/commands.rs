// CLI commands for the assessment engine
use anyhow::{bail, Context, Result};
use assessor_common::config::EngineConfig;
use assessor_common::types::{AttemptRecord, Challenge, Language, RunOutcome, RunSummary, TestCase};
use assessor_engine::analytics;
use assessor_engine::cancel::cancel_pair;
use assessor_engine::config::LanguageConfigManager;
use assessor_engine::engine::PistonClient;
use assessor_engine::executor::Orchestrator;
use assessor_engine::extractor;
use assessor_engine::harness::{self, HarnessKind};
use chrono::{DateTime, Utc};
use std::fs;
use std::io::{self, Read};
use std::path::Path;
use std::sync::Arc;

/// Read a file, or stdin when the path is "-"
fn read_input(path: &str) -> Result<String> {
    if path == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer).context("Failed to read stdin")?;
        return Ok(buffer);
    }
    fs::read_to_string(path).with_context(|| format!("Failed to read {}", path))
}

fn parse_language(name: &str) -> Result<Language> {
    match Language::from_str(name) {
        Some(language) => Ok(language),
        None => {
            let supported: Vec<String> = Language::all_variants().iter().map(|l| l.to_string()).collect();
            bail!("Unsupported language '{}' (supported: {})", name, supported.join(", "))
        }
    }
}

fn one_line(text: &str, max: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max {
        return flat;
    }
    let cut: String = flat.chars().take(max.saturating_sub(1)).collect();
    format!("{}…", cut)
}

fn format_cases(cases: &[TestCase]) -> String {
    if cases.is_empty() {
        return "No examples found - this statement has no automated checks.\n".to_string();
    }

    let mut out = format!("📋 Found {} test case(s):\n\n", cases.len());
    out.push_str(&format!("{:<8} {:<40} {:<24} {}\n", "EXAMPLE", "INPUT", "OUTPUT", "ARGS"));
    out.push_str(&format!("{}\n", "─".repeat(80)));
    for case in cases {
        out.push_str(&format!(
            "{:<8} {:<40} {:<24} {}\n",
            case.index,
            one_line(&case.raw_input, 40),
            one_line(&case.raw_output, 24),
            case.arguments.len()
        ));
    }
    out
}

/// Show the test cases found in a statement
pub fn extract_cases(statement_path: &str, json: bool) -> Result<()> {
    let statement = read_input(statement_path)?;
    let cases = extractor::extract(&statement);

    if json {
        println!("{}", serde_json::to_string_pretty(&cases)?);
    } else {
        print!("{}", format_cases(&cases));
    }
    Ok(())
}

/// Print the prepared source; the harness kind goes to stderr
pub fn wrap_source(language: &str, source_path: &str) -> Result<()> {
    let language = parse_language(language)?;
    let source = read_input(source_path)?;
    let prepared = harness::wrap(language, &source);

    let kind = match &prepared.kind {
        HarnessKind::Passthrough => "passthrough (program does its own I/O)".to_string(),
        HarnessKind::Wrapped { entry_point } => format!("wrapped, entry point `{}`", entry_point.name()),
        HarnessKind::NoEntryPoint => "no entry point found; prints the no-output sentinel".to_string(),
    };
    eprintln!("🔧 Harness: {}", kind);
    println!("{}", prepared.source);
    Ok(())
}

fn format_summary(summary: &RunSummary) -> String {
    let mut out = String::new();

    if summary.outcome == RunOutcome::NoTestCases {
        out.push_str("ℹ️  No examples in the statement - nothing to grade automatically.\n");
        return out;
    }

    for verdict in &summary.verdicts {
        let line = match (&verdict.error, verdict.passed) {
            (Some(error), _) => format!("  ⚠️  Example {}: {}\n", verdict.index, error),
            (None, true) => format!("  ✅ Example {}\n", verdict.index),
            (None, false) => format!(
                "  ❌ Example {}\n     Expected: {}\n     Got:      {}\n",
                verdict.index,
                one_line(&verdict.raw_expected, 70),
                one_line(&verdict.raw_actual, 70)
            ),
        };
        out.push_str(&line);
    }

    if summary.outcome == RunOutcome::Cancelled {
        out.push_str(&format!(
            "\n🛑 Cancelled after {} of {} case(s)\n",
            summary.verdicts.len(),
            summary.total_count
        ));
    }

    let marker = if summary.all_passed() { "✅" } else { "📊" };
    out.push_str(&format!(
        "\n{} Passed {}/{}\n",
        marker, summary.passed_count, summary.total_count
    ));
    out
}

/// Grade a submission; Ctrl-C cancels the run between or during cases
pub async fn run_submission(
    statement_path: &str,
    source_path: &str,
    language: &str,
    api_url: Option<String>,
    timeout_ms: Option<u64>,
    json: bool,
) -> Result<()> {
    let language = parse_language(language)?;
    let statement = read_input(statement_path)?;
    let source = read_input(source_path)?;

    let mut config = EngineConfig::from_env()?;
    if let Some(url) = api_url {
        config.execution_api_url = url.trim_end_matches('/').to_string();
    }
    if let Some(ms) = timeout_ms {
        config.execution_timeout_ms = ms;
    }

    let languages = LanguageConfigManager::load_or_default(&config.languages_config)?;
    let client = PistonClient::from_config(&config, languages)?;
    let orchestrator = Orchestrator::new(Arc::new(client), config.execution_timeout());

    if !json {
        println!(
            "🚀 Grading {} submission via {} (timeout {}ms per case)\n",
            language, config.execution_api_url, config.execution_timeout_ms
        );
    }

    let (handle, signal) = cancel_pair();
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\n⚠️  Cancelling run...");
            handle.cancel();
        }
    });

    let challenge = Challenge::from_statement(statement);
    let summary = orchestrator.run(&challenge, &source, language, &signal).await;
    ctrl_c.abort();

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print!("{}", format_summary(&summary));
    }
    Ok(())
}

fn parse_now(now: Option<&str>) -> Result<DateTime<Utc>> {
    match now {
        Some(text) => Ok(DateTime::parse_from_rfc3339(text)
            .with_context(|| format!("Invalid --now timestamp: {}", text))?
            .with_timezone(&Utc)),
        None => Ok(Utc::now()),
    }
}

/// Aggregate an attempt history and print the report as JSON
pub fn progress_report(attempts_path: &str, window_days: Option<u32>, now: Option<&str>) -> Result<()> {
    let content = read_input(attempts_path)?;
    let attempts: Vec<AttemptRecord> =
        serde_json::from_str(&content).context("Failed to parse attempt records")?;

    let window_days = match window_days {
        Some(days) => days,
        None => EngineConfig::from_env()?.trend_window_days,
    };
    let report = analytics::progress_report(&attempts, parse_now(now)?, window_days);

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// List the runtime mapping
pub fn list_languages(config_path: Option<&str>) -> Result<()> {
    let path = match config_path {
        Some(path) => Path::new(path).to_path_buf(),
        None => EngineConfig::from_env()?.languages_config,
    };
    let manager = LanguageConfigManager::load_or_default(&path)?;

    println!("📋 Runtime mapping ({}):\n", path.display());
    println!("{:<12} {:<12} {:<10} {:<12}", "LANGUAGE", "RUNTIME", "VERSION", "FILE");
    println!("{}", "─".repeat(50));
    for language in manager.list_languages() {
        let config = manager.get_config(language);
        println!(
            "{:<12} {:<12} {:<10} {:<12}",
            language.to_string(),
            config.runtime,
            config.version,
            config.file_name.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assessor_common::types::CaseVerdict;
    use std::io::Write;
    use uuid::Uuid;

    fn verdict(index: u32, passed: bool, error: Option<&str>) -> CaseVerdict {
        CaseVerdict {
            index,
            raw_input: "n = 1".to_string(),
            raw_expected: "[0,1]".to_string(),
            raw_actual: "[1,0]".to_string(),
            passed,
            error: error.map(str::to_string),
        }
    }

    #[test]
    fn test_parse_language() {
        assert_eq!(parse_language("py").unwrap(), Language::Python);
        let err = parse_language("cobol").unwrap_err().to_string();
        assert!(err.contains("python, javascript, java"));
    }

    #[test]
    fn test_read_input_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "Example 1:\nInput: 1\nOutput: 1\n").unwrap();
        let text = read_input(file.path().to_str().unwrap()).unwrap();
        assert_eq!(extractor::extract(&text).len(), 1);
        assert!(read_input("/definitely/not/here.txt").is_err());
    }

    #[test]
    fn test_one_line_truncates() {
        assert_eq!(one_line("a\n  b", 10), "a b");
        assert_eq!(one_line("abcdefghij", 5), "abcd…");
    }

    #[test]
    fn test_format_summary() {
        let summary = RunSummary {
            run_id: Uuid::new_v4(),
            language: Language::Python,
            outcome: RunOutcome::Cancelled,
            verdicts: vec![
                verdict(1, true, None),
                verdict(2, false, None),
                verdict(3, false, Some("cancelled")),
            ],
            passed_count: 1,
            total_count: 4,
        };

        let text = format_summary(&summary);

        assert!(text.contains("✅ Example 1"));
        assert!(text.contains("❌ Example 2"));
        assert!(text.contains("Got:      [1,0]"));
        assert!(text.contains("⚠️  Example 3: cancelled"));
        assert!(text.contains("Cancelled after 3 of 4"));
        assert!(text.contains("Passed 1/4"));
    }

    #[test]
    fn test_format_cases_empty() {
        assert!(format_cases(&[]).contains("no automated checks"));
    }

    #[test]
    fn test_parse_now() {
        let now = parse_now(Some("2026-03-10T12:00:00+02:00")).unwrap();
        assert_eq!(now.to_rfc3339(), "2026-03-10T10:00:00+00:00");
        assert!(parse_now(Some("yesterday")).is_err());
    }
}
