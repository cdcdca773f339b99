/// Test Case Extractor - Example Blocks to Structured Cases
///
/// **Core Responsibility:**
/// Scan a problem statement for "Example N:" blocks and turn each block's
/// Input/Output pair into a `TestCase`.
///
/// **Critical Properties:**
/// - Total: malformed text yields fewer cases or Unparsed values, never errors
/// - `index` is the number stated in the text, never a recount
/// - Cases are returned in the order they appear in the statement
/// - Zero blocks is a valid outcome (empty vector)
use crate::codec;
use assessor_common::types::{DecodedValue, TestCase};
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;

lazy_static! {
    static ref EXAMPLE_MARKER: Regex = Regex::new(r"(?i)\bexample\s*#?\s*(\d+)\s*:").unwrap();
    static ref INPUT_LABEL: Regex = Regex::new(r"(?i)\binput\s*:").unwrap();
    static ref OUTPUT_LABEL: Regex = Regex::new(r"(?i)\boutput\s*:").unwrap();
    static ref LABEL_LINE: Regex = Regex::new(r"^[\s>*_#`-]*[A-Za-z][A-Za-z ]{0,30}:").unwrap();
    static ref ASSIGNMENT: Regex = Regex::new(r"(?s)^\s*[A-Za-z_][A-Za-z0-9_]*\s*=\s*([^=\s].*)$").unwrap();
}

/// Extract every well-formed example block as a test case
pub fn extract(problem_statement: &str) -> Vec<TestCase> {
    let markers: Vec<(usize, usize, Option<u32>)> = EXAMPLE_MARKER
        .captures_iter(problem_statement)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let number = caps.get(1).and_then(|m| m.as_str().parse::<u32>().ok());
            Some((whole.start(), whole.end(), number))
        })
        .collect();

    let mut cases = Vec::with_capacity(markers.len());

    for (position, (_, body_start, number)) in markers.iter().enumerate() {
        let body_end = markers
            .get(position + 1)
            .map(|(next_start, _, _)| *next_start)
            .unwrap_or(problem_statement.len());
        let block = &problem_statement[*body_start..body_end];

        let Some((raw_input, raw_output)) = split_block(block) else {
            tracing::debug!(example = position + 1, "Example block without Input/Output pair skipped");
            continue;
        };

        let index = number.unwrap_or((position + 1) as u32);
        let (input, arguments) = normalize_input(&raw_input);
        let expected_output = codec::decode(&raw_output);

        cases.push(TestCase {
            index,
            raw_input,
            raw_output,
            input,
            expected_output,
            arguments,
        });
    }

    cases
}

/// Locate the Input and Output values inside one example block
fn split_block(block: &str) -> Option<(String, String)> {
    let input_label = INPUT_LABEL.find(block)?;
    let output_label = OUTPUT_LABEL.find_at(block, input_label.end())?;

    let raw_input = clean_value(&block[input_label.end()..output_label.start()]);
    let raw_output = clean_value(&take_value_lines(&block[output_label.end()..]));

    if raw_input.is_empty() && raw_output.is_empty() {
        return None;
    }

    Some((raw_input, raw_output))
}

/// The Output value runs until a blank line or the next labelled line
fn take_value_lines(rest: &str) -> String {
    let mut lines = Vec::new();

    for (i, line) in rest.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.starts_with("```") {
            continue;
        }
        if trimmed.is_empty() {
            // Blank lines before the value are skipped, after it they end it
            if lines.is_empty() {
                continue;
            }
            break;
        }
        if i > 0 && LABEL_LINE.is_match(line) {
            break;
        }
        lines.push(line);
    }

    lines.join("\n")
}

/// Drop code fences and markdown emphasis around a value
fn clean_value(value: &str) -> String {
    let lines: Vec<&str> = value
        .lines()
        .map(str::trim)
        .filter(|line| !line.starts_with("```"))
        .collect();

    lines
        .join("\n")
        .trim_matches(|c: char| c == '*' || c == '`' || c.is_whitespace())
        .to_string()
}

/// Strip variable assignments and recover positional arguments.
///
/// `nums = [2,7,11,15], target = 9` decodes to `[[2,7,11,15],9]` with two
/// arguments; `s = "abc"` decodes to `"abc"` with one argument; a bare value
/// is decoded as-is and becomes the single argument.
fn normalize_input(raw_input: &str) -> (DecodedValue, Vec<Value>) {
    let parts = split_top_level(raw_input, ',');
    let assigned: Vec<Option<&str>> = parts.iter().map(|part| assignment_value(part)).collect();

    if assigned.iter().all(Option::is_some) && !assigned.is_empty() {
        let values: Vec<&str> = assigned.into_iter().flatten().collect();
        if let Some(arguments) = decode_all(&values) {
            let input = if arguments.len() == 1 {
                DecodedValue::Structured(arguments[0].clone())
            } else {
                DecodedValue::Structured(Value::Array(arguments.clone()))
            };
            return (input, arguments);
        }
        return (codec::decode(after_first_assignment(raw_input)), Vec::new());
    }

    if assigned.first().copied().flatten().is_some() {
        // `words = hello, world`: one variable whose value has bare commas
        let decoded = codec::decode(after_first_assignment(raw_input));
        let arguments = decoded.as_structured().cloned().into_iter().collect();
        return (decoded, arguments);
    }

    let whole = codec::decode(raw_input);
    if let DecodedValue::Structured(value) = &whole {
        let arguments = vec![value.clone()];
        return (whole, arguments);
    }

    if parts.len() > 1 {
        if let Some(arguments) = decode_all(&parts) {
            return (DecodedValue::Structured(Value::Array(arguments.clone())), arguments);
        }
    }

    (whole, Vec::new())
}

fn assignment_value(part: &str) -> Option<&str> {
    ASSIGNMENT
        .captures(part)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
}

fn after_first_assignment(text: &str) -> &str {
    assignment_value(text).unwrap_or(text)
}

fn decode_all(texts: &[&str]) -> Option<Vec<Value>> {
    texts
        .iter()
        .map(|text| match codec::decode(text) {
            DecodedValue::Structured(value) => Some(value),
            DecodedValue::Unparsed(_) => None,
        })
        .collect()
}

/// Split on a separator that is not nested in brackets or quotes
fn split_top_level(text: &str, separator: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut start = 0;

    for (i, c) in text.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '"' | '\'' => quote = Some(c),
            '[' | '{' | '(' => depth += 1,
            ']' | '}' | ')' => depth -= 1,
            c if c == separator && depth == 0 => {
                parts.push(text[start..i].trim());
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(text[start..].trim());

    parts.into_iter().filter(|part| !part.is_empty()).collect()
}
