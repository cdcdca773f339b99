/// Value Codec - Canonical Structured-Data Grammar
///
/// **Core Responsibility:**
/// Convert between example/program text and `DecodedValue`, and decide
/// whether two values are equal for grading purposes.
///
/// **Critical Properties:**
/// - `decode` is total: every input yields Structured or Unparsed
/// - Canonical encoding is compact JSON with key-ordered maps
/// - `compare` is symmetric
///
/// **Normalization Rules:**
/// - Surrounding whitespace is ignored on both sides
/// - Python-style literals (True/False/None, single-quoted strings) are
///   accepted when strict JSON fails
/// - Floating-point tolerance: NO (1 and 1.0 differ)
use assessor_common::types::DecodedValue;
use serde_json::Value;

/// Decode text into a structured value, falling back to the trimmed text
pub fn decode(text: &str) -> DecodedValue {
    let trimmed = text.trim();

    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return DecodedValue::Structured(value);
    }

    if let Some(relaxed) = relax_literals(trimmed) {
        if let Ok(value) = serde_json::from_str::<Value>(&relaxed) {
            return DecodedValue::Structured(value);
        }
    }

    DecodedValue::Unparsed(trimmed.to_string())
}

/// Canonical serialization used for harness output and comparison
pub fn encode(value: &DecodedValue) -> String {
    match value {
        DecodedValue::Structured(value) => encode_value(value),
        DecodedValue::Unparsed(text) => text.trim().to_string(),
    }
}

/// Compact JSON for a structured value
pub fn encode_value(value: &Value) -> String {
    // Serializing a Value cannot fail: keys are always strings
    serde_json::to_string(value).unwrap_or_default()
}

/// Grading equality between two decoded values
///
/// - Structured vs Structured: canonical encodings are byte-identical
/// - Unparsed vs Unparsed: trimmed texts are identical
/// - Mixed: the structured side's canonical encoding equals the other's text
pub fn compare(a: &DecodedValue, b: &DecodedValue) -> bool {
    match (a, b) {
        (DecodedValue::Structured(x), DecodedValue::Structured(y)) => encode_value(x) == encode_value(y),
        (DecodedValue::Unparsed(x), DecodedValue::Unparsed(y)) => x.trim() == y.trim(),
        (DecodedValue::Structured(x), DecodedValue::Unparsed(text))
        | (DecodedValue::Unparsed(text), DecodedValue::Structured(x)) => encode_value(x) == text.trim(),
    }
}

/// Rewrite Python-flavoured literals into JSON.
///
/// Returns None when nothing changed, so the caller can skip a second parse.
fn relax_literals(text: &str) -> Option<String> {
    let mut out = String::with_capacity(text.len() + 8);
    let mut changed = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' => {
                out.push('"');
                while let Some(inner) = chars.next() {
                    out.push(inner);
                    if inner == '\\' {
                        if let Some(escaped) = chars.next() {
                            out.push(escaped);
                        }
                    } else if inner == '"' {
                        break;
                    }
                }
            }
            '\'' => {
                changed = true;
                let mut closed = false;
                out.push('"');
                while let Some(inner) = chars.next() {
                    match inner {
                        '\\' => match chars.next() {
                            Some('\'') => out.push('\''),
                            Some(escaped) => {
                                out.push('\\');
                                out.push(escaped);
                            }
                            None => out.push('\\'),
                        },
                        '"' => out.push_str("\\\""),
                        '\'' => {
                            closed = true;
                            break;
                        }
                        other => out.push(other),
                    }
                }
                if !closed {
                    return None;
                }
                out.push('"');
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut word = String::from(c);
                while let Some(&next) = chars.peek() {
                    if next.is_ascii_alphanumeric() || next == '_' {
                        word.push(next);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let replacement = match word.as_str() {
                    "True" => "true",
                    "False" => "false",
                    "None" => "null",
                    _ => word.as_str(),
                };
                if replacement != word {
                    changed = true;
                }
                out.push_str(replacement);
            }
            other => out.push(other),
        }
    }

    changed.then_some(out)
}
