/// Harness Generator - Adapt Candidate Code to a Batch Program
///
/// **Core Responsibility:**
/// Wrap a candidate's bare function or `Solution` method so it can run as a
/// stdin → stdout program on the remote execution service.
///
/// **Decision Order:**
/// 1. Candidate reads stdin AND writes stdout itself → passthrough, untouched
/// 2. Entry point found → generated runner decodes stdin, calls it, prints JSON
/// 3. Nothing callable → source runs as-is, then prints `NO_OUTPUT_SENTINEL`
///
/// **Critical Properties:**
/// - Pure and stateless; safe to call from concurrent runs
/// - Total: always returns submittable source
/// - Detection is a best-effort pattern search, not a parser
use assessor_common::types::Language;
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

/// Printed by harnesses that found nothing to call
pub const NO_OUTPUT_SENTINEL: &str = "__ASSESSOR_NO_RECOGNIZED_OUTPUT__";

/// Conventional name of the container type holding the solution method
pub const SOLUTION_CONTAINER: &str = "Solution";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EntryPoint {
    Function { name: String },
    Method { container: String, name: String },
}

impl EntryPoint {
    pub fn name(&self) -> &str {
        match self {
            EntryPoint::Function { name } | EntryPoint::Method { name, .. } => name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HarnessKind {
    /// The candidate performs its own I/O
    Passthrough,
    /// A runner invokes the detected entry point
    Wrapped { entry_point: EntryPoint },
    /// Source runs as-is and prints the sentinel afterwards
    NoEntryPoint,
}

/// Prepared source plus how it was produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Harness {
    pub source: String,
    pub kind: HarnessKind,
}

lazy_static! {
    static ref PY_READS: Regex = Regex::new(r"\binput\s*\(|\bsys\.stdin\b|\bfileinput\b").unwrap();
    static ref PY_WRITES: Regex = Regex::new(r"\bprint\s*\(|\bsys\.stdout\b").unwrap();
    static ref JS_READS: Regex = Regex::new(
        r#"\bprocess\.stdin\b|readFileSync\s*\(\s*(?:0|['"]/dev/stdin['"])|require\s*\(\s*['"](?:node:)?readline['"]\s*\)"#
    )
    .unwrap();
    static ref JS_WRITES: Regex = Regex::new(r"\bconsole\.log\s*\(|\bprocess\.stdout\.write\b").unwrap();
    static ref JAVA_READS: Regex = Regex::new(r"\bSystem\.in\b|\bnew\s+Scanner\s*\(|\bBufferedReader\b").unwrap();
    static ref JAVA_WRITES: Regex = Regex::new(r"\bSystem\.out\.").unwrap();

    static ref PY_CLASS: Regex = Regex::new(r"^class\s+Solution\b").unwrap();
    static ref PY_METHOD: Regex = Regex::new(r"^(\s+)def\s+([A-Za-z_]\w*)\s*\(").unwrap();
    static ref PY_FUNCTION: Regex = Regex::new(r"(?m)^def\s+([A-Za-z_]\w*)\s*\(").unwrap();

    static ref JS_CLASS: Regex = Regex::new(r"\bclass\s+Solution\b[^{]*\{").unwrap();
    static ref JS_METHOD: Regex =
        Regex::new(r"^\s*(?:static\s+)?(?:async\s+)?\*?\s*([A-Za-z_$][\w$]*)\s*\([^)]*\)\s*\{").unwrap();
    static ref JS_FUNCTION: Regex =
        Regex::new(r"(?m)^(?:export\s+)?(?:async\s+)?function\s*\*?\s*([A-Za-z_$][\w$]*)\s*\(").unwrap();
    static ref JS_BINDING: Regex = Regex::new(
        r"(?m)^(?:export\s+)?(?:const|let|var)\s+([A-Za-z_$][\w$]*)\s*=\s*(?:async\s+)?(?:function\b|\([^)]*\)\s*=>|[A-Za-z_$][\w$]*\s*=>)"
    )
    .unwrap();

    static ref JAVA_CLASS: Regex = Regex::new(r"\bclass\s+Solution\b[^{]*\{").unwrap();
    static ref JAVA_METHOD: Regex = Regex::new(
        r"^\s*(?:(?:public|private|protected|static|final|synchronized|abstract)\s+)*(?:<[^>]+>\s*)?[A-Za-z_][\w<>\[\],.? ]*?\s+([A-Za-z_]\w*)\s*\("
    )
    .unwrap();
    static ref JAVA_PUBLIC_TYPE: Regex =
        Regex::new(r"(?m)^public\s+((?:(?:final|abstract)\s+)*)(class|interface|enum|record)\b").unwrap();
    static ref JAVA_MAIN_CLASS: Regex = Regex::new(r"\bclass\s+Main\b").unwrap();
    static ref JAVA_MAIN_NAME: Regex = Regex::new(r"\bMain\b").unwrap();
    static ref JAVA_TYPE_DECL: Regex = Regex::new(r"\b(?:class|enum|record)\s+([A-Za-z_]\w*)").unwrap();
    static ref JAVA_STATIC_MAIN: Regex = Regex::new(r"\bstatic\s+void\s+main\s*\(").unwrap();
    static ref PY_FUTURE_IMPORT: Regex = Regex::new(r"^from\s+__future__\s+import\b").unwrap();
}

/// New name for a candidate class that would clash with the generated `Main`
const JAVA_CANDIDATE_MAIN: &str = "CandidateMain";

const KEYWORDS: &[&str] = &[
    "if", "for", "while", "switch", "catch", "return", "new", "else", "do", "try", "synchronized", "function",
    "constructor",
];

/// Prepare candidate source for batch execution
pub fn wrap(language: Language, candidate_source: &str) -> Harness {
    if performs_own_io(language, candidate_source) {
        return Harness {
            source: candidate_source.to_string(),
            kind: HarnessKind::Passthrough,
        };
    }

    match detect_entry_point(language, candidate_source) {
        Some(entry_point) => {
            let source = match language {
                Language::Python => python_runner(candidate_source, &entry_point),
                Language::JavaScript => javascript_runner(candidate_source, &entry_point),
                Language::Java => java_runner(candidate_source, &entry_point),
            };
            Harness {
                source,
                kind: HarnessKind::Wrapped { entry_point },
            }
        }
        None => Harness {
            source: sentinel_runner(language, candidate_source),
            kind: HarnessKind::NoEntryPoint,
        },
    }
}

/// True when the source both reads stdin and writes stdout on its own
pub fn performs_own_io(language: Language, source: &str) -> bool {
    let code = strip_comments(language, source);
    let (reads, writes) = match language {
        Language::Python => (&*PY_READS, &*PY_WRITES),
        Language::JavaScript => (&*JS_READS, &*JS_WRITES),
        Language::Java => (&*JAVA_READS, &*JAVA_WRITES),
    };
    reads.is_match(&code) && writes.is_match(&code)
}

/// Find the callable the harness should invoke.
///
/// A method of `Solution` wins over bare functions.
pub fn detect_entry_point(language: Language, source: &str) -> Option<EntryPoint> {
    let code = strip_comments(language, source);
    match language {
        Language::Python => python_method(&code).or_else(|| python_function(&code)),
        Language::JavaScript => brace_method(&code, &JS_CLASS, &JS_METHOD).or_else(|| javascript_function(&code)),
        Language::Java => brace_method(&code, &JAVA_CLASS, &JAVA_METHOD),
    }
}

/// Split the sentinel line out of program output.
///
/// Returns the remaining output and whether the sentinel was present.
pub fn split_sentinel(stdout: &str) -> (String, bool) {
    let mut found = false;
    let remaining: Vec<&str> = stdout
        .lines()
        .filter(|line| {
            let is_sentinel = line.trim() == NO_OUTPUT_SENTINEL;
            found |= is_sentinel;
            !is_sentinel
        })
        .collect();
    (remaining.join("\n"), found)
}

fn is_candidate_name(name: &str) -> bool {
    name != "main" && !name.starts_with('_') && !KEYWORDS.contains(&name)
}

fn method_entry(name: &str) -> EntryPoint {
    EntryPoint::Method {
        container: SOLUTION_CONTAINER.to_string(),
        name: name.to_string(),
    }
}

fn python_method(code: &str) -> Option<EntryPoint> {
    let mut lines = code.lines().skip_while(|line| !PY_CLASS.is_match(line));
    lines.next()?;

    let mut method_indent: Option<usize> = None;
    for line in lines {
        if line.trim().is_empty() {
            continue;
        }
        if !line.starts_with(char::is_whitespace) {
            break;
        }
        let Some(caps) = PY_METHOD.captures(line) else {
            continue;
        };
        let indent = caps[1].len();
        if *method_indent.get_or_insert(indent) != indent {
            continue;
        }
        if is_candidate_name(&caps[2]) {
            return Some(method_entry(&caps[2]));
        }
    }
    None
}

fn python_function(code: &str) -> Option<EntryPoint> {
    let defs: Vec<(usize, String)> = PY_FUNCTION
        .captures_iter(code)
        .filter_map(|caps| {
            let start = caps.get(0)?.start();
            let name = caps.get(1)?.as_str();
            is_candidate_name(name).then(|| (start, name.to_string()))
        })
        .collect();
    pick_root(code, defs).map(|name| EntryPoint::Function { name })
}

fn javascript_function(code: &str) -> Option<EntryPoint> {
    let mut defs: Vec<(usize, String)> = JS_FUNCTION
        .captures_iter(code)
        .chain(JS_BINDING.captures_iter(code))
        .filter_map(|caps| {
            let start = caps.get(0)?.start();
            let name = caps.get(1)?.as_str();
            is_candidate_name(name).then(|| (start, name.to_string()))
        })
        .collect();
    defs.sort_by_key(|(start, _)| *start);
    pick_root(code, defs).map(|name| EntryPoint::Function { name })
}

/// Choose among top-level definitions: the last one no other definition
/// calls, or the last one defined.
fn pick_root(code: &str, defs: Vec<(usize, String)>) -> Option<String> {
    if defs.len() <= 1 {
        return defs.into_iter().next().map(|(_, name)| name);
    }

    let spans: Vec<(usize, usize)> = defs
        .iter()
        .enumerate()
        .map(|(i, (start, _))| (*start, defs.get(i + 1).map(|(next, _)| *next).unwrap_or(code.len())))
        .collect();

    let called_elsewhere = |index: usize, name: &str| -> bool {
        let Ok(call) = Regex::new(&format!(r"\b{}\s*\(", regex::escape(name))) else {
            return false;
        };
        spans
            .iter()
            .enumerate()
            .filter(|(other, _)| *other != index)
            .any(|(_, (start, end))| call.is_match(&code[*start..*end]))
    };

    let root = defs
        .iter()
        .enumerate()
        .rev()
        .find(|(index, (_, name))| !called_elsewhere(*index, name))
        .map(|(_, (_, name))| name.clone());

    root.or_else(|| defs.last().map(|(_, name)| name.clone()))
}

/// Find the first method declared directly inside `class Solution { ... }`
fn brace_method(code: &str, class: &Regex, method: &Regex) -> Option<EntryPoint> {
    let class_match = class.find(code)?;
    let body = block_body(code, class_match.end() - 1)?;

    top_level_lines(body)
        .into_iter()
        .filter_map(|line| method.captures(line))
        .filter_map(|caps| caps.get(1).map(|m| m.as_str().to_string()))
        .find(|name| is_candidate_name(name) && name != SOLUTION_CONTAINER)
        .map(|name| method_entry(&name))
}

/// Text between the brace at `open` and its matching close brace
fn block_body(code: &str, open: usize) -> Option<&str> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (i, c) in code[open..].char_indices() {
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
            '"' | '\'' | '`' => quote = Some(c),
            '{' => depth += 1,
            '}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(&code[open + 1..open + i]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Lines of a block that start at nesting depth zero
fn top_level_lines(body: &str) -> Vec<&str> {
    let mut depth = 0i32;
    let mut lines = Vec::new();

    for line in body.lines() {
        if depth == 0 {
            lines.push(line);
        }
        for c in line.chars() {
            match c {
                '{' => depth += 1,
                '}' => depth -= 1,
                _ => {}
            }
        }
    }
    lines
}

/// Remove comments so commented-out I/O or functions are not detected.
/// String literals are kept intact.
fn strip_comments(language: Language, source: &str) -> String {
    let hash_comments = language == Language::Python;
    let mut out = String::with_capacity(source.len());
    let mut chars = source.chars().peekable();
    let mut quote: Option<char> = None;

    while let Some(c) = chars.next() {
        if let Some(q) = quote {
            out.push(c);
            if c == '\\' {
                if let Some(next) = chars.next() {
                    out.push(next);
                }
            } else if c == q || c == '\n' {
                quote = None;
            }
            continue;
        }
        match c {
            '"' | '\'' | '`' => {
                quote = Some(c);
                out.push(c);
            }
            '#' if hash_comments => {
                while let Some(&next) = chars.peek() {
                    if next == '\n' {
                        break;
                    }
                    chars.next();
                }
            }
            '/' if !hash_comments && chars.peek() == Some(&'/') => {
                while let Some(&next) = chars.peek() {
                    if next == '\n' {
                        break;
                    }
                    chars.next();
                }
            }
            '/' if !hash_comments && chars.peek() == Some(&'*') => {
                chars.next();
                let mut previous = ' ';
                for next in chars.by_ref() {
                    if next == '\n' {
                        out.push('\n');
                    }
                    if previous == '*' && next == '/' {
                        break;
                    }
                    previous = next;
                }
            }
            other => out.push(other),
        }
    }
    out
}

const PYTHON_PRELUDE: &str = "from typing import *\n\n";

const PYTHON_RUNNER: &str = r#"

import json as __json
import sys as __sys


def __assessor_default(value):
    if isinstance(value, (set, frozenset)):
        try:
            return sorted(value)
        except TypeError:
            return list(value)
    if hasattr(value, "__dict__"):
        return value.__dict__
    return str(value)


def __assessor_main():
    raw = __sys.stdin.read()
    try:
        data = __json.loads(raw)
    except ValueError:
        args = [raw.strip()]
    else:
        if isinstance(data, list):
            args = data
        elif isinstance(data, dict) and len(data) == 1:
            args = [next(iter(data.values()))]
        else:
            args = [data]
    result = __TARGET__(*args)
    print(__json.dumps(result, default=__assessor_default))


if __name__ == "__main__":
    __assessor_main()
"#;

const JAVASCRIPT_RUNNER: &str = r#"

;(function __assessorMain() {
  const raw = require('fs').readFileSync(0, 'utf8');
  let args;
  try {
    const data = JSON.parse(raw);
    if (Array.isArray(data)) {
      args = data;
    } else if (data !== null && typeof data === 'object' && Object.keys(data).length === 1) {
      args = [Object.values(data)[0]];
    } else {
      args = [data];
    }
  } catch (err) {
    args = [raw.trim()];
  }
  Promise.resolve(__TARGET__(...args))
    .then((result) => {
      const plain = result instanceof Set ? [...result] : result instanceof Map ? Object.fromEntries(result) : result;
      const encoded = JSON.stringify(plain);
      console.log(encoded === undefined ? 'null' : encoded);
    })
    .catch((err) => {
      console.error(err && err.stack ? err.stack : String(err));
      process.exitCode = 1;
    });
})();
"#;

const JAVA_IMPORTS: &str = "import java.util.*;\nimport java.lang.reflect.*;\n";

const JAVA_MAIN: &str = r#"
public class Main {
    @SuppressWarnings("unchecked")
    public static void main(String[] args) throws Throwable {
        String raw = new String(System.in.readAllBytes(), java.nio.charset.StandardCharsets.UTF_8);
        List<Object> values = new ArrayList<>();
        try {
            Object data = new AssessorJson(raw).parseDocument();
            if (data instanceof List) {
                values.addAll((List<Object>) data);
            } else if (data instanceof Map && ((Map<?, ?>) data).size() == 1) {
                values.addAll(((Map<String, Object>) data).values());
            } else {
                values.add(data);
            }
        } catch (RuntimeException e) {
            values.clear();
            values.add(raw.trim());
        }

        Method method = null;
        for (Method candidate : __CONTAINER__.class.getDeclaredMethods()) {
            if (candidate.getName().equals("__METHOD__") && candidate.getParameterCount() == values.size()) {
                method = candidate;
                break;
            }
        }
        if (method == null) {
            for (Method candidate : __CONTAINER__.class.getDeclaredMethods()) {
                if (candidate.getName().equals("__METHOD__")) {
                    method = candidate;
                    break;
                }
            }
        }
        if (method == null) {
            throw new IllegalStateException("entry point __METHOD__ not found");
        }
        method.setAccessible(true);

        Class<?>[] types = method.getParameterTypes();
        Object[] call = new Object[types.length];
        for (int i = 0; i < types.length; i++) {
            call[i] = AssessorJson.coerce(i < values.size() ? values.get(i) : null, types[i]);
        }

        Object receiver = Modifier.isStatic(method.getModifiers()) ? null : new __CONTAINER__();
        Object result;
        try {
            result = method.invoke(receiver, call);
        } catch (InvocationTargetException e) {
            throw e.getCause();
        }
        System.out.println(AssessorJson.write(result));
    }
}
"#;

const JAVA_JSON_SUPPORT: &str = r#"
class AssessorJson {
    private final String s;
    private int i;

    AssessorJson(String s) {
        this.s = s;
    }

    Object parseDocument() {
        Object value = parse();
        skip();
        if (i != s.length()) {
            throw new IllegalArgumentException("trailing data");
        }
        return value;
    }

    private void skip() {
        while (i < s.length() && Character.isWhitespace(s.charAt(i))) {
            i++;
        }
    }

    private void expect(char c) {
        if (s.charAt(i++) != c) {
            throw new IllegalArgumentException("expected " + c);
        }
    }

    private Object parse() {
        skip();
        if (i >= s.length()) {
            throw new IllegalArgumentException("unexpected end");
        }
        char c = s.charAt(i);
        if (c == '{') return object();
        if (c == '[') return array();
        if (c == '"') return string();
        if (s.startsWith("true", i)) { i += 4; return Boolean.TRUE; }
        if (s.startsWith("false", i)) { i += 5; return Boolean.FALSE; }
        if (s.startsWith("null", i)) { i += 4; return null; }
        return number();
    }

    private Map<String, Object> object() {
        Map<String, Object> map = new LinkedHashMap<>();
        i++;
        skip();
        if (s.charAt(i) == '}') { i++; return map; }
        while (true) {
            skip();
            String key = string();
            skip();
            expect(':');
            map.put(key, parse());
            skip();
            char c = s.charAt(i++);
            if (c == '}') return map;
            if (c != ',') throw new IllegalArgumentException("expected , or }");
        }
    }

    private List<Object> array() {
        List<Object> list = new ArrayList<>();
        i++;
        skip();
        if (s.charAt(i) == ']') { i++; return list; }
        while (true) {
            list.add(parse());
            skip();
            char c = s.charAt(i++);
            if (c == ']') return list;
            if (c != ',') throw new IllegalArgumentException("expected , or ]");
        }
    }

    private String string() {
        expect('"');
        StringBuilder out = new StringBuilder();
        while (true) {
            char c = s.charAt(i++);
            if (c == '"') return out.toString();
            if (c != '\\') { out.append(c); continue; }
            char e = s.charAt(i++);
            switch (e) {
                case 'n': out.append('\n'); break;
                case 't': out.append('\t'); break;
                case 'r': out.append('\r'); break;
                case 'b': out.append('\b'); break;
                case 'f': out.append('\f'); break;
                case 'u': out.append((char) Integer.parseInt(s.substring(i, i + 4), 16)); i += 4; break;
                default: out.append(e);
            }
        }
    }

    private Object number() {
        int start = i;
        while (i < s.length() && "+-0123456789.eE".indexOf(s.charAt(i)) >= 0) {
            i++;
        }
        String text = s.substring(start, i);
        if (text.isEmpty()) {
            throw new IllegalArgumentException("unexpected character");
        }
        if (text.contains(".") || text.contains("e") || text.contains("E")) {
            return Double.parseDouble(text);
        }
        return Long.parseLong(text);
    }

    static Object coerce(Object value, Class<?> type) {
        if (value == null) {
            return type.isPrimitive() ? primitiveDefault(type) : null;
        }
        if (type == int.class || type == Integer.class) return ((Number) value).intValue();
        if (type == long.class || type == Long.class) return ((Number) value).longValue();
        if (type == double.class || type == Double.class) return ((Number) value).doubleValue();
        if (type == float.class || type == Float.class) return ((Number) value).floatValue();
        if (type == boolean.class || type == Boolean.class) return value;
        if (type == char.class || type == Character.class) return value.toString().charAt(0);
        if (type == String.class) return value instanceof String ? value : write(value);
        if (type == char[].class && value instanceof String) return ((String) value).toCharArray();
        if (type.isArray()) {
            List<?> list = (List<?>) value;
            Class<?> component = type.getComponentType();
            Object array = Array.newInstance(component, list.size());
            for (int k = 0; k < list.size(); k++) {
                Array.set(array, k, coerce(list.get(k), component));
            }
            return array;
        }
        if (value instanceof List && type.isAssignableFrom(ArrayList.class)) {
            return narrow(value);
        }
        return value;
    }

    private static Object narrow(Object value) {
        if (value instanceof Long) {
            long v = (Long) value;
            if (v >= Integer.MIN_VALUE && v <= Integer.MAX_VALUE) return (int) v;
        }
        if (value instanceof List) {
            List<Object> out = new ArrayList<>();
            for (Object item : (List<?>) value) out.add(narrow(item));
            return out;
        }
        return value;
    }

    private static Object primitiveDefault(Class<?> type) {
        if (type == boolean.class) return false;
        if (type == char.class) return '\0';
        if (type == long.class) return 0L;
        if (type == double.class) return 0.0;
        if (type == float.class) return 0.0f;
        return 0;
    }

    static String write(Object value) {
        StringBuilder out = new StringBuilder();
        writeTo(out, value);
        return out.toString();
    }

    private static void writeTo(StringBuilder out, Object value) {
        if (value == null) { out.append("null"); return; }
        if (value instanceof String || value instanceof Character) { quote(out, value.toString()); return; }
        if (value instanceof Double || value instanceof Float) {
            double d = ((Number) value).doubleValue();
            if (Double.isNaN(d) || Double.isInfinite(d)) out.append("null"); else out.append(d);
            return;
        }
        if (value instanceof Number || value instanceof Boolean) { out.append(value); return; }
        if (value.getClass().isArray()) {
            out.append('[');
            int n = Array.getLength(value);
            for (int k = 0; k < n; k++) {
                if (k > 0) out.append(',');
                writeTo(out, Array.get(value, k));
            }
            out.append(']');
            return;
        }
        if (value instanceof Iterable) {
            out.append('[');
            boolean first = true;
            for (Object item : (Iterable<?>) value) {
                if (!first) out.append(',');
                first = false;
                writeTo(out, item);
            }
            out.append(']');
            return;
        }
        if (value instanceof Map) {
            out.append('{');
            boolean first = true;
            for (Map.Entry<?, ?> entry : ((Map<?, ?>) value).entrySet()) {
                if (!first) out.append(',');
                first = false;
                quote(out, String.valueOf(entry.getKey()));
                out.append(':');
                writeTo(out, entry.getValue());
            }
            out.append('}');
            return;
        }
        quote(out, value.toString());
    }

    private static void quote(StringBuilder out, String text) {
        out.append('"');
        for (char c : text.toCharArray()) {
            switch (c) {
                case '"': out.append("\\\""); break;
                case '\\': out.append("\\\\"); break;
                case '\n': out.append("\\n"); break;
                case '\r': out.append("\\r"); break;
                case '\t': out.append("\\t"); break;
                default:
                    if (c < 0x20) out.append(String.format("\\u%04x", (int) c)); else out.append(c);
            }
        }
        out.append('"');
    }
}
"#;

fn call_target(language: Language, entry_point: &EntryPoint) -> String {
    match (language, entry_point) {
        (_, EntryPoint::Function { name }) => name.clone(),
        (Language::JavaScript, EntryPoint::Method { container, name }) => format!("new {}().{}", container, name),
        (_, EntryPoint::Method { container, name }) => format!("{}().{}", container, name),
    }
}

fn python_runner(source: &str, entry_point: &EntryPoint) -> String {
    let runner = PYTHON_RUNNER.replace("__TARGET__", &call_target(Language::Python, entry_point));
    format!("{}{}", python_with_prelude(source.trim_end()), runner)
}

/// Insert the prelude after the module docstring and `__future__` imports,
/// which must stay at the top of the file.
fn python_with_prelude(source: &str) -> String {
    let lines: Vec<&str> = source.lines().collect();
    let header = python_header_len(&lines);
    if header == 0 {
        return format!("{}{}", PYTHON_PRELUDE, source);
    }
    format!(
        "{}\n{}{}",
        lines[..header].join("\n"),
        PYTHON_PRELUDE,
        lines[header..].join("\n")
    )
}

/// Number of leading lines taken by comments, the docstring and `__future__` imports
fn python_header_len(lines: &[&str]) -> usize {
    let mut header = 0;
    let mut statements = 0;
    let mut i = 0;

    while i < lines.len() {
        let trimmed = lines[i].trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            i += 1;
            continue;
        }

        if statements == 0 {
            if let Some(end) = docstring_end(lines, i) {
                i = end + 1;
                header = i;
                statements += 1;
                continue;
            }
        }

        if !PY_FUTURE_IMPORT.is_match(trimmed) {
            break;
        }
        if trimmed.contains('(') && !trimmed.contains(')') {
            while i + 1 < lines.len() && !lines[i].contains(')') {
                i += 1;
            }
        }
        i += 1;
        header = i;
        statements += 1;
    }
    header
}

/// Index of the line closing a triple-quoted string opened at `start`
fn docstring_end(lines: &[&str], start: usize) -> Option<usize> {
    let opening = lines[start].trim().trim_start_matches(['r', 'R', 'u', 'U']);
    let quote = [r#"""""#, "'''"].into_iter().find(|q| opening.starts_with(q))?;

    if opening[quote.len()..].contains(quote) {
        return Some(start);
    }
    (start + 1..lines.len()).find(|&i| lines[i].contains(quote))
}

fn javascript_runner(source: &str, entry_point: &EntryPoint) -> String {
    let runner = JAVASCRIPT_RUNNER.replace("__TARGET__", &call_target(Language::JavaScript, entry_point));
    format!("{}{}", source.trim_end(), runner)
}

fn java_runner(source: &str, entry_point: &EntryPoint) -> String {
    let (container, method) = match entry_point {
        EntryPoint::Method { container, name } => (container.as_str(), name.as_str()),
        EntryPoint::Function { name } => (SOLUTION_CONTAINER, name.as_str()),
    };
    let main = JAVA_MAIN
        .replace("__CONTAINER__", container)
        .replace("__METHOD__", method);
    let (imports, body) = java_split_imports(source);
    format!("{}{}{}\n{}\n{}", JAVA_IMPORTS, imports, main, body, JAVA_JSON_SUPPORT)
}

/// Java's single-file launcher runs the first class, so `Main` must lead and
/// candidate imports must move above it.
fn java_split_imports(source: &str) -> (String, String) {
    let mut imports = String::new();
    let mut body = Vec::new();

    for line in source.lines() {
        let trimmed = line.trim_start();
        if trimmed.starts_with("import ") {
            imports.push_str(trimmed);
            imports.push('\n');
        } else if !trimmed.starts_with("package ") {
            body.push(line);
        }
    }

    let body = JAVA_PUBLIC_TYPE.replace_all(&body.join("\n"), "$1$2").into_owned();
    (imports, rename_candidate_main(body))
}

/// A candidate `class Main` would clash with the generated launcher
fn rename_candidate_main(body: String) -> String {
    if !JAVA_MAIN_CLASS.is_match(&strip_comments(Language::Java, &body)) {
        return body;
    }
    JAVA_MAIN_NAME.replace_all(&body, JAVA_CANDIDATE_MAIN).into_owned()
}

/// The class declaring `static void main`, if the candidate has one
fn java_launcher(body: &str) -> Option<String> {
    let code = strip_comments(Language::Java, body);
    let main_at = JAVA_STATIC_MAIN.find(&code)?.start();
    JAVA_TYPE_DECL
        .captures_iter(&code[..main_at])
        .last()
        .map(|caps| caps[1].to_string())
}

fn sentinel_runner(language: Language, source: &str) -> String {
    match language {
        Language::Python => format!("{}\n\nprint(\"{}\")\n", source.trim_end(), NO_OUTPUT_SENTINEL),
        Language::JavaScript => format!("{}\n\nconsole.log(\"{}\");\n", source.trim_end(), NO_OUTPUT_SENTINEL),
        Language::Java => {
            let (imports, body) = java_split_imports(source);
            let delegate = java_launcher(&body)
                .map(|class| format!("        {}.main(args);\n", class))
                .unwrap_or_default();
            format!(
                "{}public class Main {{\n    public static void main(String[] args) throws Throwable {{\n{}        System.out.println(\"{}\");\n    }}\n}}\n\n{}\n",
                imports, delegate, NO_OUTPUT_SENTINEL, body
            )
        }
    }
}
