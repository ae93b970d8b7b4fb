//! Argument repair: decode a possibly malformed tool-argument payload.
//!
//! Backends do not always emit clean JSON. The payload goes through
//! progressively more permissive stages and the first one that yields an
//! object wins:
//!
//! 1. **Normalize**: trim, unwrap a fenced code block, drop a trailing
//!    stray backslash, cut anything after the last `}`.
//! 2. **Strict**: ordinary JSON, tolerating raw control characters inside
//!    string values.
//! 3. **Literal**: `True`/`False`/`None` become `true`/`false`/`null`, then a
//!    JSON5 parse (single-quoted strings, raw newlines inside strings).
//! 4. **Rescue**: regex extraction of a `path` + `content` pair. Lossy and
//!    only attempted when both keys are present.
//!
//! The literal-token substitution must only run after the strict stage has
//! failed: on valid JSON it would corrupt string values that happen to contain
//! those words.

use regex_lite::Regex;
use serde_json::{Map, Value};
use tracing::{debug, warn};

/// A decoded argument mapping.
pub type ArgumentMap = Map<String, Value>;

/// How many characters of the raw payload an error carries.
pub const PREVIEW_CHARS: usize = 200;

/// Every stage failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Failed to parse arguments: {reason}. Raw input starts with: {preview}")]
pub struct ArgumentParseError {
    /// First [`PREVIEW_CHARS`] characters of the raw payload
    pub preview: String,
    /// Why the most permissive applicable stage gave up
    pub reason: String,
}

/// Which stage produced the mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepairStage {
    Strict,
    Literal,
    Rescue,
}

/// A successful decode and the stage that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Repaired {
    pub arguments: ArgumentMap,
    pub stage: RepairStage,
}

/// Decode `raw` into an argument mapping.
pub fn parse_arguments(raw: &str) -> Result<ArgumentMap, ArgumentParseError> {
    repair(raw).map(|r| r.arguments)
}

/// Decode `raw`, reporting which stage succeeded.
pub fn repair(raw: &str) -> Result<Repaired, ArgumentParseError> {
    let text = normalize(raw);

    if text.is_empty() {
        return Ok(Repaired {
            arguments: Map::new(),
            stage: RepairStage::Strict,
        });
    }

    let strict_err = match decode_strict(&text) {
        Ok(arguments) => {
            return Ok(Repaired {
                arguments,
                stage: RepairStage::Strict,
            });
        }
        Err(e) => e,
    };
    debug!(error = %strict_err, "Strict argument decode failed, trying literal decode");

    let literal_err = match decode_literal(&text) {
        Ok(arguments) => {
            return Ok(Repaired {
                arguments,
                stage: RepairStage::Literal,
            });
        }
        Err(e) => e,
    };

    if let Some(arguments) = rescue_path_content(&text) {
        let path = arguments
            .get("path")
            .and_then(serde_json::Value::as_str)
            .unwrap_or_default();
        warn!(path, "Tool arguments recovered by regex rescue; content may be imprecise");
        return Ok(Repaired {
            arguments,
            stage: RepairStage::Rescue,
        });
    }

    Err(ArgumentParseError {
        preview: raw.chars().take(PREVIEW_CHARS).collect(),
        reason: format!("{strict_err}; {literal_err}"),
    })
}

/// Stage 1.
fn normalize(raw: &str) -> String {
    let mut text = raw.trim();

    if text.contains("```")
        && let (Some(start), Some(end)) = (text.find('{'), text.rfind('}'))
        && start < end
    {
        text = &text[start..=end];
    }

    while let Some(stripped) = text.strip_suffix('\\') {
        text = stripped.trim_end();
    }

    if let Some(end) = text.rfind('}') {
        text = &text[..=end];
    }

    text.to_string()
}

/// Stage 2.
fn decode_strict(text: &str) -> Result<ArgumentMap, String> {
    let value: Value = serde_json::from_str(&escape_raw_controls(text, false))
        .map_err(|e| format!("JSON: {e}"))?;
    into_object(value)
}

/// Stage 3.
fn decode_literal(text: &str) -> Result<ArgumentMap, String> {
    let mut substituted = text.to_string();
    for (literal, json) in [("True", "true"), ("False", "false"), ("None", "null")] {
        if let Ok(re) = Regex::new(&format!(r"\b{literal}\b")) {
            substituted = re.replace_all(&substituted, json).into_owned();
        }
    }

    let value: Value = json5::from_str(&escape_raw_controls(&substituted, true))
        .map_err(|e| format!("literal: {e}"))?;
    into_object(value)
}

/// Stage 4.
fn rescue_path_content(text: &str) -> Option<ArgumentMap> {
    let has_key = |key: &str| text.contains(&format!("\"{key}\"")) || text.contains(&format!("'{key}'"));
    if !has_key("path") || !has_key("content") {
        return None;
    }

    let path = Regex::new(r#"["']path["']\s*:\s*["']([^"']*)["']"#)
        .ok()?
        .captures(text)?
        .get(1)?
        .as_str()
        .to_string();

    // Greedy content capture anchored on the last quote before the closing
    // brace, tried for the key orders seen in practice.
    let content_patterns = [
        r#"(?s)["']content["']\s*:\s*["'](.*)["']\s*,\s*["']append["']\s*:\s*(?:true|false|True|False)\s*\}\s*$"#,
        r#"(?s)["']content["']\s*:\s*["'](.*)["']\s*,\s*["']path["']\s*:"#,
        r#"(?s)["']content["']\s*:\s*["'](.*)["']\s*\}\s*$"#,
    ];
    let content = content_patterns.iter().find_map(|pattern| {
        Regex::new(pattern)
            .ok()?
            .captures(text)?
            .get(1)
            .map(|m| m.as_str().to_string())
    })?;

    let append = Regex::new(r#"["']append["']\s*:\s*(true|false|True|False)"#)
        .ok()
        .and_then(|re| re.captures(text))
        .and_then(|c| c.get(1))
        .is_some_and(|m| m.as_str().eq_ignore_ascii_case("true"));

    let mut arguments = Map::new();
    arguments.insert("path".into(), Value::String(unescape(&path)));
    arguments.insert("content".into(), Value::String(unescape(&content)));
    arguments.insert("append".into(), Value::Bool(append));
    Some(arguments)
}

fn into_object(value: Value) -> Result<ArgumentMap, String> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(format!("expected an object, got {}", type_name(&other))),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Escape raw control characters that appear inside string literals.
/// Text outside strings is left alone.
fn escape_raw_controls(text: &str, single_quotes: bool) -> String {
    let mut out = String::with_capacity(text.len());
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for ch in text.chars() {
        let Some(q) = quote else {
            if ch == '"' || (single_quotes && ch == '\'') {
                quote = Some(ch);
            }
            out.push(ch);
            continue;
        };

        if escaped {
            escaped = false;
            out.push(ch);
            continue;
        }

        match ch {
            '\\' => {
                escaped = true;
                out.push(ch);
            }
            c if c == q => {
                quote = None;
                out.push(c);
            }
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }

    out
}

/// Best-effort decoding of backslash escapes in a rescued string.
fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('"') => out.push('"'),
            Some('\'') => out.push('\''),
            Some('\\') => out.push('\\'),
            Some('/') => out.push('/'),
            Some('u') => {
                let hex: String = chars.clone().take(4).collect();
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    Some(decoded) if hex.len() == 4 => {
                        out.push(decoded);
                        for _ in 0..4 {
                            chars.next();
                        }
                    }
                    _ => out.push_str("\\u"),
                }
            }
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(v: Value) -> ArgumentMap {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn valid_json_passes_straight_through() {
        let raw = r#"{"command": "ls -la", "background": false}"#;
        let repaired = repair(raw).unwrap();
        assert_eq!(repaired.stage, RepairStage::Strict);
        assert_eq!(
            repaired.arguments,
            serde_json::from_str::<ArgumentMap>(raw).unwrap()
        );
    }

    #[test]
    fn strict_stage_keeps_literal_words_inside_strings() {
        let raw = r#"{"content": "None of this is True or False", "path": "a.txt"}"#;
        let args = parse_arguments(raw).unwrap();
        assert_eq!(args["content"], "None of this is True or False");
    }

    #[test]
    fn fenced_payload_matches_unfenced() {
        let plain = r#"{"path": "src/lib.rs", "limit": 20}"#;
        let fenced = format!("```json\n{plain}\n```");
        assert_eq!(parse_arguments(&fenced).unwrap(), parse_arguments(plain).unwrap());
    }

    #[test]
    fn trailing_backslash_is_ignored() {
        let plain = r#"{"seconds": 30}"#;
        let with_slash = format!("{plain}\\");
        assert_eq!(parse_arguments(&with_slash).unwrap(), parse_arguments(plain).unwrap());
    }

    #[test]
    fn garbage_after_last_brace_is_dropped() {
        let args = parse_arguments(r#"{"skill": "pdf"} <|end|>"#).unwrap();
        assert_eq!(args, obj(json!({"skill": "pdf"})));
    }

    #[test]
    fn raw_newline_in_double_quoted_string_is_tolerated() {
        let raw = "{\"path\": \"a.py\", \"content\": \"import os\nprint(1)\"}";
        let repaired = repair(raw).unwrap();
        assert_eq!(repaired.stage, RepairStage::Strict);
        assert_eq!(repaired.arguments["content"], "import os\nprint(1)");
    }

    #[test]
    fn single_quotes_and_raw_newline_recovered_by_literal_stage() {
        let raw = "{'path': 'notes.txt', 'content': 'line one\nline two', 'append': True}";
        let repaired = repair(raw).unwrap();
        assert_eq!(repaired.stage, RepairStage::Literal);
        assert_eq!(repaired.arguments["path"], "notes.txt");
        assert_eq!(repaired.arguments["content"], "line one\nline two");
        assert_eq!(repaired.arguments["append"], true);
    }

    #[test]
    fn python_none_becomes_null() {
        let repaired = repair("{'path': 'x', 'limit': None}").unwrap();
        assert_eq!(repaired.stage, RepairStage::Literal);
        assert_eq!(repaired.arguments["limit"], Value::Null);
    }

    #[test]
    fn rescue_extracts_path_and_content_with_unbalanced_quotes() {
        let raw = r#"{"path": "out.html", "content": "<a href="x">hi</a>\nbye"}"#;
        let repaired = repair(raw).unwrap();
        assert_eq!(repaired.stage, RepairStage::Rescue);
        assert_eq!(repaired.arguments["path"], "out.html");
        assert_eq!(repaired.arguments["content"], "<a href=\"x\">hi</a>\nbye");
        assert_eq!(repaired.arguments["append"], false);
    }

    #[test]
    fn rescue_reads_explicit_append_flag() {
        let raw = r#"{"path": "log.txt", "content": "say "hi"", "append": true}"#;
        let repaired = repair(raw).unwrap();
        assert_eq!(repaired.stage, RepairStage::Rescue);
        assert_eq!(repaired.arguments["content"], "say \"hi\"");
        assert_eq!(repaired.arguments["append"], true);
    }

    #[test]
    fn rescue_not_attempted_without_both_keys() {
        let err = parse_arguments(r#"{"command": "echo "broken""#).unwrap_err();
        assert!(err.preview.starts_with(r#"{"command""#));
    }

    #[test]
    fn error_preview_is_truncated() {
        let raw = format!("{{\"x\": {}", "y".repeat(500));
        let err = parse_arguments(&raw).unwrap_err();
        assert_eq!(err.preview.chars().count(), PREVIEW_CHARS);
        assert!(err.to_string().contains("Raw input starts with"));
    }

    #[test]
    fn non_object_payload_is_an_error() {
        assert!(parse_arguments("[1, 2, 3]").is_err());
        assert!(parse_arguments("\"just a string\"").is_err());
    }

    #[test]
    fn empty_payload_is_an_empty_mapping() {
        assert!(parse_arguments("   ").unwrap().is_empty());
    }

    #[test]
    fn escape_leaves_structure_whitespace_alone() {
        let text = "{\n  \"a\": \"b\tc\"\n}";
        assert_eq!(escape_raw_controls(text, false), "{\n  \"a\": \"b\\tc\"\n}");
    }

    #[test]
    fn unescape_handles_common_sequences() {
        assert_eq!(unescape(r#"a\nb\t\"c\"\\d\u0041"#), "a\nb\t\"c\"\\dA");
        assert_eq!(unescape(r"\q"), r"\q");
    }
}
