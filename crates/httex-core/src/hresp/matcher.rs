//! The body matcher: compiles an expected body containing wildcard
//! placeholders into a single anchored regular expression and matches the
//! actual body against it.

use std::cell::RefCell;
use std::collections::HashMap;

use regex::{Regex, RegexBuilder};

use crate::error::ValidationError;

const WILDCARD_MARKERS: &[&str] = &["{{$regexp", "{{$anyGuid}}", "{{$anyTimestamp}}", "{{$anyDatetime", "{{$any}}"];

fn normalize(s: &str) -> String {
    s.replace("\r\n", "\n").trim().to_string()
}

fn has_wildcards(body: &str) -> bool {
    WILDCARD_MARKERS.iter().any(|marker| body.contains(marker))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Regexp,
    AnyGuid,
    AnyTimestamp,
    AnyDatetimeArg,
    AnyDatetimeNoArg,
    Any,
}

/// Classifies the wildcard placeholder kind (if any) starting exactly at
/// `idx`, where `text[idx..]` begins with `{{$`. Checks are ordered so that
/// longer, more specific markers win over shorter prefixes.
fn classify_at(text: &str, idx: usize) -> Option<(Kind, usize, Option<String>)> {
    let rest = &text[idx..];
    if rest.starts_with("{{$regexp") {
        let after = idx + "{{$regexp".len();
        let close = text[after..].find("}}")? + after;
        let mut pattern = text[after..close].trim().to_string();
        if pattern.len() >= 2 && pattern.starts_with('`') && pattern.ends_with('`') {
            pattern = pattern[1..pattern.len() - 1].to_string();
        }
        return Some((Kind::Regexp, close + 2, Some(pattern)));
    }
    if rest.starts_with("{{$anyGuid}}") {
        return Some((Kind::AnyGuid, idx + "{{$anyGuid}}".len(), None));
    }
    if rest.starts_with("{{$anyTimestamp}}") {
        return Some((Kind::AnyTimestamp, idx + "{{$anyTimestamp}}".len(), None));
    }
    if rest.starts_with("{{$anyDatetime") {
        let after = idx + "{{$anyDatetime".len();
        let close = text[after..].find("}}")? + after;
        let format = text[after..close].trim().to_string();
        let kind = if format.is_empty() { Kind::AnyDatetimeNoArg } else { Kind::AnyDatetimeArg };
        return Some((kind, close + 2, Some(format)));
    }
    if rest.starts_with("{{$any}}") {
        return Some((Kind::Any, idx + "{{$any}}".len(), None));
    }
    None
}

fn is_quoted(s: &str) -> bool {
    let s = s.trim();
    s.len() >= 2 && ((s.starts_with('\'') && s.ends_with('\'')) || (s.starts_with('"') && s.ends_with('"')))
}

fn strip_quotes(s: &str) -> String {
    let s = s.trim();
    if is_quoted(s) {
        s[1..s.len() - 1].to_string()
    } else {
        s.to_string()
    }
}

/// A deliberately non-matching pattern, used whenever `$anyDatetime`'s
/// argument is missing or malformed, guaranteeing a clean mismatch.
const NEVER_MATCHES: &str = r"\z.\A";

fn datetime_pattern(format: &str) -> String {
    match strip_quotes(format).as_str() {
        "rfc1123" => r"[A-Za-z]{3}, \d{2} [A-Za-z]{3} \d{4} \d{2}:\d{2}:\d{2} [A-Za-z]+".to_string(),
        "iso8601" => r"\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}(\.\d+)?(Z|[+-]\d{2}:\d{2})".to_string(),
        custom if is_quoted(format) && !custom.is_empty() => r"[0-9A-Za-z:,./ +-]+".to_string(),
        _ => NEVER_MATCHES.to_string(),
    }
}

fn fragment_for(kind: Kind, payload: Option<&str>) -> String {
    match kind {
        Kind::Regexp => format!("({})", payload.unwrap_or("")),
        Kind::AnyGuid => "([a-fA-F0-9]{8}-[a-fA-F0-9]{4}-[a-fA-F0-9]{4}-[a-fA-F0-9]{4}-[a-fA-F0-9]{12})".to_string(),
        Kind::AnyTimestamp => r"(\d+)".to_string(),
        Kind::AnyDatetimeArg => datetime_pattern(payload.unwrap_or("")),
        Kind::AnyDatetimeNoArg => NEVER_MATCHES.to_string(),
        Kind::Any => "((?s).*?)".to_string(),
    }
}

/// Compiles `expected` into a single anchored regex, returning the regex and
/// its source pattern text (the latter for diagnostics).
pub fn compile_pattern(expected: &str) -> Result<(Regex, String), ValidationError> {
    let mut pattern = String::from("^");
    let mut cursor = 0usize;
    loop {
        match expected[cursor..].find("{{$") {
            Some(rel) => {
                let idx = cursor + rel;
                match classify_at(expected, idx) {
                    Some((kind, end, payload)) => {
                        pattern.push_str(&regex::escape(&expected[cursor..idx]));
                        pattern.push_str(&fragment_for(kind, payload.as_deref()));
                        cursor = end;
                    }
                    None => {
                        pattern.push_str(&regex::escape(&expected[cursor..idx + 3]));
                        cursor = idx + 3;
                    }
                }
            }
            None => {
                pattern.push_str(&regex::escape(&expected[cursor..]));
                break;
            }
        }
    }
    pattern.push('$');

    let regex = RegexBuilder::new(&pattern)
        .dot_matches_new_line(false)
        .build()
        .map_err(|e| ValidationError::RegexCompile { pattern: pattern.clone(), message: e.to_string() })?;
    Ok((regex, pattern))
}

fn unified_diff(expected: &str, actual: &str) -> String {
    let expected_lines: Vec<&str> = expected.lines().collect();
    let actual_lines: Vec<&str> = actual.lines().collect();
    let mut diff = String::new();
    for i in 0..expected_lines.len().max(actual_lines.len()) {
        match (expected_lines.get(i), actual_lines.get(i)) {
            (Some(e), Some(a)) if e == a => {}
            (Some(e), Some(a)) => {
                diff.push_str(&format!("-{e}\n+{a}\n"));
            }
            (Some(e), None) => diff.push_str(&format!("-{e}\n")),
            (None, Some(a)) => diff.push_str(&format!("+{a}\n")),
            (None, None) => {}
        }
    }
    diff.trim_end().to_string()
}

/// Matches `actual` against `expected`, taking either the placeholder-free
/// exact-equality path or the compiled-regex path.
pub fn match_body(expected: &str, actual: &str) -> Result<(), ValidationError> {
    BodyMatcher::new().match_body(expected, actual)
}

/// Owns the regex cache used when matching expected bodies against actual
/// ones, keyed by the (normalized) expected-body pattern text. A fresh
/// instance is cheap; the cache only pays off when the same `.hresp` body
/// is matched against more than one actual response during a single
/// `validate` call.
#[derive(Debug, Default)]
pub struct BodyMatcher {
    cache: RefCell<HashMap<String, (Regex, String)>>,
}

impl BodyMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    fn compile_cached(&self, expected: &str) -> Result<(Regex, String), ValidationError> {
        if let Some(hit) = self.cache.borrow().get(expected) {
            return Ok(hit.clone());
        }
        let compiled = compile_pattern(expected)?;
        self.cache.borrow_mut().insert(expected.to_string(), compiled.clone());
        Ok(compiled)
    }

    /// Matches `actual` against `expected`, taking either the
    /// placeholder-free exact-equality path or the compiled-regex path.
    pub fn match_body(&self, expected: &str, actual: &str) -> Result<(), ValidationError> {
        let expected = normalize(expected);
        let actual = normalize(actual);

        if !has_wildcards(&expected) {
            return if expected == actual {
                Ok(())
            } else {
                Err(ValidationError::BodyMismatch {
                    diff: unified_diff(&expected, &actual),
                    compiled_regex: None,
                })
            };
        }

        let (regex, pattern) = self.compile_cached(&expected)?;
        if regex.is_match(&actual) {
            Ok(())
        } else {
            Err(ValidationError::BodyMismatch {
                diff: unified_diff(&expected, &actual),
                compiled_regex: Some(pattern),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_bodies_match_after_crlf_and_trim_normalization() {
        assert!(match_body("hello\r\nworld", "  hello\nworld  ").is_ok());
    }

    #[test]
    fn literal_body_mismatch_produces_diff() {
        let err = match_body("hello", "goodbye").unwrap_err();
        match err {
            ValidationError::BodyMismatch { compiled_regex, .. } => assert!(compiled_regex.is_none()),
            _ => panic!("expected body mismatch"),
        }
    }

    #[test]
    fn any_guid_matches_a_real_guid() {
        let expected = r#"{"id":"{{$anyGuid}}"}"#;
        let actual = r#"{"id":"123e4567-e89b-12d3-a456-426614174000"}"#;
        assert!(match_body(expected, actual).is_ok());
    }

    #[test]
    fn any_datetime_iso8601_matches_and_rejects() {
        let expected = r#"{"at":"{{$anyDatetime 'iso8601'}}"}"#;
        assert!(match_body(expected, r#"{"at":"2023-03-15T12:00:00Z"}"#).is_ok());
        let err = match_body(expected, r#"{"at":"not-a-date"}"#).unwrap_err();
        match err {
            ValidationError::BodyMismatch { compiled_regex, .. } => assert!(compiled_regex.is_some()),
            _ => panic!("expected body mismatch"),
        }
    }

    #[test]
    fn bare_any_datetime_never_matches() {
        let expected = "{{$anyDatetime}}";
        assert!(match_body(expected, "2023-03-15T12:00:00Z").is_err());
    }

    #[test]
    fn any_wildcard_matches_arbitrary_text() {
        assert!(match_body("prefix {{$any}} suffix", "prefix anything goes here suffix").is_ok());
    }

    #[test]
    fn custom_regexp_wildcard_is_embedded_verbatim() {
        let expected = "count: {{$regexp `\\d+`}}";
        assert!(match_body(expected, "count: 42").is_ok());
        assert!(match_body(expected, "count: abc").is_err());
    }

    #[test]
    fn invalid_regexp_wildcard_reports_compile_failure() {
        let err = compile_pattern("bad: {{$regexp `(`}}").unwrap_err();
        assert!(matches!(err, ValidationError::RegexCompile { .. }));
    }

    #[test]
    fn tie_break_prefers_regexp_over_any() {
        // {{$regexp ...}} must win even though its text also contains "{{$any"-like bytes.
        let (_, pattern) = compile_pattern("{{$regexp `[a-z]+`}}").unwrap();
        assert!(pattern.contains("[a-z]+"));
    }

    #[test]
    fn body_matcher_reuses_cached_pattern_across_calls() {
        let matcher = BodyMatcher::new();
        let expected = "count: {{$regexp `\\d+`}}";
        assert!(matcher.match_body(expected, "count: 1").is_ok());
        assert_eq!(matcher.cache.borrow().len(), 1);
        assert!(matcher.match_body(expected, "count: 2").is_ok());
        assert_eq!(matcher.cache.borrow().len(), 1);
    }
}
