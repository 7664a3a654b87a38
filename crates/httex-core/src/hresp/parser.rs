//! Pre-extracts `@` definitions from a `.hresp` file, then parses the
//! (already variable-resolved) remainder into [`ExpectedResponse`] records.

use std::collections::HashMap;
use std::path::Path;

use crate::error::ParseError;
use crate::headers::{is_valid_header_name, HeaderMap};
use crate::hresp::model::ExpectedResponse;

/// Scans raw `.hresp` content line by line, plucking `@IDENT = VALUE`
/// definitions into a map and stripping those lines from the content.
/// Lines starting with `@` that are not well-formed definitions are simply
/// dropped, without error (unlike the request-file parser's stricter
/// `@`-definition grammar).
pub fn extract_definitions(content: &str) -> (HashMap<String, String>, String) {
    let mut defs = HashMap::new();
    let mut kept_lines = Vec::new();
    for line in content.lines() {
        let trimmed = line.trim();
        if let Some(rest) = trimmed.strip_prefix('@') {
            if let Some((name, value)) = rest.split_once('=') {
                let name = name.trim();
                if !name.is_empty() {
                    defs.insert(name.to_string(), value.trim().to_string());
                }
            }
            continue;
        }
        kept_lines.push(line);
    }
    (defs, kept_lines.join("\n"))
}

#[derive(Debug, Default)]
struct Building {
    status_code: Option<u16>,
    status_line: Option<String>,
    headers: HeaderMap,
    body_lines: Vec<String>,
    body_started: bool,
    has_status: bool,
}

/// Parses fully-resolved `.hresp` content into a list of expected
/// responses.
pub fn parse_responses(content: &str, file_path: &Path) -> Result<Vec<ExpectedResponse>, ParseError> {
    let mut responses = Vec::new();
    let mut current: Option<Building> = None;

    for (idx, raw_line) in content.lines().enumerate() {
        let line_number = idx + 1;
        let line = raw_line.trim_end_matches('\r');
        let trimmed = line.trim();

        if let Some(building) = &current {
            if building.body_started && !trimmed.starts_with("###") {
                current.as_mut().unwrap().body_lines.push(line.to_string());
                continue;
            }
        }

        if trimmed.starts_with("###") {
            finalize(current.take(), &mut responses);
            continue;
        }

        if trimmed.is_empty() {
            if let Some(building) = current.as_mut() {
                if building.has_status && !building.body_started {
                    building.body_started = true;
                }
            }
            continue;
        }

        if trimmed.starts_with('#') || trimmed.starts_with("//") {
            continue;
        }

        let building = current.get_or_insert_with(Building::default);
        if !building.has_status {
            let (code, status_line) = parse_status_line(trimmed, file_path, line_number)?;
            building.status_code = Some(code);
            building.status_line = Some(status_line);
            building.has_status = true;
        } else {
            let Some((name, value)) = trimmed.split_once(':') else {
                return Err(ParseError::new(file_path, line_number, format!("malformed header line '{trimmed}'")));
            };
            let name = name.trim();
            let value = value.trim();
            if !is_valid_header_name(name) {
                return Err(ParseError::new(file_path, line_number, format!("malformed header line '{trimmed}'")));
            }
            building.headers.insert(name, value);
        }
    }

    finalize(current, &mut responses);
    Ok(responses)
}

fn parse_status_line(line: &str, file_path: &Path, line_number: usize) -> Result<(u16, String), ParseError> {
    let mut parts = line.split_whitespace();
    let version = parts
        .next()
        .ok_or_else(|| ParseError::new(file_path, line_number, "malformed status line: empty"))?;
    if !version.starts_with("HTTP/") {
        return Err(ParseError::new(
            file_path,
            line_number,
            format!("malformed status line: expected HTTP version, got '{version}'"),
        ));
    }
    let code_str = parts
        .next()
        .ok_or_else(|| ParseError::new(file_path, line_number, "malformed status line: missing status code"))?;
    let code: u16 = code_str
        .parse()
        .map_err(|_| ParseError::new(file_path, line_number, format!("malformed status line: invalid status code '{code_str}'")))?;
    let reason: Vec<&str> = parts.collect();
    let status_line = if reason.is_empty() { code.to_string() } else { format!("{code} {}", reason.join(" ")) };
    Ok((code, status_line))
}

fn finalize(building: Option<Building>, out: &mut Vec<ExpectedResponse>) {
    let Some(building) = building else { return };
    if !building.has_status && building.headers.is_empty() && building.body_lines.is_empty() {
        return;
    }
    let body = building.body_started.then(|| building.body_lines.join("\n").trim_end().to_string());
    out.push(ExpectedResponse {
        status_code: building.status_code,
        status_line: building.status_line,
        headers: building.headers,
        body,
    });
}
