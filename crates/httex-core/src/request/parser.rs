//! A line-oriented, explicit state machine that partitions a request file
//! into [`Request`] records, resolving `@name = value` definitions at parse
//! time via the variable resolver.

use std::collections::HashMap;
use std::path::Path;

use crate::error::ParseError;
use crate::headers::{is_valid_header_name, HeaderMap};
use crate::request::model::{Encoding, ExternalFileRef, HttpMethod, Request};
use crate::sources::EnvGetter;
use crate::vars::context::ResolveContext;
use crate::vars::resolver;
use crate::vars::system::RequestScope;

/// External collaborators needed to resolve `@` definitions immediately at
/// parse time.
pub struct ParseInputs<'a> {
    pub programmatic: &'a HashMap<String, String>,
    pub environment_overlay: &'a HashMap<String, String>,
    pub os_env: &'a dyn EnvGetter,
    pub dotenv: &'a HashMap<String, String>,
}

pub struct ParsedFile {
    pub requests: Vec<Request>,
    pub file_scoped: HashMap<String, String>,
}

#[derive(Debug, Default)]
struct Building {
    name: Option<String>,
    method: Option<HttpMethod>,
    raw_url: Option<String>,
    http_version: Option<String>,
    headers: HeaderMap,
    body_lines: Vec<String>,
    no_redirect: bool,
    body_started: bool,
    start_line: usize,
}

pub fn parse(content: &str, file_path: &Path, inputs: &ParseInputs) -> Result<ParsedFile, ParseError> {
    let mut file_scoped: HashMap<String, String> = HashMap::new();
    let mut requests = Vec::new();
    let mut current: Option<Building> = None;
    let mut pending_name: Option<String> = None;
    let mut pending_no_redirect = false;

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

        if let Some(rest) = trimmed.strip_prefix("###") {
            finalize(current.take(), &file_scoped, file_path, &mut requests);
            let name = rest.trim();
            pending_name = (!name.is_empty()).then(|| name.to_string());
            pending_no_redirect = false;
            continue;
        }

        if trimmed.starts_with('#') || trimmed.starts_with("//") {
            apply_directive(trimmed, &mut current, &mut pending_name, &mut pending_no_redirect);
            continue;
        }

        if trimmed.is_empty() {
            if let Some(building) = current.as_mut() {
                if building.method.is_some() && !building.body_started {
                    building.body_started = true;
                }
            }
            continue;
        }

        if let Some(rest) = trimmed.strip_prefix('@') {
            let Some((name, value)) = rest.split_once('=') else {
                return Err(ParseError::new(file_path, line_number, "malformed variable definition, expected '@name = value'"));
            };
            let name = name.trim();
            if name.is_empty() {
                return Err(ParseError::new(file_path, line_number, "variable name cannot be empty in definition"));
            }
            let scope = RequestScope::new();
            let ctx = ResolveContext {
                programmatic: inputs.programmatic,
                file_scoped: &file_scoped,
                environment_overlay: inputs.environment_overlay,
                os_env: inputs.os_env,
                dotenv: inputs.dotenv,
                system: &scope,
            };
            let resolved = resolver::resolve(value.trim(), &ctx);
            file_scoped.insert(name.to_string(), resolved);
            continue;
        }

        let building_exists = current.as_ref().map(|b| b.method.is_some()).unwrap_or(false);
        if !building_exists {
            // A trailing `### Name` on the same line closes the request
            // immediately (no body) and seeds the next block's name.
            let (line_for_request, trailing_separator_name) = match trimmed.split_once("###") {
                Some((head, tail)) => (head.trim(), Some(tail.trim().to_string())),
                None => (trimmed, None),
            };
            let building = current.get_or_insert_with(|| Building {
                name: pending_name.take(),
                no_redirect: pending_no_redirect,
                start_line: line_number,
                ..Building::default()
            });
            pending_no_redirect = false;
            parse_request_line_tokens(line_for_request, file_path, line_number, building)?;
            if let Some(name_after) = trailing_separator_name {
                finalize(current.take(), &file_scoped, file_path, &mut requests);
                pending_name = (!name_after.is_empty()).then_some(name_after);
                pending_no_redirect = false;
            }
            continue;
        }

        let building = current.as_mut().expect("current request must exist once method is set");
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

    finalize(current, &file_scoped, file_path, &mut requests);

    Ok(ParsedFile { requests, file_scoped })
}

fn apply_directive(comment: &str, current: &mut Option<Building>, pending_name: &mut Option<String>, pending_no_redirect: &mut bool) {
    let body = comment.trim_start_matches('#').trim_start_matches('/').trim();
    if let Some(name) = body.strip_prefix("@name ") {
        let name = name.trim().to_string();
        match current {
            Some(building) => building.name = Some(name),
            None => *pending_name = Some(name),
        }
    } else if body == "@no-redirect" {
        match current {
            Some(building) => building.no_redirect = true,
            None => *pending_no_redirect = true,
        }
    }
}

fn parse_request_line_tokens(line: &str, file_path: &Path, line_number: usize, building: &mut Building) -> Result<(), ParseError> {
    let mut tokens = line.split_whitespace();
    let method_tok = tokens
        .next()
        .ok_or_else(|| ParseError::new(file_path, line_number, "malformed request line: missing method"))?;
    let method = HttpMethod::parse(method_tok)
        .ok_or_else(|| ParseError::new(file_path, line_number, format!("invalid method '{method_tok}'")))?;
    let url = tokens
        .next()
        .ok_or_else(|| ParseError::new(file_path, line_number, "malformed request line: missing URL"))?;
    let version = tokens.next();
    if let Some(v) = version {
        if !v.starts_with("HTTP/") {
            return Err(ParseError::new(file_path, line_number, format!("malformed request line: unexpected token '{v}'")));
        }
    }
    if tokens.next().is_some() {
        return Err(ParseError::new(file_path, line_number, "malformed request line: too many tokens"));
    }

    building.method = Some(method);
    building.raw_url = Some(url.to_string());
    building.http_version = version.map(str::to_string);
    Ok(())
}

fn parse_external_ref(body: &str) -> Option<ExternalFileRef> {
    let body = body.trim();
    if let Some(rest) = body.strip_prefix("<@") {
        if rest.starts_with(char::is_whitespace) {
            let path = rest.trim_start();
            return (!path.is_empty()).then(|| ExternalFileRef {
                path: path.to_string(),
                encoding: None,
                expand_variables: true,
            });
        }
        let mut it = rest.splitn(2, char::is_whitespace);
        let first_tok = it.next().unwrap_or("");
        let remainder = it.next().map(str::trim_start).unwrap_or("");
        if let Some(encoding) = Encoding::parse(first_tok) {
            if !remainder.is_empty() {
                return Some(ExternalFileRef {
                    path: remainder.to_string(),
                    encoding: Some(encoding),
                    expand_variables: true,
                });
            }
        }
        let path = rest.trim_start();
        return (!path.is_empty()).then(|| ExternalFileRef {
            path: path.to_string(),
            encoding: None,
            expand_variables: true,
        });
    }
    if let Some(rest) = body.strip_prefix('<') {
        let path = rest.trim_start();
        return (!path.is_empty()).then(|| ExternalFileRef {
            path: path.to_string(),
            encoding: None,
            expand_variables: false,
        });
    }
    None
}

fn finalize(building: Option<Building>, file_scoped: &HashMap<String, String>, file_path: &Path, out: &mut Vec<Request>) {
    let Some(building) = building else { return };

    let raw_body = building.body_lines.join("\n").trim_end().to_string();
    let has_method_and_url = building.method.is_some() && building.raw_url.is_some();
    if !has_method_and_url && raw_body.is_empty() {
        return;
    }

    let external_file_ref = if !raw_body.contains('\n') { parse_external_ref(&raw_body) } else { None };

    out.push(Request {
        name: building.name,
        method: building.method.unwrap_or(HttpMethod::Get),
        raw_url: building.raw_url.unwrap_or_default(),
        http_version: building.http_version,
        headers: building.headers,
        raw_body,
        external_file_ref,
        active_variables: file_scoped.clone(),
        no_redirect: building.no_redirect,
        file_path: file_path.to_path_buf(),
        line_number: building.start_line,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::ProcessEnv;

    fn inputs<'a>(
        programmatic: &'a HashMap<String, String>,
        environment_overlay: &'a HashMap<String, String>,
        dotenv: &'a HashMap<String, String>,
    ) -> ParseInputs<'a> {
        ParseInputs {
            programmatic,
            environment_overlay,
            os_env: &ProcessEnv,
            dotenv,
        }
    }

    #[test]
    fn simple_get_request() {
        let empty = HashMap::new();
        let content = "GET https://example.com/api/users\nAccept: application/json\n";
        let parsed = parse(content, Path::new("req.http"), &inputs(&empty, &empty, &empty)).unwrap();
        assert_eq!(parsed.requests.len(), 1);
        let req = &parsed.requests[0];
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.raw_url, "https://example.com/api/users");
        assert_eq!(req.headers.get_first("Accept"), Some("application/json"));
        assert_eq!(req.raw_body, "");
    }

    #[test]
    fn separator_carries_name_into_next_request() {
        let empty = HashMap::new();
        let content = "### Login\nPOST https://example.com/login\n";
        let parsed = parse(content, Path::new("req.http"), &inputs(&empty, &empty, &empty)).unwrap();
        assert_eq!(parsed.requests[0].name.as_deref(), Some("Login"));
    }

    #[test]
    fn name_directive_overrides_separator_name() {
        let empty = HashMap::new();
        let content = "### FromSeparator\n# @name FromDirective\nGET https://example.com\n";
        let parsed = parse(content, Path::new("req.http"), &inputs(&empty, &empty, &empty)).unwrap();
        assert_eq!(parsed.requests[0].name.as_deref(), Some("FromDirective"));
    }

    #[test]
    fn no_redirect_directive_is_captured() {
        let empty = HashMap::new();
        let content = "// @no-redirect\nGET https://example.com\n";
        let parsed = parse(content, Path::new("req.http"), &inputs(&empty, &empty, &empty)).unwrap();
        assert!(parsed.requests[0].no_redirect);
    }

    #[test]
    fn file_variable_precedence_over_environment() {
        let empty = HashMap::new();
        let environment_overlay = HashMap::from([("host".to_string(), "http://env.example".to_string())]);
        let content = "@host = http://srv.local\n\nGET {{host}}/p\n";
        let parsed = parse(content, Path::new("req.http"), &inputs(&empty, &environment_overlay, &empty)).unwrap();
        assert_eq!(parsed.file_scoped.get("host"), Some(&"http://srv.local".to_string()));
    }

    #[test]
    fn malformed_variable_definition_is_an_error() {
        let empty = HashMap::new();
        let content = "@=value\nGET https://example.com\n";
        let err = parse(content, Path::new("req.http"), &inputs(&empty, &empty, &empty)).unwrap_err();
        assert!(err.reason.contains("variable name cannot be empty in definition"));
    }

    #[test]
    fn empty_blocks_are_discarded_without_error() {
        let empty = HashMap::new();
        let content = "### First\n# just a comment\n### Second\nGET https://example.com\n";
        let parsed = parse(content, Path::new("req.http"), &inputs(&empty, &empty, &empty)).unwrap();
        assert_eq!(parsed.requests.len(), 1);
        assert_eq!(parsed.requests[0].name.as_deref(), Some("Second"));
    }

    #[test]
    fn active_variables_is_a_snapshot_not_mutated_later() {
        let empty = HashMap::new();
        let content = "@a = one\n\nGET https://example.com/first\n\n### \n@a = two\n\nGET https://example.com/second\n";
        let parsed = parse(content, Path::new("req.http"), &inputs(&empty, &empty, &empty)).unwrap();
        assert_eq!(parsed.requests[0].active_variables.get("a"), Some(&"one".to_string()));
        assert_eq!(parsed.requests[1].active_variables.get("a"), Some(&"two".to_string()));
    }

    #[test]
    fn trailing_separator_on_request_line_closes_request_with_no_body() {
        let empty = HashMap::new();
        let content = "GET https://example.com/a ### Next\nPOST https://example.com/b\n";
        let parsed = parse(content, Path::new("req.http"), &inputs(&empty, &empty, &empty)).unwrap();
        assert_eq!(parsed.requests.len(), 2);
        assert_eq!(parsed.requests[0].raw_url, "https://example.com/a");
        assert_eq!(parsed.requests[1].name.as_deref(), Some("Next"));
    }

    #[test]
    fn external_file_reference_without_expansion() {
        let empty = HashMap::new();
        let content = "POST https://example.com/upload\nContent-Type: application/json\n\n< ./payload.json\n";
        let parsed = parse(content, Path::new("req.http"), &inputs(&empty, &empty, &empty)).unwrap();
        let ext = parsed.requests[0].external_file_ref.as_ref().unwrap();
        assert_eq!(ext.path, "./payload.json");
        assert!(!ext.expand_variables);
        assert!(ext.encoding.is_none());
    }

    #[test]
    fn external_file_reference_survives_a_trailing_blank_line() {
        let empty = HashMap::new();
        let content = "POST https://example.com/upload\n\n< ./payload.json\n\n### Next\nGET https://example.com\n";
        let parsed = parse(content, Path::new("req.http"), &inputs(&empty, &empty, &empty)).unwrap();
        let ext = parsed.requests[0].external_file_ref.as_ref().unwrap();
        assert_eq!(ext.path, "./payload.json");
        assert!(!ext.expand_variables);
    }

    #[test]
    fn external_file_reference_with_expansion_and_encoding() {
        let empty = HashMap::new();
        let content = "POST https://example.com/upload\n\n<@latin1 ./payload.txt\n";
        let parsed = parse(content, Path::new("req.http"), &inputs(&empty, &empty, &empty)).unwrap();
        let ext = parsed.requests[0].external_file_ref.as_ref().unwrap();
        assert_eq!(ext.path, "./payload.txt");
        assert!(ext.expand_variables);
        assert_eq!(ext.encoding, Some(Encoding::Latin1));
    }

    #[test]
    fn unrecognized_encoding_token_is_absorbed_into_path() {
        let empty = HashMap::new();
        let content = "POST https://example.com/upload\n\n<@weirdenc ./payload.txt\n";
        let parsed = parse(content, Path::new("req.http"), &inputs(&empty, &empty, &empty)).unwrap();
        let ext = parsed.requests[0].external_file_ref.as_ref().unwrap();
        assert_eq!(ext.path, "weirdenc ./payload.txt");
        assert!(ext.encoding.is_none());
    }

    #[test]
    fn malformed_header_line_is_an_error() {
        let empty = HashMap::new();
        let content = "GET https://example.com\nNot A Header\n";
        let err = parse(content, Path::new("req.http"), &inputs(&empty, &empty, &empty)).unwrap_err();
        assert!(err.reason.contains("malformed header line"));
    }

    #[test]
    fn invalid_method_is_an_error() {
        let empty = HashMap::new();
        let content = "FETCH https://example.com\n";
        let err = parse(content, Path::new("req.http"), &inputs(&empty, &empty, &empty)).unwrap_err();
        assert!(err.reason.contains("invalid method"));
    }
}
