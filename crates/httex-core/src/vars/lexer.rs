//! Scans template text for `{{ ... }}` placeholders and classifies them.

/// One placeholder's parsed shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaceholderKind {
    /// `{{name}}` or `{{name | fallback}}`. Response-reference placeholders
    /// (`reqName.response.body.field`) are syntactically indistinguishable
    /// from an ordinary named reference at this layer; they simply never
    /// resolve, so they fall through to the "leave unchanged" rule.
    Named { name: String, fallback: Option<String> },
    /// `{{$func arg1 arg2}}`.
    System { name: String, args: Vec<String> },
}

/// A single placeholder occurrence, with its exact source text retained for
/// per-request memoization keys and for echoing back unresolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder {
    pub raw: String,
    pub kind: PlaceholderKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Placeholder(Placeholder),
}

/// Splits `text` into literal spans and placeholders, left to right.
pub fn scan(text: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut rest = text;
    loop {
        match find_next_placeholder(rest) {
            Some((start, end)) => {
                if start > 0 {
                    segments.push(Segment::Literal(rest[..start].to_string()));
                }
                let raw = rest[start..end].to_string();
                let inner = &rest[start + 2..end - 2];
                segments.push(Segment::Placeholder(parse_placeholder(raw, inner)));
                rest = &rest[end..];
            }
            None => {
                if !rest.is_empty() {
                    segments.push(Segment::Literal(rest.to_string()));
                }
                break;
            }
        }
    }
    segments
}

/// Finds the first top-level, correctly-balanced `{{ ... }}` span, returning
/// byte offsets `(start, end)` where `end` is exclusive (past the closing
/// `}}`). Unbalanced `{{` is reported as `None`, so the caller treats the
/// remainder as literal text.
fn find_next_placeholder(text: &str) -> Option<(usize, usize)> {
    let bytes = text.as_bytes();
    let mut i = 0;
    while i + 1 < bytes.len() {
        if bytes[i] == b'{' && bytes[i + 1] == b'{' {
            let start = i;
            let mut depth = 1;
            let mut j = i + 2;
            while j < bytes.len() {
                if j + 1 < bytes.len() && bytes[j] == b'{' && bytes[j + 1] == b'{' {
                    depth += 1;
                    j += 2;
                    continue;
                }
                if j + 1 < bytes.len() && bytes[j] == b'}' && bytes[j + 1] == b'}' {
                    depth -= 1;
                    j += 2;
                    if depth == 0 {
                        return Some((start, j));
                    }
                    continue;
                }
                j += 1;
            }
            return None;
        }
        i += 1;
    }
    None
}

fn parse_placeholder(raw: String, inner: &str) -> Placeholder {
    let inner = inner.trim();
    if let Some(rest) = inner.strip_prefix('$') {
        let (name, args_str) = match rest.find(char::is_whitespace) {
            Some(idx) => (&rest[..idx], rest[idx..].trim_start()),
            None => (rest, ""),
        };
        return Placeholder {
            raw,
            kind: PlaceholderKind::System {
                name: name.to_string(),
                args: tokenize_args(args_str),
            },
        };
    }

    match find_top_level_pipe(inner) {
        Some(idx) => Placeholder {
            raw,
            kind: PlaceholderKind::Named {
                name: inner[..idx].trim().to_string(),
                fallback: Some(inner[idx + 1..].trim().to_string()),
            },
        },
        None => Placeholder {
            raw,
            kind: PlaceholderKind::Named {
                name: inner.to_string(),
                fallback: None,
            },
        },
    }
}

/// Finds the first `|` not nested inside a `{{ ... }}` fallback.
fn find_top_level_pipe(text: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut depth = 0;
    let mut i = 0;
    while i < bytes.len() {
        if i + 1 < bytes.len() && bytes[i] == b'{' && bytes[i + 1] == b'{' {
            depth += 1;
            i += 2;
            continue;
        }
        if i + 1 < bytes.len() && bytes[i] == b'}' && bytes[i + 1] == b'}' {
            depth = depth.saturating_sub(1);
            i += 2;
            continue;
        }
        if bytes[i] == b'|' && depth == 0 {
            return Some(i);
        }
        i += 1;
    }
    None
}

/// Splits whitespace-separated argument tokens, honoring single and double
/// quoted strings as one token each.
fn tokenize_args(s: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut chars = s.chars().peekable();
    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }
        if c == '\'' || c == '"' {
            let quote = c;
            chars.next();
            let mut buf = String::new();
            for ch in chars.by_ref() {
                if ch == quote {
                    break;
                }
                buf.push(ch);
            }
            args.push(buf);
        } else {
            let mut buf = String::new();
            while let Some(&ch) = chars.peek() {
                if ch.is_whitespace() {
                    break;
                }
                buf.push(ch);
                chars.next();
            }
            args.push(buf);
        }
    }
    args
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scans_literal_only_text() {
        let segments = scan("no placeholders here");
        assert_eq!(segments, vec![Segment::Literal("no placeholders here".into())]);
    }

    #[test]
    fn scans_named_reference() {
        let segments = scan("host: {{host}}");
        assert_eq!(
            segments,
            vec![
                Segment::Literal("host: ".into()),
                Segment::Placeholder(Placeholder {
                    raw: "{{host}}".into(),
                    kind: PlaceholderKind::Named { name: "host".into(), fallback: None },
                }),
            ]
        );
    }

    #[test]
    fn scans_named_reference_with_fallback() {
        let segments = scan("{{host | http://localhost}}");
        match &segments[0] {
            Segment::Placeholder(p) => assert_eq!(
                p.kind,
                PlaceholderKind::Named {
                    name: "host".into(),
                    fallback: Some("http://localhost".into())
                }
            ),
            _ => panic!("expected placeholder"),
        }
    }

    #[test]
    fn fallback_may_nest_a_placeholder() {
        let segments = scan("{{host | {{backupHost}}}}");
        match &segments[0] {
            Segment::Placeholder(p) => assert_eq!(
                p.kind,
                PlaceholderKind::Named {
                    name: "host".into(),
                    fallback: Some("{{backupHost}}".into())
                }
            ),
            _ => panic!("expected placeholder"),
        }
    }

    #[test]
    fn scans_system_function_with_quoted_and_bare_args() {
        let segments = scan("{{$datetime 'iso8601'}}");
        match &segments[0] {
            Segment::Placeholder(p) => assert_eq!(
                p.kind,
                PlaceholderKind::System { name: "datetime".into(), args: vec!["iso8601".into()] }
            ),
            _ => panic!("expected placeholder"),
        }

        let segments = scan("{{$randomInt 1 10}}");
        match &segments[0] {
            Segment::Placeholder(p) => assert_eq!(
                p.kind,
                PlaceholderKind::System {
                    name: "randomInt".into(),
                    args: vec!["1".into(), "10".into()]
                }
            ),
            _ => panic!("expected placeholder"),
        }
    }

    #[test]
    fn unbalanced_braces_are_literal() {
        let segments = scan("oops {{ unterminated");
        assert_eq!(segments, vec![Segment::Literal("oops {{ unterminated".into())]);
    }

    #[test]
    fn whitespace_immediately_inside_braces_is_stripped() {
        let segments = scan("{{  host  }}");
        match &segments[0] {
            Segment::Placeholder(p) => assert_eq!(
                p.kind,
                PlaceholderKind::Named { name: "host".into(), fallback: None }
            ),
            _ => panic!("expected placeholder"),
        }
    }

    #[test]
    fn response_reference_placeholder_is_just_a_named_reference() {
        let segments = scan("{{login.response.body.token}}");
        match &segments[0] {
            Segment::Placeholder(p) => assert_eq!(
                p.kind,
                PlaceholderKind::Named { name: "login.response.body.token".into(), fallback: None }
            ),
            _ => panic!("expected placeholder"),
        }
    }
}
