//! Resolves `{{ ... }}` placeholders in template text against a layered
//! [`ResolveContext`], with cycle and depth protection.

use std::collections::HashSet;

use crate::vars::context::ResolveContext;
use crate::vars::lexer::{self, PlaceholderKind, Segment};
use crate::vars::system;

/// Maximum placeholder-expansion passes before giving up on a piece of text.
pub const MAX_DEPTH: u32 = 16;

/// Wildcard names reserved for the body matcher (`hresp::matcher`). These
/// are never evaluated as system functions; resolving a `.hresp` body must
/// leave them intact for the matcher to compile later.
const WILDCARD_NAMES: &[&str] = &["regexp", "anyGuid", "anyTimestamp", "anyDatetime", "any"];

/// Resolves every placeholder in `text`, rescanning until none remain or
/// [`MAX_DEPTH`] is reached. Unresolved placeholders are left verbatim.
pub fn resolve(text: &str, ctx: &ResolveContext) -> String {
    resolve_at(text, ctx, &mut HashSet::new(), 0)
}

fn resolve_at(text: &str, ctx: &ResolveContext, visited: &mut HashSet<String>, depth: u32) -> String {
    if depth >= MAX_DEPTH {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    let mut changed = false;
    for segment in lexer::scan(text) {
        match segment {
            Segment::Literal(s) => out.push_str(&s),
            Segment::Placeholder(p) => match substitute(&p.kind, ctx, visited, depth) {
                Some(value) => {
                    out.push_str(&value);
                    changed = true;
                }
                None => out.push_str(&p.raw),
            },
        }
    }

    if changed && out.contains("{{") && depth + 1 < MAX_DEPTH {
        resolve_at(&out, ctx, visited, depth + 1)
    } else {
        out
    }
}

fn substitute(kind: &PlaceholderKind, ctx: &ResolveContext, visited: &mut HashSet<String>, depth: u32) -> Option<String> {
    match kind {
        PlaceholderKind::Named { name, fallback } => {
            if visited.contains(name) {
                return None;
            }
            if let Some(value) = ctx.lookup_named(name) {
                visited.insert(name.clone());
                let resolved = resolve_at(&value, ctx, visited, depth + 1);
                visited.remove(name);
                Some(resolved)
            } else {
                fallback.as_ref().map(|fb| resolve_at(fb, ctx, visited, depth + 1))
            }
        }
        PlaceholderKind::System { name, args } => {
            if WILDCARD_NAMES.contains(&name.as_str()) {
                return None;
            }
            let raw_key = render_system_key(name, args);
            Some(ctx.system.get_or_generate(&raw_key, || system::evaluate(name, args, ctx.os_env, ctx.dotenv)))
        }
    }
}

fn render_system_key(name: &str, args: &[String]) -> String {
    if args.is_empty() {
        format!("${name}")
    } else {
        format!("${name} {}", args.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::ProcessEnv;
    use crate::vars::system::RequestScope;
    use std::collections::HashMap;

    fn ctx<'a>(
        programmatic: &'a HashMap<String, String>,
        file_scoped: &'a HashMap<String, String>,
        environment_overlay: &'a HashMap<String, String>,
        dotenv: &'a HashMap<String, String>,
        system: &'a RequestScope,
    ) -> ResolveContext<'a> {
        ResolveContext {
            programmatic,
            file_scoped,
            environment_overlay,
            os_env: &ProcessEnv,
            dotenv,
            system,
        }
    }

    #[test]
    fn programmatic_wins_over_everything_else() {
        let programmatic = HashMap::from([("host".to_string(), "programmatic".to_string())]);
        let file_scoped = HashMap::from([("host".to_string(), "file".to_string())]);
        let environment_overlay = HashMap::from([("host".to_string(), "env".to_string())]);
        let dotenv = HashMap::new();
        let scope = RequestScope::new();
        let c = ctx(&programmatic, &file_scoped, &environment_overlay, &dotenv, &scope);
        assert_eq!(resolve("{{host}}", &c), "programmatic");
    }

    #[test]
    fn falls_through_precedence_order_as_sources_are_removed() {
        let empty = HashMap::new();
        let file_scoped = HashMap::from([("host".to_string(), "file".to_string())]);
        let environment_overlay = HashMap::from([("host".to_string(), "env".to_string())]);
        let scope = RequestScope::new();
        let c = ctx(&empty, &file_scoped, &environment_overlay, &empty, &scope);
        assert_eq!(resolve("{{host}}", &c), "file");

        let c = ctx(&empty, &empty, &environment_overlay, &empty, &scope);
        assert_eq!(resolve("{{host}}", &c), "env");
    }

    #[test]
    fn fallback_is_inert_when_value_resolves() {
        let programmatic = HashMap::from([("x".to_string(), "value".to_string())]);
        let empty = HashMap::new();
        let scope = RequestScope::new();
        let c = ctx(&programmatic, &empty, &empty, &empty, &scope);
        assert_eq!(resolve("{{x | y}}", &c), "value");
    }

    #[test]
    fn fallback_is_used_when_name_does_not_resolve() {
        let empty = HashMap::new();
        let scope = RequestScope::new();
        let c = ctx(&empty, &empty, &empty, &empty, &scope);
        assert_eq!(resolve("{{x | fallback-value}}", &c), "fallback-value");
    }

    #[test]
    fn unresolved_placeholder_is_left_unchanged() {
        let empty = HashMap::new();
        let scope = RequestScope::new();
        let c = ctx(&empty, &empty, &empty, &empty, &scope);
        assert_eq!(resolve("{{nope}}", &c), "{{nope}}");
    }

    #[test]
    fn self_referential_definition_does_not_loop_forever() {
        let empty = HashMap::new();
        let file_scoped = HashMap::from([("a".to_string(), "{{a}}".to_string())]);
        let scope = RequestScope::new();
        let c = ctx(&empty, &file_scoped, &empty, &empty, &scope);
        assert_eq!(resolve("{{a}}", &c), "{{a}}");
    }

    #[test]
    fn wildcard_placeholders_pass_through_untouched() {
        let empty = HashMap::new();
        let scope = RequestScope::new();
        let c = ctx(&empty, &empty, &empty, &empty, &scope);
        let body = r#"{"id":"{{$anyGuid}}","at":"{{$anyDatetime 'iso8601'}}","n":{{$anyTimestamp}},"x":{{$any}},"y":{{$regexp `\d+`}}}"#;
        assert_eq!(resolve(body, &c), body);
    }

    #[test]
    fn system_function_is_evaluated_once_per_request_scope() {
        let empty = HashMap::new();
        let scope = RequestScope::new();
        let c = ctx(&empty, &empty, &empty, &empty, &scope);
        let resolved = resolve("a={{$guid}}|b={{$guid}}", &c);
        let halves: Vec<&str> = resolved.split('|').collect();
        assert_eq!(halves.len(), 2);
        assert_eq!(halves[0].trim_start_matches("a="), halves[1].trim_start_matches("b="));
    }
}
