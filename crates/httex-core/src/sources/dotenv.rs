use std::collections::HashMap;
use std::path::Path;

/// Parses `.env`-style `KEY=VALUE` content. Blank lines, `#`-comments, and
/// an optional leading `export ` are tolerated. Surrounding single or
/// double quotes around the value are stripped.
pub fn parse(content: &str) -> HashMap<String, String> {
    let mut vars = HashMap::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = line.strip_prefix("export ").unwrap_or(line);
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }
        let mut value = value.trim().to_string();
        if value.len() >= 2 {
            let bytes = value.as_bytes();
            let wrapped_in = |q: u8| bytes[0] == q && bytes[bytes.len() - 1] == q;
            if wrapped_in(b'"') || wrapped_in(b'\'') {
                value = value[1..value.len() - 1].to_string();
            }
        }
        vars.insert(key.to_string(), value);
    }
    vars
}

/// Loads `.env` sibling to `dir`. A missing file is silently ignored,
/// yielding an empty map.
pub async fn load(dir: &Path) -> HashMap<String, String> {
    match tokio::fs::read_to_string(dir.join(".env")).await {
        Ok(content) => parse(&content),
        Err(_) => HashMap::new(),
    }
}
