use std::collections::HashMap;
use std::path::Path;

use crate::error::HttexError;

/// Loads the named environment profile `http-client.env.<name>.json` from
/// `dir`. A missing file yields an empty overlay; malformed JSON is a
/// source error surfaced to the caller.
pub async fn load(dir: &Path, name: &str) -> Result<HashMap<String, String>, HttexError> {
    let path = dir.join(format!("http-client.env.{name}.json"));
    let content = match tokio::fs::read_to_string(&path).await {
        Ok(content) => content,
        Err(_) => return Ok(HashMap::new()),
    };
    serde_json::from_str(&content)
        .map_err(|e| HttexError::Source(format!("failed to parse environment profile {}: {e}", path.display())))
}
