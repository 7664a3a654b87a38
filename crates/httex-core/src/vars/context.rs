use std::collections::HashMap;

use crate::sources::EnvGetter;
use crate::vars::system::RequestScope;

/// Everything the resolver needs to resolve a named reference or a system
/// function call, assembled fresh per `execute`/`validate` call.
pub struct ResolveContext<'a> {
    pub programmatic: &'a HashMap<String, String>,
    pub file_scoped: &'a HashMap<String, String>,
    pub environment_overlay: &'a HashMap<String, String>,
    pub os_env: &'a dyn EnvGetter,
    pub dotenv: &'a HashMap<String, String>,
    pub system: &'a RequestScope,
}

impl<'a> ResolveContext<'a> {
    pub fn lookup_named(&self, name: &str) -> Option<String> {
        self.programmatic
            .get(name)
            .cloned()
            .or_else(|| self.file_scoped.get(name).cloned())
            .or_else(|| self.environment_overlay.get(name).cloned())
            .or_else(|| self.os_env.get(name))
            .or_else(|| self.dotenv.get(name).cloned())
    }
}
