pub mod dotenv;
pub mod environment;

/// Abstraction over process environment lookups so the resolver can be
/// exercised in tests without touching real process state.
pub trait EnvGetter: Send + Sync {
    fn get(&self, name: &str) -> Option<String>;
}

/// Default [`EnvGetter`] backed by `std::env::var`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessEnv;

impl EnvGetter for ProcessEnv {
    fn get(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}
