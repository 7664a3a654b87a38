pub mod matcher;
pub mod model;
pub mod parser;
pub mod validate;

pub use matcher::BodyMatcher;
pub use model::ExpectedResponse;
pub use parser::{extract_definitions, parse_responses};
pub use validate::validate;
