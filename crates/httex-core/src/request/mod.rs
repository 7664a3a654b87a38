pub mod model;
pub mod parser;

pub use model::{Encoding, ExternalFileRef, HttpMethod, Request};
pub use parser::{parse, ParseInputs, ParsedFile};
