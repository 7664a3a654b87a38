pub mod client;
pub mod error;
pub mod headers;
pub mod hresp;
pub mod http;
pub mod request;
pub mod results;
pub mod sources;
pub mod vars;

pub use client::{Client, ClientBuilder};
pub use error::{HttexError, ParseError, ValidationError, ValidationErrors};
pub use headers::HeaderMap;
pub use hresp::ExpectedResponse;
pub use request::{HttpMethod, Request};
pub use results::ResponseRecord;
