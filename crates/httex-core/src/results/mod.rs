use std::time::Duration;

use crate::headers::HeaderMap;
use crate::request::Request;

/// Everything a caller needs to inspect or validate a single completed
/// request, successful or not.
#[derive(Debug, Clone)]
pub struct ResponseRecord {
    pub status_code: u16,
    pub status_line: String,
    pub headers: HeaderMap,
    pub body_bytes: Vec<u8>,
    pub body_string: String,
    pub duration: Duration,
    pub size: u64,
    pub is_tls: bool,
    pub tls_version: Option<String>,
    pub tls_cipher_suite: Option<String>,
    /// Set when the HTTP round trip itself failed; the rest of the record
    /// is then a best-effort zero value.
    pub error: Option<String>,
    /// The fully substituted request this response answers, kept for
    /// post-mortem inspection.
    pub request: Request,
}

impl ResponseRecord {
    /// Builds a record representing a request that never got a response
    /// (connection refused, timeout, cancellation, ...).
    pub fn errored(request: Request, message: impl Into<String>) -> Self {
        Self {
            status_code: 0,
            status_line: String::new(),
            headers: HeaderMap::new(),
            body_bytes: Vec::new(),
            body_string: String::new(),
            duration: Duration::default(),
            size: 0,
            is_tls: false,
            tls_version: None,
            tls_cipher_suite: None,
            error: Some(message.into()),
            request,
        }
    }
}
