use reqwest::Method;

use crate::error::HttexError;
use crate::request::Request;

/// Converts the parsed, resolved [`Request`]'s method into a [`reqwest::Method`].
pub fn method_for(request: &Request) -> Result<Method, HttexError> {
    Method::from_bytes(request.method.as_str().as_bytes())
        .map_err(|e| HttexError::Usage(format!("invalid HTTP method '{}': {e}", request.method)))
}

/// Whether `url` should be treated as a TLS connection, used to populate
/// [`crate::results::ResponseRecord::is_tls`] since reqwest does not expose
/// the negotiated scheme on its `Response`.
pub fn is_tls(url: &str) -> bool {
    url.trim_start().to_ascii_lowercase().starts_with("https://")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headers::HeaderMap;
    use crate::request::HttpMethod;
    use std::collections::HashMap;
    use std::path::PathBuf;

    fn sample_request(method: HttpMethod, url: &str) -> Request {
        Request {
            name: None,
            method,
            raw_url: url.to_string(),
            http_version: None,
            headers: HeaderMap::new(),
            raw_body: String::new(),
            external_file_ref: None,
            active_variables: HashMap::new(),
            no_redirect: false,
            file_path: PathBuf::from("req.http"),
            line_number: 1,
        }
    }

    #[test]
    fn method_for_converts_every_supported_method() {
        for method in [
            HttpMethod::Get,
            HttpMethod::Post,
            HttpMethod::Put,
            HttpMethod::Delete,
            HttpMethod::Patch,
            HttpMethod::Head,
            HttpMethod::Options,
            HttpMethod::Trace,
            HttpMethod::Connect,
        ] {
            let request = sample_request(method, "https://example.com");
            assert_eq!(method_for(&request).unwrap().as_str(), method.as_str());
        }
    }

    #[test]
    fn is_tls_detects_https_case_insensitively() {
        assert!(is_tls("HTTPS://example.com"));
        assert!(is_tls("  https://example.com"));
        assert!(!is_tls("http://example.com"));
    }
}
