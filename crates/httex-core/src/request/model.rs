use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::headers::HeaderMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Head,
    Options,
    Trace,
    Connect,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Patch => "PATCH",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
            Self::Trace => "TRACE",
            Self::Connect => "CONNECT",
        }
    }

    pub fn parse(token: &str) -> Option<Self> {
        match token.to_ascii_uppercase().as_str() {
            "GET" => Some(Self::Get),
            "POST" => Some(Self::Post),
            "PUT" => Some(Self::Put),
            "DELETE" => Some(Self::Delete),
            "PATCH" => Some(Self::Patch),
            "HEAD" => Some(Self::Head),
            "OPTIONS" => Some(Self::Options),
            "TRACE" => Some(Self::Trace),
            "CONNECT" => Some(Self::Connect),
            _ => None,
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Encoding {
    Utf8,
    Latin1,
    Ascii,
    Cp1252,
}

impl Encoding {
    /// Resolves a closed set of encoding tokens (case-insensitive). An
    /// unrecognized token is not an encoding at all; the caller treats it
    /// as part of the path instead.
    pub fn parse(token: &str) -> Option<Self> {
        match token.to_ascii_lowercase().as_str() {
            "utf-8" | "utf8" => Some(Self::Utf8),
            "latin1" | "iso-8859-1" => Some(Self::Latin1),
            "ascii" => Some(Self::Ascii),
            "cp1252" | "windows-1252" => Some(Self::Cp1252),
            _ => None,
        }
    }

    pub fn decode(&self, bytes: &[u8]) -> String {
        match self {
            Self::Utf8 | Self::Ascii => String::from_utf8_lossy(bytes).into_owned(),
            Self::Latin1 => encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned(),
            Self::Cp1252 => encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalFileRef {
    pub path: String,
    pub encoding: Option<Encoding>,
    pub expand_variables: bool,
}

/// A single parsed request block, ready for template resolution and
/// transport.
#[derive(Debug, Clone)]
pub struct Request {
    pub name: Option<String>,
    pub method: HttpMethod,
    pub raw_url: String,
    pub http_version: Option<String>,
    pub headers: HeaderMap,
    pub raw_body: String,
    pub external_file_ref: Option<ExternalFileRef>,
    pub active_variables: HashMap<String, String>,
    pub no_redirect: bool,
    pub file_path: PathBuf,
    pub line_number: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_parse_is_case_insensitive() {
        assert_eq!(HttpMethod::parse("get"), Some(HttpMethod::Get));
        assert_eq!(HttpMethod::parse("GET"), Some(HttpMethod::Get));
        assert_eq!(HttpMethod::parse("nonsense"), None);
    }

    #[test]
    fn method_display_is_uppercase() {
        assert_eq!(HttpMethod::Patch.to_string(), "PATCH");
    }

    #[test]
    fn encoding_parse_recognizes_closed_set_case_insensitively() {
        assert_eq!(Encoding::parse("UTF-8"), Some(Encoding::Utf8));
        assert_eq!(Encoding::parse("Latin1"), Some(Encoding::Latin1));
        assert_eq!(Encoding::parse("windows-1252"), Some(Encoding::Cp1252));
        assert_eq!(Encoding::parse("nonsense-enc"), None);
    }
}
