use std::path::PathBuf;

use serde::Serialize;

/// A parse failure in a request file or expected-response file, carrying
/// enough context for a caller to point a user at the offending line.
#[derive(Debug, Clone, thiserror::Error)]
#[error("parse error at {file}:{line}: {reason}")]
pub struct ParseError {
    pub file: PathBuf,
    pub line: usize,
    pub reason: String,
}

impl ParseError {
    pub fn new(file: impl Into<PathBuf>, line: usize, reason: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            line,
            reason: reason.into(),
        }
    }
}

/// One constituent of a [`ValidationErrors`] aggregate.
///
/// Mirrors the tagged-variant shape from the error handling design: each
/// case carries exactly the data needed to render its message and nothing
/// more.
#[derive(Debug, Clone)]
pub enum ValidationError {
    CountMismatch {
        actual: usize,
        expected: usize,
        file: String,
    },
    StatusCode {
        expected: u16,
        actual: u16,
    },
    StatusLine {
        expected: String,
        actual: String,
    },
    MissingHeader {
        name: String,
    },
    MissingHeaderValue {
        name: String,
        value: String,
        actual_values: Vec<String>,
    },
    BodyMismatch {
        diff: String,
        compiled_regex: Option<String>,
    },
    RegexCompile {
        pattern: String,
        message: String,
    },
    Parse(ParseError),
    Source(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CountMismatch { actual, expected, file } => write!(
                f,
                "mismatch in number of responses: got {actual} actual, but expected {expected} from file '{file}'"
            ),
            Self::StatusCode { expected, actual } => {
                write!(f, "status code mismatch: expected {expected}, got {actual}")
            }
            Self::StatusLine { expected, actual } => {
                write!(f, "status string mismatch: expected '{expected}', got '{actual}'")
            }
            Self::MissingHeader { name } => write!(f, "expected header '{name}' not found"),
            Self::MissingHeaderValue { name, value, actual_values } => write!(
                f,
                "expected value '{value}' for header '{name}' not found in actual values {actual_values:?}"
            ),
            Self::BodyMismatch { diff, compiled_regex } => match compiled_regex {
                Some(re) => write!(
                    f,
                    "body mismatch (regexp/placeholder evaluation failed): compiled regex: {re}\n{diff}"
                ),
                None => write!(f, "body mismatch:\n{diff}"),
            },
            Self::RegexCompile { pattern, message } => {
                write!(f, "failed to compile expected-body regex '{pattern}': {message}")
            }
            Self::Parse(e) => write!(f, "{e}"),
            Self::Source(s) => write!(f, "{s}"),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Aggregate error — a container holding zero or more constituent
/// [`ValidationError`]s, iterable by the caller.
#[derive(Debug, Clone, Default)]
pub struct ValidationErrors(Vec<ValidationError>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, error: ValidationError) {
        self.0.push(error);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ValidationError> {
        self.0.iter()
    }

    pub fn into_vec(self) -> Vec<ValidationError> {
        self.0
    }
}

impl IntoIterator for ValidationErrors {
    type Item = ValidationError;
    type IntoIter = std::vec::IntoIter<ValidationError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl FromIterator<ValidationError> for ValidationErrors {
    fn from_iter<I: IntoIterator<Item = ValidationError>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, err) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{err}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

/// Top-level error for the crate's fallible operations.
#[derive(Debug, thiserror::Error)]
pub enum HttexError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Parse(#[from] ParseError),

    #[error("source error: {0}")]
    Source(String),

    #[error("usage error: {0}")]
    Usage(String),

    #[error("{0}")]
    Validation(#[from] ValidationErrors),
}

impl Serialize for HttexError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}
