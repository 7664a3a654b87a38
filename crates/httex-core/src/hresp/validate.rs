//! Whole-response validation: pairs expected responses against actuals and
//! aggregates every mismatch into a single [`ValidationErrors`] value.

use crate::error::{ValidationError, ValidationErrors};
use crate::hresp::matcher::BodyMatcher;
use crate::hresp::model::ExpectedResponse;
use crate::results::ResponseRecord;

/// Validates `actuals` against `expected`, aggregating a count mismatch and
/// every per-response mismatch found, not just the first.
///
/// A single [`BodyMatcher`] is shared across every paired response so that
/// repeated expected bodies (a common pattern when a `.hresp` file checks
/// several requests against the same shape) compile their regex once.
pub fn validate(expected: &[ExpectedResponse], actuals: &[ResponseRecord], source_file: &str) -> ValidationErrors {
    let mut errors = ValidationErrors::new();

    if actuals.len() != expected.len() {
        errors.push(ValidationError::CountMismatch {
            actual: actuals.len(),
            expected: expected.len(),
            file: source_file.to_string(),
        });
    }

    let matcher = BodyMatcher::new();
    for (exp, act) in expected.iter().zip(actuals.iter()) {
        validate_one(exp, act, &matcher, &mut errors);
    }

    errors
}

fn validate_one(expected: &ExpectedResponse, actual: &ResponseRecord, matcher: &BodyMatcher, errors: &mut ValidationErrors) {
    if let Some(expected_code) = expected.status_code {
        if expected_code != actual.status_code {
            errors.push(ValidationError::StatusCode {
                expected: expected_code,
                actual: actual.status_code,
            });
        }
    }

    if let Some(expected_line) = &expected.status_line {
        if !expected_line.is_empty() && *expected_line != actual.status_line {
            errors.push(ValidationError::StatusLine {
                expected: expected_line.clone(),
                actual: actual.status_line.clone(),
            });
        }
    }

    for (name, expected_value) in expected.headers.iter() {
        let actual_values = actual.headers.get_all(name);
        if actual_values.is_empty() {
            errors.push(ValidationError::MissingHeader { name: name.to_string() });
            continue;
        }
        // A header value is itself often a comma-separated list (e.g. the
        // Accept header); split before comparing so a single actual line
        // can satisfy several distinct expected values.
        let found = actual_values
            .iter()
            .flat_map(|v| v.split(','))
            .any(|v| v.trim() == expected_value);
        if !found {
            errors.push(ValidationError::MissingHeaderValue {
                name: name.to_string(),
                value: expected_value.to_string(),
                actual_values: actual_values.iter().map(|v| v.to_string()).collect(),
            });
        }
    }

    if let Some(expected_body) = &expected.body {
        if let Err(e) = matcher.match_body(expected_body, &actual.body_string) {
            errors.push(e);
        }
    }
}
