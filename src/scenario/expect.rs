//! Expectation evaluation against a normalized response

use serde::Serialize;
use serde_json::Value;
use std::fmt;

use crate::http::HttpResponse;

use super::config::{Assertion, Expectation, ValueKind};
use super::fixture::{is_empty, FixtureContext};

/// One diverging check, with both sides rendered for the report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssertionFailure {
    /// `status` for the status code, otherwise the body path
    pub path: String,
    pub expected: String,
    pub actual: String,
}

impl fmt::Display for AssertionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: expected {}, got {}",
            self.path, self.expected, self.actual
        )
    }
}

/// Resolve a dotted path inside a JSON value
///
/// Numeric segments index arrays. The empty path is the value itself.
pub fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return Some(value);
    }
    path.split('.').try_fold(value, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// Check a response against an expectation
///
/// Every check runs, so the report shows all divergences at once rather
/// than the first one only.
pub fn evaluate(
    expectation: &Expectation,
    response: &HttpResponse,
    fixtures: &FixtureContext,
) -> Vec<AssertionFailure> {
    let mut failures = Vec::new();

    if response.status != expectation.status {
        failures.push(AssertionFailure {
            path: "status".to_string(),
            expected: expectation.status.to_string(),
            actual: response.status.to_string(),
        });
    }

    for assertion in &expectation.body {
        if let Err(failure) = check(assertion, &response.body, fixtures) {
            failures.push(failure);
        }
    }

    failures
}

/// Evaluate a single body assertion
pub fn check(
    assertion: &Assertion,
    body: &Value,
    fixtures: &FixtureContext,
) -> Result<(), AssertionFailure> {
    let path = assertion.path();
    let actual = lookup(body, path);
    let fail = |expected: String, actual: String| AssertionFailure {
        path: display_path(path),
        expected,
        actual,
    };

    match assertion {
        Assertion::ExactMatch { value, .. } => {
            let expected = fixtures.render_value(value).map_err(|missing| {
                fail(
                    format!("{} (fixture {} missing)", value, missing.join(", ")),
                    describe(actual),
                )
            })?;
            if actual == Some(&expected) {
                Ok(())
            } else {
                Err(fail(expected.to_string(), describe(actual)))
            }
        }
        Assertion::TypeCheck { kind, .. } => {
            if actual.is_some_and(|v| matches_kind(v, *kind)) {
                Ok(())
            } else {
                Err(fail(kind.to_string(), describe_kind(actual)))
            }
        }
        Assertion::LengthBound {
            comparator, value, ..
        } => {
            let expected = format!("length {} {}", comparator.symbol(), value);
            match actual.and_then(length_of) {
                Some(len) if comparator.holds(len, *value) => Ok(()),
                Some(len) => Err(fail(expected, format!("length {}", len))),
                None => Err(fail(expected, describe_kind(actual))),
            }
        }
    }
}

fn matches_kind(value: &Value, kind: ValueKind) -> bool {
    match kind {
        ValueKind::Present => true,
        ValueKind::NonEmpty => !is_empty(value),
        ValueKind::String => value.is_string(),
        ValueKind::Number => value.is_number(),
        ValueKind::Boolean => value.is_boolean(),
        ValueKind::Null => value.is_null(),
        ValueKind::Array => value.is_array(),
        ValueKind::Object => value.is_object(),
    }
}

fn length_of(value: &Value) -> Option<usize> {
    match value {
        Value::Array(items) => Some(items.len()),
        Value::Object(map) => Some(map.len()),
        Value::String(s) => Some(s.chars().count()),
        _ => None,
    }
}

fn display_path(path: &str) -> String {
    if path.is_empty() {
        "body".to_string()
    } else {
        format!("body.{}", path)
    }
}

fn describe(value: Option<&Value>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => "<absent>".to_string(),
    }
}

fn describe_kind(value: Option<&Value>) -> String {
    let kind = match value {
        None => return "<absent>".to_string(),
        Some(Value::Null) => "null",
        Some(Value::Bool(_)) => "a boolean",
        Some(Value::Number(_)) => "a number",
        Some(Value::String(s)) if s.is_empty() => "an empty string",
        Some(Value::String(_)) => "a string",
        Some(Value::Array(a)) if a.is_empty() => "an empty array",
        Some(Value::Array(_)) => "an array",
        Some(Value::Object(o)) if o.is_empty() => "an empty object",
        Some(Value::Object(_)) => "an object",
    };
    kind.to_string()
}
