//! Suite configuration types
//!
//! Defines the data structures for deserializing YAML suites.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use crate::common::{Error, Result};
use crate::http::Method;

use super::fixture::{is_valid_key, template_keys, value_keys};

/// A suite loaded from a YAML file
#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct Suite {
    /// Name of the suite
    pub name: String,
    /// Optional description of what the suite covers
    pub description: Option<String>,
    /// Groups, executed in order
    pub groups: Vec<ScenarioGroup>,
}

/// An ordered set of scenarios for one feature area
#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct ScenarioGroup {
    pub name: String,
    pub description: Option<String>,
    pub scenarios: Vec<Scenario>,
}

/// One request/assert/capture unit
#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    /// Name of the scenario
    pub name: String,
    /// Fixture keys that must be present before the request is issued
    #[serde(default)]
    pub requires: Vec<String>,
    /// Fixture key holding the bearer token to send
    pub auth: Option<String>,
    /// Requests issued before the main request; their responses are not asserted
    #[serde(default)]
    pub setup: Vec<RequestSpec>,
    /// The request under test
    pub request: RequestSpec,
    /// What the response must look like
    pub expect: Expectation,
    /// Fixture key -> body path, applied only when every expectation holds
    #[serde(default)]
    pub capture: BTreeMap<String, String>,
    /// Overrides the run's default timeout
    pub timeout_secs: Option<u64>,
}

/// Description of an HTTP request
#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct RequestSpec {
    pub method: Method,
    /// Path relative to the base URL; may contain `${key}` placeholders
    pub path: String,
    /// Query parameters, in declaration order
    #[serde(default, deserialize_with = "ordered_pairs")]
    pub query: Vec<(String, String)>,
    /// Extra headers, in declaration order
    #[serde(default, deserialize_with = "ordered_pairs")]
    pub headers: Vec<(String, String)>,
    /// JSON body
    pub body: Option<Value>,
}

/// Expected response
#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct Expectation {
    /// Exact status code
    pub status: u16,
    /// Assertions on the body, all of which must hold
    #[serde(default)]
    pub body: Vec<Assertion>,
}

/// A single body assertion
///
/// Written in YAML as a map with a `path` and exactly one of `equals`,
/// `is`, or `length` (plus `value` for `length`).
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(try_from = "RawAssertion")]
pub enum Assertion {
    /// JSON equality at `path`
    ExactMatch { path: String, value: Value },
    /// Presence or JSON type at `path`
    TypeCheck { path: String, kind: ValueKind },
    /// Length of the array, string or object at `path`
    LengthBound {
        path: String,
        comparator: Comparator,
        value: usize,
    },
}

impl Assertion {
    pub fn path(&self) -> &str {
        match self {
            Assertion::ExactMatch { path, .. }
            | Assertion::TypeCheck { path, .. }
            | Assertion::LengthBound { path, .. } => path,
        }
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawAssertion {
    #[serde(default)]
    path: String,
    equals: Option<Value>,
    is: Option<ValueKind>,
    length: Option<Comparator>,
    value: Option<usize>,
}

impl TryFrom<RawAssertion> for Assertion {
    type Error = String;

    fn try_from(raw: RawAssertion) -> std::result::Result<Self, Self::Error> {
        let path = raw.path;
        match (raw.equals, raw.is, raw.length, raw.value) {
            (Some(value), None, None, None) => Ok(Assertion::ExactMatch { path, value }),
            (None, Some(kind), None, None) => Ok(Assertion::TypeCheck { path, kind }),
            (None, None, Some(comparator), Some(value)) => Ok(Assertion::LengthBound {
                path,
                comparator,
                value,
            }),
            (None, None, Some(_), None) => Err(format!(
                "assertion on '{}': 'length' requires a 'value'",
                path
            )),
            _ => Err(format!(
                "assertion on '{}' must use exactly one of 'equals', 'is' or 'length'",
                path
            )),
        }
    }
}

/// Kinds accepted by a type check
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    /// The path resolves to any value, including `null`
    Present,
    /// The path resolves to a value that is not `null`, `""`, `[]` or `{}`
    NonEmpty,
    String,
    Number,
    Boolean,
    Null,
    Array,
    Object,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ValueKind::Present => "present",
            ValueKind::NonEmpty => "non-empty",
            ValueKind::String => "a string",
            ValueKind::Number => "a number",
            ValueKind::Boolean => "a boolean",
            ValueKind::Null => "null",
            ValueKind::Array => "an array",
            ValueKind::Object => "an object",
        };
        f.write_str(s)
    }
}

/// Length comparators
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Comparator {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

impl Comparator {
    pub fn holds(&self, actual: usize, bound: usize) -> bool {
        match self {
            Comparator::Eq => actual == bound,
            Comparator::Ne => actual != bound,
            Comparator::Gt => actual > bound,
            Comparator::Ge => actual >= bound,
            Comparator::Lt => actual < bound,
            Comparator::Le => actual <= bound,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Comparator::Eq => "==",
            Comparator::Ne => "!=",
            Comparator::Gt => ">",
            Comparator::Ge => ">=",
            Comparator::Lt => "<",
            Comparator::Le => "<=",
        }
    }
}

fn ordered_pairs<'de, D>(deserializer: D) -> std::result::Result<Vec<(String, String)>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error as _;
    use serde_yaml::Value as Yaml;

    let mapping = serde_yaml::Mapping::deserialize(deserializer)?;
    mapping
        .into_iter()
        .map(|(k, v)| {
            let key = match k {
                Yaml::String(s) => s,
                other => return Err(D::Error::custom(format!("non-string key {:?}", other))),
            };
            let value = match v {
                Yaml::String(s) => s,
                Yaml::Number(n) => n.to_string(),
                Yaml::Bool(b) => b.to_string(),
                other => {
                    return Err(D::Error::custom(format!(
                        "value for '{}' must be a scalar, got {:?}",
                        key, other
                    )))
                }
            };
            Ok((key, value))
        })
        .collect()
}

impl Suite {
    /// Parse and validate a suite from YAML text
    ///
    /// `source` names the suite in error messages (usually a file path).
    pub fn from_yaml(source: &str, content: &str) -> Result<Self> {
        let suite: Suite =
            serde_yaml::from_str(content).map_err(|e| Error::suite_parse(source, e))?;
        suite.validate()?;
        Ok(suite)
    }

    /// Load a suite from a YAML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::FileRead {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;
        Self::from_yaml(&path.display().to_string(), &content)
    }

    pub fn scenario_count(&self) -> usize {
        self.groups.iter().map(|g| g.scenarios.len()).sum()
    }

    /// Check names, fixture keys and timeouts of every scenario
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::suite_parse("<unnamed>", "suite name must not be empty"));
        }
        for group in &self.groups {
            if group.name.trim().is_empty() {
                return Err(Error::suite_parse(&self.name, "group name must not be empty"));
            }
            for scenario in &group.scenarios {
                scenario.preconditions()?;
                for key in scenario.capture.keys() {
                    if !is_valid_key(key) {
                        return Err(Error::invalid_scenario(
                            &scenario.name,
                            format!("invalid capture key '{}'", key),
                        ));
                    }
                }
                if scenario.timeout_secs == Some(0) {
                    return Err(Error::invalid_scenario(
                        &scenario.name,
                        "timeout_secs must be at least 1",
                    ));
                }
            }
        }
        Ok(())
    }
}

impl RequestSpec {
    fn collect_keys(&self, out: &mut Vec<String>) -> std::result::Result<(), String> {
        out.extend(template_keys(&self.path)?);
        for (_, value) in self.query.iter().chain(self.headers.iter()) {
            out.extend(template_keys(value)?);
        }
        if let Some(body) = &self.body {
            value_keys(body, out)?;
        }
        Ok(())
    }
}

impl Scenario {
    /// Every fixture key this scenario needs before it may run
    ///
    /// The union of `requires`, the `auth` key and every placeholder used
    /// by its requests and expected values, without duplicates.
    pub fn preconditions(&self) -> Result<Vec<String>> {
        let invalid = |reason: String| Error::invalid_scenario(&self.name, reason);

        let mut keys = self.requires.clone();
        keys.extend(self.auth.iter().cloned());
        for spec in self.setup.iter().chain(std::iter::once(&self.request)) {
            spec.collect_keys(&mut keys).map_err(invalid)?;
        }
        for assertion in &self.expect.body {
            if let Assertion::ExactMatch { value, .. } = assertion {
                value_keys(value, &mut keys).map_err(invalid)?;
            }
        }

        if let Some(bad) = keys.iter().find(|k| !is_valid_key(k)) {
            return Err(invalid(format!("invalid fixture key '{}'", bad)));
        }

        let mut seen = std::collections::HashSet::new();
        keys.retain(|k| seen.insert(k.clone()));
        Ok(keys)
    }
}
