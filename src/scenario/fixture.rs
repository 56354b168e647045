//! Run-scoped fixture values and `${key}` template rendering

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// Values produced by earlier scenarios and consumed by later ones
///
/// Owned by the runner for the lifetime of one run. A key is only ever
/// written with a non-empty value, so a capture that comes back empty
/// cannot clobber a value an earlier scenario produced.
#[derive(Debug, Default, Clone, Serialize)]
pub struct FixtureContext {
    values: BTreeMap<String, Value>,
}

impl FixtureContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Present and non-empty
    pub fn is_present(&self, key: &str) -> bool {
        self.values.get(key).is_some_and(|v| !is_empty(v))
    }

    /// Store `value` under `key` unless it is empty
    ///
    /// Returns whether the context changed.
    pub fn merge(&mut self, key: &str, value: Option<&Value>) -> bool {
        match value {
            Some(v) if !is_empty(v) => {
                self.values.insert(key.to_string(), v.clone());
                true
            }
            _ => false,
        }
    }

    /// Keys from `required` that are absent or empty, in order
    pub fn missing<'a>(&self, required: impl IntoIterator<Item = &'a String>) -> Vec<String> {
        required
            .into_iter()
            .filter(|k| !self.is_present(k))
            .cloned()
            .collect()
    }

    /// Stringified value for use inside paths, headers and query strings
    pub fn get_str(&self, key: &str) -> Option<String> {
        self.get(key).filter(|v| !is_empty(v)).map(value_to_string)
    }

    /// Render a template into a string, substituting every `${key}`
    pub fn render_str(&self, template: &str) -> Result<String, Vec<String>> {
        self.render_with(template, str::to_string)
    }

    /// Render a URL path template
    ///
    /// Substituted values are percent-encoded as a single path segment, so
    /// a fixture holding `/`, `?` or `#` cannot change the request target.
    /// Literal text in the template is left as written.
    pub fn render_path(&self, template: &str) -> Result<String, Vec<String>> {
        self.render_with(template, encode_segment)
    }

    fn render_with(
        &self,
        template: &str,
        encode: impl Fn(&str) -> String,
    ) -> Result<String, Vec<String>> {
        let segments = parse_template(template).unwrap_or_else(|_| vec![Segment::Literal(template)]);
        let mut out = String::with_capacity(template.len());
        let mut missing = Vec::new();

        for segment in segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Key(key) => match self.get_str(key) {
                    Some(value) => out.push_str(&encode(&value)),
                    None => missing.push(key.to_string()),
                },
            }
        }

        if missing.is_empty() {
            Ok(out)
        } else {
            Err(missing)
        }
    }

    /// Render every string inside a JSON value
    ///
    /// A string consisting of exactly one placeholder is replaced by the
    /// fixture's raw JSON value, so arrays and objects survive intact.
    pub fn render_value(&self, value: &Value) -> Result<Value, Vec<String>> {
        match value {
            Value::String(s) => {
                if let Some(key) = sole_placeholder(s) {
                    return match self.get(key).filter(|v| !is_empty(v)) {
                        Some(v) => Ok(v.clone()),
                        None => Err(vec![key.to_string()]),
                    };
                }
                self.render_str(s).map(Value::String)
            }
            Value::Array(items) => {
                let mut missing = Vec::new();
                let mut rendered = Vec::with_capacity(items.len());
                for item in items {
                    match self.render_value(item) {
                        Ok(v) => rendered.push(v),
                        Err(keys) => missing.extend(keys),
                    }
                }
                if missing.is_empty() {
                    Ok(Value::Array(rendered))
                } else {
                    Err(missing)
                }
            }
            Value::Object(map) => {
                let mut missing = Vec::new();
                let mut rendered = serde_json::Map::with_capacity(map.len());
                for (k, v) in map {
                    match self.render_value(v) {
                        Ok(v) => {
                            rendered.insert(k.clone(), v);
                        }
                        Err(keys) => missing.extend(keys),
                    }
                }
                if missing.is_empty() {
                    Ok(Value::Object(rendered))
                } else {
                    Err(missing)
                }
            }
            other => Ok(other.clone()),
        }
    }
}

/// `null`, `""`, `[]` and `{}` count as empty
pub fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

/// Plain strings render without quotes, everything else as JSON text
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn encode_segment(value: &str) -> String {
    // form encoding writes spaces as '+', which a path would keep literally
    url::form_urlencoded::byte_serialize(value.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

#[derive(Debug, PartialEq)]
pub(crate) enum Segment<'a> {
    Literal(&'a str),
    Key(&'a str),
}

/// Split a template into literal text and `${key}` references
pub(crate) fn parse_template(template: &str) -> Result<Vec<Segment<'_>>, String> {
    let mut segments = Vec::new();
    let mut rest = template;

    while let Some(start) = rest.find("${") {
        if start > 0 {
            segments.push(Segment::Literal(&rest[..start]));
        }
        let after = &rest[start + 2..];
        let end = after
            .find('}')
            .ok_or_else(|| format!("unterminated placeholder in '{}'", template))?;
        let key = &after[..end];
        if !is_valid_key(key) {
            return Err(format!("invalid fixture key '{}' in '{}'", key, template));
        }
        segments.push(Segment::Key(key));
        rest = &after[end + 1..];
    }

    if !rest.is_empty() {
        segments.push(Segment::Literal(rest));
    }
    Ok(segments)
}

/// Fixture keys referenced by a template
pub(crate) fn template_keys(template: &str) -> Result<Vec<String>, String> {
    Ok(parse_template(template)?
        .into_iter()
        .filter_map(|s| match s {
            Segment::Key(k) => Some(k.to_string()),
            Segment::Literal(_) => None,
        })
        .collect())
}

/// Fixture keys referenced anywhere inside a JSON value
pub(crate) fn value_keys(value: &Value, out: &mut Vec<String>) -> Result<(), String> {
    match value {
        Value::String(s) => out.extend(template_keys(s)?),
        Value::Array(items) => {
            for item in items {
                value_keys(item, out)?;
            }
        }
        Value::Object(map) => {
            for v in map.values() {
                value_keys(v, out)?;
            }
        }
        _ => {}
    }
    Ok(())
}

pub(crate) fn is_valid_key(key: &str) -> bool {
    !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

fn sole_placeholder(s: &str) -> Option<&str> {
    match parse_template(s).ok()?.as_slice() {
        [Segment::Key(key)] => Some(*key),
        _ => None,
    }
}
