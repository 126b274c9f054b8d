use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::moodle::tools::error::{Result, ToolError};

/// Decoded result of a successful Moodle web service call.
///
/// Values are addressed with paths such as `cohorts[0].name`: segments are
/// separated by `.`, each segment names an object key and may be followed by
/// one or more `[n]` array indices. A segment made only of digits also
/// indexes into an array, so `cohorts.0.name` is equivalent. The empty path
/// addresses the root value.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    value: Value,
}

impl Response {
    pub fn new(value: Value) -> Self {
        Self { value }
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn into_value(self) -> Value {
        self.value
    }

    /// Looks up the value at `path`, if any.
    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut current = &self.value;
        for step in parse_path(path)? {
            current = match step {
                Step::Key(key) => match current {
                    Value::Object(map) => map.get(key)?,
                    Value::Array(items) => items.get(key.parse::<usize>().ok()?)?,
                    _ => return None,
                },
                Step::Index(index) => current.as_array()?.get(index)?,
            };
        }
        Some(current)
    }

    pub fn get_string(&self, path: &str) -> Result<&str> {
        self.require(path)?
            .as_str()
            .ok_or_else(|| ToolError::unexpected(path, "a string"))
    }

    pub fn get_i64(&self, path: &str) -> Result<i64> {
        self.require(path)?
            .as_i64()
            .ok_or_else(|| ToolError::unexpected(path, "an integer"))
    }

    pub fn get_list(&self, path: &str) -> Result<&[Value]> {
        self.require(path)?
            .as_array()
            .map(Vec::as_slice)
            .ok_or_else(|| ToolError::unexpected(path, "a list"))
    }

    /// Deserializes the value at `path` into `T`.
    pub fn deserialize<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let value = self.require(path)?.clone();
        serde_json::from_value(value).map_err(|error| ToolError::unexpected(path, error.to_string()))
    }

    fn require(&self, path: &str) -> Result<&Value> {
        self.get(path)
            .ok_or_else(|| ToolError::unexpected(path, "a value"))
    }
}

impl From<Value> for Response {
    fn from(value: Value) -> Self {
        Self::new(value)
    }
}

#[derive(Debug, PartialEq)]
enum Step<'a> {
    Key(&'a str),
    Index(usize),
}

/// Splits a path into steps, or `None` when brackets are malformed.
fn parse_path(path: &str) -> Option<Vec<Step<'_>>> {
    let mut steps = Vec::new();
    if path.is_empty() {
        return Some(steps);
    }

    for segment in path.split('.') {
        let (key, mut rest) = match segment.find('[') {
            Some(start) => segment.split_at(start),
            None => (segment, ""),
        };
        if !key.is_empty() {
            steps.push(Step::Key(key));
        }
        while !rest.is_empty() {
            let close = rest.find(']')?;
            let index = rest.get(1..close)?.parse().ok()?;
            steps.push(Step::Index(index));
            rest = &rest[close + 1..];
            if !rest.is_empty() && !rest.starts_with('[') {
                return None;
            }
        }
    }

    Some(steps)
}
