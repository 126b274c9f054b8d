//! Flattening of nested call arguments into Moodle's REST parameter encoding.
//!
//! Moodle's REST server expects structured parameters as a flat form where the
//! key spells out the path through the structure:
//!
//! ```text
//! {"courses": [{"id": 1, "name": "course1"}]}
//!   => courses[0][id]=1&courses[0][name]=course1
//! ```

use serde_json::Value;

/// Insertion-ordered set of `(key, scalar)` pairs produced by [`flatten`].
///
/// Keys are unique. Inserting an existing key replaces its value but keeps
/// its original position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlatParameters {
    entries: Vec<(String, Value)>,
}

impl FlatParameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == key) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }

    /// Renders the parameters as string pairs ready for form encoding.
    ///
    /// Strings are sent verbatim, numbers in JSON notation and booleans as
    /// `1`/`0`, which Moodle's `PARAM_BOOL` cleaning accepts. Null entries are
    /// left out of the form entirely.
    pub fn to_form_pairs(&self) -> Vec<(String, String)> {
        self.entries
            .iter()
            .filter_map(|(key, value)| {
                let rendered = match value {
                    Value::Null => return None,
                    Value::String(text) => text.clone(),
                    Value::Bool(true) => "1".to_string(),
                    Value::Bool(false) => "0".to_string(),
                    Value::Number(number) => number.to_string(),
                    // flatten never stores containers, but a caller inserting
                    // one by hand still gets a deterministic rendering.
                    other => other.to_string(),
                };
                Some((key.clone(), rendered))
            })
            .collect()
    }
}

impl IntoIterator for FlatParameters {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Flattens `value` into a fresh parameter set.
pub fn flatten(value: &Value) -> FlatParameters {
    let mut out = FlatParameters::new();
    flatten_into(value, "", &mut out);
    out
}

/// Flattens `value` under `prefix`, appending to `out`.
///
/// Scalars (including null) are stored as-is under `prefix`. Arrays recurse
/// with their zero-based index and objects with their keys, both in order.
/// Uses an explicit work stack so arbitrarily deep input cannot overflow the
/// call stack.
pub fn flatten_into<'a>(
    value: &Value,
    prefix: &str,
    out: &'a mut FlatParameters,
) -> &'a mut FlatParameters {
    let mut pending: Vec<(&Value, String)> = vec![(value, prefix.to_string())];

    while let Some((current, path)) = pending.pop() {
        match current {
            Value::Array(items) => {
                for (index, item) in items.iter().enumerate().rev() {
                    pending.push((item, child_path(&path, &index.to_string())));
                }
            }
            Value::Object(map) => {
                for (key, item) in map.iter().rev() {
                    pending.push((item, child_path(&path, key)));
                }
            }
            scalar => out.insert(path, scalar.clone()),
        }
    }

    out
}

fn child_path(prefix: &str, segment: &str) -> String {
    if prefix.is_empty() {
        segment.to_string()
    } else {
        format!("{prefix}[{segment}]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Map, json};

    fn pairs(params: &FlatParameters) -> Vec<(String, Value)> {
        params
            .iter()
            .map(|(key, value)| (key.to_string(), value.clone()))
            .collect()
    }

    /// Rebuilds a tree from bracket paths. Objects whose keys are exactly
    /// `0..n` are turned back into arrays.
    fn unflatten(params: &FlatParameters) -> Value {
        let mut root = Value::Object(Map::new());
        for (key, value) in params.iter() {
            let segments = parse_path(key);
            let (last, parents) = segments.split_last().expect("non-empty path");
            let mut cursor = &mut root;
            for segment in parents {
                cursor = cursor
                    .as_object_mut()
                    .expect("object node")
                    .entry(segment.clone())
                    .or_insert_with(|| Value::Object(Map::new()));
            }
            cursor
                .as_object_mut()
                .expect("object node")
                .insert(last.clone(), value.clone());
        }
        restore_arrays(root)
    }

    fn parse_path(key: &str) -> Vec<String> {
        match key.find('[') {
            None => vec![key.to_string()],
            Some(start) => {
                let mut segments = vec![key[..start].to_string()];
                segments.extend(
                    key[start..]
                        .split('[')
                        .filter(|part| !part.is_empty())
                        .map(|part| part.trim_end_matches(']').to_string()),
                );
                segments
            }
        }
    }

    fn restore_arrays(value: Value) -> Value {
        match value {
            Value::Object(map) => {
                let is_sequence = !map.is_empty()
                    && map
                        .keys()
                        .enumerate()
                        .all(|(index, key)| key == &index.to_string());
                if is_sequence {
                    Value::Array(map.into_iter().map(|(_, item)| restore_arrays(item)).collect())
                } else {
                    Value::Object(
                        map.into_iter()
                            .map(|(key, item)| (key, restore_arrays(item)))
                            .collect(),
                    )
                }
            }
            other => other,
        }
    }

    #[test]
    fn flattens_list_of_objects() {
        let params = flatten(&json!({"courses": [{"id": 1, "name": "course1"}]}));
        assert_eq!(
            pairs(&params),
            vec![
                ("courses[0][id]".to_string(), json!(1)),
                ("courses[0][name]".to_string(), json!("course1")),
            ]
        );
    }

    #[test]
    fn flattens_scalar_list_in_index_order() {
        let params = flatten(&json!({"ids": [10, 20, 30]}));
        assert_eq!(
            pairs(&params),
            vec![
                ("ids[0]".to_string(), json!(10)),
                ("ids[1]".to_string(), json!(20)),
                ("ids[2]".to_string(), json!(30)),
            ]
        );
    }

    #[test]
    fn empty_object_yields_nothing() {
        assert!(flatten(&json!({})).is_empty());
    }

    #[test]
    fn top_level_scalar_entry_keeps_its_name() {
        let params = flatten(&json!({"a": 1}));
        assert_eq!(pairs(&params), vec![("a".to_string(), json!(1))]);
    }

    #[test]
    fn preserves_object_insertion_order() {
        let params = flatten(&json!({"zeta": 1, "alpha": 2, "mid": {"y": 3, "b": 4}}));
        let keys: Vec<&str> = params.keys().collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid[y]", "mid[b]"]);
    }

    #[test]
    fn top_level_array_uses_bare_indices() {
        let params = flatten(&json!([["a", "b"], "c"]));
        let keys: Vec<&str> = params.keys().collect();
        assert_eq!(keys, vec!["0[0]", "0[1]", "1"]);
    }

    #[test]
    fn null_passes_through() {
        let params = flatten(&json!({"maybe": null}));
        assert_eq!(params.get("maybe"), Some(&Value::Null));
    }

    #[test]
    fn flatten_into_respects_prefix_and_existing_entries() {
        let mut out = FlatParameters::new();
        out.insert("wstoken", "secret");
        flatten_into(&json!([{"key": "id", "value": "42"}]), "criteria", &mut out);

        let keys: Vec<&str> = out.keys().collect();
        assert_eq!(
            keys,
            vec!["wstoken", "criteria[0][key]", "criteria[0][value]"]
        );
    }

    #[test]
    fn insert_replaces_in_place() {
        let mut params = flatten(&json!({"a": 1, "b": 2}));
        params.insert("a", 3);
        assert_eq!(
            pairs(&params),
            vec![("a".to_string(), json!(3)), ("b".to_string(), json!(2))]
        );
    }

    #[test]
    fn deep_nesting_does_not_overflow() {
        let mut value = json!("leaf");
        for _ in 0..1_000 {
            value = json!([value]);
        }
        let params = flatten(&json!({"deep": value}));
        assert_eq!(params.len(), 1);
        let key = params.keys().next().unwrap();
        assert!(key.starts_with("deep[0][0]"));
        assert_eq!(key.matches("[0]").count(), 1_000);
    }

    #[test]
    fn form_pairs_render_scalars() {
        let params = flatten(&json!({
            "name": "2526_eleves",
            "id": 7,
            "ratio": 0.5,
            "visible": true,
            "hidden": false,
            "skip": null
        }));

        assert_eq!(
            params.to_form_pairs(),
            vec![
                ("name".to_string(), "2526_eleves".to_string()),
                ("id".to_string(), "7".to_string()),
                ("ratio".to_string(), "0.5".to_string()),
                ("visible".to_string(), "1".to_string()),
                ("hidden".to_string(), "0".to_string()),
            ]
        );
    }

    #[test]
    fn unflatten_reconstructs_tree() {
        let trees = [
            json!({"courses": [{"id": 1, "fullname": "My favorite course"}]}),
            json!({
                "query": "",
                "context": {"contextlevel": "coursecat", "instanceid": "12"},
                "includes": "self",
                "limitfrom": 0,
                "limitnum": 10000
            }),
            json!({
                "cohorts": [
                    {"categorytype": {"type": "id", "value": "3"}, "name": "a", "idnumber": "a"},
                    {"categorytype": {"type": "id", "value": "3"}, "name": "b", "idnumber": "b"}
                ]
            }),
            json!({"matrix": [[1, 2], [3, [4, 5]]], "flag": true}),
        ];

        for tree in trees {
            assert_eq!(unflatten(&flatten(&tree)), tree);
        }
    }
}
