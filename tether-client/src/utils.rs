//! Value predicates and deep merge.

use serde_json::{Map, Value};

/// Whether `value` is a plain key/value mapping.
pub fn is_plain_object(value: &Value) -> bool {
    value.is_object()
}

/// Whether `value` is a sequence.
pub fn is_array(value: &Value) -> bool {
    value.is_array()
}

/// Deep-merge mappings into a fresh object.
///
/// For every key of every source: two objects merge recursively, an incoming
/// object is deep-cloned, an incoming array is shallow-cloned, anything else
/// overwrites. Later sources win. Sources that are not objects are skipped.
/// No input is modified.
pub fn deep_merge(sources: &[&Value]) -> Value {
    let mut merged = Map::new();
    for source in sources {
        if let Value::Object(map) = source {
            merge_into(&mut merged, map);
        }
    }
    Value::Object(merged)
}

fn merge_into(target: &mut Map<String, Value>, source: &Map<String, Value>) {
    for (key, incoming) in source {
        match (target.get_mut(key), incoming) {
            (Some(Value::Object(existing)), Value::Object(incoming)) => {
                merge_into(existing, incoming);
            }
            (_, Value::Object(incoming)) => {
                let mut fresh = Map::new();
                merge_into(&mut fresh, incoming);
                target.insert(key.clone(), Value::Object(fresh));
            }
            (_, Value::Array(items)) => {
                target.insert(key.clone(), Value::Array(items.to_vec()));
            }
            (_, other) => {
                target.insert(key.clone(), other.clone());
            }
        }
    }
}

/// Key of an entry visited by [`for_each_entry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKey<'a> {
    Key(&'a str),
    Index(usize),
}

/// Visit object entries or array items in order. Scalars are ignored.
pub fn for_each_entry<'a>(value: &'a Value, mut visit: impl FnMut(EntryKey<'a>, &'a Value)) {
    match value {
        Value::Object(map) => map.iter().for_each(|(k, v)| visit(EntryKey::Key(k), v)),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .for_each(|(i, v)| visit(EntryKey::Index(i), v)),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_merge_does_not_mutate_inputs() {
        let a = json!({"header": {"x": 1}, "list": [1, 2]});
        let b = json!({"header": {"y": 2}, "list": [3]});
        let (a_before, b_before) = (a.clone(), b.clone());

        let merged = deep_merge(&[&a, &b]);

        assert_eq!(a, a_before);
        assert_eq!(b, b_before);
        assert_eq!(merged, json!({"header": {"x": 1, "y": 2}, "list": [3]}));
    }

    #[test]
    fn test_merge_with_self_is_idempotent() {
        let a = json!({"a": {"b": {"c": [1]}}, "d": "e"});
        assert_eq!(deep_merge(&[&a, &a]), a);
    }

    #[test]
    fn test_later_sources_win_and_scalars_replace_objects() {
        let a = json!({"k": {"nested": true}, "n": 1});
        let b = json!({"k": "flat", "n": 2});
        assert_eq!(deep_merge(&[&a, &b]), json!({"k": "flat", "n": 2}));
    }

    #[test]
    fn test_non_object_sources_are_skipped() {
        let a = json!({"a": 1});
        let merged = deep_merge(&[&Value::Null, &a, &json!([1, 2]), &json!("str")]);
        assert_eq!(merged, json!({"a": 1}));
        assert_eq!(deep_merge(&[]), json!({}));
    }

    #[test]
    fn test_arrays_are_copied() {
        let a = json!({"list": [{"id": 1}]});
        let mut merged = deep_merge(&[&a]);
        merged["list"].as_array_mut().unwrap().push(json!({"id": 2}));
        assert_eq!(a["list"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_for_each_entry_visits_in_order() {
        let object = json!({"b": 1, "a": 2});
        let mut seen = Vec::new();
        for_each_entry(&object, |k, v| seen.push((k, v.clone())));
        assert_eq!(
            seen,
            vec![(EntryKey::Key("b"), json!(1)), (EntryKey::Key("a"), json!(2))]
        );

        let mut count = 0;
        for_each_entry(&json!(["x", "y"]), |_, _| count += 1);
        for_each_entry(&json!(42), |_, _| count += 1);
        assert_eq!(count, 2);
    }

    #[test]
    fn test_predicates() {
        assert!(is_plain_object(&json!({})));
        assert!(!is_plain_object(&json!([])));
        assert!(is_array(&json!([])));
        assert!(!is_array(&Value::Null));
    }
}
