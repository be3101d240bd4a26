//! Small string, number and JSON value helpers.

use serde_json::Value;

/// Splits `value` on `separator`, optionally trimming every item. Empty items are dropped.
pub fn split_string_into_array(value: Option<&str>, separator: &str, trim: bool) -> Vec<String> {
    let value = match value {
        Some(value) => value,
        None => return Vec::new(),
    };
    value
        .split(separator)
        .map(|item| if trim { item.trim() } else { item })
        .filter(|item| !item.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Consecutive groups of at most `size` items. A `size` of zero yields no groups.
pub fn split_in_groups<T: Clone>(items: &[T], size: usize) -> Vec<Vec<T>> {
    if size == 0 {
        return Vec::new();
    }
    items.chunks(size).map(<[T]>::to_vec).collect()
}

pub fn capitalize_first_letter(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Keeps the first occurrence of every item.
pub fn without_duplicates<T: PartialEq + Clone>(items: &[T]) -> Vec<T> {
    let mut unique: Vec<T> = Vec::with_capacity(items.len());
    for item in items {
        if !unique.contains(item) {
            unique.push(item.clone());
        }
    }
    unique
}

/// Items of `items` that do not appear in `removed`.
pub fn difference<T: PartialEq + Clone>(items: &[T], removed: &[T]) -> Vec<T> {
    items
        .iter()
        .filter(|item| !removed.contains(item))
        .cloned()
        .collect()
}

pub fn strings_are_equal(a: Option<&str>, b: Option<&str>, ignore_case: bool) -> bool {
    match (a, b) {
        (Some(a), Some(b)) if ignore_case => a.to_lowercase() == b.to_lowercase(),
        _ => a == b,
    }
}

pub fn has_text(value: Option<&str>) -> bool {
    value.map_or(false, |value| !value.trim().is_empty())
}

pub fn has_no_text(value: Option<&str>) -> bool {
    !has_text(value)
}

pub fn xor(a: bool, b: bool) -> bool {
    a != b
}

pub fn is_valid_number(value: Option<f64>) -> bool {
    value.map_or(false, |value| !value.is_nan())
}

/// Whether a non-empty string reads as a number. Surrounding whitespace is ignored and a
/// string of only whitespace counts as zero.
pub fn string_is_valid_number(value: Option<&str>) -> bool {
    let value = match value {
        Some(value) if !value.is_empty() => value.trim(),
        _ => return false,
    };
    if value.is_empty() {
        return true;
    }
    let unsigned = value.trim_start_matches(&['+', '-'][..]);
    let finite_or_infinity = unsigned == "Infinity"
        || unsigned
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-'));
    finite_or_infinity && value.replace("Infinity", "inf").parse::<f64>().is_ok()
}

/// Cuts `value` after `max_fraction_digits` decimals instead of rounding. `None` yields NaN.
pub fn number_without_rounding(value: Option<f64>, max_fraction_digits: usize) -> f64 {
    let value = match value {
        Some(value) => value,
        None => return f64::NAN,
    };
    let digits = value.to_string();
    let truncated = match digits.find('.') {
        Some(dot) => &digits[..(dot + max_fraction_digits + 1).min(digits.len())],
        None => &digits[..],
    };
    truncated.trim_end_matches('.').parse().unwrap_or(f64::NAN)
}

/// Structural equality. Object members named in `except_keys` are not compared, at any depth.
pub fn deep_equal(a: &Value, b: &Value, except_keys: &[&str]) -> bool {
    match (a, b) {
        (Value::Object(a), Value::Object(b)) => {
            a.len() == b.len()
                && a.iter().all(|(key, value)| match b.get(key) {
                    Some(other) => {
                        value == other
                            || except_keys.contains(&key.as_str())
                            || deep_equal(value, other, except_keys)
                    }
                    None => false,
                })
        }
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len()
                && a
                    .iter()
                    .zip(b)
                    .all(|(value, other)| deep_equal(value, other, except_keys))
        }
        _ => a == b,
    }
}

/// Follows `path` through objects and arrays. Missing members and `null` give `None`.
pub fn nested_prop<'v>(value: &'v Value, path: &[&str]) -> Option<&'v Value> {
    if path.is_empty() {
        return None;
    }
    path.iter()
        .try_fold(value, |current, segment| match current {
            Value::Object(map) => map.get(*segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        })
        .filter(|found| !found.is_null())
}

#[cfg(test)]
mod test {
    use super::*;

    use serde_json::json;

    #[test]
    fn compares_primitives() {
        assert!(!deep_equal(&json!(4), &json!(5), &[]));
        assert!(deep_equal(&json!(4), &json!(4), &[]));
        assert!(!deep_equal(&json!("a"), &json!("b"), &[]));
        assert!(deep_equal(&json!("a"), &json!("a"), &[]));
        assert!(!deep_equal(&json!("true"), &json!(true), &[]));
        assert!(!deep_equal(&json!(true), &json!(1), &[]));
        assert!(!deep_equal(&json!(false), &Value::Null, &[]));
        assert!(deep_equal(&json!(false), &json!(false), &[]));
    }

    #[test]
    fn compares_nested_objects() {
        let a = json!({"key1": 3, "key2": "string", "key3": [4, "45", {"key4": [5, "6", false, null, {"v": 1}]}]});
        let b = json!({"key1": 3, "key2": "string", "key3": [4, "45", {"key4": [5, "6", false, null, {"v": 1}]}]});
        let c = json!({"key1": 3, "key2": "string", "key3": [4, "45", {"key4": [5, "6", null, null, {"v": 1}]}]});
        assert!(deep_equal(&a, &b, &[]));
        assert!(!deep_equal(&a, &c, &[]));
        assert!(!deep_equal(&json!({"a": 1}), &json!({"a": 1, "b": 2}), &[]));
        assert!(!deep_equal(&json!([1]), &json!({"0": 1}), &[]));
    }

    #[test]
    fn skips_excluded_keys_at_any_depth() {
        let a = json!({"key1": 3, "key2": "string1", "key3": [4, "45", {"key4": [5, "6", false, null, {"v": 1}]}]});
        let b = json!({"key1": 3, "key2": "string2", "key3": [4, "45", {"key4": [5, "6", false, null, {"v": 2}]}]});
        assert!(!deep_equal(&a, &b, &[]));
        assert!(!deep_equal(&a, &b, &["key2"]));
        assert!(deep_equal(&a, &b, &["key2", "v"]));
    }

    #[test]
    fn splits_strings() {
        assert_eq!(
            split_string_into_array(Some("1 2    3 4,5"), " ", true),
            vec!["1", "2", "3", "4,5"]
        );
        assert!(split_string_into_array(None, " ", true).is_empty());
        assert_eq!(
            split_string_into_array(Some("   1 2    3 4,5"), ",", false),
            vec!["   1 2    3 4", "5"]
        );
        assert_eq!(split_string_into_array(Some("a, ,b"), ",", true), vec!["a", "b"]);
    }

    #[test]
    fn splits_in_groups() {
        let items = vec!["a", "b", "c", "d", "e"];
        assert_eq!(
            split_in_groups(&items, 2),
            vec![vec!["a", "b"], vec!["c", "d"], vec!["e"]]
        );
        assert!(split_in_groups::<&str>(&[], 3).is_empty());
        assert!(split_in_groups(&items, 0).is_empty());
    }

    #[test]
    fn list_helpers() {
        assert_eq!(without_duplicates(&["a", "b", "a", "c", "b"]), vec!["a", "b", "c"]);
        assert_eq!(difference(&["a", "b", "c"], &["b"]), vec!["a", "c"]);
        assert_eq!(capitalize_first_letter("hello world"), "Hello world");
        assert_eq!(capitalize_first_letter("ßtraße"), "SStraße");
        assert_eq!(capitalize_first_letter(""), "");
    }

    #[test]
    fn string_equality() {
        assert!(strings_are_equal(Some("test"), Some("test"), false));
        assert!(strings_are_equal(Some("teSt"), Some("tEsT"), true));
        assert!(!strings_are_equal(Some("teSt"), Some("tEsT"), false));
        assert!(!strings_are_equal(Some("test"), None, false));
        assert!(strings_are_equal(None, None, true));
    }

    #[test]
    fn text_presence() {
        for value in [None, Some(""), Some("  "), Some("  \n\t")].iter() {
            assert!(!has_text(*value));
            assert!(has_no_text(*value));
        }
        for value in [Some(" 1 "), Some("test")].iter() {
            assert!(has_text(*value));
            assert!(!has_no_text(*value));
        }
    }

    #[test]
    fn exclusive_or() {
        assert!(!xor(true, true));
        assert!(xor(true, false));
        assert!(xor(false, true));
        assert!(!xor(false, false));
    }

    #[test]
    fn number_validity() {
        assert!(is_valid_number(Some(0.0)));
        assert!(!is_valid_number(Some(f64::NAN)));
        assert!(!is_valid_number(None));

        assert!(string_is_valid_number(Some("12.5")));
        assert!(string_is_valid_number(Some(" -3e2 ")));
        assert!(string_is_valid_number(Some("Infinity")));
        assert!(string_is_valid_number(Some("  ")));
        assert!(!string_is_valid_number(Some("")));
        assert!(!string_is_valid_number(None));
        assert!(!string_is_valid_number(Some("12px")));
        assert!(!string_is_valid_number(Some("NaN")));
        assert!(!string_is_valid_number(Some("inf")));
    }

    #[test]
    fn numbers_without_rounding() {
        assert!(number_without_rounding(None, 0).is_nan());

        let numbers = [2.0, 9.95, 9.9499, 0.356, 1.09, 1.001, 209.3501];
        let expected: [[f64; 7]; 5] = [
            [2.0, 9.0, 9.0, 0.0, 1.0, 1.0, 209.0],
            [2.0, 9.9, 9.9, 0.3, 1.0, 1.0, 209.3],
            [2.0, 9.95, 9.94, 0.35, 1.09, 1.0, 209.35],
            [2.0, 9.95, 9.949, 0.356, 1.09, 1.001, 209.35],
            [2.0, 9.95, 9.9499, 0.356, 1.09, 1.001, 209.3501],
        ];
        for (digits, row) in expected.iter().enumerate() {
            for (number, want) in numbers.iter().zip(row.iter()) {
                assert_eq!(number_without_rounding(Some(*number), digits), *want);
            }
        }
    }

    #[test]
    fn nested_props() {
        let value = json!({"a": {"b": [{"c": 1}, {"c": null}]}});
        assert_eq!(nested_prop(&value, &["a", "b", "0", "c"]), Some(&json!(1)));
        assert_eq!(nested_prop(&value, &["a", "b", "1", "c"]), None);
        assert_eq!(nested_prop(&value, &["a", "x"]), None);
        assert_eq!(nested_prop(&value, &[]), None);
    }
}
