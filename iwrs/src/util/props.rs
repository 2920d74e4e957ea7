//! Typed access to iwd property maps.
//!
//! iwd reports properties as D-Bus variants. These helpers pull out the
//! handful of shapes the object graph needs (booleans, strings, object paths
//! and string arrays) and report missing required values with the offending
//! object path.

use zvariant::Value;

use crate::api::models::{IwdError, PropertyMap};
use crate::Result;

fn value<'a>(props: &'a PropertyMap, name: &str) -> Option<&'a Value<'static>> {
    props.get(name).map(|v| &**v)
}

/// Reads a boolean property.
pub(crate) fn bool_opt(props: &PropertyMap, name: &str) -> Option<bool> {
    match value(props, name)? {
        Value::Bool(b) => Some(*b),
        _ => None,
    }
}

/// Reads a string or object path property.
pub(crate) fn str_opt<'a>(props: &'a PropertyMap, name: &str) -> Option<&'a str> {
    match value(props, name)? {
        Value::Str(s) => Some(s.as_str()),
        Value::ObjectPath(p) => Some(p.as_str()),
        _ => None,
    }
}

/// Reads a string array property, skipping non-string elements.
pub(crate) fn string_list(props: &PropertyMap, name: &str) -> Vec<String> {
    match value(props, name) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| match item {
                Value::Str(s) => Some(s.as_str().to_owned()),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

fn invalid(path: &str, property: &str) -> IwdError {
    IwdError::InvalidProperty {
        path: path.to_string(),
        property: property.to_string(),
    }
}

/// Reads a required string property of the object at `path`.
pub(crate) fn required_str(path: &str, props: &PropertyMap, name: &str) -> Result<String> {
    str_opt(props, name)
        .map(str::to_owned)
        .ok_or_else(|| invalid(path, name))
}

/// Reads a required boolean property of the object at `path`.
pub(crate) fn required_bool(path: &str, props: &PropertyMap, name: &str) -> Result<bool> {
    bool_opt(props, name).ok_or_else(|| invalid(path, name))
}

/// Builds an owned variant for property maps in tests.
#[cfg(test)]
pub(crate) fn owned<'a>(v: impl Into<Value<'a>>) -> zvariant::OwnedValue {
    v.into().try_to_owned().expect("test value has no file descriptors")
}

/// Builds a property map from `(name, value)` pairs in tests.
#[cfg(test)]
pub(crate) fn prop_map<'a, const N: usize>(entries: [(&str, Value<'a>); N]) -> PropertyMap {
    entries
        .into_iter()
        .map(|(k, v)| (k.to_string(), owned(v)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use zvariant::ObjectPath;

    fn sample() -> PropertyMap {
        prop_map([
            ("Name", Value::from("wlan0")),
            ("Powered", Value::from(true)),
            (
                "Adapter",
                Value::from(ObjectPath::try_from("/net/connman/iwd/0").unwrap()),
            ),
            ("SupportedModes", Value::from(vec!["station", "ap"])),
            ("Count", Value::from(3u32)),
        ])
    }

    #[test]
    fn test_bool_opt() {
        let props = sample();
        assert_eq!(bool_opt(&props, "Powered"), Some(true));
        assert_eq!(bool_opt(&props, "Name"), None);
        assert_eq!(bool_opt(&props, "Missing"), None);
    }

    #[test]
    fn test_str_opt_accepts_strings_and_paths() {
        let props = sample();
        assert_eq!(str_opt(&props, "Name"), Some("wlan0"));
        assert_eq!(str_opt(&props, "Adapter"), Some("/net/connman/iwd/0"));
        assert_eq!(str_opt(&props, "Count"), None);
    }

    #[test]
    fn test_string_list() {
        let props = sample();
        assert_eq!(string_list(&props, "SupportedModes"), vec!["station", "ap"]);
        assert!(string_list(&props, "Name").is_empty());
        assert!(string_list(&props, "Missing").is_empty());
    }

    #[test]
    fn test_required_reports_path_and_property() {
        let props = sample();
        assert_eq!(required_str("/p", &props, "Name").unwrap(), "wlan0");
        match required_bool("/p", &props, "Scanning") {
            Err(IwdError::InvalidProperty { path, property }) => {
                assert_eq!(path, "/p");
                assert_eq!(property, "Scanning");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
