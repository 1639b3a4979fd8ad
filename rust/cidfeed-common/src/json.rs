//! Defensive JSON decoding.
//!
//! Persisted blobs and imported files are untrusted. Decoding therefore never
//! fails loudly: a malformed document becomes `None` (or an empty list), and a
//! malformed element inside an otherwise well-formed list is dropped.

use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use thiserror::Error;

/// Error produced when a value cannot be rendered as JSON.
#[derive(Debug, Error)]
#[error("Failed to encode {what} as JSON: {source}")]
pub struct EncodeError {
    what: &'static str,
    #[source]
    source: serde_json::Error,
}

/// Encodes a value as compact JSON.
///
/// # Errors
///
/// Returns [`EncodeError`] if the value's `Serialize` implementation fails.
pub fn encode<T: Serialize>(what: &'static str, value: &T) -> Result<String, EncodeError> {
    serde_json::to_string(value).map_err(|source| EncodeError { what, source })
}

/// Decodes a single value, yielding `None` on any structural, type or
/// invariant violation.
pub fn decode<T: DeserializeOwned>(what: &'static str, input: &str) -> Option<T> {
    match serde_json::from_str(input) {
        Ok(value) => Some(value),
        Err(error) => {
            tracing::warn!(what, %error, "Discarding malformed document");
            None
        }
    }
}

/// Decodes a JSON array element by element.
///
/// Anything other than an array yields an empty list; elements that fail to
/// decode are dropped while the rest are kept in order.
pub fn decode_list<T: DeserializeOwned>(what: &'static str, input: &str) -> Vec<T> {
    let Some(elements) = decode::<Vec<Value>>(what, input) else {
        return Vec::new();
    };
    let total = elements.len();
    let decoded: Vec<T> = elements
        .into_iter()
        .filter_map(|element| serde_json::from_value(element).ok())
        .collect();
    if decoded.len() != total {
        tracing::warn!(
            what,
            dropped = total - decoded.len(),
            "Dropped malformed list elements"
        );
    }
    decoded
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Sample {
        name: String,
        count: u32,
    }

    #[test]
    fn it_decodes_well_formed_documents() {
        let sample: Option<Sample> = decode("sample", r#"{"name":"a","count":1}"#);
        assert_eq!(
            sample,
            Some(Sample {
                name: "a".into(),
                count: 1
            })
        );
    }

    #[test]
    fn it_yields_none_for_garbage() {
        assert_eq!(decode::<Sample>("sample", "not json"), None);
        assert_eq!(decode::<Sample>("sample", r#"{"name":1}"#), None);
        assert_eq!(decode::<Sample>("sample", ""), None);
    }

    #[test]
    fn it_drops_malformed_list_elements() {
        let list: Vec<Sample> = decode_list(
            "samples",
            r#"[{"name":"a","count":1},{"name":"b"},42,{"name":"c","count":3}]"#,
        );
        assert_eq!(
            list.iter().map(|s| s.name.as_str()).collect::<Vec<_>>(),
            vec!["a", "c"]
        );
    }

    #[test]
    fn it_yields_an_empty_list_for_non_arrays() {
        assert!(decode_list::<Sample>("samples", "not json").is_empty());
        assert!(decode_list::<Sample>("samples", r#"{"name":"a","count":1}"#).is_empty());
    }

    #[test]
    fn it_encodes_compact_json() {
        let json = encode(
            "sample",
            &Sample {
                name: "x".into(),
                count: 2,
            },
        )
        .unwrap();
        assert_eq!(json, r#"{"name":"x","count":2}"#);
    }
}
