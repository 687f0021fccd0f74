//! Request URI template expansion.
//!
//! Operation bindings carry URI templates like `/things/{thingName}` or
//! `/objects/{key+}`. Plain labels percent-encode everything including
//! `/`; greedy labels (`+` suffix) keep `/` so a full object path can
//! occupy one label.

use std::collections::HashMap;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use wireshape_core::MarshallingError;

/// Path segment encode set: unreserved characters pass through.
const PATH_SEGMENT_ENCODE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Greedy label encode set: also keeps `/`.
const GREEDY_ENCODE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b'/');

/// Expand a URI template with the given label values.
///
/// # Errors
/// Fails with [`MarshallingError::MissingPathLabel`] when the template
/// references a label no member supplied.
pub(crate) fn expand_uri_template(
    template: &str,
    labels: &HashMap<String, String>,
) -> Result<String, MarshallingError> {
    let mut expanded = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        expanded.push_str(&rest[..open]);
        rest = &rest[open + 1..];

        let close = rest.find('}').ok_or_else(|| MarshallingError::MissingPathLabel {
            name: rest.to_owned(),
        })?;
        let label = &rest[..close];
        rest = &rest[close + 1..];

        let (name, greedy) = match label.strip_suffix('+') {
            Some(name) => (name, true),
            None => (label, false),
        };

        let value = labels
            .get(name)
            .ok_or_else(|| MarshallingError::MissingPathLabel {
                name: name.to_owned(),
            })?;

        let encode_set = if greedy { GREEDY_ENCODE } else { PATH_SEGMENT_ENCODE };
        expanded.extend(utf8_percent_encode(value, encode_set));
    }

    expanded.push_str(rest);
    Ok(expanded)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_no_labels_passthrough() {
        let expanded = expand_uri_template("/", &HashMap::new()).unwrap();
        assert_eq!(expanded, "/");
    }

    #[test]
    fn test_label_expansion_encodes() {
        let expanded =
            expand_uri_template("/things/{thingName}", &labels(&[("thingName", "a b/c")])).unwrap();
        assert_eq!(expanded, "/things/a%20b%2Fc");
    }

    #[test]
    fn test_greedy_label_keeps_slashes() {
        let expanded =
            expand_uri_template("/objects/{key+}", &labels(&[("key", "photos/2024/a b.png")]))
                .unwrap();
        assert_eq!(expanded, "/objects/photos/2024/a%20b.png");
    }

    #[test]
    fn test_missing_label_is_an_error() {
        let err = expand_uri_template("/things/{thingName}", &HashMap::new()).unwrap_err();
        assert!(matches!(
            err,
            MarshallingError::MissingPathLabel { name } if name == "thingName"
        ));
    }

    #[test]
    fn test_multiple_labels() {
        let expanded = expand_uri_template(
            "/{bucket}/keys/{key}",
            &labels(&[("bucket", "media"), ("key", "x")]),
        )
        .unwrap();
        assert_eq!(expanded, "/media/keys/x");
    }
}
