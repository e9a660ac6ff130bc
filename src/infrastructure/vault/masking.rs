//! # PAN Masking
//!
//! Masks card numbers inside free text (URLs, JSON bodies) before it is
//! logged. Both the query-string form `pan=<value>` and the JSON form
//! `"pan":"<value>"` are recognised.

use crate::domain::value_objects::mask_pan;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

#[allow(clippy::expect_used)]
static QUERY_PAN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(^|[?&])pan=([^&\s]+)").expect("valid query pan regex"));

#[allow(clippy::expect_used)]
static JSON_PAN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""pan"\s*:\s*"([^"]*)""#).expect("valid json pan regex"));

/// Returns `text` with every PAN value masked.
#[must_use]
pub fn mask_sensitive(text: &str) -> String {
    let masked = QUERY_PAN_RE.replace_all(text, |caps: &Captures<'_>| {
        format!("{}pan={}", &caps[1], mask_pan(&caps[2]))
    });
    JSON_PAN_RE
        .replace_all(&masked, |caps: &Captures<'_>| {
            format!(r#""pan":"{}""#, mask_pan(&caps[1]))
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn masks_query_string() {
        assert_eq!(
            mask_sensitive("http://vault/v1/cards?pan=4111111111111111&limit=1"),
            "http://vault/v1/cards?pan=************1111&limit=1"
        );
    }

    #[test]
    fn masks_json_body() {
        assert_eq!(
            mask_sensitive(r#"{"pan": "5555555555554444","holder":"A B"}"#),
            r#"{"pan":"************4444","holder":"A B"}"#
        );
    }

    #[test]
    fn masks_every_occurrence() {
        let text = r#"{"data":[{"pan":"4111111111111111"},{"pan":"4000000000000002"}]}"#;
        let masked = mask_sensitive(text);
        assert!(!masked.contains("4111111111111111"));
        assert!(!masked.contains("4000000000000002"));
        assert!(masked.contains("************0002"));
    }

    #[test]
    fn ignores_parameters_ending_in_pan() {
        let text = "http://vault/v1/cards?company=acme&japan=1234567890123&pan=4111111111111111";
        assert_eq!(
            mask_sensitive(text),
            "http://vault/v1/cards?company=acme&japan=1234567890123&pan=************1111"
        );
    }

    #[test]
    fn leaves_other_text_untouched() {
        let text = "GET /v1/sessions/abc?limit=1";
        assert_eq!(mask_sensitive(text), text);
    }

    proptest! {
        #[test]
        fn digits_never_leak(pan in "[0-9]{12,19}") {
            let masked = mask_sensitive(&format!("pan={pan}"));
            prop_assert!(!masked.contains(&pan));
            prop_assert!(masked.ends_with(&pan[pan.len() - 4..]));
        }
    }
}
