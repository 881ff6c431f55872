//! Wildcard Pattern Validation and Matching
//!
//! Textual identifiers are dot separated. When registering, a `*` stands for
//! one non-empty, dot-free run of characters and a trailing `.**` segment
//! stands for zero or more further segments. Emitted identifiers are always
//! concrete.
//!
//! | pattern            | matches                               | does not match              |
//! |--------------------|---------------------------------------|-----------------------------|
//! | `evt.*`            | `evt.3`, `evt.name`                   | `evt.3.x`, `evt`            |
//! | `user.*.settings`  | `user.admin.settings`                 | `user.admin.settings.x`     |
//! | `user.**`          | `user`, `user.login`, `user.a.b.c`    | `users`, `admin.user`       |

use regex::Regex;

use crate::bus::error::{BusError, BusResult};
use crate::bus::identifier::{EventId, SEGMENT_SEPARATOR, WILDCARD};

/// Canonical multi-segment wildcard token
pub const MULTI_WILDCARD: &str = "**";

/// Most wildcard markers a single pattern may carry
pub const MAX_WILDCARDS: usize = 2;

/// Validate an identifier used with `on`/`once`.
///
/// Opaque identifiers always pass.
pub fn validate_for_registration(identifier: &EventId) -> BusResult<()> {
    match identifier.as_text() {
        Some(text) => {
            check_registration(text).map_err(|reason| BusError::invalid_identifier(text, reason))
        }
        None => Ok(()),
    }
}

/// Validate an identifier used with `emit`.
///
/// Opaque identifiers always pass.
pub fn validate_for_emission(identifier: &EventId) -> BusResult<()> {
    match identifier.as_text() {
        Some(text) => {
            check_emission(text).map_err(|reason| BusError::invalid_identifier(text, reason))
        }
        None => Ok(()),
    }
}

fn check_separators(text: &str) -> Result<(), &'static str> {
    if text.starts_with(SEGMENT_SEPARATOR) {
        return Err("identifier must not start with '.'");
    }
    if text.ends_with(SEGMENT_SEPARATOR) {
        return Err("identifier must not end with '.'");
    }
    Ok(())
}

fn check_registration(text: &str) -> Result<(), &'static str> {
    check_separators(text)?;

    let wildcards = text.matches(WILDCARD).count();
    if wildcards == 0 {
        return Ok(());
    }
    if text.contains("***") {
        return Err("three or more consecutive '*' are not allowed");
    }
    if wildcards > MAX_WILDCARDS {
        return Err("a pattern may contain at most two '*'");
    }
    if text == "*" || text == MULTI_WILDCARD {
        return Err("a pattern cannot consist of a wildcard alone");
    }

    if text.contains(MULTI_WILDCARD) {
        // With at most two markers the run is the only wildcard, so '**'
        // can never be mixed with a single '*' past this point.
        let tail = format!("{}{}", SEGMENT_SEPARATOR, MULTI_WILDCARD);
        if !text.ends_with(&tail) {
            return Err("'**' is only allowed as the whole final segment, as in 'prefix.**'");
        }
        return Ok(());
    }

    let bytes = text.as_bytes();
    for (index, byte) in bytes.iter().enumerate() {
        if *byte != b'*' {
            continue;
        }
        let preceded = index > 0 && bytes[index - 1] == b'.';
        let followed = bytes.get(index + 1) == Some(&b'.');
        if !preceded && !followed {
            return Err("every '*' must be directly preceded or followed by '.'");
        }
    }
    Ok(())
}

fn check_emission(text: &str) -> Result<(), &'static str> {
    if text.contains(WILDCARD) {
        return Err("emitted identifiers must be concrete and cannot contain '*'");
    }
    check_separators(text)
}

/// Whether a registered textual pattern matches a concrete identifier.
///
/// Assumes `pattern` already passed registration validation; an invalid
/// pattern only ever matches itself.
pub fn matches(pattern: &str, concrete: &str) -> bool {
    if pattern == concrete {
        return true;
    }
    if !pattern.contains(WILDCARD) {
        return false;
    }
    CompiledPattern::compile(pattern)
        .map(|compiled| compiled.is_match(concrete))
        .unwrap_or(false)
}

/// A wildcard pattern compiled once to an anchored regular expression
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    source: String,
    regex: Regex,
}

impl CompiledPattern {
    /// Compile a registration pattern
    pub fn compile(pattern: &str) -> BusResult<Self> {
        let multi_tail = format!("{}{}", SEGMENT_SEPARATOR, MULTI_WILDCARD);
        let expression = match pattern.strip_suffix(multi_tail.as_str()) {
            Some(prefix) => format!(r"^{}(?:\.(?s:.+))?$", translate_segments(prefix)),
            None => format!("^{}$", translate_segments(pattern)),
        };

        let regex = Regex::new(&expression)
            .map_err(|e| BusError::invalid_identifier(pattern, e.to_string()))?;

        Ok(Self {
            source: pattern.to_string(),
            regex,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn is_match(&self, concrete: &str) -> bool {
        self.source == concrete || self.regex.is_match(concrete)
    }
}

/// Escape literal text, turning each `*` into one dot-free run
fn translate_segments(text: &str) -> String {
    text.split(WILDCARD)
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join("[^.]+")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn registration_ok(text: &str) -> bool {
        validate_for_registration(&EventId::from(text)).is_ok()
    }

    fn emission_ok(text: &str) -> bool {
        validate_for_emission(&EventId::from(text)).is_ok()
    }

    #[test]
    fn test_registration_accepts_valid_patterns() {
        for text in [
            "user",
            "user.login",
            "evt.*",
            "*.created",
            "evt.*.*",
            "user.*.settings",
            "user.**",
            "a.*b",
            "a*.b",
        ] {
            assert!(registration_ok(text), "expected '{}' to be valid", text);
        }
    }

    #[test]
    fn test_registration_rejects_invalid_patterns() {
        for text in [
            ".user",
            "user.",
            "*",
            "**",
            "a.***",
            "a.*.*.*",
            "a*b",
            "a.b*c.d",
            "**.a",
            "a.**.b",
            "a.b**",
            "*.**",
            "a.*.**",
        ] {
            assert!(!registration_ok(text), "expected '{}' to be rejected", text);
        }
    }

    #[test]
    fn test_registration_error_explains_rule() {
        let err = validate_for_registration(&EventId::from("a.***")).unwrap_err();
        match err {
            BusError::InvalidIdentifier { identifier, reason } => {
                assert_eq!(identifier, "a.***");
                assert!(reason.contains("consecutive"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_emission_rules() {
        assert!(emission_ok("user.login"));
        assert!(emission_ok("user"));
        assert!(!emission_ok("user.*"));
        assert!(!emission_ok("user.**"));
        assert!(!emission_ok(".user"));
        assert!(!emission_ok("user."));
    }

    #[test]
    fn test_opaque_identifiers_skip_validation() {
        assert!(validate_for_registration(&EventId::from(7)).is_ok());
        assert!(validate_for_emission(&EventId::from(7)).is_ok());
    }

    #[test]
    fn test_single_segment_wildcard() {
        assert!(matches("evt.*", "evt.3"));
        assert!(matches("evt.*", "evt.name"));
        assert!(!matches("evt.*", "evt."));
        assert!(!matches("evt.*", "evt"));
        assert!(!matches("evt.*", "evt.x.y"));
        assert!(!matches("evt.*", "other.x"));
    }

    #[test]
    fn test_internal_wildcard_segment() {
        assert!(matches("user.*.settings", "user.admin.settings"));
        assert!(!matches("user.*.settings", "user.admin.profile"));
        assert!(!matches("user.*.settings", "user.admin.settings.x"));
        assert!(!matches("user.*.settings", "user.settings"));
    }

    #[test]
    fn test_multi_segment_wildcard() {
        assert!(matches("user.**", "user"));
        assert!(matches("user.**", "user.login"));
        assert!(matches("user.**", "user.a.b.c"));
        assert!(!matches("user.**", "users"));
        assert!(!matches("user.**", "admin.user"));
    }

    #[test]
    fn test_partial_segment_wildcard() {
        assert!(matches("a.*b", "a.xb"));
        assert!(!matches("a.*b", "a.b"));
        assert!(!matches("a.*b", "a.x.b"));
    }

    #[test]
    fn test_exact_match_always_wins() {
        assert!(matches("user.login", "user.login"));
        assert!(!matches("user.login", "user.logout"));
        assert!(matches("evt.*", "evt.*"));
    }

    #[test]
    fn test_literal_characters_are_escaped() {
        assert!(matches("price.(usd).*", "price.(usd).today"));
        assert!(!matches("a+.*", "aa.x"));
    }

    #[test]
    fn test_compiled_pattern_keeps_source() {
        let compiled = CompiledPattern::compile("evt.*.*").unwrap();
        assert_eq!(compiled.source(), "evt.*.*");
        assert!(compiled.is_match("evt.4.a"));
        assert!(!compiled.is_match("evt.4"));
    }

    fn segment() -> impl Strategy<Value = String> {
        "[a-z0-9_]{1,8}"
    }

    proptest! {
        #[test]
        fn prop_concrete_identifiers_match_themselves(parts in prop::collection::vec(segment(), 1..6)) {
            let concrete = parts.join(".");
            prop_assert!(emission_ok(&concrete));
            prop_assert!(registration_ok(&concrete));
            prop_assert!(matches(&concrete, &concrete));
        }

        #[test]
        fn prop_trailing_multi_wildcard_matches_any_extension(
            prefix in prop::collection::vec(segment(), 1..4),
            rest in prop::collection::vec(segment(), 0..4),
        ) {
            let pattern = format!("{}.**", prefix.join("."));
            let mut parts = prefix.clone();
            parts.extend(rest);
            prop_assert!(registration_ok(&pattern));
            prop_assert!(matches(&pattern, &parts.join(".")));
        }

        #[test]
        fn prop_single_wildcard_replaces_exactly_one_segment(
            parts in prop::collection::vec(segment(), 2..6),
            position in 0usize..6,
            extra in segment(),
        ) {
            let position = position % parts.len();
            let mut pattern_parts = parts.clone();
            pattern_parts[position] = "*".to_string();
            let pattern = pattern_parts.join(".");

            prop_assert!(registration_ok(&pattern));
            prop_assert!(matches(&pattern, &parts.join(".")));

            let mut longer = parts.clone();
            longer.push(extra);
            prop_assert!(!matches(&pattern, &longer.join(".")));
        }
    }
}
