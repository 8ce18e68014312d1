// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Local input normalization: verification code shape and phone numbers.
//!
//! Codes are validated by shape only; correctness is delegated to the
//! provider. Phones are deliberately permissive, matching the provider's
//! own validation.

/// Characters stripped from a code before the shape check.
const CODE_SEPARATORS: [char; 4] = ['-', '(', ')', '/'];

/// Strip separators and whitespace, then accept 4-10 alphanumeric characters.
///
/// Returns the cleaned code, or `None` when the shape is invalid.
pub fn normalize_code(raw: &str) -> Option<String> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && !CODE_SEPARATORS.contains(c))
        .collect();

    let len = cleaned.chars().count();
    if (4..=10).contains(&len) && cleaned.chars().all(|c| c.is_alphanumeric()) {
        Some(cleaned)
    } else {
        None
    }
}

/// Strip whitespace and ensure a leading `+`.
///
/// No further validation: the provider rejects bad numbers itself.
pub fn normalize_phone(raw: &str) -> String {
    let stripped: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    if stripped.starts_with('+') {
        stripped
    } else {
        format!("+{stripped}")
    }
}

/// Parse a `"<api_id> <api_hash>"` pair.
///
/// The id must be a non-negative integer; the hash any non-empty token.
/// Returns `None` on any malformed input so the caller can re-prompt.
pub fn parse_credentials(raw: &str) -> Option<(i32, String)> {
    let mut parts = raw.split_whitespace();
    let id = parts.next()?.parse::<i32>().ok()?;
    if id < 0 {
        return None;
    }
    let hash = parts.next()?;
    if parts.next().is_some() || hash.is_empty() {
        return None;
    }
    Some((id, hash.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn accepts_boundary_lengths() {
        assert_eq!(normalize_code("1234").as_deref(), Some("1234"));
        assert_eq!(normalize_code("1234567890").as_deref(), Some("1234567890"));
    }

    #[test]
    fn rejects_out_of_range_lengths() {
        assert_eq!(normalize_code("123"), None);
        assert_eq!(normalize_code("12345678901"), None);
        assert_eq!(normalize_code(""), None);
    }

    #[test]
    fn strips_separators_before_checking() {
        assert_eq!(normalize_code("12 34").as_deref(), Some("1234"));
        assert_eq!(normalize_code("AB-12").as_deref(), Some("AB12"));
        assert_eq!(normalize_code("(12)3/4-5").as_deref(), Some("12345"));
    }

    #[test]
    fn rejects_non_alphanumeric_remainder() {
        assert_eq!(normalize_code("12.34"), None);
        assert_eq!(normalize_code("12_34"), None);
    }

    #[test]
    fn phone_gets_plus_prefix() {
        assert_eq!(normalize_phone("79990001122"), "+79990001122");
        assert_eq!(normalize_phone("+79990001122"), "+79990001122");
        assert_eq!(normalize_phone("7 999 000 11 22"), "+79990001122");
    }

    #[test]
    fn credentials_pair_parses() {
        assert_eq!(
            parse_credentials("12345 abcdef0123456789"),
            Some((12345, "abcdef0123456789".to_string()))
        );
    }

    #[test]
    fn credentials_rejects_malformed_input() {
        assert_eq!(parse_credentials("abc def"), None);
        assert_eq!(parse_credentials("-1 hash"), None);
        assert_eq!(parse_credentials("12345"), None);
        assert_eq!(parse_credentials("1 2 3"), None);
        assert_eq!(parse_credentials(""), None);
    }

    proptest! {
        #[test]
        fn valid_codes_always_pass(code in "[0-9a-zA-Z]{4,10}") {
            let cleaned = normalize_code(&code);
            prop_assert_eq!(cleaned.as_deref(), Some(code.as_str()));
        }

        #[test]
        fn separator_noise_never_changes_the_cleaned_code(
            code in "[0-9a-zA-Z]{4,10}",
            seps in proptest::collection::vec(0usize..5, 0..4),
        ) {
            // Sprinkle separators at arbitrary positions.
            let mut noisy = code.clone();
            for (i, sep_idx) in seps.iter().enumerate() {
                let sep = [' ', '-', '(', ')', '/'][*sep_idx];
                let pos = (i * 2).min(noisy.len());
                noisy.insert(pos, sep);
            }
            let cleaned = normalize_code(&noisy);
            prop_assert_eq!(cleaned.as_deref(), Some(code.as_str()));
        }

        #[test]
        fn too_long_codes_always_fail(code in "[0-9a-zA-Z]{11,20}") {
            prop_assert_eq!(normalize_code(&code), None);
        }
    }
}
