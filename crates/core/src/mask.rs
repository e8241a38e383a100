//! Redaction and display helpers for sensitive and human-facing strings.

use sha2::{Digest, Sha256};

/// Mask an SSN keeping the first and last characters.
///
/// Inputs shorter than three characters collapse to `"##"`.
pub fn mask_ssn(ssn: &str) -> String {
    let chars: Vec<char> = ssn.chars().collect();
    if chars.len() < 3 {
        return "##".to_string();
    }
    let mut out = String::with_capacity(chars.len());
    out.push(chars[0]);
    out.extend(std::iter::repeat('#').take(chars.len() - 2));
    out.push(chars[chars.len() - 1]);
    out
}

/// Mask an account number as `<first>####<last4>`.
///
/// Numbers of four characters or fewer come out as `####<number>`, with no
/// leading character.
pub fn mask_account_number(number: &str) -> String {
    let chars: Vec<char> = number.trim().chars().collect();
    match chars.len() {
        0 => "####".to_string(),
        1..=4 => format!("####{}", chars.iter().collect::<String>()),
        n => {
            let last4: String = chars[n - 4..].iter().collect();
            format!("{}####{}", chars[0], last4)
        }
    }
}

/// Hex SHA-256 of the raw account number, used for uniqueness checks.
pub fn hash_account_number(number: &str) -> String {
    hex::encode(Sha256::digest(number.trim().as_bytes()))
}

/// Build the display name used for sanctions screening:
/// `first [middle] last [suffix]`, each part trimmed, whitespace collapsed.
pub fn format_customer_name(
    first: &str,
    middle: Option<&str>,
    last: &str,
    suffix: Option<&str>,
) -> String {
    let parts = [Some(first), middle, Some(last), suffix];
    collapse_whitespace(
        &parts
            .iter()
            .flatten()
            .map(|p| p.trim())
            .filter(|p| !p.is_empty())
            .collect::<Vec<_>>()
            .join(" "),
    )
}

/// Collapse runs of whitespace into single spaces and trim the ends.
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_ssn_boundaries() {
        assert_eq!(mask_ssn(""), "##");
        assert_eq!(mask_ssn("1"), "##");
        assert_eq!(mask_ssn("12"), "##");
        assert_eq!(mask_ssn("123"), "1#3");
        assert_eq!(mask_ssn("123456789"), "1#######9");
    }

    #[test]
    fn test_mask_account_number() {
        assert_eq!(mask_account_number("123456789"), "1####6789");
        assert_eq!(mask_account_number("12345"), "1####2345");
        assert_eq!(mask_account_number("123"), "####123");
        assert_eq!(mask_account_number("1234"), "####1234");
        assert_eq!(mask_account_number(""), "####");
    }

    #[test]
    fn test_hash_account_number() {
        let hashed = hash_account_number("123");
        assert_eq!(hashed.len(), 64);
        assert_eq!(hashed, hash_account_number(" 123 "));
        assert_ne!(hashed, hash_account_number("124"));
    }

    #[test]
    fn test_format_customer_name() {
        assert_eq!(format_customer_name("Jane", None, "Doe", None), "Jane Doe");
        assert_eq!(
            format_customer_name("  John ", Some(" Q "), "Public", Some("Jr.")),
            "John Q Public Jr."
        );
        assert_eq!(
            format_customer_name("Mary  Ann", Some(""), "Smith", None),
            "Mary Ann Smith"
        );
    }

    #[test]
    fn test_format_customer_name_is_idempotent() {
        let once = format_customer_name(" A  b ", Some("  c"), " d ", Some(" e  "));
        let twice = format_customer_name(&once, None, "", None);
        assert_eq!(once, twice);
        assert_eq!(once, "A b c d e");
    }
}
