//! # Validators
//!
//! Shared payload checks: ABA routing numbers, US state abbreviations and
//! metadata limits.

use crate::error::{CoreError, CoreResult};
use std::collections::HashMap;

/// Maximum number of metadata entries on a customer.
pub const MAX_METADATA_ENTRIES: usize = 100;

/// Maximum metadata value length, in characters.
pub const MAX_METADATA_VALUE_LEN: usize = 1000;

/// US states, territories and the federal district.
const US_STATES: &[&str] = &[
    "AK", "AL", "AR", "AS", "AZ", "CA", "CO", "CT", "DC", "DE", "FL", "FM", "GA", "GU", "HI",
    "IA", "ID", "IL", "IN", "KS", "KY", "LA", "MA", "MD", "ME", "MH", "MI", "MN", "MO", "MP",
    "MS", "MT", "NC", "ND", "NE", "NH", "NJ", "NM", "NV", "NY", "OH", "OK", "OR", "PA", "PR",
    "PW", "RI", "SC", "SD", "TN", "TX", "UM", "UT", "VA", "VI", "VT", "WA", "WI", "WV", "WY",
    // Armed forces
    "AA", "AE", "AP",
];

/// Case-insensitive check against the US state/territory list.
pub fn is_us_state(state: &str) -> bool {
    let upper = state.trim().to_ascii_uppercase();
    US_STATES.contains(&upper.as_str())
}

/// Whether a free-form country value refers to the United States.
pub fn is_us_country(country: &str) -> bool {
    matches!(
        country.trim().to_ascii_uppercase().as_str(),
        "US" | "USA" | "UNITED STATES" | "UNITED STATES OF AMERICA"
    )
}

/// Validate a 9-digit ABA routing number including its checksum.
///
/// Weights are 3, 7, 1 repeated; the weighted digit sum must be a
/// multiple of 10.
pub fn validate_routing_number(routing: &str) -> CoreResult<()> {
    if routing.len() != 9 || !routing.bytes().all(|b| b.is_ascii_digit()) {
        return Err(CoreError::InvalidRoutingNumber(routing.to_string()));
    }

    const WEIGHTS: [u32; 9] = [3, 7, 1, 3, 7, 1, 3, 7, 1];
    let sum: u32 = routing
        .bytes()
        .zip(WEIGHTS.iter())
        .map(|(b, w)| u32::from(b - b'0') * w)
        .sum();

    if sum % 10 != 0 {
        return Err(CoreError::InvalidRoutingNumber(routing.to_string()));
    }
    Ok(())
}

/// Account numbers are digits only, 1..=17 long (NACHA DFI account field).
pub fn validate_account_number(number: &str) -> CoreResult<()> {
    let trimmed = number.trim();
    if trimmed.is_empty() || trimmed.len() > 17 || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return Err(CoreError::InvalidAccountNumber);
    }
    Ok(())
}

/// Enforce metadata entry count and value length limits.
pub fn validate_metadata(metadata: &HashMap<String, String>) -> CoreResult<()> {
    if metadata.len() > MAX_METADATA_ENTRIES {
        return Err(CoreError::TooManyMetadataEntries {
            count: metadata.len(),
            limit: MAX_METADATA_ENTRIES,
        });
    }
    for (key, value) in metadata {
        if key.trim().is_empty() {
            return Err(CoreError::EmptyMetadataKey);
        }
        if value.chars().count() > MAX_METADATA_VALUE_LEN {
            return Err(CoreError::MetadataValueTooLong {
                key: key.clone(),
                limit: MAX_METADATA_VALUE_LEN,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_routing_number_checksum() {
        assert!(validate_routing_number("987654320").is_ok());
        assert!(validate_routing_number("121042882").is_ok());
        assert!(validate_routing_number("273976369").is_ok());

        assert!(validate_routing_number("987654321").is_err());
        assert!(validate_routing_number("12345678").is_err());
        assert!(validate_routing_number("1234567890").is_err());
        assert!(validate_routing_number("98765432a").is_err());
    }

    #[test]
    fn test_account_number() {
        assert!(validate_account_number("123").is_ok());
        assert!(validate_account_number("").is_err());
        assert!(validate_account_number("12-34").is_err());
        assert!(validate_account_number("123456789012345678").is_err());
    }

    #[test]
    fn test_us_states() {
        assert!(is_us_state("CA"));
        assert!(is_us_state("ny"));
        assert!(is_us_state("Dc"));
        assert!(is_us_state("PR"));
        assert!(!is_us_state("XX"));
        assert!(!is_us_state("California"));
    }

    #[test]
    fn test_us_country() {
        assert!(is_us_country("US"));
        assert!(is_us_country("usa"));
        assert!(!is_us_country("CA"));
    }

    #[test]
    fn test_metadata_limits() {
        let mut metadata = HashMap::new();
        for i in 0..MAX_METADATA_ENTRIES {
            metadata.insert(format!("key{}", i), "v".to_string());
        }
        assert!(validate_metadata(&metadata).is_ok());

        metadata.insert("one-too-many".to_string(), "v".to_string());
        let err = validate_metadata(&metadata).unwrap_err();
        assert!(err.is_metadata_error());

        let mut metadata = HashMap::new();
        metadata.insert("long".to_string(), "é".repeat(MAX_METADATA_VALUE_LEN));
        assert!(validate_metadata(&metadata).is_ok());
        metadata.insert("longer".to_string(), "é".repeat(MAX_METADATA_VALUE_LEN + 1));
        assert!(matches!(
            validate_metadata(&metadata),
            Err(CoreError::MetadataValueTooLong { .. })
        ));
    }
}
