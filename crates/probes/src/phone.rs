//! Phone number parsing and E.164 normalization.

use tracing::debug;
use vouch_core::{PhoneData, ProbeOutcome};

/// Trait for phone normalization, object-safe so tests can substitute mocks.
pub trait PhoneNormalizer: Send + Sync {
    /// Parse a free-form phone string and normalize it to E.164.
    fn normalize(&self, phone: &str) -> ProbeOutcome<PhoneData>;
}

/// Production phone client backed by the `phonenumber` crate.
///
/// Parsing is pure CPU work; there is no timeout to manage. Empty or
/// whitespace-only input is a failed check, not a panic.
#[derive(Debug, Clone)]
pub struct PhoneClient {
    default_region: phonenumber::country::Id,
}

impl PhoneClient {
    /// Create a client with the `US` default region.
    #[must_use]
    pub fn new() -> Self {
        Self {
            default_region: phonenumber::country::US,
        }
    }

    /// Override the default region used for numbers without a country code.
    #[must_use]
    pub fn with_default_region(mut self, region: phonenumber::country::Id) -> Self {
        self.default_region = region;
        self
    }
}

impl Default for PhoneClient {
    fn default() -> Self {
        Self::new()
    }
}

impl PhoneNormalizer for PhoneClient {
    fn normalize(&self, phone: &str) -> ProbeOutcome<PhoneData> {
        let trimmed = phone.trim();
        if trimmed.is_empty() {
            return ProbeOutcome::failed("Empty phone number");
        }

        match phonenumber::parse(Some(self.default_region), trimmed) {
            Ok(number) => {
                let valid = phonenumber::is_valid(&number);
                let region = number.country().id().map(|id| id.as_ref().to_owned());
                let normalized = valid
                    .then(|| number.format().mode(phonenumber::Mode::E164).to_string());

                debug!(valid, region = region.as_deref(), "phone parsed");
                ProbeOutcome::Success(PhoneData {
                    normalized,
                    valid,
                    region,
                })
            }
            Err(e) => ProbeOutcome::failed(format!("Invalid phone number format: {e}")),
        }
    }
}
