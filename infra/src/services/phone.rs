//! Phone number normalization backed by libphonenumber metadata

use phonenumber::{country, Mode};
use tracing::debug;

use otp_core::errors::{OtpError, OtpResult};
use otp_core::services::otp::PhoneNormalizer;
use otp_shared::config::OtpConfig;
use otp_shared::phone::{mask_phone_number, normalize_phone_number};

use crate::InfrastructureError;

/// Parses local or international input into E.164 and enforces the
/// region allow-list
///
/// Numbers without a `+` prefix are read as local to `default_region`, so
/// `0912 345 678` becomes `+84912345678` for Vietnam.
#[derive(Debug, Clone)]
pub struct LibPhoneNormalizer {
    default_region: country::Id,
    allowed_regions: Vec<country::Id>,
}

impl LibPhoneNormalizer {
    pub fn new(default_region: &str, allowed_regions: &[String]) -> Result<Self, InfrastructureError> {
        let default_region = parse_region(default_region)?;
        let allowed_regions = allowed_regions
            .iter()
            .map(|r| parse_region(r))
            .collect::<Result<Vec<_>, _>>()?;

        if allowed_regions.is_empty() {
            return Err(InfrastructureError::Config(
                "At least one allowed region is required".to_string(),
            ));
        }

        Ok(Self {
            default_region,
            allowed_regions,
        })
    }

    pub fn from_config(config: &OtpConfig) -> Result<Self, InfrastructureError> {
        Self::new(&config.default_region, &config.allowed_regions)
    }
}

impl PhoneNormalizer for LibPhoneNormalizer {
    fn normalize(&self, raw: &str) -> OtpResult<String> {
        let cleaned = normalize_phone_number(raw);
        if cleaned.is_empty() {
            return Err(OtpError::InvalidPhone);
        }

        let parsed = phonenumber::parse(Some(self.default_region), &cleaned)
            .map_err(|_| OtpError::InvalidPhone)?;

        if !phonenumber::is_valid(&parsed) {
            debug!(phone = %mask_phone_number(&cleaned), "Rejected invalid phone number");
            return Err(OtpError::InvalidPhone);
        }

        match parsed.country().id() {
            Some(region) if self.allowed_regions.contains(&region) => {}
            _ => {
                debug!(
                    phone = %mask_phone_number(&cleaned),
                    "Rejected phone number from unsupported region"
                );
                return Err(OtpError::UnsupportedRegion);
            }
        }

        Ok(parsed.format().mode(Mode::E164).to_string())
    }
}

fn parse_region(code: &str) -> Result<country::Id, InfrastructureError> {
    code.trim()
        .to_uppercase()
        .parse::<country::Id>()
        .map_err(|_| InfrastructureError::Config(format!("Unknown region code: {}", code)))
}
