//! Fixed-percentage revenue split between the platform and the artist.

use crate::error::{AppError, Result};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeSchedule {
    platform_percent: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct Split {
    pub platform_fee_minor: i64,
    pub artist_share_minor: i64,
}

impl FeeSchedule {
    pub fn new(platform_percent: u32) -> Result<Self> {
        if platform_percent > 100 {
            return Err(AppError::Config(format!(
                "platform fee must be between 0 and 100 percent, got {}",
                platform_percent
            )));
        }
        Ok(Self { platform_percent })
    }

    pub fn platform_percent(&self) -> u32 {
        self.platform_percent
    }

    /// Platform fee is rounded half-up; the artist gets the remainder.
    pub fn split(&self, gross_minor: i64) -> Result<Split> {
        if gross_minor < 0 {
            return Err(AppError::Validation(
                "cannot split a negative amount".to_string(),
            ));
        }
        let gross = gross_minor as i128;
        let fee = (gross * self.platform_percent as i128 + 50) / 100;
        let fee = fee as i64;
        Ok(Split {
            platform_fee_minor: fee,
            artist_share_minor: gross_minor - fee,
        })
    }
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self {
            platform_percent: 10,
        }
    }
}
