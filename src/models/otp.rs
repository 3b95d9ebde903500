use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Codes stay valid this long after issuance.
pub const OTP_TTL_MINUTES: i64 = 10;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum OtpPurpose {
    AudioUpload,
}

impl OtpPurpose {
    pub fn to_str(&self) -> &str {
        match self {
            OtpPurpose::AudioUpload => "audio-upload",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtpRecord {
    pub email: String,
    /// 6 ASCII digits.
    pub code: String,
    pub purpose: OtpPurpose,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    /// Flips false -> true exactly once, on successful verification.
    pub used: bool,
}

impl OtpRecord {
    pub fn new(email: &str, code: &str, purpose: OtpPurpose, issued_at: DateTime<Utc>) -> Self {
        Self {
            email: email.trim().to_lowercase(),
            code: code.to_string(),
            purpose,
            issued_at,
            expires_at: issued_at + Duration::minutes(OTP_TTL_MINUTES),
            used: false,
        }
    }

    pub fn expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}
