use std::sync::Arc;

use eyre::eyre;
use rand::Rng;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::clock::Clock;
use crate::error::{Rejection, ServiceError};
use crate::models::otp::{OtpPurpose, OtpRecord};
use crate::service::email_service::Mailer;
use crate::store::{ClaimOutcome, OtpStore, UserDirectory};

const OTP_TEMPLATE: &str = "./templates/otp_email.html";

/// Issues, verifies and consumes the one-time codes gating privileged
/// actions. Verification arms the user's gate flag; the flag is single-use.
pub struct OtpService {
    store: Arc<dyn OtpStore>,
    users: Arc<dyn UserDirectory>,
    mailer: Arc<dyn Mailer>,
    clock: Arc<dyn Clock>,
    platform_name: String,
}

impl OtpService {
    pub fn new(
        store: Arc<dyn OtpStore>,
        users: Arc<dyn UserDirectory>,
        mailer: Arc<dyn Mailer>,
        clock: Arc<dyn Clock>,
        platform_name: &str,
    ) -> Self {
        Self {
            store,
            users,
            mailer,
            clock,
            platform_name: platform_name.to_string(),
        }
    }

    /// Generate a code, persist the record and mail the code. Mail failure
    /// is logged and swallowed: the record is already committed and the code
    /// stays consumable.
    #[instrument(skip(self))]
    pub fn issue(&self, name: &str, email: &str, purpose: OtpPurpose) -> Result<String, ServiceError> {
        let email = email.trim().to_lowercase();
        let code = generate_code();
        let record = OtpRecord::new(&email, &code, purpose, self.clock.now());
        self.store.insert(record)?;

        let template_data = serde_json::json!({
            "name": name,
            "otp": code,
            "platformName": self.platform_name,
        });
        if let Err(err) = self.mailer.send(
            &email,
            "Your audio upload OTP",
            OTP_TEMPLATE,
            &template_data,
        ) {
            warn!(email = %email, error = %err, "failed to send OTP email");
        }

        info!(email = %email, purpose = purpose.to_str(), "OTP issued");
        Ok(code)
    }

    /// Consume a code and arm the user's gate flag. The store claim is
    /// atomic, so a code can satisfy verification at most once. Expired
    /// records are left unused (they stay invalid at lookup time).
    #[instrument(skip(self, code))]
    pub fn verify(&self, email: &str, code: &str, purpose: OtpPurpose) -> Result<(), ServiceError> {
        let email = email.trim().to_lowercase();
        let code = code.trim();

        match self.store.claim(&email, code, purpose, self.clock.now())? {
            ClaimOutcome::NotFound => Err(Rejection::InvalidOtp.into()),
            ClaimOutcome::Expired => Err(Rejection::OtpExpired.into()),
            ClaimOutcome::Claimed(_) => {
                let user = self
                    .users
                    .find_by_email(&email)?
                    .ok_or_else(|| eyre!("no user for verified OTP email"))?;
                self.users.set_audio_gate(user.id, true)?;
                info!(email = %email, "OTP verified");
                Ok(())
            }
        }
    }

    /// Require the gate flag and clear it before the caller proceeds with
    /// the privileged action. The directory's test-and-clear is atomic, so
    /// one verification admits exactly one action even under concurrent
    /// consumers. Re-verification is needed per action.
    pub fn consume_gate(&self, user_id: Uuid) -> Result<(), ServiceError> {
        if self.users.consume_audio_gate(user_id)? {
            Ok(())
        } else {
            Err(Rejection::OtpNotVerified.into())
        }
    }
}

/// 6 digit numeric code, 100000-999999 inclusive.
fn generate_code() -> String {
    rand::thread_rng().gen_range(100_000..=999_999).to_string()
}
