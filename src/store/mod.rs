pub mod media;
pub mod memory;

use chrono::{DateTime, Utc};
use eyre::Result;
use uuid::Uuid;

use crate::models::otp::{OtpPurpose, OtpRecord};
use crate::models::post::{NewPost, Post};
use crate::models::user::{SubscriptionPlan, User};

/// Outcome of an atomic find-and-mark-used on the OTP store.
#[derive(Debug, Clone, PartialEq)]
pub enum ClaimOutcome {
    /// No unused record matched email/code/purpose.
    NotFound,
    /// Only expired matches exist; they are left unused.
    Expired,
    /// An unexpired match was marked used.
    Claimed(OtpRecord),
}

pub trait OtpStore: Send + Sync {
    fn insert(&self, record: OtpRecord) -> Result<()>;

    /// Find-then-mark-used must be atomic per (email, purpose) so two
    /// concurrent verifications cannot both consume one code.
    fn claim(
        &self,
        email: &str,
        code: &str,
        purpose: OtpPurpose,
        now: DateTime<Utc>,
    ) -> Result<ClaimOutcome>;
}

pub trait PostStore: Send + Sync {
    /// Posts by `user_id` with `from <= created_at < to`.
    fn count_between(&self, user_id: Uuid, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<u32>;

    fn append(&self, post: NewPost) -> Result<Post>;
}

pub trait UserDirectory: Send + Sync {
    fn get(&self, id: Uuid) -> Result<Option<User>>;

    fn find_by_email(&self, email: &str) -> Result<Option<User>>;

    fn set_audio_gate(&self, id: Uuid, verified: bool) -> Result<()>;

    /// Test-and-clear on the audio gate flag, returning whether it was set.
    /// Must be atomic so two concurrent gated actions cannot both ride one
    /// verification.
    fn consume_audio_gate(&self, id: Uuid) -> Result<bool>;

    fn set_plan(
        &self,
        id: Uuid,
        plan: SubscriptionPlan,
        expires_at: DateTime<Utc>,
    ) -> Result<()>;
}

pub trait MediaStore: Send + Sync {
    /// Persist an artifact and return a retrievable location.
    fn store(&self, filename: &str, data: &[u8]) -> Result<String>;

    /// Discard a previously stored artifact (reject path).
    fn delete(&self, location: &str) -> Result<()>;
}

pub trait MediaProbe: Send + Sync {
    /// Playback length in seconds of a stored artifact.
    fn duration_secs(&self, location: &str) -> Result<f64>;
}
