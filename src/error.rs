use thiserror::Error;

use crate::policy::window::TimeWindow;

/// Recoverable, user-facing rejections. The caller surfaces the message as a
/// denial and takes no further action.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Rejection {
    #[error("you have reached your posting limit for today")]
    QuotaExhausted,

    #[error("action allowed only between {window}")]
    WindowClosed { window: TimeWindow },

    #[error("you already posted today in your window")]
    AlreadyPostedInWindow,

    #[error("invalid OTP")]
    InvalidOtp,

    #[error("OTP expired")]
    OtpExpired,

    #[error("verify OTP before uploading audio")]
    OtpNotVerified,

    #[error("artifact is {size} bytes, limit is {max}")]
    ArtifactTooLarge { size: u64, max: u64 },

    #[error("artifact runs {secs}s, limit is {max}s")]
    ArtifactTooLong { secs: u64, max: u64 },

    #[error("unsupported artifact type {content_type:?}")]
    UnsupportedArtifactType { content_type: String },
}

/// Service-level failure: either a policy rejection to show the user, or a
/// collaborator failure (store, mailer, prober) fatal for this request only.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Rejected(#[from] Rejection),

    #[error(transparent)]
    Internal(#[from] eyre::Report),
}

impl ServiceError {
    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            ServiceError::Rejected(r) => Some(r),
            ServiceError::Internal(_) => None,
        }
    }
}
