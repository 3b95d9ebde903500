use std::sync::Arc;

use eyre::eyre;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::clock::Clock;
use crate::error::{Rejection, ServiceError};
use crate::models::post::{NewPost, Post};
use crate::policy::window::AUDIO_UPLOAD;
use crate::service::otp_service::OtpService;
use crate::store::{MediaProbe, MediaStore, PostStore, UserDirectory};

pub const MAX_AUDIO_BYTES: u64 = 100 * 1024 * 1024;
pub const MAX_AUDIO_SECS: u64 = 300;

#[derive(Debug, Clone)]
pub struct AudioUpload {
    pub data: Vec<u8>,
    pub content_type: String,
    pub text: String,
}

/// OTP-gated audio upload. Checks run in the order the flow needs them:
/// window, gate flag, artifact ceilings, then store-and-probe. A rejected
/// artifact is discarded and the gate flag is left armed so the user can
/// retry without a new code; on success the flag is consumed before the
/// downstream post write.
pub struct UploadService {
    users: Arc<dyn UserDirectory>,
    posts: Arc<dyn PostStore>,
    media: Arc<dyn MediaStore>,
    probe: Arc<dyn MediaProbe>,
    otp: Arc<OtpService>,
    clock: Arc<dyn Clock>,
}

impl UploadService {
    pub fn new(
        users: Arc<dyn UserDirectory>,
        posts: Arc<dyn PostStore>,
        media: Arc<dyn MediaStore>,
        probe: Arc<dyn MediaProbe>,
        otp: Arc<OtpService>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            users,
            posts,
            media,
            probe,
            otp,
            clock,
        }
    }

    #[instrument(skip(self, upload))]
    pub fn upload(&self, user_id: Uuid, upload: AudioUpload) -> Result<Post, ServiceError> {
        let now = self.clock.now();
        if !AUDIO_UPLOAD.contains(now) {
            return Err(Rejection::WindowClosed {
                window: AUDIO_UPLOAD,
            }
            .into());
        }

        let user = self
            .users
            .get(user_id)?
            .ok_or_else(|| eyre!("user not found"))?;
        if !user.audio_otp_verified {
            return Err(Rejection::OtpNotVerified.into());
        }

        if !upload.content_type.starts_with("audio/") {
            return Err(Rejection::UnsupportedArtifactType {
                content_type: upload.content_type,
            }
            .into());
        }
        let size = upload.data.len() as u64;
        if size > MAX_AUDIO_BYTES {
            return Err(Rejection::ArtifactTooLarge {
                size,
                max: MAX_AUDIO_BYTES,
            }
            .into());
        }

        // Timestamp for operators, uuid so simultaneous uploads never
        // overwrite each other.
        let filename = format!("audio_{}_{}.webm", now.timestamp_millis(), Uuid::new_v4());
        let location = self.media.store(&filename, &upload.data)?;

        let duration = match self.probe.duration_secs(&location) {
            Ok(d) => d,
            Err(err) => {
                warn!(location = %location, error = %err, "duration probe failed, discarding artifact");
                self.media.delete(&location)?;
                return Err(err.wrap_err("validating audio duration").into());
            }
        };
        if duration > MAX_AUDIO_SECS as f64 {
            self.media.delete(&location)?;
            return Err(Rejection::ArtifactTooLong {
                secs: duration.ceil() as u64,
                max: MAX_AUDIO_SECS,
            }
            .into());
        }

        // Single use: consumed now, whether or not the post write below
        // succeeds.
        self.otp.consume_gate(user_id)?;

        let post = self.posts.append(NewPost {
            user_id,
            text: upload.text,
            audio_url: Some(location.clone()),
            created_at: now,
        })?;
        info!(user = %user_id, location = %location, secs = duration, "audio uploaded");
        Ok(post)
    }
}
