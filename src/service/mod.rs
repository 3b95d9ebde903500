pub mod email_service;
pub mod otp_service;
pub mod post_service;
pub mod subscription_service;
pub mod upload_service;

pub use email_service::{Mailer, SmtpMailer};
pub use otp_service::OtpService;
pub use post_service::PostService;
pub use subscription_service::SubscriptionService;
pub use upload_service::{AudioUpload, UploadService};
