pub mod otp;
pub mod post;
pub mod user;
