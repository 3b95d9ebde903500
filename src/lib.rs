//! Core policy engine for the Twiller backend: posting eligibility
//! (subscription quota + follow-graph bonus + IST time windows) and the
//! OTP-gated audio upload flow. The HTTP layer, database and payment
//! provider live outside this crate and are reached through the traits
//! in [`store`].

pub mod clock;
pub mod config;
pub mod error;
pub mod models;
pub mod policy;
pub mod service;
pub mod store;

pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{Rejection, ServiceError};
pub use policy::eligibility::evaluate_posting;
pub use policy::quota::Quota;
pub use policy::window::TimeWindow;
