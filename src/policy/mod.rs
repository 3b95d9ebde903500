pub mod eligibility;
pub mod quota;
pub mod window;
