use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::policy::quota::Quota;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionPlan {
    Free,
    Bronze,
    Silver,
    Gold,
}

impl SubscriptionPlan {
    pub fn to_str(&self) -> &str {
        match self {
            SubscriptionPlan::Free => "free",
            SubscriptionPlan::Bronze => "bronze",
            SubscriptionPlan::Silver => "silver",
            SubscriptionPlan::Gold => "gold",
        }
    }

    /// Daily post allowance from the subscription tier alone.
    pub fn quota(&self) -> Quota {
        match self {
            SubscriptionPlan::Free => Quota::Finite(1),
            SubscriptionPlan::Bronze => Quota::Finite(3),
            SubscriptionPlan::Silver => Quota::Finite(5),
            SubscriptionPlan::Gold => Quota::Unbounded,
        }
    }

    pub fn price_inr(&self) -> u32 {
        match self {
            SubscriptionPlan::Free => 0,
            SubscriptionPlan::Bronze => 100,
            SubscriptionPlan::Silver => 300,
            SubscriptionPlan::Gold => 1000,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,

    /// Size of the set of users this user follows.
    pub follow_count: u32,

    pub plan: SubscriptionPlan,
    pub plan_expires_at: Option<DateTime<Utc>>,

    /// Set by OTP verification, cleared when the gated upload runs.
    pub audio_otp_verified: bool,

    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(name: &str, email: &str, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.trim().to_string(),
            email: email.trim().to_lowercase(),
            follow_count: 0,
            plan: SubscriptionPlan::Free,
            plan_expires_at: None,
            audio_otp_verified: false,
            created_at: now,
        }
    }
}
