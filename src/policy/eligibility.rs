use chrono::{DateTime, Utc};

use crate::error::Rejection;
use crate::models::user::User;
use crate::policy::quota::{effective_quota, follow_bonus};
use crate::policy::window::ZERO_FOLLOW_POSTING;

/// Decides whether `user` may publish another post right now. Pure: the
/// caller reads `today_count` and persists the post itself.
///
/// Zero-follow users are a special case: they get exactly one post per day,
/// only inside the 10:00-10:30 IST window, regardless of plan.
pub fn evaluate_posting(
    user: &User,
    today_count: u32,
    now: DateTime<Utc>,
) -> Result<(), Rejection> {
    let bonus = follow_bonus(user.follow_count);

    if user.follow_count == 0 {
        if !ZERO_FOLLOW_POSTING.contains(now) {
            return Err(Rejection::WindowClosed {
                window: ZERO_FOLLOW_POSTING,
            });
        }
        if today_count >= 1 {
            return Err(Rejection::AlreadyPostedInWindow);
        }
    }

    if !effective_quota(user.plan, bonus).permits(today_count) {
        return Err(Rejection::QuotaExhausted);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::SubscriptionPlan;
    use crate::policy::window::tests::ist_instant;

    fn user(plan: SubscriptionPlan, follow_count: u32) -> User {
        let mut u = User::new("tester", "tester@twiller.local", ist_instant(9, 0, 0));
        u.plan = plan;
        u.follow_count = follow_count;
        u
    }

    #[test]
    fn zero_follow_user_inside_window_may_post_once() {
        let u = user(SubscriptionPlan::Free, 0);
        let at = ist_instant(10, 15, 0);
        assert!(evaluate_posting(&u, 0, at).is_ok());
        assert_eq!(
            evaluate_posting(&u, 1, at),
            Err(Rejection::AlreadyPostedInWindow)
        );
    }

    #[test]
    fn zero_follow_user_outside_window_is_rejected() {
        let u = user(SubscriptionPlan::Free, 0);
        assert_eq!(
            evaluate_posting(&u, 0, ist_instant(12, 0, 0)),
            Err(Rejection::WindowClosed {
                window: ZERO_FOLLOW_POSTING
            })
        );
    }

    #[test]
    fn zero_follow_cap_dominates_gold_plan() {
        // Gold is unbounded, but the zero-follow single-post cap still wins.
        let u = user(SubscriptionPlan::Gold, 0);
        let at = ist_instant(10, 15, 0);
        assert!(evaluate_posting(&u, 0, at).is_ok());
        assert_eq!(
            evaluate_posting(&u, 1, at),
            Err(Rejection::AlreadyPostedInWindow)
        );
    }

    #[test]
    fn plan_quota_applies_without_a_bonus() {
        let u = user(SubscriptionPlan::Bronze, 5);
        let at = ist_instant(16, 0, 0);
        assert!(evaluate_posting(&u, 2, at).is_ok());
        assert_eq!(evaluate_posting(&u, 3, at), Err(Rejection::QuotaExhausted));
    }

    #[test]
    fn two_follow_bonus_lifts_free_plan_to_two() {
        let u = user(SubscriptionPlan::Free, 2);
        let at = ist_instant(16, 0, 0);
        assert!(evaluate_posting(&u, 1, at).is_ok());
        assert_eq!(evaluate_posting(&u, 2, at), Err(Rejection::QuotaExhausted));
    }

    #[test]
    fn unbounded_follow_bonus_never_exhausts() {
        let u = user(SubscriptionPlan::Free, 11);
        for hour in [0, 9, 23] {
            assert!(evaluate_posting(&u, 50, ist_instant(hour, 30, 0)).is_ok());
        }
    }

    #[test]
    fn window_boundaries_are_inclusive_for_posting() {
        let u = user(SubscriptionPlan::Free, 0);
        assert!(evaluate_posting(&u, 0, ist_instant(10, 0, 0)).is_ok());
        assert!(evaluate_posting(&u, 0, ist_instant(10, 30, 0)).is_ok());
        assert!(evaluate_posting(&u, 0, ist_instant(9, 59, 59)).is_err());
        assert!(evaluate_posting(&u, 0, ist_instant(10, 30, 1)).is_err());
    }
}
