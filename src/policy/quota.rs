use crate::models::user::SubscriptionPlan;

/// Daily post allowance. `NoBonus` is the sentinel "defer to the plan quota";
/// the derived ordering is `NoBonus < Finite(n) < Finite(m > n) < Unbounded`,
/// so `max` composes allowances without magic numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Quota {
    NoBonus,
    Finite(u32),
    Unbounded,
}

impl Quota {
    /// Whether a user who already made `used` posts today may make another.
    pub fn permits(&self, used: u32) -> bool {
        match self {
            Quota::NoBonus => false,
            Quota::Finite(n) => used < *n,
            Quota::Unbounded => true,
        }
    }
}

/// Allowance from the follow graph. The zero-follow bonus is additionally
/// window-gated by the evaluator; counts outside {0, 2, >10} get no bonus.
pub fn follow_bonus(follow_count: u32) -> Quota {
    match follow_count {
        0 => Quota::Finite(1),
        2 => Quota::Finite(2),
        n if n > 10 => Quota::Unbounded,
        _ => Quota::NoBonus,
    }
}

/// Plan quota and follow bonus are never summed: the bonus either defers to
/// the plan or the larger of the two wins.
pub fn effective_quota(plan: SubscriptionPlan, bonus: Quota) -> Quota {
    let plan_quota = plan.quota();
    if bonus == Quota::NoBonus {
        plan_quota
    } else {
        plan_quota.max(bonus)
    }
}
