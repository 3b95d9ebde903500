use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use eyre::eyre;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::clock::Clock;
use crate::error::ServiceError;
use crate::models::post::{NewPost, Post};
use crate::policy::eligibility::evaluate_posting;
use crate::policy::window::ist_day_bounds;
use crate::store::{PostStore, UserDirectory};

/// Publishes posts after the eligibility check. Count-evaluate-append runs
/// under a per-user lock so two concurrent requests cannot both observe a
/// remaining quota slot and overshoot it.
pub struct PostService {
    posts: Arc<dyn PostStore>,
    users: Arc<dyn UserDirectory>,
    clock: Arc<dyn Clock>,
    locks: Mutex<HashMap<Uuid, Arc<Mutex<()>>>>,
}

impl PostService {
    pub fn new(posts: Arc<dyn PostStore>, users: Arc<dyn UserDirectory>, clock: Arc<dyn Clock>) -> Self {
        Self {
            posts,
            users,
            clock,
            locks: Mutex::new(HashMap::new()),
        }
    }

    fn user_lock(&self, user_id: Uuid) -> Result<Arc<Mutex<()>>, ServiceError> {
        let mut locks = self
            .locks
            .lock()
            .map_err(|_| eyre!("post lock table poisoned"))?;
        Ok(locks.entry(user_id).or_default().clone())
    }

    /// Drop the table entry once no publish holds it, so the table stays
    /// proportional to in-flight users rather than all users ever seen.
    fn prune_lock(&self, user_id: Uuid) {
        if let Ok(mut locks) = self.locks.lock() {
            if locks.get(&user_id).is_some_and(|l| Arc::strong_count(l) == 1) {
                locks.remove(&user_id);
            }
        }
    }

    #[instrument(skip(self, text))]
    pub fn publish(&self, user_id: Uuid, text: &str) -> Result<Post, ServiceError> {
        let lock = self.user_lock(user_id)?;
        let result = match lock.lock() {
            Ok(_serialized) => self.publish_serialized(user_id, text),
            Err(_) => Err(eyre!("per-user lock poisoned").into()),
        };
        drop(lock);
        self.prune_lock(user_id);
        result
    }

    fn publish_serialized(&self, user_id: Uuid, text: &str) -> Result<Post, ServiceError> {
        let user = self
            .users
            .get(user_id)?
            .ok_or_else(|| eyre!("user not found"))?;

        let now = self.clock.now();
        let (from, to) = ist_day_bounds(now);
        let today_count = self.posts.count_between(user_id, from, to)?;
        evaluate_posting(&user, today_count, now)?;

        let post = self.posts.append(NewPost {
            user_id,
            text: text.to_string(),
            audio_url: None,
            created_at: now,
        })?;
        info!(user = %user_id, post = %post.id, "post published");
        Ok(post)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::error::Rejection;
    use crate::models::user::{SubscriptionPlan, User};
    use crate::policy::window::tests::ist_instant;
    use crate::store::memory::{InMemoryPostStore, InMemoryUserDirectory};

    fn service_with_user(
        plan: SubscriptionPlan,
        follow_count: u32,
        now: chrono::DateTime<chrono::Utc>,
    ) -> (PostService, Uuid, Arc<InMemoryPostStore>) {
        let posts = Arc::new(InMemoryPostStore::default());
        let users = Arc::new(InMemoryUserDirectory::default());
        let mut user = User::new("Ravi", "ravi@twiller.local", now);
        user.plan = plan;
        user.follow_count = follow_count;
        let id = user.id;
        users.upsert(user).unwrap();
        let service = PostService::new(posts.clone(), users, Arc::new(FixedClock(now)));
        (service, id, posts)
    }

    fn rejection(err: ServiceError) -> Rejection {
        match err {
            ServiceError::Rejected(r) => r,
            ServiceError::Internal(e) => panic!("expected rejection, got {e}"),
        }
    }

    #[test]
    fn free_plan_allows_a_single_post_per_day() {
        let (service, id, _) =
            service_with_user(SubscriptionPlan::Free, 5, ist_instant(16, 0, 0));
        service.publish(id, "first").unwrap();
        let err = service.publish(id, "second").unwrap_err();
        assert_eq!(rejection(err), Rejection::QuotaExhausted);
    }

    #[test]
    fn silver_plan_allows_five() {
        let (service, id, posts) =
            service_with_user(SubscriptionPlan::Silver, 5, ist_instant(16, 0, 0));
        for i in 0..5 {
            service.publish(id, &format!("post {i}")).unwrap();
        }
        assert_eq!(posts.all().len(), 5);
        let err = service.publish(id, "one too many").unwrap_err();
        assert_eq!(rejection(err), Rejection::QuotaExhausted);
    }

    #[test]
    fn zero_follow_window_enforced_through_the_service() {
        let (service, id, _) =
            service_with_user(SubscriptionPlan::Free, 0, ist_instant(12, 0, 0));
        let err = service.publish(id, "too late").unwrap_err();
        assert!(matches!(rejection(err), Rejection::WindowClosed { .. }));

        let (service, id, _) =
            service_with_user(SubscriptionPlan::Free, 0, ist_instant(10, 15, 0));
        service.publish(id, "in the window").unwrap();
        let err = service.publish(id, "again").unwrap_err();
        assert_eq!(rejection(err), Rejection::AlreadyPostedInWindow);
    }

    #[test]
    fn counts_only_todays_posts() {
        let now = ist_instant(16, 0, 0);
        let (service, id, posts) = service_with_user(SubscriptionPlan::Free, 5, now);
        // A post from yesterday does not count against today's quota.
        posts
            .append(NewPost {
                user_id: id,
                text: "yesterday".into(),
                audio_url: None,
                created_at: now - chrono::Duration::days(1),
            })
            .unwrap();
        service.publish(id, "today").unwrap();
    }

    #[test]
    fn concurrent_publishes_cannot_overshoot_quota() {
        let now = ist_instant(16, 0, 0);
        let (service, id, posts) = service_with_user(SubscriptionPlan::Bronze, 5, now);
        let service = Arc::new(service);

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let service = service.clone();
                std::thread::spawn(move || service.publish(id, &format!("post {i}")).is_ok())
            })
            .collect();
        let successes = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();

        // Bronze quota is 3: exactly three of the racing publishes land.
        assert_eq!(successes, 3);
        assert_eq!(posts.all().len(), 3);
        assert!(service.locks.lock().unwrap().is_empty());
    }

    #[test]
    fn lock_table_does_not_accumulate_users() {
        let now = ist_instant(16, 0, 0);
        let posts = Arc::new(InMemoryPostStore::default());
        let users = Arc::new(InMemoryUserDirectory::default());
        let service = PostService::new(posts, users.clone(), Arc::new(FixedClock(now)));

        for i in 0..4 {
            let mut user = User::new(&format!("user{i}"), &format!("u{i}@twiller.local"), now);
            user.follow_count = 5;
            let id = user.id;
            users.upsert(user).unwrap();
            service.publish(id, "hello").unwrap();
            // Quota rejections release and prune the entry too.
            let _ = service.publish(id, "again").unwrap_err();
        }
        assert!(service.locks.lock().unwrap().is_empty());
    }
}
